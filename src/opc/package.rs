//! The in-memory OPC package: parts indexed by partname plus the
//! package-level relationship table.

use std::collections::HashMap;
use std::path::Path;

use crate::opc::constants::relationship_type;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{PACKAGE_URI, PackUri};
use crate::opc::part::Part;
use crate::opc::pkgreader::PackageReader;
use crate::opc::pkgwriter::PackageWriter;
use crate::opc::rel::Relationships;

/// An Open Packaging Conventions package held fully in memory.
///
/// One package is mutated by exactly one merge pass; the type is neither
/// `Sync` nor shared internally.
pub struct OpcPackage {
    rels: Relationships,
    parts: HashMap<String, Part>,
}

impl OpcPackage {
    /// Create an empty package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Open a package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load a package from archive bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut pkg_reader = PackageReader::from_bytes(data)?;
        let mut package = Self::new();

        for srel in pkg_reader.pkg_srels() {
            package.rels.load(
                srel.r_id.clone(),
                srel.reltype.clone(),
                srel.target_ref.clone(),
                srel.is_external(),
            );
        }

        for spart in pkg_reader.take_sparts() {
            let mut part = Part::new(spart.partname, spart.content_type, spart.blob);
            for srel in spart.srels {
                let is_external = srel.is_external();
                part.rels_mut()
                    .load(srel.r_id, srel.reltype, srel.target_ref, is_external);
            }
            package.add_part(part);
        }

        Ok(package)
    }

    /// Serialize to archive bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }

    /// Serialize to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }

    /// The main document part: for a presentation package, `presentation.xml`.
    pub fn main_document_partname(&self) -> Result<PackUri> {
        self.rels
            .rel_of_type(relationship_type::OFFICE_DOCUMENT)?
            .target_partname()
    }

    pub fn get_part(&self, partname: &PackUri) -> Result<&Part> {
        self.parts
            .get(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    pub fn get_part_mut(&mut self, partname: &PackUri) -> Result<&mut Part> {
        self.parts
            .get_mut(partname.as_str())
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Insert a part, replacing any existing part with the same name.
    pub fn add_part(&mut self, part: Part) {
        self.parts.insert(part.partname().to_string(), part);
    }

    /// Remove a part and its relationship table.
    pub fn remove_part(&mut self, partname: &PackUri) -> Option<Part> {
        self.parts.remove(partname.as_str())
    }

    pub fn contains_part(&self, partname: &PackUri) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// First free partname for a `%d` template, e.g.
    /// `/ppt/slides/slide%d.xml` -> `/ppt/slides/slide3.xml`.
    pub fn next_partname(&self, template: &str) -> Result<PackUri> {
        for n in 1u32..=100_000 {
            let candidate = template.replace("%d", &n.to_string());
            if !self.parts.contains_key(&candidate) {
                return PackUri::new(candidate);
            }
        }
        Err(OpcError::InvalidPackUri(format!(
            "no free partname for template '{template}'"
        )))
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}
