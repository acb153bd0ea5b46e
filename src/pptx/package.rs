//! The presentation package: an OPC package plus the parsed presentation
//! part, which holds the ordered slide id list.

use std::path::Path;

use crate::error::{MergeError, Result};
use crate::opc::constants::content_type;
use crate::opc::error::OpcError;
use crate::opc::{OpcPackage, PackUri, Part};
use crate::xml::XmlNode;

/// A `.pptx` package opened for mutation.
///
/// The presentation part (`/ppt/presentation.xml`) is parsed into a tree on
/// load and held that way across the merge — the slide id list is spliced
/// repeatedly — then re-serialized into its part blob on save. Slide parts
/// are parsed and written back one at a time.
pub struct PresentationPackage {
    opc: OpcPackage,
    pres_partname: PackUri,
    pres_xml: XmlNode,
}

impl PresentationPackage {
    /// Open a package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_opc(OpcPackage::open(path)?)
    }

    /// Load a package from archive bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_opc(OpcPackage::from_bytes(data)?)
    }

    fn from_opc(opc: OpcPackage) -> Result<Self> {
        let pres_partname = opc.main_document_partname()?;
        let pres_part = opc.get_part(&pres_partname)?;
        if pres_part.content_type() != content_type::PML_PRESENTATION_MAIN {
            return Err(MergeError::NotAPresentation(format!(
                "main document part has content type '{}'",
                pres_part.content_type()
            )));
        }
        let pres_xml = XmlNode::parse(pres_part.blob())?;
        Ok(Self {
            opc,
            pres_partname,
            pres_xml,
        })
    }

    /// Serialize the mutated package to archive bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.flush()?;
        Ok(self.opc.to_bytes()?)
    }

    /// Serialize the mutated package to a file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.flush()?;
        Ok(self.opc.save(path)?)
    }

    /// Write the presentation tree back into its part blob.
    fn flush(&mut self) -> Result<()> {
        let blob = self.pres_xml.to_bytes();
        self.opc.get_part_mut(&self.pres_partname)?.set_blob(blob);
        Ok(())
    }

    #[inline]
    pub fn opc(&self) -> &OpcPackage {
        &self.opc
    }

    #[inline]
    pub fn opc_mut(&mut self) -> &mut OpcPackage {
        &mut self.opc
    }

    #[inline]
    pub fn pres_partname(&self) -> &PackUri {
        &self.pres_partname
    }

    /// The presentation part.
    pub fn pres_part(&self) -> Result<&Part> {
        Ok(self.opc.get_part(&self.pres_partname)?)
    }

    /// The presentation part, mutable.
    pub fn pres_part_mut(&mut self) -> Result<&mut Part> {
        Ok(self.opc.get_part_mut(&self.pres_partname)?)
    }

    /// The `p:sldIdLst` element, if the presentation has one. A deck with
    /// zero slides legitimately omits it.
    pub(crate) fn sld_id_lst(&self) -> Option<&XmlNode> {
        self.pres_xml.find("sldIdLst")
    }

    pub(crate) fn sld_id_lst_mut(&mut self) -> Result<&mut XmlNode> {
        self.pres_xml.find_mut("sldIdLst").ok_or_else(|| {
            MergeError::NotAPresentation("presentation has no slide id list".to_string())
        })
    }

    /// Partnames of all slides in presentation order.
    pub fn slide_partnames(&self) -> Result<Vec<PackUri>> {
        let Some(list) = self.sld_id_lst() else {
            return Ok(Vec::new());
        };
        let pres_part = self.pres_part()?;
        let mut out = Vec::with_capacity(list.element_count());
        for entry in list.elements().filter(|e| e.local_name() == "sldId") {
            let r_id = entry.attr("r:id").ok_or_else(|| {
                OpcError::InvalidRelationship("sldId entry has no r:id".to_string())
            })?;
            let rel = pres_part
                .rels()
                .get(r_id)
                .ok_or_else(|| OpcError::RelationshipNotFound(r_id.to_string()))?;
            out.push(rel.target_partname()?);
        }
        Ok(out)
    }

    /// Number of slides in the presentation.
    pub fn slide_count(&self) -> usize {
        self.sld_id_lst()
            .map(|list| {
                list.elements()
                    .filter(|e| e.local_name() == "sldId")
                    .count()
            })
            .unwrap_or(0)
    }

    /// Parse a slide part into a mutable tree.
    pub fn slide_xml(&self, partname: &PackUri) -> Result<XmlNode> {
        let part = self.opc.get_part(partname)?;
        Ok(XmlNode::parse(part.blob())?)
    }

    /// Serialize a mutated slide tree back into its part.
    pub fn set_slide_xml(&mut self, partname: &PackUri, slide: &XmlNode) -> Result<()> {
        self.opc.get_part_mut(partname)?.set_blob(slide.to_bytes());
        Ok(())
    }
}
