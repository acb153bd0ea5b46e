//! Serialization of an in-memory package back into a ZIP archive.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::opc::constants::content_type as ct;
use crate::opc::error::Result;
use crate::opc::package::OpcPackage;
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackUri};
use crate::opc::rel::escape_xml;

/// Writes an `OpcPackage` to ZIP bytes: `[Content_Types].xml`, the package
/// `.rels`, then every part and its non-empty relationship table.
pub struct PackageWriter;

impl PackageWriter {
    /// Write a package to a file.
    pub fn write<P: AsRef<std::path::Path>>(path: P, package: &OpcPackage) -> Result<()> {
        std::fs::write(path, Self::to_bytes(package)?)?;
        Ok(())
    }

    /// Serialize a package to archive bytes.
    pub fn to_bytes(package: &OpcPackage) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let content_types_uri = PackUri::new(CONTENT_TYPES_URI)?;
        let cti = ContentTypesItem::from_package(package);
        writer.start_file(content_types_uri.membername(), options)?;
        writer.write_all(cti.to_xml().as_bytes())?;

        let package_uri = PackUri::new(PACKAGE_URI)?;
        writer.start_file(package_uri.rels_uri()?.membername(), options)?;
        writer.write_all(package.rels().to_xml().as_bytes())?;

        // Stable member order for byte-reproducible output.
        let mut partnames: Vec<&PackUri> = package.iter_parts().map(|p| p.partname()).collect();
        partnames.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        for partname in partnames {
            let part = package.get_part(partname)?;
            writer.start_file(partname.membername(), options)?;
            writer.write_all(part.blob())?;

            if !part.rels().is_empty() {
                writer.start_file(partname.rels_uri()?.membername(), options)?;
                writer.write_all(part.rels().to_xml().as_bytes())?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Builder for `[Content_Types].xml`: extension defaults where a well-known
/// mapping exists, per-partname overrides otherwise.
struct ContentTypesItem {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypesItem {
    fn from_package(package: &OpcPackage) -> Self {
        let mut defaults = HashMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());

        let mut cti = Self {
            defaults,
            overrides: HashMap::new(),
        };
        for part in package.iter_parts() {
            cti.add(part.partname(), part.content_type());
        }
        cti
    }

    fn add(&mut self, partname: &PackUri, content_type: &str) {
        let ext = partname.ext();
        if Self::is_default(ext, content_type) {
            self.defaults.insert(ext.to_string(), content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    fn is_default(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext, content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("png", ct::PNG)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("gif", ct::GIF)
                | ("emf", "image/x-emf")
                | ("wmf", "image/x-wmf")
        )
    }

    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );

        let mut exts: Vec<&String> = self.defaults.keys().collect();
        exts.sort();
        for ext in exts {
            xml.push_str("<Default Extension=\"");
            xml.push_str(&escape_xml(ext));
            xml.push_str("\" ContentType=\"");
            xml.push_str(&escape_xml(&self.defaults[ext]));
            xml.push_str("\"/>");
        }

        let mut partnames: Vec<&String> = self.overrides.keys().collect();
        partnames.sort();
        for partname in partnames {
            xml.push_str("<Override PartName=\"");
            xml.push_str(&escape_xml(partname));
            xml.push_str("\" ContentType=\"");
            xml.push_str(&escape_xml(&self.overrides[partname]));
            xml.push_str("\"/>");
        }

        xml.push_str("</Types>");
        xml
    }
}
