//! Read-only access to a serialized OPC package: ZIP extraction, content
//! type discovery, and relationship parsing.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;

use crate::opc::constants::target_mode;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackUri};

/// A part as read from the archive, before conversion into a live `Part`.
#[derive(Debug)]
pub struct SerializedPart {
    pub partname: PackUri,
    pub content_type: String,
    pub blob: Vec<u8>,
    pub srels: SmallVec<[SerializedRelationship; 8]>,
}

/// A relationship as read from a `.rels` stream, all fields still in string
/// form.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    pub r_id: String,
    pub reltype: String,
    pub target_ref: String,
    pub target_mode: String,
}

impl SerializedRelationship {
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }
}

/// Content type lookup built from `[Content_Types].xml`: extension defaults
/// plus per-partname overrides.
struct ContentTypeMap {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        };
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref()
                {
                    b"Default" => {
                        let mut extension = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Extension" => {
                                    extension = Some(attr.unescape_value()?.to_string());
                                }
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }
                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            map.defaults.insert(ext.to_lowercase(), ct);
                        }
                    }
                    b"Override" => {
                        let mut partname = None;
                        let mut content_type = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"PartName" => {
                                    partname = Some(attr.unescape_value()?.to_string());
                                }
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }
                        if let (Some(pn), Some(ct)) = (partname, content_type) {
                            map.overrides.insert(pn, ct);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::Xml(format!("content types parse error: {e}"))),
                _ => {}
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Override first, then the default for the extension.
    fn get(&self, partname: &PackUri) -> Result<String> {
        if let Some(ct) = self.overrides.get(partname.as_str()) {
            return Ok(ct.clone());
        }
        if let Some(ct) = self.defaults.get(&partname.ext().to_lowercase()) {
            return Ok(ct.clone());
        }
        Err(OpcError::ContentTypeNotFound(partname.to_string()))
    }
}

/// Parser over a serialized package: yields package-level relationships and
/// every part with its content type, blob, and relationships.
pub struct PackageReader {
    pkg_srels: SmallVec<[SerializedRelationship; 8]>,
    sparts: Vec<SerializedPart>,
}

impl PackageReader {
    /// Parse a package from ZIP archive bytes.
    ///
    /// Every archive member is loaded: parts referenced by no relationship
    /// survive a round-trip unchanged.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

        let mut members: HashMap<String, Vec<u8>> = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            members.insert(name, blob);
        }

        let content_types_member = CONTENT_TYPES_URI.trim_start_matches('/');
        let content_types_xml = members
            .get(content_types_member)
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()))?;
        let content_types = ContentTypeMap::from_xml(content_types_xml)?;

        let package_uri = PackUri::new(PACKAGE_URI)?;
        let pkg_srels = Self::rels_for(&members, &package_uri)?;

        // Deterministic part order keeps diagnostics and output stable.
        let mut part_names: Vec<&String> = members
            .keys()
            .filter(|name| *name != content_types_member && !name.ends_with(".rels"))
            .collect();
        part_names.sort();

        let mut sparts = Vec::with_capacity(part_names.len());
        for name in part_names {
            let partname = PackUri::new(format!("/{name}"))?;
            let content_type = content_types.get(&partname)?;
            let srels = Self::rels_for(&members, &partname)?;
            sparts.push(SerializedPart {
                blob: members[name].clone(),
                partname,
                content_type,
                srels,
            });
        }

        Ok(Self { pkg_srels, sparts })
    }

    /// Relationships of one source, or empty when it has no `.rels` member.
    fn rels_for(
        members: &HashMap<String, Vec<u8>>,
        source: &PackUri,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let rels_uri = source.rels_uri()?;
        match members.get(rels_uri.membername()) {
            Some(xml) => parse_rels_xml(xml),
            None => Ok(SmallVec::new()),
        }
    }

    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    pub fn pkg_srels(&self) -> &[SerializedRelationship] {
        &self.pkg_srels
    }

    /// Take ownership of all serialized parts.
    pub fn take_sparts(&mut self) -> Vec<SerializedPart> {
        std::mem::take(&mut self.sparts)
    }
}

/// Parse one `.rels` stream.
fn parse_rels_xml(rels_xml: &[u8]) -> Result<SmallVec<[SerializedRelationship; 8]>> {
    let mut srels = SmallVec::new();
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut r_id = None;
                    let mut reltype = None;
                    let mut target_ref = None;
                    let mut mode = target_mode::INTERNAL.to_string();

                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                            b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                            b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                            b"TargetMode" => mode = attr.unescape_value()?.to_string(),
                            _ => {}
                        }
                    }

                    if let (Some(r_id), Some(reltype), Some(target_ref)) =
                        (r_id, reltype, target_ref)
                    {
                        srels.push(SerializedRelationship {
                            r_id,
                            reltype,
                            target_ref,
                            target_mode: mode,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::Xml(format!("rels parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(srels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_map_override_beats_default() {
        let xml = br#"<?xml version="1.0"?>
            <Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Default Extension="xml" ContentType="application/xml"/>
                <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
            </Types>"#;
        let map = ContentTypeMap::from_xml(xml).unwrap();

        let plain = PackUri::new("/ppt/other.xml").unwrap();
        assert_eq!(map.get(&plain).unwrap(), "application/xml");

        let pres = PackUri::new("/ppt/presentation.xml").unwrap();
        assert!(map.get(&pres).unwrap().ends_with("presentation.main+xml"));

        let unknown = PackUri::new("/media/image1.png").unwrap();
        assert!(map.get(&unknown).is_err());
    }

    #[test]
    fn parses_rels_with_target_mode() {
        let xml = br#"<?xml version="1.0"?>
            <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId1" Type="t1" Target="../media/image1.png"/>
                <Relationship Id="rId2" Type="t2" Target="https://example.com" TargetMode="External"/>
            </Relationships>"#;
        let srels = parse_rels_xml(xml).unwrap();
        assert_eq!(srels.len(), 2);
        assert!(!srels[0].is_external());
        assert!(srels[1].is_external());
        assert_eq!(srels[1].target_ref, "https://example.com");
    }
}
