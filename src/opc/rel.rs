//! Relationship objects: the per-part table mapping rIds to targets.

use std::collections::HashMap;

use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackUri;

/// A single relationship from a source part to a target.
///
/// The target is another part (internal) or an arbitrary URI (external).
#[derive(Debug, Clone)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        is_external: bool,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Relative part reference for internal relationships, absolute URI for
    /// external ones.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Absolute partname of the target. Errors for external relationships.
    pub fn target_partname(&self) -> Result<PackUri> {
        if self.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "{} is external, it has no target partname",
                self.r_id
            )));
        }
        PackUri::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// The relationship table of one part (or of the package itself).
///
/// rIds are unique within one table and are regenerated whenever a
/// relationship is created; they carry no meaning across parts.
#[derive(Debug)]
pub struct Relationships {
    base_uri: String,
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    /// Create an empty table whose relative targets resolve against
    /// `base_uri`.
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: HashMap::new(),
        }
    }

    /// Insert a relationship under an explicit rId, as read from a `.rels`
    /// part. Replaces any existing relationship with the same rId.
    pub fn load(&mut self, r_id: String, reltype: String, target_ref: String, is_external: bool) {
        let rel = Relationship::new(
            r_id.clone(),
            reltype,
            target_ref,
            self.base_uri.clone(),
            is_external,
        );
        self.rels.insert(r_id, rel);
    }

    /// Create a relationship under a freshly allocated rId and return the id.
    ///
    /// Always allocates, even when an identical relationship exists: callers
    /// remapping a cloned part rely on distinct source rIds staying distinct.
    pub fn add(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        let r_id = self.next_r_id();
        self.load(
            r_id.clone(),
            reltype.to_string(),
            target_ref.to_string(),
            is_external,
        );
        r_id
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Remove a relationship, returning it if present.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// The single relationship of the given type.
    ///
    /// Errors when none exists or when the type is ambiguous.
    pub fn rel_of_type(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.values().filter(|rel| rel.reltype() == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "no relationship of type '{reltype}'"
            ))),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "multiple relationships of type '{reltype}'"
            ))),
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Next free rId, filling gaps: `rId1`, `rId2`, ...
    fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .keys()
            .filter_map(|r_id| {
                r_id.strip_prefix("rId")
                    .and_then(|n| atoi_simd::parse::<u32>(n.as_bytes()).ok())
            })
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for num in used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {}
            }
        }
        format!("rId{next}")
    }

    /// Serialize the table as a `.rels` document, entries in numeric rId
    /// order for stable output.
    pub fn to_xml(&self) -> String {
        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by_key(|rel| r_id_ordinal(rel.r_id()));

        let mut xml = String::with_capacity(256 + 128 * rels.len());
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in rels {
            xml.push_str("<Relationship Id=\"");
            xml.push_str(&escape_xml(rel.r_id()));
            xml.push_str("\" Type=\"");
            xml.push_str(&escape_xml(rel.reltype()));
            xml.push_str("\" Target=\"");
            xml.push_str(&escape_xml(rel.target_ref()));
            xml.push('"');
            if rel.is_external() {
                xml.push_str(r#" TargetMode="External""#);
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Numeric ordinal of an `rIdN` identifier, non-conforming ids sorting last.
/// Shared by every place that needs rId order independent of map iteration.
pub(crate) fn r_id_ordinal(r_id: &str) -> u32 {
    r_id.strip_prefix("rId")
        .and_then(|n| atoi_simd::parse::<u32>(n.as_bytes()).ok())
        .unwrap_or(u32::MAX)
}

/// Escape XML special characters for element and attribute content.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequential_r_ids() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        assert_eq!(rels.add("type1", "target1", false), "rId1");
        assert_eq!(rels.add("type1", "target2", false), "rId2");
    }

    #[test]
    fn fills_r_id_gaps() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.load("rId1".into(), "t".into(), "a".into(), false);
        rels.load("rId3".into(), "t".into(), "b".into(), false);
        assert_eq!(rels.add("t", "c", false), "rId2");
        assert_eq!(rels.add("t", "d", false), "rId4");
    }

    #[test]
    fn add_never_reuses_for_identical_targets() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        let a = rels.add("type1", "../media/image1.png", false);
        let b = rels.add("type1", "../media/image1.png", false);
        assert_ne!(a, b);
    }

    #[test]
    fn resolves_target_partname() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.load(
            "rId1".into(),
            "layout".into(),
            "../slideLayouts/slideLayout2.xml".into(),
            false,
        );
        let partname = rels.get("rId1").unwrap().target_partname().unwrap();
        assert_eq!(partname.as_str(), "/ppt/slideLayouts/slideLayout2.xml");
    }

    #[test]
    fn external_rel_has_no_partname() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.load(
            "rId1".into(),
            "hyperlink".into(),
            "https://example.com".into(),
            true,
        );
        assert!(rels.get("rId1").unwrap().target_partname().is_err());
    }

    #[test]
    fn serializes_in_numeric_order() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        for i in 1..=11 {
            rels.load(format!("rId{i}"), "t".into(), format!("x{i}.xml"), false);
        }
        let xml = rels.to_xml();
        let pos2 = xml.find(r#"Id="rId2""#).unwrap();
        let pos10 = xml.find(r#"Id="rId10""#).unwrap();
        assert!(pos2 < pos10, "rId2 must precede rId10");
    }

    #[test]
    fn marks_external_target_mode() {
        let mut rels = Relationships::new("/".to_string());
        rels.add("hyperlink", "https://example.com/?a=1&b=2", true);
        let xml = rels.to_xml();
        assert!(xml.contains(r#"TargetMode="External""#));
        assert!(xml.contains("a=1&amp;b=2"));
    }
}
