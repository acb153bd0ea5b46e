//! Deep slide cloning: shape tree, relationship graph, and background.
//!
//! A clone is a new, fully independent slide part. Its relationship table is
//! rebuilt from the source's (layout and notes references excluded — the
//! clone gets its own layout relationship at creation), every copied shape
//! has its relationship-reference attributes rewritten through the old→new
//! rId map, and embedded media stay shared by reference rather than being
//! duplicated.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::opc::constants::{content_type, relationship_type};
use crate::opc::error::OpcError;
use crate::opc::rel::r_id_ordinal;
use crate::opc::{PackUri, Part, Relationship};
use crate::pptx::package::PresentationPackage;
use crate::xml::XmlNode;

/// The closed set of attribute names that carry relationship references in
/// slide markup: embedded resources, hyperlinks, and generic part
/// references. Matching is by exact qualified name, not suffix.
const REL_REF_ATTRS: [&str; 3] = ["r:embed", "r:link", "r:id"];

/// Markup for a freshly created slide: an empty shape tree, nothing carried
/// over from the layout.
const SLIDE_SKELETON: &str = concat!(
    r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#,
    r#" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#,
    r#" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr/>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:sld>"#,
);

/// A relationship that could not be copied onto a clone. The shape that
/// referenced it keeps a dangling rId; the merge carries on.
#[derive(Debug, Clone)]
pub struct SkippedRel {
    pub r_id: String,
    pub reltype: String,
    pub reason: String,
}

/// Outcome of cloning one slide.
#[derive(Debug)]
pub struct SlideClone {
    /// Partname of the new slide, appended at the tail of the slide list.
    pub partname: PackUri,
    /// Relationships that were dropped instead of copied.
    pub skipped: Vec<SkippedRel>,
}

/// Clone `source` into a new slide appended to the presentation.
///
/// Shape order and visual content mirror the source; every relationship the
/// source held is either remapped onto the clone or recorded in
/// [`SlideClone::skipped`].
pub fn clone_slide(pkg: &mut PresentationPackage, source: &PackUri) -> Result<SlideClone> {
    let source_part = pkg.opc().get_part(source)?;
    let layout_target = source_part
        .rels()
        .rel_of_type(relationship_type::SLIDE_LAYOUT)?
        .target_ref()
        .to_string();
    // Sorted by rId so fresh ids and skip diagnostics come out the same on
    // every run of the same input.
    let mut source_rels: Vec<Relationship> = source_part.rels().iter().cloned().collect();
    source_rels.sort_by_key(|rel| r_id_ordinal(rel.r_id()));
    let source_xml = XmlNode::parse(source_part.blob())?;

    // New part on the source's layout, shape tree empty.
    let new_partname = pkg.opc().next_partname("/ppt/slides/slide%d.xml")?;
    let mut new_part = Part::new(
        new_partname.clone(),
        content_type::PML_SLIDE.to_string(),
        Vec::new(),
    );
    new_part
        .rels_mut()
        .add(relationship_type::SLIDE_LAYOUT, &layout_target, false);

    let (rid_map, skipped) = remap_relationships(pkg, &source_rels, &mut new_part);

    let mut new_xml = XmlNode::parse(SLIDE_SKELETON.as_bytes())?;
    copy_shapes(&source_xml, &mut new_xml, &rid_map)?;
    copy_background(&source_xml, &mut new_xml, &rid_map)?;
    new_part.set_blob(new_xml.to_bytes());

    // Wire the clone into the package: part, presentation rel, slide id.
    pkg.opc_mut().add_part(new_part);
    let pres_partname = pkg.pres_partname().clone();
    let rel_ref = new_partname.relative_ref(pres_partname.base_uri());
    let r_id = pkg
        .pres_part_mut()?
        .rels_mut()
        .add(relationship_type::SLIDE, &rel_ref, false);
    pkg.append_slide_entry(&r_id)?;

    debug!(
        source = %source,
        clone = %new_partname,
        rels = rid_map.len(),
        skipped = skipped.len(),
        "cloned slide"
    );
    Ok(SlideClone {
        partname: new_partname,
        skipped,
    })
}

/// Copy the source's relationships onto the clone, allocating fresh rIds.
///
/// Layout and notes relationships are structural back-references and are not
/// copied: the clone already carries its own layout relationship. Internal
/// targets that cannot be resolved are skipped, not fatal.
fn remap_relationships(
    pkg: &PresentationPackage,
    source_rels: &[Relationship],
    new_part: &mut Part,
) -> (HashMap<String, String>, Vec<SkippedRel>) {
    let mut rid_map = HashMap::with_capacity(source_rels.len());
    let mut skipped = Vec::new();

    for rel in source_rels {
        if rel.reltype() == relationship_type::SLIDE_LAYOUT
            || rel.reltype() == relationship_type::NOTES_SLIDE
        {
            continue;
        }

        if rel.is_external() {
            let new_id = new_part
                .rels_mut()
                .add(rel.reltype(), rel.target_ref(), true);
            rid_map.insert(rel.r_id().to_string(), new_id);
            continue;
        }

        // Internal: point the clone at the same target part, shared by
        // reference.
        match rel.target_partname() {
            Ok(target) if pkg.opc().contains_part(&target) => {
                let new_id = new_part
                    .rels_mut()
                    .add(rel.reltype(), rel.target_ref(), false);
                rid_map.insert(rel.r_id().to_string(), new_id);
            }
            Ok(target) => skipped.push(SkippedRel {
                r_id: rel.r_id().to_string(),
                reltype: rel.reltype().to_string(),
                reason: format!("target part {target} not in package"),
            }),
            Err(e) => skipped.push(SkippedRel {
                r_id: rel.r_id().to_string(),
                reltype: rel.reltype().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    (rid_map, skipped)
}

/// Deep-copy every shape of the source into the clone's shape tree,
/// preserving order, rewriting rId references, and inserting before any
/// trailing extension list.
fn copy_shapes(
    source_xml: &XmlNode,
    new_xml: &mut XmlNode,
    rid_map: &HashMap<String, String>,
) -> Result<()> {
    let src_tree = source_xml
        .find("cSld")
        .and_then(|c| c.find("spTree"))
        .ok_or_else(|| OpcError::Xml("slide has no shape tree".to_string()))?;
    let shapes: Vec<XmlNode> = src_tree
        .elements()
        .filter(|e| !matches!(e.local_name(), "nvGrpSpPr" | "grpSpPr" | "extLst"))
        .cloned()
        .collect();

    let dst_tree = new_xml
        .find_mut("cSld")
        .and_then(|c| c.find_mut("spTree"))
        .ok_or_else(|| OpcError::Xml("clone skeleton has no shape tree".to_string()))?;

    for mut shape in shapes {
        rewrite_rel_refs(&mut shape, rid_map);
        let at = dst_tree
            .elements()
            .position(|e| e.local_name() == "extLst")
            .unwrap_or(dst_tree.element_count());
        dst_tree.insert_element(at, shape);
    }
    Ok(())
}

/// Copy the source's background fill, if any, rewriting rId references. The
/// background must be the first child of `p:cSld`.
fn copy_background(
    source_xml: &XmlNode,
    new_xml: &mut XmlNode,
    rid_map: &HashMap<String, String>,
) -> Result<()> {
    let Some(bg) = source_xml.find("cSld").and_then(|c| c.find("bg")) else {
        return Ok(());
    };
    let mut copy = bg.clone();
    rewrite_rel_refs(&mut copy, rid_map);

    let dst_csld = new_xml
        .find_mut("cSld")
        .ok_or_else(|| OpcError::Xml("clone skeleton has no cSld".to_string()))?;
    dst_csld.insert_element(0, copy);
    Ok(())
}

/// Rewrite every relationship-reference attribute in the subtree through the
/// rId map. Unmapped values are left unchanged: they belong to relationships
/// intentionally not copied (layout, notes) or skipped on failure.
fn rewrite_rel_refs(node: &mut XmlNode, rid_map: &HashMap<String, String>) {
    node.for_each_element_mut(&mut |el| {
        for attr_name in REL_REF_ATTRS {
            if let Some(new_id) = el.attr(attr_name).and_then(|v| rid_map.get(v)).cloned() {
                el.set_attr(attr_name, &new_id);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_has_empty_shape_tree() {
        let xml = XmlNode::parse(SLIDE_SKELETON.as_bytes()).unwrap();
        let tree = xml.find("cSld").unwrap().find("spTree").unwrap();
        let extra: Vec<&str> = tree
            .elements()
            .map(|e| e.local_name())
            .filter(|n| !matches!(*n, "nvGrpSpPr" | "grpSpPr"))
            .collect();
        assert!(extra.is_empty(), "unexpected shapes in skeleton: {extra:?}");
    }

    #[test]
    fn rewrites_only_mapped_reference_attrs() {
        let mut shape = XmlNode::parse(
            br#"<p:pic><a:blip r:embed="rId2" cstate="print"/><a:hlinkClick r:id="rId7"/></p:pic>"#,
        )
        .unwrap();
        let mut map = HashMap::new();
        map.insert("rId2".to_string(), "rId5".to_string());

        rewrite_rel_refs(&mut shape, &map);

        assert_eq!(shape.find("blip").unwrap().attr("r:embed"), Some("rId5"));
        // Unmapped reference left as-is.
        assert_eq!(shape.find("hlinkClick").unwrap().attr("r:id"), Some("rId7"));
        // Non-reference attributes untouched even when the value matches.
        assert_eq!(shape.find("blip").unwrap().attr("cstate"), Some("print"));
    }

    #[test]
    fn shapes_insert_before_extension_list() {
        let source = XmlNode::parse(
            br#"<p:sld><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/><p:sp n="a"/><p:sp n="b"/></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        let mut dest = XmlNode::parse(
            br#"<p:sld><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/><p:extLst/></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();

        copy_shapes(&source, &mut dest, &HashMap::new()).unwrap();

        let names: Vec<&str> = dest
            .find("cSld")
            .unwrap()
            .find("spTree")
            .unwrap()
            .elements()
            .map(|e| e.local_name())
            .collect();
        assert_eq!(names, ["nvGrpSpPr", "grpSpPr", "sp", "sp", "extLst"]);
    }

    #[test]
    fn background_installs_as_first_csld_child() {
        let source = XmlNode::parse(
            br#"<p:sld><p:cSld><p:bg><p:bgPr/></p:bg><p:spTree/></p:cSld></p:sld>"#,
        )
        .unwrap();
        let mut dest = XmlNode::parse(SLIDE_SKELETON.as_bytes()).unwrap();

        copy_background(&source, &mut dest, &HashMap::new()).unwrap();

        let first = dest.find("cSld").unwrap().elements().next().unwrap();
        assert_eq!(first.local_name(), "bg");
    }
}
