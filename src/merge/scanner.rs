//! Template discovery: which slides carry the marker.
//!
//! The marker counts as present when it appears in the concatenated run
//! text of any single paragraph, so a marker split across runs by the
//! editor is still found. Scanning covers text bodies of plain shapes;
//! tables, charts, and grouped shapes are out of scope.

use crate::error::Result;
use crate::opc::PackUri;
use crate::pptx::PresentationPackage;
use crate::xml::XmlNode;

/// Partnames of every slide whose text contains `marker`, in slide-list
/// order.
pub fn find_template_slides(
    pkg: &PresentationPackage,
    marker: &str,
) -> Result<Vec<PackUri>> {
    let mut templates = Vec::new();
    for partname in pkg.slide_partnames()? {
        let slide = pkg.slide_xml(&partname)?;
        if slide_contains_marker(&slide, marker) {
            templates.push(partname);
        }
    }
    Ok(templates)
}

/// True when any paragraph of any shape text body contains `marker` in its
/// joined run text.
pub fn slide_contains_marker(slide: &XmlNode, marker: &str) -> bool {
    let Some(tree) = slide.find("cSld").and_then(|c| c.find("spTree")) else {
        return false;
    };
    tree.elements()
        .filter(|e| e.local_name() == "sp")
        .filter_map(|sp| sp.find("txBody"))
        .flat_map(|body| body.elements().filter(|e| e.local_name() == "p"))
        .any(|para| paragraph_text(para).contains(marker))
}

/// Concatenated text of a paragraph's runs, in document order.
pub(crate) fn paragraph_text(para: &XmlNode) -> String {
    let mut text = String::new();
    for run in para.elements().filter(|e| e.local_name() == "r") {
        if let Some(t) = run.find("t") {
            text.push_str(&t.text());
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide_with_runs(runs: &[&str]) -> XmlNode {
        let mut body = String::new();
        for r in runs {
            body.push_str(&format!("<a:r><a:rPr b=\"1\"/><a:t>{r}</a:t></a:r>"));
        }
        XmlNode::parse(
            format!(
                "<p:sld><p:cSld><p:spTree><p:sp><p:txBody><a:p>{body}</a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"
            )
            .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn finds_marker_in_single_run() {
        let slide = slide_with_runs(&["Hola {{NOMBRE}}!"]);
        assert!(slide_contains_marker(&slide, "{{NOMBRE}}"));
    }

    #[test]
    fn finds_marker_split_across_runs() {
        let slide = slide_with_runs(&["Hola {{NOM", "BRE}}", "!"]);
        assert!(slide_contains_marker(&slide, "{{NOMBRE}}"));
    }

    #[test]
    fn marker_split_across_paragraphs_does_not_match() {
        let slide = XmlNode::parse(
            br#"<p:sld><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{{NOM</a:t></a:r></a:p><a:p><a:r><a:t>BRE}}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        assert!(!slide_contains_marker(&slide, "{{NOMBRE}}"));
    }

    #[test]
    fn marker_outside_shape_text_is_ignored() {
        // Marker text in a shape name attribute, not a run.
        let slide = XmlNode::parse(
            br#"<p:sld><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="{{NOMBRE}}"/></p:nvSpPr></p:sp></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        assert!(!slide_contains_marker(&slide, "{{NOMBRE}}"));
    }
}
