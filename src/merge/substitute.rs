//! Marker substitution with run-formatting preservation.
//!
//! Two tiers. The exact-run pass handles the common case where the editor
//! kept the marker inside one run: the run's text is edited in place and
//! every formatting property survives untouched. When the editor fragmented
//! the marker across runs, no single run matches and the fallback pass
//! collapses each affected paragraph onto its first run, which donates its
//! formatting to the joined, substituted text. The fallback only fires when
//! the exact pass changed nothing anywhere on the slide, so a slide with
//! one clean and one fragmented occurrence keeps the clean one pristine.

use crate::merge::scanner::paragraph_text;
use crate::xml::XmlNode;

/// Replace every occurrence of `marker` with `name` in the slide's shape
/// text. Returns whether any text changed.
pub fn substitute_marker(slide: &mut XmlNode, marker: &str, name: &str) -> bool {
    let mut replaced = false;
    for_each_paragraph(slide, &mut |para| {
        replaced |= exact_run_pass(para, marker, name);
    });
    if replaced {
        return true;
    }
    for_each_paragraph(slide, &mut |para| {
        replaced |= fragmented_pass(para, marker, name);
    });
    replaced
}

fn for_each_paragraph<F: FnMut(&mut XmlNode)>(slide: &mut XmlNode, f: &mut F) {
    let Some(tree) = slide.find_mut("cSld").and_then(|c| c.find_mut("spTree")) else {
        return;
    };
    for sp in tree.elements_mut().filter(|e| e.local_name() == "sp") {
        if let Some(body) = sp.find_mut("txBody") {
            for para in body.elements_mut().filter(|e| e.local_name() == "p") {
                f(para);
            }
        }
    }
}

/// Tier one: edit runs whose own text contains the whole marker.
fn exact_run_pass(para: &mut XmlNode, marker: &str, name: &str) -> bool {
    let mut replaced = false;
    for run in para.elements_mut().filter(|e| e.local_name() == "r") {
        if let Some(t) = run.find_mut("t") {
            let text = t.text();
            if text.contains(marker) {
                t.set_text(&text.replace(marker, name));
                replaced = true;
            }
        }
    }
    replaced
}

/// Tier two: the marker spans runs. Collapse the paragraph's runs onto the
/// first one, formatting included, and give it the substituted joined text.
fn fragmented_pass(para: &mut XmlNode, marker: &str, name: &str) -> bool {
    let joined = paragraph_text(para);
    if !joined.contains(marker) {
        return false;
    }

    let mut seen_first = false;
    para.retain_elements(|e| {
        if e.local_name() != "r" {
            return true;
        }
        if seen_first {
            return false;
        }
        seen_first = true;
        true
    });

    let Some(first) = para.elements_mut().find(|e| e.local_name() == "r") else {
        return false;
    };
    let new_text = joined.replace(marker, name);
    if let Some(t) = first.find_mut("t") {
        t.set_text(&new_text);
    } else {
        // Namespace prefix follows the run's own qualified name.
        let t_name = match first.name().split_once(':') {
            Some((prefix, _)) => format!("{prefix}:t"),
            None => "t".to_string(),
        };
        let mut t = XmlNode::new(t_name);
        t.set_text(&new_text);
        first.push_element(t);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(runs: &[(&str, &str)]) -> XmlNode {
        let mut body = String::new();
        for (props, text) in runs {
            body.push_str(&format!("<a:r><a:rPr {props}/><a:t>{text}</a:t></a:r>"));
        }
        XmlNode::parse(format!("<a:p>{body}</a:p>").as_bytes()).unwrap()
    }

    fn slide_of(para: XmlNode) -> XmlNode {
        let mut slide = XmlNode::parse(
            br#"<p:sld><p:cSld><p:spTree><p:sp><p:txBody/></p:sp></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        slide
            .find_mut("cSld")
            .unwrap()
            .find_mut("spTree")
            .unwrap()
            .find_mut("sp")
            .unwrap()
            .find_mut("txBody")
            .unwrap()
            .push_element(para);
        slide
    }

    fn run_texts(slide: &XmlNode) -> Vec<String> {
        let para = slide
            .find("cSld")
            .unwrap()
            .find("spTree")
            .unwrap()
            .find("sp")
            .unwrap()
            .find("txBody")
            .unwrap()
            .find("p")
            .unwrap();
        para.elements()
            .filter(|e| e.local_name() == "r")
            .map(|r| r.find("t").map(|t| t.text()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn exact_run_keeps_sibling_runs() {
        let mut slide = slide_of(paragraph(&[
            ("b=\"1\"", "Hola "),
            ("i=\"1\"", "{{NOMBRE}}"),
            ("u=\"sng\"", "!"),
        ]));
        assert!(substitute_marker(&mut slide, "{{NOMBRE}}", "Ana"));
        assert_eq!(run_texts(&slide), ["Hola ", "Ana", "!"]);
    }

    #[test]
    fn exact_run_preserves_surrounding_text_in_run() {
        let mut slide = slide_of(paragraph(&[("b=\"1\"", "Hola {{NOMBRE}}!")]));
        assert!(substitute_marker(&mut slide, "{{NOMBRE}}", "Luis"));
        assert_eq!(run_texts(&slide), ["Hola Luis!"]);
    }

    #[test]
    fn fragmented_marker_collapses_onto_first_run() {
        let mut slide = slide_of(paragraph(&[
            ("b=\"1\"", "Hola {{NOM"),
            ("i=\"1\"", "BRE}}"),
            ("u=\"sng\"", "!"),
        ]));
        assert!(substitute_marker(&mut slide, "{{NOMBRE}}", "Ana"));
        assert_eq!(run_texts(&slide), ["Hola Ana!"]);

        // First run's formatting survives the collapse.
        let para = slide
            .find("cSld")
            .unwrap()
            .find("spTree")
            .unwrap()
            .find("sp")
            .unwrap()
            .find("txBody")
            .unwrap()
            .find("p")
            .unwrap();
        let first = para.elements().find(|e| e.local_name() == "r").unwrap();
        assert_eq!(first.find("rPr").unwrap().attr("b"), Some("1"));
    }

    #[test]
    fn fallback_does_not_fire_when_exact_pass_matched() {
        // One clean occurrence on the slide: the fragmented-looking
        // paragraph elsewhere must stay untouched.
        let mut slide = XmlNode::parse(
            br#"<p:sld><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{{NOMBRE}}</a:t></a:r></a:p><a:p><a:r><a:t>keep</a:t></a:r><a:r><a:t> me</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        assert!(substitute_marker(&mut slide, "{{NOMBRE}}", "Ana"));
        let body = slide
            .find("cSld")
            .unwrap()
            .find("spTree")
            .unwrap()
            .find("sp")
            .unwrap()
            .find("txBody")
            .unwrap();
        let second = body.elements().nth(1).unwrap();
        assert_eq!(second.element_count(), 2);
    }

    #[test]
    fn no_marker_means_no_change() {
        let mut slide = slide_of(paragraph(&[("b=\"1\"", "plain text")]));
        assert!(!substitute_marker(&mut slide, "{{NOMBRE}}", "Ana"));
        assert_eq!(run_texts(&slide), ["plain text"]);
    }

    #[test]
    fn whitespace_between_runs_is_preserved() {
        let mut slide = slide_of(paragraph(&[("b=\"1\"", "  {{NOMBRE}}  ")]));
        assert!(substitute_marker(&mut slide, "{{NOMBRE}}", "Ana"));
        assert_eq!(run_texts(&slide), ["  Ana  "]);
    }

    use proptest::prelude::*;

    proptest! {
        // However the editor fragments the paragraph into runs, the joined
        // text after substitution is the source text with the marker
        // replaced.
        #[test]
        fn any_run_split_substitutes_cleanly(
            name in "[A-Za-z]{1,12}",
            cuts in proptest::collection::vec(1usize..27, 0..4),
        ) {
            let text = "Hola {{NOMBRE}}, bienvenido";
            let mut points: Vec<usize> = cuts.into_iter().filter(|&c| c < text.len()).collect();
            points.sort_unstable();
            points.dedup();

            let mut runs: Vec<(&str, &str)> = Vec::new();
            let mut prev = 0;
            for p in points {
                runs.push(("b=\"1\"", &text[prev..p]));
                prev = p;
            }
            runs.push(("b=\"1\"", &text[prev..]));

            let mut slide = slide_of(paragraph(&runs));
            prop_assert!(substitute_marker(&mut slide, "{{NOMBRE}}", &name));
            prop_assert_eq!(
                run_texts(&slide).concat(),
                format!("Hola {name}, bienvenido")
            );
        }
    }
}
