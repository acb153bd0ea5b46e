//! Slide list management: splicing the ordered `p:sldIdLst`.
//!
//! Positions in the slide list shift on every insert and delete, so they are
//! never cached across operations: callers track a slide by its partname and
//! translate to a live position with [`PresentationPackage::position_of`]
//! immediately before each splice.

use crate::error::Result;
use crate::opc::constants::relationship_type;
use crate::opc::error::OpcError;
use crate::opc::{PackUri, Part};
use crate::pptx::package::PresentationPackage;
use crate::xml::XmlNode;

impl PresentationPackage {
    /// Current position of a slide in the presentation order, by stable part
    /// identity.
    pub fn position_of(&self, partname: &PackUri) -> Result<Option<usize>> {
        Ok(self
            .slide_partnames()?
            .iter()
            .position(|p| p == partname))
    }

    /// Move the slide at `from` to position `to`, with delete-then-insert
    /// splice semantics: `to` indexes the list as it stands after removal.
    pub fn move_slide(&mut self, from: usize, to: usize) -> Result<()> {
        let list = self.sld_id_lst_mut()?;
        let entry = list
            .remove_element(from)
            .ok_or_else(|| OpcError::PartNotFound(format!("no slide at position {from}")))?;
        let clamped = to.min(list.element_count());
        list.insert_element(clamped, entry);
        Ok(())
    }

    /// Delete the slide at `index`: drops the presentation-part relationship,
    /// the list entry, the slide part, and the slide's notes part. A notes
    /// part belongs to exactly one slide and would otherwise survive with a
    /// back-reference to a part that no longer exists.
    ///
    /// When deleting several slides in one pass, delete in strictly
    /// descending position order so pending targets do not shift.
    pub fn delete_slide(&mut self, index: usize) -> Result<()> {
        let list = self.sld_id_lst_mut()?;
        let entry = list
            .remove_element(index)
            .ok_or_else(|| OpcError::PartNotFound(format!("no slide at position {index}")))?;

        if let Some(r_id) = entry.attr("r:id") {
            let r_id = r_id.to_string();
            let removed = self.pres_part_mut()?.rels_mut().remove(&r_id);
            if let Some(rel) = removed {
                if let Ok(target) = rel.target_partname() {
                    if let Some(slide) = self.opc_mut().remove_part(&target) {
                        self.remove_notes_part(&slide);
                    }
                }
            }
        }
        Ok(())
    }

    fn remove_notes_part(&mut self, slide: &Part) {
        if let Ok(notes_rel) = slide.rels().rel_of_type(relationship_type::NOTES_SLIDE) {
            if let Ok(notes) = notes_rel.target_partname() {
                self.opc_mut().remove_part(&notes);
            }
        }
    }

    /// Append a slide id entry for an already-registered slide relationship.
    ///
    /// Newly cloned slides always enter the presentation at the tail; the
    /// merge engine moves them afterwards when its placement policy asks for
    /// it.
    pub fn append_slide_entry(&mut self, r_id: &str) -> Result<()> {
        let next_id = self.max_slide_id().max(255) + 1;
        let list = self.sld_id_lst_mut()?;

        // Reuse the list's namespace prefix for the new entry.
        let name = match list.name().rfind(':') {
            Some(pos) => format!("{}:sldId", &list.name()[..pos]),
            None => "sldId".to_string(),
        };
        let mut entry = XmlNode::new(name);
        entry.set_attr("id", &next_id.to_string());
        entry.set_attr("r:id", r_id);
        list.push_element(entry);
        Ok(())
    }

    /// Highest slide id currently in use. PresentationML requires ids of at
    /// least 256, which `append_slide_entry` enforces on top of this.
    fn max_slide_id(&self) -> u32 {
        self.sld_id_lst()
            .map(|list| {
                list.elements()
                    .filter(|e| e.local_name() == "sldId")
                    .filter_map(|e| e.attr("id"))
                    .filter_map(|id| atoi_simd::parse::<u32>(id.as_bytes()).ok())
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::opc::constants::{content_type, relationship_type};
    use crate::opc::{OpcPackage, PackUri, Part};
    use crate::pptx::package::PresentationPackage;

    /// Build an in-memory presentation with `n` empty slides.
    fn presentation_with_slides(n: usize) -> PresentationPackage {
        let mut opc = OpcPackage::new();

        let mut pres_xml = String::from(
            r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>"#,
        );
        let pres_partname = PackUri::new("/ppt/presentation.xml").unwrap();
        let mut pres_part = Part::new(
            pres_partname,
            content_type::PML_PRESENTATION_MAIN.to_string(),
            Vec::new(),
        );

        for i in 1..=n {
            let slide_partname = PackUri::new(format!("/ppt/slides/slide{i}.xml")).unwrap();
            let slide = Part::new(
                slide_partname,
                content_type::PML_SLIDE.to_string(),
                br#"<p:sld xmlns:p="ns"><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/></p:spTree></p:cSld></p:sld>"#
                    .to_vec(),
            );
            let r_id = pres_part.rels_mut().add(
                relationship_type::SLIDE,
                &format!("slides/slide{i}.xml"),
                false,
            );
            pres_xml.push_str(&format!(r#"<p:sldId id="{}" r:id="{r_id}"/>"#, 255 + i));
            opc.add_part(slide);
        }
        pres_xml.push_str("</p:sldIdLst></p:presentation>");

        pres_part.set_blob(pres_xml.into_bytes());
        opc.add_part(pres_part);
        opc.rels_mut()
            .add(relationship_type::OFFICE_DOCUMENT, "ppt/presentation.xml", false);

        PresentationPackage::from_bytes(&opc.to_bytes().unwrap()).unwrap()
    }

    fn positions(pkg: &PresentationPackage) -> Vec<String> {
        pkg.slide_partnames()
            .unwrap()
            .iter()
            .map(|p| p.filename().to_string())
            .collect()
    }

    #[test]
    fn move_uses_after_removal_indices() {
        let mut pkg = presentation_with_slides(4);
        // Move tail to position 1.
        pkg.move_slide(3, 1).unwrap();
        assert_eq!(
            positions(&pkg),
            ["slide1.xml", "slide4.xml", "slide2.xml", "slide3.xml"]
        );

        // Move head to the tail: index 3 is the end of the 3-entry remainder.
        pkg.move_slide(0, 3).unwrap();
        assert_eq!(
            positions(&pkg),
            ["slide4.xml", "slide2.xml", "slide3.xml", "slide1.xml"]
        );
    }

    #[test]
    fn delete_removes_entry_rel_and_part() {
        let mut pkg = presentation_with_slides(3);
        let second = PackUri::new("/ppt/slides/slide2.xml").unwrap();
        assert!(pkg.opc().contains_part(&second));

        pkg.delete_slide(1).unwrap();
        assert_eq!(positions(&pkg), ["slide1.xml", "slide3.xml"]);
        assert!(!pkg.opc().contains_part(&second));
        assert_eq!(pkg.slide_count(), 2);
    }

    #[test]
    fn delete_removes_the_slides_notes_part() {
        let mut pkg = presentation_with_slides(2);
        let notes = PackUri::new("/ppt/notesSlides/notesSlide1.xml").unwrap();
        pkg.opc_mut().add_part(Part::new(
            notes.clone(),
            content_type::PML_NOTES_SLIDE.to_string(),
            b"<p:notes/>".to_vec(),
        ));
        let slide1 = PackUri::new("/ppt/slides/slide1.xml").unwrap();
        pkg.opc_mut()
            .get_part_mut(&slide1)
            .unwrap()
            .rels_mut()
            .add(
                relationship_type::NOTES_SLIDE,
                "../notesSlides/notesSlide1.xml",
                false,
            );

        pkg.delete_slide(0).unwrap();

        assert!(!pkg.opc().contains_part(&slide1));
        assert!(!pkg.opc().contains_part(&notes));
        assert_eq!(positions(&pkg), ["slide2.xml"]);
    }

    #[test]
    fn descending_deletes_remove_exactly_the_targets() {
        let mut pkg = presentation_with_slides(7);
        for index in [5, 2, 0] {
            pkg.delete_slide(index).unwrap();
        }
        assert_eq!(
            positions(&pkg),
            ["slide2.xml", "slide4.xml", "slide5.xml", "slide7.xml"]
        );
    }

    #[test]
    fn position_tracks_moves() {
        let mut pkg = presentation_with_slides(3);
        let third = PackUri::new("/ppt/slides/slide3.xml").unwrap();
        assert_eq!(pkg.position_of(&third).unwrap(), Some(2));
        pkg.move_slide(2, 0).unwrap();
        assert_eq!(pkg.position_of(&third).unwrap(), Some(0));
    }

    #[test]
    fn appended_entries_get_fresh_ids() {
        let mut pkg = presentation_with_slides(2);
        let r_id = {
            let pres = pkg.pres_part_mut().unwrap();
            pres.rels_mut().add(
                crate::opc::constants::relationship_type::SLIDE,
                "slides/slide9.xml",
                false,
            )
        };
        pkg.append_slide_entry(&r_id).unwrap();

        let list = pkg.sld_id_lst().unwrap();
        let ids: Vec<&str> = list.elements().filter_map(|e| e.attr("id")).collect();
        assert_eq!(ids, ["256", "257", "258"]);
    }
}
