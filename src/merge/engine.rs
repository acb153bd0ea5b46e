//! The merge driver: scan, clone, substitute, place, clean up.
//!
//! Generation is template-major: for each template slide in presentation
//! order, one clone per name in list order. Templates are deleted only
//! after every clone exists, in descending position order so earlier
//! deletions never shift a pending target.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{MergeError, Result};
use crate::merge::scanner::find_template_slides;
use crate::merge::substitute::substitute_marker;
use crate::merge::{Diagnostic, MergeOptions, MergeReport, NameList, PlacementPolicy};
use crate::opc::PackUri;
use crate::opc::error::OpcError;
use crate::pptx::{PresentationPackage, clone_slide};

/// Runs a mail-merge over a presentation, consuming template slides and
/// producing one personalized copy per template per name.
pub struct MergeEngine {
    package: PresentationPackage,
    options: MergeOptions,
}

impl MergeEngine {
    pub fn new(package: PresentationPackage) -> Self {
        Self::with_options(package, MergeOptions::default())
    }

    pub fn with_options(package: PresentationPackage, options: MergeOptions) -> Self {
        MergeEngine { package, options }
    }

    /// Execute the merge. On success the package holds the generated slides
    /// and no template slides; on error the package state is unspecified and
    /// should not be saved.
    pub fn run(&mut self, names: &NameList) -> Result<MergeReport> {
        if names.is_empty() {
            return Err(MergeError::EmptyNameList);
        }

        let templates = find_template_slides(&self.package, &self.options.marker)?;
        if templates.is_empty() {
            return Err(MergeError::MarkerNotFound {
                marker: self.options.marker.clone(),
            });
        }
        debug!(
            templates = templates.len(),
            names = names.len(),
            marker = %self.options.marker,
            "starting merge"
        );

        let mut report = MergeReport::default();
        for template in &templates {
            for (offset, name) in names.names().iter().enumerate() {
                self.generate_one(template, name, offset, &mut report)?;
            }
        }
        report.slides_generated = templates.len() * names.len();

        self.delete_templates(&templates)?;
        debug!(
            generated = report.slides_generated,
            diagnostics = report.diagnostics.len(),
            "merge finished"
        );
        Ok(report)
    }

    /// Clone `template`, substitute the marker with `name`, and place the
    /// clone according to the placement policy. `offset` is the name's index
    /// in the list, used to keep clones in name order after the template.
    fn generate_one(
        &mut self,
        template: &PackUri,
        name: &str,
        offset: usize,
        report: &mut MergeReport,
    ) -> Result<()> {
        let clone = clone_slide(&mut self.package, template)?;
        for skip in clone.skipped {
            warn!(
                slide = %template,
                r_id = %skip.r_id,
                reason = %skip.reason,
                "relationship skipped during clone"
            );
            report.diagnostics.push(Diagnostic::RelationshipSkipped {
                slide: template.clone(),
                r_id: skip.r_id,
                reason: skip.reason,
            });
        }

        let mut slide = self.package.slide_xml(&clone.partname)?;
        let replaced = substitute_marker(&mut slide, &self.options.marker, name);
        self.package.set_slide_xml(&clone.partname, &slide)?;
        if !replaced {
            warn!(slide = %clone.partname, name, "marker not replaced in clone");
            report.diagnostics.push(Diagnostic::MarkerNotReplaced {
                name: name.to_string(),
                slide: clone.partname.clone(),
            });
        }

        if self.options.placement == PlacementPolicy::InsertAfterTemplate {
            // Positions are resolved live: prior moves and clones have
            // shifted the list since the scan.
            let template_pos = self.package.position_of(template)?.ok_or_else(|| {
                OpcError::PartNotFound(format!("template slide {template} left the slide list"))
            })?;
            let from = self
                .package
                .position_of(&clone.partname)?
                .unwrap_or_else(|| self.package.slide_count().saturating_sub(1));
            let to = template_pos + 1 + offset;
            if from != to {
                self.package.move_slide(from, to)?;
            }
        }
        Ok(())
    }

    /// Remove every template slide, always deleting the one at the highest
    /// live position first.
    fn delete_templates(&mut self, templates: &[PackUri]) -> Result<()> {
        let mut remaining: Vec<&PackUri> = templates.iter().collect();
        while !remaining.is_empty() {
            let mut highest: Option<(usize, usize)> = None;
            for (i, template) in remaining.iter().enumerate() {
                if let Some(pos) = self.package.position_of(template)? {
                    if highest.is_none_or(|(p, _)| pos > p) {
                        highest = Some((pos, i));
                    }
                }
            }
            let Some((pos, i)) = highest else {
                break;
            };
            debug!(template = %remaining[i], position = pos, "deleting template slide");
            self.package.delete_slide(pos)?;
            remaining.swap_remove(i);
        }
        Ok(())
    }

    pub fn package(&self) -> &PresentationPackage {
        &self.package
    }

    /// Serialize the merged presentation.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.package.to_bytes()
    }

    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.package.save(path)
    }

    pub fn into_package(self) -> PresentationPackage {
        self.package
    }
}
