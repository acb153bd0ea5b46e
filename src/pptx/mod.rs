//! PresentationML layer: the `.pptx`-specific view over an OPC package.
//!
//! [`PresentationPackage`] owns the package and a parsed copy of the
//! presentation part, [`slides`] manages the ordered slide list, and
//! [`clone`] performs deep slide duplication.

pub mod clone;
pub mod package;
pub mod slides;

pub use clone::{SkippedRel, SlideClone, clone_slide};
pub use package::PresentationPackage;
