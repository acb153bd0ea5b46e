//! slidegen - mail-merge slide duplication for OOXML presentations
//!
//! Turns a `.pptx` with one or more template slides containing a marker
//! (default `{{NOMBRE}}`) into a presentation carrying one personalized
//! copy of each template per name, with run formatting, images, and
//! backgrounds preserved. The template slides are removed afterwards.
//!
//! # Example
//!
//! ```no_run
//! use slidegen::merge::{MergeEngine, NameList};
//! use slidegen::pptx::PresentationPackage;
//!
//! # fn main() -> Result<(), slidegen::MergeError> {
//! let package = PresentationPackage::open("deck.pptx")?;
//! let names = NameList::parse("Ana\nLuis\n")?;
//!
//! let mut engine = MergeEngine::new(package);
//! let report = engine.run(&names)?;
//! println!("generated {} slides", report.slides_generated);
//!
//! engine.save("deck-merged.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`opc`]: Open Packaging Conventions container (ZIP, content types,
//!   parts, relationships)
//! - [`xml`]: a small mutable element tree for the parts that get edited
//! - [`pptx`]: the PresentationML view (slide list, cloning)
//! - [`merge`]: the mail-merge itself (scanning, substitution, driver)

pub mod error;
pub mod merge;
pub mod opc;
pub mod pptx;
pub mod xml;

pub use error::{MergeError, Result};
pub use merge::{MergeEngine, MergeOptions, MergeReport, NameList, PlacementPolicy};
pub use pptx::PresentationPackage;
