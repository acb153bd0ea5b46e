//! Open Packaging Conventions (OPC) container layer.
//!
//! Implements the subset of the OPC specification a slide merge needs:
//! ZIP-backed packages, parts with per-part relationship tables, content
//! type discovery, and package serialization. Parsing uses `quick-xml`
//! streaming events; the container is read and written with the `zip` crate.

pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

pub use error::OpcError;
pub use package::OpcPackage;
pub use packuri::PackUri;
pub use part::Part;
pub use rel::{Relationship, Relationships};
