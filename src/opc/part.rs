//! Package parts: the addressable units of content in an OPC package.

use crate::opc::packuri::PackUri;
use crate::opc::rel::Relationships;

/// One part of an OPC package: a slide, a layout, an embedded image.
///
/// The content is held as raw bytes; XML parts are parsed into a tree on
/// demand and written back after mutation. Each part owns its relationship
/// table.
#[derive(Debug)]
pub struct Part {
    partname: PackUri,
    content_type: String,
    blob: Vec<u8>,
    rels: Relationships,
}

impl Part {
    /// Create a part with an empty relationship table.
    pub fn new(partname: PackUri, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    #[inline]
    pub fn partname(&self) -> &PackUri {
        &self.partname
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Replace the part content, after re-serializing a mutated XML tree.
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }
}
