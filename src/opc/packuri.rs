//! The `PackUri` value type: a part name within an OPC package.
//!
//! Pack URIs always begin with a forward slash and use forward slashes as
//! path separators, per the Open Packaging Conventions. The type exposes the
//! pieces this crate needs: directory, filename, membername for the ZIP
//! archive, relative-reference resolution, and the derived `.rels` URI.

use crate::opc::error::{OpcError, Result};

/// The package pseudo-partname, representing the package itself.
pub const PACKAGE_URI: &str = "/";

/// The URI of the content-types stream.
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// A part name within an OPC package, e.g. `/ppt/slides/slide1.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackUri {
    uri: String,
}

impl PackUri {
    /// Create a new `PackUri`. The URI must begin with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "pack URI must begin with '/', got '{uri}'"
            )));
        }
        Ok(PackUri { uri })
    }

    /// Resolve a relative reference (e.g. `../slideLayouts/slideLayout1.xml`)
    /// against a base URI (e.g. `/ppt/slides`) into an absolute `PackUri`.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = if base_uri.ends_with('/') {
            format!("{base_uri}{relative_ref}")
        } else {
            format!("{base_uri}/{relative_ref}")
        };
        Self::new(normalize(&joined))
    }

    /// The directory portion, e.g. `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// The filename portion, e.g. `slide1.xml`. Empty for the package root.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// The extension without its leading period, e.g. `xml`.
    pub fn ext(&self) -> &str {
        match self.filename().rfind('.') {
            Some(pos) => &self.filename()[pos + 1..],
            None => "",
        }
    }

    /// The ZIP membername: the URI with its leading slash stripped.
    pub fn membername(&self) -> &str {
        if self.uri == "/" { "" } else { &self.uri[1..] }
    }

    /// The relative reference from `base_uri` to this URI, e.g.
    /// `../slideLayouts/slideLayout1.xml` from `/ppt/slides`.
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();
        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = String::new();
        for _ in common..from.len() {
            result.push_str("../");
        }
        for (i, part) in to.iter().enumerate().skip(common) {
            if i > common {
                result.push('/');
            }
            result.push_str(part);
        }
        result
    }

    /// The URI of the `.rels` part holding this part's relationships, e.g.
    /// `/ppt/slides/_rels/slide1.xml.rels` for `/ppt/slides/slide1.xml`.
    pub fn rels_uri(&self) -> Result<PackUri> {
        let rels = if self.base_uri() == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", self.base_uri(), self.filename())
        };
        Self::new(rels)
    }

    /// The full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl std::fmt::Display for PackUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackUri {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// Resolve `.` and `..` segments.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {
                if parts.is_empty() {
                    parts.push("");
                }
            }
            ".." => {
                if parts.len() > 1 {
                    parts.pop();
                }
            }
            _ => parts.push(part),
        }
    }
    if parts.len() <= 1 {
        return "/".to_string();
    }
    parts.join("/")
}
