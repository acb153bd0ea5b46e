//! A small mutable XML element tree.
//!
//! Slide markup is cloned, rewritten, and spliced structurally; streaming
//! events are not enough for that, so XML parts are parsed into this tree,
//! mutated, and serialized back into their part blobs. Names are kept as
//! written (qualified, e.g. `p:sp`); lookups match on the local part, the
//! way the rest of the crate matches element names. Text is stored
//! unescaped and untrimmed: run text whitespace is significant.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::opc::error::{OpcError, Result};
use crate::opc::rel::escape_xml;

/// One child slot of an element: a nested element or a text node.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlContent {
    Element(XmlNode),
    Text(String),
}

/// A mutable XML element: qualified name, attributes in document order,
/// children. `Clone` gives the deep copy the slide cloner is built on.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlContent>,
}

impl XmlNode {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a document into its root element.
    pub fn parse(xml: &[u8]) -> Result<XmlNode> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => stack.push(Self::from_start(e)?),
                Ok(Event::Empty(ref e)) => {
                    let node = Self::from_start(e)?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| OpcError::Xml("unbalanced end tag".to_string()))?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::Text(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = e.decode().map_err(|err| OpcError::Xml(err.to_string()))?;
                        parent.push_text(&text);
                    }
                }
                // Entity references arrive as their own events, between the
                // surrounding text pieces.
                Ok(Event::GeneralRef(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let mut utf8 = [0u8; 4];
                        let resolved: &str = if let Some(ch) = e
                            .resolve_char_ref()
                            .map_err(|err| OpcError::Xml(err.to_string()))?
                        {
                            ch.encode_utf8(&mut utf8)
                        } else {
                            let entity: &[u8] = e.as_ref();
                            match entity {
                                b"amp" => "&",
                                b"lt" => "<",
                                b"gt" => ">",
                                b"quot" => "\"",
                                b"apos" => "'",
                                name => {
                                    return Err(OpcError::Xml(format!(
                                        "unknown entity reference: &{};",
                                        String::from_utf8_lossy(name)
                                    )));
                                }
                            }
                        };
                        parent.push_text(resolved);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = std::str::from_utf8(e.as_ref())?;
                        parent.push_text(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::Xml(format!("XML parse error: {e}"))),
                Ok(_) => {}
            }
            buf.clear();
        }

        root.ok_or_else(|| OpcError::Xml("document has no root element".to_string()))
    }

    fn from_start(e: &BytesStart) -> Result<XmlNode> {
        let name = std::str::from_utf8(e.name().as_ref())?.to_string();
        let mut node = XmlNode::new(name);
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            node.attrs.push((key, value));
        }
        Ok(node)
    }

    fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(XmlContent::Element(node));
            Ok(())
        } else if root.is_none() {
            *root = Some(node);
            Ok(())
        } else {
            Err(OpcError::Xml("multiple root elements".to_string()))
        }
    }

    /// Serialize as a standalone document, declaration included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::with_capacity(1024);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        self.write_into(&mut out);
        out.into_bytes()
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlContent::Element(node) => node.write_into(out),
                XmlContent::Text(text) => out.push_str(&escape_text(text)),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Qualified name as written, e.g. `p:spTree`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its prefix, e.g. `spTree`.
    pub fn local_name(&self) -> &str {
        match self.name.rfind(':') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set or append an attribute, keeping document order for existing ones.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            slot.1 = value.to_string();
        } else {
            self.attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[XmlContent] {
        &self.children
    }

    /// Child elements in document order, text nodes skipped.
    pub fn elements(&self) -> impl Iterator<Item = &XmlNode> {
        self.children.iter().filter_map(|c| match c {
            XmlContent::Element(node) => Some(node),
            XmlContent::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlNode> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlContent::Element(node) => Some(node),
            XmlContent::Text(_) => None,
        })
    }

    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    /// First child element with the given local name.
    pub fn find(&self, local_name: &str) -> Option<&XmlNode> {
        self.elements().find(|node| node.local_name() == local_name)
    }

    pub fn find_mut(&mut self, local_name: &str) -> Option<&mut XmlNode> {
        self.elements_mut()
            .find(|node| node.local_name() == local_name)
    }

    /// Append a child element.
    pub fn push_element(&mut self, node: XmlNode) {
        self.children.push(XmlContent::Element(node));
    }

    /// Insert a child element at the given position among element children
    /// (text nodes do not shift the index). `index == element_count()`
    /// appends.
    pub fn insert_element(&mut self, index: usize, node: XmlNode) {
        let at = self
            .element_child_slot(index)
            .unwrap_or(self.children.len());
        self.children.insert(at, XmlContent::Element(node));
    }

    /// Remove the child element at the given element position.
    pub fn remove_element(&mut self, index: usize) -> Option<XmlNode> {
        let at = self.element_child_slot(index)?;
        if let XmlContent::Element(node) = self.children.remove(at) {
            Some(node)
        } else {
            None
        }
    }

    /// Retain only the child elements the predicate accepts; text nodes stay.
    pub fn retain_elements<F: FnMut(&XmlNode) -> bool>(&mut self, mut keep: F) {
        self.children.retain(|child| match child {
            XmlContent::Element(node) => keep(node),
            XmlContent::Text(_) => true,
        });
    }

    /// Children-vec slot of the `index`-th element child.
    fn element_child_slot(&self, index: usize) -> Option<usize> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, XmlContent::Element(_)))
            .nth(index)
            .map(|(slot, _)| slot)
    }

    /// Concatenated text of this element's direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlContent::Text(text) = child {
                out.push_str(text);
            }
        }
        out
    }

    /// Append text content, coalescing with a trailing text node so parsing
    /// does not fragment `text &amp; more` into three children.
    fn push_text(&mut self, text: &str) {
        if let Some(XmlContent::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(XmlContent::Text(text.to_string()));
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        self.children.push(XmlContent::Text(text.to_string()));
    }

    /// Pre-order traversal over this element and every descendant element.
    pub fn for_each_element_mut<F: FnMut(&mut XmlNode)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            if let XmlContent::Element(node) = child {
                node.for_each_element_mut(f);
            }
        }
    }
}

/// Escape text content. Quotes stay literal outside attribute values.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
