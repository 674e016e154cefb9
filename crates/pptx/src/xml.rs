//! Minimal owned XML tree over quick-xml events.
//!
//! Slide parts are parsed into this tree so the run sequence of a paragraph
//! can be rewritten while every other node is written back as it was read.

use deckfill_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    /// Declarations, comments, CDATA and processing instructions, kept verbatim.
    Other(Event<'static>),
}

/// An element with its attributes (unescaped) and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name, e.g. `a:rPr`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// `p:` style prefix of this element, including the colon.
    pub fn prefix(&self) -> &str {
        match self.name.find(':') {
            Some(pos) => &self.name[..=pos],
            None => "",
        }
    }

    /// A new element named `local` in this element's namespace prefix.
    pub fn sibling_element(&self, local: &str) -> XmlElement {
        XmlElement::new(format!("{}{}", self.prefix(), local))
    }

    /// Attribute value by qualified name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(attr) => attr.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Child elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Child elements in order, mutably.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.local_name() == local)
    }

    /// Follow a chain of local names through first-match children.
    pub fn path(&self, locals: &[&str]) -> Option<&XmlElement> {
        locals.iter().try_fold(self, |el, local| el.child(local))
    }

    pub fn path_mut(&mut self, locals: &[&str]) -> Option<&mut XmlElement> {
        let mut current = self;
        for local in locals {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out),
                XmlNode::Other(_) => {}
            }
        }
    }

    /// Remove all child elements with the given local name.
    pub fn remove_children(&mut self, local: &str) {
        self.children.retain(|node| match node {
            XmlNode::Element(el) => el.local_name() != local,
            _ => true,
        });
    }

    /// Index in `children` of the first element whose local name is in
    /// `locals`.
    pub fn position_of_any(&self, locals: &[&str]) -> Option<usize> {
        self.children.iter().position(|node| match node {
            XmlNode::Element(el) => locals.contains(&el.local_name()),
            _ => false,
        })
    }
}

/// A parsed XML part: the root element plus the nodes around it.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    pub epilog: Vec<XmlNode>,
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &str) -> &str {
    match name.find(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

fn start_to_element(e: &BytesStart<'_>) -> XmlElement {
    let mut element = XmlElement::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(err) => {
                log::warn!("Keeping raw value of attribute '{}': {}", key, err);
                String::from_utf8_lossy(&attr.value).into_owned()
            }
        };
        element.attributes.push((key, value));
    }
    element
}

/// Parse a complete XML part.
pub fn parse(xml: &str) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(xml);

    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut stack: Vec<XmlElement> = Vec::new();

    fn attach(
        node: XmlNode,
        stack: &mut [XmlElement],
        root: &Option<XmlElement>,
        prolog: &mut Vec<XmlNode>,
        epilog: &mut Vec<XmlNode>,
    ) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_some() => epilog.push(node),
            None => prolog.push(node),
        }
    }

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("at byte {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(ref e) => stack.push(start_to_element(e)),
            Event::Empty(ref e) => {
                let element = start_to_element(e);
                if stack.is_empty() && root.is_none() {
                    root = Some(element);
                } else {
                    attach(XmlNode::Element(element), &mut stack, &root, &mut prolog, &mut epilog);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::XmlError("Unbalanced closing tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?
                    .into_owned();
                if stack.is_empty() {
                    // Whitespace between the prolog and the root is not kept.
                    continue;
                }
                attach(XmlNode::Text(text), &mut stack, &root, &mut prolog, &mut epilog);
            }
            Event::Eof => break,
            other => attach(
                XmlNode::Other(other.into_owned()),
                &mut stack,
                &root,
                &mut prolog,
                &mut epilog,
            ),
        }
    }

    if !stack.is_empty() {
        return Err(Error::XmlError(format!(
            "Unclosed element '{}'",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }
    let root = root.ok_or_else(|| Error::XmlError("Document has no root element".to_string()))?;
    Ok(XmlDocument {
        prolog,
        root,
        epilog,
    })
}

/// Parse a standalone element such as a serialized `a:rPr`.
pub fn parse_fragment(xml: &str) -> Result<XmlElement> {
    parse(xml).map(|doc| doc.root)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> quick_xml::Result<()> {
    match node {
        XmlNode::Element(el) => write_element(writer, el),
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text))),
        XmlNode::Other(event) => writer.write_event(event),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> quick_xml::Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if el.children.is_empty() {
        return writer.write_event(Event::Empty(start));
    }
    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))
}

fn write_document(writer: &mut Writer<Vec<u8>>, doc: &XmlDocument) -> quick_xml::Result<()> {
    for node in &doc.prolog {
        write_node(writer, node)?;
        if matches!(node, XmlNode::Other(Event::Decl(_))) {
            writer.write_event(Event::Text(BytesText::from_escaped("\r\n")))?;
        }
    }
    write_element(writer, &doc.root)?;
    for node in &doc.epilog {
        write_node(writer, node)?;
    }
    Ok(())
}

/// Serialize a part back to bytes.
pub fn write(doc: &XmlDocument) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_document(&mut writer, doc)
        .map_err(|e| Error::XmlError(format!("Failed to write XML: {}", e)))?;
    Ok(writer.into_inner())
}

/// Serialize a single element without a declaration.
pub fn write_fragment(el: &XmlElement) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, el)
        .map_err(|e| Error::XmlError(format!("Failed to write XML: {}", e)))?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::XmlError(e.to_string()))
}
