//! Document model adapter
//!
//! A small element tree over `quick-xml`. Only what process documents use is
//! kept: element names, attributes in document order, child elements and
//! concatenated text. Comments, processing instructions and the declaration
//! are dropped on read; the writer emits a UTF-8 declaration and indents.

use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Markup read or write failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    /// Markup is not well-formed
    #[error("malformed markup at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// Document contains no element
    #[error("document has no root element")]
    NoRoot,

    /// Document contains more than one top-level element
    #[error("document has more than one root element")]
    MultipleRoots,

    /// Writing markup failed
    #[error("cannot write markup: {0}")]
    Write(String),
}

/// One markup element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: IndexMap<String, String>,
    children: Vec<Element>,
    text: Option<String>,
}

impl Element {
    /// Create element without attributes or content
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Add child
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set text content
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set or overwrite an attribute
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Children with tag `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child with tag `name`
    #[inline]
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    #[inline]
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Text content, trimmed
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Number of descendants (excluding `self`) with tag `name`
    #[must_use]
    pub fn count_descendants(&self, name: &str) -> usize {
        self.children
            .iter()
            .map(|c| usize::from(c.name == name) + c.count_descendants(name))
            .sum()
    }

    /// Parse a document and return its root element
    ///
    /// # Errors
    /// Returns error if the markup is malformed or has no single root.
    pub fn parse(text: &str) -> Result<Self, MarkupError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| MarkupError::Syntax {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;
            match event {
                Event::Start(ref start) => stack.push(Self::from_start(start, &reader)?),
                Event::Empty(ref start) => {
                    let element = Self::from_start(start, &reader)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| MarkupError::Syntax {
                        position: reader.buffer_position() as u64,
                        message: "unexpected closing tag".to_string(),
                    })?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(ref text) => {
                    let value = text.unescape().map_err(|e| MarkupError::Syntax {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    Self::append_text(&mut stack, &value);
                }
                Event::CData(cdata) => {
                    let value = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    Self::append_text(&mut stack, &value);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(MarkupError::Syntax {
                position: reader.buffer_position() as u64,
                message: format!("unclosed element <{}>", stack[stack.len() - 1].name),
            });
        }
        root.ok_or(MarkupError::NoRoot)
    }

    fn from_start(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Self, MarkupError> {
        let syntax = |message: String| MarkupError::Syntax {
            position: reader.buffer_position() as u64,
            message,
        };
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| syntax(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(|e| syntax(e.to_string()))?;
            element.attributes.insert(key, value.into_owned());
        }
        Ok(element)
    }

    fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), MarkupError> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_some() => return Err(MarkupError::MultipleRoots),
            None => *root = Some(element),
        }
        Ok(())
    }

    fn append_text(stack: &mut [Element], value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        if let Some(current) = stack.last_mut() {
            match &mut current.text {
                Some(existing) => existing.push_str(trimmed),
                None => current.text = Some(trimmed.to_string()),
            }
        }
    }

    /// Serialize as an indented document with declaration
    ///
    /// # Errors
    /// Returns error if writing fails.
    pub fn to_document_string(&self) -> Result<String, MarkupError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| MarkupError::Write(e.to_string()))?;
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| MarkupError::Write(e.to_string()))
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), MarkupError> {
        let write = |writer: &mut Writer<Vec<u8>>, event: Event<'_>| {
            writer.write_event(event).map_err(|e| MarkupError::Write(e.to_string()))
        };

        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            return write(writer, Event::Empty(start));
        }

        write(writer, Event::Start(start))?;
        if let Some(text) = &self.text {
            write(writer, Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        write(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}
