//! Owned XML element tree for `rest` responses.
//!
//! `quick-xml` does the tokenizing; this module only folds its events into
//! an owned tree so a parsed document can outlive the response body. Mixed
//! content is not modelled: an element's text is the concatenation of its
//! own text and CDATA nodes, with surrounding whitespace trimmed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::EventfulError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    /// Parse a complete document and return its root element.
    ///
    /// Anything short of exactly one well-formed root element is an error:
    /// empty input, stray text, unclosed or mismatched tags.
    pub fn parse(input: &str) -> Result<Self, EventfulError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    ensure_single_root(&root)?;
                    stack.push(open_element(&start)?);
                }
                Event::Empty(start) => {
                    ensure_single_root(&root)?;
                    let element = open_element(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    // quick-xml has already matched the end name against the open tag.
                    let element = stack
                        .pop()
                        .ok_or_else(|| EventfulError::Xml("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| EventfulError::Xml(e.to_string()))?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| EventfulError::Xml(format!("CDATA is not UTF-8: {e}")))?;
                    push_text(&mut stack, text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(EventfulError::Xml(format!(
                "document ended inside <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| EventfulError::Xml("document has no root element".to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlElement::text)
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement, EventfulError> {
    let name = utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| EventfulError::Xml(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| EventfulError::Xml(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        ..XmlElement::default()
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<(), EventfulError> {
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(EventfulError::Xml("text outside the root element".to_string())),
    }
}

fn ensure_single_root(root: &Option<XmlElement>) -> Result<(), EventfulError> {
    if root.is_some() {
        return Err(EventfulError::Xml("more than one root element".to_string()));
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str, EventfulError> {
    std::str::from_utf8(bytes).map_err(|e| EventfulError::Xml(format!("name is not UTF-8: {e}")))
}
