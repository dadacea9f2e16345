//! Minimal XML element tree used to read SOAP responses and the service
//! descriptor. Namespace prefixes are dropped; elements are matched on their
//! local names.

use quick_xml::{events::Event, Reader};
use serde_json::{Map, Value};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn named(name: String) -> Self {
        Self { name, ..Default::default() }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Depth-first search for the first descendant named `name`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find(name)
            }
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// All descendants named `name`, in document order.
    pub fn descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.descendants(name, found);
        }
    }

    /// Convert to a JSON tree: leaves become strings, repeated child names
    /// become arrays.
    pub fn to_value(&self) -> Value {
        if self.children.is_empty() {
            return Value::String(self.text.clone());
        }

        let mut object = Map::new();
        for child in &self.children {
            let value = child.to_value();
            match object.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(child.name.clone(), value);
                }
            }
        }
        Value::Object(object)
    }
}

/// Parse a complete document and return its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::protocol(format!("Malformed XML document: {e}")))?;

        match event {
            Event::Start(start) => {
                let mut element = XmlElement::named(local_name(start.local_name().as_ref()));
                element.attributes = read_attributes(&start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let mut element = XmlElement::named(local_name(start.local_name().as_ref()));
                element.attributes = read_attributes(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| Error::protocol(format!("Invalid XML text: {e}")))?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::protocol("Unbalanced closing tag in XML document"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Error::protocol("XML document ended inside an element"));
    }
    root.ok_or_else(|| Error::protocol("XML document has no root element"))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::protocol("XML document has more than one root element")),
    }
    Ok(())
}

fn read_attributes(start: &quick_xml::events::BytesStart<'_>) -> Result<Vec<(String, String)>> {
    start
        .attributes()
        .map(|attribute| {
            let attribute =
                attribute.map_err(|e| Error::protocol(format!("Invalid XML attribute: {e}")))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| Error::protocol(format!("Invalid XML attribute value: {e}")))?;
            Ok((local_name(attribute.key.local_name().as_ref()), value.into_owned()))
        })
        .collect()
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
