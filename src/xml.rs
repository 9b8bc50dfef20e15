//! XML → JSON adapter.
//!
//! Converts an XML document into a JSON tree using a fixed convention:
//!
//! - the document is an object keyed by the root element's local name;
//! - an element with no attributes and no child elements becomes the string
//!   of its trimmed text (`""` when empty);
//! - any other element becomes an object holding its text under
//!   `#content`, its attributes under `-name`, and its child elements under
//!   their local names. Repeated siblings collapse into an array.
//!
//! Key order follows document order.
//!
//! Input is transcoded to UTF-8 before parsing. A byte-order mark picks the
//! charset first, then the `encoding` of the XML declaration; without either
//! the document is read as UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ForgeError, Result};

/// Naming knobs for the XML → JSON convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlJsonOptions {
    /// Prefix put in front of attribute names (default `-`).
    pub attribute_prefix: String,
    /// Key holding an element's own text when it also has attributes or
    /// children (default `#content`).
    pub content_key: String,
    /// Emit every child element group as an array, even singletons.
    pub children_always_as_array: bool,
}

impl Default for XmlJsonOptions {
    fn default() -> Self {
        Self {
            attribute_prefix: "-".to_string(),
            content_key: "#content".to_string(),
            children_always_as_array: false,
        }
    }
}

/// Convert XML bytes to JSON text using the default convention.
pub fn xml_to_json(xml: &[u8]) -> Result<String> {
    xml_to_json_with(xml, &XmlJsonOptions::default())
}

/// Convert XML bytes to JSON text.
pub fn xml_to_json_with(xml: &[u8], options: &XmlJsonOptions) -> Result<String> {
    let value = xml_to_value(xml, options)?;
    Ok(serde_json::to_string(&value)?)
}

/// Convert XML bytes to a JSON value.
pub fn xml_to_value(xml: &[u8], options: &XmlJsonOptions) -> Result<Value> {
    let text = decode_document(xml)?;
    let mut reader = Reader::from_reader(text.as_bytes());
    let mut buf = Vec::new();
    let mut open: Vec<(String, XmlNode)> = Vec::new();
    let mut root: Option<(String, XmlNode)> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => open.push(start_element(&e)?),
            Event::Empty(e) => {
                let element = start_element(&e)?;
                finish_element(&mut open, &mut root, element)?;
            }
            Event::End(_) => {
                let element = open.pop().ok_or_else(|| {
                    ForgeError::MalformedXml("closing tag without an open element".to_string())
                })?;
                finish_element(&mut open, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                push_text(&mut open, &text)?;
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                push_text(&mut open, utf8(&bytes)?)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
        buf.clear();
    }

    if let Some((name, _)) = open.last() {
        return Err(ForgeError::MalformedXml(format!("unclosed element <{name}>")));
    }
    let (name, node) =
        root.ok_or_else(|| ForgeError::MalformedXml("document has no root element".to_string()))?;

    let mut document = Map::new();
    document.insert(name, node.into_value(options));
    Ok(Value::Object(document))
}

// ---------------------------------------------------------------------------
// Charset detection
// ---------------------------------------------------------------------------

fn decode_document(xml: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, body) = match Encoding::for_bom(xml) {
        Some((encoding, bom_len)) => (encoding, &xml[bom_len..]),
        None => (declared_encoding(xml)?, xml),
    };
    log::debug!("decoding XML input as {}", encoding.name());
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| ForgeError::MalformedXml(format!("input is not valid {}", encoding.name())))
}

/// Charset of a document without a byte-order mark.
fn declared_encoding(xml: &[u8]) -> Result<&'static Encoding> {
    // `<?` in UTF-16 without a BOM.
    if xml.starts_with(&[0x3C, 0x00, 0x3F, 0x00]) {
        return Ok(UTF_16LE);
    }
    if xml.starts_with(&[0x00, 0x3C, 0x00, 0x3F]) {
        return Ok(UTF_16BE);
    }

    // The declaration itself is ASCII in every charset handled here.
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let decl = match reader.read_event_into(&mut buf) {
        Ok(Event::Decl(decl)) => decl,
        _ => return Ok(UTF_8),
    };
    match decl.encoding() {
        Some(label) => {
            let label = label.map_err(quick_xml::Error::from)?;
            Encoding::for_label(&label).ok_or_else(|| {
                ForgeError::MalformedXml(format!(
                    "unsupported encoding '{}'",
                    String::from_utf8_lossy(&label)
                ))
            })
        }
        None => Ok(UTF_8),
    }
}

// ---------------------------------------------------------------------------
// Intermediate tree
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct XmlNode {
    text: String,
    attributes: Vec<(String, String)>,
    children: Vec<(String, XmlNode)>,
}

impl XmlNode {
    fn into_value(self, options: &XmlJsonOptions) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return Value::String(self.text);
        }

        let mut object = Map::new();
        if !self.text.is_empty() {
            object.insert(options.content_key.clone(), Value::String(self.text));
        }
        for (name, value) in self.attributes {
            object.insert(
                format!("{}{}", options.attribute_prefix, name),
                Value::String(value),
            );
        }

        // Group siblings by name, keeping the position of the first occurrence.
        let mut groups: Vec<(String, Vec<XmlNode>)> = Vec::new();
        for (name, child) in self.children {
            match groups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, nodes)) => nodes.push(child),
                None => groups.push((name, vec![child])),
            }
        }
        for (name, mut nodes) in groups {
            let value = if options.children_always_as_array || nodes.len() > 1 {
                Value::Array(nodes.into_iter().map(|n| n.into_value(options)).collect())
            } else {
                match nodes.pop() {
                    Some(node) => node.into_value(options),
                    None => Value::Null,
                }
            };
            object.insert(name, value);
        }
        Value::Object(object)
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<(String, XmlNode)> {
    let name = utf8(e.local_name().as_ref())?.to_string();
    let mut node = XmlNode::default();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = utf8(attr.key.local_name().as_ref())?.to_string();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.push((key, value));
    }
    Ok((name, node))
}

fn finish_element(
    open: &mut [(String, XmlNode)],
    root: &mut Option<(String, XmlNode)>,
    (name, mut node): (String, XmlNode),
) -> Result<()> {
    node.text = node.text.trim().to_string();
    if let Some((_, parent)) = open.last_mut() {
        parent.children.push((name, node));
    } else if root.is_some() {
        return Err(ForgeError::MalformedXml(format!(
            "second root element <{name}>"
        )));
    } else {
        *root = Some((name, node));
    }
    Ok(())
}

fn push_text(open: &mut [(String, XmlNode)], text: &str) -> Result<()> {
    match open.last_mut() {
        Some((_, node)) => node.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => {
            return Err(ForgeError::MalformedXml(
                "text outside the root element".to_string(),
            ))
        }
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| ForgeError::MalformedXml(e.to_string()))
}
