//! Minimal namespace-aware element tree
//!
//! SOAP responses are small, so they are read into a tree with
//! `quick_xml::NsReader` and queried by (namespace, local name).

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::error::{RecoveryError, Result};

/// Private-use character some servers emit as a path separator
const PATH_SEPARATOR_REFS: [&str; 2] = ["&#xFFFE;", "&#xfffe;"];

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub namespace: String,
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(ns: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Self> {
        let namespace = match ns {
            ResolveResult::Bound(Namespace(uri)) => String::from_utf8_lossy(uri).into_owned(),
            _ => String::new(),
        };

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| RecoveryError::Parse(e.to_string()))?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            namespace,
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Attribute value by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct child elements in document order
    pub fn child_elements(&self) -> &[Element] {
        &self.children
    }

    /// Concatenated text of this element and its descendants, trimmed
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// All descendants (not self) matching namespace and local name
    pub fn descendants_named<'a>(&'a self, namespace: &str, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(namespace, name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, namespace: &str, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.namespace == namespace && child.name == name {
                found.push(child);
            }
            child.collect_named(namespace, name, found);
        }
    }

    /// The only descendant matching namespace and local name
    pub fn single(&self, namespace: &str, name: &str) -> Result<&Element> {
        let found = self.descendants_named(namespace, name);
        match found.len() {
            0 => Err(RecoveryError::Parse(format!(
                "Failed to find {}/{} in XML response",
                namespace, name
            ))),
            1 => Ok(found[0]),
            _ => Err(RecoveryError::Parse(format!(
                "Found multiple items matching {}/{} in XML response",
                namespace, name
            ))),
        }
    }

    /// First matching descendant, if any
    pub fn first(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.descendants_named(namespace, name).into_iter().next()
    }
}

/// Replace the private path separator with `/` in raw response text
pub fn normalize_separators(xml: &str) -> String {
    let mut out = xml.replace('\u{FFFE}', "/");
    for reference in PATH_SEPARATOR_REFS {
        out = out.replace(reference, "/");
    }
    out
}

/// Parse a document into a synthetic root element
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    let mut stack = vec![Element::default()];

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(start)) => {
                let element = Element::from_start(ns, &start)?;
                stack.push(element);
            }
            (ns, Event::Empty(start)) => {
                let element = Element::from_start(ns, &start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            (_, Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(RecoveryError::Parse("Unexpected closing tag".to_string()));
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
            }
            (_, Event::Text(text)) => {
                let value = text.unescape()?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&value);
                }
            }
            (_, Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(RecoveryError::Parse("Unexpected end of XML response".to_string()));
    }

    stack
        .pop()
        .ok_or_else(|| RecoveryError::Parse("Empty XML response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_A: &str = "urn:a";
    const NS_B: &str = "urn:b";

    #[test]
    fn test_namespaced_lookup() {
        let doc = parse(
            r#"<a:Root xmlns:a="urn:a" xmlns:b="urn:b">
                 <a:Item Id="1"><b:Name>one</b:Name></a:Item>
                 <b:Item Id="2"/>
               </a:Root>"#,
        )
        .unwrap();

        let items = doc.descendants_named(NS_A, "Item");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].attr("Id"), Some("1"));
        assert_eq!(items[0].single(NS_B, "Name").unwrap().text(), "one");
        assert_eq!(doc.single(NS_B, "Item").unwrap().attr("Id"), Some("2"));
    }

    #[test]
    fn test_single_rejects_missing_and_duplicates() {
        let doc = parse(r#"<r xmlns="urn:a"><x/><x/></r>"#).unwrap();
        assert!(matches!(doc.single(NS_A, "x"), Err(RecoveryError::Parse(_))));
        assert!(matches!(doc.single(NS_A, "y"), Err(RecoveryError::Parse(_))));
    }

    #[test]
    fn test_text_and_escapes() {
        let doc = parse(r#"<r><v>a &amp; b</v></r>"#).unwrap();
        assert_eq!(doc.first("", "v").unwrap().text(), "a & b");
    }

    #[test]
    fn test_separator_normalization() {
        let xml = normalize_separators("<p>&#xFFFE;Top&#xfffe;Inbox\u{FFFE}Sub</p>");
        let doc = parse(&xml).unwrap();
        assert_eq!(doc.first("", "p").unwrap().text(), "/Top/Inbox/Sub");
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a><b>").is_err());
    }
}
