//! A configuration document that can be written back byte for byte.
//!
//! Every parsed node remembers the exact text it was read from. On output,
//! untouched nodes reproduce that text; an element whose attributes were
//! changed gets a freshly generated start tag, and new nodes are generated
//! from scratch. Whitespace between elements is kept as ordinary text nodes.

use std::fmt::Write as _;

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::{
    escape::{escape, unescape},
    events::{BytesStart, Event},
    Reader,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data exactly as in the document, i.e. still escaped.
    Text(String),
    /// Comments, processing instructions, CDATA, declarations. Kept verbatim.
    Other(String),
}

impl Node {
    /// A text node holding `text`, escaped as needed.
    pub fn text(text: &str) -> Node {
        Node::Text(escape(text).into_owned())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Text consisting only of whitespace, i.e. formatting.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Text(t) if t.chars().all(char::is_whitespace))
    }

    fn write(&self, out: &mut String) {
        match self {
            Node::Element(e) => e.write(out),
            Node::Text(t) | Node::Other(t) => out.push_str(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
    /// Start tag as read, including `<` and `>`. Dropped when attributes change.
    raw_start: Option<String>,
    /// End tag as read; `None` for `<name/>` or for generated elements.
    raw_end: Option<String>,
    /// Whether `raw_start` is a complete `<name/>`.
    self_closing: bool,
    /// Whitespace between the start of its line and the start tag, if known.
    indent: Option<String>,
    /// One level of indentation in the document this element belongs to.
    unit: Option<String>,
}

impl Element {
    pub fn new(name: &str) -> Element {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            nodes: Vec::new(),
            raw_start: None,
            raw_end: None,
            self_closing: false,
            indent: None,
            unit: None,
        }
    }

    fn parsed(
        start: &BytesStart,
        raw: &str,
        self_closing: bool,
        indent: Option<String>,
    ) -> Result<Element> {
        let name = std::str::from_utf8(start.name().as_ref())
            .with_context(|| format!("Element name is not UTF-8: {}", raw))?
            .to_string();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.with_context(|| format!("Malformed attribute in {}", raw))?;
            let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
            let escaped = std::str::from_utf8(&attribute.value)?;
            let value = unescape(escaped)
                .with_context(|| format!("Malformed value of attribute {} in {}", key, raw))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            nodes: Vec::new(),
            raw_start: Some(raw.to_string()),
            raw_end: None,
            self_closing,
            indent,
            unit: None,
        })
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_optional_attribute<V: Into<String>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_attribute(name, value),
            None => self,
        }
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.nodes.push(Node::Element(child));
        self
    }

    pub fn with_optional_child(self, child: Option<Element>) -> Self {
        match child {
            Some(child) => self.with_child(child),
            None => self,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.nodes.push(Node::text(text));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) if *existing == value => return,
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
        self.raw_start = None;
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(k, _)| k != name);
        let removed = self.attributes.len() != before;
        if removed {
            self.raw_start = None;
        }
        removed
    }

    pub fn indentation(&self) -> Option<&str> {
        self.indent.as_deref()
    }

    /// The document's indentation step, if it has one.
    pub fn indentation_unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Lays out generated content one element per line, starting from this
    /// element's indentation. Content that was read from a document, or that
    /// mixes text and elements, is left alone.
    pub(crate) fn pretty(&mut self, indent: &str, unit: &str) {
        self.indent = Some(indent.to_string());
        self.unit = Some(unit.to_string());
        if self.raw_start.is_some()
            || self.nodes.is_empty()
            || !self.nodes.iter().all(|n| matches!(n, Node::Element(_)))
        {
            return;
        }
        let inner = format!("{}{}", indent, unit);
        let mut laid_out = Vec::with_capacity(self.nodes.len() * 2 + 1);
        for node in self.nodes.drain(..) {
            laid_out.push(Node::Text(format!("\n{}", inner)));
            laid_out.push(node);
        }
        laid_out.push(Node::Text(format!("\n{}", indent)));
        for child in laid_out.iter_mut().filter_map(Node::as_element_mut) {
            child.pretty(&inner, unit);
        }
        self.nodes = laid_out;
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(Node::as_element)
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.nodes.iter_mut().filter_map(Node::as_element_mut)
    }

    pub fn has_children(&self) -> bool {
        self.children().next().is_some()
    }

    /// First child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children().find(|c| c.local_name() == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children_mut().find(|c| c.local_name() == name)
    }

    /// Child element `name` whose attribute `key` equals `value`.
    pub fn find_child(&self, name: &str, key: &str, value: &str) -> Option<&Element> {
        self.children()
            .find(|c| c.local_name() == name && c.attribute(key) == Some(value))
    }

    pub fn find_child_mut(&mut self, name: &str, key: &str, value: &str) -> Option<&mut Element> {
        self.children_mut()
            .find(|c| c.local_name() == name && c.attribute(key) == Some(value))
    }

    /// Position in [`Element::nodes`] of the first child matching `name` and,
    /// if given, the identifying attribute.
    pub fn position(&self, name: &str, identity: Option<(&str, &str)>) -> Option<usize> {
        self.nodes.iter().position(|n| match n {
            Node::Element(c) => {
                c.local_name() == name
                    && identity.map_or(true, |(k, v)| c.attribute(k) == Some(v))
            }
            _ => false,
        })
    }

    /// Character data of this element, unescaped.
    pub fn text(&self) -> Result<String> {
        let mut text = String::new();
        for node in &self.nodes {
            if let Node::Text(t) = node {
                text.push_str(&unescape(t).with_context(|| format!("Malformed text in <{}>", self.name))?);
            }
        }
        Ok(text)
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        let has_content = !self.nodes.is_empty();
        if let Some(start) = &self.raw_start {
            // A raw `<name/>` cannot take content.
            if !(self.self_closing && has_content) {
                out.push_str(start);
                if self.self_closing {
                    return;
                }
                for node in &self.nodes {
                    node.write(out);
                }
                match &self.raw_end {
                    Some(end) => out.push_str(end),
                    None => {
                        let _ = write!(out, "</{}>", self.name);
                    }
                }
                return;
            }
        }
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", k, escape(v.as_str()));
        }
        if !has_content {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.nodes {
            node.write(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// A parsed configuration document: one root element, possibly surrounded by
/// a declaration, comments and whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    root: usize,
}

impl Document {
    pub fn parse(input: &str) -> Result<Document> {
        let mut reader = Reader::from_str(input);
        let mut stack: Vec<Element> = Vec::new();
        let mut top: Vec<Node> = Vec::new();
        let mut consumed = 0usize;
        loop {
            let event = reader
                .read_event()
                .with_context(|| format!("Could not parse XML near byte {}", consumed))?;
            let position = reader.buffer_position() as usize;
            let raw = &input[consumed..position];
            consumed = position;
            let node = match event {
                Event::Start(start) => {
                    let indent = indentation(stack.last().map_or(&top, |e| &e.nodes));
                    stack.push(Element::parsed(&start, raw, false, indent)?);
                    continue;
                }
                Event::Empty(start) => {
                    let indent = indentation(stack.last().map_or(&top, |e| &e.nodes));
                    Node::Element(Element::parsed(&start, raw, true, indent)?)
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| anyhow!("Unexpected end tag {}", raw))?;
                    element.raw_end = Some(raw.to_string());
                    Node::Element(element)
                }
                Event::Text(_) => Node::Text(raw.to_string()),
                Event::Eof => break,
                _ => Node::Other(raw.to_string()),
            };
            match stack.last_mut() {
                Some(parent) => parent.nodes.push(node),
                None => top.push(node),
            }
        }
        if let Some(open) = stack.last() {
            bail!("Element <{}> is not closed", open.name);
        }
        let mut roots = top
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, Node::Element(_)))
            .map(|(i, _)| i);
        let Some(root) = roots.next() else {
            bail!("Document has no root element");
        };
        if roots.next().is_some() {
            bail!("Document has more than one root element");
        }
        let mut document = Document { nodes: top, root };
        if let Some(unit) = indentation_step(document.root()) {
            document.root_mut().set_unit(&unit);
        }
        Ok(document)
    }

    pub fn root(&self) -> &Element {
        match &self.nodes[self.root] {
            Node::Element(e) => e,
            _ => unreachable!("root index always points at an element"),
        }
    }

    pub fn root_mut(&mut self) -> &mut Element {
        match &mut self.nodes[self.root] {
            Node::Element(e) => e,
            _ => unreachable!("root index always points at an element"),
        }
    }

    /// The element reached from the root by following node positions.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self.root();
        for &i in path {
            current = current.nodes.get(i)?.as_element()?;
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self.root_mut();
        for &i in path {
            current = current.nodes.get_mut(i)?.as_element_mut()?;
        }
        Some(current)
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write(&mut out);
        }
        out
    }
}

impl Element {
    fn set_unit(&mut self, unit: &str) {
        self.unit = Some(unit.to_string());
        for child in self.children_mut() {
            child.set_unit(unit);
        }
    }
}

/// The first non-empty step between an element's indentation and that of one
/// of its children, searching depth first.
fn indentation_step(element: &Element) -> Option<String> {
    let outer = element.indent.as_deref().unwrap_or("");
    element.children().find_map(|child| {
        child
            .indent
            .as_deref()
            .and_then(|inner| inner.strip_prefix(outer))
            .filter(|step| !step.is_empty())
            .map(str::to_string)
            .or_else(|| indentation_step(child))
    })
}

/// Indentation of a node about to follow `preceding`.
fn indentation(preceding: &[Node]) -> Option<String> {
    match preceding.last() {
        Some(Node::Text(t)) if t.chars().all(char::is_whitespace) => {
            t.rfind('\n').map(|i| t[i + 1..].to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>

<!-- keep me -->
<server xmlns="urn:jboss:domain:20.0">
    <extensions>
        <extension module='org.jboss.as.logging' />
    </extensions>
    <profile>
        <subsystem xmlns="urn:jboss:domain:logging:8.0">
            <console-handler   name="CONSOLE">
                <level name="INFO"/>
                <formatter><named-formatter name="COLOR-PATTERN"/></formatter>
            </console-handler>
            <periodic-rotating-file-handler name="FILE" autoflush="true">
                <suffix value=".yyyy-MM-dd"/>
            </periodic-rotating-file-handler>
        </subsystem>
        <subsystem xmlns="urn:jboss:domain:ee:6.0"><![CDATA[ raw & stuff ]]></subsystem>
    </profile>
    <system-properties><property name="a" value="x &amp; y"/></system-properties>
</server>
"#;

    #[test]
    fn roundtrip_is_exact() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.to_xml_string(), SAMPLE);
        assert_eq!(doc.root().name(), "server");
    }

    #[test]
    fn attributes_are_unescaped() {
        let doc = Document::parse(SAMPLE).unwrap();
        let property = doc
            .root()
            .child("system-properties")
            .and_then(|p| p.child("property"))
            .unwrap();
        assert_eq!(property.attribute("value"), Some("x & y"));
    }

    #[test]
    fn changed_attribute_regenerates_only_that_start_tag() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let handler = doc
            .root_mut()
            .child_mut("profile")
            .and_then(|p| p.child_mut("subsystem"))
            .and_then(|s| s.find_child_mut("console-handler", "name", "CONSOLE"))
            .unwrap();
        handler.set_attribute("autoflush", "false");
        let expected = SAMPLE.replace(
            r#"<console-handler   name="CONSOLE">"#,
            r#"<console-handler name="CONSOLE" autoflush="false">"#,
        );
        assert_eq!(doc.to_xml_string(), expected);
    }

    #[test]
    fn setting_the_same_value_changes_nothing() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        doc.root_mut()
            .child_mut("extensions")
            .and_then(|e| e.child_mut("extension"))
            .unwrap()
            .set_attribute("module", "org.jboss.as.logging");
        assert_eq!(doc.to_xml_string(), SAMPLE);
    }

    #[test]
    fn self_closing_element_gets_content() {
        let mut doc = Document::parse("<a><b x='1'/></a>").unwrap();
        let b = doc.root_mut().child_mut("b").unwrap();
        b.nodes_mut().push(Node::Element(Element::new("c")));
        assert_eq!(doc.to_xml_string(), r#"<a><b x="1"><c/></b></a>"#);
    }

    #[test]
    fn generated_elements_escape() {
        let e = Element::new("property")
            .with_attribute("name", "a<b")
            .with_optional_attribute::<String>("unused", None)
            .with_child(Element::new("v").with_text("1 & 2"));
        assert_eq!(
            e.to_xml_string(),
            r#"<property name="a&lt;b"><v>1 &amp; 2</v></property>"#
        );
        assert_eq!(e.child("v").unwrap().text().unwrap(), "1 & 2");
    }

    #[test]
    fn element_at_follows_node_positions() {
        let doc = Document::parse("<a>\n  <b/>\n  <c><d/></c>\n</a>").unwrap();
        // nodes of <a>: text, b, text, c, text
        assert_eq!(doc.element_at(&[3, 0]).unwrap().name(), "d");
        assert!(doc.element_at(&[0]).is_none());
        assert_eq!(doc.element_at(&[]).unwrap().name(), "a");
    }

    #[test]
    fn indentation_is_recorded() {
        let doc = Document::parse("<a>\n  <b>\n    <c/></b><d/>\n</a>").unwrap();
        let b = doc.root().child("b").unwrap();
        assert_eq!(b.indentation(), Some("  "));
        assert_eq!(b.child("c").unwrap().indentation(), Some("    "));
        assert_eq!(doc.root().child("d").unwrap().indentation(), None);
        assert_eq!(doc.root().indentation(), None);
    }

    #[test]
    fn indentation_unit_comes_from_the_whole_document() {
        let doc = Document::parse("<a><b>\n  <c>\n     <d/>\n  </c>\n</b><e/></a>").unwrap();
        assert_eq!(doc.root().indentation_unit(), Some("  "));
        assert_eq!(doc.root().child("e").unwrap().indentation_unit(), Some("  "));

        let flat = Document::parse("<a><b/></a>").unwrap();
        assert_eq!(flat.root().indentation_unit(), None);
        assert_eq!(Element::new("x").indentation_unit(), None);
    }

    #[test]
    fn pretty_lays_out_generated_content() {
        let mut e = Element::new("logger")
            .with_attribute("category", "com.example")
            .with_child(Element::new("level").with_attribute("name", "INFO"))
            .with_child(
                Element::new("handlers")
                    .with_child(Element::new("handler").with_attribute("name", "H1")),
            );
        e.pretty("  ", "  ");
        assert_eq!(
            e.to_xml_string(),
            "<logger category=\"com.example\">\n    <level name=\"INFO\"/>\n    <handlers>\n      <handler name=\"H1\"/>\n    </handlers>\n  </logger>"
        );
    }

    #[test]
    fn local_names() {
        let e = Element::new("ns:thing");
        assert_eq!(e.local_name(), "thing");
        assert_eq!(Element::new("plain").local_name(), "plain");
    }

    #[test]
    fn malformed_documents() {
        assert!(Document::parse("<a><b></a>").is_err());
        assert!(Document::parse("<a>").is_err());
        assert!(Document::parse("<!-- nothing -->").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
        assert!(Document::parse(r#"<a x="1" x="2"/>"#).is_err());
    }
}
