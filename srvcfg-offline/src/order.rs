use crate::document::{Element, Node};

const DEFAULT_UNIT: &str = "    ";

/// The order in which a schema expects child elements.
///
/// Each group is one rank; names within a group may appear in any order
/// relative to each other. Names not listed are left where they are and never
/// used as an insertion point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildOrder {
    groups: Vec<Vec<String>>,
}

impl ChildOrder {
    pub fn new(groups: &[&[&str]]) -> ChildOrder {
        ChildOrder {
            groups: groups
                .iter()
                .map(|g| g.iter().map(|n| n.to_string()).collect())
                .collect(),
        }
    }

    /// Every name its own rank.
    pub fn sequence(names: &[&str]) -> ChildOrder {
        ChildOrder {
            groups: names.iter().map(|n| vec![n.to_string()]).collect(),
        }
    }

    pub fn rank(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.iter().any(|n| n == name))
    }

    /// Inserts `child` into `parent` before the first existing child of a
    /// higher rank, or after the last element child. Returns its position in
    /// [`Element::nodes`].
    ///
    /// Comments right in front of that higher-rank child stay with it.
    pub fn insert(&self, parent: &mut Element, mut child: Element) -> usize {
        let rank = self.rank(child.local_name());
        let before = rank.and_then(|rank| {
            parent.nodes().iter().position(|n| match n {
                Node::Element(e) => self.rank(e.local_name()).map_or(false, |r| r > rank),
                _ => false,
            })
        });
        let last_element = parent
            .nodes()
            .iter()
            .rposition(|n| matches!(n, Node::Element(_)));
        let unit = unit_of(parent);

        match (before, last_element) {
            (Some(before), _) => {
                let at = comments_start(parent, before);
                let sep = whitespace_before(parent, at);
                child.pretty(&line_indent(&sep, parent, &unit), &unit);
                let nodes = parent.nodes_mut();
                if sep.is_empty() {
                    nodes.insert(at, Node::Element(child));
                } else {
                    nodes.splice(at..at, [Node::Element(child), Node::Text(sep)]);
                }
                at
            }
            (None, Some(last)) => {
                let sep = whitespace_before(parent, last);
                child.pretty(&line_indent(&sep, parent, &unit), &unit);
                let nodes = parent.nodes_mut();
                if sep.is_empty() {
                    nodes.insert(last + 1, Node::Element(child));
                    last + 1
                } else {
                    nodes.splice(last + 1..last + 1, [Node::Text(sep), Node::Element(child)]);
                    last + 2
                }
            }
            (None, None) => {
                let outer = parent.indentation().unwrap_or("").to_string();
                let inner = format!("{}{}", outer, unit);
                child.pretty(&inner, &unit);
                let nodes = parent.nodes_mut();
                if !nodes.last().map_or(false, Node::is_whitespace) {
                    nodes.push(Node::Text(format!("\n{}", outer)));
                }
                let at = nodes.len() - 1;
                nodes.splice(at..at, [Node::Text(format!("\n{}", inner)), Node::Element(child)]);
                at + 1
            }
        }
    }

    /// Replaces the first child named like `child`, keeping its position, or
    /// inserts `child` if there is none.
    pub fn set(&self, parent: &mut Element, child: Element) -> usize {
        match parent.position(child.local_name(), None) {
            Some(at) => {
                replace_at(parent, at, child);
                at
            }
            None => self.insert(parent, child),
        }
    }
}

/// Replaces the element at node position `at`, taking over its layout.
pub fn replace_at(parent: &mut Element, at: usize, mut child: Element) {
    let unit = unit_of(parent);
    let indent = parent.nodes()[at]
        .as_element()
        .and_then(Element::indentation)
        .map(str::to_string);
    if let Some(indent) = indent {
        child.pretty(&indent, &unit);
    }
    parent.nodes_mut()[at] = Node::Element(child);
}

/// Removes the node at position `at` together with the formatting
/// whitespace in front of it.
pub fn remove_at(parent: &mut Element, at: usize) -> Option<Element> {
    let nodes = parent.nodes_mut();
    if at >= nodes.len() {
        return None;
    }
    let removed = nodes.remove(at);
    if at > 0 && nodes[at - 1].is_whitespace() {
        nodes.remove(at - 1);
    }
    match removed {
        Node::Element(e) => Some(e),
        _ => None,
    }
}

/// Removes the first child with the given local name. Returns whether there
/// was one.
pub fn remove_named(parent: &mut Element, name: &str) -> bool {
    match parent.position(name, None) {
        Some(at) => remove_at(parent, at).is_some(),
        None => false,
    }
}

/// Start of the run of comments, separated by whitespace only, that directly
/// precedes the node at `at`; `at` itself if there is none.
fn comments_start(parent: &Element, at: usize) -> usize {
    let nodes = parent.nodes();
    let mut start = at;
    let mut i = at;
    while i > 0 {
        match &nodes[i - 1] {
            n if n.is_whitespace() => i -= 1,
            Node::Other(other) if other.starts_with("<!--") => {
                i -= 1;
                start = i;
            }
            _ => break,
        }
    }
    start
}

fn whitespace_before(parent: &Element, at: usize) -> String {
    match at.checked_sub(1).map(|i| &parent.nodes()[i]) {
        Some(Node::Text(t)) if t.chars().all(char::is_whitespace) => t.clone(),
        _ => String::new(),
    }
}

fn line_indent(sep: &str, parent: &Element, unit: &str) -> String {
    match sep.rfind('\n') {
        Some(i) => sep[i + 1..].to_string(),
        None => format!("{}{}", parent.indentation().unwrap_or(""), unit),
    }
}

/// One level of indentation, as far as the existing children tell, or else
/// as the rest of the document does.
fn unit_of(parent: &Element) -> String {
    let outer = parent.indentation().unwrap_or("");
    parent
        .children()
        .filter_map(Element::indentation)
        .find_map(|inner| {
            inner
                .strip_prefix(outer)
                .filter(|unit| !unit.is_empty())
                .map(str::to_string)
        })
        .or_else(|| parent.indentation_unit().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_UNIT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn handler_order() -> ChildOrder {
        ChildOrder::new(&[
            &["level"],
            &["encoding"],
            &["filter", "filter-spec"],
            &["formatter"],
            &["target"],
        ])
    }

    fn rendered(doc: &Document) -> String {
        doc.to_xml_string()
    }

    #[test]
    fn inserts_before_higher_rank() {
        let mut doc = Document::parse(
            "<r>\n  <console-handler name=\"C\">\n    <level name=\"INFO\"/>\n    <formatter/>\n  </console-handler>\n</r>",
        )
        .unwrap();
        let handler = doc.root_mut().child_mut("console-handler").unwrap();
        handler_order().insert(handler, Element::new("encoding").with_attribute("value", "UTF-8"));
        assert_eq!(
            rendered(&doc),
            "<r>\n  <console-handler name=\"C\">\n    <level name=\"INFO\"/>\n    <encoding value=\"UTF-8\"/>\n    <formatter/>\n  </console-handler>\n</r>"
        );
    }

    #[test]
    fn appends_after_last_element() {
        let mut doc = Document::parse("<r>\n    <level/>\n</r>").unwrap();
        handler_order().insert(doc.root_mut(), Element::new("target"));
        assert_eq!(rendered(&doc), "<r>\n    <level/>\n    <target/>\n</r>");
    }

    #[test]
    fn unknown_names_are_appended() {
        let mut doc = Document::parse("<r>\n    <level/>\n    <target/>\n</r>").unwrap();
        let at = handler_order().insert(doc.root_mut(), Element::new("mystery"));
        assert_eq!(doc.root().nodes()[at].as_element().unwrap().name(), "mystery");
        assert_eq!(rendered(&doc), "<r>\n    <level/>\n    <target/>\n    <mystery/>\n</r>");
    }

    #[test]
    fn first_child_of_empty_parent() {
        let mut doc = Document::parse("<r>\n  <p>\n  </p>\n  <q/>\n</r>").unwrap();
        handler_order().insert(doc.root_mut().child_mut("p").unwrap(), Element::new("level"));
        handler_order().insert(doc.root_mut().child_mut("q").unwrap(), Element::new("level"));
        assert_eq!(
            rendered(&doc),
            "<r>\n  <p>\n    <level/>\n  </p>\n  <q>\n    <level/>\n  </q>\n</r>"
        );
    }

    #[test]
    fn empty_parent_without_indented_document() {
        let mut doc = Document::parse("<r><p/></r>").unwrap();
        handler_order().insert(doc.root_mut().child_mut("p").unwrap(), Element::new("level"));
        assert_eq!(rendered(&doc), "<r><p>\n    <level/>\n</p></r>");
    }

    #[test]
    fn empty_subsystem_follows_document_indentation() {
        let mut doc = Document::parse(
            "<server>\n  <profile>\n    <subsystem xmlns=\"urn:jboss:domain:logging:8.0\"/>\n  </profile>\n</server>",
        )
        .unwrap();
        let subsystem = doc
            .root_mut()
            .child_mut("profile")
            .and_then(|p| p.child_mut("subsystem"))
            .unwrap();
        ChildOrder::sequence(&["console-handler", "logger"]).insert(
            subsystem,
            Element::new("console-handler")
                .with_attribute("name", "H1")
                .with_child(Element::new("level").with_attribute("name", "WARN")),
        );
        assert_eq!(
            rendered(&doc),
            "<server>\n  <profile>\n    <subsystem xmlns=\"urn:jboss:domain:logging:8.0\">\n      <console-handler name=\"H1\">\n        <level name=\"WARN\"/>\n      </console-handler>\n    </subsystem>\n  </profile>\n</server>"
        );
    }

    #[test]
    fn comments_stay_with_the_element_they_precede() {
        let mut doc = Document::parse(
            "<r>\n    <level/>\n    <!-- where to -->\n    <target/>\n</r>",
        )
        .unwrap();
        let at = handler_order().insert(doc.root_mut(), Element::new("encoding"));
        assert_eq!(doc.root().nodes()[at].as_element().unwrap().name(), "encoding");
        assert_eq!(
            rendered(&doc),
            "<r>\n    <level/>\n    <encoding/>\n    <!-- where to -->\n    <target/>\n</r>"
        );

        // a comment before the first child
        let mut doc = Document::parse("<r>\n    <!-- first -->\n    <target/>\n</r>").unwrap();
        handler_order().insert(doc.root_mut(), Element::new("level"));
        assert_eq!(
            rendered(&doc),
            "<r>\n    <level/>\n    <!-- first -->\n    <target/>\n</r>"
        );
    }

    #[test]
    fn nested_generated_content_follows_document_indentation() {
        let mut doc = Document::parse("<r>\n  <a/>\n</r>").unwrap();
        let order = ChildOrder::sequence(&["a", "b"]);
        order.insert(
            doc.root_mut(),
            Element::new("b").with_child(Element::new("c")),
        );
        assert_eq!(rendered(&doc), "<r>\n  <a/>\n  <b>\n    <c/>\n  </b>\n</r>");
    }

    #[test]
    fn inline_siblings_stay_inline() {
        let mut doc = Document::parse("<r><level/><target/></r>").unwrap();
        handler_order().insert(doc.root_mut(), Element::new("formatter"));
        assert_eq!(rendered(&doc), "<r><level/><formatter/><target/></r>");
    }

    #[test]
    fn set_replaces_in_place() {
        let mut doc = Document::parse("<r>\n    <level name=\"INFO\"/>\n    <target/>\n</r>").unwrap();
        handler_order().set(doc.root_mut(), Element::new("level").with_attribute("name", "WARN"));
        assert_eq!(
            rendered(&doc),
            "<r>\n    <level name=\"WARN\"/>\n    <target/>\n</r>"
        );
    }

    #[test]
    fn remove_takes_leading_whitespace() {
        let input = "<r>\n    <level/>\n    <encoding/>\n    <target/>\n</r>";
        let mut doc = Document::parse(input).unwrap();
        assert!(remove_named(doc.root_mut(), "encoding"));
        assert_eq!(rendered(&doc), "<r>\n    <level/>\n    <target/>\n</r>");
        assert!(!remove_named(doc.root_mut(), "encoding"));

        // insert after remove restores the original text
        handler_order().insert(doc.root_mut(), Element::new("encoding"));
        assert_eq!(rendered(&doc), input);
    }
}
