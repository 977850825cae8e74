use std::fmt::Display;

use anyhow::Result;
use srvcfg_core::PreconditionFailed;

use crate::document::{Document, Element, Node};

/// Selects the single element a transform is allowed to edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subtree {
    /// The document's root element.
    Root,
    /// Child element names, followed from the root element.
    Path(Vec<String>),
    /// The `subsystem` element with namespace `urn:jboss:domain:<name>:<version>`,
    /// optionally only the one inside the `profile` of that name.
    Subsystem {
        name: String,
        profile: Option<String>,
    },
}

impl Subtree {
    pub fn path(names: &[&str]) -> Subtree {
        Subtree::Path(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn subsystem(name: &str) -> Subtree {
        Subtree::Subsystem {
            name: name.to_string(),
            profile: None,
        }
    }

    pub fn subsystem_in_profile(name: &str, profile: Option<&str>) -> Subtree {
        Subtree::Subsystem {
            name: name.to_string(),
            profile: profile.map(str::to_string),
        }
    }

    /// Restricts a subsystem selector that names no profile yet; other
    /// selectors are returned unchanged.
    pub fn in_profile(self, profile: Option<&str>) -> Subtree {
        match (self, profile) {
            (
                Subtree::Subsystem {
                    name,
                    profile: None,
                },
                Some(profile),
            ) => Subtree::Subsystem {
                name,
                profile: Some(profile.to_string()),
            },
            (other, _) => other,
        }
    }

    /// Node positions leading from the root element to the selected element,
    /// for use with [`Document::element_at`].
    pub fn locate(&self, document: &Document) -> Result<Vec<usize>> {
        let matches = match self {
            Subtree::Root => vec![vec![]],
            Subtree::Path(names) => {
                let mut path = Vec::new();
                let mut current = document.root();
                for name in names {
                    let found: Vec<usize> = positions(current, |e| e.local_name() == name);
                    match found.as_slice() {
                        [at] => {
                            path.push(*at);
                            current = match current.nodes()[*at].as_element() {
                                Some(e) => e,
                                None => unreachable!("positions only yields elements"),
                            };
                        }
                        [] => return Err(PreconditionFailed::new(self, format!("no <{}> element", name)).into()),
                        _ => {
                            return Err(PreconditionFailed::new(
                                self,
                                format!("<{}> is ambiguous, {} elements match", name, found.len()),
                            )
                            .into())
                        }
                    }
                }
                vec![path]
            }
            Subtree::Subsystem { name, profile } => {
                let namespace = format!("urn:jboss:domain:{}:", name);
                let mut found = Vec::new();
                collect_subsystems(
                    document.root(),
                    &namespace,
                    None,
                    &mut Vec::new(),
                    &mut found,
                );
                found
                    .into_iter()
                    .filter(|(in_profile, _)| {
                        profile.is_none() || in_profile.as_deref() == profile.as_deref()
                    })
                    .map(|(_, path)| path)
                    .collect()
            }
        };
        match matches.len() {
            1 => Ok(matches.into_iter().next().unwrap_or_default()),
            0 => Err(PreconditionFailed::new(self, "not found in the document").into()),
            n => Err(PreconditionFailed::new(
                self,
                format!("ambiguous, {} elements match; select a profile", n),
            )
            .into()),
        }
    }
}

fn positions(parent: &Element, mut predicate: impl FnMut(&Element) -> bool) -> Vec<usize> {
    parent
        .nodes()
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.as_element().filter(|e| predicate(*e)).map(|_| i))
        .collect()
}

fn collect_subsystems(
    element: &Element,
    namespace: &str,
    profile: Option<&str>,
    path: &mut Vec<usize>,
    found: &mut Vec<(Option<String>, Vec<usize>)>,
) {
    for (i, node) in element.nodes().iter().enumerate() {
        let Node::Element(child) = node else {
            continue;
        };
        path.push(i);
        if child.local_name() == "subsystem" {
            if child
                .attribute("xmlns")
                .map_or(false, |ns| ns.starts_with(namespace))
            {
                found.push((profile.map(str::to_string), path.clone()));
            }
        } else {
            let profile = if child.local_name() == "profile" {
                child.attribute("name")
            } else {
                profile
            };
            collect_subsystems(child, namespace, profile, path, found);
        }
        path.pop();
    }
}

impl Display for Subtree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subtree::Root => write!(f, "root element"),
            Subtree::Path(names) => write!(f, "element /{}", names.join("/")),
            Subtree::Subsystem {
                name,
                profile: None,
            } => write!(f, "subsystem {}", name),
            Subtree::Subsystem {
                name,
                profile: Some(profile),
            } => write!(f, "subsystem {} in profile {}", name, profile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDALONE: &str = include_str!("../../fixtures/standalone.xml");
    const DOMAIN: &str = include_str!("../../fixtures/domain.xml");

    fn precondition(error: anyhow::Error) -> PreconditionFailed {
        error.downcast_ref::<PreconditionFailed>().unwrap().clone()
    }

    #[test]
    fn subsystem_in_standalone() {
        let doc = Document::parse(STANDALONE).unwrap();
        let path = Subtree::subsystem("logging").locate(&doc).unwrap();
        let element = doc.element_at(&path).unwrap();
        assert_eq!(element.name(), "subsystem");
        assert!(element
            .attribute("xmlns")
            .unwrap()
            .starts_with("urn:jboss:domain:logging:"));
    }

    #[test]
    fn namespace_prefix_must_match_whole_name() {
        let doc = Document::parse(
            r#"<server><profile><subsystem xmlns="urn:jboss:domain:logging-extra:1.0"/></profile></server>"#,
        )
        .unwrap();
        assert!(Subtree::subsystem("logging").locate(&doc).is_err());
    }

    #[test]
    fn subsystem_in_domain_needs_a_profile() {
        let doc = Document::parse(DOMAIN).unwrap();
        let error = Subtree::subsystem("logging").locate(&doc).unwrap_err();
        assert!(precondition(error).message.contains("ambiguous"));

        let path = Subtree::subsystem_in_profile("logging", Some("full"))
            .locate(&doc)
            .unwrap();
        let subsystem = doc.element_at(&path).unwrap();
        assert!(subsystem.find_child("console-handler", "name", "FULL-CONSOLE").is_some());

        let error = Subtree::subsystem_in_profile("logging", Some("nope"))
            .locate(&doc)
            .unwrap_err();
        assert_eq!(precondition(error).message, "not found in the document");
    }

    #[test]
    fn missing_subsystem() {
        let doc = Document::parse(STANDALONE).unwrap();
        let error = Subtree::subsystem("nope").locate(&doc).unwrap_err();
        assert_eq!(precondition(error).target, "subsystem nope");
    }

    #[test]
    fn paths() {
        let doc = Document::parse("<a>\n <b>\n  <c/>\n </b>\n <d/><d/>\n</a>").unwrap();
        assert_eq!(Subtree::Root.locate(&doc).unwrap(), Vec::<usize>::new());
        let path = Subtree::path(&["b", "c"]).locate(&doc).unwrap();
        assert_eq!(doc.element_at(&path).unwrap().name(), "c");
        assert!(Subtree::path(&["d"]).locate(&doc).is_err());
        assert!(Subtree::path(&["x"]).locate(&doc).is_err());
    }

    #[test]
    fn in_profile_only_affects_subsystems() {
        assert_eq!(
            Subtree::subsystem("logging").in_profile(Some("full")),
            Subtree::subsystem_in_profile("logging", Some("full"))
        );
        assert_eq!(Subtree::Root.in_profile(Some("full")), Subtree::Root);
        assert_eq!(
            Subtree::subsystem_in_profile("logging", Some("default")).in_profile(Some("full")),
            Subtree::subsystem_in_profile("logging", Some("default"))
        );
        assert_eq!(
            Subtree::subsystem("logging").in_profile(None).to_string(),
            "subsystem logging"
        );
    }
}
