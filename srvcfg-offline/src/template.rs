//! Transform templates: named, parameterized edits of one selected element.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use srvcfg_core::{PreconditionFailed, TransformFailed};

use crate::{
    document::Element,
    order::{self, ChildOrder},
    params::Parameters,
};

/// Parameter that lets an add replace an existing child instead of failing.
pub const REPLACE_EXISTING: &str = "replaceExisting";

/// An edit of the element selected by a [`crate::Subtree`].
///
/// Implementations only see the selected element. They may fail after
/// partially editing it; the session discards the edited copy in that case.
pub trait Transform {
    fn name(&self) -> &str;
    fn apply(&self, target: &mut Element, params: &Parameters) -> Result<()>;
}

/// Template name to template.
#[derive(Default)]
pub struct TransformRegistry {
    templates: BTreeMap<String, Box<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, transform: impl Transform + 'static) -> &mut Self {
        self.templates
            .insert(transform.name().to_string(), Box::new(transform));
        self
    }

    pub fn get(&self, name: &str) -> Result<&dyn Transform> {
        match self.templates.get(name) {
            Some(t) => Ok(t.as_ref()),
            None => bail!("No transform template named {}", name),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

/// A container element holding the children a template edits, created in
/// schema order when first needed.
#[derive(Debug, Clone)]
pub struct EnsureContainer {
    pub element: &'static str,
    pub order: ChildOrder,
}

impl EnsureContainer {
    pub fn ensure<'e>(&self, parent: &'e mut Element) -> &'e mut Element {
        let at = match parent.position(self.element, None) {
            Some(at) => at,
            None => self.order.insert(parent, Element::new(self.element)),
        };
        match parent.nodes_mut()[at].as_element_mut() {
            Some(container) => container,
            None => unreachable!("position and insert point at elements"),
        }
    }
}

fn describe(element: &str, identity: Option<(&str, &str)>) -> String {
    match identity {
        Some((key, value)) => format!("<{} {}=\"{}\">", element, key, value),
        None => format!("<{}>", element),
    }
}

fn descend<'e>(target: &'e mut Element, container: Option<&str>) -> Result<&'e mut Element> {
    match container {
        None => Ok(target),
        Some(name) => match target.child_mut(name) {
            Some(c) => Ok(c),
            None => Err(PreconditionFailed::new(describe(name, None), "does not exist").into()),
        },
    }
}

/// Adds a child identified by an attribute.
///
/// The identity is read from the parameter of the same name. An existing
/// child with that identity fails the transform, unless
/// [`REPLACE_EXISTING`] is set, in which case it is replaced in place.
pub struct AddChild {
    pub template: &'static str,
    pub element: &'static str,
    pub identity: &'static str,
    pub order: ChildOrder,
    pub container: Option<EnsureContainer>,
    pub build: fn(&Parameters) -> Result<Element>,
}

impl Transform for AddChild {
    fn name(&self) -> &str {
        self.template
    }

    fn apply(&self, target: &mut Element, params: &Parameters) -> Result<()> {
        let id = params.require_str(self.identity)?;
        let replace = params.flag(REPLACE_EXISTING)?;
        let child = (self.build)(params)?;
        let parent = match &self.container {
            Some(container) => container.ensure(target),
            None => target,
        };
        match parent.position(self.element, Some((self.identity, id))) {
            Some(at) if replace => {
                tracing::debug!(element = self.element, id, "replacing existing element");
                order::replace_at(parent, at, child);
            }
            Some(_) => {
                return Err(TransformFailed::new(
                    self.template,
                    format!(
                        "{} already exists",
                        describe(self.element, Some((self.identity, id)))
                    ),
                )
                .into())
            }
            None => {
                self.order.insert(parent, child);
            }
        }
        Ok(())
    }
}

/// Edits an existing child. `identity: None` selects the only child with
/// the element name.
pub struct ChangeChild {
    pub template: &'static str,
    pub element: &'static str,
    pub identity: Option<&'static str>,
    pub container: Option<&'static str>,
    pub change: fn(&mut Element, &Parameters) -> Result<()>,
}

impl Transform for ChangeChild {
    fn name(&self) -> &str {
        self.template
    }

    fn apply(&self, target: &mut Element, params: &Parameters) -> Result<()> {
        let identity = match self.identity {
            Some(key) => Some((key, params.require_str(key)?)),
            None => None,
        };
        let parent = descend(target, self.container)?;
        let Some(at) = parent.position(self.element, identity) else {
            return Err(
                PreconditionFailed::new(describe(self.element, identity), "does not exist").into(),
            );
        };
        match parent.nodes_mut()[at].as_element_mut() {
            Some(child) => (self.change)(child, params),
            None => unreachable!("position points at an element"),
        }
    }
}

/// Removes an existing child together with its leading whitespace.
pub struct RemoveChild {
    pub template: &'static str,
    pub element: &'static str,
    pub identity: &'static str,
    pub container: Option<&'static str>,
}

impl Transform for RemoveChild {
    fn name(&self) -> &str {
        self.template
    }

    fn apply(&self, target: &mut Element, params: &Parameters) -> Result<()> {
        let identity = (self.identity, params.require_str(self.identity)?);
        let parent = descend(target, self.container)?;
        let Some(at) = parent.position(self.element, Some(identity)) else {
            return Err(
                PreconditionFailed::new(describe(self.element, Some(identity)), "does not exist")
                    .into(),
            );
        };
        order::remove_at(parent, at);
        Ok(())
    }
}
