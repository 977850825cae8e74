use std::{fmt::Display, str::FromStr};

use anyhow::{bail, Context, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// A path into a compound attribute value, e.g. `permissions[0].class-name`.
///
/// The first step is always the attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    pub fn attribute(&self) -> &str {
        match &self.steps[0] {
            PathStep::Key(k) => k,
            PathStep::Index(_) => unreachable!("parser always starts with a key"),
        }
    }

    /// Steps after the attribute name.
    pub fn nested(&self) -> &[PathStep] {
        &self.steps[1..]
    }

    /// Follows the nested steps into the attribute value. `None` if some step
    /// does not exist.
    pub fn resolve<'a>(&self, attribute_value: &'a Value) -> Option<&'a Value> {
        let mut current = attribute_value;
        for step in self.nested() {
            current = match step {
                PathStep::Key(k) => current.as_object()?.get(k)?,
                PathStep::Index(i) => current.as_array()?.get(*i)?,
            };
        }
        Some(current)
    }
}

impl FromStr for AttributePath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for part in s.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if key.is_empty() {
                bail!("Empty name in attribute path '{}'", s);
            }
            steps.push(PathStep::Key(key.to_string()));
            while !rest.is_empty() {
                let Some(close) = rest.find(']') else {
                    bail!("Unclosed '[' in attribute path '{}'", s);
                };
                if !rest.starts_with('[') {
                    bail!("Unexpected '{}' in attribute path '{}'", rest, s);
                }
                let index: usize = rest[1..close]
                    .parse()
                    .with_context(|| format!("Invalid index in attribute path '{}'", s))?;
                steps.push(PathStep::Index(index));
                rest = &rest[close + 1..];
            }
        }
        Ok(AttributePath { steps })
    }
}

impl Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathStep::Key(k) => write!(f, ".{}", k)?,
                PathStep::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}
