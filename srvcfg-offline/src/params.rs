use std::collections::BTreeMap;

use anyhow::{bail, Result};

/// One transform parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Str(value.to_string())
    }
}
impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Str(value)
    }
}
impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}
impl From<Vec<String>> for Param {
    fn from(value: Vec<String>) -> Self {
        Param::List(value)
    }
}

/// The flat parameter map handed to a transform template. A name mapped to
/// `None` was deliberately not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: BTreeMap<String, Option<Param>>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Param>) -> Self {
        self.entries.insert(name.to_string(), Some(value.into()));
        self
    }

    pub fn with_optional<V: Into<Param>>(mut self, name: &str, value: Option<V>) -> Self {
        self.entries.insert(name.to_string(), value.map(Into::into));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.entries.get(name).and_then(Option::as_ref)
    }

    pub fn get_str(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(Param::Str(s)) => Ok(Some(s)),
            Some(other) => bail!("Parameter {} must be a string, got {:?}", name, other),
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str> {
        match self.get_str(name)? {
            Some(s) => Ok(s),
            None => bail!("Missing required parameter {}", name),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Param::Bool(b)) => Ok(Some(*b)),
            Some(Param::Str(s)) if s == "true" => Ok(Some(true)),
            Some(Param::Str(s)) if s == "false" => Ok(Some(false)),
            Some(other) => bail!("Parameter {} must be a boolean, got {:?}", name, other),
        }
    }

    /// A boolean flag; not supplied means `false`.
    pub fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.get_bool(name)?.unwrap_or(false))
    }

    pub fn get_list(&self, name: &str) -> Result<Option<&[String]>> {
        match self.get(name) {
            None => Ok(None),
            Some(Param::List(items)) => Ok(Some(items)),
            Some(other) => bail!("Parameter {} must be a list, got {:?}", name, other),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Param>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_and_missing_look_the_same() {
        let params = Parameters::new()
            .with("name", "H1")
            .with_optional::<String>("level", None);
        assert_eq!(params.require_str("name").unwrap(), "H1");
        assert_eq!(params.get_str("level").unwrap(), None);
        assert_eq!(params.get_str("encoding").unwrap(), None);
        assert!(params.require_str("level").is_err());
        assert_eq!(params.iter().count(), 2);
    }

    #[test]
    fn typed_access() {
        let params = Parameters::new()
            .with("autoflush", true)
            .with("enabled", "false")
            .with("handlers", vec!["A".to_string(), "B".to_string()]);
        assert_eq!(params.get_bool("autoflush").unwrap(), Some(true));
        assert!(!params.flag("enabled").unwrap());
        assert!(!params.flag("replaceExisting").unwrap());
        assert_eq!(params.get_list("handlers").unwrap().unwrap().len(), 2);
        assert!(params.get_str("handlers").is_err());
        assert!(params.get_list("autoflush").is_err());
    }
}
