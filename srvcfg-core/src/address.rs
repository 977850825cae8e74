use std::{fmt::Display, str::FromStr};

use anyhow::{bail, Result};
use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One step in the resource tree, e.g. `console-handler=H1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub type_: String,
    pub name: String,
}

impl Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.type_, self.name)
    }
}

/// The location of a resource in the server's configuration tree.
///
/// Addresses are values: [`Address::and`] returns a new address and leaves
/// the receiver as it was. The empty address denotes the root of the tree; it
/// is only ever used as the parent of a concrete resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    segments: Vec<Segment>,
}

impl Address {
    pub fn root() -> Self {
        Address::default()
    }

    pub fn of(type_: &str, name: &str) -> Self {
        Address::root().and(type_, name)
    }

    pub fn subsystem(name: &str) -> Self {
        Address::of("subsystem", name)
    }

    pub fn system_property(name: &str) -> Self {
        Address::of("system-property", name)
    }

    /// Callers validate user-supplied names first; segments are never empty.
    pub fn and(&self, type_: &str, name: &str) -> Self {
        debug_assert!(
            !type_.is_empty() && !name.is_empty(),
            "empty address segment {}={}",
            type_,
            name
        );
        let mut segments = self.segments.clone();
        segments.push(Segment {
            type_: type_.to_string(),
            name: name.to_string(),
        });
        Address { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The address one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Address> {
        if self.is_root() {
            return None;
        }
        Some(Address {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The wire form, see the `Serialize` impl.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.segments
                .iter()
                .map(|segment| {
                    let mut entry = Map::new();
                    entry.insert(segment.type_.clone(), Value::String(segment.name.clone()));
                    Value::Object(entry)
                })
                .collect(),
        )
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    /// Parse the `/type=name/type=name` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == "/" || trimmed.is_empty() {
            return Ok(Address::root());
        }
        let Some(body) = trimmed.strip_prefix('/') else {
            bail!("Address must start with '/': {}", s);
        };
        let mut address = Address::root();
        for part in body.split('/') {
            let Some((type_, name)) = part.split_once('=') else {
                bail!("Address segment '{}' is not of the form type=name", part);
            };
            if type_.is_empty() || name.is_empty() {
                bail!("Address segment '{}' has an empty type or name", part);
            }
            address = address.and(type_, name);
        }
        Ok(address)
    }
}

/// Wire format: `[{"subsystem": "logging"}, {"console-handler": "H1"}]`
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.segments.len()))?;
        for segment in &self.segments {
            let mut entry = Map::new();
            entry.insert(segment.type_.clone(), Value::String(segment.name.clone()));
            seq.serialize_element(&entry)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<Map<String, Value>> = Deserialize::deserialize(deserializer)?;
        let mut address = Address::root();
        for entry in entries {
            if entry.len() != 1 {
                return Err(de::Error::custom(format!(
                    "address segment must have exactly one key, got {}",
                    entry.len()
                )));
            }
            for (type_, name) in entry {
                let name = name.as_str().ok_or_else(|| {
                    de::Error::custom(format!("address segment '{}' must have a string name", type_))
                })?;
                if type_.is_empty() || name.is_empty() {
                    return Err(de::Error::custom(format!(
                        "address segment '{}={}' has an empty type or name",
                        type_, name
                    )));
                }
                address = address.and(&type_, name);
            }
        }
        Ok(address)
    }
}
