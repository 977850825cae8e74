use std::fmt::Display;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Address, Values};

pub const ADD: &str = "add";
pub const REMOVE: &str = "remove";
pub const READ_ATTRIBUTE: &str = "read-attribute";
pub const WRITE_ATTRIBUTE: &str = "write-attribute";
pub const UNDEFINE_ATTRIBUTE: &str = "undefine-attribute";
pub const READ_CHILDREN_NAMES: &str = "read-children-names";
pub const READ_RESOURCE: &str = "read-resource";
pub const COMPOSITE: &str = "composite";

/// A management operation as sent to the management endpoint.
///
/// On the wire this is a flat JSON object:
///
/// ```text
/// {"operation": "write-attribute", "address": [{"subsystem": "logging"}], "name": "level", "value": "INFO"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operation")]
    pub name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Operation {
    pub fn new(name: &str, address: Address) -> Self {
        Operation {
            name: name.to_string(),
            address,
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn add(address: Address, values: Values) -> Self {
        Operation {
            name: ADD.to_string(),
            address,
            params: values.into_map(),
        }
    }

    pub fn remove(address: Address) -> Self {
        Operation::new(REMOVE, address)
    }

    pub fn read_attribute(address: Address, name: &str) -> Self {
        Operation::new(READ_ATTRIBUTE, address).with_param("name", name)
    }

    pub fn write_attribute(address: Address, name: &str, value: impl Into<Value>) -> Self {
        Operation::new(WRITE_ATTRIBUTE, address)
            .with_param("name", name)
            .with_param("value", value)
    }

    pub fn undefine_attribute(address: Address, name: &str) -> Self {
        Operation::new(UNDEFINE_ATTRIBUTE, address).with_param("name", name)
    }

    pub fn read_children_names(address: Address, child_type: &str) -> Self {
        Operation::new(READ_CHILDREN_NAMES, address).with_param("child-type", child_type)
    }

    pub fn read_resource(address: Address, recursive: bool) -> Self {
        Operation::new(READ_RESOURCE, address).with_param("recursive", recursive)
    }

    /// A `composite` whose steps are executed in order, as one unit.
    pub fn composite(steps: &[Operation]) -> Self {
        let steps: Vec<Value> = steps.iter().map(Operation::to_value).collect();
        Operation::new(COMPOSITE, Address::root()).with_param("steps", Value::Array(steps))
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// The steps of a `composite`.
    pub fn steps(&self) -> Result<Vec<Operation>> {
        let steps = self
            .params
            .get("steps")
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        serde_json::from_value(steps).with_context(|| "Could not parse composite steps")
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("operation".to_string(), Value::String(self.name.clone()));
        object.insert("address".to_string(), self.address.to_value());
        for (k, v) in &self.params {
            object.insert(k.clone(), v.clone());
        }
        Value::Object(object)
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.name)
    }
}
