//! An in-process management model.
//!
//! The resource tree is kept as one JSON document:
//!
//! ```text
//! {"attributes": {...}, "children": {"<type>": {"<name>": <node>, ...}, ...}}
//! ```
//!
//! Every mutation is expressed as a JSON Patch against that document. A
//! `composite` is applied to a copy which only replaces the model once every
//! step has succeeded, so a failed composite leaves no trace.

use std::{fs, io::Write as _, path::Path};

use anyhow::{bail, Context, Result};
use json_patch::{jsonptr::PointerBuf, AddOperation, PatchOperation, RemoveOperation};
use serde_json::{json, Map, Value};
use srvcfg_core::{operation, Address, ModelResult, Operation};

use crate::ManagementClient;

/// A failure description as reported back to the caller.
type Failure = String;

#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryController {
    model: Value,
}

impl Default for InMemoryController {
    fn default() -> Self {
        InMemoryController { model: empty_node() }
    }
}

fn empty_node() -> Value {
    json!({ "attributes": {}, "children": {} })
}

impl InMemoryController {
    pub fn new() -> Self {
        InMemoryController::default()
    }

    pub fn from_snapshot(model: Value) -> Result<Self> {
        check_node(&model, &Address::root())?;
        Ok(InMemoryController { model })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Could not read model snapshot {}", path.display()))?;
        let model = serde_json::from_str(&contents)
            .with_context(|| format!("Could not parse model snapshot {}", path.display()))?;
        Self::from_snapshot(model)
            .with_context(|| format!("Invalid model snapshot {}", path.display()))
    }

    /// Writes the snapshot next to `path` first and renames it into place, so
    /// an interrupted save leaves the previous snapshot intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut contents = serde_json::to_string_pretty(&self.model)?;
        contents.push('\n');
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut replacement = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Could not create a temporary file in {}", dir.display()))?;
        replacement
            .write_all(contents.as_bytes())
            .with_context(|| format!("Could not write model snapshot {}", path.display()))?;
        replacement.as_file().sync_all()?;
        replacement
            .persist(path)
            .with_context(|| format!("Could not replace model snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn snapshot(&self) -> &Value {
        &self.model
    }
}

impl ManagementClient for InMemoryController {
    fn execute(&mut self, operation: &Operation) -> Result<ModelResult> {
        tracing::trace!(operation = %operation, "in-memory controller");
        let result = if operation.name == operation::COMPOSITE {
            let steps = operation.steps()?;
            execute_composite(&mut self.model, &steps)
        } else {
            execute_step(&mut self.model, operation)
        };
        Ok(match result {
            Ok(value) => ModelResult::Success(value),
            Err(description) => ModelResult::Failed { description },
        })
    }

    fn endpoint(&self) -> String {
        "in-memory model controller".to_string()
    }
}

fn check_node(node: &Value, address: &Address) -> Result<()> {
    let Some(object) = node.as_object() else {
        bail!("node {} is not an object", address);
    };
    if !object.get("attributes").is_some_and(Value::is_object) {
        bail!("node {} has no attributes object", address);
    }
    let Some(children) = object.get("children").and_then(Value::as_object) else {
        bail!("node {} has no children object", address);
    };
    for (type_, named) in children {
        let Some(named) = named.as_object() else {
            bail!("children of type {} under {} are not an object", type_, address);
        };
        for (name, child) in named {
            check_node(child, &address.and(type_, name))?;
        }
    }
    Ok(())
}

fn execute_composite(model: &mut Value, steps: &[Operation]) -> Result<Option<Value>, Failure> {
    let mut working = model.clone();
    let mut results = Map::new();
    for (i, step) in steps.iter().enumerate() {
        let step_id = format!("step-{}", i + 1);
        if step.name == operation::COMPOSITE {
            return Err(format!("Nested composite in {} is not supported", step_id));
        }
        match execute_step(&mut working, step) {
            Ok(value) => {
                let mut step_result = Map::new();
                step_result.insert("outcome".to_string(), json!("success"));
                if let Some(value) = value {
                    step_result.insert("result".to_string(), value);
                }
                results.insert(step_id, Value::Object(step_result));
            }
            Err(description) => {
                return Err(format!(
                    "Composite operation failed and was rolled back. Steps that failed: {{\"{}\" => \"{}\"}}",
                    step_id, description
                ));
            }
        }
    }
    *model = working;
    Ok(Some(Value::Object(results)))
}

fn execute_step(model: &mut Value, op: &Operation) -> Result<Option<Value>, Failure> {
    let address = &op.address;
    match op.name.as_str() {
        operation::ADD => {
            let Some(last) = address.last() else {
                return Err("Cannot add the root resource".to_string());
            };
            let parent = address.parent().unwrap_or_default();
            let parent_node = node(model, &parent).ok_or_else(|| {
                format!(
                    "Resource {} does not exist; a resource at address {} cannot be created until all ancestor resources have been added",
                    parent, address
                )
            })?;
            if node(model, address).is_some() {
                return Err(format!("Duplicate resource {}", address));
            }
            let mut patch = Vec::new();
            let has_type = parent_node
                .get("children")
                .and_then(|c| c.get(&last.type_))
                .is_some();
            if !has_type {
                let mut tokens = node_tokens(&parent);
                tokens.push("children".to_string());
                tokens.push(last.type_.clone());
                patch.push(add_op(&tokens, json!({})));
            }
            let mut created = empty_node();
            created["attributes"] = Value::Object(op.params.clone());
            patch.push(add_op(&node_tokens(address), created));
            apply(model, &patch)?;
            Ok(None)
        }
        operation::REMOVE => {
            require(model, address)?;
            apply(model, &[PatchOperation::Remove(RemoveOperation {
                path: pointer(&node_tokens(address)),
            })])?;
            Ok(None)
        }
        operation::READ_ATTRIBUTE => {
            let node = require(model, address)?;
            let name = required_param(op, "name")?;
            let value = node["attributes"].get(name).cloned().unwrap_or(Value::Null);
            Ok(Some(value))
        }
        operation::WRITE_ATTRIBUTE | operation::UNDEFINE_ATTRIBUTE => {
            require(model, address)?;
            let name = required_param(op, "name")?;
            let value = if op.name == operation::WRITE_ATTRIBUTE {
                op.param("value").cloned().unwrap_or(Value::Null)
            } else {
                Value::Null
            };
            let mut tokens = node_tokens(address);
            tokens.push("attributes".to_string());
            tokens.push(name.to_string());
            apply(model, &[add_op(&tokens, value)])?;
            Ok(None)
        }
        operation::READ_CHILDREN_NAMES => {
            let node = require(model, address)?;
            let child_type = required_param(op, "child-type")?;
            let mut names: Vec<String> = node["children"]
                .get(child_type)
                .and_then(Value::as_object)
                .map(|named| named.keys().cloned().collect())
                .unwrap_or_default();
            names.sort();
            Ok(Some(json!(names)))
        }
        operation::READ_RESOURCE => {
            let node = require(model, address)?;
            let recursive = op.param("recursive").and_then(Value::as_bool).unwrap_or(false);
            Ok(Some(describe(node, recursive)))
        }
        other => Err(format!(
            "No operation named '{}' exists at address {}",
            other, address
        )),
    }
}

fn node<'a>(model: &'a Value, address: &Address) -> Option<&'a Value> {
    let mut current = model;
    for segment in address.segments() {
        current = current
            .get("children")?
            .get(&segment.type_)?
            .get(&segment.name)?;
    }
    Some(current)
}

fn require<'a>(model: &'a Value, address: &Address) -> Result<&'a Value, Failure> {
    node(model, address).ok_or_else(|| format!("Management resource '{}' not found", address))
}

fn required_param<'a>(op: &'a Operation, name: &str) -> Result<&'a str, Failure> {
    op.param_str(name)
        .ok_or_else(|| format!("Operation {} requires parameter '{}'", op, name))
}

fn describe(node: &Value, recursive: bool) -> Value {
    let mut out = node["attributes"].as_object().cloned().unwrap_or_default();
    if let Some(children) = node["children"].as_object() {
        for (type_, named) in children {
            let entries: Map<String, Value> = named
                .as_object()
                .map(|named| {
                    named
                        .iter()
                        .map(|(name, child)| {
                            let child = if recursive {
                                describe(child, true)
                            } else {
                                Value::Null
                            };
                            (name.clone(), child)
                        })
                        .collect()
                })
                .unwrap_or_default();
            out.insert(type_.clone(), Value::Object(entries));
        }
    }
    Value::Object(out)
}

fn node_tokens(address: &Address) -> Vec<String> {
    address
        .segments()
        .iter()
        .flat_map(|s| ["children".to_string(), s.type_.clone(), s.name.clone()])
        .collect()
}

fn pointer(tokens: &[String]) -> PointerBuf {
    PointerBuf::from_tokens(tokens.iter().map(String::as_str))
}

fn add_op(tokens: &[String], value: Value) -> PatchOperation {
    PatchOperation::Add(AddOperation {
        path: pointer(tokens),
        value,
    })
}

fn apply(model: &mut Value, patch: &[PatchOperation]) -> Result<(), Failure> {
    json_patch::patch(model, patch).map_err(|e| format!("Could not update the model: {}", e))
}
