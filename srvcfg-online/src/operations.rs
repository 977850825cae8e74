use anyhow::{Context, Result};
use serde_json::Value;
use srvcfg_core::{Address, AttributePath, Batch, ModelResult, Operation, Values};

use crate::ManagementClient;

/// Convenience operations on top of a [`ManagementClient`].
///
/// Holds no state besides the borrowed client. Every method issues the
/// operations it needs right away; nothing is cached between calls.
pub struct Operations<'a> {
    client: &'a mut dyn ManagementClient,
}

impl<'a> Operations<'a> {
    pub fn new(client: &'a mut dyn ManagementClient) -> Self {
        Operations { client }
    }

    /// Executes `operation` as is. Transport faults are the only `Err`.
    pub fn execute(&mut self, operation: &Operation) -> Result<ModelResult> {
        tracing::debug!(operation = %operation, "executing management operation");
        let result = self.client.execute(operation).with_context(|| {
            format!(
                "Could not execute {} against {}",
                operation,
                self.client.endpoint()
            )
        })?;
        if let ModelResult::Failed { description } = &result {
            tracing::debug!(operation = %operation, description, "management operation failed");
        }
        Ok(result)
    }

    /// Whether a resource exists at `address`.
    ///
    /// Asks the parent for its children of the relevant type. A missing
    /// parent means the resource does not exist either.
    pub fn exists(&mut self, address: &Address) -> Result<bool> {
        let (Some(parent), Some(last)) = (address.parent(), address.last()) else {
            return Ok(true);
        };
        let result = self.execute(&Operation::read_children_names(parent, &last.type_))?;
        Ok(match result {
            ModelResult::Success(Some(Value::Array(names))) => names
                .iter()
                .any(|name| name.as_str() == Some(last.name.as_str())),
            ModelResult::Success(_) => false,
            ModelResult::Failed { .. } => false,
        })
    }

    /// Creates a resource. Uniqueness is left to the management endpoint:
    /// adding an existing resource yields a failed result.
    pub fn add(&mut self, address: &Address, values: Values) -> Result<ModelResult> {
        self.execute(&Operation::add(address.clone(), values))
    }

    pub fn remove(&mut self, address: &Address) -> Result<ModelResult> {
        self.execute(&Operation::remove(address.clone()))
    }

    /// Removes the resource if it exists. Returns whether it was removed.
    pub fn remove_if_exists(&mut self, address: &Address) -> Result<bool> {
        if !self.exists(address)? {
            return Ok(false);
        }
        self.remove(address)?
            .assert_success()
            .with_context(|| format!("Could not remove {}", address))?;
        Ok(true)
    }

    pub fn read_attribute(&mut self, address: &Address, name: &str) -> Result<ModelResult> {
        self.execute(&Operation::read_attribute(address.clone(), name))
    }

    /// Reads an attribute and descends into it along `path`. A nested element
    /// that does not exist reads as undefined.
    pub fn read_attribute_path(&mut self, address: &Address, path: &AttributePath) -> Result<ModelResult> {
        let result = self.read_attribute(address, path.attribute())?;
        if path.nested().is_empty() {
            return Ok(result);
        }
        Ok(match result {
            ModelResult::Success(value) => {
                let nested = value
                    .as_ref()
                    .and_then(|v| path.resolve(v))
                    .cloned()
                    .unwrap_or(Value::Null);
                ModelResult::Success(Some(nested))
            }
            failed => failed,
        })
    }

    pub fn write_attribute(&mut self, address: &Address, name: &str, value: impl Into<Value>) -> Result<ModelResult> {
        self.execute(&Operation::write_attribute(address.clone(), name, value))
    }

    pub fn undefine_attribute(&mut self, address: &Address, name: &str) -> Result<ModelResult> {
        self.execute(&Operation::undefine_attribute(address.clone(), name))
    }

    pub fn read_children_names(&mut self, address: &Address, child_type: &str) -> Result<Vec<String>> {
        let result = self
            .execute(&Operation::read_children_names(address.clone(), child_type))?
            .assert_success()
            .with_context(|| format!("Could not read {} children of {}", child_type, address))?;
        Ok(result.string_list_value().unwrap_or_default())
    }

    pub fn read_resource(&mut self, address: &Address, recursive: bool) -> Result<ModelResult> {
        self.execute(&Operation::read_resource(address.clone(), recursive))
    }

    /// Submits the batch as a single `composite`. An empty batch is not sent.
    pub fn batch(&mut self, batch: &Batch) -> Result<ModelResult> {
        if batch.is_empty() {
            tracing::debug!("empty batch, nothing to submit");
            return Ok(ModelResult::success_without_value());
        }
        self.execute(&batch.to_operation())
    }
}
