use serde_json::Value;

use crate::{Address, Operation, Values};

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStep {
    Add { address: Address, values: Values },
    Remove { address: Address },
    WriteAttribute { address: Address, name: String, value: Value },
    UndefineAttribute { address: Address, name: String },
}

impl BatchStep {
    pub fn to_operation(&self) -> Operation {
        match self {
            BatchStep::Add { address, values } => Operation::add(address.clone(), values.clone()),
            BatchStep::Remove { address } => Operation::remove(address.clone()),
            BatchStep::WriteAttribute {
                address,
                name,
                value,
            } => Operation::write_attribute(address.clone(), name, value.clone()),
            BatchStep::UndefineAttribute { address, name } => {
                Operation::undefine_attribute(address.clone(), name)
            }
        }
    }
}

/// An ordered list of mutations, submitted as one `composite` operation.
///
/// Change commands append a step per field they were given, and skip the
/// submission entirely if the batch stays empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    steps: Vec<BatchStep>,
}

impl Batch {
    pub fn new() -> Self {
        Batch::default()
    }

    pub fn add(&mut self, address: &Address, values: Values) -> &mut Self {
        self.steps.push(BatchStep::Add {
            address: address.clone(),
            values,
        });
        self
    }

    pub fn remove(&mut self, address: &Address) -> &mut Self {
        self.steps.push(BatchStep::Remove {
            address: address.clone(),
        });
        self
    }

    pub fn write_attribute(&mut self, address: &Address, name: &str, value: impl Into<Value>) -> &mut Self {
        self.steps.push(BatchStep::WriteAttribute {
            address: address.clone(),
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn undefine_attribute(&mut self, address: &Address, name: &str) -> &mut Self {
        self.steps.push(BatchStep::UndefineAttribute {
            address: address.clone(),
            name: name.to_string(),
        });
        self
    }

    /// Writes a list attribute; an empty list undefines the attribute.
    pub fn write_list_attribute<V: Into<Value>>(
        &mut self,
        address: &Address,
        name: &str,
        items: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            self.undefine_attribute(address, name)
        } else {
            self.write_attribute(address, name, Value::Array(items))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[BatchStep] {
        &self.steps
    }

    pub fn to_operation(&self) -> Operation {
        let steps: Vec<Operation> = self.steps.iter().map(BatchStep::to_operation).collect();
        Operation::composite(&steps)
    }
}
