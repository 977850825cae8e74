use anyhow::Result;
use serde_json::json;
use srvcfg_core::{operation, Address, ModelResult, Operation};
use srvcfg_online::{InMemoryController, ManagementClient, Operations};

/// A model with an empty-ish logging subsystem, as a fresh server has it.
pub(crate) fn logging_controller() -> InMemoryController {
    InMemoryController::from_snapshot(json!({
        "attributes": {},
        "children": {
            "subsystem": {
                "logging": {
                    "attributes": {"add-logging-api-dependencies": true},
                    "children": {
                        "console-handler": {
                            "CONSOLE": {
                                "attributes": {"level": "INFO", "named-formatter": "COLOR-PATTERN"},
                                "children": {}
                            }
                        },
                        "root-logger": {
                            "ROOT": {
                                "attributes": {"level": "INFO", "handlers": ["CONSOLE"]},
                                "children": {}
                            }
                        }
                    }
                }
            }
        }
    }))
    .unwrap()
}

pub(crate) fn read(controller: &mut InMemoryController, address: &Address, name: &str) -> ModelResult {
    Operations::new(controller).read_attribute(address, name).unwrap()
}

/// Passes operations through and remembers them.
pub(crate) struct Recording<'c> {
    inner: &'c mut InMemoryController,
    sent: Vec<Operation>,
}

impl<'c> Recording<'c> {
    pub(crate) fn new(inner: &'c mut InMemoryController) -> Self {
        Recording {
            inner,
            sent: Vec::new(),
        }
    }

    /// Everything sent except reads.
    pub(crate) fn mutations(&self) -> Vec<&Operation> {
        self.sent
            .iter()
            .filter(|op| {
                ![
                    operation::READ_ATTRIBUTE,
                    operation::READ_CHILDREN_NAMES,
                    operation::READ_RESOURCE,
                ]
                .contains(&op.name.as_str())
            })
            .collect()
    }
}

impl ManagementClient for Recording<'_> {
    fn execute(&mut self, operation: &Operation) -> Result<ModelResult> {
        self.sent.push(operation.clone());
        self.inner.execute(operation)
    }
}
