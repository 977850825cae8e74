use anyhow::Result;
use srvcfg_core::{ModelResult, Operation};

/// A connection to a management endpoint.
///
/// `Err` means the round trip did not complete (transport or protocol
/// fault). An operation that ran and failed is `Ok(ModelResult::Failed)`.
pub trait ManagementClient {
    fn execute(&mut self, operation: &Operation) -> Result<ModelResult>;

    /// Names the endpoint in log messages.
    fn endpoint(&self) -> String {
        "management endpoint".to_string()
    }
}

impl<T: ManagementClient + ?Sized> ManagementClient for &mut T {
    fn execute(&mut self, operation: &Operation) -> Result<ModelResult> {
        (**self).execute(operation)
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}

impl<T: ManagementClient + ?Sized> ManagementClient for Box<T> {
    fn execute(&mut self, operation: &Operation) -> Result<ModelResult> {
        (**self).execute(operation)
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}
