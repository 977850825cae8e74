//! Online mode: commands talk to a management endpoint through a
//! [`ManagementClient`], usually via the [`Operations`] facade.

pub mod client;
pub mod controller;
pub mod operations;

pub use client::ManagementClient;
pub use controller::InMemoryController;
pub use operations::Operations;
