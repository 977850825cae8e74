//! The model shared by the online and offline halves of srvcfg.
//!
//! Nothing in this crate performs I/O. It describes *what* to change
//! ([`Address`], [`Values`], [`Batch`]), how that is put on the wire
//! ([`Operation`]) and how the other side answers ([`ModelResult`]).

pub mod address;
pub mod attribute_path;
pub mod batch;
pub mod error;
pub mod operation;
pub mod result;
pub mod values;

pub use address::{Address, Segment};
pub use attribute_path::AttributePath;
pub use batch::{Batch, BatchStep};
pub use error::{CommandFailed, InvalidCommand, OperationFailed, PreconditionFailed, TransformFailed};
pub use operation::Operation;
pub use result::ModelResult;
pub use values::Values;
