//! Offline mode: edit a server configuration document while the server is
//! stopped.
//!
//! A command names a [`Subtree`], a transform template and a flat set of
//! [`Parameters`]. The [`OfflineSession`] finds the one element the subtree
//! selects, lets the template edit a copy of it, and swaps the copy in only if
//! the template succeeded. Everything the template did not touch is written
//! back exactly as it was read.

pub mod document;
pub mod file;
pub mod order;
pub mod params;
pub mod session;
pub mod subtree;
pub mod template;

pub use document::{Document, Element, Node};
pub use file::ConfigFile;
pub use order::ChildOrder;
pub use params::{Param, Parameters};
pub use session::OfflineSession;
pub use subtree::Subtree;
pub use template::{AddChild, ChangeChild, EnsureContainer, RemoveChild, Transform, TransformRegistry};
