pub mod common;
pub mod form;
pub mod metadata;
pub mod node;
pub mod node_ref;
pub mod persisted;

pub use common::*;
pub use form::*;
pub use metadata::*;
pub use node::*;
pub use node_ref::*;
pub use persisted::*;
