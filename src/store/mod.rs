pub mod actions;
pub mod mem;
pub mod traits;

pub use actions::*;
pub use mem::*;
pub use traits::*;
