pub mod behaviours;
pub mod extract_action;
pub mod extractor;
pub mod form_post;
pub mod metadata;

pub use behaviours::*;
pub use extract_action::*;
pub use extractor::*;
pub use form_post::*;
pub use metadata::*;
