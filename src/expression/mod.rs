//! Formula text: reference tokens and their resolution to data entities.
pub mod resolver;
pub mod variables;

pub use resolver::{DataResolver, Resolution};
pub use variables::{extract_variables, is_token, substitute};
