//! Terminal output for the operator binary

pub mod output;
pub mod table;

pub use output::{error, info, success, warn};
pub use table::{claims_table, dialects_table, properties_table};
