pub mod formatting;
pub mod panic;
pub mod truncation;
