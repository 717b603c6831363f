pub mod credentials;
pub mod parser;
pub mod schema;
pub mod types;

pub use credentials::resolve_credential;
pub use parser::{is_valid_region, parse_config, parse_config_str, validate_regions};
pub use types::*;
