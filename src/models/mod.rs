pub mod finding;
pub mod scan_result;
pub mod credentials;
pub mod org;

pub use finding::*;
pub use scan_result::*;
pub use credentials::*;
pub use org::*;
