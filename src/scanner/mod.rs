pub mod contract;
pub mod fixture;
pub mod registry;

pub use contract::{ScanOptions, Scanner};
pub use fixture::FixtureScanner;
pub use registry::{ScannerInfo, ScannerRegistry};
