pub mod service;
pub mod state;
pub mod store;

pub use service::ScanService;
pub use state::{JobProgress, JobResults, JobStatus, JobUpdate, ScanJob, ScanScope};
pub use store::{JobStore, JobStoreConfig};
