pub mod types;
pub mod classification;
pub mod retry;

pub use types::{CloudSweepError, CredentialError, JobError};
pub use classification::{Classify, ErrorClassification};
pub use retry::{RetryConfig, with_retry};
