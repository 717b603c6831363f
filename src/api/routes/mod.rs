pub mod health;
pub mod jobs;
pub mod scanners;
pub mod scans;
