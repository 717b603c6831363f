/// Progress notifications emitted by the orchestrator while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    AccountsDiscovered { total: usize },
    AccountStarted { unit: String, account_id: String },
    AccountCompleted { account_id: String, findings: usize },
    AccountFailed { account_id: String, error: String },
}
