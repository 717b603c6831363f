pub mod aggregate;
pub mod events;
pub mod fanout;
pub mod orchestrator;
pub mod state;

pub use aggregate::{account_totals, flat_totals, org_totals, Totals};
pub use events::ScanEvent;
pub use fanout::{fan_out, FanOutOptions, FanOutReport, RegionError, RegionOutcome};
pub use orchestrator::Orchestrator;
pub use state::{AccountReport, OrgScanReport, OrgSummary, ScanSettings, UnitReport};
