use std::iter::Sum;
use std::ops::Add;

use serde::Serialize;

use super::state::OrgScanReport;
use crate::models::ScanResult;
use crate::utils::formatting::round_cents;

/// Roll-up of findings at any level of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub findings_count: usize,
    pub critical_count: usize,
    #[serde(serialize_with = "serialize_cents")]
    pub monthly_impact: f64,
}

fn serialize_cents<S: serde::Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_cents(*value))
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            findings_count: self.findings_count + rhs.findings_count,
            critical_count: self.critical_count + rhs.critical_count,
            monthly_impact: self.monthly_impact + rhs.monthly_impact,
        }
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::default(), Add::add)
    }
}

impl From<&ScanResult> for Totals {
    fn from(result: &ScanResult) -> Self {
        Totals {
            findings_count: result.total_findings(),
            critical_count: result.critical_count(),
            monthly_impact: result.total_impact(),
        }
    }
}

pub fn account_totals(results: &[ScanResult]) -> Totals {
    results.iter().map(Totals::from).sum()
}

/// Totals over every account of every unit, the management account included.
pub fn org_totals(report: &OrgScanReport) -> Totals {
    report
        .units
        .iter()
        .flat_map(|unit| unit.accounts.iter())
        .map(|account| account_totals(&account.results))
        .sum()
}

/// Totals for a single-account job.
pub fn flat_totals(results: &[ScanResult]) -> Totals {
    account_totals(results)
}
