//! Derived values for the contribution sheet: row and column hour totals,
//! the fund (worker count times the flat rate) and each company's share of
//! it in proportion to its hours.
//!
//! Nothing here is cached across mutations except the [`Derived`] snapshot,
//! which is refreshed with the [`Change`] that invalidated it.

use serde::Serialize;
use shared::domain::Record;
use tracing::debug;

mod session;

pub use session::{Confirm, Session, StateObserver};

pub const SAVED_ACKNOWLEDGEMENT: &str = "Data saved!";
pub const RESET_PROMPT: &str = "Reset all data?";

/// The scope of a single mutation, used to decide what must be recomputed
/// and redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Workers or companies were added, removed or replaced.
    Structural,
    HoursCell { worker: usize, company: usize },
    Rate,
    WorkerName { worker: usize },
    CompanyName { company: usize },
    Month,
}

impl Change {
    pub fn invalidates_totals(&self) -> bool {
        matches!(self, Self::Structural | Self::HoursCell { .. })
    }

    pub fn invalidates_fund(&self) -> bool {
        matches!(self, Self::Structural | Self::HoursCell { .. } | Self::Rate)
    }
}

/// Sum of the worker's hours across every company column.
pub fn worker_total_hours(record: &Record, worker: usize) -> f64 {
    (0..record.company_count())
        .map(|company| record.hours(worker, company))
        .sum()
}

pub fn company_total_hours(record: &Record, company: usize) -> f64 {
    record
        .workers()
        .iter()
        .map(|w| record.hours_for(w.id, company))
        .sum()
}

pub fn company_totals(record: &Record) -> Vec<f64> {
    (0..record.company_count())
        .map(|company| company_total_hours(record, company))
        .collect()
}

pub fn grand_total(record: &Record) -> f64 {
    sum_totals(&company_totals(record))
}

fn sum_totals(company_totals: &[f64]) -> f64 {
    company_totals.iter().sum()
}

/// A non-finite rate contributes nothing.
pub fn effective_rate(record: &Record) -> f64 {
    if record.ss_rate.is_finite() {
        record.ss_rate
    } else {
        0.0
    }
}

/// Flat per-worker contribution: depends on how many workers there are, not
/// on their hours.
pub fn total_fund(record: &Record) -> f64 {
    record.worker_count() as f64 * effective_rate(record)
}

/// The company's slice of `total_fund`, proportional to its hours. Every
/// share is 0 when no hours are logged at all.
pub fn company_share(company: usize, company_totals: &[f64], grand_total: f64, total_fund: f64) -> f64 {
    if grand_total == 0.0 {
        return 0.0;
    }
    company_totals
        .get(company)
        .map(|total| (total / grand_total) * total_fund)
        .unwrap_or(0.0)
}

fn shares(company_totals: &[f64], grand_total: f64, total_fund: f64) -> Vec<f64> {
    (0..company_totals.len())
        .map(|company| company_share(company, company_totals, grand_total, total_fund))
        .collect()
}

/// Every derived value the sheet displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Derived {
    pub worker_totals: Vec<f64>,
    pub company_totals: Vec<f64>,
    pub grand_total: f64,
    pub total_fund: f64,
    pub shares: Vec<f64>,
}

impl Derived {
    pub fn compute(record: &Record) -> Self {
        let worker_totals = (0..record.worker_count())
            .map(|worker| worker_total_hours(record, worker))
            .collect();
        let company_totals = company_totals(record);
        let grand_total = sum_totals(&company_totals);
        let total_fund = total_fund(record);
        let shares = shares(&company_totals, grand_total, total_fund);
        Self {
            worker_totals,
            company_totals,
            grand_total,
            total_fund,
            shares,
        }
    }

    /// Brings the snapshot up to date after `change` was applied to
    /// `record`. Hours-cell and rate edits only recompute what they touch;
    /// the result always equals `Derived::compute(record)`.
    pub fn refresh(&mut self, record: &Record, change: Change) {
        match change {
            Change::Structural => {
                debug!("full recompute");
                *self = Self::compute(record);
            }
            Change::HoursCell { worker, company } => self.refresh_cell(record, worker, company),
            Change::Rate => self.refresh_fund(record),
            Change::WorkerName { .. } | Change::CompanyName { .. } | Change::Month => {}
        }
    }

    fn refresh_cell(&mut self, record: &Record, worker: usize, company: usize) {
        let shape_matches = self.worker_totals.len() == record.worker_count()
            && self.company_totals.len() == record.company_count()
            && worker < self.worker_totals.len()
            && company < self.company_totals.len();
        if !shape_matches {
            debug!(worker, company, "snapshot shape out of date; full recompute");
            *self = Self::compute(record);
            return;
        }

        debug!(worker, company, "partial recompute for hours cell");
        self.worker_totals[worker] = worker_total_hours(record, worker);
        self.company_totals[company] = company_total_hours(record, company);
        self.grand_total = sum_totals(&self.company_totals);
        self.shares = shares(&self.company_totals, self.grand_total, self.total_fund);
    }

    fn refresh_fund(&mut self, record: &Record) {
        debug!("partial recompute for rate");
        self.total_fund = total_fund(record);
        self.shares = shares(&self.company_totals, self.grand_total, self.total_fund);
    }

    pub fn share_total(&self) -> f64 {
        self.shares.iter().sum()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
