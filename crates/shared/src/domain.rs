use std::collections::BTreeMap;

use crate::error::LedgerError;

/// Schema version written with every record. Stored records tagged with an
/// older (or no) version are discarded on load.
pub const STATE_VERSION: u32 = 3;
pub const DEFAULT_MONTH: &str = "April";
pub const DEFAULT_SS_RATE: f64 = 10_000.0;
pub const DEFAULT_COMPANIES: [&str; 3] = ["Amazon", "Flipkart", "Swiggy"];

const DEFAULT_WORKER_NAMES: [&str; 11] = [
    "Ravi Kumar",
    "Sita Sharma",
    "Arjun Singh",
    "Priya Patel",
    "Vikram Joshi",
    "Meena Das",
    "Sunil Yadav",
    "Asha Reddy",
    "Imran Khan",
    "Geeta Nair",
    "Rahul Verma",
];

// Rows follow DEFAULT_WORKER_NAMES, columns follow DEFAULT_COMPANIES.
const DEFAULT_HOURS: [[f64; 3]; 11] = [
    [160.0, 40.0, 20.0],
    [60.0, 120.0, 40.0],
    [30.0, 30.0, 140.0],
    [80.0, 60.0, 60.0],
    [100.0, 80.0, 40.0],
    [40.0, 140.0, 40.0],
    [50.0, 50.0, 100.0],
    [120.0, 20.0, 60.0],
    [70.0, 90.0, 40.0],
    [30.0, 60.0, 110.0],
    [90.0, 60.0, 50.0],
];

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);
    };
}

id_newtype!(WorkerId);

#[derive(Debug, Clone, PartialEq)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub expenses: f64,
}

/// Hours logged by one worker, keyed by company index. Absent entries are 0.
pub type HoursRow = BTreeMap<usize, f64>;

/// Which parts of a record were replaced by defaults during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalization {
    pub companies_restored: bool,
    pub roster_restored: bool,
}

impl Normalization {
    pub fn changed(&self) -> bool {
        self.companies_restored || self.roster_restored
    }
}

/// The single editable sheet: roster, company columns and the hours matrix.
///
/// Workers are addressed by position from the outside, but the hours matrix
/// is keyed by each worker's [`WorkerId`], so removing a worker never needs
/// to re-key anyone else's hours. The positional view is rebuilt from the
/// roster order whenever the record is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub version: u32,
    pub month: String,
    pub ss_rate: f64,
    workers: Vec<Worker>,
    companies: Vec<String>,
    hours: BTreeMap<WorkerId, HoursRow>,
    next_worker_id: u64,
}

impl Default for Record {
    fn default() -> Self {
        let mut record = Self::new(
            DEFAULT_MONTH,
            DEFAULT_SS_RATE,
            DEFAULT_COMPANIES.iter().map(|c| c.to_string()).collect(),
        );
        record.install_default_roster();
        record
    }
}

impl Record {
    /// An empty roster with the given companies, tagged with the current
    /// schema version.
    pub fn new(month: impl Into<String>, ss_rate: f64, companies: Vec<String>) -> Self {
        Self {
            version: STATE_VERSION,
            month: month.into(),
            ss_rate,
            workers: Vec::new(),
            companies,
            hours: BTreeMap::new(),
            next_worker_id: 0,
        }
    }

    pub(crate) fn from_positional(
        version: u32,
        month: String,
        ss_rate: f64,
        roster: Vec<(String, f64)>,
        companies: Vec<String>,
        mut rows: BTreeMap<usize, HoursRow>,
    ) -> Self {
        let mut record = Self::new(month, ss_rate, companies);
        record.version = version;
        for (index, (name, expenses)) in roster.into_iter().enumerate() {
            let id = record.push_worker(name, expenses);
            if let Some(row) = rows.remove(&index) {
                record.hours.insert(id, row);
            }
        }
        if !rows.is_empty() {
            tracing::warn!(
                orphaned_rows = rows.len(),
                workers = record.workers.len(),
                "dropping hours rows for workers that are not on the roster"
            );
        }
        record
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn worker(&self, index: usize) -> Option<&Worker> {
        self.workers.get(index)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn worker_index(&self, id: WorkerId) -> Option<usize> {
        self.workers.iter().position(|w| w.id == id)
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    pub fn company_count(&self) -> usize {
        self.companies.len()
    }

    /// Hours for the worker at `worker` and the company at `company`; 0 when
    /// either index is out of range or no entry exists.
    pub fn hours(&self, worker: usize, company: usize) -> f64 {
        self.workers
            .get(worker)
            .map(|w| self.hours_for(w.id, company))
            .unwrap_or(0.0)
    }

    pub fn hours_for(&self, id: WorkerId, company: usize) -> f64 {
        self.hours
            .get(&id)
            .and_then(|row| row.get(&company))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn hours_row(&self, worker: usize) -> Option<&HoursRow> {
        self.workers.get(worker).and_then(|w| self.hours.get(&w.id))
    }

    pub fn add_worker(&mut self, name: impl Into<String>) -> WorkerId {
        self.push_worker(name.into(), 0.0)
    }

    /// Removes the worker at `index` together with its hours. Workers after
    /// it move up one position, carrying their own hours with them.
    pub fn remove_worker(&mut self, index: usize) -> Result<Worker, LedgerError> {
        self.check_worker(index)?;
        let worker = self.workers.remove(index);
        self.hours.remove(&worker.id);
        Ok(worker)
    }

    pub fn rename_worker(&mut self, index: usize, name: impl Into<String>) -> Result<(), LedgerError> {
        self.check_worker(index)?;
        self.workers[index].name = name.into();
        Ok(())
    }

    /// Non-finite values are stored as 0. Negative values are kept.
    pub fn set_hours(&mut self, worker: usize, company: usize, value: f64) -> Result<(), LedgerError> {
        self.check_worker(worker)?;
        self.check_company(company)?;
        let value = if value.is_finite() { value } else { 0.0 };
        let id = self.workers[worker].id;
        self.hours.entry(id).or_default().insert(company, value);
        Ok(())
    }

    pub fn add_company(&mut self, name: impl Into<String>) -> usize {
        self.companies.push(name.into());
        self.companies.len() - 1
    }

    pub fn rename_company(&mut self, index: usize, name: impl Into<String>) -> Result<(), LedgerError> {
        self.check_company(index)?;
        self.companies[index] = name.into();
        Ok(())
    }

    /// Drops the company column at `index` from every row and shifts the
    /// columns after it down by one.
    pub fn remove_company(&mut self, index: usize) -> Result<String, LedgerError> {
        self.check_company(index)?;
        if self.companies.len() == 1 {
            return Err(LedgerError::LastCompany);
        }
        let name = self.companies.remove(index);
        for row in self.hours.values_mut() {
            *row = std::mem::take(row)
                .into_iter()
                .filter(|(company, _)| *company != index)
                .map(|(company, value)| {
                    if company > index {
                        (company - 1, value)
                    } else {
                        (company, value)
                    }
                })
                .collect();
        }
        Ok(name)
    }

    /// Restores the default companies when none are present and the default
    /// roster (with its hours) when no workers are present. The rest of the
    /// record is left alone.
    pub fn normalize(&mut self) -> Normalization {
        let mut outcome = Normalization::default();
        if self.companies.is_empty() {
            self.companies = DEFAULT_COMPANIES.iter().map(|c| c.to_string()).collect();
            outcome.companies_restored = true;
        }
        if self.workers.is_empty() {
            self.hours.clear();
            self.next_worker_id = 0;
            self.install_default_roster();
            outcome.roster_restored = true;
        }
        outcome
    }

    fn install_default_roster(&mut self) {
        for (name, row) in DEFAULT_WORKER_NAMES.iter().zip(DEFAULT_HOURS.iter()) {
            let id = self.push_worker(name.to_string(), 0.0);
            self.hours
                .insert(id, row.iter().copied().enumerate().collect());
        }
    }

    fn push_worker(&mut self, name: String, expenses: f64) -> WorkerId {
        let id = WorkerId(self.next_worker_id);
        self.next_worker_id += 1;
        self.workers.push(Worker { id, name, expenses });
        id
    }

    fn check_worker(&self, index: usize) -> Result<(), LedgerError> {
        if index < self.workers.len() {
            Ok(())
        } else {
            Err(LedgerError::WorkerOutOfRange {
                index,
                len: self.workers.len(),
            })
        }
    }

    fn check_company(&self, index: usize) -> Result<(), LedgerError> {
        if index < self.companies.len() {
            Ok(())
        } else {
            Err(LedgerError::CompanyOutOfRange {
                index,
                len: self.companies.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_company_record() -> Record {
        let mut record = Record::new("May", 10_000.0, vec!["A".into(), "B".into()]);
        record.add_worker("w0");
        record.add_worker("w1");
        record.add_worker("w2");
        record.set_hours(0, 0, 10.0).expect("w0 a");
        record.set_hours(1, 1, 20.0).expect("w1 b");
        record.set_hours(2, 0, 30.0).expect("w2 a");
        record.set_hours(2, 1, 31.0).expect("w2 b");
        record
    }

    #[test]
    fn default_record_matches_seed_roster() {
        let record = Record::default();
        assert_eq!(record.version, STATE_VERSION);
        assert_eq!(record.month, "April");
        assert_eq!(record.ss_rate, 10_000.0);
        assert_eq!(record.companies(), ["Amazon", "Flipkart", "Swiggy"]);
        assert_eq!(record.worker_count(), 11);
        assert_eq!(record.worker(0).expect("ravi").name, "Ravi Kumar");
        assert_eq!(record.hours(0, 0), 160.0);
        assert_eq!(record.hours(10, 2), 50.0);
        assert!(record.workers().iter().all(|w| w.expenses == 0.0));
    }

    #[test]
    fn removing_a_worker_keeps_later_hours_aligned() {
        let mut record = two_company_record();
        let removed = record.remove_worker(1).expect("remove");
        assert_eq!(removed.name, "w1");
        assert_eq!(record.worker_count(), 2);
        assert_eq!(record.worker(1).expect("w2").name, "w2");
        assert_eq!(record.hours(1, 0), 30.0);
        assert_eq!(record.hours(1, 1), 31.0);
        assert_eq!(record.hours(0, 0), 10.0);
    }

    #[test]
    fn removing_out_of_range_worker_is_rejected() {
        let mut record = two_company_record();
        let err = record.remove_worker(3).expect_err("out of range");
        assert_eq!(err, LedgerError::WorkerOutOfRange { index: 3, len: 3 });
        assert_eq!(record.worker_count(), 3);
    }

    #[test]
    fn non_finite_hours_are_stored_as_zero_and_negatives_kept() {
        let mut record = two_company_record();
        record.set_hours(0, 1, f64::NAN).expect("nan");
        record.set_hours(1, 0, -4.0).expect("negative");
        assert_eq!(record.hours(0, 1), 0.0);
        assert_eq!(record.hours(1, 0), -4.0);
    }

    #[test]
    fn removing_a_company_shifts_columns() {
        let mut record = two_company_record();
        record.add_company("C");
        record.set_hours(2, 2, 5.0).expect("w2 c");
        assert_eq!(record.remove_company(0).expect("remove A"), "A");
        assert_eq!(record.companies(), ["B", "C"]);
        assert_eq!(record.hours(2, 0), 31.0);
        assert_eq!(record.hours(2, 1), 5.0);
        assert_eq!(record.hours(0, 0), 0.0);
    }

    #[test]
    fn last_company_cannot_be_removed() {
        let mut record = Record::new("May", 1.0, vec!["Solo".into()]);
        assert_eq!(record.remove_company(0), Err(LedgerError::LastCompany));
    }

    #[test]
    fn normalize_restores_companies_without_touching_roster() {
        let mut record = Record::new("June", 5.0, Vec::new());
        record.add_worker("kept");
        let outcome = record.normalize();
        assert!(outcome.companies_restored);
        assert!(!outcome.roster_restored);
        assert_eq!(record.worker_count(), 1);
        assert_eq!(record.month, "June");
        assert_eq!(record.company_count(), 3);
    }

    #[test]
    fn normalize_restores_roster_and_hours_together() {
        let mut record = Record::new("June", 5.0, vec!["X".into()]);
        let outcome = record.normalize();
        assert!(outcome.roster_restored);
        assert_eq!(record.worker_count(), 11);
        assert_eq!(record.hours(3, 0), 80.0);
        assert_eq!(record.companies(), ["X"]);
    }
}
