use shared::{
    domain::Record,
    error::{LedgerError, StoreError},
    numeric::coerce_number,
};
use storage::{KeyValueStore, LoadOutcome, StateStore};
use tracing::{debug, info, warn};

use crate::{Change, Derived, RESET_PROMPT, SAVED_ACKNOWLEDGEMENT};

/// Receives every applied change together with the state it produced.
pub trait StateObserver {
    fn on_change(&mut self, change: Change, record: &Record, derived: &Derived);
}

impl<F> StateObserver for F
where
    F: FnMut(Change, &Record, &Derived),
{
    fn on_change(&mut self, change: Change, record: &Record, derived: &Derived) {
        self(change, record, derived)
    }
}

/// User-facing gate for destructive actions and the notice after an
/// explicit save.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
    fn acknowledge(&mut self, message: &str);
}

/// Owns the record for the lifetime of the app. Every mutation is persisted
/// immediately, refreshes the derived snapshot and notifies observers before
/// returning.
pub struct Session<S> {
    store: StateStore<S>,
    record: Record,
    derived: Derived,
    load_outcome: LoadOutcome,
    observers: Vec<Box<dyn StateObserver>>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn open(store: StateStore<S>) -> Self {
        let loaded = store.load_with_outcome();
        let derived = Derived::compute(&loaded.record);
        info!(
            outcome = ?loaded.outcome,
            workers = loaded.record.worker_count(),
            companies = loaded.record.company_count(),
            "session opened"
        );
        Self {
            store,
            record: loaded.record,
            derived,
            load_outcome: loaded.outcome,
            observers: Vec::new(),
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn subscribe(&mut self, observer: impl StateObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn add_worker(&mut self, name: impl Into<String>) -> Change {
        self.record.add_worker(name);
        self.commit(Change::Structural)
    }

    pub fn remove_worker(&mut self, index: usize) -> Result<Change, LedgerError> {
        let removed = self.record.remove_worker(index)?;
        debug!(index, name = %removed.name, "worker removed");
        Ok(self.commit(Change::Structural))
    }

    pub fn rename_worker(&mut self, index: usize, name: impl Into<String>) -> Result<Change, LedgerError> {
        self.record.rename_worker(index, name)?;
        Ok(self.commit(Change::WorkerName { worker: index }))
    }

    /// Applies raw field input; anything non-numeric becomes 0.
    pub fn edit_hours(&mut self, worker: usize, company: usize, raw: &str) -> Result<Change, LedgerError> {
        self.set_hours(worker, company, coerce_number(raw))
    }

    pub fn set_hours(&mut self, worker: usize, company: usize, hours: f64) -> Result<Change, LedgerError> {
        self.record.set_hours(worker, company, hours)?;
        Ok(self.commit(Change::HoursCell { worker, company }))
    }

    pub fn edit_rate(&mut self, raw: &str) -> Change {
        self.set_rate(coerce_number(raw))
    }

    pub fn set_rate(&mut self, rate: f64) -> Change {
        self.record.ss_rate = rate;
        self.commit(Change::Rate)
    }

    pub fn set_month(&mut self, month: impl Into<String>) -> Change {
        self.record.month = month.into();
        self.commit(Change::Month)
    }

    pub fn add_company(&mut self, name: impl Into<String>) -> Change {
        self.record.add_company(name);
        self.commit(Change::Structural)
    }

    pub fn rename_company(&mut self, index: usize, name: impl Into<String>) -> Result<Change, LedgerError> {
        self.record.rename_company(index, name)?;
        Ok(self.commit(Change::CompanyName { company: index }))
    }

    pub fn remove_company(&mut self, index: usize) -> Result<Change, LedgerError> {
        let removed = self.record.remove_company(index)?;
        debug!(index, name = %removed, "company removed");
        Ok(self.commit(Change::Structural))
    }

    /// Flushes the record and acknowledges only once the write succeeded.
    pub fn save(&mut self, confirm: &mut impl Confirm) -> Result<(), StoreError> {
        self.store.save(&self.record)?;
        info!(key = self.store.key(), "record saved");
        confirm.acknowledge(SAVED_ACKNOWLEDGEMENT);
        Ok(())
    }

    /// Restores and persists the default record if the user agrees.
    /// Returns whether the reset happened.
    pub fn reset(&mut self, confirm: &mut impl Confirm) -> bool {
        if !confirm.confirm(RESET_PROMPT) {
            debug!("reset declined");
            return false;
        }
        self.record = self.store.reset();
        self.refresh(Change::Structural);
        true
    }

    fn commit(&mut self, change: Change) -> Change {
        if let Err(err) = self.store.save(&self.record) {
            warn!(error = %err, ?change, "failed to persist record after edit");
        }
        self.refresh(change);
        change
    }

    fn refresh(&mut self, change: Change) {
        self.derived.refresh(&self.record, change);
        for observer in &mut self.observers {
            observer.on_change(change, &self.record, &self.derived);
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
