//! The JSON shape a record takes in the key-value store.
//!
//! Workers and hours are positional here: hours rows are keyed by the
//! worker's index in `workers`, columns by the company's index in
//! `companies`. Reading is lenient about numbers because earlier sessions
//! may have stored strings or `null` (a NaN serializes as `null`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{HoursRow, Record, STATE_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(default, deserialize_with = "lenient::version")]
    pub version: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub month: String,
    #[serde(rename = "ssRate", default, deserialize_with = "lenient::number")]
    pub ss_rate: f64,
    #[serde(default, deserialize_with = "lenient::list")]
    pub workers: Vec<PersistedWorker>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub companies: Vec<String>,
    #[serde(default, deserialize_with = "lenient::hours")]
    pub hours: BTreeMap<usize, HoursRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedWorker {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub expenses: f64,
}

impl PersistedRecord {
    /// A record with no version, or a version below the current schema, is
    /// not migrated; callers replace it wholesale.
    pub fn is_outdated(&self) -> bool {
        self.version.map_or(true, |v| v < i64::from(STATE_VERSION))
    }
}

impl From<&Record> for PersistedRecord {
    fn from(record: &Record) -> Self {
        let hours = (0..record.worker_count())
            .filter_map(|index| {
                record
                    .hours_row(index)
                    .filter(|row| !row.is_empty())
                    .map(|row| (index, row.clone()))
            })
            .collect();
        Self {
            version: Some(i64::from(record.version)),
            month: record.month.clone(),
            ss_rate: record.ss_rate,
            workers: record
                .workers()
                .iter()
                .map(|w| PersistedWorker {
                    name: w.name.clone(),
                    expenses: w.expenses,
                })
                .collect(),
            companies: record.companies().to_vec(),
            hours,
        }
    }
}

impl From<PersistedRecord> for Record {
    fn from(persisted: PersistedRecord) -> Self {
        let version = persisted
            .version
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(STATE_VERSION);
        Record::from_positional(
            version,
            persisted.month,
            persisted.ss_rate,
            persisted
                .workers
                .into_iter()
                .map(|w| (w.name, w.expenses))
                .collect(),
            persisted.companies,
            persisted.hours,
        )
    }
}

mod lenient {
    use std::collections::BTreeMap;

    use serde::{de::DeserializeOwned, Deserialize, Deserializer};
    use serde_json::Value;

    use crate::{domain::HoursRow, numeric::coerce_json};

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(coerce_json(&Value::deserialize(deserializer)?))
    }

    /// Zero and non-numeric versions count as missing.
    pub fn version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        let value = coerce_json(&Value::deserialize(deserializer)?);
        Ok((value != 0.0).then(|| value.trunc() as i64))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        })
    }

    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Rows or columns whose keys are not indices are skipped.
    pub fn hours<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<usize, HoursRow>, D::Error> {
        let Value::Object(rows) = Value::deserialize(deserializer)? else {
            return Ok(BTreeMap::new());
        };
        Ok(rows
            .into_iter()
            .filter_map(|(worker, row)| {
                let worker = worker.trim().parse::<usize>().ok()?;
                let Value::Object(cells) = row else {
                    return Some((worker, HoursRow::new()));
                };
                let row = cells
                    .into_iter()
                    .filter_map(|(company, value)| {
                        Some((company.trim().parse::<usize>().ok()?, coerce_json(&value)))
                    })
                    .collect();
                Some((worker, row))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_positional_string_keys() {
        let mut record = Record::new("April", 10_000.0, vec!["A".into(), "B".into()]);
        record.add_worker("first");
        record.add_worker("second");
        record.set_hours(0, 0, 100.0).expect("cell");
        record.set_hours(1, 1, 50.0).expect("cell");

        let value = serde_json::to_value(PersistedRecord::from(&record)).expect("encode");
        assert_eq!(
            value,
            json!({
                "version": 3,
                "month": "April",
                "ssRate": 10000.0,
                "workers": [
                    {"name": "first", "expenses": 0.0},
                    {"name": "second", "expenses": 0.0}
                ],
                "companies": ["A", "B"],
                "hours": {"0": {"0": 100.0}, "1": {"1": 50.0}}
            })
        );
    }

    #[test]
    fn positional_keys_close_up_after_removal() {
        let mut record = Record::new("April", 1.0, vec!["A".into()]);
        for (name, hours) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)] {
            record.add_worker(name);
            let index = record.worker_count() - 1;
            record.set_hours(index, 0, hours).expect("cell");
        }
        record.remove_worker(1).expect("remove b");

        let persisted = PersistedRecord::from(&record);
        let keys: Vec<usize> = persisted.hours.keys().copied().collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(persisted.hours[&1][&0], 3.0);
        assert_eq!(persisted.hours[&2][&0], 4.0);
    }

    #[test]
    fn reads_browser_shaped_blob_leniently() {
        let blob = r#"{
            "version": 3,
            "month": "May",
            "ssRate": null,
            "workers": [{"name": "Ravi", "expenses": "12"}, {"name": "Sita"}],
            "companies": ["Amazon"],
            "hours": {"0": {"0": "40", "1": null}, "1": {"0": 8}, "junk": {"0": 1}}
        }"#;
        let persisted: PersistedRecord = serde_json::from_str(blob).expect("decode");
        assert_eq!(persisted.version, Some(3));
        assert_eq!(persisted.ss_rate, 0.0);
        assert_eq!(persisted.workers[0].expenses, 12.0);
        assert_eq!(persisted.workers[1].expenses, 0.0);
        assert_eq!(persisted.hours[&0][&0], 40.0);
        assert_eq!(persisted.hours[&0][&1], 0.0);
        assert_eq!(persisted.hours.len(), 2);
    }

    #[test]
    fn missing_or_zero_version_is_outdated() {
        let missing: PersistedRecord = serde_json::from_str(r#"{"month":"May"}"#).expect("decode");
        assert!(missing.is_outdated());
        let zero: PersistedRecord = serde_json::from_str(r#"{"version":0}"#).expect("decode");
        assert!(zero.is_outdated());
        let old: PersistedRecord = serde_json::from_str(r#"{"version":2}"#).expect("decode");
        assert!(old.is_outdated());
        let newer: PersistedRecord = serde_json::from_str(r#"{"version":4}"#).expect("decode");
        assert!(!newer.is_outdated());
    }

    #[test]
    fn round_trips_the_default_record() {
        let record = Record::default();
        let text = serde_json::to_string(&PersistedRecord::from(&record)).expect("encode");
        let persisted: PersistedRecord = serde_json::from_str(&text).expect("decode");
        assert_eq!(Record::from(persisted), record);
    }

    #[test]
    fn drops_rows_beyond_the_roster() {
        let blob = r#"{"version":3,"workers":[{"name":"only"}],"companies":["A"],
            "hours":{"0":{"0":5},"4":{"0":9}}}"#;
        let persisted: PersistedRecord = serde_json::from_str(blob).expect("decode");
        let record = Record::from(persisted);
        assert_eq!(record.worker_count(), 1);
        assert_eq!(record.hours(0, 0), 5.0);
        assert_eq!(PersistedRecord::from(&record).hours.len(), 1);
    }
}
