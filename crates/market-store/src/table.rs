use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use analysis_core::{AnalysisError, Keyed};
use serde::{de::DeserializeOwned, Serialize};

/// A CSV file holding rows of one record type.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers see either the old table or the new one, never a partial file.
#[derive(Debug, Clone)]
pub struct CsvTable<R> {
    path: PathBuf,
    _record: PhantomData<fn() -> R>,
}

impl<R> CsvTable<R>
where
    R: Keyed + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// All rows in file order. A missing file is a `MissingArtifact` error.
    pub fn load(&self) -> Result<Vec<R>, AnalysisError> {
        if !self.exists() {
            return Err(AnalysisError::MissingArtifact(self.path.clone()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.storage_error(e))?;

        let headers = reader.headers().map_err(|e| self.storage_error(e))?.clone();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| self.storage_error(e))?;
            // Rows with nothing in them are padding, not data
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let row: R = record.deserialize(Some(&headers)).map_err(|e| {
                AnalysisError::InvalidData(format!("{}: {}", self.path.display(), e))
            })?;
            rows.push(row);
        }

        Ok(rows)
    }

    /// All rows, or an empty vector when the file does not exist yet.
    pub fn load_or_empty(&self) -> Result<Vec<R>, AnalysisError> {
        match self.load() {
            Err(AnalysisError::MissingArtifact(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    /// The last row of the table.
    pub fn latest(&self) -> Result<R, AnalysisError> {
        self.load()?.pop().ok_or_else(|| {
            AnalysisError::InsufficientData(format!("{} has no rows", self.path.display()))
        })
    }

    pub fn replace_all(&self, rows: &[R]) -> Result<(), AnalysisError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        {
            let mut writer = csv::Writer::from_path(&tmp).map_err(|e| self.storage_error(e))?;
            for row in rows {
                writer.serialize(row).map_err(|e| self.storage_error(e))?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    /// Insert or replace the row sharing `row`'s key. The table is kept
    /// ordered by key and duplicate keys collapse to their last occurrence.
    pub fn upsert(&self, row: R) -> Result<(), AnalysisError> {
        let mut rows = self.load_or_empty()?;
        rows.push(row);
        let mut rows = dedup_keep_last(rows);
        rows.sort_by_key(|r| r.key());
        self.replace_all(&rows)
    }

    /// Append the rows whose key is not already stored, keeping key order.
    /// Returns how many rows were added.
    pub fn merge_new(&self, incoming: Vec<R>) -> Result<usize, AnalysisError> {
        let mut rows = self.load_or_empty()?;
        let existing: std::collections::BTreeSet<R::Key> = rows.iter().map(|r| r.key()).collect();

        let fresh: Vec<R> = dedup_keep_last(incoming)
            .into_iter()
            .filter(|r| !existing.contains(&r.key()))
            .collect();
        let added = fresh.len();

        rows.extend(fresh);
        rows.sort_by_key(|r| r.key());
        self.replace_all(&rows)?;

        Ok(added)
    }

    /// Drop rows from the front until at most `n` remain. Returns how many were dropped.
    pub fn retain_last(&self, n: usize) -> Result<usize, AnalysisError> {
        let rows = self.load_or_empty()?;
        let drop = rows.len().saturating_sub(n);
        if drop > 0 {
            self.replace_all(&rows[drop..])?;
        }
        Ok(drop)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table.csv".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    fn storage_error(&self, e: csv::Error) -> AnalysisError {
        AnalysisError::StorageError(format!("{}: {}", self.path.display(), e))
    }
}

/// Collapse rows with equal keys to the last occurrence, keeping the
/// position of that occurrence.
pub fn dedup_keep_last<R: Keyed>(rows: Vec<R>) -> Vec<R> {
    let mut last_index: BTreeMap<R::Key, usize> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_index.insert(row.key(), i);
    }

    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| last_index.get(&row.key()) == Some(i))
        .map(|(_, row)| row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{ForecastRecord, PriceRecord};
    use chrono::NaiveDate;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("market-store-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(date: &str, close: f64) -> PriceRecord {
        PriceRecord {
            date: d(date),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_missing_file_is_missing_artifact() {
        let dir = temp_dir();
        let table: CsvTable<PriceRecord> = CsvTable::new(dir.join("stocks_data.csv"));

        let err = table.load().unwrap_err();
        assert!(err.is_missing_artifact());
        assert!(err.to_string().contains("stocks_data.csv"));
        assert!(table.load_or_empty().unwrap().is_empty());
        assert!(table.latest().is_err());
    }

    #[test]
    fn test_replace_all_and_load() {
        let dir = temp_dir();
        let table = CsvTable::new(dir.join("stocks_data.csv"));
        table
            .replace_all(&[bar("2025-01-02", 100.0), bar("2025-01-03", 101.0)])
            .unwrap();

        let rows: Vec<PriceRecord> = table.load().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(table.latest().unwrap().close, 101.0);

        let raw = fs::read_to_string(table.path()).unwrap();
        assert!(raw.starts_with("Date,Open,High,Low,Close,Volume"));
        assert!(raw.contains("2025-01-02"));
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let dir = temp_dir();
        let path = dir.join("predicted_prices.csv");
        fs::write(&path, "Date,Predicted_Price\n2025-01-02,100.5\n,\n2025-01-03,101.5\n").unwrap();

        let table: CsvTable<ForecastRecord> = CsvTable::new(path);
        let rows = table.load().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].date, d("2025-01-03"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let dir = temp_dir();
        let table = CsvTable::new(dir.join("predicted_prices.csv"));
        let row = ForecastRecord {
            date: d("2025-01-06"),
            predicted_price: 23500.0,
        };

        table.upsert(row.clone()).unwrap();
        table.upsert(row.clone()).unwrap();
        assert_eq!(table.load().unwrap(), vec![row]);

        table
            .upsert(ForecastRecord {
                date: d("2025-01-06"),
                predicted_price: 23600.0,
            })
            .unwrap();
        let rows = table.load().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].predicted_price, 23600.0);
    }

    #[test]
    fn test_upsert_keeps_date_order() {
        let dir = temp_dir();
        let table = CsvTable::new(dir.join("predicted_prices.csv"));
        for (date, price) in [("2025-01-07", 2.0), ("2025-01-06", 1.0)] {
            table
                .upsert(ForecastRecord {
                    date: d(date),
                    predicted_price: price,
                })
                .unwrap();
        }
        assert_eq!(table.latest().unwrap().date, d("2025-01-07"));
    }

    #[test]
    fn test_merge_new_skips_existing_keys() {
        let dir = temp_dir();
        let table = CsvTable::new(dir.join("stocks_data.csv"));
        table.replace_all(&[bar("2025-01-02", 100.0)]).unwrap();

        let added = table
            .merge_new(vec![bar("2025-01-02", 999.0), bar("2025-01-03", 101.0)])
            .unwrap();
        assert_eq!(added, 1);

        let rows: Vec<PriceRecord> = table.load().unwrap();
        assert_eq!(rows.len(), 2);
        // History is immutable
        assert_eq!(rows[0].close, 100.0);

        assert_eq!(table.merge_new(vec![bar("2025-01-03", 5.0)]).unwrap(), 0);
    }

    #[test]
    fn test_retain_last() {
        let dir = temp_dir();
        let table = CsvTable::new(dir.join("fgi_data.csv"));
        table
            .replace_all(&[bar("2025-01-01", 1.0), bar("2025-01-02", 2.0), bar("2025-01-03", 3.0)])
            .unwrap();

        assert_eq!(table.retain_last(2).unwrap(), 1);
        let rows: Vec<PriceRecord> = table.load().unwrap();
        assert_eq!(rows.first().unwrap().date, d("2025-01-02"));
        assert_eq!(table.retain_last(5).unwrap(), 0);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = temp_dir();
        let table = CsvTable::new(dir.join("stocks_data.csv"));
        table.replace_all(&[bar("2025-01-02", 100.0)]).unwrap();

        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["stocks_data.csv".to_string()]);
    }

    #[test]
    fn test_dedup_keep_last() {
        let rows = vec![bar("2025-01-02", 1.0), bar("2025-01-03", 2.0), bar("2025-01-02", 3.0)];
        let out = dedup_keep_last(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, d("2025-01-03"));
        assert_eq!(out[1].close, 3.0);
    }
}
