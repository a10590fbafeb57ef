//! CSV record store: one flat file per report category per run.

use std::path::{Path, PathBuf};

use crate::domain::error::PulsetraderError;
use crate::domain::record::{Column, RecordRow, RecordValue, ReportCategory};
use crate::ports::record_port::RecordPort;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    /// Store under `{results_dir}/{category}/{market}.csv`.
    pub fn new(results_dir: &Path, category: ReportCategory, market: &str) -> Self {
        let path = results_dir
            .join(category.to_string())
            .join(format!("{market}.csv"));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_table(
        &self,
        columns: &[Column],
        rows: &[RecordRow],
    ) -> Result<(), PulsetraderError> {
        let mut writer =
            csv::Writer::from_path(&self.path).map_err(|e| PulsetraderError::Data {
                reason: format!("failed to open {}: {}", self.path.display(), e),
            })?;

        writer
            .write_record(columns.iter().map(|c| c.name))
            .map_err(|e| PulsetraderError::Data {
                reason: format!("failed to write header: {e}"),
            })?;

        for row in rows {
            let fields: Vec<String> = row.values.iter().map(format_value).collect();
            writer
                .write_record(&fields)
                .map_err(|e| PulsetraderError::Data {
                    reason: format!("failed to write row: {e}"),
                })?;
        }

        writer.flush().map_err(|e| PulsetraderError::Data {
            reason: format!("failed to flush {}: {}", self.path.display(), e),
        })
    }
}

fn format_value(value: &RecordValue) -> String {
    match value {
        RecordValue::Datetime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        RecordValue::Text(s) => s.clone(),
        RecordValue::Float(f) => f.to_string(),
    }
}

impl RecordPort for CsvRecordStore {
    fn reset(&mut self, columns: &[Column]) -> Result<(), PulsetraderError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // A previous run's table must never be appended to.
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        self.write_table(columns, &[])
    }

    fn persist(
        &mut self,
        columns: &[Column],
        rows: &[RecordRow],
    ) -> Result<(), PulsetraderError> {
        self.write_table(columns, rows)
    }
}
