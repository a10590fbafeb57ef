//! Per-category time-series recording with typed schemas.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use super::error::PulsetraderError;
use crate::ports::record_port::RecordPort;

/// Which persisted table a recorder feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportCategory {
    Macro,
    Micro,
    Trade,
}

impl ReportCategory {
    const MACRO_COLUMNS: [Column; 4] = [
        Column::new("datetime", ColumnType::Datetime),
        Column::new("classification", ColumnType::Text),
        Column::new("confidence", ColumnType::Float),
        Column::new("rate_limit", ColumnType::Float),
    ];

    const MICRO_COLUMNS: [Column; 5] = [
        Column::new("datetime", ColumnType::Datetime),
        Column::new("pulse", ColumnType::Text),
        Column::new("strength", ColumnType::Float),
        Column::new("order", ColumnType::Text),
        Column::new("amount", ColumnType::Float),
    ];

    const TRADE_COLUMNS: [Column; 4] = [
        Column::new("datetime", ColumnType::Datetime),
        Column::new("return", ColumnType::Float),
        Column::new("mdd", ColumnType::Float),
        Column::new("sharpe", ColumnType::Float),
    ];

    /// Fixed, ordered column schema. The first column is always the
    /// `datetime` upsert key.
    pub fn columns(&self) -> &'static [Column] {
        match self {
            ReportCategory::Macro => &Self::MACRO_COLUMNS,
            ReportCategory::Micro => &Self::MICRO_COLUMNS,
            ReportCategory::Trade => &Self::TRADE_COLUMNS,
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportCategory::Macro => "macro",
            ReportCategory::Micro => "micro",
            ReportCategory::Trade => "trade",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ReportCategory {
    type Err = PulsetraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "macro" => Ok(ReportCategory::Macro),
            "micro" => Ok(ReportCategory::Micro),
            "trade" => Ok(ReportCategory::Trade),
            _ => Err(PulsetraderError::UnknownReportCategory {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Datetime,
    Text,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    const fn new(name: &'static str, kind: ColumnType) -> Self {
        Column { name, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Datetime(NaiveDateTime),
    Text(String),
    Float(f64),
}

impl RecordValue {
    pub fn kind(&self) -> ColumnType {
        match self {
            RecordValue::Datetime(_) => ColumnType::Datetime,
            RecordValue::Text(_) => ColumnType::Text,
            RecordValue::Float(_) => ColumnType::Float,
        }
    }
}

/// One persisted row, values in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub datetime: NaiveDateTime,
    pub values: Vec<RecordValue>,
}

/// Append-or-update store for one report category. Rows are keyed by
/// timestamp, kept sorted ascending, and pushed through the backing port
/// after every mutation. Construction wipes any previous run's table.
pub struct PeriodRecorder {
    category: ReportCategory,
    rows: Vec<RecordRow>,
    store: Box<dyn RecordPort>,
}

impl PeriodRecorder {
    pub fn new(
        category: ReportCategory,
        mut store: Box<dyn RecordPort>,
    ) -> Result<Self, PulsetraderError> {
        store.reset(category.columns())?;
        Ok(PeriodRecorder {
            category,
            rows: Vec::new(),
            store,
        })
    }

    pub fn category(&self) -> ReportCategory {
        self.category
    }

    pub fn rows(&self) -> &[RecordRow] {
        &self.rows
    }

    /// Upsert one step keyed by its `datetime` value, then persist.
    /// A value missing from the schema, or carrying the wrong type for its
    /// column, fails loudly; nothing is ever stored as null.
    pub fn record_step(
        &mut self,
        values: &[(&str, RecordValue)],
    ) -> Result<(), PulsetraderError> {
        let mut row_values = Vec::with_capacity(self.category.columns().len());
        let mut datetime = None;

        for column in self.category.columns() {
            let value = values
                .iter()
                .find(|(name, _)| *name == column.name)
                .map(|(_, v)| v)
                .ok_or_else(|| PulsetraderError::RecordColumn {
                    column: column.name.to_string(),
                    reason: "missing value".to_string(),
                })?;

            if value.kind() != column.kind {
                return Err(PulsetraderError::RecordColumn {
                    column: column.name.to_string(),
                    reason: format!(
                        "expected {:?}, got {:?}",
                        column.kind,
                        value.kind()
                    ),
                });
            }

            if let RecordValue::Datetime(dt) = value {
                if column.name == "datetime" {
                    datetime = Some(*dt);
                }
            }
            row_values.push(value.clone());
        }

        let datetime = datetime.ok_or_else(|| PulsetraderError::RecordColumn {
            column: "datetime".to_string(),
            reason: "missing value".to_string(),
        })?;

        let row = RecordRow {
            datetime,
            values: row_values,
        };

        match self.rows.iter_mut().find(|r| r.datetime == datetime) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
        self.rows.sort_by_key(|r| r.datetime);

        self.store.persist(self.category.columns(), &self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct StoreLog {
        resets: usize,
        persists: usize,
        last_row_count: usize,
    }

    struct MemoryStore {
        log: Rc<RefCell<StoreLog>>,
    }

    impl RecordPort for MemoryStore {
        fn reset(&mut self, _columns: &[Column]) -> Result<(), PulsetraderError> {
            self.log.borrow_mut().resets += 1;
            Ok(())
        }

        fn persist(
            &mut self,
            _columns: &[Column],
            rows: &[RecordRow],
        ) -> Result<(), PulsetraderError> {
            let mut log = self.log.borrow_mut();
            log.persists += 1;
            log.last_row_count = rows.len();
            Ok(())
        }
    }

    fn recorder(category: ReportCategory) -> (PeriodRecorder, Rc<RefCell<StoreLog>>) {
        let log = Rc::new(RefCell::new(StoreLog::default()));
        let store = MemoryStore { log: log.clone() };
        let recorder = PeriodRecorder::new(category, Box::new(store)).unwrap();
        (recorder, log)
    }

    fn dt(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn macro_step(day: u32, rate_limit: f64) -> Vec<(&'static str, RecordValue)> {
        vec![
            ("datetime", RecordValue::Datetime(dt(day))),
            ("classification", RecordValue::Text("bull".into())),
            ("confidence", RecordValue::Float(0.8)),
            ("rate_limit", RecordValue::Float(rate_limit)),
        ]
    }

    #[test]
    fn schemas_lead_with_the_datetime_key() {
        for category in [
            ReportCategory::Macro,
            ReportCategory::Micro,
            ReportCategory::Trade,
        ] {
            let columns = category.columns();
            assert_eq!(columns[0].name, "datetime");
            assert_eq!(columns[0].kind, ColumnType::Datetime);
        }
        assert_eq!(ReportCategory::Macro.columns().len(), 4);
        assert_eq!(ReportCategory::Micro.columns().len(), 5);
        assert_eq!(ReportCategory::Trade.columns().len(), 4);
    }

    #[test]
    fn category_parse() {
        assert_eq!("trade".parse::<ReportCategory>().unwrap(), ReportCategory::Trade);
        let err = "weekly".parse::<ReportCategory>().unwrap_err();
        assert!(matches!(err, PulsetraderError::UnknownReportCategory { .. }));
    }

    #[test]
    fn construction_resets_the_store() {
        let (_recorder, log) = recorder(ReportCategory::Macro);
        assert_eq!(log.borrow().resets, 1);
        assert_eq!(log.borrow().persists, 0);
    }

    #[test]
    fn record_step_appends_and_persists() {
        let (mut recorder, log) = recorder(ReportCategory::Macro);
        recorder.record_step(&macro_step(1, 0.5)).unwrap();
        recorder.record_step(&macro_step(2, 0.6)).unwrap();
        assert_eq!(recorder.rows().len(), 2);
        assert_eq!(log.borrow().persists, 2);
        assert_eq!(log.borrow().last_row_count, 2);
    }

    #[test]
    fn same_timestamp_updates_in_place() {
        let (mut recorder, log) = recorder(ReportCategory::Macro);
        recorder.record_step(&macro_step(1, 0.5)).unwrap();
        recorder.record_step(&macro_step(1, 0.7)).unwrap();

        assert_eq!(recorder.rows().len(), 1);
        assert_eq!(log.borrow().last_row_count, 1);
        assert_eq!(recorder.rows()[0].values[3], RecordValue::Float(0.7));
    }

    #[test]
    fn rows_stay_sorted_by_timestamp() {
        let (mut recorder, _log) = recorder(ReportCategory::Macro);
        recorder.record_step(&macro_step(3, 0.5)).unwrap();
        recorder.record_step(&macro_step(1, 0.5)).unwrap();
        recorder.record_step(&macro_step(2, 0.5)).unwrap();

        let days: Vec<NaiveDateTime> =
            recorder.rows().iter().map(|r| r.datetime).collect();
        assert_eq!(days, vec![dt(1), dt(2), dt(3)]);
    }

    #[test]
    fn wrong_type_fails_loudly() {
        let (mut recorder, log) = recorder(ReportCategory::Macro);
        let step = vec![
            ("datetime", RecordValue::Datetime(dt(1))),
            ("classification", RecordValue::Text("bull".into())),
            ("confidence", RecordValue::Text("high".into())),
            ("rate_limit", RecordValue::Float(0.5)),
        ];
        let err = recorder.record_step(&step).unwrap_err();
        assert!(matches!(err, PulsetraderError::RecordColumn { .. }));
        assert_eq!(log.borrow().persists, 0);
    }

    #[test]
    fn missing_column_fails_loudly() {
        let (mut recorder, _log) = recorder(ReportCategory::Trade);
        let step = vec![
            ("datetime", RecordValue::Datetime(dt(1))),
            ("return", RecordValue::Float(1.0)),
            ("mdd", RecordValue::Float(0.0)),
        ];
        let err = recorder.record_step(&step).unwrap_err();
        match err {
            PulsetraderError::RecordColumn { column, .. } => {
                assert_eq!(column, "sharpe")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
