//! Domain error types.

/// Top-level error type for pulsetrader.
#[derive(Debug, thiserror::Error)]
pub enum PulsetraderError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown tick '{value}'")]
    UnknownTick { value: String },

    #[error("unknown report category '{value}'")]
    UnknownReportCategory { value: String },

    #[error("missing price field '{field}' at {datetime}")]
    MissingPriceField { field: String, datetime: String },

    #[error("non-positive price at {datetime}: {value}")]
    NonPositivePrice { datetime: String, value: f64 },

    #[error("record column '{column}': {reason}")]
    RecordColumn { column: String, reason: String },

    #[error("indicator error: {reason}")]
    Indicator { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PulsetraderError {
    /// Process exit code group for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PulsetraderError::Io(_) => 1,
            PulsetraderError::ConfigParse { .. }
            | PulsetraderError::ConfigMissing { .. }
            | PulsetraderError::ConfigInvalid { .. }
            | PulsetraderError::UnknownTick { .. }
            | PulsetraderError::UnknownReportCategory { .. } => 2,
            PulsetraderError::Data { .. }
            | PulsetraderError::MissingPriceField { .. }
            | PulsetraderError::NonPositivePrice { .. } => 3,
            PulsetraderError::RecordColumn { .. } => 4,
            PulsetraderError::Indicator { .. } => 5,
        }
    }
}

impl From<&PulsetraderError> for std::process::ExitCode {
    fn from(err: &PulsetraderError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}
