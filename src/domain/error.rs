//! Domain error types.

/// Failure of the market data adapter. Every provider failure is normalized
/// into one of these before it leaves the adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("no {what} data for {symbol}")]
    Unavailable { symbol: String, what: String },

    #[error("malformed provider payload: {reason}")]
    Malformed { reason: String },

    #[error("provider unreachable: {reason}")]
    ProviderUnreachable { reason: String },
}

impl DataError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        DataError::Malformed {
            reason: reason.into(),
        }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        DataError::ProviderUnreachable {
            reason: reason.into(),
        }
    }
}

/// Top-level error type for goldsignal.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error(transparent)]
    Data(#[from] DataError),

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

    #[error("notification failed: {reason}")]
    Notify { reason: String },

    #[error("invalid risk input: {reason}")]
    RiskInput { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::Data(_) => 3,
            SignalError::Notify { .. } => 4,
            SignalError::RiskInput { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
