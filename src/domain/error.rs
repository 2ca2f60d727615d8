//! Domain error types.
//!
//! Only genuine failures are errors. Insufficient data is expressed as
//! `Option`/skip and risk rejections are values (`risk::Verdict`), so the
//! orchestrator can treat everything here as "log and move on to the next
//! instrument".

/// Top-level error type for fxforge.
#[derive(Debug, thiserror::Error)]
pub enum FxforgeError {
    #[error("store failure during {operation}: {reason}")]
    Store { operation: String, reason: String },

    #[error("trade {id} not found")]
    TradeNotFound { id: i64 },

    #[error("trade {id} is not open")]
    TradeNotOpen { id: i64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data import error in {file}: {reason}")]
    DataImport { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FxforgeError {
    /// Store failure with the failing operation as context.
    pub fn store(operation: &str, reason: impl ToString) -> Self {
        FxforgeError::Store {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<&FxforgeError> for std::process::ExitCode {
    fn from(err: &FxforgeError) -> Self {
        let code: u8 = match err {
            FxforgeError::Io(_) => 1,
            FxforgeError::ConfigParse { .. } | FxforgeError::ConfigInvalid { .. } => 2,
            FxforgeError::Store { .. } => 3,
            FxforgeError::DataImport { .. } => 4,
            FxforgeError::TradeNotFound { .. } | FxforgeError::TradeNotOpen { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_helper_carries_context() {
        let err = FxforgeError::store("latest_bar", "connection reset");
        assert_eq!(
            err.to_string(),
            "store failure during latest_bar: connection reset"
        );
    }
}
