use thiserror::Error;

/// Errors raised while shaping series into training datasets
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Insufficient data: need {required} rows for one window pair, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Missing indicator values on candle at timestamp {timestamp}")]
    MissingIndicators { timestamp: i64 },
}

/// Errors related to the remote market data source
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Invalid payload from market data API: {reason}")]
    InvalidPayload { reason: String },

    #[error("Retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_names_both_sizes() {
        let err = DatasetError::InsufficientData {
            required: 84,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("84"));
        assert!(msg.contains("4"));
    }

    #[test]
    fn retries_exhausted_reports_attempts() {
        let err = MarketDataError::RetriesExhausted { attempts: 6 };
        assert!(err.to_string().contains("6"));
    }
}
