use thiserror::Error;

/// Errors from loading trade batches. The metric functions themselves are total and
/// never fail.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Failed to decode trade records: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to read trade records: {0}")]
    Io(#[from] std::io::Error),
}
