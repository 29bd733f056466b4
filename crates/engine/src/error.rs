use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("API client error: {0}")]
    ApiClient(#[from] api_client::error::ApiError),

    #[error("Price source '{0}' did not answer within {1:?}")]
    Timeout(&'static str, std::time::Duration),
}
