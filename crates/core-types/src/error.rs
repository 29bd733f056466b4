use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown trade status: {0}")]
    UnknownStatus(String),
}
