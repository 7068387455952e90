use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskmanagerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
