use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("source {0} is not registered")]
    SourceNotFound(i64),
    #[error("source {0} is already registered")]
    SourceExists(i64),
}
