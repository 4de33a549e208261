use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("model must not be empty")]
    EmptyModel,
    #[error("invalid solver name {0:?}")]
    InvalidSolver(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = result::Result<T, Error>;
