use alloy_primitives::B256;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("http {status}: {text}")]
    HttpStatus { status: StatusCode, text: String },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<alloy_sol_types::Error> for ChainError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
