use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("{message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid filter: {0}")]
    InvalidWhereClause(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
