use thiserror::Error;

pub type AllocResult<T> = Result<T, AllocError>;

#[derive(Error, Debug)]
pub enum AllocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Workbook import error: {0}")]
    Import(String),

    #[error("Workbook export error: {0}")]
    Export(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for AllocError {
    fn from(e: csv::Error) -> Self {
        AllocError::Export(format!("CSV: {}", e))
    }
}

impl From<rust_xlsxwriter::XlsxError> for AllocError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AllocError::Export(e.to_string())
    }
}
