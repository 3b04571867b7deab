use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("INPUT_INVALID: {0}")]
    Input(String),
    #[error("PAYLOAD_TOO_LARGE: {0}")]
    PayloadTooLarge(String),
    #[error("ADVISOR_UNAVAILABLE: {0}")]
    Advisor(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Input(_) => "INPUT_INVALID",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Advisor(_) => "ADVISOR_UNAVAILABLE",
            Self::Io(_) => "IO_FAILURE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Input(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Input(value.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Advisor(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
