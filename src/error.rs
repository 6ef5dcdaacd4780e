/// Message shown when the service gives no usable explanation for a failure
pub const GENERIC_FAILURE: &str = "Request failed";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    HttpError {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("{}", GENERIC_FAILURE)]
    InvalidResponse { status: reqwest::StatusCode },

    #[error("{base_err}")]
    ConnectionError { base_err: reqwest::Error },

    #[error("Error when processing json: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid config file: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    CliError(#[from] clap::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Sync + Send>),
}

#[allow(unused)]
macro_rules! other_err {
    ($x:expr) => {{
        crate::Error::Other($x.into())
    }};
    ($($x:expr),+) => {{
        crate::Error::Other(anyhow::format_err!($($x),+).into())
    }};
}

#[allow(unused)]
pub(crate) use other_err;

pub type Result<T> = std::result::Result<T, crate::Error>;

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if let Some(status) = value.status() {
            let message = value.to_string();
            Self::HttpError { status, message }
        } else {
            Self::ConnectionError { base_err: value }
        }
    }
}

impl Error {
    /// True when the request never got a response from the server
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }
}
