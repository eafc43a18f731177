use std::fmt;
use std::time::Duration;

/// Why a recommendation fetch produced no result set. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Catalog {
        backend: &'static str,
        message: String,
    },
    Timeout {
        backend: &'static str,
        after: Duration,
    },
}

impl FetchError {
    pub fn catalog(backend: &'static str, err: &anyhow::Error) -> Self {
        FetchError::Catalog {
            backend,
            message: format!("{err:#}"),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Catalog { message, .. } => {
                write!(f, "could not load rackets from the catalog: {message}")
            }
            FetchError::Timeout { after, .. } => write!(
                f,
                "the catalog did not answer within {}s, please try again",
                after.as_secs()
            ),
        }
    }
}

impl std::error::Error for FetchError {}
