use thiserror::Error;

/// Why a single cell value could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("unparseable date '{0}'")]
    Date(String),

    #[error("date serial {0} is out of range")]
    DateSerial(String),

    #[error("non-numeric duration '{0}'")]
    Duration(String),

    #[error("negative duration '{0}'")]
    NegativeDuration(String),

    #[error("unknown source kind '{0}'")]
    SourceKind(String),
}
