use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PersistenceError::Io { path: path.into(), source }
    }
}
