pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("payload JSON error: {0}")]
    PayloadJson(#[source] serde_json::Error),

    #[error("config JSON error: {0}")]
    ConfigJson(#[source] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("invalid color {value:?} (expected #RRGGBB)")]
    InvalidColor { value: String },
}
