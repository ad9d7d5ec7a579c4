#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse {file}:{line}:{col}: {message}")]
    Parse {
        file: String,
        line: usize,
        col: usize,
        message: String,
    },

    #[error("marker at {line}:{col} is not followed by a name or an expression")]
    DanglingMarker { line: usize, col: usize },

    #[error("invalid plugin config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("marker cannot be compiled into a pattern: {0}")]
    Marker(#[from] regex::Error),
}
