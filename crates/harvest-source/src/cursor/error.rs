use thiserror::Error;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("failed to parse timestamp {value:?}: {source}")]
    Parse {
        value: String,
        #[source]
        source: time::error::Parse,
    },

    #[error("failed to format timestamp: {0}")]
    Format(#[from] time::error::Format),

    #[error("timestamp {0:?} cannot be advanced")]
    Overflow(String),
}
