#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid layout options: {message}")]
    InvalidOptions { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidOptions {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
