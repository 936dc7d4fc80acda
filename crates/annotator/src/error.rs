//! Error type for narrative annotation.

#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error("narrative service credential not configured")]
    MissingCredential,
    #[error("narrative service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("narrative service returned HTTP status {0}")]
    Status(u16),
    #[error("narrative service response was malformed: {0}")]
    MalformedResponse(String),
    #[error("narrative service timed out")]
    Timeout,
}

pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
