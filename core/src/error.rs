//! Error types for the Eventful API client.
//!
//! # Design
//! Only failures the caller cannot act on through the normal result are
//! errors here. A service-reported error (an `<error>` root element or a
//! JSON `error` flag) is a successful round-trip and comes back as
//! `CallResult::Failure`, never as an `EventfulError`.

/// Errors returned by `EventfulClient` and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum EventfulError {
    /// The client was configured with an empty app key or an incomplete
    /// OAuth credential bundle.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An argument cannot be encoded for the channel the call uses, e.g. a
    /// file outside a multipart upload.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The response body is not well-formed XML.
    #[error("malformed XML response: {0}")]
    Xml(String),

    /// The response body is not valid JSON.
    #[error("malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTTP round-trip itself failed (connection refused, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ureq::Error> for EventfulError {
    fn from(err: ureq::Error) -> Self {
        EventfulError::Transport(Box::new(err))
    }
}

impl From<quick_xml::Error> for EventfulError {
    fn from(err: quick_xml::Error) -> Self {
        EventfulError::Xml(err.to_string())
    }
}
