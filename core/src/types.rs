//! Domain types: method arguments, response formats and call outcomes.

use std::fmt;

use crate::xml::XmlElement;

/// Raw file content sent as a multipart upload part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// A single argument value: a scalar, a list of scalars, or a file.
///
/// Lists do not aggregate. When a call is encoded, only the last element of
/// a list reaches the wire, and an empty list sends nothing. Files can only
/// travel in a multipart body, i.e. on the OAuth channel under a `*_file`
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Scalar(String),
    List(Vec<String>),
    File(FileUpload),
}

impl ArgValue {
    pub fn file(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        ArgValue::File(FileUpload::new(filename, content))
    }
}

impl From<FileUpload> for ArgValue {
    fn from(upload: FileUpload) -> Self {
        ArgValue::File(upload)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Scalar(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Scalar(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Scalar(value.to_string())
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::Scalar(value.to_string())
    }
}

impl<T: Into<String>> From<Vec<T>> for ArgValue {
    fn from(values: Vec<T>) -> Self {
        ArgValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered argument map for one method call.
///
/// Insertion order is preserved; setting a name that already exists replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    entries: Vec<(String, ArgValue)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when any argument name ends in `_file`, which forces a
    /// multipart upload on the OAuth channel.
    pub fn has_file(&self) -> bool {
        self.entries.iter().any(|(k, _)| k.ends_with("_file"))
    }
}

impl<K, V> FromIterator<(K, V)> for Args
where
    K: Into<String>,
    V: Into<ArgValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Args::new();
        for (k, v) in iter {
            args.set(k, v);
        }
        args
    }
}

/// Response format requested from the service.
///
/// The tag is the URL path segment. `Json` is decoded as JSON on the OAuth
/// channel only; every other tag, known or not, is decoded as XML.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Rest,
    Json,
    Other(String),
}

impl ResponseFormat {
    pub fn path_segment(&self) -> &str {
        match self {
            ResponseFormat::Rest => "rest",
            ResponseFormat::Json => "json",
            ResponseFormat::Other(tag) => tag,
        }
    }
}

impl From<&str> for ResponseFormat {
    fn from(tag: &str) -> Self {
        match tag {
            "rest" => ResponseFormat::Rest,
            "json" => ResponseFormat::Json,
            other => ResponseFormat::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Xml(XmlElement),
    Json(serde_json::Value),
}

impl Document {
    pub fn as_xml(&self) -> Option<&XmlElement> {
        match self {
            Document::Xml(element) => Some(element),
            Document::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Document::Json(value) => Some(value),
            Document::Xml(_) => None,
        }
    }
}

/// Outcome of a call that reached the service and produced a parseable body.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Success(Document),
    /// The service reported an error; the message combines its status and
    /// description.
    Failure(String),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            CallResult::Success(doc) => Some(doc),
            CallResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            CallResult::Failure(message) => Some(message),
            CallResult::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Document, String> {
        match self {
            CallResult::Success(doc) => Ok(doc),
            CallResult::Failure(message) => Err(message),
        }
    }
}

/// What was sent and received during one call. For inspection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub request_url: String,
    pub response_body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub result: CallResult,
    pub diagnostics: Diagnostics,
}
