//! Outbound parameter sets and their two body encodings.
//!
//! # Design
//! `Params` is the flattened, ordered name/value list that actually goes on
//! the wire: the app key first, then each argument's effective value. Both
//! channels build it the same way and differ only in the app-key name and
//! the body encoding. File values are raw bytes and only fit a multipart
//! body; the urlencoded encoding sees text entries only.

use uuid::Uuid;

use crate::types::{ArgValue, Args, FileUpload};

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    File(FileUpload),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    /// App key under `key_name`, followed by every argument. List values
    /// contribute their last element; an argument that shares the app key's
    /// name overrides it in place.
    pub fn build(key_name: &str, app_key: &str, args: &Args) -> Self {
        let mut params = Params::default();
        params.set(key_name, app_key);
        for (name, value) in args.iter() {
            match value {
                ArgValue::Scalar(text) => params.set(name, text),
                ArgValue::List(items) => {
                    if let Some(last) = items.last() {
                        params.set(name, last);
                    }
                }
                ArgValue::File(upload) => params.insert(name, ParamValue::File(upload.clone())),
            }
        }
        params
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.insert(name, ParamValue::Text(value.to_string()));
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Text value of `name`; `None` for files and missing names.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// Text entries in order. These are what a signature can cover.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            ParamValue::Text(text) => Some((k.as_str(), text.as_str())),
            ParamValue::File(_) => None,
        })
    }

    /// Every entry in order, files included.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Name of the first file entry, if any.
    pub fn first_file(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| matches!(v, ParamValue::File(_)))
            .map(|(k, _)| k.as_str())
    }

    /// `k=v&k=v` over the text entries, both sides form-encoded with space
    /// as `+` and `*` escaped as `%2A`.
    pub fn to_urlencoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
            .replace('*', "%2A")
    }
}

/// A `multipart/form-data` body and the boundary that delimits it.
#[derive(Debug, Clone)]
pub struct Multipart {
    boundary: String,
    body: Vec<u8>,
}

impl Multipart {
    pub fn new<'a>(parts: impl IntoIterator<Item = (&'a str, &'a ParamValue)>) -> Self {
        Self::with_boundary(format!("eventful-{}", Uuid::new_v4().simple()), parts)
    }

    /// Text parts under a `*_file` name and file parts are sent as
    /// `application/octet-stream` uploads.
    pub fn with_boundary<'a>(
        boundary: String,
        parts: impl IntoIterator<Item = (&'a str, &'a ParamValue)>,
    ) -> Self {
        let mut body = Vec::new();
        for (name, value) in parts {
            let name = header_quote(name);
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let (filename, content) = match value {
                ParamValue::File(upload) => {
                    (Some(header_quote(&upload.filename)), upload.content.as_slice())
                }
                ParamValue::Text(text) if name.ends_with("_file") => (Some(name.clone()), text.as_bytes()),
                ParamValue::Text(text) => (None, text.as_bytes()),
            };
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        Self { boundary, body }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Quoted-string content for a part header. CR, LF and `"` would end the
/// value or the header line, so they are percent-encoded.
fn header_quote(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> ParamValue {
        ParamValue::Text(value.to_string())
    }

    #[test]
    fn app_key_comes_first_and_lists_keep_last() {
        let args = Args::new()
            .arg("keywords", "jazz blues")
            .arg("location", vec!["Boston", "San Diego"]);
        let params = Params::build("app_key", "k&y", &args);
        assert_eq!(
            params.to_urlencoded(),
            "app_key=k%26y&keywords=jazz+blues&location=San+Diego"
        );
    }

    #[test]
    fn asterisk_and_tilde_are_escaped() {
        let params = Params::build("app_key", "k", &Args::new().arg("q", "a*b~c"));
        assert_eq!(params.to_urlencoded(), "app_key=k&q=a%2Ab%7Ec");
    }

    #[test]
    fn empty_list_is_dropped() {
        let args = Args::new().arg("tags", Vec::<String>::new()).arg("id", "E0");
        let params = Params::build("app_key", "key", &args);
        assert_eq!(params.get("tags"), None);
        assert_eq!(params.to_urlencoded(), "app_key=key&id=E0");
    }

    #[test]
    fn explicit_app_key_argument_overrides_in_place() {
        let args = Args::new().arg("id", "E0").arg("app_key", "other");
        let params = Params::build("app_key", "key", &args);
        assert_eq!(params.to_urlencoded(), "app_key=other&id=E0");
    }

    #[test]
    fn files_stay_out_of_text_views() {
        let args = Args::new()
            .arg("caption", "Stage")
            .arg("image_file", ArgValue::file("stage.jpg", vec![0xFFu8, 0xD8]));
        let params = Params::build("oauth_app_key", "key", &args);
        assert_eq!(params.first_file(), Some("image_file"));
        assert_eq!(params.get("image_file"), None);
        assert_eq!(params.iter().count(), 2);
        assert_eq!(params.parts().count(), 3);
        assert!(Params::build("app_key", "key", &Args::new()).first_file().is_none());
    }

    #[test]
    fn multipart_layout() {
        let (caption, upload) = (text("Stage"), text("bytes"));
        let multipart = Multipart::with_boundary(
            "XYZ".to_string(),
            [("caption", &caption), ("image_file", &upload)],
        );
        assert_eq!(multipart.content_type(), "multipart/form-data; boundary=XYZ");
        let body = String::from_utf8(multipart.into_body()).unwrap();
        assert_eq!(
            body,
            "--XYZ\r\n\
             Content-Disposition: form-data; name=\"caption\"\r\n\r\n\
             Stage\r\n\
             --XYZ\r\n\
             Content-Disposition: form-data; name=\"image_file\"; filename=\"image_file\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             bytes\r\n\
             --XYZ--\r\n"
        );
    }

    #[test]
    fn multipart_file_part_keeps_raw_bytes() {
        let upload = ParamValue::File(FileUpload::new("stage.jpg", vec![0xFFu8, 0xD8, 0xFF, 0x00]));
        let body = Multipart::with_boundary("B".to_string(), [("image_file", &upload)]).into_body();

        let mut expected = b"--B\r\n\
            Content-Disposition: form-data; name=\"image_file\"; filename=\"stage.jpg\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n"
            .to_vec();
        expected.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0x00]);
        expected.extend_from_slice(b"\r\n--B--\r\n");
        assert_eq!(body, expected);
    }

    #[test]
    fn header_breaking_characters_are_encoded() {
        let value = text("x");
        let upload = ParamValue::File(FileUpload::new("a\"b\r\n.jpg", vec![1u8]));
        let body = Multipart::with_boundary(
            "B".to_string(),
            [("evil\r\nX-Injected: 1", &value), ("photo_file", &upload)],
        )
        .into_body();
        let body = String::from_utf8(body).unwrap();
        assert!(!body.contains("\r\nX-Injected"));
        assert!(body.contains("name=\"evil%0D%0AX-Injected: 1\""));
        assert!(body.contains("filename=\"a%22b%0D%0A.jpg\""));
    }

    #[test]
    fn random_boundaries_differ() {
        let value = text("1");
        let a = Multipart::new([("a", &value)]).content_type();
        let b = Multipart::new([("a", &value)]).content_type();
        assert_ne!(a, b);
    }
}
