//! Request builder and response parser for the Eventful API.
//!
//! # Design
//! Every call is split into `build_request`, which produces an `HttpRequest`
//! without touching the network, and `parse_response`, which turns the raw
//! body into a `CallResult`. `call` runs the two around the client's
//! `Transport`. The client keeps no per-call state; the URL and raw body of
//! a call come back in `Diagnostics`.
//!
//! Two channels exist. Without OAuth the app key travels as `app_key` in a
//! urlencoded body and the response is always read as XML. With OAuth the
//! request is HMAC-SHA1 signed, switches to multipart when any argument is a
//! `*_file` upload (moving the key to `oauth_app_key`), and `json` responses
//! are decoded as JSON.

use serde_json::Value;

use crate::config::{ClientConfig, OAuthCredentials};
use crate::error::EventfulError;
use crate::form::{Multipart, Params, FORM_URLENCODED};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::oauth::OAuthSigner;
use crate::types::{Args, CallOutcome, CallResult, Diagnostics, Document, ResponseFormat};
use crate::xml::XmlElement;

pub struct EventfulClient<T = UreqTransport> {
    config: ClientConfig,
    signer: Option<OAuthSigner>,
    transport: T,
}

impl EventfulClient<UreqTransport> {
    /// Client for the public API root, without OAuth.
    pub fn new(app_key: impl Into<String>) -> Result<Self, EventfulError> {
        Self::from_config(ClientConfig::new(app_key))
    }

    pub fn with_api_root(
        app_key: impl Into<String>,
        api_root: impl Into<String>,
    ) -> Result<Self, EventfulError> {
        Self::from_config(ClientConfig::new(app_key).with_api_root(api_root))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, EventfulError> {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> EventfulClient<T> {
    pub fn with_transport(mut config: ClientConfig, transport: T) -> Result<Self, EventfulError> {
        config.validate()?;
        config.api_root = config.api_root.trim_end_matches('/').to_string();
        let signer = config.oauth.clone().map(OAuthSigner::new);
        Ok(Self {
            config,
            signer,
            transport,
        })
    }

    /// Switch every following call to the OAuth channel.
    ///
    /// All four values are required; an empty one is rejected and leaves the
    /// client unchanged.
    pub fn attach_oauth(
        &mut self,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Result<(), EventfulError> {
        let credentials = OAuthCredentials::new(
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        );
        credentials.validate()?;
        self.signer = Some(OAuthSigner::new(credentials.clone()));
        self.config.oauth = Some(credentials);
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn uses_oauth(&self) -> bool {
        self.signer.is_some()
    }

    /// `{api_root}/{format}/{method}`, with `/` and whitespace trimmed from
    /// both ends of the method name.
    pub fn request_url(&self, method: &str, format: &ResponseFormat) -> String {
        let method = method.trim_matches(|c: char| c == '/' || c.is_whitespace());
        format!("{}/{}/{}", self.config.api_root, format.path_segment(), method)
    }

    /// File arguments need the multipart body of the OAuth channel; anywhere
    /// else they are rejected with `InvalidArgument`.
    pub fn build_request(
        &self,
        method: &str,
        args: &Args,
        format: &ResponseFormat,
    ) -> Result<HttpRequest, EventfulError> {
        let url = self.request_url(method, format);
        match &self.signer {
            None => {
                let params = Params::build("app_key", &self.config.app_key, args);
                reject_files(&params)?;
                Ok(HttpRequest {
                    method: HttpMethod::Post,
                    url,
                    headers: vec![("Content-Type".to_string(), FORM_URLENCODED.to_string())],
                    body: params.to_urlencoded().into_bytes(),
                })
            }
            Some(signer) => {
                let multipart = args.has_file();
                let key_name = if multipart { "oauth_app_key" } else { "app_key" };
                let params = Params::build(key_name, &self.config.app_key, args);
                if !multipart {
                    reject_files(&params)?;
                }
                let authorization = signer.authorize(HttpMethod::Post, &url, &params, multipart);

                let (content_type, body) = if multipart {
                    // oauth_* parameters already travel in the signed header.
                    let multipart =
                        Multipart::new(params.parts().filter(|(k, _)| !k.starts_with("oauth_")));
                    (multipart.content_type(), multipart.into_body())
                } else {
                    (FORM_URLENCODED.to_string(), params.to_urlencoded().into_bytes())
                };

                Ok(HttpRequest {
                    method: HttpMethod::Post,
                    url,
                    headers: vec![
                        ("Authorization".to_string(), authorization),
                        ("Content-Type".to_string(), content_type),
                        ("User-Agent".to_string(), self.config.user_agent.clone()),
                    ],
                    body,
                })
            }
        }
    }

    /// Turn a raw response body into a `CallResult`.
    ///
    /// The status code is ignored. Only the OAuth channel decodes `json`;
    /// without OAuth every body is read as XML, including `json` requests.
    pub fn parse_response(
        &self,
        format: &ResponseFormat,
        response: &HttpResponse,
    ) -> Result<CallResult, EventfulError> {
        let result = match (format, self.uses_oauth()) {
            (ResponseFormat::Json, true) => parse_json(&response.body)?,
            (ResponseFormat::Json, false) => {
                tracing::warn!("json format requested without OAuth, reading the response as XML");
                parse_xml(&response.body)?
            }
            _ => parse_xml(&response.body)?,
        };
        if let CallResult::Failure(message) = &result {
            tracing::debug!(status = response.status, %message, "service reported an error");
        }
        Ok(result)
    }

    pub fn call(
        &self,
        method: &str,
        args: &Args,
        format: impl Into<ResponseFormat>,
    ) -> Result<CallResult, EventfulError> {
        self.call_with_diagnostics(method, args, format)
            .map(|outcome| outcome.result)
    }

    /// Like `call`, also returning the request URL and raw response body.
    pub fn call_with_diagnostics(
        &self,
        method: &str,
        args: &Args,
        format: impl Into<ResponseFormat>,
    ) -> Result<CallOutcome, EventfulError> {
        let format = format.into();
        let request = self.build_request(method, args, &format)?;
        tracing::debug!(
            url = %request.url,
            oauth = self.uses_oauth(),
            multipart = self.uses_oauth() && args.has_file(),
            %format,
            "calling eventful method"
        );

        let response = self.transport.execute(&request)?;
        let result = self.parse_response(&format, &response)?;
        Ok(CallOutcome {
            result,
            diagnostics: Diagnostics {
                request_url: request.url,
                response_body: response.body,
            },
        })
    }
}

fn reject_files(params: &Params) -> Result<(), EventfulError> {
    match params.first_file() {
        Some(name) => Err(EventfulError::InvalidArgument(format!(
            "file argument `{name}` can only be sent as a multipart upload \
             (OAuth channel, name ending in `_file`)"
        ))),
        None => Ok(()),
    }
}

fn parse_xml(body: &str) -> Result<CallResult, EventfulError> {
    let root = XmlElement::parse(body)?;
    if root.name() == "error" {
        let message = format!(
            "{}: {}",
            root.attr("string").unwrap_or_default(),
            root.child_text("description").unwrap_or_default()
        );
        return Ok(CallResult::Failure(message));
    }
    Ok(CallResult::Success(Document::Xml(root)))
}

fn parse_json(body: &str) -> Result<CallResult, EventfulError> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("error").is_some_and(is_positive) {
        let message = format!(
            "Invalid status : {} ({})",
            field_text(&value, "status"),
            field_text(&value, "description")
        );
        return Ok(CallResult::Failure(message));
    }
    Ok(CallResult::Success(Document::Json(value)))
}

/// Numbers above zero, `true`, and numeric strings above zero.
fn is_positive(flag: &Value) -> bool {
    match flag {
        Value::Number(n) => n.as_f64().is_some_and(|n| n > 0.0),
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(|n| n > 0.0),
        _ => false,
    }
}

/// Scalars render the way the service's string concatenation does:
/// `true` as `1`, `false` and `null` as nothing.
fn field_text(value: &Value, field: &str) -> String {
    match value.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::Bool(true)) => "1".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
