//! Synchronous client for the Eventful event-discovery API.
//!
//! # Overview
//! `EventfulClient::call` invokes a named API method (`events/search`,
//! `events/get`, ...) and returns a `CallResult`: either the parsed response
//! document or the service's error message. Malformed responses and network
//! failures are `EventfulError`s instead.
//!
//! # Design
//! - Each call is split into `build_request` (pure) and `parse_response`
//!   (pure); `call` runs them around a `Transport`, `ureq` by default.
//! - Without OAuth the app key is posted as a urlencoded `app_key` field.
//!   With OAuth the request is HMAC-SHA1 signed and may become a multipart
//!   upload; see `client` for the rules.
//! - The client holds no per-call state. Diagnostics (request URL, raw
//!   body) are returned by `call_with_diagnostics`.
//!
//! ```no_run
//! use eventful_core::{Args, EventfulClient};
//!
//! let client = EventfulClient::new("my_app_key")?;
//! let result = client.call("events/search", &Args::new().arg("keywords", "jazz"), "rest")?;
//! match result.failure() {
//!     Some(message) => eprintln!("search failed: {message}"),
//!     None => println!("{:?}", result.document()),
//! }
//! # Ok::<(), eventful_core::EventfulError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod oauth;
pub mod types;
pub mod xml;

pub use client::EventfulClient;
pub use config::{ClientConfig, OAuthCredentials, DEFAULT_API_ROOT};
pub use error::EventfulError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{
    ArgValue, Args, CallOutcome, CallResult, Diagnostics, Document, FileUpload, ResponseFormat,
};
pub use xml::XmlElement;
