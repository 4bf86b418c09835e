use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::RwLock};

/// The only app key the mock accepts.
pub const VALID_APP_KEY: &str = "test_app_key";

/// Method that answers with a truncated XML document.
pub const MALFORMED_METHOD: &str = "test/malformed";

#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub id: &'static str,
    pub title: &'static str,
    pub venue_name: &'static str,
    pub city_name: &'static str,
}

pub const EVENTS: &[Event] = &[
    Event {
        id: "E0-001-000000001-1",
        title: "Jazz Night at the Lighthouse",
        venue_name: "The Lighthouse Cafe",
        city_name: "Hermosa Beach",
    },
    Event {
        id: "E0-001-000000002-4",
        title: "Sunday Blues Brunch",
        venue_name: "House of Blues",
        city_name: "San Diego",
    },
    Event {
        id: "E0-001-000000003-2",
        title: "Indie Rock Showcase",
        venue_name: "The Casbah",
        city_name: "San Diego",
    },
];

#[derive(Clone, Debug, Serialize)]
pub struct Image {
    pub id: String,
    pub caption: String,
    pub size: usize,
}

pub type Images = Arc<RwLock<Vec<Image>>>;

pub fn app() -> Router {
    let images: Images = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/{format}/{*method}", post(dispatch))
        .with_state(images)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Parameters of one incoming call, wherever they travelled.
#[derive(Debug, Default)]
struct Incoming {
    body: Vec<(String, String)>,
    oauth: Option<Vec<(String, String)>>,
    /// Raw multipart part contents, byte for byte.
    uploads: Vec<(String, Vec<u8>)>,
}

impl Incoming {
    fn param(&self, name: &str) -> Option<&str> {
        lookup(&self.body, name)
    }

    fn app_key(&self) -> Option<&str> {
        self.param("app_key")
            .or_else(|| self.oauth.as_deref().and_then(|o| lookup(o, "oauth_app_key")))
    }
}

enum Reply {
    Error {
        string: &'static str,
        description: String,
    },
    Search {
        keywords: Option<String>,
        location: Option<String>,
        events: Vec<&'static Event>,
    },
    Event(&'static Event),
    Image(Image),
}

async fn dispatch(
    State(images): State<Images>,
    Path((format, method)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    tracing::info!(%format, %method, "incoming call");
    if method == MALFORMED_METHOD {
        return (StatusCode::INTERNAL_SERVER_ERROR, "<search><events>").into_response();
    }

    let reply = match parse_incoming(&headers, &body) {
        Ok(incoming) => handle(&images, &method, &incoming).await,
        Err(description) => Reply::Error {
            string: "Invalid signature",
            description,
        },
    };

    if format == "json" {
        ([(header::CONTENT_TYPE, "application/json")], render_json(&reply)).into_response()
    } else {
        ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], render_xml(&reply)).into_response()
    }
}

async fn handle(images: &Images, method: &str, incoming: &Incoming) -> Reply {
    if incoming.app_key() != Some(VALID_APP_KEY) {
        return Reply::Error {
            string: "Authentication Error",
            description: "A valid application key is required.".to_string(),
        };
    }

    match method {
        "events/search" => {
            let keywords = incoming.param("keywords").map(str::to_string);
            let location = incoming.param("location").map(str::to_string);
            let events = EVENTS
                .iter()
                .filter(|e| matches_keywords(e, keywords.as_deref()))
                .filter(|e| location.as_deref().map_or(true, |l| e.city_name.eq_ignore_ascii_case(l)))
                .collect();
            Reply::Search {
                keywords,
                location,
                events,
            }
        }
        "events/get" => {
            let id = incoming.param("id").unwrap_or_default();
            match EVENTS.iter().find(|e| e.id == id) {
                Some(event) => Reply::Event(event),
                None => Reply::Error {
                    string: "Not found",
                    description: format!("There is no event with the identifier '{id}'."),
                },
            }
        }
        "images/new" => {
            if incoming.oauth.is_none() {
                return Reply::Error {
                    string: "Authentication Error",
                    description: "Uploading images requires OAuth.".to_string(),
                };
            }
            let upload = incoming.uploads.iter().find(|(k, _)| k == "image_file");
            let Some((_, content)) = upload else {
                return Reply::Error {
                    string: "Missing parameter",
                    description: "image_file must be sent as a multipart upload.".to_string(),
                };
            };
            let mut images = images.write().await;
            let image = Image {
                id: format!("I0-001-{:09}-1", images.len() + 1),
                caption: incoming.param("caption").unwrap_or_default().to_string(),
                size: content.len(),
            };
            images.push(image.clone());
            Reply::Image(image)
        }
        other => Reply::Error {
            string: "Unsupported method",
            description: format!("The method '{other}' is not supported."),
        },
    }
}

fn matches_keywords(event: &Event, keywords: Option<&str>) -> bool {
    let Some(keywords) = keywords else {
        return true;
    };
    let title = event.title.to_lowercase();
    keywords
        .split_whitespace()
        .any(|word| title.contains(&word.to_lowercase()))
}

fn parse_incoming(headers: &HeaderMap, body: &[u8]) -> Result<Incoming, String> {
    let mut incoming = Incoming::default();

    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        let auth = auth.to_str().map_err(|_| "Authorization header is not ASCII".to_string())?;
        incoming.oauth = Some(parse_oauth_header(auth)?);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if let Some(boundary) = content_type
        .strip_prefix("multipart/form-data")
        .and_then(|rest| rest.split("boundary=").nth(1))
    {
        incoming.uploads = parse_multipart(body, boundary.trim_matches('"'));
        incoming.body = incoming
            .uploads
            .iter()
            .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect();
    } else {
        incoming.body = form_urlencoded::parse(body).into_owned().collect();
    }
    Ok(incoming)
}

/// Structural check only: the mock has no way to recompute the signature.
fn parse_oauth_header(value: &str) -> Result<Vec<(String, String)>, String> {
    let fields = value
        .strip_prefix("OAuth ")
        .ok_or_else(|| "Authorization header is not an OAuth header.".to_string())?;

    let mut params = Vec::new();
    for field in fields.split(',') {
        let (key, quoted) = field
            .trim()
            .split_once('=')
            .ok_or_else(|| format!("Malformed OAuth field '{field}'."))?;
        let raw = quoted.trim_matches('"');
        let decoded = urlencoding::decode(raw).map_err(|e| e.to_string())?;
        params.push((key.to_string(), decoded.into_owned()));
    }

    for required in ["oauth_consumer_key", "oauth_token", "oauth_nonce", "oauth_timestamp", "oauth_signature"] {
        if lookup(&params, required).is_none() {
            return Err(format!("Missing OAuth parameter '{required}'."));
        }
    }
    if lookup(&params, "oauth_signature_method") != Some("HMAC-SHA1") {
        return Err("Only HMAC-SHA1 signatures are supported.".to_string());
    }
    Ok(params)
}

fn parse_multipart(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
    let delimiter = format!("--{boundary}");
    split_bytes(body, delimiter.as_bytes())
        .into_iter()
        .filter_map(|part| {
            let split = find_bytes(part, b"\r\n\r\n")?;
            let head = String::from_utf8_lossy(&part[..split]);
            let name = head.split("name=\"").nth(1)?.split('"').next()?;
            let value = &part[split + 4..];
            let value = value.strip_suffix(b"\r\n").unwrap_or(value);
            Some((name.to_string(), value.to_vec()))
        })
        .collect()
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split_bytes<'a>(mut haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::new();
    while let Some(at) = find_bytes(haystack, needle) {
        pieces.push(&haystack[..at]);
        haystack = &haystack[at + needle.len()..];
    }
    pieces.push(haystack);
    pieces
}

fn lookup<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

fn render_xml(reply: &Reply) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    match reply {
        Reply::Error {
            string,
            description,
        } => {
            out.push_str(&format!(
                "<error string=\"{}\"><description>{}</description></error>",
                escape(string),
                escape(description)
            ));
        }
        Reply::Search {
            keywords,
            location,
            events,
        } => {
            out.push_str("<search>");
            out.push_str(&format!("<total_items>{}</total_items>", events.len()));
            if let Some(keywords) = keywords {
                out.push_str(&format!("<keywords>{}</keywords>", escape(keywords)));
            }
            if let Some(location) = location {
                out.push_str(&format!("<location>{}</location>", escape(location)));
            }
            out.push_str("<events>");
            for event in events {
                out.push_str(&event_xml(event));
            }
            out.push_str("</events></search>");
        }
        Reply::Event(event) => out.push_str(&event_xml(event)),
        Reply::Image(image) => {
            out.push_str(&format!(
                "<image id=\"{}\"><caption>{}</caption><size>{}</size></image>",
                escape(&image.id),
                escape(&image.caption),
                image.size
            ));
        }
    }
    out
}

fn event_xml(event: &Event) -> String {
    format!(
        "<event id=\"{}\"><title>{}</title><venue_name>{}</venue_name><city_name>{}</city_name></event>",
        escape(event.id),
        escape(event.title),
        escape(event.venue_name),
        escape(event.city_name)
    )
}

fn render_json(reply: &Reply) -> String {
    let value = match reply {
        Reply::Error {
            string,
            description,
        } => serde_json::json!({
            "error": "1",
            "status": string,
            "description": description,
        }),
        Reply::Search {
            keywords,
            location,
            events,
        } => serde_json::json!({
            "total_items": events.len().to_string(),
            "keywords": keywords,
            "location": location,
            "events": { "event": events },
        }),
        Reply::Event(event) => serde_json::json!(event),
        Reply::Image(image) => serde_json::json!(image),
    };
    value.to_string()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
