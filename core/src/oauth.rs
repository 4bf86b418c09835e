//! OAuth 1.0a request signing (HMAC-SHA1, `Authorization` header).
//!
//! # Design
//! The signer only produces the header value; the body is encoded by the
//! client. Which request parameters are signed depends on the body type:
//! a urlencoded body is fully signed, a multipart body is not signed at all,
//! and in that case any `oauth_`-prefixed request parameter is lifted into
//! the header so it is still covered by the signature.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

use crate::config::OAuthCredentials;
use crate::form::Params;
use crate::http::HttpMethod;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: OAuthCredentials,
}

impl OAuthSigner {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self { credentials }
    }

    /// Sign with a fresh nonce and the current time.
    pub fn authorize(&self, method: HttpMethod, url: &str, params: &Params, multipart: bool) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorize_with(method, url, params, multipart, &nonce, timestamp)
    }

    pub fn authorize_with(
        &self,
        method: HttpMethod,
        url: &str,
        params: &Params,
        multipart: bool,
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut header_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".to_string(), self.credentials.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.credentials.access_token.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if multipart {
            header_params.extend(
                params
                    .iter()
                    .filter(|(k, _)| k.starts_with("oauth_"))
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
        }

        let mut signing_params = header_params.clone();
        if !multipart {
            signing_params.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }

        let base = signature_base_string(method, url, &signing_params);
        let signature = sign(
            &base,
            &self.credentials.consumer_secret,
            &self.credentials.access_token_secret,
        );
        header_params.push(("oauth_signature".to_string(), signature));
        header_params.sort();

        let fields: Vec<String> = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }
}

/// RFC 3986 percent-encoding: only `A-Z a-z 0-9 - . _ ~` pass through.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `METHOD&enc(url)&enc(k=v&k=v...)` with pairs sorted after encoding.
pub fn signature_base_string(method: HttpMethod, url: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    pairs.sort();
    let normalized: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!(
        "{}&{}&{}",
        method.as_str(),
        encode(url),
        encode(&normalized.join("&"))
    )
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base_string.as_bytes());
    B64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from the published OAuth 1.0a HMAC-SHA1 walkthrough.
    const URL: &str = "https://api.twitter.com/1/statuses/update.json";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: i64 = 1318622958;

    fn reference_credentials() -> OAuthCredentials {
        OAuthCredentials::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
    }

    fn reference_params() -> Params {
        let mut params = Params::default();
        params.set("status", "Hello Ladies + Gentlemen, a signed OAuth request!");
        params.set("include_entities", "true");
        params
    }

    #[test]
    fn encode_keeps_only_unreserved() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("!*'()"), "%21%2A%27%28%29");
    }

    #[test]
    fn reference_signature() {
        let signer = OAuthSigner::new(reference_credentials());
        let header = signer.authorize_with(HttpMethod::Post, URL, &reference_params(), false, NONCE, TIMESTAMP);
        assert!(header.starts_with("OAuth "));
        assert!(
            header.contains(r#"oauth_signature="tnnArxj06cWHq44gCs1OSKk%2FjLY%3D""#),
            "unexpected header: {header}"
        );
        assert!(header.contains(r#"oauth_signature_method="HMAC-SHA1""#));
        // Body parameters are signed but not repeated in the header.
        assert!(!header.contains("status="));
    }

    #[test]
    fn base_string_sorts_encoded_pairs() {
        let params = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "x y".to_string()),
        ];
        assert_eq!(
            signature_base_string(HttpMethod::Post, "http://api.eventful.com/rest/events/get", &params),
            "POST&http%3A%2F%2Fapi.eventful.com%2Frest%2Fevents%2Fget&a%3Dx%2520y%26b%3D2"
        );
    }

    #[test]
    fn multipart_lifts_oauth_params_into_header() {
        let mut params = Params::default();
        params.set("oauth_app_key", "app123");
        params.set("image_file", "bytes");
        let signer = OAuthSigner::new(reference_credentials());
        let header = signer.authorize_with(HttpMethod::Post, URL, &params, true, NONCE, TIMESTAMP);
        assert!(header.contains(r#"oauth_app_key="app123""#));
        assert!(!header.contains("image_file"));
    }

    #[test]
    fn multipart_signature_ignores_body_params() {
        let signer = OAuthSigner::new(reference_credentials());
        let mut with_body = Params::default();
        with_body.set("oauth_app_key", "app123");
        with_body.set("image_file", "one");
        let mut other_body = Params::default();
        other_body.set("oauth_app_key", "app123");
        other_body.set("image_file", "two");

        let a = signer.authorize_with(HttpMethod::Post, URL, &with_body, true, NONCE, TIMESTAMP);
        let b = signer.authorize_with(HttpMethod::Post, URL, &other_body, true, NONCE, TIMESTAMP);
        assert_eq!(a, b);

        let c = signer.authorize_with(HttpMethod::Post, URL, &with_body, false, NONCE, TIMESTAMP);
        let d = signer.authorize_with(HttpMethod::Post, URL, &other_body, false, NONCE, TIMESTAMP);
        assert_ne!(c, d);
    }

    #[test]
    fn fresh_nonce_per_request() {
        let signer = OAuthSigner::new(reference_credentials());
        let a = signer.authorize(HttpMethod::Post, URL, &reference_params(), false);
        let b = signer.authorize(HttpMethod::Post, URL, &reference_params(), false);
        assert_ne!(a, b);
    }
}
