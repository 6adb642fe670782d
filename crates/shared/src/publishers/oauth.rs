//! OAuth 1.0a HMAC-SHA1 request signing.
//!
//! Signing adds an `Authorization` header and sets `Content-Length` to the
//! length of the body already on the request. The body itself is never read
//! into the signature (JSON bodies are not form parameters) and never replaced.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH};
use reqwest::Request;
use sha1::Sha1;
use url::Url;
use uuid::Uuid;

use crate::error::PublishError;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

impl OAuth1Signer {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }

    /// Sign with a fresh nonce and the current time.
    pub fn sign(&self, request: &mut Request) -> Result<(), PublishError> {
        let nonce = Uuid::new_v4().simple().to_string();
        self.sign_with(request, &nonce, Utc::now().timestamp())
    }

    pub fn sign_with(
        &self,
        request: &mut Request,
        nonce: &str,
        timestamp: i64,
    ) -> Result<(), PublishError> {
        let body_len = request
            .body()
            .and_then(|b| b.as_bytes())
            .map_or(0, <[u8]>::len);

        let header = self.authorization_header(
            request.method().as_str(),
            request.url(),
            &[],
            nonce,
            timestamp,
        )?;
        let header = HeaderValue::from_str(&header)
            .map_err(|e| PublishError::failed(format!("invalid OAuth header: {}", e), None))?;

        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, header);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body_len));
        Ok(())
    }

    fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(&'static str, String)> {
        vec![
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.token.clone()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ]
    }

    fn authorization_header(
        &self,
        method: &str,
        url: &Url,
        extra_params: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, PublishError> {
        let signature = self.signature(method, url, extra_params, nonce, timestamp)?;

        let mut params = self.oauth_params(nonce, timestamp);
        params.push(("oauth_signature", signature));
        params.sort();

        let fields: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// Base64 HMAC-SHA1 over the signature base string.
    ///
    /// `extra_params` are form parameters that take part in the signature
    /// beside the URL query.
    fn signature(
        &self,
        method: &str,
        url: &Url,
        extra_params: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, PublishError> {
        let mut pairs: Vec<(String, String)> = self
            .oauth_params(nonce, timestamp)
            .into_iter()
            .map(|(k, v)| (encode(k), encode(&v)))
            .collect();
        pairs.extend(url.query_pairs().map(|(k, v)| (encode(&k), encode(&v))));
        pairs.extend(extra_params.iter().map(|(k, v)| (encode(k), encode(v))));
        pairs.sort();

        let param_string = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(base_url.as_str()),
            encode(&param_string)
        );
        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| PublishError::failed(format!("invalid signing key: {}", e), None))?;
        mac.update(base_string.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}
