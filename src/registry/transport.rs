/*!
transport.rs - seam between catalog resources and the network.

A catalog method call turns into an `ApiRequest` (verb + path + query + body)
that a `Transport` sends. The only transport shipped here is
`DryRunTransport`: it resolves the absolute URL against the configured base
URL and hands the planned request back as JSON instead of performing it.
*/

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};
use url::Url;

/// A fully bound request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub verb: String,
    pub path: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub query: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Map<String, Value>>,
}

impl ApiRequest {
    pub fn new(verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            path: path.into(),
            query: Map::new(),
            body: None,
        }
    }

    /// GET / DELETE carry their parameters in the query string.
    pub fn uses_query(&self) -> bool {
        matches!(self.verb.as_str(), "GET" | "DELETE" | "HEAD")
    }

    /// Put a parameter where this verb carries parameters.
    pub fn insert_param(&mut self, key: String, value: Value) {
        if self.uses_query() {
            self.query.insert(key, value);
        } else {
            self.body.get_or_insert_with(Map::new).insert(key, value);
        }
    }
}

/// Performs a request and yields the decoded response.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<Value>;
}

/// Transport that reports what it would send.
#[derive(Debug, Clone)]
pub struct DryRunTransport {
    base_url: Url,
    api_key: Option<String>,
}

impl DryRunTransport {
    pub fn new(base_url: Url, api_key: Option<String>) -> Self {
        Self { base_url, api_key }
    }

    /// Absolute URL for a request, query parameters appended in key order.
    pub fn resolve_url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&request.path)
            .with_context(|| format!("invalid request path: {}", request.path))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, &query_value(v));
            }
        }
        Ok(url)
    }
}

impl Transport for DryRunTransport {
    fn send(&self, request: &ApiRequest) -> Result<Value> {
        let url = self.resolve_url(request)?;
        tracing::debug!(verb = %request.verb, url = %url, "dry-run request");

        let mut headers = Map::new();
        headers.insert("Accept".into(), json!("application/json"));
        if let Some(key) = &self.api_key {
            headers.insert(
                "Authorization".into(),
                json!(format!("Bearer {}", mask_secret(key))),
            );
        }

        Ok(json!({
            "dry_run": true,
            "method": request.verb,
            "url": url.as_str(),
            "headers": headers,
            "body": request.body,
        }))
    }
}

fn query_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Keep the last four characters of a secret visible.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> DryRunTransport {
        DryRunTransport::new(
            Url::parse("https://api.example.test").unwrap(),
            Some("sk_live_abcdef1234".into()),
        )
    }

    #[test]
    fn get_parameters_become_query() {
        let mut req = ApiRequest::new("GET", "/api/v1/leads");
        req.insert_param("search".into(), json!("Tha Juan"));
        req.insert_param("active".into(), json!(true));
        let url = transport().resolve_url(&req).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/api/v1/leads?active=1&search=Tha+Juan"
        );
    }

    #[test]
    fn post_parameters_become_body() {
        let mut req = ApiRequest::new("POST", "/api/v1/leads/412/notes");
        req.insert_param("content".into(), json!("called back"));
        let out = transport().send(&req).unwrap();
        assert_eq!(out["method"], json!("POST"));
        assert_eq!(out["body"]["content"], json!("called back"));
        assert_eq!(out["headers"]["Authorization"], json!("Bearer ****1234"));
    }

    #[test]
    fn short_secret_fully_masked() {
        assert_eq!(mask_secret("abc"), "****");
    }
}
