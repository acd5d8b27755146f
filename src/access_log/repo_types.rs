use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::dto::AuthAction;

const UNKNOWN: &str = "unknown";

/// One successful signup or login, as stored in a log feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub email: String,
    pub action: AuthAction,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "ip")]
    pub source_address: String,
    #[serde(rename = "country")]
    pub source_country: String,
    pub user_agent: String,
}

/// Caller details captured when the request arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub source_address: String,
    pub source_country: String,
    pub user_agent: String,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            source_address: UNKNOWN.into(),
            source_country: UNKNOWN.into(),
            user_agent: UNKNOWN.into(),
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let source_address = header(headers, "cf-connecting-ip").or_else(|| {
            header(headers, "x-forwarded-for")
                .and_then(|v| v.split(',').next().map(|hop| hop.trim().to_string()))
                .filter(|hop| !hop.is_empty())
        });
        Self {
            source_address: source_address.unwrap_or_else(|| UNKNOWN.into()),
            source_country: header(headers, "cf-ipcountry").unwrap_or_else(|| UNKNOWN.into()),
            user_agent: header(headers, "user-agent").unwrap_or_else(|| UNKNOWN.into()),
        }
    }
}

impl AccessLogEntry {
    pub fn new(email: &str, action: AuthAction, at: OffsetDateTime, meta: RequestMeta) -> Self {
        Self {
            email: email.to_string(),
            action,
            timestamp: at,
            source_address: meta.source_address,
            source_country: meta.source_country,
            user_agent: meta.user_agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use time::macros::datetime;

    #[test]
    fn meta_prefers_cloudflare_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        headers.insert("cf-ipcountry", HeaderValue::from_static("IT"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.0"));

        let meta = RequestMeta::from_headers(&headers);
        assert_eq!(meta.source_address, "203.0.113.7");
        assert_eq!(meta.source_country, "IT");
        assert_eq!(meta.user_agent, "curl/8.0");
    }

    #[test]
    fn meta_falls_back_to_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1, 10.0.0.1"),
        );
        let meta = RequestMeta::from_headers(&headers);
        assert_eq!(meta.source_address, "198.51.100.1");
        assert_eq!(meta.source_country, "unknown");
        assert_eq!(meta.user_agent, "unknown");
    }

    #[test]
    fn entry_uses_persisted_field_names() {
        let entry = AccessLogEntry::new(
            "a@b.com",
            AuthAction::Login,
            datetime!(2024-05-01 10:00:00 UTC),
            RequestMeta::default(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "login");
        assert_eq!(json["ip"], "unknown");
        assert_eq!(json["country"], "unknown");
        assert_eq!(json["userAgent"], "unknown");
        assert_eq!(json["timestamp"], "2024-05-01T10:00:00Z");
    }
}
