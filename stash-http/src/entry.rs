use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Response, StatusCode};
use http_body::Body as HttpBody;
use serde::{Deserialize, Serialize};

use crate::body::CaptureBody;
use crate::capture::CapturedResponse;

/// Stored snapshot of a captured response.
///
/// Headers are kept in the order `HeaderMap` yields them, with all values of
/// a name adjacent. Values of one name keep their relative order, but the
/// interleaving of different names is not preserved. Entries are never
/// modified after creation; a stale entry is removed and replaced by a fresh
/// capture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    status: u16,
    headers: Vec<(String, Bytes)>,
    body: Bytes,
    content_type: Option<String>,
    content_length: u64,
    expires_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Snapshot of `captured`, fresh for `max_age` seconds from now.
    pub fn new(captured: &CapturedResponse, max_age: u32) -> Self {
        Self::new_at(captured, max_age, Utc::now())
    }

    /// Snapshot of `captured`, fresh for `max_age` seconds from `now`.
    pub fn new_at(captured: &CapturedResponse, max_age: u32, now: DateTime<Utc>) -> Self {
        let headers = captured
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    Bytes::copy_from_slice(value.as_bytes()),
                )
            })
            .collect();
        let content_type = captured
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Self {
            status: captured.status().as_u16(),
            headers,
            body: captured.body().clone(),
            content_type,
            content_length: captured.body().len() as u64,
            expires_at: now + TimeDelta::milliseconds(i64::from(max_age) * 1000),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Captured headers, values of the same name adjacent.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether the entry is still fresh at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Builds the response to send instead of calling the handler.
    ///
    /// Fails only if the stored status or headers are not valid HTTP, which
    /// can happen when the store hands back data it did not get from us.
    pub fn replay<B>(&self) -> Result<Response<CaptureBody<B>>, http::Error>
    where
        B: HttpBody,
    {
        let mut response = Response::new(CaptureBody::complete(self.body.clone()));
        *response.status_mut() = StatusCode::from_u16(self.status)?;
        let headers = response.headers_mut();
        headers.reserve(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            let value = HeaderValue::from_maybe_shared(value.clone())?;
            headers.append(name, value);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Capture, ResponseCapture};
    use chrono::TimeZone;
    use http_body_util::{BodyExt, Full};
    use pretty_assertions::assert_eq;

    async fn capture(response: Response<Full<Bytes>>) -> CapturedResponse {
        match ResponseCapture::default().capture(response).await {
            Capture::Complete(captured) => captured,
            Capture::Incomplete(_) => panic!("expected complete capture"),
        }
    }

    fn sample() -> Response<Full<Bytes>> {
        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .header("last-modified", "Sun, 06 Nov 1994 08:49:37 GMT")
            .header("x-trace", "abc")
            .body(Full::new(Bytes::from_static(br#"{"ok":true}"#)))
            .unwrap()
    }

    #[tokio::test]
    async fn replay_reproduces_the_captured_response() {
        let captured = capture(sample()).await;
        let entry = CachedResponse::new(&captured, 60);

        let replayed = entry.replay::<Full<Bytes>>().unwrap();
        assert_eq!(replayed.status(), StatusCode::OK);
        assert_eq!(replayed.headers(), captured.headers());
        let cookies: Vec<_> = replayed.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        let body = replayed.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, captured.body().clone());
    }

    #[tokio::test]
    async fn interleaved_headers_are_grouped_by_name() {
        let response = Response::builder()
            .header("link", "</a.css>")
            .header("vary", "accept")
            .header("link", "</b.js>")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let entry = CachedResponse::new(&capture(response).await, 60);

        let names: Vec<_> = entry.headers().map(|(name, _)| name).collect();
        let mut grouped = names.clone();
        grouped.dedup();
        assert_eq!(grouped.len(), 2, "{names:?}");
        assert_eq!(names.len(), 3);

        let replayed = entry.replay::<Full<Bytes>>().unwrap();
        let links: Vec<_> = replayed.headers().get_all("link").iter().collect();
        assert_eq!(links, vec!["</a.css>", "</b.js>"]);
        assert_eq!(replayed.headers()["vary"], "accept");
    }

    #[tokio::test]
    async fn records_content_type_and_length() {
        let entry = CachedResponse::new(&capture(sample()).await, 60);
        assert_eq!(entry.content_type(), Some("application/json"));
        assert_eq!(entry.content_length(), 11);
        assert_eq!(entry.status(), 200);
        assert_eq!(
            entry.headers().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["content-type", "set-cookie", "set-cookie", "last-modified", "x-trace"]
        );
    }

    #[tokio::test]
    async fn freshness_follows_max_age() {
        let captured = capture(sample()).await;
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = CachedResponse::new_at(&captured, 10, created);

        assert_eq!(entry.expires_at(), created + TimeDelta::seconds(10));
        assert!(entry.is_valid_at(created));
        assert!(entry.is_valid_at(created + TimeDelta::milliseconds(9_999)));
        assert!(!entry.is_valid_at(created + TimeDelta::seconds(10)));
        assert!(!entry.is_valid_at(created + TimeDelta::seconds(11)));
    }

    #[tokio::test]
    async fn zero_max_age_is_never_valid() {
        let entry = CachedResponse::new(&capture(sample()).await, 0);
        assert!(!entry.is_valid());
    }

    #[tokio::test]
    async fn survives_serialization() {
        let entry = CachedResponse::new(&capture(sample()).await, 60);
        let json = serde_json::to_vec(&entry).unwrap();
        let restored: CachedResponse = serde_json::from_slice(&json).unwrap();
        assert_eq!(restored, entry);
        assert!(restored.is_valid());
    }

    #[test]
    fn corrupt_entry_fails_to_replay() {
        let json = r#"{
            "status": 200,
            "headers": [["bad header", [120]]],
            "body": [],
            "content_type": null,
            "content_length": 0,
            "expires_at": "2099-01-01T00:00:00Z"
        }"#;
        let entry: CachedResponse = serde_json::from_str(json).unwrap();
        assert!(entry.replay::<Full<Bytes>>().is_err());
    }
}
