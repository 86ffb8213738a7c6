//! HTTP-date formatting (RFC 7231 IMF-fixdate).

use chrono::{DateTime, NaiveDateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue};

const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Formats `at` as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn fmt_http_date(at: DateTime<Utc>) -> String {
    at.format(IMF_FIXDATE).to_string()
}

/// Parses an IMF-fixdate. Obsolete RFC 850 and asctime forms are not accepted.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), IMF_FIXDATE)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Sets header `name` to `at`, replacing existing values.
pub fn set_date_header(headers: &mut HeaderMap, name: HeaderName, at: DateTime<Utc>) {
    // IMF-fixdate is plain ASCII, so this never fails.
    if let Ok(value) = HeaderValue::from_str(&fmt_http_date(at)) {
        headers.insert(name, value);
    }
}
