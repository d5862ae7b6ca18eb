//! Date-header gate.
//!
//! This is NOT authentication. It only checks that the `Authorization` header
//! parses as a date written like `January 02, 2006`; any client can pass it.
//! Put a real credential check in front of the service if access must be
//! restricted.

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;

/// Layout the header value must follow, e.g. `January 02, 2006`.
pub const DATE_LAYOUT: &str = "%B %d, %Y";

/// Returns true when the `Authorization` header holds a date in [`DATE_LAYOUT`].
///
/// The value must be the layout exactly: full month name, two-digit day, no
/// surrounding whitespace. Only the month name's case may differ.
pub fn has_date_header(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_layout_date)
}

fn is_layout_date(value: &str) -> bool {
    // chrono accepts short month names and one-digit days, so re-render and compare
    match NaiveDate::parse_from_str(value, DATE_LAYOUT) {
        Ok(date) => value.eq_ignore_ascii_case(&date.format(DATE_LAYOUT).to_string()),
        Err(_) => false,
    }
}

/// Middleware rejecting requests whose `Authorization` header is not a date.
pub async fn require_date_header(req: Request, next: Next) -> Response {
    if !has_date_header(req.headers()) {
        tracing::debug!(uri = %req.uri(), "rejected request without date header");
        let status = StatusCode::UNAUTHORIZED;
        return (
            status,
            Json(json!({"code": status.as_u16(), "message": "Unauthorized"})),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_accepts_reference_date() {
        assert!(has_date_header(&headers_with("January 02, 2006")));
        assert!(has_date_header(&headers_with("October 16, 2026")));
        assert!(has_date_header(&headers_with("JANUARY 02, 2006")));
        assert!(has_date_header(&headers_with("january 02, 2006")));
    }

    #[test]
    fn test_rejects_missing_header() {
        assert!(!has_date_header(&HeaderMap::new()));
    }

    #[test]
    fn test_rejects_other_formats() {
        assert!(!has_date_header(&headers_with("2006-01-02")));
        assert!(!has_date_header(&headers_with("Bearer abc.def")));
        assert!(!has_date_header(&headers_with("February 30, 2006")));
        assert!(!has_date_header(&headers_with("")));
        assert!(!has_date_header(&headers_with("Jan 02, 2006")));
        assert!(!has_date_header(&headers_with("January 2, 2006")));
        assert!(!has_date_header(&headers_with(" January 02, 2006 ")));
        assert!(!has_date_header(&headers_with("January 02, 2006 extra")));
    }
}
