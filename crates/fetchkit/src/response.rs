//! Parsed response envelope handed to response and error interceptors

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use transport::HttpResponse;

use crate::error::Error;

/// Status, headers and the JSON-parsed body of a response.
///
/// `body` is `None` when the response text was not valid JSON (including
/// empty bodies). Parse failures are not errors at this stage.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
}

impl ResponseEnvelope {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<Value>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn from_response(response: HttpResponse) -> Self {
        let body = serde_json::from_str(&response.body).ok();
        Self::new(response.status, response.headers, body)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Message for a failed response: the body's `errorMessage` field if it
    /// is present and non-null, otherwise `HTTP <status>`.
    pub fn error_message(&self) -> String {
        match self.body.as_ref().and_then(|b| b.get("errorMessage")) {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Null) | None => format!("HTTP {}", self.status.as_u16()),
            Some(other) => other.to_string(),
        }
    }

    pub(crate) fn into_error(self) -> Error {
        let message = self.error_message();
        Error::Http {
            status: self.status,
            message,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_body() {
        let envelope =
            ResponseEnvelope::from_response(HttpResponse::new(StatusCode::OK, r#"{"a":1}"#));
        assert!(envelope.ok());
        assert_eq!(envelope.body(), Some(&json!({"a": 1})));
    }

    #[test]
    fn non_json_body_is_absent() {
        let envelope = ResponseEnvelope::from_response(HttpResponse::new(
            StatusCode::OK,
            "<html>gateway</html>",
        ));
        assert!(envelope.body().is_none());
    }

    #[test]
    fn empty_body_is_absent() {
        let envelope =
            ResponseEnvelope::from_response(HttpResponse::new(StatusCode::NO_CONTENT, ""));
        assert!(envelope.ok());
        assert!(envelope.body().is_none());
    }

    #[test]
    fn error_message_prefers_body_field() {
        let envelope = ResponseEnvelope::new(
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            Some(json!({"errorMessage": "Bad Request"})),
        );
        assert_eq!(envelope.error_message(), "Bad Request");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        let without_field = ResponseEnvelope::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Some(json!({"detail": "boom"})),
        );
        assert_eq!(without_field.error_message(), "HTTP 500");

        let null_field = ResponseEnvelope::new(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            Some(json!({"errorMessage": null})),
        );
        assert_eq!(null_field.error_message(), "HTTP 404");

        let no_body = ResponseEnvelope::new(StatusCode::BAD_GATEWAY, HeaderMap::new(), None);
        assert_eq!(no_body.error_message(), "HTTP 502");
    }

    #[test]
    fn non_string_error_message_is_rendered() {
        let envelope = ResponseEnvelope::new(
            StatusCode::CONFLICT,
            HeaderMap::new(),
            Some(json!({"errorMessage": 42})),
        );
        assert_eq!(envelope.error_message(), "42");
    }

    #[test]
    fn into_error_keeps_status_and_body() {
        let body = json!({"errorMessage": "quota exceeded", "retryAfter": 30});
        let err = ResponseEnvelope::new(
            StatusCode::TOO_MANY_REQUESTS,
            HeaderMap::new(),
            Some(body.clone()),
        )
        .into_error();
        match err {
            Error::Http {
                status,
                message,
                body: Some(b),
            } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(message, "quota exceeded");
                assert_eq!(b, body);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
