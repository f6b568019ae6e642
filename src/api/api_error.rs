use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl APIError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.0.downcast_ref::<Error>() {
            Some(Error::Forbidden) => (StatusCode::UNAUTHORIZED, "forbidden"),
            Some(Error::BadSubdomain) => (StatusCode::BAD_REQUEST, "bad_subdomain"),
            Some(Error::BadTxt) => (StatusCode::BAD_REQUEST, "bad_txt"),
            Some(Error::InvalidCidr(_)) => (StatusCode::BAD_REQUEST, "invalid_allowfrom_cidr"),
            Some(Error::PayloadTooLarge(_)) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
            }
            Some(Error::MalformedJson(_) | Error::Body(_)) => {
                (StatusCode::BAD_REQUEST, "malformed_json_payload")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "db_error"),
        }
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        } else {
            tracing::debug!("request rejected: {:#}", self.0);
        }
        let body = Json(json!({
            "error": code,
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_code(err: Error) -> (StatusCode, &'static str) {
        APIError::from(err).status_and_code()
    }

    #[test]
    fn error_codes() {
        assert_eq!(
            status_and_code(Error::Forbidden),
            (StatusCode::UNAUTHORIZED, "forbidden")
        );
        assert_eq!(
            status_and_code(Error::BadTxt),
            (StatusCode::BAD_REQUEST, "bad_txt")
        );
        assert_eq!(
            status_and_code(Error::InvalidCidr("10/8".to_string())),
            (StatusCode::BAD_REQUEST, "invalid_allowfrom_cidr")
        );
        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            status_and_code(Error::MalformedJson(bad_json)),
            (StatusCode::BAD_REQUEST, "malformed_json_payload")
        );
        assert_eq!(
            status_and_code(Error::PayloadTooLarge(16)),
            (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
        );
        assert_eq!(
            status_and_code(Error::StorePoisoned),
            (StatusCode::INTERNAL_SERVER_ERROR, "db_error")
        );
    }
}
