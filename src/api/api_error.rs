use crate::error::Error;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl APIError {
    pub(crate) fn status(&self) -> StatusCode {
        if let Some(rejection) = self.0.downcast_ref::<JsonRejection>() {
            return rejection_status(rejection);
        }
        match self.0.downcast_ref::<Error>() {
            Some(Error::LockTimeout { .. } | Error::LockCancelled | Error::LockFile(_)) => {
                StatusCode::CONFLICT
            }
            Some(
                Error::RecordNotFound { .. }
                | Error::MissingField(_)
                | Error::InvalidName(_)
                | Error::UnknownRecordType(_)
                | Error::NotFQDN(_),
            ) => StatusCode::BAD_REQUEST,
            Some(Error::Unauthorized) => StatusCode::UNAUTHORIZED,
            Some(Error::JsonExtractorRejection(rejection)) => rejection_status(rejection),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection {
        JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let status = self.status();
        let any_err = self.0;
        let body = Json(json!({
            "error": format!("{any_err}"),
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

    #[test]
    fn lock_errors_conflict() {
        let timeout = Error::LockTimeout {
            attempts: 30,
            source: std::io::Error::from(std::io::ErrorKind::WouldBlock),
        };
        assert_eq!(APIError::from(timeout).status(), StatusCode::CONFLICT);
        assert_eq!(APIError::from(Error::LockCancelled).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_is_bad_request() {
        let err = Error::RecordNotFound {
            fqdn: "a.example.".to_string(),
            hash: "HASH".to_string(),
            rrtype: "TXT".to_string(),
        };
        assert_eq!(APIError::from(err).status(), StatusCode::BAD_REQUEST);
        assert_eq!(APIError::from(Error::MissingField("fqdn")).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn everything_else_is_internal() {
        let open = Error::OpenZoneFile(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(APIError::from(open).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            APIError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
