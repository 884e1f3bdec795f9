use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use fulfillment_engine::FulfillmentError;
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Fulfillment(#[from] FulfillmentError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Fulfillment(e) => fulfillment_status(e),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn fulfillment_status(e: &FulfillmentError) -> StatusCode {
    match e {
        FulfillmentError::Validation(_) | FulfillmentError::InvalidOtp => StatusCode::BAD_REQUEST,
        FulfillmentError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        FulfillmentError::NotFound(_) => StatusCode::NOT_FOUND,
        FulfillmentError::Conflict(_) | FulfillmentError::InvalidTransition(_) => StatusCode::CONFLICT,
        FulfillmentError::CapacityExceeded(_)
        | FulfillmentError::SlotUnavailable(_)
        | FulfillmentError::OutOfStock { .. } => StatusCode::CONFLICT,
        FulfillmentError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FulfillmentError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Problems with the identity headers forwarded by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No {0} header was provided")]
    MissingHeader(&'static str),
    #[error("The {0} header is not valid. {1}")]
    MalformedHeader(&'static str, String),
    #[error("The identity signature is invalid")]
    InvalidSignature,
}

#[cfg(test)]
mod test {
    use fulfillment_common::Paise;

    use super::*;

    #[test]
    fn engine_errors_map_to_http_codes() {
        let cases = [
            (FulfillmentError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (FulfillmentError::InvalidOtp, StatusCode::BAD_REQUEST),
            (FulfillmentError::NotAuthorized("no".into()), StatusCode::FORBIDDEN),
            (FulfillmentError::NotFound("Order 1".into()), StatusCode::NOT_FOUND),
            (FulfillmentError::Conflict("late".into()), StatusCode::CONFLICT),
            (FulfillmentError::InvalidTransition("no".into()), StatusCode::CONFLICT),
            (FulfillmentError::SlotUnavailable("full".into()), StatusCode::CONFLICT),
            (FulfillmentError::OutOfStock { product_id: 1, requested: 3 }, StatusCode::CONFLICT),
            (
                FulfillmentError::InsufficientBalance { requested: Paise::from(10), available: Paise::from(5) },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (FulfillmentError::DatabaseError("gone".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (e, status) in cases {
            assert_eq!(ServerError::from(e).status_code(), status);
        }
    }

    #[test]
    fn identity_errors_are_unauthorized() {
        let e = ServerError::from(AuthError::MissingHeader("X-Actor-Id"));
        assert_eq!(e.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(e.to_string(), "Authentication Error. No X-Actor-Id header was provided");
    }
}
