//! Classification of transport outcomes and refresh failures
//!
//! Every outcome is classified exactly once, here, at the facade boundary.

use session::Error as SessionError;
use transport::{RawResponse, ResponseClass};

use crate::error::Error;

/// What the facade should do with one transport outcome.
#[derive(Debug)]
pub enum Classified {
    /// 2xx, hand to the caller
    Done(RawResponse),
    /// 401, the presented credential has expired
    Expired,
    /// Anything else, surfaced as an error
    Failed(Error),
}

/// Classify the outcome of one call to an ordinary endpoint.
pub fn classify_outcome(outcome: transport::Result<RawResponse>) -> Classified {
    let response = match outcome {
        Ok(r) => r,
        Err(e) => return Classified::Failed(e.into()),
    };
    match ResponseClass::of(response.status) {
        ResponseClass::Success => Classified::Done(response),
        ResponseClass::ExpirySignal => Classified::Expired,
        _ => Classified::Failed(Error::Status {
            status: response.status,
            body: response.text(),
        }),
    }
}

/// Map a failed refresh to the error every waiting caller receives.
///
/// Rejected refresh evidence ends the session; anything else is a
/// retryable transport failure that leaves the credential alone.
pub fn classify_refresh_error(error: SessionError) -> Error {
    match error {
        SessionError::InvalidCredentials(msg) => Error::SessionEnded(msg),
        SessionError::Http(msg) | SessionError::TokenExchange(msg) => Error::Transport(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::TransportError;

    #[test]
    fn success_passes_through() {
        let classified = classify_outcome(Ok(RawResponse::new(200, "[]")));
        assert!(matches!(classified, Classified::Done(r) if r.text() == "[]"));
    }

    #[test]
    fn unauthorized_is_expiry() {
        let classified = classify_outcome(Ok(RawResponse::new(401, "token expired")));
        assert!(matches!(classified, Classified::Expired));
    }

    #[test]
    fn forbidden_is_not_expiry() {
        let classified = classify_outcome(Ok(RawResponse::new(
            403,
            "User must be part of the ADMIN role",
        )));
        match classified {
            Classified::Failed(Error::Status { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("ADMIN"));
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[test]
    fn transport_error_is_failure() {
        let classified = classify_outcome(Err(TransportError::Connect("refused".into())));
        assert!(matches!(classified, Classified::Failed(Error::Transport(_))));
    }

    #[test]
    fn rejected_refresh_ends_session() {
        let err = classify_refresh_error(SessionError::InvalidCredentials("expired".into()));
        assert!(err.is_session_ended());
    }

    #[test]
    fn other_refresh_failures_are_retryable() {
        let err = classify_refresh_error(SessionError::Http("connection reset".into()));
        assert!(matches!(err, Error::Transport(_)));
        let err = classify_refresh_error(SessionError::TokenExchange("returned 502".into()));
        assert!(err.is_retryable());
    }
}
