//! # Authentication
//!
//! Optional bearer-token authentication.
//!
//! ```text
//! Bearer {secret}                       operator
//! Bearer member:{member_id}:{secret}    member acting as itself
//! ```
//!
//! With no token configured every request runs as the operator. The
//! middleware injects a [`Caller`] into the request extensions; handlers
//! extract it and call [`require_operator`] or [`require_acting_as`].

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ccv_core::MemberId;
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Runs the circle: activation, cancellation, exclusion, settlement.
    Operator,
    /// A member, who may only join and pay as itself.
    Member(MemberId),
}

impl Caller {
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Operator)
    }
}

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Fail with 403 unless the caller is the operator.
pub fn require_operator(caller: &Caller) -> Result<(), AppError> {
    match caller {
        Caller::Operator => Ok(()),
        Caller::Member(id) => Err(AppError::Forbidden(format!(
            "operator role required, caller is member {id}"
        ))),
    }
}

/// Fail with 403 unless the caller is the operator or `member` itself.
pub fn require_acting_as(caller: &Caller, member: &MemberId) -> Result<(), AppError> {
    match caller {
        Caller::Operator => Ok(()),
        Caller::Member(id) if id == member => Ok(()),
        Caller::Member(id) => Err(AppError::Forbidden(format!(
            "member {id} cannot act as {member}"
        ))),
    }
}

/// Auth configuration injected into request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer secrets.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token against the configured secret.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<Caller, String> {
    if let Some(rest) = provided.strip_prefix("member:") {
        let (member, secret) = rest
            .split_once(':')
            .ok_or_else(|| "invalid token format, expected member:{member_id}:{secret}".to_string())?;
        if !constant_time_token_eq(secret, expected_secret) {
            return Err("invalid bearer token".into());
        }
        let member = MemberId::new(member).map_err(|e| format!("invalid member id: {e}"))?;
        return Ok(Caller::Member(member));
    }
    if constant_time_token_eq(provided, expected_secret) {
        Ok(Caller::Operator)
    } else {
        Err("invalid bearer token".into())
    }
}

/// Resolve the caller from the `Authorization` header.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let caller = match expected {
        None => Caller::Operator,
        Some(expected) => {
            let header_value = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            let Some(provided) = header_value.and_then(|v| v.strip_prefix("Bearer ")) else {
                return AppError::Unauthorized("missing bearer token".into()).into_response();
            };
            match parse_bearer_token(provided, &expected) {
                Ok(caller) => caller,
                Err(reason) => {
                    tracing::warn!(%reason, "authentication failed");
                    return AppError::Unauthorized(reason).into_response();
                }
            }
        }
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_secret_is_operator() {
        assert_eq!(parse_bearer_token("s3cret", "s3cret").unwrap(), Caller::Operator);
    }

    #[test]
    fn member_token_carries_identity() {
        let caller = parse_bearer_token("member:0xabc:s3cret", "s3cret").unwrap();
        assert_eq!(caller, Caller::Member(MemberId::new("0xabc").unwrap()));
        assert!(!caller.is_operator());
    }

    #[test]
    fn wrong_secret_rejected() {
        assert!(parse_bearer_token("nope", "s3cret").is_err());
        assert!(parse_bearer_token("member:alice:nope", "s3cret").is_err());
        assert!(parse_bearer_token("member:alice", "s3cret").is_err());
    }

    #[test]
    fn members_act_only_as_themselves() {
        let alice = MemberId::new("alice").unwrap();
        let bob = MemberId::new("bob").unwrap();
        let caller = Caller::Member(alice.clone());
        assert!(require_acting_as(&caller, &alice).is_ok());
        assert!(require_acting_as(&caller, &bob).is_err());
        assert!(require_operator(&caller).is_err());
        assert!(require_acting_as(&Caller::Operator, &bob).is_ok());
    }

    #[test]
    fn auth_config_debug_redacts() {
        let config = AuthConfig {
            token: Some("s3cret".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
