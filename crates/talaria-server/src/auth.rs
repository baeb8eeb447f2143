//! Pluggable request authentication.

use talaria_core::{Claims, RpcError};

/// Validates a bearer credential and produces the raw claims it carries.
///
/// The development server treats token verification as a black box: a
/// deployment sits behind a gateway authorizer, so any implementation that
/// turns an `Authorization` header value into a claims mapping will do.
/// Failures should use the `invalid_token` / `invalid_authentication`
/// codes so responses match what the gateway would produce.
///
/// Closures with the right shape implement the trait:
///
/// ```
/// use talaria_core::{codes, Claims, RpcError};
/// use talaria_server::Authenticator;
///
/// fn static_authenticator() -> impl Authenticator {
///     |token: &str| {
///         if token != "Bearer dev-token" {
///             return Err(RpcError::new(codes::INVALID_TOKEN));
///         }
///         let mut claims = Claims::new();
///         claims.insert("sub".into(), "dev_user".into());
///         Ok(claims)
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync {
    /// Validates the `Authorization` header value and returns its claims.
    fn authenticate(&self, token: &str) -> Result<Claims, RpcError>;
}

impl<F> Authenticator for F
where
    F: Fn(&str) -> Result<Claims, RpcError> + Send + Sync,
{
    fn authenticate(&self, token: &str) -> Result<Claims, RpcError> {
        self(token)
    }
}
