//! The authenticated caller record.
//!
//! [`Identity`] describes who is making the request. It is built once per
//! request by an identity provider hook from the raw claims of whatever
//! authenticated the caller, attached to the [`RequestContext`], and read by
//! handlers. No operation here performs I/O.
//!
//! [`RequestContext`]: crate::RequestContext

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codes;
use crate::error::RpcError;

/// A raw claims mapping as produced by an authenticator.
pub type Claims = serde_json::Map<String, Value>;

/// The authenticated caller of a request.
///
/// Either fully populated (authenticated request) or the zero record
/// (unauthenticated): there is no partial state in between.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Token format version.
    #[serde(default)]
    pub version: String,

    /// Token issuer.
    #[serde(default)]
    pub issuer: String,

    /// The principal the token was issued to. Empty means unauthenticated.
    #[serde(default)]
    pub subject: String,

    /// The audiences the token is valid for.
    #[serde(default)]
    pub audience: Vec<String>,

    /// The scopes granted to the caller.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// The account the caller is acting within, when the issuer models one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl Identity {
    /// Builds an identity from a raw claims mapping.
    ///
    /// Reads `v`, `iss`, `sub`, `aud` (a string or a list of strings),
    /// `scope` (a space-delimited string) and `account_id`. Absent or
    /// differently-typed claims read as empty.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        let text = |key: &str| {
            claims
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let audience = match claims.get("aud") {
            Some(Value::String(aud)) => vec![aud.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let scopes = claims
            .get("scope")
            .and_then(Value::as_str)
            .map(|scope| scope.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let account_id = claims
            .get("account_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            version: text("v"),
            issuer: text("iss"),
            subject: text("sub"),
            audience,
            scopes,
            account_id,
        }
    }

    /// Returns `true` when this is the zero record.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.subject.is_empty()
    }

    /// Returns `true` if the caller holds the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|held| held == scope)
    }

    /// Fails with `access_denied` when the caller lacks the given scope.
    ///
    /// # Example
    ///
    /// ```
    /// use talaria_core::Identity;
    ///
    /// let identity = Identity {
    ///     subject: "user_123".into(),
    ///     scopes: vec!["reports:read".into()],
    ///     ..Identity::default()
    /// };
    ///
    /// assert!(identity.must_have_scope("reports:read").is_ok());
    /// assert!(identity.must_have_scope("reports:write").is_err());
    /// ```
    pub fn must_have_scope(&self, scope: &str) -> Result<(), RpcError> {
        if self.has_scope(scope) {
            return Ok(());
        }

        Err(RpcError::new(codes::ACCESS_DENIED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_from(raw: &str) -> Claims {
        serde_json::from_str(raw).expect("test claims should parse")
    }

    #[test]
    fn test_from_claims_without_scope() {
        let claims = claims_from(
            r#"{
                "aud": ["client_222", "client_111"],
                "exp": "1.576422538e+09",
                "iat": "1.576418938e+09",
                "iss": "https://identity.example.com",
                "nbf": "1.576418938e+09",
                "sub": "user_123",
                "v": "00"
            }"#,
        );

        assert_eq!(
            Identity::from_claims(&claims),
            Identity {
                version: "00".into(),
                issuer: "https://identity.example.com".into(),
                subject: "user_123".into(),
                audience: vec!["client_222".into(), "client_111".into()],
                scopes: vec![],
                account_id: None,
            }
        );
    }

    #[test]
    fn test_from_claims_with_scope() {
        let claims = claims_from(
            r#"{
                "iss": "https://identity.example.com",
                "sub": "user_123",
                "scope": "one two",
                "v": "00"
            }"#,
        );

        let identity = Identity::from_claims(&claims);
        assert_eq!(identity.scopes, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_from_claims_with_string_audience() {
        let claims = claims_from(r#"{"sub": "user_123", "aud": "client_111"}"#);
        assert_eq!(
            Identity::from_claims(&claims).audience,
            vec!["client_111".to_string()]
        );
    }

    #[test]
    fn test_from_claims_with_account() {
        let claims = claims_from(r#"{"sub": "user_123", "account_id": "acc_456"}"#);
        assert_eq!(
            Identity::from_claims(&claims).account_id.as_deref(),
            Some("acc_456")
        );
    }

    #[test]
    fn test_empty_claims_read_as_anonymous() {
        let identity = Identity::from_claims(&Claims::new());
        assert!(identity.is_anonymous());
        assert!(identity.audience.is_empty());
        assert!(identity.scopes.is_empty());
    }

    #[test]
    fn test_must_have_scope() {
        let identity = Identity {
            subject: "user_123".into(),
            scopes: vec!["api:read".into(), "api:write".into()],
            ..Identity::default()
        };

        assert!(identity.must_have_scope("api:write").is_ok());

        let err = identity
            .must_have_scope("api:admin")
            .expect_err("scope should be missing");
        assert!(err.is_code(codes::ACCESS_DENIED));
    }

    #[test]
    fn test_zero_record_has_no_scopes() {
        let identity = Identity::default();
        assert!(identity.is_anonymous());
        assert!(identity.must_have_scope("anything").is_err());
    }
}
