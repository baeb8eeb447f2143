//! Service registration.
//!
//! A [`Service`] is a collection of uniquely named [`Method`]s plus the
//! service-wide hooks applied around every invocation: context providers
//! (ordered request-context decorators) and the single identity provider.
//!
//! Registration happens once at process init, builder-style, after which the
//! service is wrapped in an `Arc` and only ever read. There is deliberately
//! no way to add a method to a shared service, so the methods map cannot
//! change once serving begins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::identity::Claims;
use crate::method::Method;

/// A hook that decorates the request context before each invocation.
pub type ContextProvider = Arc<dyn Fn(RequestContext) -> RequestContext + Send + Sync>;

/// A hook that converts raw authenticator claims into request-context state,
/// typically an [`Identity`](crate::Identity).
pub type IdentityProvider = Arc<dyn Fn(RequestContext, &Claims) -> RequestContext + Send + Sync>;

/// A named collection of RPC methods and their request-scoped hooks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use talaria_core::{Identity, Method, Service};
///
/// let service = Service::new()
///     .with_identity_provider(|ctx, claims| {
///         let identity = Identity::from_claims(claims);
///         ctx.with_identity(identity)
///     })
///     .add_method(Method::no_body("ping", |_ctx| async move { Ok(()) }));
///
/// let service = Arc::new(service);
/// assert!(service.get_method("ping").is_some());
/// ```
#[derive(Default)]
pub struct Service {
    methods: HashMap<String, Method>,
    context_providers: Vec<ContextProvider>,
    identity_provider: Option<IdentityProvider>,
}

impl Service {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method on the service.
    ///
    /// # Panics
    ///
    /// Panics when a method with the same name is already registered.
    /// Registration failures must surface at init, never at serve time.
    #[must_use]
    pub fn add_method(mut self, method: Method) -> Self {
        let name = method.name().to_string();
        let previous = self.methods.insert(name.clone(), method);
        assert!(
            previous.is_none(),
            "rpc method {name} is already registered"
        );
        self
    }

    /// Appends a context decorator, applied in registration order before
    /// every invocation.
    #[must_use]
    pub fn with_context_provider(
        mut self,
        provider: impl Fn(RequestContext) -> RequestContext + Send + Sync + 'static,
    ) -> Self {
        self.context_providers.push(Arc::new(provider));
        self
    }

    /// Sets the identity hook. A later call replaces an earlier one.
    #[must_use]
    pub fn with_identity_provider(
        mut self,
        provider: impl Fn(RequestContext, &Claims) -> RequestContext + Send + Sync + 'static,
    ) -> Self {
        self.identity_provider = Some(Arc::new(provider));
        self
    }

    /// Finds a registered method by name.
    #[must_use]
    pub fn get_method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Returns the service's only method, for single-handler deployments.
    ///
    /// `None` when the service carries zero or several methods.
    #[must_use]
    pub fn single_method(&self) -> Option<&Method> {
        if self.methods.len() == 1 {
            return self.methods.values().next();
        }
        None
    }

    /// Iterates over the registered methods.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    /// Returns `true` when an identity provider is configured.
    #[must_use]
    pub fn has_identity_provider(&self) -> bool {
        self.identity_provider.is_some()
    }

    /// Applies every context provider in registration order.
    #[must_use]
    pub fn apply_context_providers(&self, ctx: RequestContext) -> RequestContext {
        self.context_providers
            .iter()
            .fold(ctx, |ctx, provider| provider(ctx))
    }

    /// Applies the identity provider, when one is configured.
    #[must_use]
    pub fn apply_identity_provider(&self, ctx: RequestContext, claims: &Claims) -> RequestContext {
        match &self.identity_provider {
            Some(provider) => provider(ctx, claims),
            None => ctx,
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();

        f.debug_struct("Service")
            .field("methods", &names)
            .field("context_providers", &self.context_providers.len())
            .field("has_identity_provider", &self.identity_provider.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn ping() -> Method {
        Method::no_body("ping", |_ctx| async move { Ok(()) })
    }

    #[test]
    fn test_lookup() {
        let service = Service::new().add_method(ping());
        assert!(service.get_method("ping").is_some());
        assert!(service.get_method("teleport").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_name_panics() {
        let _ = Service::new().add_method(ping()).add_method(ping());
    }

    #[test]
    fn test_single_method() {
        let service = Service::new().add_method(ping());
        assert_eq!(service.single_method().map(Method::name), Some("ping"));

        let service =
            service.add_method(Method::no_body("status", |_ctx| async move { Ok(()) }));
        assert!(service.single_method().is_none());
    }

    #[test]
    fn test_context_providers_apply_in_order() {
        let service = Service::new()
            .with_context_provider(|ctx| ctx.with_request_id("first"))
            .with_context_provider(|ctx| ctx.with_request_id("second"));

        let ctx = service.apply_context_providers(RequestContext::mock());
        assert_eq!(ctx.request_id(), Some("second"));
    }

    #[test]
    fn test_identity_provider() {
        let service = Service::new().with_identity_provider(|ctx, claims| {
            ctx.with_identity(Identity::from_claims(claims))
        });
        assert!(service.has_identity_provider());

        let claims: Claims =
            serde_json::from_str(r#"{"sub":"user_123"}"#).expect("claims should parse");
        let ctx = service.apply_identity_provider(RequestContext::mock(), &claims);
        assert_eq!(ctx.identity().subject, "user_123");
    }

    #[test]
    fn test_missing_identity_provider_is_a_pass_through() {
        let service = Service::new();
        let ctx = service.apply_identity_provider(RequestContext::mock(), &Claims::new());
        assert!(ctx.identity().is_anonymous());
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Service>();
    }
}
