//! The authenticated identity of a request and its request-scoped carrier.
//!
//! A transport hook validates the `Authorization` header once, then runs the
//! request handler inside [`scope`]. Business logic reads the identity with
//! [`current`].
//!
//! ```
//! use tokensmith_authn::identity::{self, AuthenticatedIdentity};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let who = identity::scope(AuthenticatedIdentity::user("alice"), async {
//!     identity::current().username().map(str::to_owned)
//! })
//! .await;
//! assert_eq!(who.as_deref(), Some("alice"));
//! # }
//! ```

use std::future::Future;

tokio::task_local! {
    static CURRENT_IDENTITY: AuthenticatedIdentity;
}

/// Who a request is acting as.
///
/// Immutable once created. The username is only present for authenticated
/// identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthenticatedIdentity {
    is_authenticated: bool,
    username: String,
}

impl AuthenticatedIdentity {
    /// The identity of a request that presented no credentials.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { is_authenticated: false, username: String::new() }
    }

    /// The identity of a request authenticated as `username`.
    #[must_use]
    pub fn user(username: impl Into<String>) -> Self {
        Self { is_authenticated: true, username: username.into() }
    }

    /// Returns `true` if the request carried a valid token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Returns the authenticated username, or `None` for an unauthenticated request.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.is_authenticated.then_some(self.username.as_str())
    }
}

impl Default for AuthenticatedIdentity {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

/// Runs `fut` with `identity` attached as the current request identity.
pub async fn scope<F: Future>(identity: AuthenticatedIdentity, fut: F) -> F::Output {
    CURRENT_IDENTITY.scope(identity, fut).await
}

/// Returns the identity attached by the enclosing [`scope`].
///
/// # Panics
///
/// Panics if called outside a [`scope`]. Reaching business logic without an
/// attached identity means the transport hook was bypassed, which is a
/// programming error.
#[allow(clippy::panic)]
#[must_use]
pub fn current() -> AuthenticatedIdentity {
    match try_current() {
        Some(identity) => identity,
        None => panic!("no authenticated identity attached to this request"),
    }
}

/// Returns the identity attached by the enclosing [`scope`], if any.
#[must_use]
pub fn try_current() -> Option<AuthenticatedIdentity> {
    CURRENT_IDENTITY.try_with(Clone::clone).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthenticated_has_no_username() {
        let identity = AuthenticatedIdentity::unauthenticated();
        assert!(!identity.is_authenticated());
        assert_eq!(identity.username(), None);
        assert_eq!(identity, AuthenticatedIdentity::default());
    }

    #[test]
    fn test_user_identity() {
        let identity = AuthenticatedIdentity::user("alice");
        assert!(identity.is_authenticated());
        assert_eq!(identity.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_scope_attaches_identity() {
        let seen = scope(AuthenticatedIdentity::user("bob"), async { current() }).await;
        assert_eq!(seen, AuthenticatedIdentity::user("bob"));
    }

    #[tokio::test]
    async fn test_nested_scopes_shadow() {
        scope(AuthenticatedIdentity::user("outer"), async {
            let inner = scope(AuthenticatedIdentity::unauthenticated(), async { current() }).await;
            assert!(!inner.is_authenticated());
            assert_eq!(current().username(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_try_current_outside_scope() {
        assert!(try_current().is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "no authenticated identity")]
    async fn test_current_outside_scope_panics() {
        let _ = current();
    }

    #[tokio::test]
    async fn test_scopes_are_per_task() {
        let a = tokio::spawn(scope(AuthenticatedIdentity::user("a"), async {
            tokio::task::yield_now().await;
            current()
        }));
        let b = tokio::spawn(scope(AuthenticatedIdentity::user("b"), async {
            tokio::task::yield_now().await;
            current()
        }));
        assert_eq!(a.await.unwrap().username(), Some("a"));
        assert_eq!(b.await.unwrap().username(), Some("b"));
    }
}
