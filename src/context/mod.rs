//! Ambient request context
//!
//! The HTTP layer captures URL, client IP, user agent and authenticated
//! principals into a task-local [`RequestContext`] for the duration of a
//! request; the default resolvers read it from there.

mod guards;
mod middleware;

pub use guards::{AuthGuard, Claims, HeaderGuard, JwtGuard};
pub use middleware::{capture_request_context, client_ip, full_url, RequestGuards};

use crate::moderation::Principal;
use std::collections::HashMap;
use std::future::Future;

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub url: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Guard name -> principal it authenticated
    pub principals: HashMap<String, Principal>,
}

impl RequestContext {
    /// Context of the current task, `None` outside any request scope
    pub fn current() -> Option<RequestContext> {
        REQUEST_CONTEXT.try_with(Clone::clone).ok()
    }

    /// Whether the current task runs inside a request scope
    pub fn is_active() -> bool {
        REQUEST_CONTEXT.try_with(|_| ()).is_ok()
    }

    /// Run `f` with this context installed
    pub async fn scope<F: Future>(self, f: F) -> F::Output {
        REQUEST_CONTEXT.scope(self, f).await
    }

    pub fn principal(&self, guard: &str) -> Option<&Principal> {
        self.principals.get(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_context_outside_scope() {
        assert_eq!(RequestContext::current(), None);
    }

    #[tokio::test]
    async fn test_scope_installs_context() {
        let context = RequestContext {
            url: "http://localhost/".to_string(),
            ..RequestContext::default()
        };

        let seen = context
            .clone()
            .scope(async { RequestContext::current() })
            .await;

        assert_eq!(seen, Some(context));
        assert_eq!(RequestContext::current(), None);
        assert!(!RequestContext::is_active());
        assert!(RequestContext::default().scope(async { RequestContext::is_active() }).await);
    }
}
