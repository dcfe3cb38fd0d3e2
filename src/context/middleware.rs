//! Request context capture middleware
//!
//! Wire with `axum::middleware::from_fn_with_state(guards, capture_request_context)`.

use super::{AuthGuard, RequestContext};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HOST, header::USER_AGENT, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::debug;

/// Guards consulted for every request, in registration order
#[derive(Clone, Default)]
pub struct RequestGuards {
    guards: Vec<Arc<dyn AuthGuard>>,
}

impl RequestGuards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: impl AuthGuard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    fn authenticate(&self, headers: &HeaderMap) -> HashMap<String, crate::moderation::Principal> {
        self.guards
            .iter()
            .filter_map(|guard| {
                guard
                    .authenticate(headers)
                    .map(|principal| (guard.name().to_string(), principal))
            })
            .collect()
    }
}

/// Capture the request context and run the rest of the stack inside it
pub async fn capture_request_context(
    State(guards): State<RequestGuards>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let headers = request.headers();
    let context = RequestContext {
        url: full_url(headers, request.uri()),
        ip_address: client_ip(headers, peer).map(|ip| ip.to_string()),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        principals: guards.authenticate(headers),
    };
    debug!(
        "Request context: {} from {:?}",
        context.url, context.ip_address
    );

    context.scope(next.run(request)).await
}

/// Client IP address
///
/// Priority:
/// 1. X-Forwarded-For header (first entry)
/// 2. X-Real-IP header
/// 3. Peer socket address
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let header_ip = |name: &str, first_hop: bool| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| if first_hop { s.split(',').next() } else { Some(s) })
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    // Unparsable headers fall through to the next source
    header_ip("x-forwarded-for", true)
        .or_else(|| header_ip("x-real-ip", false))
        .or(peer)
}

/// Absolute URL of the request, rebuilt from Host and X-Forwarded-Proto for origin-form URIs
pub fn full_url(headers: &HeaderMap, uri: &Uri) -> String {
    if uri.scheme().is_some() {
        return uri.to_string();
    }

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match headers.get(HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|h| h.to_str().ok())
                .unwrap_or("http");
            format!("{}://{}{}", scheme, host, path)
        }
        None => path.to_string(),
    }
}
