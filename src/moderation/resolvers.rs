//! Context resolvers
//!
//! Supply the actor, IP address, user agent and URL recorded with each
//! moderation. The defaults read the ambient [`RequestContext`]; outside a
//! request the URL is `console` and the rest is absent.

use super::Principal;
use crate::config::{ModerationConfig, ResolverConfig};
use crate::context::RequestContext;
use crate::error::{configuration_error, ModerationResult};
use std::collections::HashMap;
use std::sync::Arc;

/// URL recorded for changes made outside a request
pub const CONSOLE_URL: &str = "console";

pub trait UserResolver: Send + Sync {
    fn resolve(&self) -> Option<Principal>;
}

pub trait IpAddressResolver: Send + Sync {
    fn resolve(&self) -> Option<String>;
}

pub trait UserAgentResolver: Send + Sync {
    fn resolve(&self) -> Option<String>;
}

pub trait UrlResolver: Send + Sync {
    fn resolve(&self) -> String;
}

/// First principal authenticated by one of the configured guards
#[derive(Debug, Clone)]
pub struct GuardUserResolver {
    guards: Vec<String>,
}

impl GuardUserResolver {
    pub fn new(guards: Vec<String>) -> Self {
        Self { guards }
    }
}

impl UserResolver for GuardUserResolver {
    fn resolve(&self) -> Option<Principal> {
        let context = RequestContext::current()?;
        self.guards
            .iter()
            .find_map(|guard| context.principal(guard).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestIpAddressResolver;

impl IpAddressResolver for RequestIpAddressResolver {
    fn resolve(&self) -> Option<String> {
        RequestContext::current().and_then(|context| context.ip_address)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestUserAgentResolver;

impl UserAgentResolver for RequestUserAgentResolver {
    fn resolve(&self) -> Option<String> {
        RequestContext::current().and_then(|context| context.user_agent)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestUrlResolver;

impl UrlResolver for RequestUrlResolver {
    fn resolve(&self) -> String {
        RequestContext::current()
            .map(|context| context.url)
            .unwrap_or_else(|| CONSOLE_URL.to_string())
    }
}

/// Values captured for one moderation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedContext {
    pub user: Option<Principal>,
    pub url: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The resolvers selected by configuration
#[derive(Clone)]
pub struct Resolvers {
    user: Arc<dyn UserResolver>,
    ip_address: Arc<dyn IpAddressResolver>,
    user_agent: Arc<dyn UserAgentResolver>,
    url: Arc<dyn UrlResolver>,
}

impl Resolvers {
    pub fn resolve(&self) -> ResolvedContext {
        ResolvedContext {
            user: self.user.resolve(),
            url: self.url.resolve(),
            ip_address: self.ip_address.resolve(),
            user_agent: self.user_agent.resolve(),
        }
    }
}

/// Named resolver implementations
#[derive(Clone)]
pub struct ResolverRegistry {
    users: HashMap<String, Arc<dyn UserResolver>>,
    ip_addresses: HashMap<String, Arc<dyn IpAddressResolver>>,
    user_agents: HashMap<String, Arc<dyn UserAgentResolver>>,
    urls: HashMap<String, Arc<dyn UrlResolver>>,
}

impl ResolverRegistry {
    /// Registry holding the `guards` user resolver and the `request` resolvers
    pub fn with_defaults(config: &ModerationConfig) -> Self {
        let mut registry = Self {
            users: HashMap::new(),
            ip_addresses: HashMap::new(),
            user_agents: HashMap::new(),
            urls: HashMap::new(),
        };
        registry.register_user(
            "guards",
            GuardUserResolver::new(config.user.guards.clone()),
        );
        registry.register_ip_address("request", RequestIpAddressResolver);
        registry.register_user_agent("request", RequestUserAgentResolver);
        registry.register_url("request", RequestUrlResolver);
        registry
    }

    pub fn register_user(&mut self, name: &str, resolver: impl UserResolver + 'static) {
        self.users.insert(name.to_string(), Arc::new(resolver));
    }

    pub fn register_ip_address(&mut self, name: &str, resolver: impl IpAddressResolver + 'static) {
        self.ip_addresses.insert(name.to_string(), Arc::new(resolver));
    }

    pub fn register_user_agent(&mut self, name: &str, resolver: impl UserAgentResolver + 'static) {
        self.user_agents.insert(name.to_string(), Arc::new(resolver));
    }

    pub fn register_url(&mut self, name: &str, resolver: impl UrlResolver + 'static) {
        self.urls.insert(name.to_string(), Arc::new(resolver));
    }

    /// Pick the configured implementations
    pub fn select(&self, config: &ResolverConfig) -> ModerationResult<Resolvers> {
        Ok(Resolvers {
            user: lookup(&self.users, &config.user, "UserResolver")?,
            ip_address: lookup(&self.ip_addresses, &config.ip_address, "IpAddressResolver")?,
            user_agent: lookup(&self.user_agents, &config.user_agent, "UserAgentResolver")?,
            url: lookup(&self.urls, &config.url, "UrlResolver")?,
        })
    }
}

fn lookup<T: ?Sized>(
    registry: &HashMap<String, Arc<T>>,
    name: &str,
    kind: &str,
) -> ModerationResult<Arc<T>> {
    registry
        .get(name)
        .cloned()
        .ok_or_else(|| configuration_error(format!("Invalid {} implementation: {}", kind, name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolvers() -> Resolvers {
        let config = ModerationConfig::default();
        ResolverRegistry::with_defaults(&config)
            .select(&config.resolvers)
            .unwrap()
    }

    #[test]
    fn test_console_defaults() {
        let resolved = resolvers().resolve();

        assert_eq!(
            resolved,
            ResolvedContext {
                user: None,
                url: CONSOLE_URL.to_string(),
                ip_address: None,
                user_agent: None,
            }
        );
    }

    #[tokio::test]
    async fn test_request_scope_values() {
        let context = RequestContext {
            url: "http://localhost/posts/1".to_string(),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8.0".to_string()),
            principals: HashMap::from([(
                "api".to_string(),
                Principal::new("7", "users"),
            )]),
        };

        let resolved = context.scope(async { resolvers().resolve() }).await;

        assert_eq!(resolved.url, "http://localhost/posts/1");
        assert_eq!(resolved.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(resolved.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(resolved.user, Some(Principal::new("7", "users")));
    }

    #[tokio::test]
    async fn test_guard_order_is_respected() {
        let context = RequestContext {
            principals: HashMap::from([
                ("web".to_string(), Principal::new("1", "users")),
                ("api".to_string(), Principal::new("2", "clients")),
            ]),
            ..RequestContext::default()
        };

        let user = context
            .scope(async { GuardUserResolver::new(vec!["api".into(), "web".into()]).resolve() })
            .await;

        assert_eq!(user, Some(Principal::new("2", "clients")));
    }

    #[test]
    fn test_unknown_resolver_name() {
        let config = ModerationConfig::default();
        let mut selection = config.resolvers.clone();
        selection.ip_address = "geoip".to_string();

        let err = ResolverRegistry::with_defaults(&config)
            .select(&selection)
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Invalid IpAddressResolver implementation: geoip"));
    }
}
