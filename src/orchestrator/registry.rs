//! Per-orchestrator provider registry.
//!
//! Uses `DashMap` for lock-free lookups from concurrent operations. Names are
//! unique; the first registered provider becomes the default unless one is
//! set explicitly.

use std::collections::BTreeMap;
use std::sync::RwLock;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use tracing::{debug, info};

use crate::ai::provider::{Capability, SharedProvider, UsageStats};
use crate::types::{ApiDocError, Result};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: DashMap<String, SharedProvider>,
    /// Registration order, for deterministic listings
    order: RwLock<Vec<String>>,
    default: RwLock<Option<String>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("default", &self.default_name())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`. Fails if the name is taken.
    pub fn register(&self, name: impl Into<String>, provider: SharedProvider) -> Result<()> {
        let name = name.into();
        match self.providers.entry(name.clone()) {
            Entry::Occupied(_) => return Err(ApiDocError::DuplicateProvider(name)),
            Entry::Vacant(slot) => {
                slot.insert(provider);
            }
        }

        write(&self.order).push(name.clone());

        let mut default = write(&self.default);
        if default.is_none() {
            debug!(provider = %name, "First registered provider becomes default");
            *default = Some(name.clone());
        }
        info!(provider = %name, "Registered provider");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SharedProvider> {
        self.providers.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Fails with `ProviderUnavailable` if `name` is not registered
    pub fn set_default(&self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(ApiDocError::ProviderUnavailable(format!(
                "cannot set default to unregistered provider '{}'",
                name
            )));
        }
        *write(&self.default) = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<String> {
        read(&self.default).clone()
    }

    pub fn default_provider(&self) -> Option<SharedProvider> {
        self.default_name().and_then(|name| self.get(&name))
    }

    /// Resolve a request's provider override, falling back to the default
    pub fn resolve(&self, name: Option<&str>) -> Result<SharedProvider> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| {
                ApiDocError::ProviderUnavailable(format!("provider '{}' is not registered", name))
            }),
            None => self.default_provider().ok_or_else(|| {
                ApiDocError::ProviderUnavailable("no default provider registered".to_string())
            }),
        }
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        read(&self.order).clone()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of providers declaring `capability`, in registration order
    pub fn providers_with(&self, capability: Capability) -> Vec<String> {
        self.names()
            .into_iter()
            .filter(|name| self.get(name).is_some_and(|p| p.supports(capability)))
            .collect()
    }

    pub fn usage_report(&self) -> BTreeMap<String, UsageStats> {
        self.providers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().usage_stats()))
            .collect()
    }

    /// Probe every provider concurrently
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let providers: Vec<(String, SharedProvider)> = self
            .providers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let checks = providers.into_iter().map(|(name, provider)| async move {
            let available = provider.is_available().await;
            debug!(provider = %name, available, "Health check");
            (name, available)
        });

        join_all(checks).await.into_iter().collect()
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::MockProvider;
    use std::sync::Arc;

    fn mock(name: &str) -> SharedProvider {
        Arc::new(MockProvider::new(name))
    }

    #[test]
    fn test_first_registered_is_default() {
        let registry = ProviderRegistry::new();
        registry.register("a", mock("a")).unwrap();
        registry.register("b", mock("b")).unwrap();

        assert_eq!(registry.default_name().as_deref(), Some("a"));
        assert_eq!(registry.names(), vec!["a", "b"]);

        registry.set_default("b").unwrap();
        assert_eq!(registry.default_provider().unwrap().name(), "b");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = ProviderRegistry::new();
        registry.register("a", mock("a")).unwrap();
        assert!(matches!(
            registry.register("a", mock("a")),
            Err(ApiDocError::DuplicateProvider(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_default_unknown_fails() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.set_default("missing"),
            Err(ApiDocError::ProviderUnavailable(_))
        ));
    }

    #[test]
    fn test_resolve() {
        let registry = ProviderRegistry::new();
        assert!(registry.resolve(None).is_err());

        registry.register("a", mock("a")).unwrap();
        assert_eq!(registry.resolve(None).unwrap().name(), "a");
        assert_eq!(registry.resolve(Some("a")).unwrap().name(), "a");
        assert!(matches!(
            registry.resolve(Some("b")),
            Err(ApiDocError::ProviderUnavailable(_))
        ));
    }

    #[test]
    fn test_providers_with_capability() {
        let registry = ProviderRegistry::new();
        registry.register("general", mock("general")).unwrap();
        registry
            .register(
                "narrow",
                Arc::new(
                    MockProvider::new("narrow").with_capabilities(&[Capability::TextCompletion]),
                ),
            )
            .unwrap();

        assert_eq!(
            registry.providers_with(Capability::Summarization),
            vec!["general"]
        );
        assert_eq!(
            registry.providers_with(Capability::TextCompletion),
            vec!["general", "narrow"]
        );
    }

    #[tokio::test]
    async fn test_health_check_and_usage_report() {
        let registry = ProviderRegistry::new();
        let down = Arc::new(MockProvider::new("down"));
        down.set_available(false);
        registry.register("up", mock("up")).unwrap();
        registry.register("down", down).unwrap();

        let health = registry.health_check().await;
        assert_eq!(health.get("up"), Some(&true));
        assert_eq!(health.get("down"), Some(&false));

        let report = registry.usage_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report["up"].total_requests, 0);
    }
}
