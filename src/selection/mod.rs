//! Endpoint selection.
//!
//! # Responsibilities
//! - Pick the endpoint for the next attempt of an operation
//! - Keep the last successfully used endpoint sticky while it stays available
//! - Report when an unavailable sticky endpoint gets displaced
//!
//! # Design Decisions
//! - The sticky pointer has its own lock, independent of endpoint state
//! - Selection reads endpoint state; it never mutates it

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SelectionMode;
use crate::endpoint::{Endpoint, EndpointRegistry};

/// Result of one selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub endpoint: Arc<Endpoint>,
    /// Name of the sticky endpoint dropped because it became unavailable.
    pub displaced: Option<String>,
}

/// Chooses endpoints from a registry.
#[derive(Debug)]
pub struct SelectionPolicy {
    mode: SelectionMode,
    sticky: Mutex<Option<Arc<Endpoint>>>,
}

impl SelectionPolicy {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            sticky: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    fn sticky(&self) -> MutexGuard<'_, Option<Arc<Endpoint>>> {
        self.sticky.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Highest-priority available endpoint whose name is not in `exclude`.
    pub fn select(&self, registry: &EndpointRegistry, exclude: &[String]) -> Option<Arc<Endpoint>> {
        self.select_with_displacement(registry, exclude)
            .map(|selection| selection.endpoint)
    }

    /// Like [`select`](Self::select), but also reports a displaced sticky endpoint.
    pub fn select_with_displacement(
        &self,
        registry: &EndpointRegistry,
        exclude: &[String],
    ) -> Option<Selection> {
        let mut sticky = self.sticky();
        let mut displaced = None;

        if let Some(current) = sticky.as_ref() {
            if !current.is_available() {
                displaced = Some(current.name().to_string());
                *sticky = None;
            } else if self.mode == SelectionMode::Sticky
                && !exclude.iter().any(|name| name == current.name())
            {
                return Some(Selection {
                    endpoint: current.clone(),
                    displaced: None,
                });
            }
        }
        drop(sticky);

        let chosen = registry
            .available()
            .into_iter()
            .find(|e| !exclude.iter().any(|name| name == e.name()));

        match chosen {
            Some(endpoint) => Some(Selection {
                endpoint,
                displaced,
            }),
            None => {
                if let Some(name) = displaced {
                    tracing::warn!(
                        endpoint = %name,
                        "Current endpoint became unavailable and no replacement is eligible"
                    );
                }
                None
            }
        }
    }

    /// Make `endpoint` sticky after a successful call.
    pub fn record_success(&self, endpoint: &Arc<Endpoint>) {
        *self.sticky() = Some(endpoint.clone());
    }

    /// Endpoint that served the last successful call, if any.
    pub fn current(&self) -> Option<Arc<Endpoint>> {
        self.sticky().clone()
    }

    pub fn reset(&self) {
        *self.sticky() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::health::state::EndpointStatus;

    fn registry(priorities: &[(&str, i64)]) -> EndpointRegistry {
        let registry = EndpointRegistry::new(3);
        for (name, priority) in priorities {
            registry
                .register(
                    EndpointConfig::new(*name, "https://x.example", "wss://x.example")
                        .with_priority(*priority),
                )
                .unwrap();
        }
        registry
    }

    fn fail(endpoint: &Endpoint, times: usize) {
        for _ in 0..times {
            endpoint.record_failure(EndpointStatus::Failed);
        }
    }

    #[test]
    fn test_selects_highest_priority() {
        let registry = registry(&[("low", 25), ("high", 100), ("mid", 50)]);
        let policy = SelectionPolicy::new(SelectionMode::Sticky);

        assert_eq!(policy.select(&registry, &[]).unwrap().name(), "high");
        assert_eq!(
            policy.select(&registry, &["high".to_string()]).unwrap().name(),
            "mid"
        );
        let all = vec!["high".to_string(), "mid".to_string(), "low".to_string()];
        assert!(policy.select(&registry, &all).is_none());
    }

    #[test]
    fn test_sticky_survives_higher_priority_recovery() {
        let registry = registry(&[("high", 100), ("mid", 50)]);
        let policy = SelectionPolicy::new(SelectionMode::Sticky);
        let high = registry.get("high").unwrap();
        let mid = registry.get("mid").unwrap();

        fail(&high, 3);
        let selected = policy.select(&registry, &[]).unwrap();
        assert_eq!(selected.name(), "mid");
        policy.record_success(&selected);

        high.record_success(std::time::Duration::from_millis(10));
        assert_eq!(policy.select(&registry, &[]).unwrap().name(), "mid");

        // Excluding the sticky endpoint falls back to priority order.
        assert_eq!(
            policy.select(&registry, &["mid".to_string()]).unwrap().name(),
            "high"
        );
        assert_eq!(policy.current().unwrap().name(), mid.name());
    }

    #[test]
    fn test_unavailable_sticky_is_displaced() {
        let registry = registry(&[("high", 100), ("mid", 50)]);
        let policy = SelectionPolicy::new(SelectionMode::Sticky);
        let high = registry.get("high").unwrap();
        policy.record_success(&high);

        fail(&high, 3);
        let selection = policy.select_with_displacement(&registry, &[]).unwrap();
        assert_eq!(selection.endpoint.name(), "mid");
        assert_eq!(selection.displaced.as_deref(), Some("high"));
        assert!(policy.current().is_none());

        // Displacement is reported once.
        let again = policy.select_with_displacement(&registry, &[]).unwrap();
        assert!(again.displaced.is_none());
    }

    #[test]
    fn test_prefer_highest_ignores_sticky() {
        let registry = registry(&[("high", 100), ("mid", 50)]);
        let policy = SelectionPolicy::new(SelectionMode::PreferHighest);
        policy.record_success(&registry.get("mid").unwrap());

        assert_eq!(policy.select(&registry, &[]).unwrap().name(), "high");
        assert_eq!(policy.current().unwrap().name(), "mid");
    }

    #[test]
    fn test_reset_clears_sticky() {
        let registry = registry(&[("high", 100), ("mid", 50)]);
        let policy = SelectionPolicy::new(SelectionMode::Sticky);
        policy.record_success(&registry.get("mid").unwrap());
        policy.reset();

        assert!(policy.current().is_none());
        assert_eq!(policy.select(&registry, &[]).unwrap().name(), "high");
    }
}
