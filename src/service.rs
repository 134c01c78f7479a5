// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Metadata service: get, evict and notify
//!
//! The service routes each instance identifier to the provider registered
//! for its class, caches what the provider returns, and reacts to
//! dependency notifications by evicting and recomputing downstream items.
//!
//! Providers receive the service while computing and may call back into it
//! for upstream items. No lock is held across a provider call; a request for
//! an item that is already being computed on the same thread returns `None`
//! and is retried once the outermost request finishes.

use crate::cache::{CacheStats, MetadataCache};
use crate::error::{Error, Result};
use crate::id::MetadataId;
use crate::itd::ItdTypeDetails;
use crate::registry::{DependencyRegistry, MetadataNotificationListener};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

// =========================================================================
// Items and providers
// =========================================================================

/// Downcasting support for metadata items
pub trait AsAny: Any + Send + Sync {
    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;
    /// Convert a shared item into `Any` for `Arc::downcast`
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An immutable computed fact addressed by its identifier
pub trait MetadataItem: AsAny + fmt::Debug {
    /// Identifier of this item
    fn id(&self) -> &MetadataId;

    /// Whether the provider could produce a usable value
    fn is_valid(&self) -> bool {
        true
    }

    /// Content fingerprint; `None` means every recomputation counts as a change
    fn fingerprint(&self) -> Option<String> {
        None
    }

    /// Members to weave into the governor, for ITD-producing items
    fn itd_type_details(&self) -> Option<&ItdTypeDetails> {
        None
    }
}

/// Computes metadata items for one metadata class
pub trait MetadataProvider: Send + Sync {
    /// Class identifier of the items this provider produces
    fn provides_type(&self) -> MetadataId;

    /// Compute the item for an instance identifier.
    ///
    /// `Ok(None)` means "not available yet" and is never cached.
    fn get(
        &self,
        service: &MetadataService,
        id: &MetadataId,
    ) -> anyhow::Result<Option<Arc<dyn MetadataItem>>>;

    /// Map an upstream instance to this provider's instance for the same subject.
    ///
    /// Used when a notification arrives at the provider's class identifier.
    fn local_identifier(&self, _upstream: &MetadataId) -> Option<MetadataId> {
        None
    }
}

/// Time spent in one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderTiming {
    /// Metadata class of the provider
    pub provider: String,
    /// Number of `get` calls
    pub invocations: u64,
    /// Total time in microseconds
    pub total_micros: u64,
}

#[derive(Default)]
struct RequestFrame {
    active: Vec<MetadataId>,
    deferred: Vec<MetadataId>,
    draining: bool,
}

// =========================================================================
// Service
// =========================================================================

/// Façade over the cache, the registry and the registered providers
pub struct MetadataService {
    registry: Arc<DependencyRegistry>,
    cache: MetadataCache,
    providers: RwLock<HashMap<MetadataId, Arc<dyn MetadataProvider>>>,
    fingerprints: Mutex<HashMap<MetadataId, String>>,
    requests: Mutex<HashMap<ThreadId, RequestFrame>>,
    timings: Mutex<BTreeMap<String, (u64, Duration)>>,
}

impl MetadataService {
    /// Create a service and subscribe it to the registry's notifications
    #[must_use]
    pub fn new(registry: Arc<DependencyRegistry>, cache: MetadataCache) -> Arc<Self> {
        let service = Arc::new(Self {
            registry: Arc::clone(&registry),
            cache,
            providers: RwLock::new(HashMap::new()),
            fingerprints: Mutex::new(HashMap::new()),
            requests: Mutex::new(HashMap::new()),
            timings: Mutex::new(BTreeMap::new()),
        });
        registry.add_notification_listener(&service, None);
        service
    }

    /// The dependency registry this service notifies through
    #[must_use]
    pub fn registry(&self) -> &Arc<DependencyRegistry> {
        &self.registry
    }

    /// Make a provider visible to class-identifier routing
    pub fn register_provider(&self, provider: Arc<dyn MetadataProvider>) {
        let class_id = provider.provides_type().class_id();
        debug!("Registered metadata provider for {}", class_id);
        self.providers.write().insert(class_id, provider);
    }

    /// Remove the provider for a metadata class
    pub fn deregister_provider(&self, provides_type: &MetadataId) {
        self.providers.write().remove(&provides_type.class_id());
    }

    /// Provider responsible for an identifier's class
    #[must_use]
    pub fn provider(&self, id: &MetadataId) -> Option<Arc<dyn MetadataProvider>> {
        self.providers.read().get(&id.class_id()).cloned()
    }

    /// Cached item, or compute it through the provider
    pub fn get(&self, id: &MetadataId) -> Result<Option<Arc<dyn MetadataItem>>> {
        self.get_with(id, false)
    }

    /// Like [`get`](Self::get), evicting the cached value first when asked
    pub fn get_with(
        &self,
        id: &MetadataId,
        evict_cache: bool,
    ) -> Result<Option<Arc<dyn MetadataItem>>> {
        if !id.is_instance() {
            return Err(Error::NotAnInstance(id.to_string()));
        }
        if evict_cache {
            self.evict(id);
        }
        if let Some(item) = self.cache.get(id) {
            return Ok(Some(item));
        }
        if !self.enter(id) {
            debug!("{} requested while being computed; deferring", id);
            return Ok(None);
        }
        let result = self.compute(id);
        if self.exit(id) {
            self.retry_deferred();
        }
        result
    }

    /// Typed retrieval
    pub fn get_as<T: MetadataItem>(&self, id: &MetadataId) -> Result<Option<Arc<T>>> {
        match self.get(id)? {
            None => Ok(None),
            Some(item) => item
                .into_any()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| Error::UnexpectedItemType { id: id.to_string() }),
        }
    }

    /// Drop the cached value for exactly this identifier
    pub fn evict(&self, id: &MetadataId) {
        if self.cache.evict(id) {
            trace!("Evicted {}", id);
        }
    }

    /// Drop every cached value
    pub fn evict_all(&self) {
        self.cache.evict_all();
        self.fingerprints.lock().clear();
        debug!("Evicted all metadata");
    }

    /// Announce that an upstream item changed outside any provider.
    ///
    /// Evicts it, then notifies its downstreams.
    pub fn publish_change(&self, id: &MetadataId) {
        self.evict(id);
        self.fingerprints.lock().remove(id);
        self.registry.notify_downstream(id);
    }

    /// Cache counters
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Time spent per provider
    #[must_use]
    pub fn timings(&self) -> Vec<ProviderTiming> {
        self.timings
            .lock()
            .iter()
            .map(|(provider, (invocations, total))| ProviderTiming {
                provider: provider.clone(),
                invocations: *invocations,
                total_micros: u64::try_from(total.as_micros()).unwrap_or(u64::MAX),
            })
            .collect()
    }

    fn compute(&self, id: &MetadataId) -> Result<Option<Arc<dyn MetadataItem>>> {
        let provider = self
            .provider(id)
            .ok_or_else(|| Error::NoProvider(id.to_string()))?;

        let started = Instant::now();
        let outcome = provider.get(self, id);
        self.record_timing(id.metadata_class(), started.elapsed());

        match outcome {
            Ok(Some(item)) => {
                self.cache.put(id.clone(), Arc::clone(&item));
                Ok(Some(item))
            }
            Ok(None) => {
                trace!("{} not available", id);
                Ok(None)
            }
            Err(source) => {
                warn!("Failed to compute {}: {:#}", id, source);
                Err(Error::Provider {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    fn record_timing(&self, provider: &str, elapsed: Duration) {
        let mut timings = self.timings.lock();
        let entry = timings.entry(provider.to_string()).or_default();
        entry.0 += 1;
        entry.1 += elapsed;
    }

    /// Evict, recompute, and tell downstreams when the value changed
    fn refresh(&self, upstream: &MetadataId, id: &MetadataId) {
        self.evict(id);
        let item = match self.get(id) {
            Ok(item) => item,
            Err(e) => {
                warn!("Refreshing {} after change to {} failed: {}", id, upstream, e);
                None
            }
        };
        let fingerprint = item.as_ref().and_then(|i| i.fingerprint());
        if self.record_fingerprint(id, fingerprint) {
            self.registry.notify_downstream(id);
        } else {
            trace!("{} unchanged; not notifying downstream", id);
        }
    }

    /// Remember a fingerprint; returns whether dependents must hear about it
    fn record_fingerprint(&self, id: &MetadataId, fingerprint: Option<String>) -> bool {
        let mut fingerprints = self.fingerprints.lock();
        let changed = match (&fingerprint, fingerprints.get(id)) {
            (Some(new), Some(old)) => new != old,
            _ => true,
        };
        match fingerprint {
            Some(fingerprint) => fingerprints.insert(id.clone(), fingerprint),
            // an absent item has nothing to compare against later
            None => fingerprints.remove(id),
        };
        changed
    }

    // ---------------------------------------------------------------------
    // Reentrancy tracking
    // ---------------------------------------------------------------------

    fn enter(&self, id: &MetadataId) -> bool {
        let mut requests = self.requests.lock();
        let frame = requests.entry(thread::current().id()).or_default();
        if frame.active.contains(id) {
            // requests seen while retrying are not deferred again
            if !frame.draining && !frame.deferred.contains(id) {
                frame.deferred.push(id.clone());
            }
            return false;
        }
        frame.active.push(id.clone());
        true
    }

    /// Returns whether the caller should drain deferred requests
    fn exit(&self, id: &MetadataId) -> bool {
        let key = thread::current().id();
        let mut requests = self.requests.lock();
        let Some(frame) = requests.get_mut(&key) else {
            return false;
        };
        if let Some(pos) = frame.active.iter().rposition(|a| a == id) {
            frame.active.remove(pos);
        }
        if !frame.active.is_empty() || frame.draining {
            return false;
        }
        if frame.deferred.is_empty() {
            requests.remove(&key);
            return false;
        }
        frame.draining = true;
        true
    }

    /// Threads with a request in flight
    #[cfg(test)]
    pub(crate) fn pending_requests(&self) -> usize {
        self.requests.lock().len()
    }

    fn retry_deferred(&self) {
        let key = thread::current().id();
        let pending = self
            .requests
            .lock()
            .get_mut(&key)
            .map(|frame| std::mem::take(&mut frame.deferred))
            .unwrap_or_default();
        for id in pending {
            debug!("Retrying deferred request for {}", id);
            if let Err(e) = self.get_with(&id, true) {
                warn!("Deferred request for {} failed: {}", id, e);
            }
        }
        self.requests.lock().remove(&key);
    }
}

impl MetadataNotificationListener for MetadataService {
    fn notify(&self, upstream: &MetadataId, downstream: &MetadataId) {
        if downstream.is_class() {
            let Some(provider) = self.provider(downstream) else {
                debug!("No provider for {}; ignoring notification", downstream);
                return;
            };
            let Some(local) = provider.local_identifier(upstream) else {
                return;
            };
            if self.registry.get_downstream(upstream).contains(&local) {
                // delivered directly as an instance notification
                return;
            }
            self.refresh(upstream, &local);
            return;
        }
        self.refresh(upstream, downstream);
    }
}
