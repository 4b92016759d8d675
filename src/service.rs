// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared, task-safe access to a [`Registry`].
//!
//! The registry is a single-writer structure. [`RegistryService`] wraps it in a
//! `tokio::sync::RwLock`: queries share the read lock, while every mutation holds the
//! write lock for its whole validate-then-apply cycle, so a mutation either commits
//! in full or fails in full without interleaving with another writer.
//!
//! # Example
//!
//! ```rust,no_run
//! use zonereg::config::RegistryConfig;
//! use zonereg::model::NewHost;
//! use zonereg::registry::Registry;
//! use zonereg::service::RegistryService;
//!
//! # async fn example() -> zonereg::registry_errors::Result<()> {
//! let service = RegistryService::new(Registry::new(RegistryConfig::default()));
//! let host = service
//!     .mutate("create_host", |registry| {
//!         registry.create_host(NewHost {
//!             name: "www.example.org".to_string(),
//!             ..Default::default()
//!         })
//!     })
//!     .await?;
//! let found = service.query(|registry| registry.host(host.id).cloned()).await;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics;
use crate::model::RegistryState;
use crate::registry::{Registry, ZoneContents};
use crate::registry_errors::{RegistryError, Result};

/// Cloneable handle to a shared registry.
#[derive(Clone, Debug)]
pub struct RegistryService {
    inner: Arc<RwLock<Registry>>,
}

impl RegistryService {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Runs a mutation under the write lock.
    ///
    /// The operation is timed and counted in the operation metrics. Rejections are
    /// logged at `warn` with their reason code.
    ///
    /// # Arguments
    ///
    /// * `operation` - Metric label for the operation, e.g. `create_host`
    /// * `apply` - Closure performing the mutation
    ///
    /// # Errors
    ///
    /// Returns whatever error `apply` returns; the registry is unchanged in that case.
    pub async fn mutate<T, F>(&self, operation: &'static str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Registry) -> Result<T>,
    {
        let mut registry = self.inner.write().await;
        let started = Instant::now();
        let result = apply(&mut registry);
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => {
                metrics::record_operation_success(operation, elapsed);
                debug!(operation, elapsed_ms = elapsed.as_millis(), "operation succeeded");
            }
            Err(err) => {
                metrics::record_operation_error(operation, err.kind().as_str(), elapsed);
                warn!(
                    operation,
                    reason = err.status_reason(),
                    error = %err,
                    "operation rejected"
                );
            }
        }
        result
    }

    /// Runs a read-only closure under the shared read lock.
    pub async fn query<T, F>(&self, read: F) -> T
    where
        F: FnOnce(&Registry) -> T,
    {
        let registry = self.inner.read().await;
        read(&registry)
    }

    /// Copy of the stored state, suitable for persisting.
    pub async fn snapshot(&self) -> RegistryState {
        self.query(|registry| registry.state().clone()).await
    }

    /// Publishes every dirty zone.
    ///
    /// Zones are published independently: a serial overflow on one zone leaves that
    /// zone dirty and does not prevent the others from being published.
    pub async fn publish_dirty(&self) -> Vec<(String, Result<ZoneContents>)> {
        let dirty: Vec<String> = self
            .query(|registry| {
                registry
                    .zones()
                    .filter(|zone| zone.updated)
                    .map(|zone| zone.name.clone())
                    .collect()
            })
            .await;

        let mut results = Vec::with_capacity(dirty.len());
        for name in dirty {
            let result = self
                .mutate("publish_zone", |registry| registry.publish_zone(&name))
                .await;
            results.push((name, result));
        }
        results
    }

    /// Consumes the handle and returns the registry if no other clone is alive.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` while other handles still share the registry.
    pub fn into_inner(self) -> Result<Registry> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|shared| {
                RegistryError::forbidden(
                    "RegistryService",
                    "registry",
                    format!(
                        "registry is still shared by {} handle(s)",
                        Arc::strong_count(&shared) - 1
                    ),
                )
            })
    }
}
