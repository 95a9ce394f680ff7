//! Routing table and dispatch.
//!
//! # Responsibilities
//! - Own the table of declared exchanges
//! - Apply declare/bind/unbind mutations
//! - Resolve a routing key to the set of bound queues
//!
//! # Design Decisions
//! - Copy-on-write: readers load an `Arc<RoutingTable>` snapshot without locking
//! - Writers serialize on a mutex, mutate a clone, then publish it atomically
//! - Exchanges are `Arc`-shared between snapshots; only the touched one is cloned
//! - A failed mutation publishes nothing
//! - Explicit declaration: nothing is auto-created by bind/unbind

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::config::TopologyConfig;
use crate::message::Message;
use crate::observability::metrics;
use crate::routing::error::RoutingError;
use crate::routing::exchange::{Binding, Exchange, ExchangeKind};

/// An immutable snapshot of every declared exchange.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    exchanges: HashMap<String, Arc<Exchange>>,
}

/// Serializable view of one exchange, for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeSummary {
    pub name: String,
    pub kind: ExchangeKind,
    pub bindings: Vec<Binding>,
}

impl RoutingTable {
    /// Build a table from a topology, declaring exchanges before bindings.
    pub fn from_config(config: &TopologyConfig) -> Result<Self, RoutingError> {
        let mut table = Self::default();
        for exchange in &config.exchanges {
            table.declare(&exchange.name, exchange.kind)?;
        }
        for binding in &config.bindings {
            table.bind(&binding.exchange, &binding.queue, &binding.pattern)?;
        }
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&Exchange> {
        self.exchanges.get(name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exchanges.contains_key(name)
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn binding_count(&self) -> usize {
        self.exchanges.values().map(|ex| ex.binding_count()).sum()
    }

    /// All exchanges with their bindings, sorted by name.
    pub fn summaries(&self) -> Vec<ExchangeSummary> {
        let mut out: Vec<ExchangeSummary> = self
            .exchanges
            .values()
            .map(|ex| ExchangeSummary {
                name: ex.name().to_string(),
                kind: ex.kind(),
                bindings: ex.bindings(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Returns true if the exchange was newly declared.
    fn declare(&mut self, name: &str, kind: ExchangeKind) -> Result<bool, RoutingError> {
        if let Some(existing) = self.exchanges.get(name) {
            if existing.kind() != kind {
                return Err(RoutingError::ExchangeModeMismatch {
                    exchange: name.to_string(),
                    declared: existing.kind(),
                    requested: kind,
                });
            }
            return Ok(false);
        }
        self.exchanges
            .insert(name.to_string(), Arc::new(Exchange::new(name, kind)));
        Ok(true)
    }

    fn exchange_mut(&mut self, name: &str) -> Result<&mut Exchange, RoutingError> {
        self.exchanges
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| RoutingError::unknown_exchange(name))
    }

    fn bind(&mut self, exchange: &str, queue: &str, pattern: &str) -> Result<bool, RoutingError> {
        // Validate before make_mut so a rejected pattern never clones the exchange.
        self.get(exchange)
            .ok_or_else(|| RoutingError::unknown_exchange(exchange))?
            .validate_pattern(pattern)?;
        self.exchange_mut(exchange)?.bind(queue, pattern)
    }
}

/// Thread-safe exchange router.
///
/// Cheap to share behind an `Arc`; `route` never blocks on writers.
#[derive(Debug, Default)]
pub struct Router {
    table: ArcSwap<RoutingTable>,
    write_lock: Mutex<()>,
}

impl Router {
    /// Create a router with no exchanges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router from a topology.
    pub fn from_config(config: &TopologyConfig) -> Result<Self, RoutingError> {
        let table = RoutingTable::from_config(config)?;
        metrics::record_table_size(table.exchange_count(), table.binding_count());
        Ok(Self {
            table: ArcSwap::from_pointee(table),
            write_lock: Mutex::new(()),
        })
    }

    /// Current routing table snapshot.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.table.load_full()
    }

    /// Declare an exchange.
    ///
    /// Re-declaring with the same kind is a no-op; a different kind is an error.
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), RoutingError> {
        let created = self.update(|table| table.declare(name, kind))?;
        if created {
            tracing::info!(exchange = %name, kind = %kind, "Exchange declared");
        }
        Ok(())
    }

    /// Delete an exchange and all of its bindings.
    ///
    /// Returns false if it did not exist.
    pub fn delete_exchange(&self, name: &str) -> bool {
        let removed = self.update(|table| Ok::<_, RoutingError>(table.exchanges.remove(name)));
        match removed {
            Ok(Some(exchange)) => {
                tracing::info!(
                    exchange = %name,
                    bindings = exchange.binding_count(),
                    "Exchange deleted"
                );
                true
            }
            _ => false,
        }
    }

    /// Bind a queue to an exchange with a pattern.
    ///
    /// Binding an identical (queue, pattern) pair twice keeps one binding.
    pub fn bind(&self, exchange: &str, queue: &str, pattern: &str) -> Result<(), RoutingError> {
        let inserted = self.update(|table| table.bind(exchange, queue, pattern))?;
        if inserted {
            metrics::record_binding_change("bind");
            tracing::debug!(exchange = %exchange, queue = %queue, pattern = %pattern, "Queue bound");
        } else {
            tracing::debug!(exchange = %exchange, queue = %queue, pattern = %pattern, "Binding already present");
        }
        Ok(())
    }

    /// Remove a binding. Absent bindings are a no-op.
    pub fn unbind(&self, exchange: &str, queue: &str, pattern: &str) -> Result<(), RoutingError> {
        let removed = self.update(|table| {
            if !table.contains(exchange) {
                return Err(RoutingError::unknown_exchange(exchange));
            }
            let bound = table
                .get(exchange)
                .is_some_and(|ex| ex.is_bound(queue, pattern));
            if !bound {
                return Ok(false);
            }
            Ok(table.exchange_mut(exchange)?.unbind(queue, pattern))
        })?;

        if removed {
            metrics::record_binding_change("unbind");
            tracing::debug!(exchange = %exchange, queue = %queue, pattern = %pattern, "Queue unbound");
        }
        Ok(())
    }

    /// Remove every binding of a queue on every exchange.
    ///
    /// Used when a queue goes away with its consumer. Returns the number removed.
    pub fn unbind_queue(&self, queue: &str) -> usize {
        let removed = self
            .update(|table| {
                let names: Vec<String> = table
                    .exchanges
                    .iter()
                    .filter(|(_, ex)| ex.has_queue(queue))
                    .map(|(name, _)| name.clone())
                    .collect();
                let mut removed = 0;
                for name in names {
                    removed += table.exchange_mut(&name)?.unbind_queue(queue);
                }
                Ok::<_, RoutingError>(removed)
            })
            .unwrap_or(0);

        if removed > 0 {
            metrics::record_binding_change("unbind_queue");
            tracing::debug!(queue = %queue, removed, "Queue bindings removed");
        }
        removed
    }

    /// Resolve the queues a routing key is delivered to.
    ///
    /// An empty set means the message is dropped; it is not an error.
    pub fn route(&self, exchange: &str, routing_key: &str) -> Result<BTreeSet<String>, RoutingError> {
        let table = self.table.load();
        let Some(ex) = table.get(exchange) else {
            tracing::warn!(exchange = %exchange, "Route to undeclared exchange");
            return Err(RoutingError::unknown_exchange(exchange));
        };

        let queues = ex.route(routing_key);
        metrics::record_route(ex.name(), ex.kind(), queues.len());
        if queues.is_empty() {
            tracing::debug!(exchange = %exchange, routing_key = %routing_key, "No matching bindings, message dropped");
        }
        Ok(queues)
    }

    /// Route a message by its routing key.
    pub fn route_message(&self, exchange: &str, message: &Message) -> Result<BTreeSet<String>, RoutingError> {
        self.route(exchange, &message.routing_key)
    }

    /// Replace the whole table with one built from a topology.
    ///
    /// On error the current table stays in place.
    pub fn apply_config(&self, config: &TopologyConfig) -> Result<(), RoutingError> {
        let table = RoutingTable::from_config(config)?;
        let (exchanges, bindings) = (table.exchange_count(), table.binding_count());

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.table.store(Arc::new(table));
        metrics::record_table_size(exchanges, bindings);

        tracing::info!(exchanges, bindings, "Routing table replaced");
        Ok(())
    }

    fn update<T, E>(&self, mutate: impl FnOnce(&mut RoutingTable) -> Result<T, E>) -> Result<T, E> {
        // Table is only published after a successful mutation, so a poisoned lock holds no partial state.
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = RoutingTable::clone(&self.table.load());
        let out = mutate(&mut next)?;
        metrics::record_table_size(next.exchange_count(), next.binding_count());
        self.table.store(Arc::new(next));
        Ok(out)
    }
}
