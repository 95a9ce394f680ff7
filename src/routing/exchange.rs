//! Exchanges and their binding tables.
//!
//! # Responsibilities
//! - Hold the bindings of one exchange in a mode-specific structure
//! - Validate patterns against the exchange's dispatch mode
//! - Compute the set of queues a routing key is delivered to
//!
//! # Design Decisions
//! - Dispatch mode is fixed at declaration; storage is chosen by it once
//! - Direct: exact pattern → queues hash map, O(1) lookup
//! - Fanout: queue → patterns; the routing key is never inspected
//! - Topic: compiled pattern → queues, scanned per route
//! - Bindings are sets, so duplicate binds never double-deliver

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::routing::error::RoutingError;
use crate::routing::matcher::{has_wildcard, split_key, TopicPattern};

/// Dispatch mode of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Direct,
    Fanout,
    Topic,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            other => Err(format!("unknown exchange kind '{}'", other)),
        }
    }
}

/// A (queue, pattern) pair registered on an exchange.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub queue: String,
    pub pattern: String,
}

impl Binding {
    pub fn new(queue: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct TopicBinding {
    pattern: TopicPattern,
    queues: BTreeSet<String>,
}

#[derive(Debug, Clone)]
enum Bindings {
    /// Exact pattern → bound queues.
    Direct(HashMap<String, BTreeSet<String>>),
    /// Queue → patterns it was bound with.
    Fanout(HashMap<String, BTreeSet<String>>),
    /// Pattern text → compiled pattern and bound queues.
    Topic(HashMap<String, TopicBinding>),
}

/// A named routing context with a single dispatch mode.
#[derive(Debug, Clone)]
pub struct Exchange {
    name: String,
    bindings: Bindings,
}

impl Exchange {
    /// Create an exchange with no bindings.
    pub fn new(name: impl Into<String>, kind: ExchangeKind) -> Self {
        let bindings = match kind {
            ExchangeKind::Direct => Bindings::Direct(HashMap::new()),
            ExchangeKind::Fanout => Bindings::Fanout(HashMap::new()),
            ExchangeKind::Topic => Bindings::Topic(HashMap::new()),
        };
        Self {
            name: name.into(),
            bindings,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ExchangeKind {
        match self.bindings {
            Bindings::Direct(_) => ExchangeKind::Direct,
            Bindings::Fanout(_) => ExchangeKind::Fanout,
            Bindings::Topic(_) => ExchangeKind::Topic,
        }
    }

    /// Check that a pattern is legal for this exchange without binding it.
    pub fn validate_pattern(&self, pattern: &str) -> Result<(), RoutingError> {
        validate_pattern(&self.name, self.kind(), pattern)
    }

    /// Register a binding.
    ///
    /// Returns false if the exact (queue, pattern) pair was already bound.
    pub fn bind(&mut self, queue: &str, pattern: &str) -> Result<bool, RoutingError> {
        self.validate_pattern(pattern)?;

        let inserted = match &mut self.bindings {
            Bindings::Direct(map) => map
                .entry(pattern.to_string())
                .or_default()
                .insert(queue.to_string()),
            Bindings::Fanout(map) => map
                .entry(queue.to_string())
                .or_default()
                .insert(pattern.to_string()),
            Bindings::Topic(map) => {
                if let Some(existing) = map.get_mut(pattern) {
                    existing.queues.insert(queue.to_string())
                } else {
                    let compiled = TopicPattern::parse(pattern)?;
                    map.insert(
                        pattern.to_string(),
                        TopicBinding {
                            pattern: compiled,
                            queues: BTreeSet::from([queue.to_string()]),
                        },
                    );
                    true
                }
            }
        };
        Ok(inserted)
    }

    /// Remove a binding. Returns false if it was not bound.
    pub fn unbind(&mut self, queue: &str, pattern: &str) -> bool {
        match &mut self.bindings {
            Bindings::Direct(map) => remove_from(map, pattern, queue),
            Bindings::Fanout(map) => remove_from(map, queue, pattern),
            Bindings::Topic(map) => {
                let Some(entry) = map.get_mut(pattern) else {
                    return false;
                };
                let removed = entry.queues.remove(queue);
                if entry.queues.is_empty() {
                    map.remove(pattern);
                }
                removed
            }
        }
    }

    /// Remove every binding of a queue. Returns the number removed.
    pub fn unbind_queue(&mut self, queue: &str) -> usize {
        match &mut self.bindings {
            Bindings::Direct(map) => {
                let removed = map
                    .values_mut()
                    .map(|queues| queues.remove(queue))
                    .filter(|removed| *removed)
                    .count();
                map.retain(|_, queues| !queues.is_empty());
                removed
            }
            Bindings::Fanout(map) => map.remove(queue).map_or(0, |patterns| patterns.len()),
            Bindings::Topic(map) => {
                let removed = map
                    .values_mut()
                    .map(|binding| binding.queues.remove(queue))
                    .filter(|removed| *removed)
                    .count();
                map.retain(|_, binding| !binding.queues.is_empty());
                removed
            }
        }
    }

    /// Returns true if the exact (queue, pattern) pair is bound.
    pub fn is_bound(&self, queue: &str, pattern: &str) -> bool {
        match &self.bindings {
            Bindings::Direct(map) => map.get(pattern).is_some_and(|q| q.contains(queue)),
            Bindings::Fanout(map) => map.get(queue).is_some_and(|p| p.contains(pattern)),
            Bindings::Topic(map) => map
                .get(pattern)
                .is_some_and(|binding| binding.queues.contains(queue)),
        }
    }

    /// Returns true if the queue has any binding on this exchange.
    pub fn has_queue(&self, queue: &str) -> bool {
        match &self.bindings {
            Bindings::Direct(map) => map.values().any(|q| q.contains(queue)),
            Bindings::Fanout(map) => map.contains_key(queue),
            Bindings::Topic(map) => map.values().any(|binding| binding.queues.contains(queue)),
        }
    }

    /// Compute the queues a message with this routing key is delivered to.
    pub fn route(&self, routing_key: &str) -> BTreeSet<String> {
        match &self.bindings {
            Bindings::Direct(map) => map.get(routing_key).cloned().unwrap_or_default(),
            Bindings::Fanout(map) => map.keys().cloned().collect(),
            Bindings::Topic(map) => {
                let key = split_key(routing_key);
                map.values()
                    .filter(|binding| binding.pattern.matches_tokens(&key))
                    .flat_map(|binding| binding.queues.iter().cloned())
                    .collect()
            }
        }
    }

    /// All bindings, sorted by queue then pattern.
    pub fn bindings(&self) -> Vec<Binding> {
        let mut all: Vec<Binding> = match &self.bindings {
            Bindings::Direct(map) => map
                .iter()
                .flat_map(|(pattern, queues)| queues.iter().map(move |q| Binding::new(q, pattern)))
                .collect(),
            Bindings::Fanout(map) => map
                .iter()
                .flat_map(|(queue, patterns)| patterns.iter().map(move |p| Binding::new(queue, p)))
                .collect(),
            Bindings::Topic(map) => map
                .iter()
                .flat_map(|(pattern, binding)| {
                    binding.queues.iter().map(move |q| Binding::new(q, pattern))
                })
                .collect(),
        };
        all.sort();
        all
    }

    pub fn binding_count(&self) -> usize {
        match &self.bindings {
            Bindings::Direct(map) | Bindings::Fanout(map) => map.values().map(BTreeSet::len).sum(),
            Bindings::Topic(map) => map.values().map(|binding| binding.queues.len()).sum(),
        }
    }
}

/// Check a pattern against the grammar of a dispatch mode.
pub fn validate_pattern(exchange: &str, kind: ExchangeKind, pattern: &str) -> Result<(), RoutingError> {
    match kind {
        ExchangeKind::Topic => TopicPattern::parse(pattern).map(|_| ()),
        ExchangeKind::Direct | ExchangeKind::Fanout if has_wildcard(pattern) => {
            Err(RoutingError::ExchangeModeMismatch {
                exchange: exchange.to_string(),
                declared: kind,
                requested: ExchangeKind::Topic,
            })
        }
        ExchangeKind::Direct | ExchangeKind::Fanout => Ok(()),
    }
}

fn remove_from(map: &mut HashMap<String, BTreeSet<String>>, key: &str, member: &str) -> bool {
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(member);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}
