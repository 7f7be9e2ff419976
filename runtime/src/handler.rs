//! Per-field persistence handlers.
//!
//! One [`FieldHandler`] exists per (owner, field-path) pair and owns that
//! field's decoded cache, its encoded counterpart, and its change signal.
//! Handlers are local-first: plain mutators touch only the cache, the
//! `_durable` variants additionally write through to the store under the
//! handler's retry policy, and [`FieldHandler::destroy`] flushes whatever
//! the cache holds.
//!
//! Remote failures never propagate as faults. Fetches report a
//! [`FetchStatus`], writes report a boolean, and the prior cache is always
//! preserved across a failed operation.

use std::rc::Rc;

use serde_json::{Value as Json, json};
use tracing::{debug, warn};

use fieldtree_codec::{Codec, TransportCodec};
use fieldtree_core::Value;

use crate::retry::RetryPolicy;
use crate::signal::Signal;
use crate::store::{KeyValueStore, Metadata, OrderedIndex, PAGE_LENGTH, SortedEntry};

/// Lifecycle state of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Constructed, initial fetch not yet performed.
    Uninitialized,
    /// Serving reads and writes.
    Loaded,
    /// Terminal; the flush has run and all subscriptions are released.
    Destroyed,
}

/// Outcome of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Served from the decoded cache without touching the store.
    Cached,
    /// A remote fetch succeeded.
    Fetched,
    /// Every attempt failed; the returned value is the prior cache.
    RetriesExhausted,
    /// The fetch succeeded but the payload would not decode; the returned
    /// value is the prior cache.
    DecodeFailed,
}

impl FetchStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Cached | Self::Fetched)
    }
}

/// Everything a handler needs at construction.
///
/// `scope` addresses the field in the store (the joined field path) and
/// `key` addresses the owner within that scope. `structural` states whether
/// the field's type encodes to an object or array, which the transport
/// needs when unframing reads.
pub struct HandlerConfig {
    pub scope: String,
    pub key: String,
    pub codec: Codec,
    pub structural: bool,
    pub transport: TransportCodec,
    pub store: Rc<dyn KeyValueStore>,
    pub ordered: Option<Rc<dyn OrderedIndex>>,
    pub retry: RetryPolicy,
    pub metadata: Metadata,
    pub default: Option<Value>,
}

/// A typed accessor for one persisted field of one owner.
pub struct FieldHandler {
    scope: String,
    key: String,
    codec: Codec,
    structural: bool,
    transport: TransportCodec,
    store: Rc<dyn KeyValueStore>,
    ordered: Option<Rc<dyn OrderedIndex>>,
    retry: RetryPolicy,
    metadata: Metadata,
    cached: Option<Value>,
    encoded: Option<Json>,
    on_changed: Signal<Value>,
    state: HandlerState,
}

impl FieldHandler {
    /// Builds a handler, seeding the cache from the field's default.
    pub fn new(config: HandlerConfig) -> Self {
        let mut handler = Self {
            scope: config.scope,
            key: config.key,
            codec: config.codec,
            structural: config.structural,
            transport: config.transport,
            store: config.store,
            ordered: config.ordered,
            retry: config.retry,
            metadata: config.metadata,
            cached: None,
            encoded: None,
            on_changed: Signal::new(),
            state: HandlerState::Uninitialized,
        };
        if let Some(default) = config.default {
            match handler.codec.encode(&default) {
                Ok(encoded) => {
                    handler.cached = Some(default);
                    handler.encoded = Some(encoded);
                }
                Err(error) => {
                    warn!(scope = %handler.scope, %error, "default value does not encode");
                }
            }
        }
        handler
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// The decoded cache, without touching the store.
    pub fn cached(&self) -> Option<&Value> {
        self.cached.as_ref()
    }

    /// Fires with the new decoded value whenever the field's encoded
    /// representation changes.
    pub fn on_changed(&self) -> &Signal<Value> {
        &self.on_changed
    }

    /// Performs the initial forced fetch and marks the handler loaded.
    pub fn load(&mut self) -> FetchStatus {
        let (_, status) = self.get(true);
        if self.state == HandlerState::Uninitialized {
            self.state = HandlerState::Loaded;
        }
        status
    }

    /// Reads the field.
    ///
    /// With `force` false and a populated cache, returns the cache without
    /// touching the store. Otherwise fetches under the retry policy; on
    /// exhaustion or a decode failure, the prior cache is returned with the
    /// corresponding status.
    pub fn get(&mut self, force: bool) -> (Option<Value>, FetchStatus) {
        if !force && self.cached.is_some() {
            return (self.cached.clone(), FetchStatus::Cached);
        }
        let fetched = self.retry.run("get", || {
            self.store.get(&self.scope, &self.key)
        });
        let payload = match fetched {
            Ok(Some(payload)) => payload,
            Ok(None) => return (self.cached.clone(), FetchStatus::Fetched),
            Err(_) => return (self.cached.clone(), FetchStatus::RetriesExhausted),
        };
        let decoded = self
            .transport
            .decode(&payload, self.structural)
            .and_then(|unframed| self.codec.decode(&unframed).map(|value| (value, unframed)));
        match decoded {
            Ok((value, unframed)) => {
                self.commit(value, unframed);
                (self.cached.clone(), FetchStatus::Fetched)
            }
            Err(error) => {
                warn!(scope = %self.scope, key = %self.key, %error, "stored payload does not decode");
                (self.cached.clone(), FetchStatus::DecodeFailed)
            }
        }
    }

    /// Cache-only write. Returns `false` only when the value does not
    /// encode against the field's type; the cache is left untouched then.
    pub fn set(&mut self, value: Value) -> bool {
        match self.codec.encode(&value) {
            Ok(encoded) => {
                self.commit(value, encoded);
                true
            }
            Err(error) => {
                warn!(scope = %self.scope, %error, "value does not encode");
                false
            }
        }
    }

    /// Write-through variant of [`set`](Self::set): updates the cache, then
    /// writes to the store under the retry policy. Returns the write's
    /// success; the cache update happens regardless.
    pub fn set_durable(&mut self, value: Value) -> bool {
        if !self.set(value) {
            return false;
        }
        self.flush()
    }

    /// Applies `transform` once to the cached value, cache-only.
    pub fn update(&mut self, transform: impl FnOnce(Option<Value>) -> Value) -> Option<Value> {
        let next = transform(self.cached.clone());
        if self.set(next) { self.cached.clone() } else { None }
    }

    /// Write-through transform via the store's compare-and-swap primitive.
    ///
    /// `transform` must be pure: the store may invoke it several times
    /// against different base payloads before one lands. Returns the new
    /// cached value and the write's success.
    pub fn update_durable(
        &mut self,
        transform: impl Fn(Option<Value>) -> Value,
    ) -> (Option<Value>, bool) {
        let codec = self.codec.clone();
        let transport = self.transport;
        let structural = self.structural;
        let scope = self.scope.clone();
        let mut apply = |current: Option<Json>| -> Json {
            let decoded = current
                .as_ref()
                .and_then(|payload| transport.decode(payload, structural).ok())
                .and_then(|unframed| codec.decode(&unframed).ok());
            let next = transform(decoded);
            match codec.encode(&next) {
                Ok(encoded) => transport.encode(&encoded),
                Err(error) => {
                    warn!(scope = %scope, %error, "transformed value does not encode, keeping stored payload");
                    current.unwrap_or(Json::Null)
                }
            }
        };
        let store = Rc::clone(&self.store);
        let written = self.retry.run("update", || {
            store.update(&self.scope, &self.key, &mut apply)
        });
        match written {
            Ok(payload) => {
                let decoded = self
                    .transport
                    .decode(&payload, self.structural)
                    .and_then(|unframed| {
                        self.codec.decode(&unframed).map(|value| (value, unframed))
                    });
                match decoded {
                    Ok((value, unframed)) => {
                        self.commit(value, unframed);
                        (self.cached.clone(), true)
                    }
                    Err(error) => {
                        warn!(scope = %self.scope, %error, "written payload does not decode");
                        (self.cached.clone(), false)
                    }
                }
            }
            Err(_) => (self.cached.clone(), false),
        }
    }

    /// Adds `delta` to the cached numeric value, cache-only. An empty cache
    /// counts from zero. Numeric fields only.
    pub fn increment(&mut self, delta: f64) -> Option<f64> {
        let base = self.cached.as_ref().and_then(Value::as_number).unwrap_or(0.0);
        let next = base + delta;
        if self.set(Value::Number(next)) { Some(next) } else { None }
    }

    /// Write-through increment via the store's atomic-add primitive.
    /// Returns the new total and the write's success.
    pub fn increment_durable(&mut self, delta: f64) -> (Option<f64>, bool) {
        let store = Rc::clone(&self.store);
        let total = self.retry.run("increment", || {
            store.increment(&self.scope, &self.key, delta, &self.metadata)
        });
        match total {
            Ok(total) => {
                self.commit(Value::Number(total), json!(total));
                (Some(total), true)
            }
            Err(_) => (self.cached.as_ref().and_then(Value::as_number), false),
        }
    }

    /// Walks the ordered index page by page, accumulating up to `limit`
    /// entries. Each page fetch runs under the retry policy; a failed page
    /// returns what was accumulated so far with success `false`.
    ///
    /// Ordered-numeric fields only; handlers without an index return an
    /// empty listing with success `false`.
    pub fn get_sorted_list(&self, limit: usize, ascending: bool) -> (Vec<SortedEntry>, bool) {
        let Some(ordered) = &self.ordered else {
            warn!(scope = %self.scope, "field has no ordered index");
            return (Vec::new(), false);
        };
        let mut entries = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.retry.run("page", || {
                ordered.page(&self.scope, ascending, PAGE_LENGTH, cursor)
            });
            let page = match page {
                Ok(page) => page,
                Err(_) => return (entries, false),
            };
            for entry in page.entries {
                if entries.len() == limit {
                    return (entries, true);
                }
                entries.push(entry);
            }
            match page.next {
                Some(next) if entries.len() < limit => cursor = Some(next),
                _ => return (entries, true),
            }
        }
    }

    /// Flushes the cache, releases every subscription, and transitions to
    /// [`HandlerState::Destroyed`]. Safe to call more than once; only the
    /// first call flushes. Returns the flush write's success.
    pub fn destroy(&mut self) -> bool {
        if self.state == HandlerState::Destroyed {
            return true;
        }
        let flushed = self.flush();
        self.on_changed.clear();
        self.cached = None;
        self.encoded = None;
        self.state = HandlerState::Destroyed;
        debug!(scope = %self.scope, key = %self.key, "handler destroyed");
        flushed
    }

    /// Writes the current encoded payload to the store. An empty cache
    /// flushes nothing and succeeds.
    fn flush(&mut self) -> bool {
        let Some(encoded) = &self.encoded else {
            return true;
        };
        let framed = self.transport.encode(encoded);
        let store = Rc::clone(&self.store);
        let result = self.retry.run("set", || {
            store.set(&self.scope, &self.key, &framed, &self.metadata)
        });
        result.is_ok()
    }

    /// Installs a new cache pair, firing the change signal iff the encoded
    /// representation differs from the previous one.
    fn commit(&mut self, value: Value, encoded: Json) {
        let changed = self.encoded.as_ref() != Some(&encoded);
        self.cached = Some(value);
        self.encoded = Some(encoded);
        if changed {
            if let Some(value) = &self.cached {
                self.on_changed.fire(value);
            }
        }
    }
}

impl std::fmt::Debug for FieldHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldHandler")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .field("state", &self.state)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}
