//! Per-owner handler sets and the explicit owner registry.
//!
//! Handlers are never shared across owners. A [`HandlerSet`] holds every
//! field handler for one owner, built from a compiled schema; the
//! [`OwnerRegistry`] maps owner ids to their sets and is itself a plain
//! value owned by the surrounding session container. There is no
//! process-wide state.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use fieldtree_codec::{CodecSet, TransportCodec, encodes_structurally};
use fieldtree_compiler::CompiledSchema;
use fieldtree_core::{ConfigError, EnumItemsSource};

use crate::handler::{FieldHandler, HandlerConfig};
use crate::retry::RetryPolicy;
use crate::store::{KeyValueStore, Metadata, OrderedIndex};

/// Identifies one owner (a session, connection, or player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u64);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared runtime services handlers are built against.
#[derive(Clone)]
pub struct RuntimeEnv {
    pub store: Rc<dyn KeyValueStore>,
    pub ordered: Option<Rc<dyn OrderedIndex>>,
    pub retry: RetryPolicy,
    pub transport: TransportCodec,
}

impl std::fmt::Debug for RuntimeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnv")
            .field("retry", &self.retry)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Every field handler for one owner, keyed by joined field path.
#[derive(Debug)]
pub struct HandlerSet {
    owner: OwnerId,
    handlers: IndexMap<String, FieldHandler>,
}

impl HandlerSet {
    /// Builds and loads one handler per compiled field.
    ///
    /// Synthesizes the codec set once, then constructs each handler with
    /// its composed codec and performs the initial fetch. The document's
    /// metadata is attached to every durable write.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] raised while synthesizing codecs, typically a
    /// missing platform enumeration.
    pub fn build(
        compiled: &CompiledSchema,
        enums: &dyn EnumItemsSource,
        owner: OwnerId,
        env: &RuntimeEnv,
    ) -> Result<Self, ConfigError> {
        let codecs = CodecSet::synthesize(&compiled.registry, enums)?;
        let metadata: Metadata = compiled.metadata.clone();

        let mut handlers = IndexMap::with_capacity(compiled.fields.len());
        for field in &compiled.fields {
            let codec = codecs.codec_for(&field.ty, enums)?;
            let ordered = field
                .is_numeric()
                .then(|| env.ordered.clone())
                .flatten();
            let mut handler = FieldHandler::new(HandlerConfig {
                scope: field.joined_path(),
                key: owner.to_string(),
                codec,
                structural: encodes_structurally(&field.ty, &compiled.registry),
                transport: env.transport,
                store: Rc::clone(&env.store),
                ordered,
                retry: env.retry,
                metadata: metadata.clone(),
                default: field.default.clone(),
            });
            handler.load();
            handlers.insert(field.joined_path(), handler);
        }
        debug!(%owner, fields = handlers.len(), "handler set built");
        Ok(Self { owner, handlers })
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn handler(&self, path: &str) -> Option<&FieldHandler> {
        self.handlers.get(path)
    }

    pub fn handler_mut(&mut self, path: &str) -> Option<&mut FieldHandler> {
        self.handlers.get_mut(path)
    }

    /// Joined field paths, in schema walk order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Destroys every handler. Safe to call more than once.
    pub fn destroy_all(&mut self) {
        for handler in self.handlers.values_mut() {
            handler.destroy();
        }
    }
}

/// Maps owner ids to their handler sets.
///
/// Owned by the session container; attach on connect, detach on disconnect.
#[derive(Debug, Default)]
pub struct OwnerRegistry {
    sets: IndexMap<OwnerId, HandlerSet>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owner's handler set. Re-attaching an owner destroys the
    /// previously registered set first.
    pub fn attach(&mut self, set: HandlerSet) {
        if let Some(mut previous) = self.sets.shift_remove(&set.owner()) {
            debug!(owner = %set.owner(), "replacing existing handler set");
            previous.destroy_all();
        }
        self.sets.insert(set.owner(), set);
    }

    pub fn get(&self, owner: OwnerId) -> Option<&HandlerSet> {
        self.sets.get(&owner)
    }

    pub fn get_mut(&mut self, owner: OwnerId) -> Option<&mut HandlerSet> {
        self.sets.get_mut(&owner)
    }

    /// Removes an owner's set, destroying every handler in it. Returns
    /// `false` when the owner was not attached.
    pub fn detach(&mut self, owner: OwnerId) -> bool {
        match self.sets.shift_remove(&owner) {
            Some(mut set) => {
                set.destroy_all();
                debug!(%owner, "handler set detached");
                true
            }
            None => false,
        }
    }

    pub fn owners(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.sets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
