//! Runtime half of the field tree: typed per-owner handlers that persist
//! schema fields against a durable store.
//!
//! A compiled schema plus a [`RuntimeEnv`] yields one [`HandlerSet`] per
//! owner. Each [`FieldHandler`] in the set caches its field's decoded
//! value, writes through on the `_durable` mutators, retries transient
//! store failures under an injectable [`RetryPolicy`], and notifies
//! subscribers when the field's encoded representation changes.
//!
//! ```
//! use std::rc::Rc;
//! use fieldtree_compiler::{SchemaDocument, compile};
//! use fieldtree_core::{StaticEnumItems, Value};
//! use fieldtree_runtime::{
//!     HandlerSet, MemoryStore, OwnerId, RetryPolicy, RuntimeEnv, TransportCodec,
//! };
//!
//! let document = SchemaDocument::from_yaml("tree:\n  coins::Integer: 100\n").unwrap();
//! let compiled = compile(&document).unwrap();
//!
//! let store = Rc::new(MemoryStore::new());
//! let env = RuntimeEnv {
//!     store: Rc::clone(&store) as Rc<dyn fieldtree_runtime::KeyValueStore>,
//!     ordered: Some(store as Rc<dyn fieldtree_runtime::OrderedIndex>),
//!     retry: RetryPolicy::TESTING,
//!     transport: TransportCodec::passthrough(),
//! };
//! let mut set = HandlerSet::build(&compiled, &StaticEnumItems::new(), OwnerId(1), &env).unwrap();
//!
//! let coins = set.handler_mut("coins").unwrap();
//! assert_eq!(coins.cached(), Some(&Value::Number(100.0)));
//! assert_eq!(coins.increment(5.0), Some(105.0));
//! set.destroy_all();
//! ```

mod handler;
mod owner;
mod retry;
mod signal;
mod store;

pub use fieldtree_codec::TransportCodec;
pub use handler::{FetchStatus, FieldHandler, HandlerConfig, HandlerState};
pub use owner::{HandlerSet, OwnerId, OwnerRegistry, RuntimeEnv};
pub use retry::RetryPolicy;
pub use signal::{Signal, SubscriptionId};
pub use store::{
    KeyValueStore, MemoryStore, Metadata, OrderedIndex, PAGE_LENGTH, Page, SortedEntry, StoreError,
};
