//! Attrarium – a polymorphic, persistable attribute value store.
//!
//! Attrarium centers on the *attribute* concept: a typed value that exists
//! in two forms at once, where:
//! * An [`kind::AttrKind`] is one of a closed set of eleven kinds (scalars,
//!   ordered lists and string-keyed maps).
//! * An [`attribute::AttrValue`] is the detached value form: an in-memory
//!   tree with no identity, cheap to build and discard.
//! * A [`attribute::StoredAttr`] is the stored form: a handle onto a SQLite
//!   row carrying a numeric identity, an optimistic-locking version counter
//!   and an optional opaque ACL reference.
//! * An [`attribute::Attribute`] holds either form; conversion to the form
//!   it already has returns it unchanged.
//!
//! The [`store::AttrStore`] owns the persistence layer, the identity
//! generator and a session cache, and is the only way stored attributes come
//! into being, so constructing an object never has an I/O side effect.
//!
//! ## Modules
//! * [`kind`] – The closed kind set with stable codes and names.
//! * [`attribute`] – Value form, stored handles, entry wrappers, identities.
//! * [`store`] – Recursive create/materialize/duplicate/delete, the
//!   [`store::StoredList`]/[`store::StoredMap`] container views, predicate
//!   find, session-cache eviction.
//! * [`query`] – The [`query::AttrQuery`] predicate algebra over map keys.
//! * [`registry`] – Attribute trees bound under 1–3 component key tuples.
//! * [`persist`] – SQLite schema and row-level operations.
//! * [`config`] – Layered configuration and tracing setup.
//!
//! ## Lists and maps
//! List entries are keyed by (list identity, index); indices stay contiguous
//! and gap-free, so inserts and removes renumber the tail — downwards from
//! the high end on insert, upwards from the low end on remove, keeping the
//! entry keys collision-free at every step. Map entries are keyed by (map
//! identity, string key); re-binding a key first deletes the attribute that
//! held it.
//!
//! ## Quick Start
//! ```
//! use attrarium::attribute::AttrValue;
//! use attrarium::store::AttrStore;
//! let store = AttrStore::in_memory().unwrap();
//! let mut settings = AttrValue::map();
//! settings.put("retries", AttrValue::Int(3)).unwrap();
//! settings.put("label", AttrValue::Text("primary".to_owned())).unwrap();
//! let stored = store.create(&settings).unwrap();
//! assert_eq!(store.materialize(&stored).unwrap(), settings);
//! ```
//!
//! ## Errors
//! Every failure is an [`error::AttrError`], surfaced immediately and scoped
//! to the single operation in progress: calling an accessor a kind does not
//! support, handing a stale version to save, or colliding with a bound
//! registry key are all distinguishable variants.

pub mod attribute;
pub mod config;
pub mod error;
pub mod kind;
pub mod persist;
pub mod query;
pub mod registry;
pub mod store;
