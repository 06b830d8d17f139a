//! # ATTRGATE
//! Typed access to dynamically typed server attribute stores.
//!
//! Streaming-server modules read their preferences, server globals and user
//! profiles out of string-keyed attribute tables owned by the server core.
//! This crate sits on that boundary: it copies values into caller buffers
//! without ever writing past them, treats a wrong-typed or oversized value
//! exactly like a missing one, and writes defaults back so the next read
//! finds them.
//!
//! ## Pieces
//! * [`AttributeStore`] / [`LogSink`]: the seams to the server core.
//! * [`ModuleUtils`]: the defaulting accessors, profile and list helpers.
//! * [`ipcomp::IpComponents`]: component-wise address matching for access lists.
//! * [`store::MemoryObject`]: an in-process store.
//! * [`snapshot`]: framed export/import of a store's attributes.

pub mod error;
pub mod frame;
pub mod ipcomp;
pub mod log;
pub mod snapshot;
pub mod store;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::*;
pub use traits::*;
pub use types::*;
pub use utils::{Fill, FileRead, ModuleUtils, coalesce_vectors, names, read_entire_file};
