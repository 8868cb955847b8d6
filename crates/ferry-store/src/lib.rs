//! Keyed store for per-path bookkeeping during a tree scan.
//!
//! A tree mover visits millions of paths and needs to remember small facts
//! about some of them (byte counts, resume offsets, retry counters, dedup
//! markers) without a relational structure. [`KeyedStore`] is a chained
//! hash table over string keys, generic over its payload:
//!
//! ```
//! use ferry_store::OffsetStore;
//!
//! let mut offsets = OffsetStore::new(64).unwrap();
//! offsets.insert("/scratch/run1/out.dat", 4096).unwrap();
//! offsets.update("/scratch/run1/out.dat", 8192).unwrap();
//! assert_eq!(offsets.get("/scratch/run1/out.dat"), Some(&8192));
//! ```
//!
//! ## Design Decisions
//!
//! - **One container, many payloads**: offsets, accumulators and owned
//!   records are instantiations of the same type ([`OffsetStore`],
//!   [`AccumulatorStore`], [`HandleStore`]).
//! - **Explicit resize**: the bucket count never changes behind the
//!   caller's back. Call [`KeyedStore::resize`] when [`KeyedStore::stats`]
//!   says chains are getting long.
//! - **Not synchronized**: a table belongs to one worker. Share it across
//!   threads only behind a caller-provided lock.

mod error;
mod hash;
mod table;

pub use error::{StoreError, StoreResult};
pub use hash::{additive_hash, fnv1a_hash, HashFn};
pub use table::{AccumulatorStore, HandleStore, Iter, KeyedStore, OffsetStore, StoreStats};
