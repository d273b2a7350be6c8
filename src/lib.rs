//! probekv: an integer-keyed key-value store backed by a single
//! open-addressed hash table, with flat binary snapshots.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the probing data structure, the store API and the wire
//!   codec in separate layers so each can be reasoned about (and tested)
//!   independently.
//! - Layers:
//!   - ProbeTable: the core engine. FNV-1a hashing, linear probing with
//!     wraparound, tombstone deletion, and copy-and-swap resizing under a
//!     0.75 load threshold.
//!   - KvStore: the public API; owns exactly one table plus the path of
//!     the last successful save/load (informational only).
//!   - snapshot: fixed-header, length-prefixed-record binary files;
//!     loading feeds records back through the normal insertion path.
//!   - cli: a line-oriented shell over one store; pure parsing, separate
//!     from execution.
//!
//! Constraints
//! - Single-threaded: one table is never shared across threads; `&mut`
//!   receivers are the only synchronization. Distinct stores are fully
//!   independent.
//! - Keys are `i32`, with `i32::MIN` reserved as the tombstone marker;
//!   storing it is rejected as a usage error.
//! - Every fallible operation returns `Result<_, StoreError>`; failure
//!   paths leave the table's invariants intact.
//! - No suspension points and no I/O anywhere in the hash/probe/resize
//!   path; file I/O lives entirely in the snapshot layer.
//!
//! Probing invariants
//! - A deleted slot keeps its `occupied` flag and takes the reserved key,
//!   so probe chains running through it stay connected; only a
//!   never-written slot terminates a walk.
//! - Resize rebuilds the table at twice the capacity, re-inserting live
//!   entries against the new modulus; it is the only point where
//!   tombstones are reclaimed, and it either completes fully or leaves
//!   the original table untouched.
//!
//! Notes and non-goals
//! - No concurrent access to one table, no range queries, no secondary
//!   indexes, no key types other than `i32`.
//! - Iteration is a snapshot-style forward cursor; the borrow it holds
//!   makes mutation during iteration a compile error rather than a
//!   runtime hazard.

pub mod cli;
mod error;
pub mod snapshot;
mod store;
pub mod table;
mod table_proptest;

// Public surface
pub use error::{Result, StoreError};
pub use store::{KvStore, StoreStats};
pub use table::{ProbeTable, TOMBSTONE_KEY};
