//! Storage layer for docmap
//!
//! This crate implements the [`Driver`](docmap_core::Driver) contract
//! in-process:
//! - MemoryDriver: named collections behind a `parking_lot::RwLock`
//! - Collection: documents kept in natural (insertion) order
//! - IndexRegistry: per-collection indexes with idempotent creation and
//!   unique-key enforcement
//! - Filter matching (`$in`, `$nin`, `$ne`, comparisons, `$exists`)
//! - Multi-key sorting with natural order as the final tiebreak
//!
//! The engine never depends on this crate directly; it only sees
//! `Arc<dyn Driver>`. Tests and embedded applications use `MemoryDriver`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod index;
pub mod matcher;
pub mod memory;
pub mod ordering;

pub use collection::Collection;
pub use index::IndexRegistry;
pub use matcher::matches;
pub use memory::MemoryDriver;
pub use ordering::sort_documents;
