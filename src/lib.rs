//! # triekv
//!
//! An in-memory compressed prefix trie (radix tree over byte strings) for
//! indexing keyword sets against values and scanning input buffers for
//! every occurrence of every keyword - faster than brute-force substring
//! search once the keyword set grows.
//!
//! ## Features
//!
//! - **Compacted edges**: single-child chains collapse into multi-byte
//!   fragments; insertion splits fragments as keys diverge
//! - **Bitset-gated dispatch**: a 64-bit presence filter rejects impossible
//!   bytes before binary search descends into children
//! - **Interned values**: equal values are stored once and shared through
//!   dense `u32` indices
//! - **Two archive codecs**: a portable recursive encoding, and a flat
//!   zero-copy buffer that loads without per-node allocation
//! - **Parallel decode**: the tree and value sections of an archive decode
//!   on two independent tasks
//!
//! ## Example
//!
//! ```rust
//! use triekv::Trie;
//!
//! let mut trie: Trie<u32> = Trie::new();
//! trie.put(b"dev", 1).unwrap();
//! trie.put(b"dev.domain", 2).unwrap();
//! assert_eq!(trie.get(b"dev.domain"), Some(2));
//!
//! // Every inserted key that prefixes the input, shortest first.
//! let mut matched = Vec::new();
//! trie.match_prefix(b"dev.domain.com", |key, value| {
//!     matched.push((key.to_vec(), *value));
//!     true
//! });
//! assert_eq!(matched.len(), 2);
//! ```
//!
//! Mutation is single-writer; reads of an unchanging trie are safe from
//! any number of threads.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitset;
mod encoding;
mod error;
mod node;
pub mod trie;
pub mod values;

pub use bitset::Bit64Set;
pub use error::{Result, TrieError};
pub use trie::Trie;
pub use values::{DedupKey, TrieValue};

#[cfg(test)]
mod proptests;
