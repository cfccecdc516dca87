//! The trie façade: mutation, queries and both archive formats.

use std::io::{Read, Write};
use std::thread;

use tracing::debug;

use crate::bitset::Bit64Set;
use crate::encoding::{read_u64, write_u64};
use crate::error::Result;
use crate::node::flat::{flatten, FlatTree};
use crate::node::{self, Node};
use crate::values::{Store, TrieValue};

/// The query tree is either an owned node tree or a validated flat buffer
/// (after [`Trie::read`]). Queries run on both; the first mutation
/// materializes a flat tree into an owned one.
enum TreeRoot {
    Owned(Node),
    Flat(FlatTree),
}

/// A compressed prefix trie indexing byte-string keys against values.
///
/// Keys are arbitrary non-empty byte strings; values are interned in a
/// deduplicating store and shared between keys that carry equal values.
/// Beyond point lookups the trie answers prefix queries
/// ([`match_prefix`](Self::match_prefix)) and multi-occurrence substring
/// scans ([`match_all`](Self::match_all)) over arbitrary input buffers.
///
/// Mutation is single-writer: concurrent reads of an unchanging trie are
/// safe, concurrent `put`s are not and must be serialized by the caller.
pub struct Trie<V> {
    root: TreeRoot,
    values: Store<V>,
    bset: Bit64Set,
}

impl<V: TrieValue> Trie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Trie {
            root: TreeRoot::Owned(Node::new_value(&[], 0)),
            values: Store::new(),
            bset: Bit64Set::default(),
        }
    }

    /// Insert `key` with `value`. Re-inserting an existing key overwrites
    /// its value (last write wins).
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty; keys must be non-empty byte strings.
    pub fn put(&mut self, key: &[u8], value: V) -> Result<()> {
        self.merge_inner(key, value, None)
    }

    /// Insert `key` with `value`, resolving an existing key through
    /// `merger(previous, next)`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty; keys must be non-empty byte strings.
    pub fn merge(&mut self, key: &[u8], value: V, merger: impl Fn(&V, &V) -> V) -> Result<()> {
        self.merge_inner(key, value, Some(&merger))
    }

    fn merge_inner(
        &mut self,
        key: &[u8],
        value: V,
        merger: Option<&dyn Fn(&V, &V) -> V>,
    ) -> Result<()> {
        assert!(!key.is_empty(), "trie keys must be non-empty");
        self.bset = self.bset.put(key[0]);
        let index = self.values.put(value.clone())?;

        if let TreeRoot::Flat(flat) = &self.root {
            let owned = node::to_node(flat.root());
            self.root = TreeRoot::Owned(owned);
        }
        let root = match &mut self.root {
            TreeRoot::Owned(node) => node,
            TreeRoot::Flat(_) => unreachable!("flat root was just materialized"),
        };

        // The duplicate-key closure may intern a merged value, which can
        // itself fail; the error is surfaced after the insertion finishes.
        let values = &self.values;
        let mut deferred = None;
        let mut on_duplicate = |previous: u32| -> u32 {
            let Some(merge) = merger else {
                return index;
            };
            let merged = merge(&values.value(previous), &value);
            match values.put(merged) {
                Ok(merged_index) => merged_index,
                Err(err) => {
                    deferred = Some(err);
                    index
                }
            }
        };
        root.add(Node::new_value(key, index), Some(&mut on_duplicate));
        match deferred {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Look up the value stored under exactly `key`.
    pub fn get(&self, key: &[u8]) -> Option<V> {
        let mut result = None;
        self.match_indices(key, &mut |matched, index| {
            if matched.len() == key.len() {
                result = Some(self.values.value(index));
                return false;
            }
            true
        });
        result
    }

    /// Whether exactly `key` was inserted.
    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Number of distinct (deduplicated) values in the store.
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Visit every inserted key with its current value, in key order.
    pub fn walk(&self, mut visitor: impl FnMut(&[u8], &V)) {
        let mut acc = Vec::new();
        let mut raw = |key: &[u8], index: u32| visitor(key, &self.values.value(index));
        match &self.root {
            TreeRoot::Owned(root) => node::walk_from(root, &mut acc, &mut raw),
            TreeRoot::Flat(flat) => node::walk_from(flat.root(), &mut acc, &mut raw),
        }
    }

    /// Match inserted keys that are prefixes of `input`, shortest first.
    ///
    /// The handler returns a continue-searching signal: `false` stops the
    /// search immediately. Returns whether anything matched.
    ///
    /// ```
    /// use triekv::Trie;
    ///
    /// let mut trie: Trie<u32> = Trie::new();
    /// trie.put(b"dev", 1).unwrap();
    /// trie.put(b"dev.domain", 2).unwrap();
    ///
    /// let mut matched = Vec::new();
    /// trie.match_prefix(b"dev.domain.com", |key, value| {
    ///     matched.push((key.to_vec(), *value));
    ///     true
    /// });
    /// assert_eq!(matched.len(), 2);
    /// ```
    pub fn match_prefix(&self, input: &[u8], mut handler: impl FnMut(&[u8], &V) -> bool) -> bool {
        self.match_indices(input, &mut |key, index| {
            handler(key, &self.values.value(index))
        })
    }

    /// Match every occurrence of every inserted key at every offset of
    /// `input`.
    ///
    /// Offsets whose first byte cannot start any key are skipped via the
    /// trie-level bitset. A `false` from the handler stops the entire scan,
    /// even mid-buffer. Returns whether any position matched.
    ///
    /// ```
    /// use triekv::Trie;
    ///
    /// let mut trie: Trie<i32> = Trie::new();
    /// trie.put(b"abc", 3).unwrap();
    /// trie.put(b"a", 5).unwrap();
    /// trie.put(b"bc", 10).unwrap();
    /// trie.put(b"fo", 11).unwrap();
    /// trie.put(b"foo", 12).unwrap();
    ///
    /// let mut found = Vec::new();
    /// trie.match_all(b"abc is foo", |key, value| {
    ///     found.push((key.to_vec(), *value));
    ///     true
    /// });
    /// assert_eq!(found.len(), 5);
    /// ```
    pub fn match_all(&self, input: &[u8], mut handler: impl FnMut(&[u8], &V) -> bool) -> bool {
        let mut matched = false;
        let mut keep_going = true;
        for start in 0..input.len() {
            if !self.bset.is_empty() && !self.bset.is_set(input[start]) {
                continue;
            }
            if self.match_indices(&input[start..], &mut |key, index| {
                keep_going = handler(key, &self.values.value(index));
                keep_going
            }) {
                matched = true;
            }
            if !keep_going {
                break;
            }
        }
        matched
    }

    fn match_indices(&self, input: &[u8], handler: &mut dyn FnMut(&[u8], u32) -> bool) -> bool {
        match &self.root {
            TreeRoot::Owned(root) => node::match_at(root, input, 0, handler),
            TreeRoot::Flat(flat) => node::match_at(flat.root(), input, 0, handler),
        }
    }

    fn tree_size(&self) -> usize {
        match &self.root {
            TreeRoot::Owned(root) => node::encoded_size(root),
            TreeRoot::Flat(flat) => node::encoded_size(flat.root()),
        }
    }

    fn encode_tree(&self, writer: &mut dyn Write) -> Result<()> {
        match &self.root {
            TreeRoot::Owned(root) => node::encode_to(root, writer),
            TreeRoot::Flat(flat) => node::encode_to(flat.root(), writer),
        }
    }

    fn flatten_tree(&self) -> Vec<u8> {
        match &self.root {
            TreeRoot::Owned(root) => flatten(root),
            TreeRoot::Flat(flat) => flatten(flat.root()),
        }
    }

    /// Write the portable archive:
    /// `[bset: u64][tree_len: u64][recursive tree][value section]`.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u64(writer, self.bset.bits())?;
        let tree_size = self.tree_size();
        write_u64(writer, tree_size as u64)?;
        self.encode_tree(writer)?;
        self.values.encode(writer)?;
        debug!(
            tree_bytes = tree_size,
            values = self.values.len(),
            "encoded trie archive"
        );
        Ok(())
    }

    /// Decode a portable archive sequentially.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let bset = Bit64Set::from_bits(read_u64(reader)?);
        let _tree_size = read_u64(reader)?;
        let root = Node::decode(reader)?;
        let values = Store::decode(reader)?;
        Ok(Trie {
            root: TreeRoot::Owned(root),
            values,
            bset,
        })
    }

    /// Decode a portable archive, decoding the tree section and the value
    /// section on two parallel tasks.
    ///
    /// The section lengths are read sequentially first; the sections are
    /// disjoint byte ranges with no cross-references resolved during
    /// decode, so the two tasks are independent. Both tasks always run to
    /// completion and are joined before any error is returned; the tree
    /// section's error takes precedence when both fail.
    pub fn decode_concurrent<R: Read>(reader: &mut R) -> Result<Self>
    where
        V: Send,
    {
        let bset = Bit64Set::from_bits(read_u64(reader)?);
        let tree_size = read_u64(reader)? as usize;
        let mut tree_section = vec![0u8; tree_size];
        reader.read_exact(&mut tree_section)?;
        let mut value_section = Vec::new();
        reader.read_to_end(&mut value_section)?;
        debug!(
            tree_bytes = tree_section.len(),
            value_bytes = value_section.len(),
            "decoding archive sections in parallel"
        );

        let (tree_result, value_result) = thread::scope(|scope| {
            let tree_task = scope.spawn(|| Node::decode(&mut tree_section.as_slice()));
            let value_task = scope.spawn(|| Store::decode(&mut value_section.as_slice()));
            (join_task(tree_task), join_task(value_task))
        });
        let root = tree_result?;
        let values = value_result?;
        Ok(Trie {
            root: TreeRoot::Owned(root),
            values,
            bset,
        })
    }

    /// Write the flat archive:
    /// `[bset: u64][flat_len: u64][flat buffer][value section]`.
    ///
    /// The flat buffer is this crate's internal zero-copy layout; it is not
    /// a portable exchange format and must only be read back by
    /// [`read`](Self::read).
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u64(writer, self.bset.bits())?;
        let buffer = self.flatten_tree();
        write_u64(writer, buffer.len() as u64)?;
        writer.write_all(&buffer)?;
        self.values.encode(writer)?;
        debug!(
            flat_bytes = buffer.len(),
            values = self.values.len(),
            "wrote flat trie archive"
        );
        Ok(())
    }

    /// Read a flat archive written by [`write`](Self::write).
    ///
    /// The validated buffer itself becomes the query tree: no per-node
    /// allocation happens, and queries run against it directly. A later
    /// mutation materializes an owned tree first.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let bset = Bit64Set::from_bits(read_u64(reader)?);
        let flat_size = read_u64(reader)? as usize;
        let mut buffer = vec![0u8; flat_size];
        reader.read_exact(&mut buffer)?;
        let flat = FlatTree::from_bytes(buffer)?;
        let values = Store::decode(reader)?;
        debug!(flat_bytes = flat_size, "read flat trie archive");
        Ok(Trie {
            root: TreeRoot::Flat(flat),
            values,
            bset,
        })
    }
}

impl<V: TrieValue> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn join_task<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
