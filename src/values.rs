//! The deduplicating, type-specialized value store.
//!
//! Values are interned: putting a value whose dedup key was seen before
//! returns the original index and stores nothing. The store is append-only
//! and the backing array is addressed by dense `u32` indices, which is what
//! trie nodes carry instead of the values themselves.
//!
//! The store is specialized over its element type at construction time
//! through the [`TrieValue`] capability trait; there is no runtime type
//! inspection. Implementations are provided for fixed-width scalars, bool,
//! `String` and `Vec<u8>`. Custom value types implement the trait
//! themselves - the default method bodies report the matching capability
//! error, so a type that skips a capability fails at the call that needs
//! it, not at compile time for everyone else.

use std::any::type_name;
use std::collections::HashMap;
use std::io::{Read, Write};

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::encoding::{
    read_len_prefixed, read_u32, read_u8, write_len_prefixed, write_u32, write_u8, CONTROL_BYTE,
};
use crate::error::{Result, TrieError};

/// Stable byte representation of a value, used to detect duplicates.
///
/// Scalar keys fit inline; longer keys (strings, byte payloads) spill.
pub type DedupKey = SmallVec<[u8; 16]>;

/// Capabilities a type needs to live in a trie's value store.
///
/// [`dedup_key`](Self::dedup_key) powers interning;
/// [`encode_values`](Self::encode_values) and
/// [`decode_values`](Self::decode_values) power the bulk value-section
/// codec. Every method has a default body returning the corresponding
/// capability error, mirroring the open contract: a store over a type that
/// lacks a capability fails at the operation that needs it.
pub trait TrieValue: Clone + Sized {
    /// Derive the dedup key identifying this value.
    fn dedup_key(&self) -> Result<DedupKey> {
        Err(TrieError::UnhashableType(type_name::<Self>()))
    }

    /// Bulk-encode a slice of values into the writer.
    fn encode_values(_values: &[Self], _writer: &mut dyn Write) -> Result<()> {
        Err(TrieError::UnsupportedType(type_name::<Self>()))
    }

    /// Bulk-decode exactly `count` values from the reader.
    fn decode_values(_count: usize, _reader: &mut dyn Read) -> Result<Vec<Self>> {
        Err(TrieError::UnsupportedType(type_name::<Self>()))
    }
}

// Fixed-width scalars: the dedup key is the little-endian byte form, and
// the codec moves the whole backing array as one contiguous transfer.
macro_rules! impl_scalar_value {
    ($($ty:ty),*) => {$(
        impl TrieValue for $ty {
            fn dedup_key(&self) -> Result<DedupKey> {
                Ok(DedupKey::from_slice(&self.to_le_bytes()))
            }

            fn encode_values(values: &[Self], writer: &mut dyn Write) -> Result<()> {
                let width = std::mem::size_of::<$ty>();
                let mut buf = Vec::with_capacity(values.len() * width);
                for value in values {
                    buf.extend_from_slice(&value.to_le_bytes());
                }
                writer.write_all(&buf)?;
                Ok(())
            }

            fn decode_values(count: usize, reader: &mut dyn Read) -> Result<Vec<Self>> {
                let width = std::mem::size_of::<$ty>();
                let mut buf = vec![0u8; count * width];
                reader.read_exact(&mut buf)?;
                let mut values = Vec::with_capacity(count);
                for chunk in buf.chunks_exact(width) {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(chunk);
                    values.push(<$ty>::from_le_bytes(raw));
                }
                Ok(values)
            }
        }
    )*};
}

impl_scalar_value!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl TrieValue for bool {
    fn dedup_key(&self) -> Result<DedupKey> {
        Ok(DedupKey::from_slice(&[u8::from(*self)]))
    }

    fn encode_values(values: &[Self], writer: &mut dyn Write) -> Result<()> {
        let buf: Vec<u8> = values.iter().map(|v| u8::from(*v)).collect();
        writer.write_all(&buf)?;
        Ok(())
    }

    fn decode_values(count: usize, reader: &mut dyn Read) -> Result<Vec<Self>> {
        let mut buf = vec![0u8; count];
        reader.read_exact(&mut buf)?;
        Ok(buf.into_iter().map(|b| b == 1).collect())
    }
}

impl TrieValue for String {
    fn dedup_key(&self) -> Result<DedupKey> {
        Ok(DedupKey::from_slice(self.as_bytes()))
    }

    fn encode_values(values: &[Self], writer: &mut dyn Write) -> Result<()> {
        for value in values {
            write_len_prefixed(writer, value.as_bytes())?;
        }
        Ok(())
    }

    fn decode_values(count: usize, reader: &mut dyn Read) -> Result<Vec<Self>> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let bytes = read_len_prefixed(reader)?;
            let value = String::from_utf8(bytes).map_err(|_| {
                TrieError::CorruptStream("invalid utf-8 in string value".into())
            })?;
            values.push(value);
        }
        Ok(values)
    }
}

impl TrieValue for Vec<u8> {
    fn dedup_key(&self) -> Result<DedupKey> {
        Ok(DedupKey::from_slice(self))
    }

    fn encode_values(values: &[Self], writer: &mut dyn Write) -> Result<()> {
        for value in values {
            write_len_prefixed(writer, value)?;
        }
        Ok(())
    }

    fn decode_values(count: usize, reader: &mut dyn Read) -> Result<Vec<Self>> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(read_len_prefixed(reader)?);
        }
        Ok(values)
    }
}

#[derive(Debug)]
struct StoreInner<V> {
    data: Vec<V>,
    registry: HashMap<DedupKey, u32>,
}

/// Append-only interning store mapping dedup keys to dense `u32` indices.
///
/// Safe under multiple concurrent readers and a single writer: the
/// existence check takes the shared read lock, the append path the
/// exclusive write lock.
#[derive(Debug)]
pub(crate) struct Store<V> {
    inner: RwLock<StoreInner<V>>,
}

impl<V: TrieValue> Store<V> {
    pub(crate) fn new() -> Self {
        Store {
            inner: RwLock::new(StoreInner {
                data: Vec::new(),
                registry: HashMap::new(),
            }),
        }
    }

    /// Intern `value`, returning its index. A value whose dedup key was
    /// seen before returns the existing index and stores nothing.
    pub(crate) fn put(&self, value: V) -> Result<u32> {
        let key = value.dedup_key()?;
        {
            let inner = self.inner.read();
            if let Some(&index) = inner.registry.get(&key) {
                return Ok(index);
            }
        }
        let mut inner = self.inner.write();
        if let Some(&index) = inner.registry.get(&key) {
            return Ok(index);
        }
        let index = inner.data.len() as u32;
        inner.registry.insert(key, index);
        inner.data.push(value);
        Ok(index)
    }

    /// O(1) lookup of a previously issued index.
    ///
    /// # Panics
    ///
    /// Panics if `index` was not issued by this store's `put` - an index
    /// out of range is a programming error, not a recoverable condition.
    pub(crate) fn value(&self, index: u32) -> V {
        self.inner.read().data[index as usize].clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    /// Value section: `[control][count: u32][type-specialized payload]`.
    pub(crate) fn encode(&self, writer: &mut dyn Write) -> Result<()> {
        let inner = self.inner.read();
        write_u8(writer, CONTROL_BYTE)?;
        write_u32(writer, inner.data.len() as u32)?;
        if inner.data.is_empty() {
            return Ok(());
        }
        V::encode_values(&inner.data, writer)
    }

    /// Decode a value section and rebuild the dedup registry from it, first
    /// occurrence winning, so interning keeps working afterwards.
    pub(crate) fn decode(reader: &mut dyn Read) -> Result<Self> {
        let control = read_u8(reader)?;
        if control != CONTROL_BYTE {
            return Err(TrieError::control_byte(CONTROL_BYTE, control));
        }
        let count = read_u32(reader)? as usize;
        let data = if count == 0 {
            Vec::new()
        } else {
            V::decode_values(count, reader)?
        };
        let mut registry = HashMap::with_capacity(data.len());
        for (index, value) in data.iter().enumerate() {
            registry.entry(value.dedup_key()?).or_insert(index as u32);
        }
        Ok(Store {
            inner: RwLock::new(StoreInner { data, registry }),
        })
    }
}
