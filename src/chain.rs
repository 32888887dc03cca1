//! Bucket chains: owned bindings that share one slot of the bucket array.

use std::collections::TryReserveError;

/// Copy `key` into storage owned by the table. Fails instead of aborting when
/// the allocation cannot be satisfied.
pub(crate) fn copy_key(key: &str) -> Result<String, TryReserveError> {
    let mut owned = String::new();
    owned.try_reserve_exact(key.len())?;
    owned.push_str(key);
    Ok(owned)
}

/// A key/value pair plus the full hash of its key. The hash is computed once
/// at insertion and reused on every expansion, so the hasher never runs again
/// for a stored key.
#[derive(Debug)]
pub(crate) struct Binding<V> {
    pub(crate) key: String,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

pub(crate) type Iter<'a, V> = core::iter::Rev<core::slice::Iter<'a, Binding<V>>>;
pub(crate) type IterMut<'a, V> = core::iter::Rev<core::slice::IterMut<'a, Binding<V>>>;

/// One bucket. Bindings are stored oldest first so that linking a new binding
/// at the logical head is a push; iteration runs newest first.
#[derive(Debug)]
pub(crate) struct Chain<V> {
    bindings: Vec<Binding<V>>,
}

impl<V> Default for Chain<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Chain<V> {
    pub(crate) const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    fn position(&self, hash: u64, key: &str) -> Option<usize> {
        self.bindings
            .iter()
            .rposition(|b| b.hash == hash && b.key == key)
    }

    pub(crate) fn find(&self, hash: u64, key: &str) -> Option<&Binding<V>> {
        self.position(hash, key).map(|i| &self.bindings[i])
    }

    pub(crate) fn find_mut(&mut self, hash: u64, key: &str) -> Option<&mut Binding<V>> {
        let i = self.position(hash, key)?;
        Some(&mut self.bindings[i])
    }

    /// Make room for one more binding, amortized.
    pub(crate) fn try_reserve(&mut self) -> Result<(), TryReserveError> {
        self.bindings.try_reserve(1)
    }

    /// Exposes the backing vector so expansion can size each new chain exactly.
    pub(crate) fn storage_mut(&mut self) -> &mut Vec<Binding<V>> {
        &mut self.bindings
    }

    /// Link `binding` at the head of the chain. Callers reserve first; with
    /// capacity available this never allocates.
    pub(crate) fn push_front(&mut self, binding: Binding<V>) {
        self.bindings.push(binding);
    }

    /// Unlink and return the binding for `key`, wherever it sits in the chain.
    pub(crate) fn unlink(&mut self, hash: u64, key: &str) -> Option<Binding<V>> {
        let i = self.position(hash, key)?;
        Some(self.bindings.remove(i))
    }

    /// Move every binding out, oldest first, leaving the chain empty.
    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Binding<V>> {
        self.bindings.drain(..)
    }

    pub(crate) fn iter(&self) -> Iter<'_, V> {
        self.bindings.iter().rev()
    }

    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, V> {
        self.bindings.iter_mut().rev()
    }
}
