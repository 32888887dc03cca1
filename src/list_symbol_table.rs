//! ListSymbolTable: the baseline symbol table, a singly linked list of owned
//! nodes. Every operation is a linear scan; it exists as the reference
//! behavior that `HashSymbolTable` must match.

use crate::chain::copy_key;
use crate::symbol_table::{PutError, SymbolTable};
use core::fmt;
use core::mem;

struct Node<V> {
    key: String,
    value: V,
    next: Option<Box<Node<V>>>,
}

/// Head of a linked list of bindings, most recently inserted first.
pub struct ListSymbolTable<V> {
    head: Option<Box<Node<V>>>,
    len: usize,
}

impl<V> Default for ListSymbolTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ListSymbolTable<V> {
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn find(&self, key: &str) -> Option<&Node<V>> {
        self.iter_nodes().find(|n| n.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.find(key).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let mut cur = self.head.as_deref_mut();
        while let Some(node) = cur {
            if node.key == key {
                return Some(&mut node.value);
            }
            cur = node.next.as_deref_mut();
        }
        None
    }

    pub fn put(&mut self, key: &str, value: V) -> Result<(), PutError> {
        if self.contains(key) {
            return Err(PutError::DuplicateKey);
        }
        let mut node = Box::new(Node {
            key: copy_key(key)?,
            value,
            next: None,
        });
        mem::swap(&mut node.next, &mut self.head);
        self.head = Some(node);
        self.len += 1;
        Ok(())
    }

    pub fn replace(&mut self, key: &str, value: V) -> Option<V> {
        self.get_mut(key).map(|slot| mem::replace(slot, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        // Walk links rather than nodes so that unlinking the head and an
        // interior node are the same splice.
        let mut link = &mut self.head;
        while link.as_ref().map_or(false, |n| n.key != key) {
            link = &mut link.as_mut()?.next;
        }
        let node = *link.take()?;
        *link = node.next;
        self.len -= 1;
        Some(node.value)
    }

    pub fn traverse<C, F>(&self, mut visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &V, &mut C),
    {
        for (k, v) in self.iter() {
            visit(k, v, ctx);
        }
    }

    pub fn traverse_mut<C, F>(&mut self, mut visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &mut V, &mut C),
    {
        let mut cur = self.head.as_deref_mut();
        while let Some(node) = cur {
            visit(node.key.as_str(), &mut node.value, ctx);
            cur = node.next.as_deref_mut();
        }
    }

    fn iter_nodes(&self) -> impl Iterator<Item = &Node<V>> {
        core::iter::successors(self.head.as_deref(), |n| n.next.as_deref())
    }

    /// Returns an iterator over bindings, most recent first.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            remaining: self.len,
            item: self.head.as_deref(),
        }
    }
}

impl<V> Drop for ListSymbolTable<V> {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop of `Box` chains can
        // overflow the stack on long lists.
        let mut cur = self.head.take();
        while let Some(mut node) = cur {
            cur = node.next.take();
        }
    }
}

impl<V> SymbolTable<V> for ListSymbolTable<V> {
    fn len(&self) -> usize {
        ListSymbolTable::len(self)
    }
    fn contains(&self, key: &str) -> bool {
        ListSymbolTable::contains(self, key)
    }
    fn get(&self, key: &str) -> Option<&V> {
        ListSymbolTable::get(self, key)
    }
    fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        ListSymbolTable::get_mut(self, key)
    }
    fn put(&mut self, key: &str, value: V) -> Result<(), PutError> {
        ListSymbolTable::put(self, key, value)
    }
    fn replace(&mut self, key: &str, value: V) -> Option<V> {
        ListSymbolTable::replace(self, key, value)
    }
    fn remove(&mut self, key: &str) -> Option<V> {
        ListSymbolTable::remove(self, key)
    }
    fn traverse<C, F>(&self, visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &V, &mut C),
    {
        ListSymbolTable::traverse(self, visit, ctx)
    }
    fn traverse_mut<C, F>(&mut self, visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &mut V, &mut C),
    {
        ListSymbolTable::traverse_mut(self, visit, ctx)
    }
}

impl<V: fmt::Debug> fmt::Debug for ListSymbolTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a ListSymbolTable<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over list contents.
pub struct Iter<'a, V> {
    remaining: usize,
    item: Option<&'a Node<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.item.take()?;
        self.remaining -= 1;
        self.item = node.next.as_deref();
        Some((node.key.as_str(), &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
