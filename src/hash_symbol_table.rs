//! HashSymbolTable: separate chaining over a bucket array that grows through
//! `BUCKET_SCHEDULE`.

use crate::chain::{self, Binding, Chain};
use crate::hash::{hash_key, reduce, Poly65599};
use crate::schedule::Stage;
use crate::symbol_table::{AllocError, PutError, SymbolTable};
use core::fmt;
use core::hash::BuildHasher;
use std::collections::TryReserveError;

/// Fallible allocation used by expansion. Every allocation a rehash needs goes
/// through here before any binding moves.
pub(crate) trait Reserve {
    fn reserve<T>(&mut self, v: &mut Vec<T>, additional: usize) -> Result<(), TryReserveError>;
}

/// Allocates through `Vec::try_reserve_exact`.
pub(crate) struct Exact;

impl Reserve for Exact {
    #[inline]
    fn reserve<T>(&mut self, v: &mut Vec<T>, additional: usize) -> Result<(), TryReserveError> {
        v.try_reserve_exact(additional)
    }
}

pub struct HashSymbolTable<V, S = Poly65599> {
    hasher: S,
    pub(crate) buckets: Vec<Chain<V>>, // len == stage.bucket_count()
    pub(crate) len: usize,
    pub(crate) stage: Stage,
}

impl<V> HashSymbolTable<V> {
    pub fn new() -> Self {
        Self::with_hasher(Poly65599)
    }

    /// Like `new`, but reports a failed bucket-array allocation instead of
    /// aborting.
    pub fn try_new() -> Result<Self, AllocError> {
        Self::try_with_hasher(Poly65599)
    }
}

impl<V> Default for HashSymbolTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> HashSymbolTable<V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        let stage = Stage::FIRST;
        Self {
            hasher,
            buckets: core::iter::repeat_with(Chain::new)
                .take(stage.bucket_count())
                .collect(),
            len: 0,
            stage,
        }
    }

    pub fn try_with_hasher(hasher: S) -> Result<Self, AllocError> {
        let stage = Stage::FIRST;
        let n = stage.bucket_count();
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(n)
            .map_err(|source| AllocError { buckets: n, source })?;
        buckets.resize_with(n, Chain::new);
        Ok(Self {
            hasher,
            buckets,
            len: 0,
            stage,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.stage.bucket_count()
    }

    /// Current position in the growth schedule.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn make_hash(&self, key: &str) -> u64 {
        hash_key(&self.hasher, key)
    }

    fn bucket(&self, hash: u64) -> &Chain<V> {
        &self.buckets[reduce(hash, self.buckets.len())]
    }

    fn bucket_mut(&mut self, hash: u64) -> &mut Chain<V> {
        let i = reduce(hash, self.buckets.len());
        &mut self.buckets[i]
    }

    pub fn contains(&self, key: &str) -> bool {
        let hash = self.make_hash(key);
        self.bucket(hash).find(hash, key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let hash = self.make_hash(key);
        self.bucket(hash).find(hash, key).map(|b| &b.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let hash = self.make_hash(key);
        self.bucket_mut(hash).find_mut(hash, key).map(|b| &mut b.value)
    }

    /// Bind `key` to `value`.
    ///
    /// When the table already holds as many bindings as it has buckets, it
    /// first tries to move to the next stage of the schedule. A failed
    /// expansion is not an error: the binding goes into the current, smaller
    /// bucket array instead.
    ///
    /// Growth happens before the key is copied. If the insert then fails with
    /// `OutOfMemory`, the table keeps its larger bucket array.
    pub fn put(&mut self, key: &str, value: V) -> Result<(), PutError> {
        self.put_in(key, value, &mut Exact)
    }

    /// `put`, with expansion allocating through `alloc`.
    pub(crate) fn put_in<R: Reserve>(
        &mut self,
        key: &str,
        value: V,
        alloc: &mut R,
    ) -> Result<(), PutError> {
        let hash = self.make_hash(key);
        if self.bucket(hash).find(hash, key).is_some() {
            return Err(PutError::DuplicateKey);
        }

        if self.len == self.stage.bucket_count() {
            self.expand(alloc);
        }

        let key = chain::copy_key(key)?;
        let chain = self.bucket_mut(hash);
        chain.try_reserve()?;
        chain.push_front(Binding { key, value, hash });
        self.len += 1;
        Ok(())
    }

    pub fn replace(&mut self, key: &str, value: V) -> Option<V> {
        self.get_mut(key).map(|slot| core::mem::replace(slot, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let hash = self.make_hash(key);
        let binding = self.bucket_mut(hash).unlink(hash, key)?;
        self.len -= 1;
        Some(binding.value)
    }

    /// Visit every binding in bucket order, then chain order (most recent
    /// first).
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
        for (k, v) in self.iter_mut() {
            visit(k, v, ctx);
        }
    }

    /// Move to the next stage, if there is one. On allocation failure the
    /// table keeps its current bucket array.
    fn expand<R: Reserve>(&mut self, alloc: &mut R) {
        let Some(next) = self.stage.next() else {
            return;
        };
        let from = self.stage.bucket_count();
        match self.rehash_into(next, alloc) {
            Ok(()) => {
                tracing::debug!(
                    from,
                    to = next.bucket_count(),
                    entries = self.len,
                    "expanded symbol table"
                );
                if next.is_last() {
                    tracing::trace!(
                        buckets = next.bucket_count(),
                        "symbol table reached its final stage"
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    from,
                    to = next.bucket_count(),
                    %error,
                    "symbol table expansion failed; keeping current capacity"
                );
            }
        }
    }

    /// Rehash every binding into a bucket array sized for `next`.
    ///
    /// All-or-nothing: the new array and every new chain are allocated before
    /// any binding moves, so an error leaves `self` exactly as it was.
    pub(crate) fn rehash_into<R: Reserve>(
        &mut self,
        next: Stage,
        alloc: &mut R,
    ) -> Result<(), TryReserveError> {
        let n = next.bucket_count();

        let mut sizes: Vec<usize> = Vec::new();
        alloc.reserve(&mut sizes, n)?;
        sizes.resize(n, 0);
        for b in self.buckets.iter().flat_map(Chain::iter) {
            sizes[reduce(b.hash, n)] += 1;
        }

        let mut buckets: Vec<Chain<V>> = Vec::new();
        alloc.reserve(&mut buckets, n)?;
        for &size in &sizes {
            let mut chain = Chain::new();
            if size > 0 {
                alloc.reserve(chain.storage_mut(), size)?;
            }
            buckets.push(chain);
        }

        // Nothing below allocates.
        for old in &mut self.buckets {
            for b in old.drain() {
                buckets[reduce(b.hash, n)].push_front(b);
            }
        }
        debug_assert_eq!(buckets.iter().map(Chain::len).sum::<usize>(), self.len);
        self.buckets = buckets;
        self.stage = next;
        Ok(())
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: None,
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            buckets: self.buckets.iter_mut(),
            chain: None,
            remaining: self.len,
        }
    }
}

impl<V, S> SymbolTable<V> for HashSymbolTable<V, S>
where
    S: BuildHasher,
{
    fn len(&self) -> usize {
        HashSymbolTable::len(self)
    }
    fn contains(&self, key: &str) -> bool {
        HashSymbolTable::contains(self, key)
    }
    fn get(&self, key: &str) -> Option<&V> {
        HashSymbolTable::get(self, key)
    }
    fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        HashSymbolTable::get_mut(self, key)
    }
    fn put(&mut self, key: &str, value: V) -> Result<(), PutError> {
        HashSymbolTable::put(self, key, value)
    }
    fn replace(&mut self, key: &str, value: V) -> Option<V> {
        HashSymbolTable::replace(self, key, value)
    }
    fn remove(&mut self, key: &str) -> Option<V> {
        HashSymbolTable::remove(self, key)
    }
    fn traverse<C, F>(&self, visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &V, &mut C),
    {
        HashSymbolTable::traverse(self, visit, ctx)
    }
    fn traverse_mut<C, F>(&mut self, visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &mut V, &mut C),
    {
        HashSymbolTable::traverse_mut(self, visit, ctx)
    }
}

impl<V: fmt::Debug, S> fmt::Debug for HashSymbolTable<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .buckets
            .iter()
            .flat_map(Chain::iter)
            .map(|b| (&b.key, &b.value));
        f.debug_map().entries(entries).finish()
    }
}

/// Iterator over `(key, value)` pairs of a `HashSymbolTable`.
pub struct Iter<'a, V> {
    buckets: core::slice::Iter<'a, Chain<V>>,
    chain: Option<chain::Iter<'a, V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(b) = self.chain.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some((b.key.as_str(), &b.value));
            }
            self.chain = Some(self.buckets.next()?.iter());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// Iterator over `(key, &mut value)` pairs of a `HashSymbolTable`.
pub struct IterMut<'a, V> {
    buckets: core::slice::IterMut<'a, Chain<V>>,
    chain: Option<chain::IterMut<'a, V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = (&'a str, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(b) = self.chain.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some((b.key.as_str(), &mut b.value));
            }
            self.chain = Some(self.buckets.next()?.iter_mut());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

impl<'a, V, S> IntoIterator for &'a HashSymbolTable<V, S>
where
    S: BuildHasher,
{
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V, S> IntoIterator for &'a mut HashSymbolTable<V, S>
where
    S: BuildHasher,
{
    type Item = (&'a str, &'a mut V);
    type IntoIter = IterMut<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BUCKET_SCHEDULE;
    use std::collections::BTreeMap;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl core::hash::Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // every key lands in bucket 0
    }

    /// Fails the `n`th reservation (0-based) and every one after it.
    struct FailFrom(usize);
    impl Reserve for FailFrom {
        fn reserve<T>(&mut self, v: &mut Vec<T>, additional: usize) -> Result<(), TryReserveError> {
            if self.0 == 0 {
                return Vec::<u8>::new().try_reserve(usize::MAX);
            }
            self.0 -= 1;
            v.try_reserve_exact(additional)
        }
    }

    fn key(i: usize) -> String {
        format!("key-{i}")
    }

    fn filled(n: usize) -> HashSymbolTable<usize> {
        let mut t = HashSymbolTable::new();
        for i in 0..n {
            t.put(&key(i), i).unwrap();
        }
        t
    }

    fn chain_total<V, S>(t: &HashSymbolTable<V, S>) -> usize {
        t.buckets.iter().map(Chain::len).sum()
    }

    /// Invariant: a new table is empty at the first stage.
    #[test]
    fn new_table_is_empty_at_first_stage() {
        let t: HashSymbolTable<i32> = HashSymbolTable::new();
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        assert_eq!(t.stage(), Stage::FIRST);
        assert_eq!(t.bucket_count(), 509);
        assert_eq!(t.buckets.len(), 509);

        let t: HashSymbolTable<i32> = HashSymbolTable::try_new().unwrap();
        assert_eq!(t.buckets.len(), 509);
    }

    /// Invariant: bindings land in the bucket named by the polynomial hash.
    #[test]
    fn bindings_land_in_hashed_bucket() {
        let mut t = HashSymbolTable::new();
        t.put("a", 1).unwrap();
        t.put("ab", 2).unwrap();
        assert_eq!(t.buckets[97].len(), 1);
        assert_eq!(t.buckets[192].len(), 1);
        assert_eq!(chain_total(&t), 2);
    }

    /// Invariant: growth fires on the put that finds `len == bucket_count`,
    /// not on the put that reaches it.
    #[test]
    fn growth_fires_before_insert_at_exact_boundary() {
        let mut t = filled(509);
        assert_eq!(t.bucket_count(), 509);
        t.put("one-more", 509).unwrap();
        assert_eq!(t.bucket_count(), 1021);
        assert_eq!(t.buckets.len(), 1021);
        assert_eq!(t.len(), 510);
        assert_eq!(chain_total(&t), 510);
    }

    /// Invariant: a duplicate put at the boundary neither inserts nor grows.
    #[test]
    fn duplicate_at_boundary_does_not_grow() {
        let mut t = filled(509);
        assert_eq!(t.put(&key(0), 99), Err(PutError::DuplicateKey));
        assert_eq!(t.bucket_count(), 509);
        assert_eq!(t.get(&key(0)), Some(&0));
    }

    /// Invariant: rehashing relocates every binding to `hash % new_count`.
    #[test]
    fn rehash_relocates_under_new_modulus() {
        let t = filled(1000);
        assert_eq!(t.bucket_count(), 1021);
        for (i, chain) in t.buckets.iter().enumerate() {
            for b in chain.iter() {
                assert_eq!(reduce(b.hash, 1021), i);
            }
        }
        for i in 0..1000 {
            assert_eq!(t.get(&key(i)), Some(&i));
        }
    }

    /// Invariant: a failed rehash leaves stage, buckets and bindings untouched,
    /// whichever reservation fails.
    #[test]
    fn failed_rehash_changes_nothing() {
        let mut t = filled(300);
        let before: BTreeMap<String, usize> =
            t.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        for fail_at in [0, 1, 2, 50] {
            let next = t.stage().next().unwrap();
            assert!(t.rehash_into(next, &mut FailFrom(fail_at)).is_err());
            assert_eq!(t.stage(), Stage::FIRST);
            assert_eq!(t.buckets.len(), 509);
            assert_eq!(t.len(), 300);
            assert_eq!(chain_total(&t), 300);
            let after: BTreeMap<String, usize> =
                t.iter().map(|(k, v)| (k.to_string(), *v)).collect();
            assert_eq!(before, after);
        }
        // The table is still fully usable at its old capacity.
        t.put("late", 1000).unwrap();
        assert_eq!(t.get("late"), Some(&1000));
    }

    /// Invariant: a put at the boundary whose expansion fails still binds at
    /// the old capacity, and later puts past the boundary do not retry.
    #[test]
    fn put_at_boundary_survives_failed_growth() {
        let mut t = filled(509);
        assert_eq!(t.put_in("at-boundary", 509, &mut FailFrom(0)), Ok(()));
        assert_eq!(t.bucket_count(), 509);
        assert_eq!(t.buckets.len(), 509);
        assert_eq!(t.len(), 510);
        assert_eq!(chain_total(&t), 510);
        assert_eq!(t.get("at-boundary"), Some(&509));
        for (i, chain) in t.buckets.iter().enumerate() {
            for b in chain.iter() {
                assert_eq!(reduce(b.hash, 509), i);
            }
        }

        // len is past the boundary now, so even a working allocator leaves
        // the stage alone.
        t.put("later", 510).unwrap();
        assert_eq!(t.len(), 511);
        assert_eq!(t.bucket_count(), 509);

        // Back at exactly the boundary, growth is attempted again.
        assert_eq!(t.remove("later"), Some(510));
        assert_eq!(t.remove("at-boundary"), Some(509));
        t.put("again", 0).unwrap();
        assert_eq!(t.bucket_count(), 1021);
        assert_eq!(t.len(), 510);
    }

    /// Invariant: a rehash that succeeds migrates everything in one step.
    #[test]
    fn rehash_with_room_succeeds() {
        let mut t = filled(10);
        let next = t.stage().next().unwrap();
        t.rehash_into(next, &mut FailFrom(usize::MAX)).unwrap();
        assert_eq!(t.bucket_count(), 1021);
        assert_eq!(chain_total(&t), 10);
    }

    /// Invariant: the stage stops at the end of the schedule even when the
    /// boundary condition holds.
    #[test]
    fn expand_at_last_stage_is_noop() {
        let mut t: HashSymbolTable<usize> = HashSymbolTable::new();
        while let Some(next) = t.stage().next() {
            t.rehash_into(next, &mut Exact).unwrap();
        }
        assert_eq!(t.bucket_count(), *BUCKET_SCHEDULE.last().unwrap());
        t.expand(&mut Exact);
        assert!(t.stage().is_last());
        assert_eq!(t.buckets.len(), 65521);
    }

    /// Invariant: all keys share one chain under a constant hasher; lookups
    /// still resolve by string equality.
    #[test]
    fn collisions_resolve_by_key() {
        let mut t = HashSymbolTable::with_hasher(ConstBuildHasher);
        for i in 0..50 {
            t.put(&key(i), i).unwrap();
        }
        assert_eq!(t.buckets[0].len(), 50);
        for i in 0..50 {
            assert_eq!(t.get(&key(i)), Some(&i));
        }
        assert_eq!(t.remove(&key(25)), Some(25));
        assert_eq!(t.remove(&key(49)), Some(49));
        assert_eq!(t.remove(&key(0)), Some(0));
        assert_eq!(t.len(), 47);
        assert!(!t.contains(&key(25)));
    }

    /// Invariant: within a bucket, traversal is most recent first.
    #[test]
    fn traverse_within_bucket_is_most_recent_first() {
        let mut t = HashSymbolTable::with_hasher(ConstBuildHasher);
        t.put("first", 1).unwrap();
        t.put("second", 2).unwrap();
        t.put("third", 3).unwrap();
        let mut seen = Vec::new();
        t.traverse(|k, v, out: &mut Vec<(String, i32)>| out.push((k.to_string(), *v)), &mut seen);
        assert_eq!(
            seen,
            [
                ("third".to_string(), 3),
                ("second".to_string(), 2),
                ("first".to_string(), 1)
            ]
        );
    }

    /// Invariant: iterators report an exact length.
    #[test]
    fn iterators_are_exact_size() {
        let mut t = filled(40);
        let mut it = t.iter();
        assert_eq!(it.len(), 40);
        it.next();
        assert_eq!(it.len(), 39);
        assert_eq!(t.iter_mut().count(), 40);
    }

    #[test]
    fn debug_lists_entries() {
        let mut t = HashSymbolTable::new();
        t.put("a", 1).unwrap();
        assert_eq!(format!("{t:?}"), r#"{"a": 1}"#);
    }
}
