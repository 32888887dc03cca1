//! The contract every symbol table in this crate satisfies.

use std::collections::TryReserveError;
use thiserror::Error;

/// Why a `put` did not store anything.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PutError {
    /// The key is already bound. The existing value is left untouched.
    #[error("key is already present in the symbol table")]
    DuplicateKey,
    /// Copying the key or linking the new entry could not allocate.
    #[error("out of memory while inserting into the symbol table")]
    OutOfMemory(#[from] TryReserveError),
}

/// The initial bucket array could not be allocated.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("failed to allocate a bucket array of {buckets} slots")]
pub struct AllocError {
    pub buckets: usize,
    #[source]
    pub(crate) source: TryReserveError,
}

/// String-keyed associative container with unique keys.
///
/// Keys are copied into storage owned by the table; callers keep ownership of
/// the `&str` they pass in. Values are moved in and handed back by `replace`
/// and `remove`. Instantiate `V` as a reference or `Rc` to keep the table
/// from owning the payload.
pub trait SymbolTable<V> {
    /// Number of bindings.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<&V>;

    fn get_mut(&mut self, key: &str) -> Option<&mut V>;

    /// Bind `key` to `value`. Fails without touching the table if `key` is
    /// already present or an allocation fails.
    fn put(&mut self, key: &str, value: V) -> Result<(), PutError>;

    /// Swap the value bound to `key`, returning the previous one. `None` when
    /// `key` is absent, in which case `value` is dropped and nothing changes.
    fn replace(&mut self, key: &str, value: V) -> Option<V>;

    /// Unbind `key` and return its value.
    fn remove(&mut self, key: &str) -> Option<V>;

    /// Call `visit(key, value, ctx)` once per binding, in an order defined by
    /// the implementation. `ctx` is passed through untouched.
    fn traverse<C, F>(&self, visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &V, &mut C);

    /// Like `traverse`, with mutable access to each value.
    fn traverse_mut<C, F>(&mut self, visit: F, ctx: &mut C)
    where
        C: ?Sized,
        F: FnMut(&str, &mut V, &mut C);
}
