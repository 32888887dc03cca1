//! symtable: a string-keyed symbol table backed by a separate-chaining hash
//! table whose bucket array grows through a fixed schedule of primes.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: map unique string keys to values with O(1) expected lookups,
//!   deterministic hashing, and allocation failures that never corrupt the
//!   table.
//! - Layers:
//!   - `schedule`: the bucket counts {509, 1021, ..., 65521} and a `Stage`
//!     cursor that only moves forward.
//!   - `hash`: `Poly65599`, the `h = h * 65599 + byte` string hash, exposed
//!     as a `BuildHasher` so tables can be configured with another hasher.
//!   - `chain`: owned bindings sharing one bucket, linked most recent first.
//!   - `HashSymbolTable<V, S>`: the bucket array, cardinality and stage;
//!     performs expansion.
//!   - `ListSymbolTable<V>`: a plain linked list with the same contract,
//!     kept as the reference behavior.
//!   - `SymbolTable<V>`: the contract both tables implement.
//!
//! Constraints
//! - Single-threaded: no internal locking; wrap in a `Mutex` to share.
//! - Keys are copied into table-owned `String`s; callers keep their `&str`.
//! - Unique keys: `put` on a present key fails with `DuplicateKey` and leaves
//!   the stored value alone. `replace` is the way to change a value.
//! - Capacity never shrinks and never skips a stage.
//!
//! Growth
//! - `put` checks `len == bucket_count` before inserting. When that holds and
//!   another stage exists, the table rehashes into the next bucket count, then
//!   inserts. The 510th distinct key therefore triggers 509 -> 1021.
//! - Past the last stage the table keeps accepting keys; chains lengthen.
//!
//! Hasher and rehashing invariants
//! - Each binding stores its full `u64` hash; expansion reduces the stored
//!   hash under the new modulus and never calls the hasher.
//! - Expansion reserves the new bucket array and every new chain up front.
//!   If any reservation fails nothing has moved yet, so the table stays at
//!   its old stage with every binding intact. The failure is logged at
//!   `warn` and the triggering `put` proceeds at the old capacity.
//!
//! Notes and non-goals
//! - No shrinking, persistence, or iteration-order guarantee beyond
//!   "every binding exactly once".
//! - Values are never inspected; use `&T` or `Rc<T>` as `V` to keep
//!   ownership outside the table.

mod chain;
pub mod hash;
mod hash_symbol_table;
mod hash_symbol_table_proptest;
mod list_symbol_table;
pub mod schedule;
mod symbol_table;

// Public surface
pub use hash::{bucket_index, Poly65599};
pub use hash_symbol_table::{HashSymbolTable, Iter, IterMut};
pub use list_symbol_table::{Iter as ListIter, ListSymbolTable};
pub use schedule::{Stage, BUCKET_SCHEDULE};
pub use symbol_table::{AllocError, PutError, SymbolTable};

