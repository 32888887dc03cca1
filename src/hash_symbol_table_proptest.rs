#![cfg(test)]

// Property tests kept inside the crate so they can check bucket-level
// invariants that the public API does not expose.

use crate::chain::Chain;
use crate::hash::{reduce, Poly65599};
use crate::hash_symbol_table::HashSymbolTable;
use crate::list_symbol_table::ListSymbolTable;
use crate::symbol_table::{PutError, SymbolTable};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Replace(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Traverse,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Replace(i, v)),
            idx.clone().prop_map(OpI::Remove),
            idx.clone().prop_map(OpI::Get),
            prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            Just(OpI::Traverse),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Bucket-level invariants of a hash-backed table: the bucket array matches the
// stage, chain lengths sum to `len`, and every binding sits in the bucket its
// stored hash selects.
fn check_structure<V, S>(t: &HashSymbolTable<V, S>) -> Result<(), TestCaseError>
where
    S: BuildHasher,
{
    prop_assert_eq!(t.buckets.len(), t.stage.bucket_count());
    prop_assert_eq!(t.buckets.iter().map(Chain::len).sum::<usize>(), t.len);
    for (i, chain) in t.buckets.iter().enumerate() {
        for b in chain.iter() {
            prop_assert_eq!(reduce(b.hash, t.buckets.len()), i);
        }
    }
    Ok(())
}

// State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate puts fail with DuplicateKey and leave the stored value alone.
// - `get`/`contains` parity with the model for present and absent keys.
// - `replace` returns the previous value only for present keys.
// - `remove` returns the model's value and the key disappears.
// - `traverse` yields each live binding exactly once.
// - `len`/`is_empty` parity with the model after each op.
fn run_state_machine<T, F>(
    mut sut: T,
    pool: &[String],
    ops: Vec<OpI>,
    check: F,
) -> Result<(), TestCaseError>
where
    T: SymbolTable<i32>,
    F: Fn(&T) -> Result<(), TestCaseError>,
{
    let mut model: HashMap<String, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = &pool[i];
                let prior = model.get(k).copied();
                match sut.put(k, v) {
                    Ok(()) => {
                        prop_assert!(prior.is_none(), "put must fail on duplicate");
                        model.insert(k.clone(), v);
                    }
                    Err(PutError::DuplicateKey) => {
                        prop_assert!(prior.is_some(), "duplicate error only when key exists");
                        prop_assert_eq!(sut.get(k).copied(), prior);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }
            }
            OpI::Replace(i, v) => {
                let k = &pool[i];
                let expected = model.get_mut(k).map(|slot| std::mem::replace(slot, v));
                prop_assert_eq!(sut.replace(k, v), expected);
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k));
                prop_assert!(!sut.contains(k));
                prop_assert!(sut.get(k).is_none());
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(sut.contains(&s), model.contains_key(&s));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(sv), Some(mv)) => {
                        *sv = sv.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    _ => prop_assert!(false, "get_mut presence disagrees with model"),
                }
            }
            OpI::Traverse => {
                let mut seen: BTreeMap<String, i32> = BTreeMap::new();
                let mut visits = 0usize;
                sut.traverse(
                    |k, v, n: &mut usize| {
                        *n += 1;
                        seen.insert(k.to_string(), *v);
                    },
                    &mut visits,
                );
                let expected: BTreeMap<String, i32> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(visits, model.len());
                prop_assert_eq!(seen, expected);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        check(&sut)?;
    }
    Ok(())
}

// Collision variant using a constant hasher to stress chain scans.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(
            HashSymbolTable::<i32>::new(),
            &pool,
            ops,
            check_structure::<i32, Poly65599>,
        )?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = HashSymbolTable::<i32, _>::with_hasher(ConstBuildHasher);
        run_state_machine(sut, &pool, ops, check_structure::<i32, ConstBuildHasher>)?;
    }

    #[test]
    fn prop_state_machine_list((pool, ops) in arb_scenario()) {
        run_state_machine(ListSymbolTable::<i32>::new(), &pool, ops, |_| Ok(()))?;
    }
}

// Growth: bulk inserts across several stages with interleaved removals never
// lose or duplicate a binding, and structure holds after every expansion.
proptest! {
    #![proptest_config(ProptestConfig { cases: 8, .. ProptestConfig::default() })]

    #[test]
    fn prop_growth_preserves_bindings(
        n in 400usize..2600,
        removals in proptest::collection::vec(0usize..2600, 0..200),
    ) {
        let mut sut: HashSymbolTable<usize> = HashSymbolTable::new();
        let mut live: BTreeSet<usize> = BTreeSet::new();
        for i in 0..n {
            let put = sut.put(&format!("k{i}"), i);
            prop_assert!(put.is_ok(), "put k{} failed: {:?}", i, put);
            live.insert(i);
        }
        for r in removals {
            let expected = live.remove(&r).then_some(r);
            prop_assert_eq!(sut.remove(&format!("k{r}")), expected);
        }
        check_structure(&sut)?;
        prop_assert_eq!(sut.len(), live.len());
        for &i in &live {
            prop_assert_eq!(sut.get(&format!("k{i}")), Some(&i));
        }
        let seen: BTreeSet<usize> = sut.iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(seen, live);
    }
}
