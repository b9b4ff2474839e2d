use handle_btree::{BTreeMap, BTreeMultimap, CountingRuntime, Handle, Owned};
use proptest::prelude::*;
use std::collections::BTreeMap as Model;

type Rt = CountingRuntime;
type H = Handle<Rt>;

#[derive(Clone, Debug)]
enum Op {
    Insert(usize, usize),
    Assign(usize, usize),
    GetItem(usize),
    Erase(usize),
    RemoveFirst,
    Clear,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        4 => (0usize..6, 0usize..6).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (0usize..6, 0usize..6).prop_map(|(k, v)| Op::Assign(k, v)),
        2 => (0usize..6).prop_map(Op::GetItem),
        2 => (0usize..6).prop_map(Op::Erase),
        1 => Just(Op::RemoveFirst),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..120)
}

struct Pools {
    keys: Vec<Owned<Rt>>,
    values: Vec<Owned<Rt>>,
}

impl Pools {
    fn new() -> Self {
        Self {
            keys: (0..6).map(CountingRuntime::object).collect(),
            values: (0..6).map(|i| CountingRuntime::object(100 + i)).collect(),
        }
    }

    fn key(&self, i: usize) -> H {
        self.keys[i].handle()
    }

    fn value(&self, i: usize) -> H {
        self.values[i].handle()
    }

    // Every object holds its pool reference plus one per stored slot; the
    // default object holds its base count plus one per defaulted value.
    fn check(
        &self,
        stored: impl Iterator<Item = (usize, Option<usize>)> + Clone,
        none_base: usize,
    ) -> Result<(), TestCaseError> {
        for (i, o) in self.keys.iter().enumerate() {
            let expected = 1 + stored.clone().filter(|&(k, _)| k == i).count();
            prop_assert_eq!(CountingRuntime::ref_count(o.handle()), expected, "key {}", i);
        }
        for (i, o) in self.values.iter().enumerate() {
            let expected = 1 + stored.clone().filter(|&(_, v)| v == Some(i)).count();
            prop_assert_eq!(CountingRuntime::ref_count(o.handle()), expected, "value {}", i);
        }
        let defaults = stored.filter(|&(_, v)| v.is_none()).count();
        prop_assert_eq!(CountingRuntime::ref_count(CountingRuntime::none()), none_base + defaults);
        Ok(())
    }
}

// Property: reference-count conservation on a handle-to-handle map.
// Every object's count equals its owner references plus one per slot the
// map stores it in, after every operation and after the map is dropped.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_map_conserves_references(ops in arb_ops()) {
        let pools = Pools::new();
        let none_base = CountingRuntime::ref_count(CountingRuntime::none());
        let _lock = handle_btree::LockGuard::<Rt>::acquire();
        let mut sut = BTreeMap::<Rt, H, H>::new();
        let mut model: Model<usize, Option<usize>> = Model::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let (_, inserted) = sut.insert(pools.key(k), pools.value(v));
                    prop_assert_eq!(inserted, !model.contains_key(&k));
                    model.entry(k).or_insert(Some(v));
                }
                Op::Assign(k, v) => {
                    let (_, created) = sut.insert_or_assign(pools.key(k), pools.value(v));
                    prop_assert_eq!(created, model.insert(k, Some(v)).is_none());
                }
                Op::GetItem(k) => {
                    let expected = *model.entry(k).or_insert(None);
                    let got = sut.get_item(pools.key(k)).handle();
                    let want = expected.map_or(CountingRuntime::none(), |v| pools.value(v));
                    prop_assert_eq!(got, want);
                }
                Op::Erase(k) => {
                    let erased = sut.erase(&pools.key(k));
                    prop_assert_eq!(erased, usize::from(model.remove(&k).is_some()));
                }
                Op::RemoveFirst => {
                    let removed = sut.remove(sut.begin());
                    prop_assert_eq!(removed.is_ok(), model.pop_first().is_some());
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            pools.check(model.iter().map(|(&k, &v)| (k, v)), none_base)?;
        }

        drop(sut);
        pools.check(std::iter::empty(), none_base)?;
    }
}

// Property: conservation on a handle-to-handle multimap, where one key
// may be stored many times and erase drops whole equal ranges.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_multimap_conserves_references(ops in arb_ops()) {
        let pools = Pools::new();
        let none_base = CountingRuntime::ref_count(CountingRuntime::none());
        let _lock = handle_btree::LockGuard::<Rt>::acquire();
        let mut sut = BTreeMultimap::<Rt, H, H>::new();
        // Kept in container order: by key, then insertion.
        let mut model: Vec<(usize, usize)> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(k, v) | Op::Assign(k, v) => {
                    sut.insert(pools.key(k), pools.value(v));
                    let at = model.iter().position(|&(mk, _)| mk > k).unwrap_or(model.len());
                    model.insert(at, (k, v));
                }
                Op::GetItem(k) => {
                    let expected = model.iter().filter(|&&(mk, _)| mk == k).count();
                    prop_assert_eq!(sut.count(&pools.key(k)), expected);
                }
                Op::Erase(k) => {
                    let before = model.len();
                    model.retain(|&(mk, _)| mk != k);
                    prop_assert_eq!(sut.erase(&pools.key(k)), before - model.len());
                }
                Op::RemoveFirst => {
                    let removed = sut.remove(sut.begin());
                    prop_assert_eq!(removed.is_ok(), !model.is_empty());
                    if !model.is_empty() {
                        model.remove(0);
                    }
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            let order: Vec<(H, H)> = sut.iter().map(|(k, v)| (k.handle(), v.handle())).collect();
            let expected: Vec<(H, H)> = model.iter().map(|&(k, v)| (pools.key(k), pools.value(v))).collect();
            prop_assert_eq!(order, expected);
            pools.check(model.iter().map(|&(k, v)| (k, Some(v))), none_base)?;
        }

        drop(sut);
        pools.check(std::iter::empty(), none_base)?;
    }
}
