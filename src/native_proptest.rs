#![cfg(test)]

// Property tests for NativeTree kept inside the crate so they do not
// require feature gates to reach the structural layer.

use crate::native::{NativeTree, Pos};
use crate::order::Comparator;
use proptest::prelude::*;

// Keys 0..4 are equivalent, 4..8 are, and so on: equivalence is coarser
// than equality, the way a host's rich comparison can be.
struct Coarse;

impl Comparator<u8> for Coarse {
    fn less(a: &u8, b: &u8) -> bool {
        a / 4 < b / 4
    }
}

type Tree = NativeTree<u8, u32, Coarse>;

// Model of the tree in container order: (key, value, position).
type Model = Vec<(u8, u32, Pos)>;

#[derive(Clone, Debug)]
enum Op {
    InsertUnique(u8),
    InsertMulti(u8),
    Remove(usize),
    EraseKey(u8),
    Probe(u8),
    Walk,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0u8..32).prop_map(Op::InsertUnique),
        (0u8..32).prop_map(Op::InsertMulti),
        any::<usize>().prop_map(Op::Remove),
        (0u8..32).prop_map(Op::EraseKey),
        (0u8..32).prop_map(Op::Probe),
        Just(Op::Walk),
    ];
    proptest::collection::vec(op, 1..80)
}

fn class(k: u8) -> u8 {
    k / 4
}

fn lower(model: &Model, k: u8) -> usize {
    model
        .iter()
        .position(|e| class(e.0) >= class(k))
        .unwrap_or(model.len())
}

fn upper(model: &Model, k: u8) -> usize {
    model
        .iter()
        .position(|e| class(e.0) > class(k))
        .unwrap_or(model.len())
}

fn pos_at(model: &Model, i: usize) -> Pos {
    model.get(i).map_or(Pos::END, |e| e.2)
}

// Property: state-machine equivalence against a sorted Vec.
// - Unique inserts are rejected when an equivalent key exists and report
//   the blocking element; multi inserts land after every equivalent key.
// - Bounds, find, count and equal_range agree with the model.
// - Removal hands back the element and its successor; drained ranges come
//   back in order.
// - Forward and backward walks visit the model's positions.
// - Positions of erased elements never resolve again.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        let mut sut = Tree::new();
        let mut model: Model = Vec::new();
        let mut stale: Vec<Pos> = Vec::new();
        let mut next_value = 0u32;

        for op in ops {
            match op {
                Op::InsertUnique(k) => {
                    next_value += 1;
                    let (lo, hi) = (lower(&model, k), upper(&model, k));
                    let (p, inserted) = sut.insert_unique(k, next_value);
                    if lo < hi {
                        prop_assert!(!inserted, "equivalent key must block insert");
                        prop_assert_eq!(p, model[lo].2);
                    } else {
                        prop_assert!(inserted);
                        model.insert(lo, (k, next_value, p));
                    }
                }
                Op::InsertMulti(k) => {
                    next_value += 1;
                    let p = sut.insert_multi(k, next_value);
                    let at = upper(&model, k);
                    model.insert(at, (k, next_value, p));
                }
                Op::Remove(i) => {
                    if model.is_empty() {
                        prop_assert!(sut.remove(Pos::END).is_none());
                    } else {
                        let idx = i % model.len();
                        let (k, v, p) = model.remove(idx);
                        let (rk, rv, next) = sut.remove(p).expect("live position removes");
                        prop_assert_eq!((rk, rv), (k, v));
                        prop_assert_eq!(next, pos_at(&model, idx));
                        stale.push(p);
                    }
                }
                Op::EraseKey(k) => {
                    let (lo, hi) = (lower(&model, k), upper(&model, k));
                    let (first, last) = sut.equal_range(&k);
                    prop_assert_eq!((first, last), (pos_at(&model, lo), pos_at(&model, hi)));
                    let drained = sut.drain_range(first, last);
                    let expected: Vec<(u8, u32)> = model
                        .drain(lo..hi)
                        .map(|(k, v, p)| {
                            stale.push(p);
                            (k, v)
                        })
                        .collect();
                    prop_assert_eq!(drained, expected);
                }
                Op::Probe(k) => {
                    let (lo, hi) = (lower(&model, k), upper(&model, k));
                    prop_assert_eq!(sut.lower_bound(&k), pos_at(&model, lo));
                    prop_assert_eq!(sut.upper_bound(&k), pos_at(&model, hi));
                    let found = if lo < hi { pos_at(&model, lo) } else { Pos::END };
                    prop_assert_eq!(sut.find(&k), found);
                    prop_assert_eq!(sut.count(&k), hi - lo);
                    prop_assert_eq!(sut.contains(&k), lo < hi);
                }
                Op::Walk => {
                    let expected: Vec<Pos> = model.iter().map(|e| e.2).collect();
                    let mut forward = Vec::new();
                    let mut at = sut.begin();
                    while !at.is_end() {
                        forward.push(at);
                        at = sut.next(at).expect("live position advances");
                    }
                    prop_assert_eq!(&forward, &expected);
                    let mut backward = Vec::new();
                    let mut at = sut.end();
                    while let Some(p) = sut.prev(at) {
                        backward.push(p);
                        at = p;
                    }
                    backward.reverse();
                    prop_assert_eq!(&backward, &expected);
                }
            }

            // Post-conditions after each op
            for &p in &stale {
                prop_assert!(!sut.is_valid(p));
                prop_assert!(sut.get(p).is_none());
            }
            prop_assert_eq!(sut.len(), model.len());
            let seen: Vec<(u8, u32, Pos)> = sut.iter().map(|(p, k, v)| (*k, *v, p)).collect();
            prop_assert_eq!(seen, model.clone());
        }
    }
}
