//! Oracle-based randomized testing: every operation applied to a
//! [`RadixTree`] is mirrored on a `BTreeMap`, and the two are checked for
//! agreement after each step.
//!
//! Grounded in `triblespace-tribles-rust`'s use of `proptest` as a
//! dev-dependency for exactly this kind of model-based check.

use std::collections::BTreeMap;

use proptest::collection::vec as pvec;
use proptest::prelude::*;

use crate::{InsertOutcome, RadixTree, SeekOp};

#[derive(Debug, Clone)]
enum Op {
    Insert(Vec<u8>, i64),
    Remove(Vec<u8>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = pvec(0u8..4, 0..6);
    prop_oneof![
        (key.clone(), any::<i64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        key.prop_map(Op::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn matches_a_btreemap_under_random_inserts_and_removes(ops in pvec(op_strategy(), 0..200)) {
        let mut tree: RadixTree<i64> = RadixTree::new();
        let mut model: BTreeMap<Vec<u8>, i64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let outcome = tree.insert(&k, v).unwrap();
                    let existed = model.insert(k.clone(), v);
                    match (outcome, existed) {
                        (InsertOutcome::Inserted, None) => {}
                        (InsertOutcome::Replaced(old), Some(prev)) => prop_assert_eq!(old, prev),
                        (outcome, existed) => prop_assert!(
                            false,
                            "insert outcome did not match prior presence (existed={}, outcome was Inserted={})",
                            existed.is_some(),
                            matches!(outcome, InsertOutcome::Inserted),
                        ),
                    }
                }
                Op::Remove(k) => {
                    let removed = tree.remove(&k);
                    let expected = model.remove(&k);
                    prop_assert_eq!(removed, expected);
                }
            }

            prop_assert_eq!(tree.len(), model.len());
            for (k, v) in &model {
                prop_assert_eq!(tree.get(k), Some(v));
            }
        }

        let mut forward = Vec::new();
        let mut it = tree.iter();
        if it.seek(&tree, SeekOp::First, b"").unwrap() {
            loop {
                let (k, v) = it.current(&tree).unwrap();
                forward.push((k.to_vec(), *v));
                if !it.next(&tree).unwrap() {
                    break;
                }
            }
        }
        let expected: Vec<_> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(forward, expected);
    }

    #[test]
    fn seek_ge_matches_a_btreemap_range_query(
        entries in pvec((pvec(0u8..4, 0..6), any::<i64>()), 0..80),
        target in pvec(0u8..4, 0..6),
    ) {
        let mut tree: RadixTree<i64> = RadixTree::new();
        let mut model: BTreeMap<Vec<u8>, i64> = BTreeMap::new();
        for (k, v) in entries {
            tree.insert(&k, v).unwrap();
            model.insert(k, v);
        }

        let expected = model.range(target.clone()..).next().map(|(k, v)| (k.clone(), *v));
        let mut it = tree.iter();
        let found = it.seek(&tree, SeekOp::Ge, &target).unwrap();
        let actual = if found {
            let (k, v) = it.current(&tree).unwrap();
            Some((k.to_vec(), *v))
        } else {
            None
        };
        prop_assert_eq!(actual, expected);
    }
}
