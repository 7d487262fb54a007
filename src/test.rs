use crate::{InsertOutcome, RadixTree, SeekOp};

fn collect_forward<V: Clone>(tree: &RadixTree<V>) -> Vec<(Vec<u8>, V)> {
    let mut it = tree.iter();
    let mut out = Vec::new();
    if !it.seek(tree, SeekOp::First, b"").unwrap() {
        return out;
    }
    loop {
        let (k, v) = it.current(tree).unwrap();
        out.push((k.to_vec(), v.clone()));
        if !it.next(tree).unwrap() {
            break;
        }
    }
    out
}

fn collect_backward<V: Clone>(tree: &RadixTree<V>) -> Vec<(Vec<u8>, V)> {
    let mut it = tree.iter();
    let mut out = Vec::new();
    if !it.seek(tree, SeekOp::Last, b"").unwrap() {
        return out;
    }
    loop {
        let (k, v) = it.current(tree).unwrap();
        out.push((k.to_vec(), v.clone()));
        if !it.prev(tree).unwrap() {
            break;
        }
    }
    out
}

#[test]
fn empty_tree_has_no_keys() {
    let tree: RadixTree<u32> = RadixTree::new();
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.get(b"anything"), None);
    assert_eq!(collect_forward(&tree), Vec::new());
}

#[test]
fn insert_and_get_single_key() {
    let mut tree = RadixTree::new();
    assert!(matches!(tree.insert(b"hello", 1).unwrap(), InsertOutcome::Inserted));
    assert_eq!(tree.get(b"hello"), Some(&1));
    assert_eq!(tree.get(b"hell"), None);
    assert_eq!(tree.get(b"helloo"), None);
}

#[test]
fn insert_shares_a_compressed_prefix_then_splits_on_divergence() {
    // foo / foobar / footer: "foo" starts as a single compressed chain,
    // then the second and third inserts force a split at the 'b'/'t' byte.
    let mut tree = RadixTree::new();
    tree.insert(b"foo", 1).unwrap();
    tree.insert(b"foobar", 2).unwrap();
    tree.insert(b"footer", 3).unwrap();

    assert_eq!(tree.get(b"foo"), Some(&1));
    assert_eq!(tree.get(b"foobar"), Some(&2));
    assert_eq!(tree.get(b"footer"), Some(&3));
    assert_eq!(tree.get(b"foob"), None);
    assert_eq!(tree.len(), 3);

    assert_eq!(
        collect_forward(&tree),
        vec![
            (b"foo".to_vec(), 1),
            (b"foobar".to_vec(), 2),
            (b"footer".to_vec(), 3),
        ]
    );
}

#[test]
fn insert_where_a_shorter_key_is_a_prefix_of_a_longer_one() {
    let mut tree = RadixTree::new();
    tree.insert(b"user", 1).unwrap();
    tree.insert(b"us", 2).unwrap();
    assert_eq!(tree.get(b"user"), Some(&1));
    assert_eq!(tree.get(b"us"), Some(&2));
    assert_eq!(tree.get(b"u"), None);
}

#[test]
fn insert_replaces_existing_value_and_reports_the_old_one() {
    let mut tree = RadixTree::new();
    tree.insert(b"key", 1).unwrap();
    match tree.insert(b"key", 2).unwrap() {
        InsertOutcome::Replaced(old) => assert_eq!(old, 1),
        _ => panic!("expected Replaced"),
    }
    assert_eq!(tree.get(b"key"), Some(&2));
    assert_eq!(tree.len(), 1);
}

#[test]
fn try_insert_leaves_existing_value_untouched() {
    let mut tree = RadixTree::new();
    tree.insert(b"key", 1).unwrap();
    match tree.try_insert(b"key", 2).unwrap() {
        InsertOutcome::AlreadyExists(v) => assert_eq!(*v, 1),
        _ => panic!("expected AlreadyExists"),
    }
    assert_eq!(tree.get(b"key"), Some(&1));
}

#[test]
fn remove_leaf_key_merges_the_now_single_child_sibling_chain() {
    // Inserting "first" and "foo" under a shared root branch, then
    // removing "first" should leave the remaining "foo" chain
    // recompressed back into a single node.
    let mut tree = RadixTree::new();
    tree.insert(b"first", 1).unwrap();
    tree.insert(b"foo", 2).unwrap();

    let nodes_before = tree.num_nodes();
    assert_eq!(tree.remove(b"first"), Some(1));
    assert_eq!(tree.get(b"first"), None);
    assert_eq!(tree.get(b"foo"), Some(&2));
    assert!(tree.num_nodes() < nodes_before);
}

#[test]
fn remove_nonexistent_key_is_a_no_op() {
    let mut tree = RadixTree::new();
    tree.insert(b"a", 1).unwrap();
    assert_eq!(tree.remove(b"b"), None);
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_key_that_is_a_prefix_of_another_key_keeps_the_longer_one() {
    let mut tree = RadixTree::new();
    tree.insert(b"foo", 1).unwrap();
    tree.insert(b"foobar", 2).unwrap();
    assert_eq!(tree.remove(b"foo"), Some(1));
    assert_eq!(tree.get(b"foo"), None);
    assert_eq!(tree.get(b"foobar"), Some(&2));
}

#[test]
fn remove_every_key_collapses_back_to_an_empty_tree() {
    let mut tree = RadixTree::new();
    for (k, v) in [(b"foo".as_slice(), 1), (b"foobar", 2), (b"footer", 3)] {
        tree.insert(k, v).unwrap();
    }
    assert_eq!(tree.remove(b"foo"), Some(1));
    assert_eq!(tree.remove(b"foobar"), Some(2));
    assert_eq!(tree.remove(b"footer"), Some(3));
    assert!(tree.is_empty());
    assert_eq!(tree.num_nodes(), 1); // root only
}

#[test]
fn long_key_chain_exceeding_a_single_node_still_round_trips() {
    // Inserting a key much longer than a single node's inline capacity
    // exercises the node's heap-spilled compression path even without
    // approaching the 2^29 hard limit.
    let mut tree = RadixTree::new();
    let long_key: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
    tree.insert(&long_key, 42).unwrap();
    assert_eq!(tree.get(&long_key), Some(&42));
    assert_eq!(tree.get(&long_key[..long_key.len() - 1]), None);
}

#[test]
#[ignore = "allocates a >2^29-byte key; run explicitly with --ignored"]
fn key_longer_than_max_compressed_len_chains_across_nodes() {
    let long_key: Vec<u8> = (0..(1usize << 29) + 50).map(|i| (i % 251) as u8).collect();
    let mut tree = RadixTree::new();
    tree.insert(&long_key, 1).unwrap();
    assert_eq!(tree.get(&long_key), Some(&1));
    assert!(tree.num_nodes() >= 2);
}

#[test]
fn forward_and_backward_iteration_agree_on_sorted_order() {
    let mut tree = RadixTree::new();
    let keys: &[&[u8]] = &[b"banana", b"band", b"can", b"candy", b"a", b"b"];
    for (i, k) in keys.iter().enumerate() {
        tree.insert(k, i).unwrap();
    }

    let forward = collect_forward(&tree);
    let mut expected = forward.clone();
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(forward, expected);

    let mut backward = collect_backward(&tree);
    backward.reverse();
    assert_eq!(backward, expected);
}

#[test]
fn seek_operators_find_the_expected_boundary_element() {
    let mut tree = RadixTree::new();
    for k in [b"b".as_slice(), b"d", b"f", b"h"] {
        tree.insert(k, ()).unwrap();
    }

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Eq, b"d").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"d");

    let mut it = tree.iter();
    assert!(!it.seek(&tree, SeekOp::Eq, b"c").unwrap());

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Ge, b"c").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"d");

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Ge, b"d").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"d");

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Gt, b"d").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"f");

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Le, b"e").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"d");

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Lt, b"d").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"b");

    let mut it = tree.iter();
    assert!(!it.seek(&tree, SeekOp::Lt, b"b").unwrap());

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::First, b"").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"b");

    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Last, b"").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"h");
}

#[test]
fn seeking_past_every_key_reaches_end_of_iteration() {
    let mut tree = RadixTree::new();
    tree.insert(b"a", 1).unwrap();
    let mut it = tree.iter();
    assert!(!it.seek(&tree, SeekOp::Gt, b"z").unwrap());
    assert!(it.is_eof());
}

#[test]
fn prefix_scan_matches_only_keys_starting_with_the_prefix() {
    let mut tree: RadixTree<u32> = RadixTree::new();
    for (k, v) in [(b"car".as_slice(), 1), (b"cart", 2), (b"carton", 3), (b"cats", 4)] {
        tree.insert(k, v).unwrap();
    }

    let mut it = tree.iter();
    let prefix = b"car";
    let mut hits = Vec::new();
    if it.seek(&tree, SeekOp::Ge, prefix).unwrap() {
        loop {
            let (k, v) = it.current(&tree).unwrap();
            if !k.starts_with(prefix) {
                break;
            }
            hits.push((k.to_vec(), *v));
            if !it.next(&tree).unwrap() {
                break;
            }
        }
    }
    assert_eq!(
        hits,
        vec![
            (b"car".to_vec(), 1),
            (b"cart".to_vec(), 2),
            (b"carton".to_vec(), 3),
        ]
    );
}

#[test]
fn random_walk_with_a_deterministic_chooser_always_lands_on_a_key() {
    let mut tree = RadixTree::new();
    for k in [b"alpha".as_slice(), b"alb", b"beta", b"bob"] {
        tree.insert(k, ()).unwrap();
    }
    let mut it = tree.iter();
    // Always take the first available choice: deterministic and
    // guaranteed to terminate on some key since every node's "stop here"
    // option is offered before its children when it has one.
    assert!(it.random_walk(&tree, |_n| 0).unwrap());
    assert!(tree.get(it.current(&tree).unwrap().0).is_some());
}

#[test]
fn size_mirrors_len_and_touch_visits_every_node() {
    let mut tree: RadixTree<u32> = RadixTree::new();
    for (k, v) in [(b"foo".as_slice(), 1), (b"foobar", 2), (b"footer", 3)] {
        tree.insert(k, v).unwrap();
    }
    assert_eq!(tree.size(), tree.len() as u64);
    // Not a meaningful value on its own, but every node must contribute
    // something nonzero to the sum (each has a nonzero index or a
    // nonempty compression), so a tree with several nodes can't land on 0.
    assert_ne!(tree.touch(), 0);
}

#[test]
fn remove_prefix_excises_the_whole_matching_subtree() {
    let mut tree: RadixTree<u32> = RadixTree::new();
    for (k, v) in [(b"car".as_slice(), 1), (b"cart", 2), (b"carton", 3), (b"cats", 4)] {
        tree.insert(k, v).unwrap();
    }
    assert_eq!(tree.remove_prefix(b"car"), 3);
    assert_eq!(tree.get(b"car"), None);
    assert_eq!(tree.get(b"cart"), None);
    assert_eq!(tree.get(b"carton"), None);
    assert_eq!(tree.get(b"cats"), Some(&4));
    assert_eq!(tree.len(), 1);
}

#[test]
fn remove_prefix_on_the_empty_prefix_clears_the_tree() {
    let mut tree: RadixTree<u32> = RadixTree::new();
    tree.insert(b"a", 1).unwrap();
    tree.insert(b"b", 2).unwrap();
    assert_eq!(tree.remove_prefix(b""), 2);
    assert!(tree.is_empty());
    assert_eq!(tree.num_nodes(), 1);
}

#[test]
fn compare_reports_the_cursors_position_relative_to_a_key_without_moving_it() {
    let mut tree = RadixTree::new();
    for k in [b"b".as_slice(), b"d", b"f"] {
        tree.insert(k, ()).unwrap();
    }
    let mut it = tree.iter();
    assert!(it.seek(&tree, SeekOp::Eq, b"d").unwrap());

    assert!(it.compare(SeekOp::Eq, b"d"));
    assert!(!it.compare(SeekOp::Eq, b"b"));
    assert!(it.compare(SeekOp::Gt, b"b"));
    assert!(it.compare(SeekOp::Ge, b"d"));
    assert!(it.compare(SeekOp::Lt, b"f"));
    assert!(it.compare(SeekOp::Le, b"d"));
    assert!(!it.compare(SeekOp::Gt, b"f"));

    // Comparing doesn't move the cursor: it still reads "d" afterwards.
    assert_eq!(it.current(&tree).unwrap().0, b"d");
}

#[test]
fn safe_iterator_tolerates_mutation_between_steps() {
    let mut tree = RadixTree::new();
    for k in [b"a".as_slice(), b"b", b"c", b"d", b"e"] {
        tree.insert(k, ()).unwrap();
    }

    let mut it = tree.iter_safe();
    assert!(it.seek(&tree, SeekOp::First, b"").unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"a");
    assert!(it.next(&tree).unwrap());
    assert_eq!(it.current(&tree).unwrap().0, b"b");

    // Mutate the tree while the cursor is parked on "b": nothing about
    // `it`'s type holds a borrow of `tree`, so this is an ordinary `&mut`
    // call, not a borrow-checker violation.
    tree.insert(b"aa", ()).unwrap();
    tree.remove(b"c").unwrap();

    let mut seen = Vec::new();
    loop {
        seen.push(it.current(&tree).unwrap().0.to_vec());
        if !it.next(&tree).unwrap() {
            break;
        }
    }

    // "b" itself was already reported before the mutation; what's left
    // must cover "d" and "e" exactly once each, "aa" at most once (it may
    // or may not fall after the cursor's current position), and "c" never
    // (it was removed before the cursor reached it again).
    assert!(!seen.contains(&b"c".to_vec()));
    assert_eq!(seen.iter().filter(|k| k.as_slice() == b"d").count(), 1);
    assert_eq!(seen.iter().filter(|k| k.as_slice() == b"e").count(), 1);
    assert!(seen.iter().filter(|k| k.as_slice() == b"aa").count() <= 1);
}

#[test]
fn unsafe_iterator_rebuilt_after_mutation_still_reads_current_state() {
    // The unsafe cursor makes no promise about surviving mutation mid
    // traversal, but starting a *fresh* one after mutating (the common
    // "snapshot, mutate, look again" pattern) must see the new state,
    // since it never cached anything from before the mutation.
    let mut tree = RadixTree::new();
    tree.insert(b"a", 1).unwrap();
    tree.insert(b"b", 2).unwrap();

    tree.insert(b"c", 3).unwrap();
    tree.remove(b"a").unwrap();

    assert_eq!(
        collect_forward(&tree),
        vec![(b"b".to_vec(), 2), (b"c".to_vec(), 3)]
    );
}

#[test]
fn bytes_convenience_layer_mirrors_generic_behavior() {
    use bytes::Bytes;
    use crate::BytesRadixTree;

    let mut tree = BytesRadixTree::new();
    tree.set(b"a/1", Bytes::from_static(b"one")).unwrap();
    tree.set(b"a/2", Bytes::from_static(b"two")).unwrap();
    tree.set(b"b/1", Bytes::from_static(b"three")).unwrap();

    assert_eq!(tree.get(b"a/1"), Some(Bytes::from_static(b"one")));
    assert_eq!(tree.getn(b"a/").len(), 2);
    assert_eq!(tree.deln(b"a/"), 2);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.del(b"b/1"), Some(Bytes::from_static(b"three")));
    assert!(tree.is_empty());
}
