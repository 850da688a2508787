//! Property-based tests for determinism guarantees

use dagfs::dag::{hash_node, Chunker};
use dagfs::ops;
use dagfs::{DagNode, MemoryBlockStore, OpenFlags, Root, RootOptions};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn file_entries() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    proptest::collection::btree_map("[a-z]{1,6}", proptest::collection::vec(any::<u8>(), 0..32), 1..10)
}

fn build_root(entries: &[(String, Vec<u8>)], chunker: Chunker) -> Arc<Root> {
    let options = RootOptions {
        chunker,
        ..RootOptions::default()
    };
    let root = Root::with_options(
        Arc::new(MemoryBlockStore::new()),
        DagNode::empty_directory(),
        None,
        options,
    )
    .unwrap();
    for (name, data) in entries {
        let path = format!("/{}", name);
        ops::put_node(&root, &path, DagNode::empty_file()).unwrap();
        let file = ops::lookup(&root, &path).unwrap().into_file().unwrap();
        let mut fd = file.open(OpenFlags::write_only()).unwrap();
        fd.write(data).unwrap();
        fd.close().unwrap();
    }
    root
}

/// Root hash depends on content, not on the order entries were created in
#[test]
fn test_root_hash_independent_of_insertion_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&file_entries(), |entries| {
            let forward: Vec<(String, Vec<u8>)> = entries.into_iter().collect();
            let mut backward = forward.clone();
            backward.reverse();

            let a = build_root(&forward, Chunker::default()).flush().unwrap();
            let b = build_root(&backward, Chunker::default()).flush().unwrap();
            prop_assert_eq!(a, b);
            Ok(())
        })
        .unwrap();
}

/// Content read back does not depend on how it was chunked
#[test]
fn test_content_independent_of_chunk_size() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(proptest::collection::vec(any::<u8>(), 0..200), 1usize..64),
            |(data, chunk_size)| {
                let entries = vec![("f".to_string(), data.clone())];
                let root = build_root(&entries, Chunker::new(chunk_size, false));
                root.flush().unwrap();

                let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();
                prop_assert_eq!(file.size().unwrap(), data.len() as u64);
                let mut fd = file.open(OpenFlags::read_only()).unwrap();
                prop_assert_eq!(fd.read_to_end().unwrap(), data);
                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    #[test]
    fn prop_node_hash_is_stable(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let node = DagNode::Raw(data);
        prop_assert_eq!(hash_node(&node).unwrap(), hash_node(&node.clone()).unwrap());
    }
}
