//! File descriptors through a root

use crate::integration::test_utils::{options, CountingStore};
use dagfs::dag::Chunker;
use dagfs::ops;
use dagfs::telemetry::NoopObserver;
use dagfs::{BlockStore, DagNode, OpenFlags, Root, RootOptions};
use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn small_chunk_root() -> (Arc<CountingStore>, Arc<Root>) {
    let store = CountingStore::new();
    let opts = RootOptions {
        chunker: Chunker::new(4, true),
        ..options(Arc::new(NoopObserver))
    };
    let root = Root::with_options(store.clone(), DagNode::empty_directory(), None, opts).unwrap();
    (store, root)
}

#[test]
fn multi_chunk_write_survives_reopen() {
    let (store, root) = small_chunk_root();
    ops::put_node(&root, "/f", DagNode::empty_file()).unwrap();
    let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();

    let mut fd = file.open(OpenFlags::write_only()).unwrap();
    fd.write(b"hello, chunked world").unwrap();
    fd.close().unwrap();

    match file.get_node() {
        DagNode::File { leaves, size } => {
            assert_eq!(size, 20);
            assert_eq!(leaves.len(), 5);
        }
        other => panic!("expected chunked file node, got {:?}", other),
    }

    let hash = root.flush().unwrap();
    let reopened = Root::with_options(
        store.clone(),
        store.get(&hash).unwrap(),
        None,
        RootOptions {
            chunker: Chunker::new(4, true),
            ..RootOptions::default()
        },
    )
    .unwrap();
    let file = ops::lookup(&reopened, "/f").unwrap().into_file().unwrap();
    assert_eq!(file.size().unwrap(), 20);

    let mut fd = file.open(OpenFlags::read_only()).unwrap();
    fd.seek(SeekFrom::Start(7)).unwrap();
    let mut buf = [0u8; 7];
    assert_eq!(fd.read(&mut buf).unwrap(), 7);
    assert_eq!(&buf, b"chunked");
}

#[test]
fn writer_excludes_readers_until_close() {
    let (_store, root) = small_chunk_root();
    ops::put_node(&root, "/f", DagNode::Raw(b"old".to_vec())).unwrap();
    let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();

    let mut writer = file.open(OpenFlags::read_write()).unwrap();
    writer.write(b"new").unwrap();

    let opened = AtomicBool::new(false);
    std::thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut fd = file.open(OpenFlags::read_only()).unwrap();
            opened.store(true, Ordering::SeqCst);
            fd.read_to_end().unwrap()
        });

        std::thread::sleep(Duration::from_millis(50));
        assert!(!opened.load(Ordering::SeqCst));
        writer.close().unwrap();

        assert_eq!(reader.join().unwrap(), b"new");
    });
}

#[test]
fn readers_share_the_file() {
    let (_store, root) = small_chunk_root();
    ops::put_node(&root, "/f", DagNode::Raw(b"shared".to_vec())).unwrap();
    let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();

    let mut a = file.open(OpenFlags::read_only()).unwrap();
    let mut b = file.open(OpenFlags::read_only()).unwrap();
    assert_eq!(a.read_to_end().unwrap(), b"shared");
    assert_eq!(b.read_to_end().unwrap(), b"shared");
}

#[test]
fn close_reports_new_content_to_directory() {
    let (_store, root) = small_chunk_root();
    ops::put_node(&root, "/f", DagNode::empty_file()).unwrap();
    let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();
    root.flush().unwrap();
    assert!(!root.directory().is_dirty());

    let mut fd = file.open(OpenFlags::write_only()).unwrap();
    fd.write(b"abc").unwrap();
    fd.close().unwrap();

    assert!(root.directory().is_dirty());
    let listing = root.directory().list();
    assert_eq!(listing[0].size, 3);
}

#[test]
fn dropped_writer_releases_lock() {
    let (_store, root) = small_chunk_root();
    ops::put_node(&root, "/f", DagNode::empty_file()).unwrap();
    let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();

    {
        let mut fd = file.open(OpenFlags::write_only()).unwrap();
        fd.write(b"xy").unwrap();
    }

    file.sync();
    let mut fd = file.open(OpenFlags::read_only()).unwrap();
    assert_eq!(fd.read_to_end().unwrap(), b"xy");
}

#[test]
fn write_on_read_only_descriptor_is_refused() {
    let (_store, root) = small_chunk_root();
    ops::put_node(&root, "/f", DagNode::Raw(b"ro".to_vec())).unwrap();
    let file = ops::lookup(&root, "/f").unwrap().into_file().unwrap();
    let mut fd = file.open(OpenFlags::read_only()).unwrap();
    assert!(matches!(fd.write(b"x"), Err(dagfs::FsError::NotPermitted(_))));
}
