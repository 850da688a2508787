//! Path-level move semantics

use crate::integration::test_utils::memory_root;
use dagfs::error::IllegalMove;
use dagfs::ops::{self, MkdirOptions};
use dagfs::{DagNode, FsError, Root};
use std::sync::Arc;

fn tree() -> Arc<Root> {
    let (_store, root) = memory_root();
    ops::mkdir(&root, "/dirA", MkdirOptions::default()).unwrap();
    ops::mkdir(&root, "/dirB/inner", MkdirOptions { create_parents: true, flush: false }).unwrap();
    ops::put_node(&root, "/fileA", DagNode::Raw(b"a".to_vec())).unwrap();
    ops::put_node(&root, "/fileB", DagNode::Raw(b"b".to_vec())).unwrap();
    root
}

fn content(root: &Root, path: &str) -> Vec<u8> {
    let file = ops::lookup(root, path).unwrap().into_file().unwrap();
    let mut fd = file.open(dagfs::OpenFlags::read_only()).unwrap();
    fd.read_to_end().unwrap()
}

#[test]
fn directory_into_own_subtree_is_rejected() {
    let root = tree();
    let err = ops::mv(&root, "/dirB", "/dirB/inner/moved").unwrap_err();
    assert!(matches!(err, FsError::IllegalMove(IllegalMove::ParentIntoChild)));
    let err = ops::mv(&root, "/dirB", "/dirB").unwrap_err();
    assert!(matches!(err, FsError::IllegalMove(IllegalMove::ParentIntoChild)));
    assert!(ops::lookup(&root, "/dirB/inner").unwrap().is_dir());
}

#[test]
fn moving_root_is_rejected() {
    let root = tree();
    let err = ops::mv(&root, "/", "/dirA").unwrap_err();
    assert!(matches!(err, FsError::IllegalMove(IllegalMove::ParentIntoChild)));
}

#[test]
fn trailing_separator_on_file_source_is_rejected() {
    let root = tree();
    let err = ops::mv(&root, "/fileA/", "/dirA").unwrap_err();
    assert!(matches!(err, FsError::InvalidPath(_)));
    assert!(ops::lookup(&root, "/fileA").is_ok());
}

#[test]
fn directory_onto_file_is_rejected() {
    let root = tree();
    let err = ops::mv(&root, "/dirB", "/fileA").unwrap_err();
    assert!(matches!(err, FsError::IllegalMove(IllegalMove::DirOntoFile)));
    assert!(ops::lookup(&root, "/dirB").unwrap().is_dir());
}

#[test]
fn file_into_existing_directory_keeps_name() {
    let root = tree();
    ops::mv(&root, "/fileA", "/dirA").unwrap();
    assert!(ops::lookup(&root, "/fileA").unwrap_err().is_not_found());
    assert_eq!(content(&root, "/dirA/fileA"), b"a");
}

#[test]
fn trailing_separator_destination_places_inside() {
    let root = tree();
    ops::mv(&root, "/fileB", "/dirB/inner/").unwrap();
    assert_eq!(content(&root, "/dirB/inner/fileB"), b"b");
}

#[test]
fn file_replaces_file() {
    let root = tree();
    ops::mv(&root, "/fileA", "/fileB").unwrap();
    assert!(ops::lookup(&root, "/fileA").unwrap_err().is_not_found());
    assert_eq!(content(&root, "/fileB"), b"a");
}

#[test]
fn rename_directory_carries_subtree() {
    let root = tree();
    ops::mv(&root, "/dirB", "/renamed").unwrap();
    assert!(ops::lookup(&root, "/renamed/inner").unwrap().is_dir());
    assert!(ops::lookup(&root, "/dirB").unwrap_err().is_not_found());
}

#[test]
fn move_onto_itself_is_noop() {
    let root = tree();
    ops::mv(&root, "/fileA", "/fileA").unwrap();
    assert_eq!(content(&root, "/fileA"), b"a");
}

#[test]
fn missing_source_is_not_found() {
    let root = tree();
    let err = ops::mv(&root, "/nope", "/dirA").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn directory_onto_its_own_parent_is_noop() {
    let root = tree();
    ops::put_node(&root, "/dirA/f", DagNode::Raw(b"kept".to_vec())).unwrap();

    ops::mv(&root, "/dirA", "/").unwrap();
    ops::mv(&root, "/dirB/inner", "/dirB/").unwrap();
    ops::mv(&root, "/dirB/inner", "/dirB").unwrap();

    assert_eq!(content(&root, "/dirA/f"), b"kept");
    assert!(ops::lookup(&root, "/dirB/inner").unwrap().is_dir());
    assert_eq!(
        root.directory().list_names(),
        vec!["dirA", "dirB", "fileA", "fileB"]
    );
}

#[test]
fn directory_into_existing_sibling_directory() {
    let root = tree();
    ops::mv(&root, "/dirB", "/dirA").unwrap();
    assert!(ops::lookup(&root, "/dirA/dirB/inner").unwrap().is_dir());
    assert!(ops::lookup(&root, "/dirB").unwrap_err().is_not_found());
}
