//! Path operations
//!
//! Stateless helpers that address the tree by absolute `/`-separated paths.
//! They are built only from the public `Directory` and `File` operations.
//! Each component is NFC-normalised before lookup, so differently composed
//! spellings of a name address the same entry.

use crate::dag::DagNode;
use crate::error::{FsError, IllegalMove};
use crate::fs::{Directory, FsNode, Root};
use std::sync::Arc;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Options for [`mkdir`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MkdirOptions {
    /// Create missing intermediate directories, and accept an existing target
    pub create_parents: bool,
    /// Flush the new directory and every ancestor up to the root
    pub flush: bool,
}

/// Split an absolute path into normalised components.
///
/// A single trailing separator is accepted. `/` yields no components.
pub fn split_path(path: &str) -> Result<Vec<String>, FsError> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(FsError::InvalidPath(format!("{:?} is not absolute", path)));
    };
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    rest.split('/')
        .map(|component| match component {
            "" | "." | ".." => Err(FsError::InvalidPath(format!(
                "{:?} contains an empty, '.' or '..' component",
                path
            ))),
            name => Ok(name.nfc().collect()),
        })
        .collect()
}

fn join_path(parts: &[String]) -> String {
    format!("/{}", parts.join("/"))
}

/// Resolve `parts` as a chain of directories starting at the root.
///
/// The returned chain begins with the root directory and ends with the
/// directory named by the last component.
fn walk_dirs(
    root: &Root,
    parts: &[String],
    create_parents: bool,
) -> Result<Vec<Arc<Directory>>, FsError> {
    let mut chain = Vec::with_capacity(parts.len() + 1);
    chain.push(Arc::clone(root.directory()));

    for (i, part) in parts.iter().enumerate() {
        let current = Arc::clone(&chain[i]);
        let next = match current.child(part) {
            Ok(FsNode::Directory(dir)) => dir,
            Ok(FsNode::File(_)) => {
                return Err(FsError::TypeMismatch(format!(
                    "{} is not a directory",
                    join_path(&parts[..=i])
                )))
            }
            Err(e) if e.is_not_found() && create_parents => current.mkdir(part)?,
            Err(e) if e.is_not_found() => {
                return Err(FsError::NotFound(join_path(&parts[..=i])));
            }
            Err(e) => return Err(e),
        };
        chain.push(next);
    }
    Ok(chain)
}

/// Flush each directory of `chain`, deepest first.
fn flush_chain(chain: &[Arc<Directory>]) -> Result<(), FsError> {
    for dir in chain.iter().rev() {
        dir.flush()?;
    }
    Ok(())
}

fn resolve_child(dir: &Directory, name: &str, parts: &[String]) -> Result<FsNode, FsError> {
    dir.child(name).map_err(|e| match e {
        FsError::NotFound(_) => FsError::NotFound(join_path(parts)),
        other => other,
    })
}

/// Resolve any node by path
pub fn lookup(root: &Root, path: &str) -> Result<FsNode, FsError> {
    let parts = split_path(path)?;
    let Some((name, parents)) = parts.split_last() else {
        return Ok(FsNode::Directory(Arc::clone(root.directory())));
    };
    let chain = walk_dirs(root, parents, false)?;
    let parent = &chain[chain.len() - 1];
    resolve_child(parent, name, &parts)
}

/// Resolve a path that must name a directory
pub fn lookup_dir(root: &Root, path: &str) -> Result<Arc<Directory>, FsError> {
    match lookup(root, path)? {
        FsNode::Directory(dir) => Ok(dir),
        FsNode::File(_) => Err(FsError::TypeMismatch(format!(
            "{} is not a directory",
            path
        ))),
    }
}

/// Create a directory at `path`.
///
/// Without `create_parents` every ancestor must exist and the target must
/// not. With it, missing ancestors are created and an existing directory is
/// returned as is. A file in the way is always an error.
pub fn mkdir(root: &Root, path: &str, opts: MkdirOptions) -> Result<Arc<Directory>, FsError> {
    let parts = split_path(path)?;
    let Some((name, parents)) = parts.split_last() else {
        if opts.create_parents {
            return Ok(Arc::clone(root.directory()));
        }
        return Err(FsError::AlreadyExists("/".to_string()));
    };

    let chain = walk_dirs(root, parents, opts.create_parents)?;
    let parent = &chain[chain.len() - 1];

    if !opts.create_parents {
        match parent.child(name) {
            Ok(_) => return Err(FsError::AlreadyExists(join_path(&parts))),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }

    let dir = parent.mkdir(name).map_err(|e| match e {
        FsError::AlreadyExists(_) => FsError::AlreadyExists(join_path(&parts)),
        other => other,
    })?;

    if opts.flush {
        dir.flush()?;
        flush_chain(&chain)?;
    }
    debug!(path = %join_path(&parts), flush = opts.flush, "mkdir");
    Ok(dir)
}

/// Move the node at `src` to `dst`.
///
/// When `dst` ends in a separator, or names an existing directory, the node
/// is placed inside it under its current name. An existing file at the final
/// destination is replaced, unless the source is a directory.
pub fn mv(root: &Root, src: &str, dst: &str) -> Result<(), FsError> {
    let src_parts = split_path(src)?;
    let Some((src_name, src_parents)) = src_parts.split_last() else {
        return Err(IllegalMove::ParentIntoChild.into());
    };
    let dst_parts = split_path(dst)?;

    let src_dir = Arc::clone(&walk_dirs(root, src_parents, false)?[src_parents.len()]);
    let src_obj = resolve_child(&src_dir, src_name, &src_parts)?;

    if src.ends_with('/') && !src_obj.is_dir() {
        return Err(FsError::InvalidPath(format!("{} is not a directory", src)));
    }
    if src_obj.is_dir() && dst_parts.starts_with(&src_parts) {
        return Err(IllegalMove::ParentIntoChild.into());
    }

    let (dst_dir, mut dst_dir_parts, name) = match dst_parts.split_last() {
        Some((last, dst_parents)) if !dst.ends_with('/') => {
            let dir = Arc::clone(&walk_dirs(root, dst_parents, false)?[dst_parents.len()]);
            (dir, dst_parents.to_vec(), last.clone())
        }
        _ => (lookup_dir(root, dst)?, dst_parts.clone(), src_name.clone()),
    };

    // An existing directory at the destination receives the node, unless it
    // is the source itself.
    let (dst_dir, name) = match dst_dir.child(&name) {
        Ok(FsNode::Directory(existing))
            if !src_obj.as_dir().is_some_and(|dir| Arc::ptr_eq(dir, &existing)) =>
        {
            dst_dir_parts.push(name);
            (existing, src_name.clone())
        }
        Ok(_) => (dst_dir, name),
        Err(e) if e.is_not_found() => (dst_dir, name),
        Err(e) => return Err(e),
    };

    if src_obj.is_dir() && dst_dir_parts.starts_with(&src_parts) {
        return Err(IllegalMove::ParentIntoChild.into());
    }

    if Arc::ptr_eq(&src_dir, &dst_dir) && &name == src_name {
        return Ok(());
    }

    match dst_dir.child(&name) {
        Ok(FsNode::File(_)) if src_obj.is_dir() => {
            return Err(IllegalMove::DirOntoFile.into());
        }
        Ok(FsNode::Directory(_)) => {
            return Err(FsError::AlreadyExists(format!(
                "{}/{}",
                dst.trim_end_matches('/'),
                name
            )));
        }
        Ok(FsNode::File(_)) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let node = src_obj.get_node()?;
    dst_dir.set_child(&name, node)?;
    src_dir.remove_child(src_name)?;
    debug!(src = %join_path(&src_parts), dst = %dst, "mv");
    Ok(())
}

/// Link an already built node at `path`. The path must not exist.
pub fn put_node(root: &Root, path: &str, node: DagNode) -> Result<(), FsError> {
    let parts = split_path(path)?;
    let Some((name, parents)) = parts.split_last() else {
        return Err(FsError::InvalidPath("cannot replace the root".to_string()));
    };
    let chain = walk_dirs(root, parents, false)?;
    chain[chain.len() - 1]
        .add_child(name, node)
        .map_err(|e| match e {
            FsError::AlreadyExists(_) => FsError::AlreadyExists(join_path(&parts)),
            other => other,
        })
}

/// Unlink the node at `path`
pub fn remove(root: &Root, path: &str) -> Result<(), FsError> {
    let parts = split_path(path)?;
    let Some((name, parents)) = parts.split_last() else {
        return Err(FsError::InvalidPath("cannot remove the root".to_string()));
    };
    let chain = walk_dirs(root, parents, false)?;
    chain[chain.len() - 1].remove_child(name).map_err(|e| match e {
        FsError::NotFound(_) => FsError::NotFound(join_path(&parts)),
        other => other,
    })
}

/// Flush the node at `path` and every ancestor, then wait until the root
/// has been published.
pub async fn flush_path(root: &Root, path: &str) -> Result<DagNode, FsError> {
    let parts = split_path(path)?;
    let node = match parts.split_last() {
        Some((name, parents)) => {
            let chain = walk_dirs(root, parents, false)?;
            let target = resolve_child(&chain[chain.len() - 1], name, &parts)?;
            target.flush()?;
            flush_chain(&chain)?;
            target.get_node()?
        }
        None => {
            root.directory().flush()?;
            root.directory().get_node()?
        }
    };

    if let Some(repub) = root.republisher() {
        repub.wait_pub().await?;
    }
    Ok(node)
}
