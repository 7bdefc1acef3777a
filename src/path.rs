//! The path resolver (§4.D): longest-prefix preopen selection and relative
//! resolution within a preopen, with `..`-escape detection.

use crate::backend::{DirHandle, OpenOptions};
use crate::error::{Errno, Result, WasiError};
use crate::types::Fd;

/// Outcome of [`resolve_relative`]: either the preopen root itself (an empty
/// remainder), or a parent directory plus a leaf name still to be looked up
/// by the caller (the caller knows whether it wants a file, a directory, or
/// to remove the entry).
pub enum ResolvedPath {
    Root,
    Leaf {
        parent: Option<Box<dyn DirHandle>>,
        name: String,
    },
}

/// §4.D.1: resolves `path` (already relative to a preopen root) to a parent
/// directory and leaf name, normalising `.` and `..` and rejecting any `..`
/// that would escape above `root`.
pub async fn resolve_relative(root: &dyn DirHandle, path: &str) -> Result<ResolvedPath> {
    let mut stack: Vec<String> = Vec::new();
    for component in path.split('/') {
        if component.is_empty() || component == "." {
            continue;
        }
        if component == ".." {
            if stack.pop().is_none() {
                return Err(WasiError::with_path(Errno::Notcapable, path));
            }
            continue;
        }
        stack.push(component.to_string());
    }

    if stack.is_empty() {
        return Ok(ResolvedPath::Root);
    }

    let name = stack.pop().expect("non-empty stack");
    let mut current: Option<Box<dyn DirHandle>> = None;
    for component in &stack {
        let dir_ref: &dyn DirHandle = match &current {
            Some(boxed) => boxed.as_ref(),
            None => root,
        };
        let next = dir_ref
            .get_directory(component, OpenOptions::default())
            .await
            .map_err(|_| WasiError::with_path(Errno::Noent, path))?;
        current = Some(next);
    }

    Ok(ResolvedPath::Leaf {
        parent: current,
        name,
    })
}

/// §4.D.2: selects the longest-matching preopen for an absolute `path`,
/// returning its descriptor and the relative remainder (`"."` if `path`
/// names the preopen root itself).
pub fn select_preopen(preopens: &[(Fd, String)], path: &str) -> Result<(Fd, String)> {
    if !path.starts_with('/') {
        return Err(WasiError::with_path(Errno::Inval, path));
    }

    let mut best: Option<(usize, Fd, String)> = None;
    for (fd, prefix) in preopens.iter().rev() {
        let trimmed = prefix.trim_end_matches('/');
        let (matches, rel) = if trimmed.is_empty() {
            (true, path.trim_start_matches('/').to_string())
        } else if path == trimmed {
            (true, String::new())
        } else if path.starts_with(trimmed) && path.as_bytes().get(trimmed.len()) == Some(&b'/') {
            (true, path[trimmed.len() + 1..].to_string())
        } else {
            (false, String::new())
        };

        if !matches {
            continue;
        }

        let prefix_len = trimmed.len();
        let better = match &best {
            Some((best_len, ..)) => prefix_len > *best_len,
            None => true,
        };
        if better {
            best = Some((prefix_len, *fd, rel));
        }
    }

    match best {
        Some((_, fd, rel)) => {
            let rel = if rel.is_empty() { ".".to_string() } else { rel };
            Ok((fd, rel))
        }
        None => Err(WasiError::with_path(Errno::Noent, path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_backend::MemDir;

    #[test]
    fn longest_prefix_wins_regardless_of_registration_order() {
        let preopens = vec![(3, "/a".to_string()), (4, "/a/b".to_string())];
        let (fd, rel) = select_preopen(&preopens, "/a/b/c").unwrap();
        assert_eq!(fd, 4);
        assert_eq!(rel, "c");

        let preopens = vec![(3, "/a/b".to_string()), (4, "/a".to_string())];
        let (fd, rel) = select_preopen(&preopens, "/a/b/c").unwrap();
        assert_eq!(fd, 3);
        assert_eq!(rel, "c");
    }

    #[test]
    fn component_boundary_is_respected() {
        let preopens = vec![(3, "/a".to_string())];
        let err = select_preopen(&preopens, "/ab").unwrap_err();
        assert_eq!(err.errno, Errno::Noent);
    }

    #[test]
    fn trailing_slash_on_prefix_is_ignored() {
        let preopens = vec![(3, "/sandbox/".to_string())];
        let (fd, rel) = select_preopen(&preopens, "/sandbox/x").unwrap();
        assert_eq!(fd, 3);
        assert_eq!(rel, "x");
    }

    #[test]
    fn root_itself_becomes_dot() {
        let preopens = vec![(3, "/sandbox".to_string())];
        let (fd, rel) = select_preopen(&preopens, "/sandbox").unwrap();
        assert_eq!(fd, 3);
        assert_eq!(rel, ".");
    }

    #[test]
    fn non_absolute_path_is_inval() {
        let preopens = vec![(3, "/sandbox".to_string())];
        let err = select_preopen(&preopens, "relative/path").unwrap_err();
        assert_eq!(err.errno, Errno::Inval);
    }

    #[tokio::test]
    async fn dotdot_past_root_is_notcapable() {
        let root = MemDir::new();
        let err = resolve_relative(&root, "../etc/passwd").await.unwrap_err();
        assert_eq!(err.errno, Errno::Notcapable);
    }

    #[tokio::test]
    async fn dot_components_are_skipped() {
        let root = MemDir::new();
        root.seed_file("x.txt", b"hi".to_vec());
        match resolve_relative(&root, "./a/../x.txt").await.unwrap() {
            ResolvedPath::Leaf { parent, name } => {
                assert!(parent.is_none());
                assert_eq!(name, "x.txt");
            }
            ResolvedPath::Root => panic!("expected a leaf"),
        }
    }

    #[tokio::test]
    async fn empty_remainder_is_root() {
        let root = MemDir::new();
        match resolve_relative(&root, ".").await.unwrap() {
            ResolvedPath::Root => {}
            ResolvedPath::Leaf { .. } => panic!("expected root"),
        }
    }
}
