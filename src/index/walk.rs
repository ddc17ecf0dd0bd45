//! Deterministic depth-first traversal of a backing store

use crate::store::{join_path, BackingStore, EntryKind};
use std::io;

/// Walk `root` and everything below it
///
/// The visitor is called for the root first, then for every entry
/// depth-first, children in name order. A directory that cannot be listed
/// is reported once with the listing error instead of its kind, and its
/// subtree is skipped. Returning `Err` from the visitor stops the walk.
pub fn walk<S, F, E>(store: &S, root: &str, mut visit: F) -> Result<(), E>
where
    S: BackingStore + ?Sized,
    F: FnMut(&str, io::Result<EntryKind>) -> Result<(), E>,
{
    walk_dir(store, root, &mut visit)
}

fn walk_dir<S, F, E>(store: &S, dir: &str, visit: &mut F) -> Result<(), E>
where
    S: BackingStore + ?Sized,
    F: FnMut(&str, io::Result<EntryKind>) -> Result<(), E>,
{
    let entries = match store.read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => return visit(dir, Err(e)),
    };
    visit(dir, Ok(EntryKind::Dir))?;

    for entry in entries {
        let path = join_path(dir, entry.name());
        match entry.kind() {
            EntryKind::Dir => walk_dir(store, &path, visit)?,
            EntryKind::File => visit(&path, Ok(EntryKind::File))?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_walk_order() {
        let store = MemoryStore::from_files([
            ("z.txt", "z"),
            ("sub/index.html", "i"),
            ("a.txt", "a"),
            ("sub/b/c.txt", "c"),
        ])
        .unwrap();

        let mut seen = Vec::new();
        walk(&store, ".", |path, kind| -> Result<(), ()> {
            seen.push((path.to_string(), kind.unwrap()));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                (".".to_string(), EntryKind::Dir),
                ("a.txt".to_string(), EntryKind::File),
                ("sub".to_string(), EntryKind::Dir),
                ("sub/b".to_string(), EntryKind::Dir),
                ("sub/b/c.txt".to_string(), EntryKind::File),
                ("sub/index.html".to_string(), EntryKind::File),
                ("z.txt".to_string(), EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_walk_subtree_root() {
        let store = MemoryStore::from_files([("a.txt", "a"), ("sub/x.txt", "x")]).unwrap();
        let mut seen = Vec::new();
        walk(&store, "sub", |path, _| -> Result<(), ()> {
            seen.push(path.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, ["sub", "sub/x.txt"]);
    }

    #[test]
    fn test_walk_reports_unlistable_root() {
        let store = MemoryStore::new();
        let mut errors = 0;
        walk(&store, "missing", |_, kind| -> Result<(), ()> {
            if kind.is_err() {
                errors += 1;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_walk_stops_on_visitor_error() {
        let store = MemoryStore::from_files([("a.txt", "a"), ("b.txt", "b")]).unwrap();
        let mut count = 0;
        let result = walk(&store, ".", |path, _| {
            count += 1;
            if path == "a.txt" {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(count, 2);
    }
}
