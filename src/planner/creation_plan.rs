use std::collections::HashMap;
use std::path::PathBuf;

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::config::Storage;
use crate::entries::{EntryKind, EntryTrait, FilesystemEntry};
use crate::ext::PathExt;
use crate::sysroot::{ResolveError, Sysroot};

/// Entries ordered shallowest to deepest, with paths already resolved under
/// the target root. Executing them in order never visits a child before its
/// parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationPlan {
    entries: Vec<FilesystemEntry>,
}

impl CreationPlan {
    /// Resolves every declared path, rejects entries that land on the same
    /// real path, and sorts by depth. Directories are visited before files and
    /// files before links, which only affects which entry a duplicate error
    /// blames.
    pub fn build(storage: &Storage, sysroot: &Sysroot) -> Result<Self, PlanError> {
        let declared = storage
            .directories
            .iter()
            .cloned()
            .map(FilesystemEntry::from)
            .chain(storage.files.iter().cloned().map(FilesystemEntry::from))
            .chain(storage.links.iter().cloned().map(FilesystemEntry::from));

        // Resolved path -> declared path, only needed while planning.
        let mut resolution_table: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut entries = Vec::new();

        for mut entry in declared {
            let declared_path = entry.node().path.clone();
            let resolved = sysroot
                .join_path(&declared_path)
                .context(ResolutionSnafu {
                    declared: declared_path.clone(),
                })?;

            if let Some(existing) = resolution_table.get(&resolved) {
                return DuplicatePathSnafu {
                    kind: entry.kind(),
                    declared: declared_path,
                    resolved,
                    existing: existing.clone(),
                }
                .fail();
            }

            debug!(
                declared = %declared_path.display(),
                resolved = %resolved.display(),
                kind = %entry.kind(),
                "planned entry"
            );
            resolution_table.insert(resolved.clone(), declared_path.clone());
            let node = entry.node_mut();
            node.path = resolved;
            node.declared = Some(declared_path);
            entries.push(entry);
        }

        entries.sort_by_key(|entry| entry.node().path.depth());

        Ok(Self { entries })
    }

    /// Wraps entries that are already resolved and ordered.
    #[cfg(test)]
    pub(crate) fn from_ordered(entries: Vec<FilesystemEntry>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilesystemEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Snafu)]
pub enum PlanError {
    #[snafu(display("Failed to resolve {}", declared.display()))]
    ResolutionError {
        declared: PathBuf,
        source: ResolveError,
    },
    #[snafu(display(
        "{} at {} resolved to {} after symlink chasing, but another entry with path {} also resolves there",
        kind,
        declared.display(),
        resolved.display(),
        existing.display()
    ))]
    DuplicatePath {
        kind: EntryKind,
        declared: PathBuf,
        resolved: PathBuf,
        existing: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::{Directory, File, Link};
    use crate::test_support::TestRoot;
    use std::os::unix::fs::symlink;
    use std::path::Path;

    fn storage(directories: &[&str], files: &[&str], links: &[(&str, &str)]) -> Storage {
        Storage {
            directories: directories.iter().map(|p| Directory::new(*p)).collect(),
            files: files.iter().map(|p| File::new(*p)).collect(),
            links: links
                .iter()
                .map(|(path, target)| Link::symbolic(*path, *target))
                .collect(),
        }
    }

    fn plan_paths(plan: &CreationPlan, root: &TestRoot) -> Vec<PathBuf> {
        plan.iter()
            .map(|entry| {
                Path::new("/").join(entry.node().path.strip_prefix(root.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn orders_shallowest_first() {
        let root = TestRoot::new();
        let storage = storage(
            &["/a/b/c", "/a"],
            &["/a/b/c/file", "/top"],
            &[("/a/b/link", "/elsewhere")],
        );

        let plan = CreationPlan::build(&storage, &root.sysroot()).unwrap();

        assert_eq!(
            plan_paths(&plan, &root),
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/top"),
                PathBuf::from("/a/b/c"),
                PathBuf::from("/a/b/link"),
                PathBuf::from("/a/b/c/file"),
            ]
        );
    }

    #[test]
    fn ancestors_always_precede_descendants() {
        let root = TestRoot::new();
        let storage = storage(
            &["/srv/www/html/assets", "/srv", "/srv/www"],
            &["/srv/www/html/index.html", "/srv/www/html/assets/app.js"],
            &[("/srv/www/current", "html")],
        );

        let plan = CreationPlan::build(&storage, &root.sysroot()).unwrap();
        let paths: Vec<_> = plan.iter().map(|e| e.node().path.clone()).collect();

        for (i, path) in paths.iter().enumerate() {
            for planned_before in &paths[..i] {
                assert!(
                    !planned_before.starts_with(path),
                    "{} planned after its descendant {}",
                    path.display(),
                    planned_before.display()
                );
            }
        }
    }

    #[test]
    fn equal_depth_keeps_directories_files_links_order() {
        let root = TestRoot::new();
        let storage = storage(&["/d"], &["/f"], &[("/l", "/d")]);

        let plan = CreationPlan::build(&storage, &root.sysroot()).unwrap();
        let kinds: Vec<_> = plan.iter().map(FilesystemEntry::kind).collect();

        assert_eq!(kinds, vec![EntryKind::Directory, EntryKind::File, EntryKind::Link]);
    }

    #[test]
    fn rewrites_paths_through_existing_symlinks() {
        let root = TestRoot::new();
        root.mkdir("var/home", 0o755);
        symlink("/var/home", root.path().join("home")).unwrap();
        let storage = storage(&[], &["/home/core/.profile"], &[]);

        let plan = CreationPlan::build(&storage, &root.sysroot()).unwrap();

        let node = plan.iter().next().unwrap().node();
        assert_eq!(node.path, root.path().join("var/home/core/.profile"));
        assert_eq!(node.declared_path(), Path::new("/home/core/.profile"));
    }

    #[test]
    fn duplicate_real_path_through_symlink_is_rejected() {
        let root = TestRoot::new();
        root.mkdir("a", 0o755);
        symlink("/a", root.path().join("b")).unwrap();
        let storage = storage(&["/a/x"], &[], &[("/b/x", "/target")]);

        let err = CreationPlan::build(&storage, &root.sysroot()).unwrap_err();

        match &err {
            PlanError::DuplicatePath {
                kind,
                declared,
                existing,
                resolved,
            } => {
                assert_eq!(*kind, EntryKind::Link);
                assert_eq!(declared, Path::new("/b/x"));
                assert_eq!(existing, Path::new("/a/x"));
                assert_eq!(resolved, &root.path().join("a/x"));
            }
            other => panic!("expected duplicate path, got {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("/b/x") && message.contains("/a/x"));
        assert!(!root.path().join("a/x").exists());
    }

    #[test]
    fn literal_duplicates_are_rejected() {
        let root = TestRoot::new();
        let storage = storage(&["/etc"], &["/etc"], &[]);

        let result = CreationPlan::build(&storage, &root.sysroot());

        assert!(matches!(
            result,
            Err(PlanError::DuplicatePath {
                kind: EntryKind::File,
                ..
            })
        ));
    }

    #[test]
    fn resolution_failure_names_the_declared_path() {
        let root = TestRoot::new();
        let storage = storage(&["relative/dir"], &[], &[]);

        let err = CreationPlan::build(&storage, &root.sysroot()).unwrap_err();

        assert!(matches!(err, PlanError::ResolutionError { .. }));
        assert!(err.to_string().contains("relative/dir"));
    }

    #[test]
    fn every_resolved_path_stays_under_the_root() {
        let root = TestRoot::new();
        root.mkdir("real", 0o755);
        symlink("../../..", root.path().join("up")).unwrap();
        let storage = storage(
            &["/../../outside", "/up/escape"],
            &["/./etc/../etc/passwd-", "/up/up/x"],
            &[("/real/../../l", "/x")],
        );

        let plan = CreationPlan::build(&storage, &root.sysroot()).unwrap();

        let sysroot = root.sysroot();
        assert!(plan.iter().all(|entry| sysroot.contains(&entry.node().path)));
    }
}
