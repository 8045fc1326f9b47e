use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt, chown};
use std::path::{Path, PathBuf};

use crate::entries::{Link, Node};
use crate::fetch::Fetcher;
use crate::sysroot::Sysroot;
use crate::util::{
    LinkError, LinkWriter, Ownership, OwnershipError, OwnershipResolver, PasswdResolver,
    SysrootLinkWriter,
};

pub const DEFAULT_DIRECTORY_PERMISSIONS: u32 = 0o755;
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;

/// Everything an entry needs from the outside world to create itself.
pub struct Util<F> {
    sysroot: Sysroot,
    fetcher: F,
    owners: Box<dyn OwnershipResolver>,
    links: Box<dyn LinkWriter>,
    default_owner: Ownership,
}

impl<F: Fetcher> Util<F> {
    pub fn new(sysroot: Sysroot, fetcher: F) -> Self {
        Self {
            owners: Box::new(PasswdResolver::new(&sysroot)),
            links: Box::new(SysrootLinkWriter),
            default_owner: Ownership::ROOT,
            sysroot,
            fetcher,
        }
    }

    pub fn with_default_owner(mut self, owner: Ownership) -> Self {
        self.default_owner = owner;
        self
    }

    pub fn sysroot(&self) -> &Sysroot {
        &self.sysroot
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn resolve_owner(&self, node: &Node) -> Result<Ownership, OwnershipError> {
        self.owners
            .resolve_owner(node, self.default_owner.uid, self.default_owner.gid)
    }

    pub fn write_link(&self, link: &Link, owner: Ownership) -> Result<(), LinkError> {
        self.links.write_link(link, &self.sysroot, owner)
    }
}

/// Applies ownership first so a later chmod can restore setuid/setgid bits
/// that chown clears.
pub fn apply_permissions(path: &Path, mode: u32, owner: Ownership) -> io::Result<()> {
    chown(path, Some(owner.uid), Some(owner.gid))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Ancestors of `path` that do not exist yet, nearest first. Stops at the
/// first existing ancestor or at `/`.
pub fn missing_ancestors(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut missing = Vec::new();

    for ancestor in path.ancestors().skip(1) {
        if ancestor.parent().is_none() {
            break;
        }
        match fs::metadata(ancestor) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(ancestor.to_path_buf()),
            Err(e) => return Err(e),
        }
    }

    Ok(missing)
}

/// Creates whatever is missing above `path` with the default directory mode,
/// applied explicitly so the umask does not leak into the target.
pub fn create_parent_dirs(path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let missing = missing_ancestors(path)?;
    if missing.is_empty() {
        return Ok(());
    }

    DirBuilder::new()
        .recursive(true)
        .mode(DEFAULT_DIRECTORY_PERMISSIONS)
        .create(parent)?;
    for dir in &missing {
        fs::set_permissions(dir, fs::Permissions::from_mode(DEFAULT_DIRECTORY_PERMISSIONS))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestRoot, mode_of};

    #[test]
    fn missing_ancestors_stop_at_first_existing_directory() {
        let root = TestRoot::new();
        root.mkdir("a", 0o755);

        let missing = missing_ancestors(&root.path().join("a/b/c/file")).unwrap();

        assert_eq!(
            missing,
            vec![root.path().join("a/b/c"), root.path().join("a/b")]
        );
    }

    #[test]
    fn create_parent_dirs_applies_default_mode() {
        let root = TestRoot::new();

        create_parent_dirs(&root.path().join("x/y/file")).unwrap();

        assert_eq!(mode_of(&root.path().join("x")), DEFAULT_DIRECTORY_PERMISSIONS);
        assert_eq!(mode_of(&root.path().join("x/y")), DEFAULT_DIRECTORY_PERMISSIONS);
        assert!(!root.path().join("x/y/file").exists());
    }

    #[test]
    fn apply_permissions_keeps_setuid_bit() {
        let root = TestRoot::new();
        let file = root.write_file("usr/bin/tool", "");

        apply_permissions(&file, 0o4755, root.owner()).unwrap();

        assert_eq!(mode_of(&file), 0o4755);
    }
}
