//! Fixtures shared by the unit tests: a throwaway target root and a `Util`
//! that owns files as the current user, so no privileges are needed.

use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::fetch::LocalFetcher;
use crate::sysroot::Sysroot;
use crate::util::{Ownership, Util};

pub struct TestRoot {
    /// Kept alive for the lifetime of the fixture.
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestRoot {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp dir");
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn sysroot(&self) -> Sysroot {
        Sysroot::new(self.root.clone())
    }

    /// Whoever owns the freshly created temp dir, i.e. the test process.
    pub fn owner(&self) -> Ownership {
        let metadata = fs::metadata(&self.root).expect("Failed to stat temp dir");
        Ownership {
            uid: metadata.uid(),
            gid: metadata.gid(),
        }
    }

    pub fn util(&self) -> Util<LocalFetcher> {
        Util::new(self.sysroot(), LocalFetcher).with_default_owner(self.owner())
    }

    pub fn mkdir(&self, rel: &str, mode: u32) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).expect("Failed to create dir");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("Failed to chmod dir");
        path
    }

    pub fn write_file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, contents).expect("Failed to write file");
        path
    }
}

pub fn mode_of(path: &Path) -> u32 {
    fs::symlink_metadata(path)
        .expect("Failed to stat path")
        .permissions()
        .mode()
        & 0o7777
}
