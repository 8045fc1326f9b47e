use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, lchown, symlink};
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::entries::Link;
use crate::sysroot::{ResolveError, Sysroot};
use crate::util::{Ownership, create_parent_dirs};

/// Writes a single hard or symbolic link at its resolved path.
pub trait LinkWriter {
    fn write_link(&self, link: &Link, sysroot: &Sysroot, owner: Ownership)
    -> Result<(), LinkError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SysrootLinkWriter;

impl LinkWriter for SysrootLinkWriter {
    fn write_link(
        &self,
        link: &Link,
        sysroot: &Sysroot,
        owner: Ownership,
    ) -> Result<(), LinkError> {
        let path = link.node.path();
        create_parent_dirs(path).context(ParentSnafu {
            path: path.to_path_buf(),
        })?;

        if link.is_hard() {
            let target = sysroot
                .join_path(&link.target)
                .context(ResolveTargetSnafu {
                    target: link.target.clone(),
                })?;
            return write_hard_link(path, &target);
        }

        match existing(path)? {
            Some(metadata) if metadata.file_type().is_symlink() => {
                let current = fs::read_link(path).context(InspectSnafu {
                    path: path.to_path_buf(),
                })?;
                if current != link.target {
                    return ConflictSnafu {
                        path: path.to_path_buf(),
                    }
                    .fail();
                }
                debug!(path = %path.display(), "symlink already points at its target");
            }
            Some(_) => {
                return ConflictSnafu {
                    path: path.to_path_buf(),
                }
                .fail();
            }
            None => symlink(&link.target, path).context(SymlinkSnafu {
                path: path.to_path_buf(),
            })?,
        }

        lchown(path, Some(owner.uid), Some(owner.gid)).context(OwnershipSnafu {
            path: path.to_path_buf(),
        })
    }
}

fn existing(path: &Path) -> Result<Option<fs::Metadata>, LinkError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context(InspectSnafu {
            path: path.to_path_buf(),
        }),
    }
}

fn write_hard_link(path: &Path, target: &Path) -> Result<(), LinkError> {
    if let Some(metadata) = existing(path)? {
        let target_metadata = fs::symlink_metadata(target).context(InspectSnafu {
            path: target.to_path_buf(),
        })?;
        if metadata.dev() == target_metadata.dev() && metadata.ino() == target_metadata.ino() {
            debug!(path = %path.display(), "hard link already in place");
            return Ok(());
        }
        return ConflictSnafu {
            path: path.to_path_buf(),
        }
        .fail();
    }

    fs::hard_link(target, path).context(HardLinkSnafu {
        path: path.to_path_buf(),
        target: target.to_path_buf(),
    })
}

#[derive(Debug, Snafu)]
pub enum LinkError {
    #[snafu(display("Failed to create parent directories of {}", path.display()))]
    ParentError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to resolve hard link target {}", target.display()))]
    ResolveTargetError {
        target: PathBuf,
        source: ResolveError,
    },
    #[snafu(display("Failed to inspect {}", path.display()))]
    InspectError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("A different object already exists at {}", path.display()))]
    Conflict { path: PathBuf },
    #[snafu(display("Failed to create symlink {}", path.display()))]
    SymlinkError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to hard link {} to {}", path.display(), target.display()))]
    HardLinkError {
        path: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to change ownership of {}", path.display()))]
    OwnershipError {
        path: PathBuf,
        source: std::io::Error,
    },
}
