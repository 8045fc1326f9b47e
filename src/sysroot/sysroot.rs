use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use snafu::{ResultExt, Snafu, ensure};
use tracing::trace;

use crate::ext::PathExt;

/// Upper bound on symlinks followed while resolving one path, matching ELOOP.
const MAX_SYMLINK_HOPS: usize = 255;

/// The mounted target root every declared path is resolved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysroot {
    dest_dir: PathBuf,
}

enum Step {
    Up,
    Name(OsString),
}

impl Sysroot {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Whether `path` lies under the target root.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.dest_dir)
    }

    /// Maps an on-disk path back to the path the booted system will see it at.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.dest_dir)
            .ok()
            .map(|rel| Path::new("/").join(rel))
    }

    /// Joins a declared absolute path onto the target root, following every
    /// symlink in its ancestry. The final component is left as declared since
    /// it may not exist yet, or may itself be what the entry replaces.
    pub fn join_path(&self, declared: &Path) -> Result<PathBuf, ResolveError> {
        ensure!(
            declared.is_absolute(),
            NotAbsoluteSnafu {
                path: declared.to_path_buf()
            }
        );

        let normalized = declared.normalize_absolute();
        let (Some(parent), Some(name)) = (normalized.parent(), normalized.file_name()) else {
            return Ok(self.dest_dir.clone());
        };

        let resolved_parent = self.resolve_within(parent, declared)?;
        let resolved = self.on_disk(&resolved_parent).join(name);
        trace!(
            declared = %declared.display(),
            resolved = %resolved.display(),
            "resolved path"
        );
        Ok(resolved)
    }

    fn on_disk(&self, logical: &Path) -> PathBuf {
        match logical.strip_prefix("/") {
            Ok(rel) => self.dest_dir.join(rel),
            Err(_) => self.dest_dir.join(logical),
        }
    }

    /// Resolves `logical` (a `/`-rooted path as seen from inside the target)
    /// to the real location it refers to, again `/`-rooted.
    fn resolve_within(&self, logical: &Path, declared: &Path) -> Result<PathBuf, ResolveError> {
        let mut pending: VecDeque<Step> = steps_of(logical).collect();
        let mut resolved = PathBuf::from("/");
        let mut hops = 0;

        while let Some(step) = pending.pop_front() {
            let name = match step {
                Step::Up => {
                    resolved.pop();
                    continue;
                }
                Step::Name(name) => name,
            };

            let candidate = resolved.join(&name);
            let on_disk = self.on_disk(&candidate);
            match fs::symlink_metadata(&on_disk) {
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    hops += 1;
                    ensure!(
                        hops <= MAX_SYMLINK_HOPS,
                        TooManyLinksSnafu {
                            path: declared.to_path_buf()
                        }
                    );

                    let target = fs::read_link(&on_disk).context(ReadLinkSnafu {
                        path: on_disk.clone(),
                    })?;
                    if target.is_absolute() {
                        resolved = PathBuf::from("/");
                    }
                    for step in steps_of(&target).collect::<Vec<_>>().into_iter().rev() {
                        pending.push_front(step);
                    }
                }
                Ok(_) => resolved = candidate,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Nothing further down can be a symlink.
                    resolved = candidate;
                    for step in pending.drain(..) {
                        match step {
                            Step::Up => {
                                resolved.pop();
                            }
                            Step::Name(name) => resolved.push(name),
                        }
                    }
                }
                Err(e) => {
                    return Err(e).context(InspectSnafu { path: on_disk });
                }
            }
        }

        Ok(resolved)
    }
}

fn steps_of(path: &Path) -> impl Iterator<Item = Step> + '_ {
    path.components().filter_map(|component| match component {
        Component::ParentDir => Some(Step::Up),
        Component::Normal(name) => Some(Step::Name(name.to_os_string())),
        Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
    })
}

#[derive(Debug, Snafu)]
pub enum ResolveError {
    #[snafu(display("Declared path {} is not absolute", path.display()))]
    NotAbsolute { path: PathBuf },
    #[snafu(display("Failed to inspect {} while resolving symlinks", path.display()))]
    InspectError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read symlink {}", path.display()))]
    ReadLinkError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Too many levels of symbolic links resolving {}", path.display()))]
    TooManyLinks { path: PathBuf },
}
