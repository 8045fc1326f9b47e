use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::entries::{CreateError, EntryTrait, FilesystemEntry};
use crate::fetch::Fetcher;
use crate::planner::CreationPlan;
use crate::util::{Relabeler, Util};

/// Walks a creation plan in order, stopping at the first failure.
pub struct Executor<'a, F> {
    util: &'a Util<F>,
    relabeler: Option<&'a mut dyn Relabeler>,
}

impl<'a, F: Fetcher> Executor<'a, F> {
    pub fn new(util: &'a Util<F>) -> Self {
        Self {
            util,
            relabeler: None,
        }
    }

    /// Enables relabel requests for directories this run creates.
    pub fn with_relabeler(mut self, relabeler: &'a mut dyn Relabeler) -> Self {
        self.relabeler = Some(relabeler);
        self
    }

    pub async fn execute(&mut self, plan: &CreationPlan) -> Result<(), ExecutionError> {
        let span = info_span!("create_entries", entries = plan.len());
        self.create_entries(plan).instrument(span).await
    }

    async fn create_entries(&mut self, plan: &CreationPlan) -> Result<(), ExecutionError> {
        for entry in plan.iter() {
            self.create_entry(entry).await?;
        }
        info!("all entries created");
        Ok(())
    }

    async fn create_entry(&mut self, entry: &FilesystemEntry) -> Result<(), ExecutionError> {
        let path = entry.node().path();
        self.ensure_under_root(path)?;

        self.relabel_dirs_for(path)?;
        remove_path_on_overwrite(entry)?;
        entry
            .create(self.util)
            .await
            .inspect_err(|e| {
                if e.is_conflict() {
                    warn!(
                        path = %path.display(),
                        "existing data is in the way; set overwrite to replace it"
                    );
                }
            })
            .context(CreateFilesSnafu {
                declared: entry.node().declared_path().to_path_buf(),
            })
    }

    fn ensure_under_root(&self, path: &Path) -> Result<(), ExecutionError> {
        let sysroot = self.util.sysroot();
        if sysroot.contains(path) {
            return Ok(());
        }
        Err(ExecutionError::Fault {
            source: InvariantViolation {
                path: path.to_path_buf(),
                prefix: sysroot.dest_dir().to_path_buf(),
            },
        })
    }

    /// Requests a relabel of the topmost directory this entry's creation will
    /// bring into existence, or of the entry itself when its parent exists.
    fn relabel_dirs_for(&mut self, path: &Path) -> Result<(), ExecutionError> {
        let Some(relabeler) = self.relabeler.as_deref_mut() else {
            return Ok(());
        };
        let sysroot = self.util.sysroot();

        let mut relabel_from = path;
        let mut dir = path.parent();
        while let Some(current) = dir {
            let exists = match fs::metadata(current) {
                Ok(_) => true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => false,
                Err(e) => {
                    return Err(e).context(RelabelSnafu {
                        path: current.to_path_buf(),
                    });
                }
            };
            if exists || current == sysroot.dest_dir() {
                break;
            }
            relabel_from = current;
            dir = current.parent();
        }

        if let Some(relative) = sysroot.relative(relabel_from) {
            debug!(path = %relative.display(), "requesting relabel");
            relabeler.request_relabel(&relative);
        }
        Ok(())
    }
}

fn remove_path_on_overwrite(entry: &FilesystemEntry) -> Result<(), ExecutionError> {
    let node = entry.node();
    if !node.overwrite() {
        return Ok(());
    }

    let path = node.path();
    let removed = match fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
    };
    removed.context(OverwriteSnafu {
        declared: node.declared_path().to_path_buf(),
        path: path.to_path_buf(),
    })?;
    debug!(path = %path.display(), "removed existing data before overwrite");
    Ok(())
}

/// A resolved path escaped the target root. Planning guarantees this cannot
/// happen, so hitting it means a bug rather than bad input.
#[derive(Debug, Snafu)]
#[snafu(display(
    "Entry path {} isn't under prefix {}",
    path.display(),
    prefix.display()
))]
pub struct InvariantViolation {
    pub path: PathBuf,
    pub prefix: PathBuf,
}

#[derive(Debug, Snafu)]
pub enum ExecutionError {
    #[snafu(display("Failed to check which parents of {} need relabeling", path.display()))]
    RelabelError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Failed to remove existing data for {} at {}",
        declared.display(),
        path.display()
    ))]
    OverwriteError {
        declared: PathBuf,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create {}", declared.display()))]
    CreateFilesError {
        declared: PathBuf,
        source: CreateError,
    },
    #[snafu(display("Internal error, please report a bug"))]
    Fault { source: InvariantViolation },
}

impl ExecutionError {
    /// Whether this is a defect in the provisioner rather than a problem
    /// with the configuration or the target.
    pub fn is_fault(&self) -> bool {
        matches!(self, ExecutionError::Fault { .. })
    }
}
