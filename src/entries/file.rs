use std::fs;
use std::io;
#[cfg(test)]
use std::path::PathBuf;

use snafu::ResultExt;
use tracing::{debug, info};

use crate::entries::entry::{
    FetchFailedSnafu, FileExistsSnafu, InspectSnafu, NonRegularExistsSnafu, OwnershipSnafu,
    ParentSnafu, PermissionsSnafu, PrepareFetchSnafu,
};
use crate::entries::{CreateError, EntryTrait, Node};
use crate::fetch::Fetcher;
use crate::util::{DEFAULT_FILE_PERMISSIONS, Util, apply_permissions, create_parent_dirs};

/// A content source together with how to decode and verify it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub source: Option<String>,
    pub compression: Option<String>,
    /// `<function>-<hex digest>` of the decoded content.
    pub verification: Option<String>,
}

impl Resource {
    #[cfg(test)]
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    pub node: Node,
    pub contents: Resource,
    pub append: Vec<Resource>,
    pub mode: Option<u32>,
}

impl File {
    #[cfg(test)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            node: Node::new(path),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn with_contents(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            contents: Resource::from_source(source),
            ..Self::new(path)
        }
    }

    pub fn mode(&self) -> u32 {
        self.mode.unwrap_or(DEFAULT_FILE_PERMISSIONS)
    }

    /// Decides what to do with whatever is already at the path.
    ///
    /// Returns the file to hand to the fetcher, which gets an empty source
    /// when nothing exists and no contents were declared.
    fn reconcile_existing(&self) -> Result<File, CreateError> {
        let path = self.node.path();

        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let mut file = self.clone();
                if file.contents.source.is_none() {
                    file.contents.source = Some(String::new());
                }
                Ok(file)
            }
            Err(e) => Err(e).context(InspectSnafu {
                path: path.to_path_buf(),
            }),
            Ok(metadata) if !metadata.is_file() => NonRegularExistsSnafu {
                path: path.to_path_buf(),
            }
            .fail(),
            Ok(_) if self.contents.source.is_some() => FileExistsSnafu {
                path: path.to_path_buf(),
            }
            .fail(),
            Ok(_) => {
                debug!(path = %path.display(), "regular file already present");
                Ok(self.clone())
            }
        }
    }
}

impl EntryTrait for File {
    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    async fn create<F: Fetcher>(&self, util: &Util<F>) -> Result<(), CreateError> {
        let path = self.node.path();
        let file = self.reconcile_existing()?;

        // Unresolvable owners must fail before any content lands on disk.
        let owner = util.resolve_owner(&self.node).context(OwnershipSnafu {
            path: path.to_path_buf(),
        })?;

        let fetch_ops = util.fetcher().prepare_fetches(&file).context(PrepareFetchSnafu {
            path: path.to_path_buf(),
        })?;

        if !fetch_ops.is_empty() {
            create_parent_dirs(path).context(ParentSnafu {
                path: path.to_path_buf(),
            })?;
        }

        for op in &fetch_ops {
            if op.append {
                info!(path = %op.target.display(), "appending to file");
            } else {
                info!(path = %op.target.display(), "writing file");
            }
            util.fetcher()
                .perform_fetch(op)
                .await
                .context(FetchFailedSnafu {
                    path: op.target.clone(),
                })?;
        }

        apply_permissions(path, self.mode(), owner).context(PermissionsSnafu {
            path: path.to_path_buf(),
        })?;

        Ok(())
    }
}
