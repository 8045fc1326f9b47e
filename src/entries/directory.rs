use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
#[cfg(test)]
use std::path::PathBuf;

use snafu::ResultExt;
use tracing::info;

use crate::entries::entry::{DirectorySnafu, OwnershipSnafu};
use crate::entries::{CreateError, EntryTrait, Node};
use crate::fetch::Fetcher;
use crate::util::{DEFAULT_DIRECTORY_PERMISSIONS, Util, apply_permissions, missing_ancestors};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub node: Node,
    pub mode: Option<u32>,
}

impl Directory {
    #[cfg(test)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            node: Node::new(path),
            mode: None,
        }
    }

    pub fn mode(&self) -> u32 {
        self.mode.unwrap_or(DEFAULT_DIRECTORY_PERMISSIONS)
    }
}

impl EntryTrait for Directory {
    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    async fn create<F: Fetcher>(&self, util: &Util<F>) -> Result<(), CreateError> {
        let path = self.node.path();
        info!(path = %path.display(), "creating directory");

        let owner = util.resolve_owner(&self.node).context(OwnershipSnafu {
            path: path.to_path_buf(),
        })?;

        // `create_dir_all` only applies the mode to directories it creates and
        // leaves ownership alone, so collect the new ones before creating them.
        let mut new_paths = vec![path.to_path_buf()];
        new_paths.extend(missing_ancestors(path).context(DirectorySnafu {
            path: path.to_path_buf(),
        })?);

        let mode = self.mode();
        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .context(DirectorySnafu {
                path: path.to_path_buf(),
            })?;

        for new_path in &new_paths {
            apply_permissions(new_path, mode, owner).context(DirectorySnafu {
                path: path.to_path_buf(),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestRoot, mode_of};

    #[compio::test]
    async fn creates_nested_directory_with_mode_on_every_new_segment() {
        let root = TestRoot::new();
        let util = root.util();

        let mut dir = Directory::new(root.path().join("var/lib/app/state"));
        dir.mode = Some(0o750);

        dir.create(&util).await.expect("directory creation failed");

        for segment in ["var", "var/lib", "var/lib/app", "var/lib/app/state"] {
            let created = root.path().join(segment);
            assert!(created.is_dir(), "{} should exist", created.display());
            assert_eq!(mode_of(&created), 0o750, "mode of {}", created.display());
        }
    }

    #[compio::test]
    async fn leaves_existing_ancestors_untouched() {
        let root = TestRoot::new();
        let util = root.util();
        let existing = root.mkdir("srv", 0o711);

        let mut dir = Directory::new(existing.join("data"));
        dir.mode = Some(0o700);
        dir.create(&util).await.expect("directory creation failed");

        assert_eq!(mode_of(&existing), 0o711);
        assert_eq!(mode_of(&existing.join("data")), 0o700);
    }

    #[compio::test]
    async fn applies_default_mode_when_none_is_declared() {
        let root = TestRoot::new();
        let util = root.util();

        let dir = Directory::new(root.path().join("opt"));
        dir.create(&util).await.expect("directory creation failed");

        assert_eq!(mode_of(&root.path().join("opt")), DEFAULT_DIRECTORY_PERMISSIONS);
    }

    #[compio::test]
    async fn reapplies_mode_to_an_existing_directory() {
        let root = TestRoot::new();
        let util = root.util();
        let existing = root.mkdir("etc", 0o700);

        let mut dir = Directory::new(existing.clone());
        dir.mode = Some(0o755);
        dir.create(&util).await.expect("directory creation failed");

        assert_eq!(mode_of(&existing), 0o755);
    }

    #[compio::test]
    async fn fails_when_a_regular_file_is_in_the_way() {
        let root = TestRoot::new();
        let util = root.util();
        let file = root.write_file("etc", "not a dir");

        let dir = Directory::new(file.clone());
        let result = dir.create(&util).await;

        assert!(matches!(result, Err(CreateError::DirectoryError { .. })));
        assert!(file.is_file());
    }

    #[compio::test]
    async fn unknown_owner_name_is_reported() {
        let root = TestRoot::new();
        let util = root.util();

        let mut dir = Directory::new(root.path().join("home/ghost"));
        dir.node.user.name = Some("ghost".into());
        let result = dir.create(&util).await;

        assert!(matches!(result, Err(CreateError::OwnershipError { .. })));
        assert!(!root.path().join("home").exists());
    }
}
