use std::path::PathBuf;

use snafu::ResultExt;
use tracing::info;

use crate::entries::entry::{LinkFailedSnafu, OwnershipSnafu};
use crate::entries::{CreateError, EntryTrait, Node};
use crate::fetch::Fetcher;
use crate::util::Util;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub node: Node,
    /// Stored verbatim for symlinks; resolved under the target root for hard links.
    pub target: PathBuf,
    pub hard: Option<bool>,
}

impl Link {
    #[cfg(test)]
    pub fn symbolic(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            node: Node::new(path),
            target: target.into(),
            hard: None,
        }
    }

    #[cfg(test)]
    pub fn hard(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            hard: Some(true),
            ..Self::symbolic(path, target)
        }
    }

    pub fn is_hard(&self) -> bool {
        self.hard.unwrap_or(false)
    }
}

impl EntryTrait for Link {
    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    async fn create<F: Fetcher>(&self, util: &Util<F>) -> Result<(), CreateError> {
        let path = self.node.path();
        info!(
            path = %path.display(),
            target = %self.target.display(),
            hard = self.is_hard(),
            "writing link"
        );

        let owner = util.resolve_owner(&self.node).context(OwnershipSnafu {
            path: path.to_path_buf(),
        })?;

        util.write_link(self, owner).context(LinkFailedSnafu {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRoot;
    use std::fs;

    #[compio::test]
    async fn creates_symlink_with_verbatim_target() {
        let root = TestRoot::new();
        let util = root.util();
        let path = root.path().join("usr/local/bin/editor");

        Link::symbolic(path.clone(), "/usr/bin/vi")
            .create(&util)
            .await
            .expect("link creation failed");

        assert!(path.is_symlink());
        assert_eq!(fs::read_link(&path).unwrap(), PathBuf::from("/usr/bin/vi"));
    }

    #[compio::test]
    async fn creating_the_same_symlink_twice_is_accepted() {
        let root = TestRoot::new();
        let util = root.util();
        let link = Link::symbolic(root.path().join("bin"), "usr/bin");

        link.create(&util).await.expect("first run failed");
        link.create(&util).await.expect("second run failed");

        assert_eq!(fs::read_link(root.path().join("bin")).unwrap(), PathBuf::from("usr/bin"));
    }

    #[compio::test]
    async fn symlink_over_an_unrelated_file_conflicts() {
        let root = TestRoot::new();
        let util = root.util();
        let existing = root.write_file("etc/localtime", "UTC");

        let result = Link::symbolic(existing.clone(), "/usr/share/zoneinfo/UTC")
            .create(&util)
            .await;

        let err = result.expect_err("existing file must conflict");
        assert!(err.is_conflict());
        assert_eq!(fs::read_to_string(&existing).unwrap(), "UTC");
    }

    #[compio::test]
    async fn hard_link_target_is_resolved_inside_the_root() {
        let root = TestRoot::new();
        let util = root.util();
        let original = root.write_file("usr/bin/busybox", "#!busybox");

        Link::hard(root.path().join("bin/sh"), "/usr/bin/busybox")
            .create(&util)
            .await
            .expect("hard link creation failed");

        let linked = root.path().join("bin/sh");
        assert!(!linked.is_symlink());
        assert_eq!(fs::read_to_string(&linked).unwrap(), "#!busybox");
        use std::os::unix::fs::MetadataExt;
        assert_eq!(
            fs::metadata(&linked).unwrap().ino(),
            fs::metadata(&original).unwrap().ino()
        );
    }

    #[compio::test]
    async fn rerunning_a_hard_link_is_accepted() {
        let root = TestRoot::new();
        let util = root.util();
        root.write_file("usr/bin/busybox", "#!busybox");
        let link = Link::hard(root.path().join("bin/sh"), "/usr/bin/busybox");

        link.create(&util).await.expect("first run failed");
        link.create(&util).await.expect("rerun failed");

        assert_eq!(fs::read_to_string(root.path().join("bin/sh")).unwrap(), "#!busybox");
    }

    #[compio::test]
    async fn different_file_at_hard_link_path_conflicts() {
        let root = TestRoot::new();
        let util = root.util();
        root.write_file("usr/bin/busybox", "#!busybox");
        let occupant = root.write_file("bin/sh", "#!dash");

        let err = Link::hard(occupant.clone(), "/usr/bin/busybox")
            .create(&util)
            .await
            .expect_err("an unrelated file must conflict");

        assert!(err.is_conflict());
        assert_eq!(fs::read_to_string(&occupant).unwrap(), "#!dash");
    }
}
