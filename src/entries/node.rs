use std::path::{Path, PathBuf};

/// Declared owner of a node. A numeric id wins over a name when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeOwner {
    pub id: Option<u32>,
    pub name: Option<String>,
}

/// Identity shared by every entry kind.
///
/// `path` holds the declared path (e.g. `/etc/hostname`) until planning
/// rewrites it to the resolved on-disk path under the target root and moves
/// the declared one to `declared`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub path: PathBuf,
    pub declared: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub user: NodeOwner,
    pub group: NodeOwner,
}

impl Node {
    #[cfg(test)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path as written in the config, for messages.
    pub fn declared_path(&self) -> &Path {
        self.declared.as_deref().unwrap_or(&self.path)
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite.unwrap_or(false)
    }
}
