use std::fmt;
use std::path::PathBuf;

use snafu::Snafu;

use crate::entries::{Directory, File, Link, Node};
use crate::fetch::{FetchError, Fetcher};
use crate::util::{LinkError, OwnershipError, Util};

pub trait EntryTrait {
    fn node(&self) -> &Node;
    fn node_mut(&mut self) -> &mut Node;
    /// Realizes the entry at its (already resolved) path.
    async fn create<F: Fetcher>(&self, util: &Util<F>) -> Result<(), CreateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Link,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Directory => f.write_str("Directory"),
            EntryKind::File => f.write_str("File"),
            EntryKind::Link => f.write_str("Link"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilesystemEntry {
    Directory(Directory),
    File(File),
    Link(Link),
}

impl FilesystemEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            FilesystemEntry::Directory(_) => EntryKind::Directory,
            FilesystemEntry::File(_) => EntryKind::File,
            FilesystemEntry::Link(_) => EntryKind::Link,
        }
    }
}

impl EntryTrait for FilesystemEntry {
    fn node(&self) -> &Node {
        match self {
            FilesystemEntry::Directory(entry) => entry.node(),
            FilesystemEntry::File(entry) => entry.node(),
            FilesystemEntry::Link(entry) => entry.node(),
        }
    }

    fn node_mut(&mut self) -> &mut Node {
        match self {
            FilesystemEntry::Directory(entry) => entry.node_mut(),
            FilesystemEntry::File(entry) => entry.node_mut(),
            FilesystemEntry::Link(entry) => entry.node_mut(),
        }
    }

    async fn create<F: Fetcher>(&self, util: &Util<F>) -> Result<(), CreateError> {
        match self {
            FilesystemEntry::Directory(entry) => entry.create(util).await,
            FilesystemEntry::File(entry) => entry.create(util).await,
            FilesystemEntry::Link(entry) => entry.create(util).await,
        }
    }
}

impl From<Directory> for FilesystemEntry {
    fn from(value: Directory) -> Self {
        FilesystemEntry::Directory(value)
    }
}

impl From<File> for FilesystemEntry {
    fn from(value: File) -> Self {
        FilesystemEntry::File(value)
    }
}

impl From<Link> for FilesystemEntry {
    fn from(value: Link) -> Self {
        FilesystemEntry::Link(value)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CreateError {
    #[snafu(display("Failed to create directory {}", path.display()))]
    DirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to resolve the owner of {}", path.display()))]
    OwnershipError {
        path: PathBuf,
        source: OwnershipError,
    },
    #[snafu(display("Failed to inspect {}", path.display()))]
    InspectError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Error creating file {}: a non regular file exists there already and overwrite is false",
        path.display()
    ))]
    NonRegularExists { path: PathBuf },
    #[snafu(display(
        "Error creating file {}: a file exists there already and overwrite is false",
        path.display()
    ))]
    FileExists { path: PathBuf },
    #[snafu(display("Failed to create parent directories of {}", path.display()))]
    ParentError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to resolve file {}", path.display()))]
    PrepareFetchError { path: PathBuf, source: FetchError },
    #[snafu(display("Failed to create file {}", path.display()))]
    FetchFailed { path: PathBuf, source: FetchError },
    #[snafu(display("Failed to set permissions on {}", path.display()))]
    PermissionsError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create link {}", path.display()))]
    LinkFailed { path: PathBuf, source: LinkError },
}

impl CreateError {
    /// Whether pre-existing data blocked the entry, as opposed to a failing operation.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CreateError::NonRegularExists { .. }
                | CreateError::FileExists { .. }
                | CreateError::LinkFailed {
                    source: LinkError::Conflict { .. },
                    ..
                }
        )
    }
}
