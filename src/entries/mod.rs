//! Declared filesystem entries and how each one realizes itself on disk.
//!
//! The closed [`FilesystemEntry`] enum dispatches to the three variants,
//! each of which reports its [`Node`] and knows how to create itself
//! given the collaborators bundled in [`crate::util::Util`].

mod directory;
mod entry;
mod file;
mod link;
mod node;

pub use directory::Directory;
pub use entry::{CreateError, EntryKind, EntryTrait, FilesystemEntry};
pub use file::{File, Resource};
pub use link::Link;
pub use node::{Node, NodeOwner};
