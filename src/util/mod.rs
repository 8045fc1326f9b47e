//! Collaborators entries lean on while creating themselves: ownership
//! resolution, link writing, relabel requests and shared permission helpers.

mod link_writer;
mod ownership;
mod relabel;
mod util;

pub use link_writer::{LinkError, LinkWriter, SysrootLinkWriter};
pub use ownership::{Ownership, OwnershipError, OwnershipResolver, PasswdResolver};
pub use relabel::{RelabelQueue, Relabeler};
pub use util::{
    DEFAULT_DIRECTORY_PERMISSIONS, DEFAULT_FILE_PERMISSIONS, Util, apply_permissions,
    create_parent_dirs, missing_ancestors,
};
