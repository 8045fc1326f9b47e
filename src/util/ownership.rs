use std::fs;
use std::path::PathBuf;

use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::entries::{Node, NodeOwner};
use crate::sysroot::Sysroot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub const ROOT: Ownership = Ownership { uid: 0, gid: 0 };
}

/// Turns a node's declared user and group into numeric ids.
pub trait OwnershipResolver {
    fn resolve_owner(
        &self,
        node: &Node,
        default_uid: u32,
        default_gid: u32,
    ) -> Result<Ownership, OwnershipError>;
}

/// Looks names up in the target's own `/etc/passwd` and `/etc/group`.
#[derive(Debug, Clone)]
pub struct PasswdResolver {
    passwd: PathBuf,
    group: PathBuf,
}

#[derive(Debug, Clone, Copy)]
enum Database {
    Passwd,
    Group,
}

impl PasswdResolver {
    pub fn new(sysroot: &Sysroot) -> Self {
        let etc = sysroot.dest_dir().join("etc");
        Self {
            passwd: etc.join("passwd"),
            group: etc.join("group"),
        }
    }

    fn resolve(
        &self,
        owner: &NodeOwner,
        default: u32,
        database: Database,
    ) -> Result<u32, OwnershipError> {
        if let Some(id) = owner.id {
            return Ok(id);
        }
        let Some(name) = owner.name.as_deref() else {
            return Ok(default);
        };

        let found = self.lookup(database, name)?;
        match database {
            Database::Passwd => found.context(UnknownUserSnafu { name }),
            Database::Group => found.context(UnknownGroupSnafu { name }),
        }
    }

    /// Scans a colon-separated database for `name` and returns its id field.
    fn lookup(&self, database: Database, name: &str) -> Result<Option<u32>, OwnershipError> {
        let path = match database {
            Database::Passwd => &self.passwd,
            Database::Group => &self.group,
        };
        let contents = fs::read_to_string(path).context(ReadDatabaseSnafu { path: path.clone() })?;

        let id = contents
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(|line| line.split(':').collect::<Vec<_>>())
            .find(|fields| fields.first() == Some(&name))
            .and_then(|fields| fields.get(2).and_then(|id| id.parse().ok()));
        debug!(name, ?id, database = ?database, "looked up owner name");

        Ok(id)
    }
}

impl OwnershipResolver for PasswdResolver {
    fn resolve_owner(
        &self,
        node: &Node,
        default_uid: u32,
        default_gid: u32,
    ) -> Result<Ownership, OwnershipError> {
        Ok(Ownership {
            uid: self.resolve(&node.user, default_uid, Database::Passwd)?,
            gid: self.resolve(&node.group, default_gid, Database::Group)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum OwnershipError {
    #[snafu(display("Failed to read {}", path.display()))]
    ReadDatabase {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("No such user '{}'", name))]
    UnknownUser { name: String },
    #[snafu(display("No such group '{}'", name))]
    UnknownGroup { name: String },
}
