use std::path::PathBuf;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config: PathBuf,
    pub root: PathBuf,
    pub relabel_list: Option<PathBuf>,
    pub default_uid: u32,
    pub default_gid: u32,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config: cli.config,
            root: cli.root,
            relabel_list: cli.relabel_list,
            default_uid: cli.default_uid,
            default_gid: cli.default_gid,
        }
    }
}
