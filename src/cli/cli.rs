use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Creates the directories, files and links declared in a provisioning
/// config under a target root.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Provisioning config (YAML or JSON) with a `storage` section
    #[clap(long, short)]
    pub config: PathBuf,

    /// Root of the filesystem being provisioned
    #[clap(long, short)]
    pub root: PathBuf,

    /// Write paths needing an SELinux relabel to this file
    #[clap(long)]
    pub relabel_list: Option<PathBuf>,

    /// Owner uid for entries that declare no user
    #[clap(long, default_value_t = 0)]
    pub default_uid: u32,

    /// Owner gid for entries that declare no group
    #[clap(long, default_value_t = 0)]
    pub default_gid: u32,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}
