use std::path::PathBuf;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, error, info};

use crate::application::RuntimeConfig;
use crate::config::{ConfigCreationError, ProvisioningConfig};
use crate::executor::{ExecutionError, Executor};
use crate::fetch::LocalFetcher;
use crate::planner::{CreationPlan, PlanError};
use crate::sysroot::Sysroot;
use crate::util::{Ownership, RelabelQueue, Util};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let config = ProvisioningConfig::read(&app_config.config)
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let root = std::fs::canonicalize(&app_config.root).context(RootSnafu {
            root: app_config.root.clone(),
        })?;
        let sysroot = Sysroot::new(root);

        let plan = CreationPlan::build(&config.storage, &sysroot).context(PlanningSnafu)?;
        if plan.is_empty() {
            info!("config declares no storage entries");
        } else {
            info!(entries = plan.len(), root = %sysroot.dest_dir().display(), "planned entries");
        }

        let util = Util::new(sysroot, LocalFetcher).with_default_owner(Ownership {
            uid: app_config.default_uid,
            gid: app_config.default_gid,
        });

        let mut relabels = RelabelQueue::new();
        let mut executor = Executor::new(&util);
        if app_config.relabel_list.is_some() {
            executor = executor.with_relabeler(&mut relabels);
        }
        executor
            .execute(&plan)
            .await
            .inspect_err(|e| {
                if e.is_fault() {
                    error!("{e}: resolved paths escaped the target root");
                }
            })
            .context(ApplicationExecutionSnafu)?;

        if let Some(list_path) = &app_config.relabel_list {
            if relabels.is_empty() {
                debug!("no created paths need relabeling");
            }
            info!(
                paths = relabels.paths().len(),
                list = %list_path.display(),
                "writing relabel list"
            );
            compio::fs::write(list_path, relabels.to_list().into_bytes())
                .await
                .0
                .context(RelabelListSnafu {
                    list_path: list_path.clone(),
                })?;
        }

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigCreationError },
    #[snafu(display("Cannot use {} as the target root", root.display()))]
    RootError {
        root: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Critical failure encountered while planning entries"))]
    PlanningError { source: PlanError },
    #[snafu(display("Critical failure encountered during application execution"))]
    ApplicationExecutionError { source: ExecutionError },
    #[snafu(display("Failed to write relabel list {}", list_path.display()))]
    RelabelListError {
        list_path: PathBuf,
        source: std::io::Error,
    },
}
