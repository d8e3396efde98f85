use crate::cli::SuperviseArgs;
use crate::commands::heartbeat_file;
use crate::error::CliError;
use crate::supervisor::{Supervisor, SupervisorExit, SupervisorParts};
use scanmon_client::{MirrorTree, SshTarget};
use scanmon_core::config::Config;
use scanmon_core::logging;
use scanmon_core::store::FileStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn handle_supervise(args: SuperviseArgs, config: &Config) -> Result<(), CliError> {
    let paths = config.instance(&args.instance)?;
    fs_err::create_dir_all(&paths.dir)?;

    match logging::init_supervisor_logger(&paths.name, &config.logging) {
        Ok(log_path) => tracing::debug!("Logging to {}", log_path.display()),
        Err(e) => eprintln!("[WARN] Failed to initialize supervisor logger: {}", e),
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    ctrlc::set_handler(move || {
        signal_token.cancel();
    })?;

    let target = Arc::new(
        SshTarget::new(
            config.mirror.categories.clone(),
            config.supervisor.remote_timeout(),
        )
        .with_programs(
            config.transport.ssh_program.clone(),
            config.transport.rsync_program.clone(),
        ),
    );
    let parts = SupervisorParts {
        store: Arc::new(FileStore::new(&paths)),
        liveness: Arc::new(heartbeat_file(config)),
        scheduler: target.clone(),
        mirror: target,
        counter: Arc::new(MirrorTree::new(&paths.mirror_dir)),
    };

    let supervisor = Supervisor::new(
        paths.name.clone(),
        config.supervisor.clone(),
        paths.mirror_dir.clone(),
        parts,
        shutdown,
    )
    .once(args.once);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let exit = runtime.block_on(supervisor.run());

    match exit {
        SupervisorExit::Orphaned => {
            tracing::warn!("Controller is gone; supervisor for '{}' exited.", paths.name)
        }
        SupervisorExit::Interrupted => {
            tracing::info!("Supervisor for '{}' stopped by signal.", paths.name)
        }
        SupervisorExit::Finished => {
            tracing::info!("Supervisor for '{}' finished its run.", paths.name)
        }
    }
    Ok(())
}
