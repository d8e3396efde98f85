use crate::cli::CountArgs;
use crate::error::CliError;
use scanmon_client::artifacts::{default_identity, distinct_points};
use scanmon_core::config::Config;
use scanmon_core::errors::ConfigError;

pub fn handle_count(args: CountArgs, config: &Config) -> Result<(), CliError> {
    let root = match (args.dir, args.instance) {
        (Some(dir), _) => dir,
        (None, Some(instance)) => config.instance(&instance)?.mirror_dir,
        (None, None) => {
            return Err(CliError::Config(ConfigError::General(
                "Pass --instance or --dir.".to_string(),
            )))
        }
    };

    let mut points: Vec<_> = distinct_points(&root, default_identity).into_iter().collect();
    points.sort();
    tracing::debug!("Counted {} points under {}", points.len(), root.display());
    for point in &points {
        println!("{}", point);
    }
    println!("{} distinct data points in {}", points.len(), root.display());
    Ok(())
}
