use crate::cli::StatusArgs;
use crate::commands::heartbeat_file;
use crate::error::CliError;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets, Attribute, Cell, Color, Table};
use scanmon_core::config::Config;
use scanmon_core::liveness::LivenessProbe;
use scanmon_core::model::{JobStatus, SupervisorPhase};
use scanmon_core::store::{FileStore, RequestStore};
use std::collections::BTreeMap;

pub fn handle_status(args: StatusArgs, config: &Config) -> Result<(), CliError> {
    let instances = match args.instance {
        Some(name) => vec![name],
        None => config.list_instances()?,
    };

    let mut statuses = BTreeMap::new();
    for name in &instances {
        let store = FileStore::new(&config.instance(name)?);
        statuses.insert(name.clone(), store.load_status());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    let heartbeat = heartbeat_file(config);
    let heartbeat_line = match heartbeat.age() {
        Some(age) if heartbeat.is_controller_alive() => {
            format!("Controller heartbeat: {}s ago", age.as_secs()).green()
        }
        Some(age) => format!(
            "Controller heartbeat: stale ({}s ago, timeout {}s)",
            age.as_secs(),
            heartbeat.timeout().as_secs()
        )
        .red(),
        None => "Controller heartbeat: missing".red(),
    };
    println!("{}", heartbeat_line);

    if statuses.is_empty() {
        println!("No instances in {}", config.instances_dir().display());
        return Ok(());
    }

    println!("{}", render_table(&statuses));
    Ok(())
}

fn phase_color(phase: SupervisorPhase) -> Color {
    match phase {
        SupervisorPhase::Idle => Color::Grey,
        SupervisorPhase::Submitting | SupervisorPhase::Monitoring => Color::Cyan,
        SupervisorPhase::Complete => Color::Green,
        SupervisorPhase::Timeout | SupervisorPhase::Cancelled => Color::Yellow,
        SupervisorPhase::Orphaned | SupervisorPhase::Stopped => Color::Red,
    }
}

fn render_table(statuses: &BTreeMap<String, Option<JobStatus>>) -> String {
    let header = ["Instance", "State", "Progress", "Mirror", "Job", "Message"];
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );

    for (name, status) in statuses {
        let row = match status {
            Some(s) => vec![
                Cell::new(name).fg(Color::Yellow),
                Cell::new(s.state).fg(phase_color(s.state)),
                Cell::new(format!("{}/{}", s.artifacts_observed, s.artifacts_expected)),
                Cell::new(if s.last_mirror_succeeded { "ok" } else { "-" }),
                Cell::new(s.job_id.as_deref().unwrap_or("-")),
                Cell::new(&s.message),
            ],
            None => vec![
                Cell::new(name).fg(Color::Yellow),
                Cell::new("unknown"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("No status written yet"),
            ],
        };
        table.add_row(row);
    }
    table.to_string()
}
