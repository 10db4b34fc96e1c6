//! Command dispatch.

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{Compose, NodeCore, Owned};
use crate::samples::{EventLog, Marker, Recorder, Value};
use crate::tree_traits::{count, depth, RenderOptions, TreeNodeConvert};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.config_file.as_deref())?;
    debug!(?settings, "settings loaded");

    match &cli.command {
        Some(Commands::Demo { silent_separate }) => demo(&settings, *silent_separate),
        Some(Commands::Tree { full_type_names }) => tree(&settings, *full_type_names),
        Some(Commands::Config { command }) => config(&settings, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `nodecomp --help`".to_string(),
        )),
    }
}

/// Prints the hook events recorded since the previous step.
fn step(log: &EventLog, label: &str) {
    output::action("step", &label);
    let events = log.take();
    if events.is_empty() {
        output::detail(&"(no hooks fired)");
    }
    for event in events {
        output::event(&event);
    }
}

#[instrument(skip(settings))]
fn demo(settings: &Settings, silent_separate: bool) -> CliResult<()> {
    let mut policy = settings.hook_policy();
    if silent_separate {
        policy.notify_on_separate = false;
    }

    let log = EventLog::new();
    let root = Owned::new(Recorder::with_core("root", &log, NodeCore::with_policy(policy)));
    output::header(&format!("demo ({policy:?})"));

    root.add(Value::new(1))?;
    step(&log, "add Value(1)");
    let value = root.require::<Value>()?;
    output::detail(&format!("get::<Value>() = {}", value.value()));
    drop(value);

    root.add(Marker::default())?;
    step(&log, "add Marker");

    root.remove::<Value>();
    step(&log, "remove::<Value>()");
    output::detail(&format!(
        "has::<Value>() = {}, has::<Marker>() = {}",
        root.has::<Value>(),
        root.has::<Marker>()
    ));

    let first = root.separate::<Marker>();
    step(&log, "separate::<Marker>()");
    let second = root.separate::<Marker>();
    output::detail(&format!(
        "first is some: {}, second is some: {}",
        first.is_some(),
        second.is_some()
    ));

    let value = root.add(Value::new(3))?.try_upgrade()?;
    value.set(6);
    step(&log, "add Value(3), set 6");

    let separated = root.separate::<Value>();
    step(&log, "separate::<Value>()");
    value.set(7);
    output::detail(&format!("detached value = {}", value.value()));

    if let Some(separated) = separated {
        root.adopt(separated)?;
        step(&log, "adopt(Value)");
    }

    root.add(Recorder::new("child", &log))?;
    step(&log, "add Recorder(child)");
    root.add(Recorder::new("replacement", &log))?;
    step(&log, "add Recorder(replacement)");

    let cleared = root.clear();
    step(&log, &format!("clear() -> {cleared}"));

    output::info(&root.to_tree_with(settings.render_options()));
    Ok(())
}

#[instrument(skip(settings))]
fn tree(settings: &Settings, full_type_names: bool) -> CliResult<()> {
    let options = RenderOptions {
        full_type_names: full_type_names || settings.display.full_type_names,
    };

    let log = EventLog::new();
    let root = Owned::new(Recorder::with_core(
        "scene",
        &log,
        NodeCore::with_policy(settings.hook_policy()),
    ));
    let value = root.add(Value::new(42))?.try_upgrade()?;
    value.add(Marker::default())?;
    root.add(Marker::default())?;

    output::info(&root.to_tree_with(options));
    output::detail(&format!("depth: {}, nodes: {}", depth(&*root), count(&*root)));
    Ok(())
}

fn config(settings: &Settings, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::detail(&"no config directory available"),
        },
    }
    Ok(())
}
