use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use srvcfg_commands::{templates, CommandPlan, OfflineContext, OnlineContext};
use srvcfg_offline::OfflineSession;
use srvcfg_online::InMemoryController;

use crate::options::{Mode, Scope, Target};

#[derive(clap::Parser, Debug)]
pub(crate) struct Args {
    /// JSON file with the list of commands to apply
    #[arg(long, value_name = "FILE")]
    commands: PathBuf,

    #[command(flatten)]
    target: Target,

    #[command(flatten)]
    scope: Scope,

    /// Apply the commands without writing the result back
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

pub(crate) fn apply(args: &Args) -> Result<()> {
    let plan = CommandPlan::load(&args.commands)?;
    tracing::info!(commands = plan.len(), "loaded command plan");
    match args.target.mode() {
        Some(Mode::Offline(config)) => apply_offline(&plan, config, &args.scope, args.dry_run),
        Some(Mode::Online(model)) => apply_online(&plan, model, args.dry_run),
        None => anyhow::bail!("one of --config or --model is required"),
    }
}

/// Nothing is written unless every command succeeded.
fn apply_offline(plan: &CommandPlan, config: &Path, scope: &Scope, dry_run: bool) -> Result<()> {
    let mut session = OfflineSession::open(config, templates())?;
    session.set_profile(scope.profile.as_deref());
    let mut context = OfflineContext::new(&mut session);
    for command in plan.commands() {
        context.apply(command)?;
    }
    if dry_run {
        print!("{}", session.document().to_xml_string());
        return Ok(());
    }
    session
        .save()
        .with_context(|| format!("Could not save {}", config.display()))
}

fn apply_online(plan: &CommandPlan, model: &Path, dry_run: bool) -> Result<()> {
    let mut controller = InMemoryController::load(model)?;
    let mut context = OnlineContext::new(&mut controller);
    for command in plan.commands() {
        context.apply(command)?;
    }
    if dry_run {
        println!("{}", serde_json::to_string_pretty(controller.snapshot())?);
        return Ok(());
    }
    controller.save(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PLAN: &str = r#"[
        {"command": "add-console-handler", "name": "H1", "level": "WARN", "encoding": "UTF-8", "target": "System.out"},
        {"command": "add-system-property", "name": "foo", "value": "bar"}
    ]"#;

    fn args(dir: &Path, config: Option<PathBuf>, model: Option<PathBuf>) -> Args {
        let commands = dir.join("plan.json");
        fs::write(&commands, PLAN).unwrap();
        Args {
            commands,
            target: Target { config, model },
            scope: Scope::default(),
            dry_run: false,
        }
    }

    #[test]
    fn offline_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("standalone.xml");
        fs::write(&config, include_str!("../../fixtures/standalone.xml")).unwrap();

        apply(&args(dir.path(), Some(config.clone()), None)).unwrap();

        let written = fs::read_to_string(&config).unwrap();
        assert!(written.contains(r#"<console-handler name="H1">"#));
        assert!(written.contains(r#"<property name="foo" value="bar"/>"#));
    }

    #[test]
    fn offline_failure_leaves_the_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("domain.xml");
        let original = include_str!("../../fixtures/domain.xml");
        fs::write(&config, original).unwrap();

        // two profiles, none selected
        let error = apply(&args(dir.path(), Some(config.clone()), None)).unwrap_err();
        assert!(format!("{:#}", error).contains("AddConsoleHandler H1"));
        assert_eq!(fs::read_to_string(&config).unwrap(), original);
    }

    #[test]
    fn online_updates_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.json");
        fs::write(
            &model,
            r#"{"attributes": {}, "children": {"subsystem": {"logging": {"attributes": {}, "children": {}}}}}"#,
        )
        .unwrap();

        apply(&args(dir.path(), None, Some(model.clone()))).unwrap();

        let controller = InMemoryController::load(&model).unwrap();
        let snapshot = controller.snapshot();
        assert_eq!(
            snapshot["children"]["subsystem"]["logging"]["children"]["console-handler"]["H1"]
                ["attributes"]["target"],
            "System.out"
        );
        assert_eq!(
            snapshot["children"]["system-property"]["foo"]["attributes"]["value"],
            "bar"
        );
    }
}
