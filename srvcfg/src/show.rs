use anyhow::Result;
use srvcfg_commands::templates;
use srvcfg_core::Address;
use srvcfg_offline::OfflineSession;
use srvcfg_online::{InMemoryController, Operations};

use crate::options::{subsystem_subtree, Mode, Scope, Target};

#[derive(clap::Parser, Debug)]
pub(crate) struct Args {
    #[command(flatten)]
    target: Target,

    #[command(flatten)]
    scope: Scope,

    /// Show only this subsystem, e.g. `logging`
    #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
    subsystem: Option<String>,
}

pub(crate) fn show(args: &Args) -> Result<()> {
    println!("{}", render(args)?);
    Ok(())
}

fn render(args: &Args) -> Result<String> {
    match args.target.mode() {
        Some(Mode::Offline(config)) => {
            let session = OfflineSession::open_read_only(config, templates())?;
            let subtree = subsystem_subtree(args.subsystem.as_deref(), &args.scope);
            Ok(session.read(&subtree)?.to_xml_string())
        }
        Some(Mode::Online(model)) => {
            let mut controller = InMemoryController::load(model)?;
            let address = match &args.subsystem {
                Some(name) => Address::subsystem(name),
                None => Address::root(),
            };
            let model = Operations::new(&mut controller)
                .read_resource(&address, true)?
                .assert_defined()?;
            Ok(serde_json::to_string_pretty(&model)?)
        }
        None => anyhow::bail!("one of --config or --model is required"),
    }
}
