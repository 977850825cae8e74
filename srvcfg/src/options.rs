use std::{io::IsTerminal as _, path::PathBuf};

use clap::{Args, ColorChoice, Parser};
use srvcfg_offline::Subtree;

#[derive(Parser, Debug, Clone)]
pub struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

impl Options {
    /// Whether log output on stderr should be colored.
    pub fn use_color(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        }
    }
}

/// Where commands are applied: a configuration file, or a model snapshot
/// standing in for a running server.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Configuration file of a stopped server, e.g. standalone.xml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON model snapshot of a server's management model
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,
}

pub enum Mode<'a> {
    Offline(&'a PathBuf),
    Online(&'a PathBuf),
}

impl Target {
    pub fn mode(&self) -> Option<Mode<'_>> {
        match (&self.config, &self.model) {
            (Some(config), _) => Some(Mode::Offline(config)),
            (None, Some(model)) => Some(Mode::Online(model)),
            (None, None) => None,
        }
    }
}

/// Selects the part of a configuration file to work on.
#[derive(Args, Debug, Clone, Default)]
pub struct Scope {
    /// Profile to use when the file has several, as a domain configuration
    /// does
    #[arg(long)]
    pub profile: Option<String>,
}

pub fn subsystem_subtree(name: Option<&str>, scope: &Scope) -> Subtree {
    match name {
        Some(name) => Subtree::subsystem_in_profile(name, scope.profile.as_deref()),
        None => Subtree::Root,
    }
}
