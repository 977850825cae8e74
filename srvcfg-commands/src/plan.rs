//! Command plans: a JSON list of commands to apply in order.
//!
//! ```json
//! [
//!   {"command": "add-console-handler", "name": "H1", "level": "WARN", "target": "System.out"},
//!   {"command": "change-logger", "category": "L1", "handlers": []}
//! ]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use srvcfg_core::InvalidCommand;

use crate::{
    logging::{self, ConsoleTarget, FileSpec, HandlerCommon, HandlerType, Level},
    system_property::{AddSystemProperty, RemoveSystemProperty},
    Command,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
#[serde(rename_all_fields = "kebab-case")]
enum PlanEntry {
    AddConsoleHandler {
        name: String,
        #[serde(flatten)]
        common: HandlerCommon,
        target: Option<ConsoleTarget>,
        #[serde(default)]
        replace_existing: bool,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    ChangeConsoleHandler {
        name: String,
        #[serde(flatten)]
        common: HandlerCommon,
        target: Option<ConsoleTarget>,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    AddPeriodicRotatingFileHandler {
        name: String,
        #[serde(flatten)]
        common: HandlerCommon,
        file: FileSpec,
        suffix: String,
        append: Option<bool>,
        #[serde(default)]
        replace_existing: bool,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    RemoveHandler {
        #[serde(rename = "type")]
        handler_type: HandlerType,
        name: String,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    AddLogger {
        category: String,
        level: Option<Level>,
        filter_spec: Option<String>,
        handlers: Option<Vec<String>>,
        use_parent_handlers: Option<bool>,
        #[serde(default)]
        replace_existing: bool,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    ChangeLogger {
        category: String,
        level: Option<Level>,
        filter_spec: Option<String>,
        handlers: Option<Vec<String>>,
        use_parent_handlers: Option<bool>,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    RemoveLogger {
        category: String,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    ChangeRootLogger {
        level: Option<Level>,
        filter_spec: Option<String>,
        handlers: Option<Vec<String>>,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    AddSystemProperty {
        name: String,
        value: String,
        #[serde(default)]
        replace_existing: bool,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
    RemoveSystemProperty {
        name: String,
        #[serde(flatten)]
        unknown: Map<String, Value>,
    },
}

fn str_list(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

impl PlanEntry {
    /// Keys that matched no field, which would otherwise be dropped and turn
    /// a misspelled setting into a no-op.
    fn reject_unknown_fields(&self) -> Result<(), InvalidCommand> {
        let (command, unknown) = match self {
            PlanEntry::AddConsoleHandler { unknown, .. } => ("AddConsoleHandler", unknown),
            PlanEntry::ChangeConsoleHandler { unknown, .. } => ("ChangeConsoleHandler", unknown),
            PlanEntry::AddPeriodicRotatingFileHandler { unknown, .. } => {
                ("AddPeriodicRotatingFileHandler", unknown)
            }
            PlanEntry::RemoveHandler { unknown, .. } => ("RemoveLogHandler", unknown),
            PlanEntry::AddLogger { unknown, .. } => ("AddLogger", unknown),
            PlanEntry::ChangeLogger { unknown, .. } => ("ChangeLogger", unknown),
            PlanEntry::RemoveLogger { unknown, .. } => ("RemoveLogger", unknown),
            PlanEntry::ChangeRootLogger { unknown, .. } => ("ChangeRootLogger", unknown),
            PlanEntry::AddSystemProperty { unknown, .. } => ("AddSystemProperty", unknown),
            PlanEntry::RemoveSystemProperty { unknown, .. } => ("RemoveSystemProperty", unknown),
        };
        if unknown.is_empty() {
            return Ok(());
        }
        let keys: Vec<&str> = unknown.keys().map(String::as_str).collect();
        Err(InvalidCommand::new(
            command,
            format!("unknown field(s): {}", keys.join(", ")),
        ))
    }

    fn into_command(self) -> Result<Box<dyn Command>, InvalidCommand> {
        self.reject_unknown_fields()?;
        let command: Box<dyn Command> = match self {
            PlanEntry::AddConsoleHandler {
                name,
                common,
                target,
                replace_existing,
                ..
            } => {
                let mut builder = logging::add_console_handler(&name)
                    .with_common(common)
                    .replace_existing(replace_existing);
                if let Some(target) = target {
                    builder = builder.target(target);
                }
                Box::new(builder.build()?)
            }
            PlanEntry::ChangeConsoleHandler {
                name,
                common,
                target,
                ..
            } => {
                let mut builder = logging::change_console_handler(&name).with_common(common);
                if let Some(target) = target {
                    builder = builder.target(target);
                }
                Box::new(builder.build()?)
            }
            PlanEntry::AddPeriodicRotatingFileHandler {
                name,
                common,
                file,
                suffix,
                append,
                replace_existing,
                ..
            } => {
                let mut builder = logging::add_periodic_rotating_file_handler(&name)
                    .with_common(common)
                    .file(&file.path, file.relative_to.as_deref())
                    .suffix(&suffix)
                    .replace_existing(replace_existing);
                if let Some(append) = append {
                    builder = builder.append(append);
                }
                Box::new(builder.build()?)
            }
            PlanEntry::RemoveHandler {
                handler_type, name, ..
            } => {
                Box::new(logging::remove_handler(handler_type, &name)?)
            }
            PlanEntry::AddLogger {
                category,
                level,
                filter_spec,
                handlers,
                use_parent_handlers,
                replace_existing,
                ..
            } => {
                let mut builder = logging::add_logger(&category).replace_existing(replace_existing);
                if let Some(level) = level {
                    builder = builder.level(level);
                }
                if let Some(filter_spec) = filter_spec {
                    builder = builder.filter_spec(&filter_spec);
                }
                if let Some(handlers) = handlers {
                    builder = builder.handlers(&str_list(&handlers));
                }
                if let Some(use_parent_handlers) = use_parent_handlers {
                    builder = builder.use_parent_handlers(use_parent_handlers);
                }
                Box::new(builder.build()?)
            }
            PlanEntry::ChangeLogger {
                category,
                level,
                filter_spec,
                handlers,
                use_parent_handlers,
                ..
            } => {
                let mut builder = logging::change_logger(&category);
                if let Some(level) = level {
                    builder = builder.level(level);
                }
                if let Some(filter_spec) = filter_spec {
                    builder = builder.filter_spec(&filter_spec);
                }
                if let Some(handlers) = handlers {
                    builder = builder.handlers(&str_list(&handlers));
                }
                if let Some(use_parent_handlers) = use_parent_handlers {
                    builder = builder.use_parent_handlers(use_parent_handlers);
                }
                Box::new(builder.build()?)
            }
            PlanEntry::RemoveLogger { category, .. } => Box::new(logging::remove_logger(&category)?),
            PlanEntry::ChangeRootLogger {
                level,
                filter_spec,
                handlers,
                ..
            } => {
                let mut builder = logging::change_root_logger();
                if let Some(level) = level {
                    builder = builder.level(level);
                }
                if let Some(filter_spec) = filter_spec {
                    builder = builder.filter_spec(&filter_spec);
                }
                if let Some(handlers) = handlers {
                    builder = builder.handlers(&str_list(&handlers));
                }
                Box::new(builder.build()?)
            }
            PlanEntry::AddSystemProperty {
                name,
                value,
                replace_existing,
                ..
            } => Box::new(AddSystemProperty::new(&name, &value)?.replace_existing(replace_existing)),
            PlanEntry::RemoveSystemProperty { name, .. } => Box::new(RemoveSystemProperty::new(&name)?),
        };
        Ok(command)
    }
}

/// Validated commands, ready to be applied in order.
pub struct CommandPlan {
    commands: Vec<Box<dyn Command>>,
}

impl CommandPlan {
    pub fn from_json(json: &str) -> Result<CommandPlan> {
        let entries: Vec<PlanEntry> =
            serde_json::from_str(json).context("Could not parse command plan")?;
        let commands = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .into_command()
                    .with_context(|| format!("Invalid command at index {}", i))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CommandPlan { commands })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<CommandPlan> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read command plan {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("In command plan {}", path.display()))
    }

    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
