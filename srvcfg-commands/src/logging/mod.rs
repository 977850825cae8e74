//! Commands for the logging subsystem: handlers, loggers and the root logger.
//!
//! Start from the constructor functions, e.g.
//! `logging::add_console_handler("H1").level(Level::Warn).build()`.

mod console_handler;
mod file_handler;
mod logger;
mod remove_handler;

use std::fmt::Display;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use srvcfg_core::{Address, Batch, InvalidCommand, Values};
use srvcfg_offline::{order, ChildOrder, Element, Parameters, Subtree, TransformRegistry};

pub use console_handler::{
    AddConsoleHandler, AddConsoleHandlerBuilder, ChangeConsoleHandler, ChangeConsoleHandlerBuilder,
};
pub use file_handler::{AddPeriodicRotatingFileHandler, AddPeriodicRotatingFileHandlerBuilder, FileSpec};
pub use logger::{
    AddLogger, AddLoggerBuilder, ChangeLogger, ChangeLoggerBuilder, ChangeRootLogger,
    ChangeRootLoggerBuilder, RemoveLogger,
};
pub use remove_handler::{HandlerType, RemoveLogHandler};

use crate::command::non_empty;

pub const SUBSYSTEM: &str = "logging";

pub fn subsystem() -> Address {
    Address::subsystem(SUBSYSTEM)
}

pub fn subtree() -> Subtree {
    Subtree::subsystem(SUBSYSTEM)
}

pub fn add_console_handler(name: &str) -> AddConsoleHandlerBuilder {
    AddConsoleHandlerBuilder::new(name)
}

pub fn change_console_handler(name: &str) -> ChangeConsoleHandlerBuilder {
    ChangeConsoleHandlerBuilder::new(name)
}

pub fn add_periodic_rotating_file_handler(name: &str) -> AddPeriodicRotatingFileHandlerBuilder {
    AddPeriodicRotatingFileHandlerBuilder::new(name)
}

pub fn remove_handler(handler_type: HandlerType, name: &str) -> Result<RemoveLogHandler, InvalidCommand> {
    RemoveLogHandler::new(handler_type, name)
}

pub fn add_logger(category: &str) -> AddLoggerBuilder {
    AddLoggerBuilder::new(category)
}

pub fn change_logger(category: &str) -> ChangeLoggerBuilder {
    ChangeLoggerBuilder::new(category)
}

pub fn remove_logger(category: &str) -> Result<RemoveLogger, InvalidCommand> {
    RemoveLogger::new(category)
}

pub fn change_root_logger() -> ChangeRootLoggerBuilder {
    ChangeRootLoggerBuilder::default()
}

/// Registers the offline templates of all logging commands.
pub fn register_templates(registry: &mut TransformRegistry) {
    console_handler::register_templates(registry);
    file_handler::register_templates(registry);
    logger::register_templates(registry);
    remove_handler::register_templates(registry);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    All,
    Finest,
    Finer,
    Trace,
    Debug,
    Fine,
    Config,
    Info,
    Warn,
    Warning,
    Error,
    Severe,
    Fatal,
    Off,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Finest => "FINEST",
            Level::Finer => "FINER",
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Fine => "FINE",
            Level::Config => "CONFIG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Severe => "SEVERE",
            Level::Fatal => "FATAL",
            Level::Off => "OFF",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a handler formats records. A handler has a pattern of its own or
/// refers to a formatter defined in the subsystem, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Formatter {
    Pattern(String),
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleTarget {
    #[serde(rename = "System.out")]
    SystemOut,
    #[serde(rename = "System.err")]
    SystemErr,
}

impl ConsoleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleTarget::SystemOut => "System.out",
            ConsoleTarget::SystemErr => "System.err",
        }
    }
}

/// Settings every handler type has. `None` leaves the setting alone, or to
/// the server default when adding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HandlerCommon {
    pub level: Option<Level>,
    pub encoding: Option<String>,
    pub filter_spec: Option<String>,
    pub formatter: Option<Formatter>,
    pub autoflush: Option<bool>,
    pub enabled: Option<bool>,
}

impl HandlerCommon {
    pub(crate) fn validate(&self, command: &'static str) -> Result<(), InvalidCommand> {
        if let Some(encoding) = &self.encoding {
            non_empty(command, "encoding", encoding)?;
        }
        if let Some(filter_spec) = &self.filter_spec {
            non_empty(command, "filter-spec", filter_spec)?;
        }
        match &self.formatter {
            Some(Formatter::Pattern(pattern)) => non_empty(command, "pattern formatter", pattern)?,
            Some(Formatter::Named(name)) => non_empty(command, "named formatter", name)?,
            None => {}
        }
        Ok(())
    }

    pub(crate) fn add_values(&self, values: Values) -> Values {
        let (pattern, named) = match &self.formatter {
            Some(Formatter::Pattern(p)) => (Some(p.as_str()), None),
            Some(Formatter::Named(n)) => (None, Some(n.as_str())),
            None => (None, None),
        };
        values
            .and_optional("level", self.level.map(|l| l.as_str()))
            .and_optional("encoding", self.encoding.as_deref())
            .and_optional("filter-spec", self.filter_spec.as_deref())
            .and_optional("formatter", pattern)
            .and_optional("named-formatter", named)
            .and_optional("autoflush", self.autoflush)
            .and_optional("enabled", self.enabled)
    }

    pub(crate) fn change_batch(&self, address: &Address, batch: &mut Batch) {
        if let Some(level) = self.level {
            batch.write_attribute(address, "level", level.as_str());
        }
        if let Some(encoding) = &self.encoding {
            batch.write_attribute(address, "encoding", encoding.as_str());
        }
        if let Some(filter_spec) = &self.filter_spec {
            batch.write_attribute(address, "filter-spec", filter_spec.as_str());
        }
        match &self.formatter {
            Some(Formatter::Pattern(pattern)) => {
                batch
                    .undefine_attribute(address, "named-formatter")
                    .write_attribute(address, "formatter", pattern.as_str());
            }
            Some(Formatter::Named(name)) => {
                batch
                    .undefine_attribute(address, "formatter")
                    .write_attribute(address, "named-formatter", name.as_str());
            }
            None => {}
        }
        if let Some(autoflush) = self.autoflush {
            batch.write_attribute(address, "autoflush", autoflush);
        }
        if let Some(enabled) = self.enabled {
            batch.write_attribute(address, "enabled", enabled);
        }
    }

    pub(crate) fn params(&self, params: Parameters) -> Parameters {
        let (pattern, named) = match &self.formatter {
            Some(Formatter::Pattern(p)) => (Some(p.as_str()), None),
            Some(Formatter::Named(n)) => (None, Some(n.as_str())),
            None => (None, None),
        };
        params
            .with_optional("level", self.level.map(|l| l.as_str()))
            .with_optional("encoding", self.encoding.as_deref())
            .with_optional("filterSpec", self.filter_spec.as_deref())
            .with_optional("patternFormatter", pattern)
            .with_optional("namedFormatter", named)
            .with_optional("autoflush", self.autoflush)
            .with_optional("enabled", self.enabled)
    }
}

/// Builders of handler commands share the [`HandlerCommon`] setters.
pub trait HandlerBuilder: Sized {
    fn common(&mut self) -> &mut HandlerCommon;

    fn level(mut self, level: Level) -> Self {
        self.common().level = Some(level);
        self
    }

    fn encoding(mut self, encoding: &str) -> Self {
        self.common().encoding = Some(encoding.to_string());
        self
    }

    fn filter_spec(mut self, filter_spec: &str) -> Self {
        self.common().filter_spec = Some(filter_spec.to_string());
        self
    }

    fn formatter(mut self, formatter: Formatter) -> Self {
        self.common().formatter = Some(formatter);
        self
    }

    fn pattern_formatter(self, pattern: &str) -> Self {
        self.formatter(Formatter::Pattern(pattern.to_string()))
    }

    fn named_formatter(self, name: &str) -> Self {
        self.formatter(Formatter::Named(name.to_string()))
    }

    fn autoflush(mut self, autoflush: bool) -> Self {
        self.common().autoflush = Some(autoflush);
        self
    }

    fn enabled(mut self, enabled: bool) -> Self {
        self.common().enabled = Some(enabled);
        self
    }
}

// Document layout of the logging subsystem.

pub(crate) fn subsystem_order() -> ChildOrder {
    ChildOrder::new(&[
        &["add-logging-api-dependencies"],
        &["use-deployment-logging-config"],
        &[
            "async-handler",
            "console-handler",
            "custom-handler",
            "file-handler",
            "periodic-rotating-file-handler",
            "periodic-size-rotating-file-handler",
            "size-rotating-file-handler",
            "syslog-handler",
            "socket-handler",
        ],
        &["logger"],
        &["root-logger"],
        &["formatter"],
        &["filter"],
        &["logging-profiles"],
    ])
}

/// Children every handler element starts with, in this order.
const HANDLER_HEAD: [&[&str]; 4] = [&["level"], &["encoding"], &["filter", "filter-spec"], &["formatter"]];

pub(crate) fn handler_order(tail: &[&str]) -> ChildOrder {
    let mut groups: Vec<&[&str]> = HANDLER_HEAD.to_vec();
    let tail: Vec<[&str; 1]> = tail.iter().map(|name| [*name]).collect();
    groups.extend(tail.iter().map(|name| name.as_slice()));
    ChildOrder::new(&groups)
}

pub(crate) fn value_element(name: &str, attribute: &str, value: &str) -> Element {
    Element::new(name).with_attribute(attribute, value)
}

fn formatter_element(params: &Parameters) -> Result<Option<Element>> {
    Ok(
        match (params.get_str("patternFormatter")?, params.get_str("namedFormatter")?) {
            (Some(_), Some(_)) => bail!("patternFormatter and namedFormatter are mutually exclusive"),
            (Some(pattern), None) => Some(
                Element::new("formatter")
                    .with_child(value_element("pattern-formatter", "pattern", pattern)),
            ),
            (None, Some(name)) => Some(
                Element::new("formatter").with_child(value_element("named-formatter", "name", name)),
            ),
            (None, None) => None,
        },
    )
}

/// A new handler element with the common attributes and children.
pub(crate) fn handler_element(kind: &str, params: &Parameters) -> Result<Element> {
    Ok(Element::new(kind)
        .with_attribute("name", params.require_str("name")?)
        .with_optional_attribute("autoflush", params.get_bool("autoflush")?.map(|b| b.to_string()))
        .with_optional_attribute("enabled", params.get_bool("enabled")?.map(|b| b.to_string()))
        .with_optional_child(params.get_str("level")?.map(|l| value_element("level", "name", l)))
        .with_optional_child(params.get_str("encoding")?.map(|e| value_element("encoding", "value", e)))
        .with_optional_child(
            params
                .get_str("filterSpec")?
                .map(|f| value_element("filter-spec", "value", f)),
        )
        .with_optional_child(formatter_element(params)?))
}

/// Applies the supplied common settings to an existing handler element.
pub(crate) fn change_handler_element(
    handler: &mut Element,
    params: &Parameters,
    order: &ChildOrder,
) -> Result<()> {
    if let Some(autoflush) = params.get_bool("autoflush")? {
        handler.set_attribute("autoflush", autoflush.to_string());
    }
    if let Some(enabled) = params.get_bool("enabled")? {
        handler.set_attribute("enabled", enabled.to_string());
    }
    if let Some(level) = params.get_str("level")? {
        order.set(handler, value_element("level", "name", level));
    }
    if let Some(encoding) = params.get_str("encoding")? {
        order.set(handler, value_element("encoding", "value", encoding));
    }
    if let Some(filter_spec) = params.get_str("filterSpec")? {
        order::remove_named(handler, "filter");
        order.set(handler, value_element("filter-spec", "value", filter_spec));
    }
    if let Some(formatter) = formatter_element(params)? {
        order.set(handler, formatter);
    }
    Ok(())
}
