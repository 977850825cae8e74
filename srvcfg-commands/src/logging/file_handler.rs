use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use srvcfg_core::{Address, InvalidCommand, Values};
use srvcfg_offline::{
    template::REPLACE_EXISTING, AddChild, Element, OfflineSession, Parameters, TransformRegistry,
};
use srvcfg_online::Operations;

use super::{
    handler_element, subsystem, subsystem_order, subtree, value_element, HandlerBuilder,
    HandlerCommon,
};
use crate::command::{add_resource, non_empty, Command};

const RESOURCE: &str = "periodic-rotating-file-handler";
const ADD_TEMPLATE: &str = "add-periodic-rotating-file-handler";

fn address(name: &str) -> Address {
    subsystem().and(RESOURCE, name)
}

/// Where a file handler writes: a path, optionally relative to a named path
/// such as `jboss.server.log.dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub relative_to: Option<String>,
}

impl FileSpec {
    fn values(&self) -> Values {
        Values::of("path", self.path.as_str()).and_optional("relative-to", self.relative_to.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPeriodicRotatingFileHandler {
    name: String,
    common: HandlerCommon,
    file: FileSpec,
    suffix: String,
    append: Option<bool>,
    replace_existing: bool,
}

#[derive(Debug, Clone)]
pub struct AddPeriodicRotatingFileHandlerBuilder {
    name: String,
    common: HandlerCommon,
    file: Option<FileSpec>,
    suffix: Option<String>,
    append: Option<bool>,
    replace_existing: bool,
}

impl AddPeriodicRotatingFileHandlerBuilder {
    pub fn new(name: &str) -> Self {
        AddPeriodicRotatingFileHandlerBuilder {
            name: name.to_string(),
            common: HandlerCommon::default(),
            file: None,
            suffix: None,
            append: None,
            replace_existing: false,
        }
    }

    pub fn file(mut self, path: &str, relative_to: Option<&str>) -> Self {
        self.file = Some(FileSpec {
            path: path.to_string(),
            relative_to: relative_to.map(str::to_string),
        });
        self
    }

    /// Date pattern appended to rotated files, e.g. `.yyyy-MM-dd`. It also
    /// determines the rotation period.
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = Some(append);
        self
    }

    pub fn replace_existing(mut self, replace_existing: bool) -> Self {
        self.replace_existing = replace_existing;
        self
    }

    pub fn with_common(mut self, common: HandlerCommon) -> Self {
        self.common = common;
        self
    }

    pub fn build(self) -> Result<AddPeriodicRotatingFileHandler, InvalidCommand> {
        const COMMAND: &str = "AddPeriodicRotatingFileHandler";
        non_empty(COMMAND, "name", &self.name)?;
        self.common.validate(COMMAND)?;
        let Some(file) = self.file else {
            return Err(InvalidCommand::new(COMMAND, "file must be set"));
        };
        non_empty(COMMAND, "file path", &file.path)?;
        let Some(suffix) = self.suffix else {
            return Err(InvalidCommand::new(COMMAND, "suffix must be set"));
        };
        non_empty(COMMAND, "suffix", &suffix)?;
        Ok(AddPeriodicRotatingFileHandler {
            name: self.name,
            common: self.common,
            file,
            suffix,
            append: self.append,
            replace_existing: self.replace_existing,
        })
    }
}

impl HandlerBuilder for AddPeriodicRotatingFileHandlerBuilder {
    fn common(&mut self) -> &mut HandlerCommon {
        &mut self.common
    }
}

impl Display for AddPeriodicRotatingFileHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AddPeriodicRotatingFileHandler {}", self.name)
    }
}

impl Command for AddPeriodicRotatingFileHandler {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        let values = self
            .common
            .add_values(Values::empty())
            .and_object("file", self.file.values())
            .and("suffix", self.suffix.as_str())
            .and_optional("append", self.append);
        add_resource(ops, &address(&self.name), values, self.replace_existing)
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = self
            .common
            .params(Parameters::new().with("name", self.name.as_str()))
            .with("path", self.file.path.as_str())
            .with_optional("relativeTo", self.file.relative_to.as_deref())
            .with("suffix", self.suffix.as_str())
            .with_optional("append", self.append)
            .with(REPLACE_EXISTING, self.replace_existing);
        session.transform(&subtree(), ADD_TEMPLATE, &params)
    }
}

fn build_element(params: &Parameters) -> Result<Element> {
    let file = Element::new("file")
        .with_optional_attribute("relative-to", params.get_str("relativeTo")?)
        .with_attribute("path", params.require_str("path")?);
    Ok(handler_element(RESOURCE, params)?
        .with_child(file)
        .with_child(value_element("suffix", "value", params.require_str("suffix")?))
        .with_optional_child(
            params
                .get_bool("append")?
                .map(|a| value_element("append", "value", &a.to_string())),
        ))
}

pub(super) fn register_templates(registry: &mut TransformRegistry) {
    registry.register(AddChild {
        template: ADD_TEMPLATE,
        element: RESOURCE,
        identity: "name",
        order: subsystem_order(),
        container: None,
        build: build_element,
    });
}
