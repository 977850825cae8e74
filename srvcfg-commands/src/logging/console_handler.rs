use std::fmt::Display;

use anyhow::Result;
use srvcfg_core::{Address, Batch, InvalidCommand, Values};
use srvcfg_offline::{
    template::REPLACE_EXISTING, AddChild, ChangeChild, Element, OfflineSession, Parameters,
    TransformRegistry,
};
use srvcfg_online::Operations;

use super::{
    change_handler_element, handler_element, handler_order, subsystem, subsystem_order, subtree,
    value_element, ConsoleTarget, HandlerBuilder, HandlerCommon,
};
use crate::command::{add_resource, change_resource, non_empty, Command};

const RESOURCE: &str = "console-handler";
const ADD_TEMPLATE: &str = "add-console-handler";
const CHANGE_TEMPLATE: &str = "change-console-handler";

fn address(name: &str) -> Address {
    subsystem().and(RESOURCE, name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddConsoleHandler {
    name: String,
    common: HandlerCommon,
    target: Option<ConsoleTarget>,
    replace_existing: bool,
}

#[derive(Debug, Clone)]
pub struct AddConsoleHandlerBuilder {
    name: String,
    common: HandlerCommon,
    target: Option<ConsoleTarget>,
    replace_existing: bool,
}

impl AddConsoleHandlerBuilder {
    pub fn new(name: &str) -> Self {
        AddConsoleHandlerBuilder {
            name: name.to_string(),
            common: HandlerCommon::default(),
            target: None,
            replace_existing: false,
        }
    }

    pub fn target(mut self, target: ConsoleTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn replace_existing(mut self, replace_existing: bool) -> Self {
        self.replace_existing = replace_existing;
        self
    }

    /// Sets all common settings at once.
    pub fn with_common(mut self, common: HandlerCommon) -> Self {
        self.common = common;
        self
    }

    pub fn build(self) -> Result<AddConsoleHandler, InvalidCommand> {
        non_empty("AddConsoleHandler", "name", &self.name)?;
        self.common.validate("AddConsoleHandler")?;
        Ok(AddConsoleHandler {
            name: self.name,
            common: self.common,
            target: self.target,
            replace_existing: self.replace_existing,
        })
    }
}

impl HandlerBuilder for AddConsoleHandlerBuilder {
    fn common(&mut self) -> &mut HandlerCommon {
        &mut self.common
    }
}

impl Display for AddConsoleHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AddConsoleHandler {}", self.name)
    }
}

impl Command for AddConsoleHandler {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        let values = self
            .common
            .add_values(Values::empty())
            .and_optional("target", self.target.map(|t| t.as_str()));
        add_resource(ops, &address(&self.name), values, self.replace_existing)
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = self
            .common
            .params(Parameters::new().with("name", self.name.as_str()))
            .with_optional("target", self.target.map(|t| t.as_str()))
            .with(REPLACE_EXISTING, self.replace_existing);
        session.transform(&subtree(), ADD_TEMPLATE, &params)
    }
}

/// Changes the settings of an existing console handler. Settings left unset
/// are not touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeConsoleHandler {
    name: String,
    common: HandlerCommon,
    target: Option<ConsoleTarget>,
}

#[derive(Debug, Clone)]
pub struct ChangeConsoleHandlerBuilder {
    name: String,
    common: HandlerCommon,
    target: Option<ConsoleTarget>,
}

impl ChangeConsoleHandlerBuilder {
    pub fn new(name: &str) -> Self {
        ChangeConsoleHandlerBuilder {
            name: name.to_string(),
            common: HandlerCommon::default(),
            target: None,
        }
    }

    pub fn target(mut self, target: ConsoleTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_common(mut self, common: HandlerCommon) -> Self {
        self.common = common;
        self
    }

    pub fn build(self) -> Result<ChangeConsoleHandler, InvalidCommand> {
        non_empty("ChangeConsoleHandler", "name", &self.name)?;
        self.common.validate("ChangeConsoleHandler")?;
        Ok(ChangeConsoleHandler {
            name: self.name,
            common: self.common,
            target: self.target,
        })
    }
}

impl HandlerBuilder for ChangeConsoleHandlerBuilder {
    fn common(&mut self) -> &mut HandlerCommon {
        &mut self.common
    }
}

impl Display for ChangeConsoleHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChangeConsoleHandler {}", self.name)
    }
}

impl Command for ChangeConsoleHandler {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        let address = address(&self.name);
        let mut batch = Batch::new();
        self.common.change_batch(&address, &mut batch);
        if let Some(target) = self.target {
            batch.write_attribute(&address, "target", target.as_str());
        }
        change_resource(ops, &address, &batch)
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = self
            .common
            .params(Parameters::new().with("name", self.name.as_str()))
            .with_optional("target", self.target.map(|t| t.as_str()));
        session.transform(&subtree(), CHANGE_TEMPLATE, &params)
    }
}

fn build_element(params: &Parameters) -> Result<Element> {
    Ok(handler_element(RESOURCE, params)?.with_optional_child(
        params
            .get_str("target")?
            .map(|t| value_element("target", "name", t)),
    ))
}

fn change_element(handler: &mut Element, params: &Parameters) -> Result<()> {
    let order = handler_order(&["target"]);
    change_handler_element(handler, params, &order)?;
    if let Some(target) = params.get_str("target")? {
        order.set(handler, value_element("target", "name", target));
    }
    Ok(())
}

pub(super) fn register_templates(registry: &mut TransformRegistry) {
    registry
        .register(AddChild {
            template: ADD_TEMPLATE,
            element: RESOURCE,
            identity: "name",
            order: subsystem_order(),
            container: None,
            build: build_element,
        })
        .register(ChangeChild {
            template: CHANGE_TEMPLATE,
            element: RESOURCE,
            identity: Some("name"),
            container: None,
            change: change_element,
        });
}
