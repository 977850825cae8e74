use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use srvcfg_core::{Address, InvalidCommand};
use srvcfg_offline::{OfflineSession, Parameters, RemoveChild, TransformRegistry};
use srvcfg_online::Operations;

use super::{subsystem, subtree};
use crate::command::{non_empty, remove_resource, Command};

/// Handler types that can be removed. The resource type and the element
/// name are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerType {
    ConsoleHandler,
    PeriodicRotatingFileHandler,
}

impl HandlerType {
    pub const ALL: [HandlerType; 2] = [HandlerType::ConsoleHandler, HandlerType::PeriodicRotatingFileHandler];

    pub fn resource_type(&self) -> &'static str {
        match self {
            HandlerType::ConsoleHandler => "console-handler",
            HandlerType::PeriodicRotatingFileHandler => "periodic-rotating-file-handler",
        }
    }

    fn remove_template(&self) -> &'static str {
        match self {
            HandlerType::ConsoleHandler => "remove-console-handler",
            HandlerType::PeriodicRotatingFileHandler => "remove-periodic-rotating-file-handler",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLogHandler {
    handler_type: HandlerType,
    name: String,
}

impl RemoveLogHandler {
    pub fn new(handler_type: HandlerType, name: &str) -> Result<Self, InvalidCommand> {
        non_empty("RemoveLogHandler", "name", name)?;
        Ok(RemoveLogHandler {
            handler_type,
            name: name.to_string(),
        })
    }

    fn address(&self) -> Address {
        subsystem().and(self.handler_type.resource_type(), &self.name)
    }
}

impl Display for RemoveLogHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RemoveLogHandler {} {}", self.handler_type.resource_type(), self.name)
    }
}

impl Command for RemoveLogHandler {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        remove_resource(ops, &self.address())
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        session.transform(
            &subtree(),
            self.handler_type.remove_template(),
            &Parameters::new().with("name", self.name.as_str()),
        )
    }
}

pub(super) fn register_templates(registry: &mut TransformRegistry) {
    for handler_type in HandlerType::ALL {
        registry.register(RemoveChild {
            template: handler_type.remove_template(),
            element: handler_type.resource_type(),
            identity: "name",
            container: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        logging, templates,
        testing::{logging_controller, Recording},
        OfflineContext, OnlineContext,
    };
    use srvcfg_core::PreconditionFailed;
    use srvcfg_offline::Document;

    const STANDALONE: &str = include_str!("../../../fixtures/standalone.xml");

    #[test]
    fn online_remove() {
        let mut controller = logging_controller();
        let remove = logging::remove_handler(HandlerType::ConsoleHandler, "CONSOLE").unwrap();
        let mut context = OnlineContext::new(&mut controller);
        context.apply(&remove).unwrap();
        assert!(!context.operations().exists(&remove.address()).unwrap());

        let error = context.apply(&remove).unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
    }

    #[test]
    fn online_remove_of_missing_sends_no_remove() {
        let mut controller = logging_controller();
        let mut recording = Recording::new(&mut controller);
        let remove =
            logging::remove_handler(HandlerType::PeriodicRotatingFileHandler, "CONSOLE").unwrap();
        assert!(OnlineContext::new(&mut recording).apply(&remove).is_err());
        assert!(recording.mutations().is_empty());
    }

    #[test]
    fn offline_remove_takes_the_whole_element() {
        let mut session =
            OfflineSession::from_document(Document::parse(STANDALONE).unwrap(), templates());
        let remove =
            logging::remove_handler(HandlerType::PeriodicRotatingFileHandler, "FILE").unwrap();
        OfflineContext::new(&mut session).apply(&remove).unwrap();

        let output = session.document().to_xml_string();
        assert!(!output.contains("periodic-rotating-file-handler"));
        assert!(output.contains(
            "                </formatter>\n            </console-handler>\n            <logger category=\"com.arjuna\">"
        ));

        let error = OfflineContext::new(&mut session).apply(&remove).unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
    }

    #[test]
    fn blank_name_is_invalid() {
        assert!(logging::remove_handler(HandlerType::ConsoleHandler, "").is_err());
    }
}
