use std::fmt::Display;

use anyhow::Result;
use srvcfg_core::{Address, Batch, InvalidCommand, Values};
use srvcfg_offline::{
    order, template::REPLACE_EXISTING, AddChild, ChangeChild, ChildOrder, Element, OfflineSession,
    Parameters, RemoveChild, TransformRegistry,
};
use srvcfg_online::Operations;

use super::{subsystem, subsystem_order, subtree, value_element, Level};
use crate::command::{add_resource, change_resource, non_empty, remove_resource, Command};

const LOGGER: &str = "logger";
const ROOT_LOGGER: &str = "root-logger";
const ROOT_LOGGER_NAME: &str = "ROOT";

fn logger_address(category: &str) -> Address {
    subsystem().and(LOGGER, category)
}

fn root_logger_address() -> Address {
    subsystem().and(ROOT_LOGGER, ROOT_LOGGER_NAME)
}

fn logger_order() -> ChildOrder {
    ChildOrder::new(&[&["level"], &["filter", "filter-spec"], &["handlers"]])
}

fn validate_handlers(command: &'static str, handlers: &Option<Vec<String>>) -> Result<(), InvalidCommand> {
    for handler in handlers.iter().flatten() {
        non_empty(command, "handler name", handler)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLogger {
    category: String,
    level: Option<Level>,
    filter_spec: Option<String>,
    handlers: Option<Vec<String>>,
    use_parent_handlers: Option<bool>,
    replace_existing: bool,
}

#[derive(Debug, Clone)]
pub struct AddLoggerBuilder {
    logger: AddLogger,
}

impl AddLoggerBuilder {
    pub fn new(category: &str) -> Self {
        AddLoggerBuilder {
            logger: AddLogger {
                category: category.to_string(),
                level: None,
                filter_spec: None,
                handlers: None,
                use_parent_handlers: None,
                replace_existing: false,
            },
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.logger.level = Some(level);
        self
    }

    pub fn filter_spec(mut self, filter_spec: &str) -> Self {
        self.logger.filter_spec = Some(filter_spec.to_string());
        self
    }

    pub fn handlers(mut self, handlers: &[&str]) -> Self {
        self.logger.handlers = Some(handlers.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn use_parent_handlers(mut self, use_parent_handlers: bool) -> Self {
        self.logger.use_parent_handlers = Some(use_parent_handlers);
        self
    }

    pub fn replace_existing(mut self, replace_existing: bool) -> Self {
        self.logger.replace_existing = replace_existing;
        self
    }

    pub fn build(self) -> Result<AddLogger, InvalidCommand> {
        non_empty("AddLogger", "category", &self.logger.category)?;
        if let Some(filter_spec) = &self.logger.filter_spec {
            non_empty("AddLogger", "filter-spec", filter_spec)?;
        }
        validate_handlers("AddLogger", &self.logger.handlers)?;
        Ok(self.logger)
    }
}

impl Display for AddLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AddLogger {}", self.category)
    }
}

impl Command for AddLogger {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        let values = Values::empty()
            .and_optional("level", self.level.map(|l| l.as_str()))
            .and_optional("filter-spec", self.filter_spec.as_deref())
            .and_list_optional("handlers", self.handlers.clone())
            .and_optional("use-parent-handlers", self.use_parent_handlers);
        add_resource(ops, &logger_address(&self.category), values, self.replace_existing)
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = Parameters::new()
            .with("category", self.category.as_str())
            .with_optional("level", self.level.map(|l| l.as_str()))
            .with_optional("filterSpec", self.filter_spec.as_deref())
            .with_optional("handlers", self.handlers.clone())
            .with_optional("useParentHandlers", self.use_parent_handlers)
            .with(REPLACE_EXISTING, self.replace_existing);
        session.transform(&subtree(), "add-logger", &params)
    }
}

/// Changes a logger. `handlers` set to an empty list removes all handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogger {
    category: String,
    level: Option<Level>,
    filter_spec: Option<String>,
    handlers: Option<Vec<String>>,
    use_parent_handlers: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ChangeLoggerBuilder {
    logger: ChangeLogger,
}

impl ChangeLoggerBuilder {
    pub fn new(category: &str) -> Self {
        ChangeLoggerBuilder {
            logger: ChangeLogger {
                category: category.to_string(),
                level: None,
                filter_spec: None,
                handlers: None,
                use_parent_handlers: None,
            },
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.logger.level = Some(level);
        self
    }

    pub fn filter_spec(mut self, filter_spec: &str) -> Self {
        self.logger.filter_spec = Some(filter_spec.to_string());
        self
    }

    pub fn handlers(mut self, handlers: &[&str]) -> Self {
        self.logger.handlers = Some(handlers.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn use_parent_handlers(mut self, use_parent_handlers: bool) -> Self {
        self.logger.use_parent_handlers = Some(use_parent_handlers);
        self
    }

    pub fn build(self) -> Result<ChangeLogger, InvalidCommand> {
        non_empty("ChangeLogger", "category", &self.logger.category)?;
        if let Some(filter_spec) = &self.logger.filter_spec {
            non_empty("ChangeLogger", "filter-spec", filter_spec)?;
        }
        validate_handlers("ChangeLogger", &self.logger.handlers)?;
        Ok(self.logger)
    }
}

impl Display for ChangeLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChangeLogger {}", self.category)
    }
}

impl Command for ChangeLogger {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        let address = logger_address(&self.category);
        let mut batch = Batch::new();
        change_logger_batch(
            &address,
            &mut batch,
            self.level,
            self.filter_spec.as_deref(),
            self.handlers.as_deref(),
        );
        if let Some(use_parent_handlers) = self.use_parent_handlers {
            batch.write_attribute(&address, "use-parent-handlers", use_parent_handlers);
        }
        change_resource(ops, &address, &batch)
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = Parameters::new()
            .with("category", self.category.as_str())
            .with_optional("level", self.level.map(|l| l.as_str()))
            .with_optional("filterSpec", self.filter_spec.as_deref())
            .with_optional("handlers", self.handlers.clone())
            .with_optional("useParentHandlers", self.use_parent_handlers);
        session.transform(&subtree(), "change-logger", &params)
    }
}

fn change_logger_batch(
    address: &Address,
    batch: &mut Batch,
    level: Option<Level>,
    filter_spec: Option<&str>,
    handlers: Option<&[String]>,
) {
    if let Some(level) = level {
        batch.write_attribute(address, "level", level.as_str());
    }
    if let Some(filter_spec) = filter_spec {
        batch.write_attribute(address, "filter-spec", filter_spec);
    }
    if let Some(handlers) = handlers {
        batch.write_list_attribute(address, "handlers", handlers.iter().map(String::as_str));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLogger {
    category: String,
}

impl RemoveLogger {
    pub fn new(category: &str) -> Result<Self, InvalidCommand> {
        non_empty("RemoveLogger", "category", category)?;
        Ok(RemoveLogger {
            category: category.to_string(),
        })
    }
}

impl Display for RemoveLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RemoveLogger {}", self.category)
    }
}

impl Command for RemoveLogger {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        remove_resource(ops, &logger_address(&self.category))
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        session.transform(
            &subtree(),
            "remove-logger",
            &Parameters::new().with("category", self.category.as_str()),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRootLogger {
    level: Option<Level>,
    filter_spec: Option<String>,
    handlers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeRootLoggerBuilder {
    logger: ChangeRootLogger,
}

impl ChangeRootLoggerBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.logger.level = Some(level);
        self
    }

    pub fn filter_spec(mut self, filter_spec: &str) -> Self {
        self.logger.filter_spec = Some(filter_spec.to_string());
        self
    }

    pub fn handlers(mut self, handlers: &[&str]) -> Self {
        self.logger.handlers = Some(handlers.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<ChangeRootLogger, InvalidCommand> {
        if let Some(filter_spec) = &self.logger.filter_spec {
            non_empty("ChangeRootLogger", "filter-spec", filter_spec)?;
        }
        validate_handlers("ChangeRootLogger", &self.logger.handlers)?;
        Ok(self.logger)
    }
}

impl Display for ChangeRootLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChangeRootLogger")
    }
}

impl Command for ChangeRootLogger {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        let address = root_logger_address();
        let mut batch = Batch::new();
        change_logger_batch(
            &address,
            &mut batch,
            self.level,
            self.filter_spec.as_deref(),
            self.handlers.as_deref(),
        );
        change_resource(ops, &address, &batch)
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = Parameters::new()
            .with_optional("level", self.level.map(|l| l.as_str()))
            .with_optional("filterSpec", self.filter_spec.as_deref())
            .with_optional("handlers", self.handlers.clone());
        session.transform(&subtree(), "change-root-logger", &params)
    }
}

fn handlers_element(handlers: &[String]) -> Element {
    handlers.iter().fold(Element::new("handlers"), |element, name| {
        element.with_child(value_element("handler", "name", name))
    })
}

fn build_logger(params: &Parameters) -> Result<Element> {
    let handlers = params.get_list("handlers")?.filter(|h| !h.is_empty());
    Ok(Element::new(LOGGER)
        .with_attribute("category", params.require_str("category")?)
        .with_optional_attribute(
            "use-parent-handlers",
            params.get_bool("useParentHandlers")?.map(|b| b.to_string()),
        )
        .with_optional_child(params.get_str("level")?.map(|l| value_element("level", "name", l)))
        .with_optional_child(
            params
                .get_str("filterSpec")?
                .map(|f| value_element("filter-spec", "value", f)),
        )
        .with_optional_child(handlers.map(handlers_element)))
}

/// Applies level, filter and handlers to a `logger` or `root-logger`.
fn change_logger_element(logger: &mut Element, params: &Parameters) -> Result<()> {
    let order = logger_order();
    if let Some(use_parent_handlers) = params.get_bool("useParentHandlers")? {
        logger.set_attribute("use-parent-handlers", use_parent_handlers.to_string());
    }
    if let Some(level) = params.get_str("level")? {
        order.set(logger, value_element("level", "name", level));
    }
    if let Some(filter_spec) = params.get_str("filterSpec")? {
        order::remove_named(logger, "filter");
        order.set(logger, value_element("filter-spec", "value", filter_spec));
    }
    match params.get_list("handlers")? {
        Some([]) => {
            order::remove_named(logger, "handlers");
        }
        Some(handlers) => {
            order.set(logger, handlers_element(handlers));
        }
        None => {}
    }
    Ok(())
}

pub(super) fn register_templates(registry: &mut TransformRegistry) {
    registry
        .register(AddChild {
            template: "add-logger",
            element: LOGGER,
            identity: "category",
            order: subsystem_order(),
            container: None,
            build: build_logger,
        })
        .register(ChangeChild {
            template: "change-logger",
            element: LOGGER,
            identity: Some("category"),
            container: None,
            change: change_logger_element,
        })
        .register(RemoveChild {
            template: "remove-logger",
            element: LOGGER,
            identity: "category",
            container: None,
        })
        .register(ChangeChild {
            template: "change-root-logger",
            element: ROOT_LOGGER,
            identity: None,
            container: None,
            change: change_logger_element,
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        logging, templates,
        testing::{logging_controller, read, Recording},
        OfflineContext, OnlineContext,
    };
    use serde_json::json;
    use srvcfg_core::PreconditionFailed;
    use srvcfg_offline::Document;

    const STANDALONE: &str = include_str!("../../../fixtures/standalone.xml");

    fn session() -> OfflineSession {
        OfflineSession::from_document(Document::parse(STANDALONE).unwrap(), templates())
    }

    #[test]
    fn empty_handler_list_undefines() {
        let mut controller = logging_controller();
        let mut context = OnlineContext::new(&mut controller);
        context
            .apply(
                &logging::add_logger("L1")
                    .level(Level::Info)
                    .handlers(&["CONSOLE"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(
            read(&mut controller, &logger_address("L1"), "handlers").value(),
            Some(&json!(["CONSOLE"]))
        );

        OnlineContext::new(&mut controller)
            .apply(&logging::change_logger("L1").handlers(&[]).build().unwrap())
            .unwrap();
        let handlers = read(&mut controller, &logger_address("L1"), "handlers");
        assert!(handlers.is_success());
        assert!(!handlers.is_defined());
        // not touched
        assert_eq!(
            read(&mut controller, &logger_address("L1"), "level").string_value(),
            Some("INFO")
        );
    }

    #[test]
    fn unset_handlers_are_not_touched() {
        let mut controller = logging_controller();
        let mut recording = Recording::new(&mut controller);
        let mut context = OnlineContext::new(&mut recording);
        context
            .apply(&logging::add_logger("L1").handlers(&["CONSOLE"]).build().unwrap())
            .unwrap();
        context
            .apply(&logging::change_logger("L1").level(Level::Debug).build().unwrap())
            .unwrap();
        assert_eq!(recording.mutations().len(), 2);
        assert_eq!(
            read(&mut controller, &logger_address("L1"), "handlers").value(),
            Some(&json!(["CONSOLE"]))
        );
    }

    #[test]
    fn root_logger_and_removal() {
        let mut controller = logging_controller();
        let mut context = OnlineContext::new(&mut controller);
        context
            .apply(
                &logging::change_root_logger()
                    .level(Level::Warn)
                    .handlers(&["CONSOLE", "FILE"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let error = context
            .apply(&logging::remove_logger("L1").unwrap())
            .unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());

        assert_eq!(
            read(&mut controller, &root_logger_address(), "handlers").value(),
            Some(&json!(["CONSOLE", "FILE"]))
        );
        assert_eq!(
            read(&mut controller, &root_logger_address(), "level").string_value(),
            Some("WARN")
        );
    }

    #[test]
    fn offline_add_logger_goes_after_existing_loggers() {
        let mut session = session();
        OfflineContext::new(&mut session)
            .apply(
                &logging::add_logger("com.example")
                    .level(Level::Debug)
                    .handlers(&["CONSOLE"])
                    .use_parent_handlers(false)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let expected = STANDALONE.replace(
            "            <root-logger>",
            r#"            <logger category="com.example" use-parent-handlers="false">
                <level name="DEBUG"/>
                <handlers>
                    <handler name="CONSOLE"/>
                </handlers>
            </logger>
            <root-logger>"#,
        );
        assert_eq!(session.document().to_xml_string(), expected);

        OfflineContext::new(&mut session)
            .apply(&logging::remove_logger("com.example").unwrap())
            .unwrap();
        assert_eq!(session.document().to_xml_string(), STANDALONE);
    }

    #[test]
    fn offline_empty_handlers_removes_the_element() {
        let mut session = session();
        OfflineContext::new(&mut session)
            .apply(&logging::change_root_logger().handlers(&[]).build().unwrap())
            .unwrap();
        let expected = STANDALONE.replace(
            r#"                <level name="INFO"/>
                <handlers>
                    <handler name="CONSOLE"/>
                    <handler name="FILE"/>
                </handlers>
"#,
            "                <level name=\"INFO\"/>\n",
        );
        assert_ne!(expected, STANDALONE);
        assert_eq!(session.document().to_xml_string(), expected);
    }

    #[test]
    fn offline_change_logger() {
        let mut session = session();
        OfflineContext::new(&mut session)
            .apply(
                &logging::change_logger("sun.rmi")
                    .level(Level::Error)
                    .handlers(&["FILE"])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let expected = STANDALONE.replace(
            r#"            <logger category="sun.rmi">
                <level name="WARN"/>
            </logger>"#,
            r#"            <logger category="sun.rmi">
                <level name="ERROR"/>
                <handlers>
                    <handler name="FILE"/>
                </handlers>
            </logger>"#,
        );
        assert_eq!(session.document().to_xml_string(), expected);

        let error = OfflineContext::new(&mut session)
            .apply(&logging::change_logger("nope").level(Level::Error).build().unwrap())
            .unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
    }
}
