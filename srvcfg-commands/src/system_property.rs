//! System properties, defined at the top of the server or domain
//! configuration.

use std::fmt::Display;

use anyhow::Result;
use srvcfg_core::{Address, InvalidCommand, Values};
use srvcfg_offline::{
    template::REPLACE_EXISTING, AddChild, ChildOrder, Element, EnsureContainer, OfflineSession,
    Parameters, RemoveChild, Subtree, TransformRegistry,
};
use srvcfg_online::Operations;

use crate::command::{add_resource, non_empty, remove_resource, Command};

const CONTAINER: &str = "system-properties";
const PROPERTY: &str = "property";

/// Children of `server`, `host` and `domain`, as far as they can appear
/// before or after `system-properties`.
fn document_order() -> ChildOrder {
    ChildOrder::new(&[
        &["extensions"],
        &[CONTAINER],
        &["paths"],
        &["vault"],
        &["management"],
        &["profile", "profiles"],
        &["interfaces"],
        &["socket-binding-group", "socket-binding-groups"],
        &["deployments"],
        &["deployment-overlays"],
        &["server-groups"],
        &["host-excludes"],
        &["management-client-content"],
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSystemProperty {
    name: String,
    value: String,
    replace_existing: bool,
}

impl AddSystemProperty {
    pub fn new(name: &str, value: &str) -> Result<Self, InvalidCommand> {
        non_empty("AddSystemProperty", "name", name)?;
        Ok(AddSystemProperty {
            name: name.to_string(),
            value: value.to_string(),
            replace_existing: false,
        })
    }

    pub fn replace_existing(mut self, replace_existing: bool) -> Self {
        self.replace_existing = replace_existing;
        self
    }
}

impl Display for AddSystemProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AddSystemProperty {}", self.name)
    }
}

impl Command for AddSystemProperty {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        add_resource(
            ops,
            &Address::system_property(&self.name),
            Values::of("value", self.value.as_str()),
            self.replace_existing,
        )
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        let params = Parameters::new()
            .with("name", self.name.as_str())
            .with("value", self.value.as_str())
            .with(REPLACE_EXISTING, self.replace_existing);
        session.transform(&Subtree::Root, "add-system-property", &params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveSystemProperty {
    name: String,
}

impl RemoveSystemProperty {
    pub fn new(name: &str) -> Result<Self, InvalidCommand> {
        non_empty("RemoveSystemProperty", "name", name)?;
        Ok(RemoveSystemProperty {
            name: name.to_string(),
        })
    }
}

impl Display for RemoveSystemProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RemoveSystemProperty {}", self.name)
    }
}

impl Command for RemoveSystemProperty {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
        remove_resource(ops, &Address::system_property(&self.name))
    }

    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
        session.transform(
            &Subtree::Root,
            "remove-system-property",
            &Parameters::new().with("name", self.name.as_str()),
        )
    }
}

fn build_property(params: &Parameters) -> Result<Element> {
    Ok(Element::new(PROPERTY)
        .with_attribute("name", params.require_str("name")?)
        .with_attribute("value", params.require_str("value")?))
}

pub fn register_templates(registry: &mut TransformRegistry) {
    registry
        .register(AddChild {
            template: "add-system-property",
            element: PROPERTY,
            identity: "name",
            order: ChildOrder::default(),
            container: Some(EnsureContainer {
                element: CONTAINER,
                order: document_order(),
            }),
            build: build_property,
        })
        .register(RemoveChild {
            template: "remove-system-property",
            element: PROPERTY,
            identity: "name",
            container: Some(CONTAINER),
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{templates, testing::read, OfflineContext, OnlineContext};
    use srvcfg_core::PreconditionFailed;
    use srvcfg_offline::Document;
    use srvcfg_online::InMemoryController;

    const STANDALONE: &str = include_str!("../../fixtures/standalone.xml");
    const DOMAIN: &str = include_str!("../../fixtures/domain.xml");

    fn session(xml: &str) -> OfflineSession {
        OfflineSession::from_document(Document::parse(xml).unwrap(), templates())
    }

    #[test]
    fn online_add_and_remove() {
        let mut controller = InMemoryController::new();
        let add = AddSystemProperty::new("foo", "bar").unwrap();
        let mut context = OnlineContext::new(&mut controller);
        context.apply(&add).unwrap();
        assert!(context.apply(&add).is_err());
        context
            .apply(&AddSystemProperty::new("foo", "baz").unwrap().replace_existing(true))
            .unwrap();
        assert_eq!(
            read(&mut controller, &Address::system_property("foo"), "value").string_value(),
            Some("baz")
        );

        let mut context = OnlineContext::new(&mut controller);
        context.apply(&RemoveSystemProperty::new("foo").unwrap()).unwrap();
        let error = context
            .apply(&RemoveSystemProperty::new("foo").unwrap())
            .unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
    }

    #[test]
    fn offline_creates_the_container_in_place() {
        let mut session = session(STANDALONE);
        OfflineContext::new(&mut session)
            .apply(&AddSystemProperty::new("foo", "bar").unwrap())
            .unwrap();
        let expected = STANDALONE.replace(
            "    </extensions>\n",
            r#"    </extensions>
    <system-properties>
        <property name="foo" value="bar"/>
    </system-properties>
"#,
        );
        assert_eq!(session.document().to_xml_string(), expected);
    }

    #[test]
    fn offline_appends_to_existing_properties() {
        let mut session = session(DOMAIN);
        let mut context = OfflineContext::new(&mut session);
        context
            .apply(&AddSystemProperty::new("foo", "bar").unwrap())
            .unwrap();
        assert!(context
            .apply(&AddSystemProperty::new("foo", "other").unwrap())
            .is_err());
        let expected = DOMAIN.replace(
            "        <property name=\"java.net.preferIPv4Stack\" value=\"true\"/>\n",
            r#"        <property name="java.net.preferIPv4Stack" value="true"/>
        <property name="foo" value="bar"/>
"#,
        );
        assert_eq!(session.document().to_xml_string(), expected);

        OfflineContext::new(&mut session)
            .apply(&RemoveSystemProperty::new("foo").unwrap())
            .unwrap();
        assert_eq!(session.document().to_xml_string(), DOMAIN);
    }

    #[test]
    fn offline_remove_without_container() {
        let mut session = session(STANDALONE);
        let error = OfflineContext::new(&mut session)
            .apply(&RemoveSystemProperty::new("foo").unwrap())
            .unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
        assert_eq!(session.document().to_xml_string(), STANDALONE);
    }

    #[test]
    fn blank_name_is_invalid() {
        assert!(AddSystemProperty::new(" ", "x").is_err());
        assert!(RemoveSystemProperty::new("").is_err());
    }
}
