use std::fmt::Display;

use anyhow::{Context, Result};
use srvcfg_core::{Address, Batch, CommandFailed, PreconditionFailed, Values};
use srvcfg_offline::OfflineSession;
use srvcfg_online::{ManagementClient, Operations};

/// A configuration change that can be applied to a running server or to its
/// configuration file.
///
/// Commands are immutable once built. `Display` names the command and its
/// target, e.g. `AddConsoleHandler H1`, and is what failures report.
pub trait Command: Display {
    fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()>;
    fn apply_offline(&self, session: &mut OfflineSession) -> Result<()>;
}

/// Applies commands through a management client.
pub struct OnlineContext<'c> {
    client: &'c mut dyn ManagementClient,
}

impl<'c> OnlineContext<'c> {
    pub fn new(client: &'c mut dyn ManagementClient) -> Self {
        OnlineContext { client }
    }

    pub fn apply(&mut self, command: &dyn Command) -> Result<()> {
        let span = tracing::info_span!("apply", mode = "online", command = %command);
        let _enter = span.enter();
        let mut ops = Operations::new(&mut *self.client);
        command.apply_online(&mut ops).with_context(|| CommandFailed {
            command: command.to_string(),
        })?;
        tracing::info!("applied");
        Ok(())
    }

    /// Direct access for reading back what commands did.
    pub fn operations(&mut self) -> Operations<'_> {
        Operations::new(&mut *self.client)
    }
}

/// Applies commands to a configuration document.
pub struct OfflineContext<'s> {
    session: &'s mut OfflineSession,
}

impl<'s> OfflineContext<'s> {
    pub fn new(session: &'s mut OfflineSession) -> Self {
        OfflineContext { session }
    }

    pub fn apply(&mut self, command: &dyn Command) -> Result<()> {
        let span = tracing::info_span!("apply", mode = "offline", command = %command);
        let _enter = span.enter();
        command
            .apply_offline(self.session)
            .with_context(|| CommandFailed {
                command: command.to_string(),
            })?;
        tracing::info!("applied");
        Ok(())
    }

    pub fn session(&mut self) -> &mut OfflineSession {
        self.session
    }
}

/// Adds a resource. With `replace_existing`, an existing resource is removed
/// first; the two steps are not atomic. Otherwise the endpoint decides about
/// duplicates.
pub(crate) fn add_resource(
    ops: &mut Operations<'_>,
    address: &Address,
    values: Values,
    replace_existing: bool,
) -> Result<()> {
    if replace_existing && ops.remove_if_exists(address)? {
        tracing::debug!(%address, "removed existing resource before adding it again");
    }
    ops.add(address, values)?
        .assert_success()
        .with_context(|| format!("Could not add {}", address))?;
    Ok(())
}

/// Submits the batch of changes to an existing resource. Nothing is
/// submitted if the batch is empty.
pub(crate) fn change_resource(ops: &mut Operations<'_>, address: &Address, batch: &Batch) -> Result<()> {
    require_existing(ops, address)?;
    if batch.is_empty() {
        tracing::debug!(%address, "nothing to change");
        return Ok(());
    }
    ops.batch(batch)?
        .assert_success()
        .with_context(|| format!("Could not change {}", address))?;
    Ok(())
}

pub(crate) fn remove_resource(ops: &mut Operations<'_>, address: &Address) -> Result<()> {
    require_existing(ops, address)?;
    ops.remove(address)?
        .assert_success()
        .with_context(|| format!("Could not remove {}", address))?;
    Ok(())
}

fn require_existing(ops: &mut Operations<'_>, address: &Address) -> Result<()> {
    if !ops.exists(address)? {
        return Err(PreconditionFailed::new(address, "resource does not exist").into());
    }
    Ok(())
}

/// Fails unless `value` has some non-whitespace content.
pub(crate) fn non_empty(
    command: &'static str,
    field: &str,
    value: &str,
) -> Result<(), srvcfg_core::InvalidCommand> {
    if value.trim().is_empty() {
        return Err(srvcfg_core::InvalidCommand::new(
            command,
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{logging_controller, Recording};
    use srvcfg_core::OperationFailed;
    use srvcfg_offline::{Document, Subtree, TransformRegistry};

    struct AddThing(&'static str);

    impl Display for AddThing {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "AddThing {}", self.0)
        }
    }

    impl Command for AddThing {
        fn apply_online(&self, ops: &mut Operations<'_>) -> Result<()> {
            add_resource(ops, &Address::of("thing", self.0), Values::empty(), false)
        }
        fn apply_offline(&self, session: &mut OfflineSession) -> Result<()> {
            session.read(&Subtree::subsystem("things"))?;
            Ok(())
        }
    }

    #[test]
    fn online_failures_are_wrapped() {
        let mut controller = logging_controller();
        let mut context = OnlineContext::new(&mut controller);
        context.apply(&AddThing("a")).unwrap();
        let error = context.apply(&AddThing("a")).unwrap_err();

        assert_eq!(
            error.downcast_ref::<CommandFailed>().unwrap().command,
            "AddThing a"
        );
        assert!(error.downcast_ref::<OperationFailed>().is_some());
        assert_eq!(
            format!("{:#}", error),
            "command AddThing a failed: Could not add /thing=a: operation failed: Duplicate resource /thing=a"
        );
    }

    #[test]
    fn offline_failures_are_wrapped() {
        let document = Document::parse("<server/>").unwrap();
        let mut session = OfflineSession::from_document(document, TransformRegistry::new());
        let error = OfflineContext::new(&mut session)
            .apply(&AddThing("a"))
            .unwrap_err();
        assert!(error.downcast_ref::<CommandFailed>().is_some());
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
    }

    #[test]
    fn change_of_missing_resource_is_a_precondition_failure() {
        let mut controller = logging_controller();
        let mut recording = Recording::new(&mut controller);
        let mut ops = Operations::new(&mut recording);
        let mut batch = Batch::new();
        batch.write_attribute(&Address::of("thing", "x"), "a", "b");
        let error = change_resource(&mut ops, &Address::of("thing", "x"), &batch).unwrap_err();
        assert!(error.downcast_ref::<PreconditionFailed>().is_some());
        assert!(recording.mutations().is_empty());
    }

    #[test]
    fn non_empty_rejects_blank() {
        assert!(non_empty("AddThing", "name", " ").is_err());
        assert!(non_empty("AddThing", "name", "x").is_ok());
    }
}
