//! Configuration commands. Each command can be applied to a running server
//! through its management interface ([`OnlineContext`]) or to its stopped
//! configuration file ([`OfflineContext`]), with the same outcome.

pub mod command;
pub mod logging;
pub mod plan;
pub mod system_property;

#[cfg(test)]
mod testing;

use srvcfg_offline::TransformRegistry;

pub use command::{Command, OfflineContext, OnlineContext};
pub use logging::HandlerBuilder;
pub use plan::CommandPlan;
pub use system_property::{AddSystemProperty, RemoveSystemProperty};

/// The offline templates of every command in this crate.
pub fn templates() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    logging::register_templates(&mut registry);
    system_property::register_templates(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_its_templates() {
        let registry = templates();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "add-console-handler",
                "add-logger",
                "add-periodic-rotating-file-handler",
                "add-system-property",
                "change-console-handler",
                "change-logger",
                "change-root-logger",
                "remove-console-handler",
                "remove-logger",
                "remove-periodic-rotating-file-handler",
                "remove-system-property",
            ]
        );
    }
}
