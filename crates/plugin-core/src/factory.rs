use std::sync::Arc;

use crate::{Plugin, PluginSpec};

/// How the bot discovers a plugin: default spec plus an instance builder.
pub trait PluginFactory {
    /// Push this plugin's default spec unless `specs` already has one with the same id.
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>);

    /// Builds the plugin instance.
    #[must_use]
    fn build(&self) -> Arc<dyn Plugin>;
}
