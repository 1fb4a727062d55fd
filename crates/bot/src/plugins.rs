use std::{path::Path, sync::Arc};

use anyhow::Result;
use plugin_core::{Plugin, PluginRegistry, PluginSpec, factory::PluginFactory};
use tracing::{info, warn};

use crate::config::{BotConfig, BotSettings, load_config};

fn factories() -> [&'static dyn PluginFactory; 1] {
    [&plugin_preview::PreviewPlugin]
}

fn builtin(id: &str) -> Option<Arc<dyn Plugin>> {
    factories()
        .into_iter()
        .map(|factory| factory.build())
        .find(|plugin| plugin.id() == id)
}

/// Configured specs, then built-in defaults for anything not configured, each
/// overlaid with `<plugins_dir>/<id>/config.yaml` when present.
fn resolve_specs(config: &BotConfig, plugins_dir: &Path) -> Vec<PluginSpec> {
    let mut specs = config.plugins.clone().unwrap_or_default();
    for factory in factories() {
        factory.register_defaults(&mut specs);
    }
    for spec in &mut specs {
        if let Some(file_cfg) = load_plugin_config(plugins_dir, &spec.id) {
            spec.config = merge_yaml(file_cfg, core::mem::take(&mut spec.config));
        }
    }
    specs
}

/// Register `specs`, keeping already-running plugin instances.
async fn apply_specs(registry: &PluginRegistry, specs: Vec<PluginSpec>) -> usize {
    let mut applied = 0;
    for spec in specs {
        let plugin = match registry.entry(&spec.id).await {
            Some(existing) => existing.plugin,
            None => match builtin(&spec.id) {
                Some(plugin) => plugin,
                None => {
                    warn!(plugin = %spec.id, "Unknown plugin ID");
                    continue;
                }
            },
        };
        info!(plugin = %spec.id, enabled = spec.enabled, "Registered plugin");
        registry.register(spec, plugin).await;
        applied += 1;
    }
    applied
}

pub(crate) async fn build_registry(config: &BotConfig, settings: &BotSettings) -> Arc<PluginRegistry> {
    let registry = Arc::new(PluginRegistry::new());
    apply_specs(&registry, resolve_specs(config, &settings.plugins_dir)).await;
    registry
}

/// Re-read the config file and plugin overlays. On error the registry is untouched.
pub(crate) async fn reload(registry: &PluginRegistry, settings: &BotSettings) -> Result<usize> {
    let config = load_config(&settings.config_path)?;
    Ok(apply_specs(registry, resolve_specs(&config, &settings.plugins_dir)).await)
}

/// Deep-merge two YAML values; `file_cfg` wins on conflicting scalars.
fn merge_yaml(file_cfg: serde_yaml::Value, spec_cfg: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value::{Mapping, Null};
    match (file_cfg, spec_cfg) {
        (Mapping(mut a), Mapping(b)) => {
            for (k, v_b) in b {
                match a.get_mut(&k) {
                    Some(v_a) => {
                        let merged = merge_yaml(core::mem::take(v_a), v_b);
                        *v_a = merged;
                    }
                    None => {
                        a.insert(k, v_b);
                    }
                }
            }
            Mapping(a)
        }
        (Null, b) => b,
        (a, _b) => a,
    }
}

fn load_plugin_config(root: &Path, id: &str) -> Option<serde_yaml::Value> {
    let path = root.join(id).join("config.yaml");
    match std::fs::read_to_string(&path) {
        Ok(s) => match serde_yaml::from_str::<serde_yaml::Value>(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(plugin = %id, file = %path.display(), error = %e, "Failed to parse plugin config YAML");
                None
            }
        },
        Err(e) => {
            if path.exists() {
                warn!(plugin = %id, file = %path.display(), error = %e, "Failed to read plugin config file");
            }
            None
        }
    }
}
