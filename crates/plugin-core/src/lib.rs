pub mod dispatch;
pub mod factory;

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use matrix_sdk::{room::Room, ruma::events::room::message::RoomMessageEventContent};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::dispatch::ReplyQueue;

#[derive(Clone, Debug)]
pub struct PluginContext {
    pub room: Room,
    /// Shared with the router, so plugin replies and acknowledgements stay in
    /// arrival order.
    pub replies: ReplyQueue<Room>,
}

/// What the router already knows about a message by the time plugins see it.
#[derive(Debug, Clone, Copy)]
pub struct RoomMessageMeta<'a> {
    pub body: &'a str,
    pub sender_nick: &'a str,
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;

    async fn on_room_message(
        &self,
        ctx: &PluginContext,
        meta: &RoomMessageMeta<'_>,
        spec: &PluginSpec,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PluginSpec {
    pub id: String,
    #[serde(default = "enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

impl PluginSpec {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            config: serde_yaml::Value::default(),
        }
    }
}

const fn enabled_true() -> bool {
    true
}

#[derive(Clone)]
pub struct PluginEntry {
    pub spec: PluginSpec,
    pub plugin: Arc<dyn Plugin>,
}

impl core::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("id", &self.plugin.id())
            .field("spec", &self.spec)
            .finish()
    }
}

/// Plugins keyed by id. Iteration order is the id order, so dispatch is stable.
#[derive(Clone, Default, Debug)]
pub struct PluginRegistry {
    inner: Arc<RwLock<BTreeMap<String, PluginEntry>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `spec.id`, returning the previous one.
    pub async fn register(&self, spec: PluginSpec, plugin: Arc<dyn Plugin>) -> Option<PluginEntry> {
        let mut inner = self.inner.write().await;
        inner.insert(spec.id.clone(), PluginEntry { spec, plugin })
    }

    pub async fn entry(&self, id: &str) -> Option<PluginEntry> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn entries(&self) -> Vec<PluginEntry> {
        self.inner.read().await.values().cloned().collect()
    }
}

#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Send a plain-text message to `room`.
///
/// # Errors
///
/// Returns an error if the homeserver rejects the event.
pub async fn send_to_room(room: &Room, text: impl Into<String>) -> Result<()> {
    let content = RoomMessageEventContent::text_plain(text.into());
    room.send(content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    #[async_trait]
    impl Plugin for Quiet {
        fn id(&self) -> &'static str {
            "quiet"
        }

        async fn on_room_message(
            &self,
            _ctx: &PluginContext,
            _meta: &RoomMessageMeta<'_>,
            _spec: &PluginSpec,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("héllo wörld", 4), "héll");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn spec_defaults_to_enabled() {
        let spec: PluginSpec = serde_yaml::from_str("id: preview").unwrap();
        assert!(spec.enabled);
        assert!(spec.config.is_null());
    }

    #[tokio::test]
    async fn register_replaces_existing_entry() {
        let registry = PluginRegistry::new();
        assert!(registry.entry("quiet").await.is_none());

        let first = registry.register(PluginSpec::new("quiet"), Arc::new(Quiet)).await;
        assert!(first.is_none());

        let mut disabled = PluginSpec::new("quiet");
        disabled.enabled = false;
        let previous = registry.register(disabled, Arc::new(Quiet)).await;
        assert!(previous.is_some_and(|p| p.spec.enabled));
        assert!(!registry.entry("quiet").await.unwrap().spec.enabled);
        assert_eq!(registry.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn entries_are_ordered_by_id() {
        let registry = PluginRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            registry.register(PluginSpec::new(id), Arc::new(Quiet)).await;
        }
        let ids: Vec<String> = registry.entries().await.into_iter().map(|e| e.spec.id).collect();
        assert_eq!(ids, ["alpha", "mid", "zeta"]);
    }
}
