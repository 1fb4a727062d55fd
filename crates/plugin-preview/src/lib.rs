//! Link previews for video and post URLs posted in the room.

pub mod fetch;
pub mod format;
pub mod matcher;
pub mod provider;
pub mod record;
#[cfg(test)]
mod testing;

use core::time::Duration;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::{
    Plugin, PluginContext, PluginSpec, RoomMessageMeta, dispatch::ReplyQueue,
    factory::PluginFactory,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    fetch::reply_for,
    matcher::detect,
    provider::{MetadataProvider, YtDlp},
};

pub const PLUGIN_ID: &str = "preview";

#[derive(Debug)]
pub struct PreviewPlugin;

impl PluginFactory for PreviewPlugin {
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>) {
        if !specs.iter().any(|s| s.id == PLUGIN_ID) {
            let mut spec = PluginSpec::new(PLUGIN_ID);
            spec.config = serde_yaml::to_value(PreviewConfig::default()).unwrap_or_default();
            specs.push(spec);
        }
    }

    fn build(&self) -> Arc<dyn Plugin> {
        Arc::new(LinkPreview)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Extractor executable, looked up on `PATH` unless absolute.
    pub ytdlp_path: String,
    pub timeout_secs: u64,
    /// Appended to the extractor's command line, e.g. `--cookies`.
    pub extra_args: Vec<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_owned(),
            timeout_secs: 30,
            extra_args: Vec::new(),
        }
    }
}

impl PreviewConfig {
    fn from_spec(spec: &PluginSpec) -> Self {
        if spec.config.is_null() {
            return Self::default();
        }
        match serde_yaml::from_value::<Self>(spec.config.clone()) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(plugin = PLUGIN_ID, error = %err, "Failed to parse preview config, using defaults");
                Self::default()
            }
        }
    }

    fn provider(&self) -> YtDlp {
        YtDlp {
            program: self.ytdlp_path.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            extra_args: self.extra_args.clone(),
        }
    }
}

/// Queue a preview for the first link in `body`. Returns `false`, having
/// neither fetched nor queued anything, when there is no link.
pub fn queue_preview<T, P>(replies: &ReplyQueue<T>, target: T, body: &str, provider: P) -> bool
where
    T: Send + 'static,
    P: MetadataProvider + 'static,
{
    let Some(link) = detect(body) else {
        return false;
    };
    info!(link = ?link, "Link detected");
    replies.push(target, async move { reply_for(&provider, &link).await });
    true
}

#[derive(Debug)]
pub struct LinkPreview;

#[async_trait]
impl Plugin for LinkPreview {
    fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    async fn on_room_message(
        &self,
        ctx: &PluginContext,
        meta: &RoomMessageMeta<'_>,
        spec: &PluginSpec,
    ) -> Result<()> {
        // Read per message so a config reload applies to the next link.
        let provider = PreviewConfig::from_spec(spec).provider();
        if queue_preview(&ctx.replies, ctx.room.clone(), meta.body, provider) {
            debug!(room_id = %ctx.room.room_id(), sender = %meta.sender_nick, "Preview queued");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::{sync::mpsc, time::timeout};

    use super::*;
    use crate::testing::{FakeProvider, WATCH, video_info};

    #[test]
    fn defaults_register_once() {
        let mut specs = Vec::new();
        PreviewPlugin.register_defaults(&mut specs);
        PreviewPlugin.register_defaults(&mut specs);
        assert_eq!(specs.len(), 1);
        assert_eq!(PreviewConfig::from_spec(&specs[0]), PreviewConfig::default());
    }

    #[test]
    fn config_fills_missing_keys() {
        let mut spec = PluginSpec::new(PLUGIN_ID);
        spec.config = serde_yaml::from_str("timeout_secs: 5\nextra_args: [\"--cookies\", \"c.txt\"]").unwrap();
        let cfg = PreviewConfig::from_spec(&spec);
        assert_eq!(cfg.ytdlp_path, "yt-dlp");
        assert_eq!(cfg.timeout_secs, 5);
        let provider = cfg.provider();
        assert_eq!(provider.timeout, Duration::from_secs(5));
        assert_eq!(provider.extra_args, vec!["--cookies".to_owned(), "c.txt".to_owned()]);
    }

    #[test]
    fn bad_config_falls_back_to_defaults() {
        let mut spec = PluginSpec::new(PLUGIN_ID);
        spec.config = serde_yaml::from_str("timeout_secs: soon").unwrap();
        assert_eq!(PreviewConfig::from_spec(&spec), PreviewConfig::default());

        spec.config = serde_yaml::from_str("timeout_secs: 0").unwrap();
        assert_eq!(PreviewConfig::from_spec(&spec).provider().timeout, Duration::from_secs(1));
    }

    fn collecting_queue() -> (ReplyQueue<u32>, mpsc::UnboundedReceiver<(u32, String)>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let queue = ReplyQueue::spawn(move |target, text| {
            let out_tx = out_tx.clone();
            async move {
                out_tx.send((target, text))?;
                Ok(())
            }
        });
        (queue, out_rx)
    }

    #[tokio::test]
    async fn message_without_link_fetches_and_queues_nothing() {
        let (queue, mut rx) = collecting_queue();
        let mut provider = FakeProvider::default();
        provider.infos.insert(WATCH.to_owned(), video_info());
        let calls = Arc::clone(&provider.calls);

        assert!(!queue_preview(&queue, 1, "no links here, just chatting", provider.clone()));
        assert!(calls.lock().unwrap().is_empty());

        assert!(queue_preview(&queue, 2, "look https://youtu.be/dQw4w9WgXcQ", provider));
        let (target, reply) = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(target, 2);
        assert!(reply.starts_with("*Never Gonna Give You Up*\n"));
        assert_eq!(*calls.lock().unwrap(), vec![WATCH.to_owned()]);
    }
}
