use std::sync::Arc;

use matrix_sdk::{
    Client,
    room::Room,
    ruma::{
        OwnedRoomId, OwnedUserId,
        events::room::message::{MessageType, OriginalSyncRoomMessageEvent, Relation},
    },
};
use plugin_core::{PluginContext, PluginRegistry, RoomMessageMeta, dispatch::ReplyQueue, truncate};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::{
    config::BotSettings,
    plugins,
    router::{Inbound, OwnerCommand, Route, route, strip_reply_fallback},
};

#[derive(Debug)]
pub(crate) struct MessageHandler {
    pub(crate) settings: Arc<BotSettings>,
    pub(crate) registry: Arc<PluginRegistry>,
    pub(crate) room_id: OwnedRoomId,
    pub(crate) shutdown: Arc<Notify>,
    pub(crate) replies: ReplyQueue<Room>,
}

impl MessageHandler {
    pub(crate) async fn on_message(&self, ev: OriginalSyncRoomMessageEvent, room: Room, client: Client) {
        if room.room_id() != self.room_id {
            return;
        }
        let MessageType::Text(text) = &ev.content.msgtype else {
            return;
        };
        let body = strip_reply_fallback(&text.body);
        let from_self = client.user_id().is_some_and(|own| &*ev.sender == own);
        let is_correction = matches!(ev.content.relates_to, Some(Relation::Replacement(_)));
        if from_self || is_correction {
            debug!(sender = %ev.sender, from_self, is_correction, "Skipping message");
            return;
        }

        let sender_nick = resolve_display_name(&room, &ev.sender).await;
        info!(room_id = %room.room_id(), sender = %ev.sender, nick = %sender_nick, body = %truncate(body, 200), "Incoming message");

        let inbound = Inbound {
            body,
            sender_nick: &sender_nick,
            from_self,
            from_owner: self.settings.owner.as_ref().is_some_and(|owner| *owner == ev.sender),
            is_correction,
        };
        match route(&inbound, &self.settings.nick, &self.settings.acknowledgement) {
            Route::Ignore => {}
            Route::Owner(OwnerCommand::Shutdown) => {
                info!(owner = %ev.sender, "Shutdown requested");
                self.shutdown.notify_one();
            }
            Route::Owner(OwnerCommand::Reload) => {
                match plugins::reload(&self.registry, &self.settings).await {
                    Ok(count) => info!(plugins = count, "Reloaded plugin config"),
                    Err(e) => warn!(error = %e, "Reload failed; keeping previous config"),
                }
            }
            Route::Acknowledge(reply) => self.replies.push_ready(room, reply),
            Route::Plugins => {
                let ctx = PluginContext {
                    room: room.clone(),
                    replies: self.replies.clone(),
                };
                let meta = RoomMessageMeta {
                    body,
                    sender_nick: &sender_nick,
                };
                for entry in self.registry.entries().await {
                    if !entry.spec.enabled {
                        continue;
                    }
                    if let Err(e) = entry.plugin.on_room_message(&ctx, &meta, &entry.spec).await {
                        warn!(error = %e, plugin = %entry.spec.id, "Plugin on_room_message failed");
                    }
                }
            }
        }
    }
}

async fn resolve_display_name(room: &Room, sender: &OwnedUserId) -> String {
    match room.get_member(sender).await {
        Ok(Some(member)) => member
            .display_name()
            .map_or_else(|| sender.localpart().to_owned(), ToOwned::to_owned),
        _ => sender.localpart().to_owned(),
    }
}
