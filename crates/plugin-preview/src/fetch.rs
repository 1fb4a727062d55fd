use tracing::{debug, info, warn};

use crate::{
    format::{format_post_preview, format_video_preview},
    matcher::{Link, VideoId},
    provider::{MetadataProvider, classify},
    record::{FailureReason, FetchOutcome, PostRecord, VideoRecord},
};

pub async fn fetch_video_preview(
    provider: &dyn MetadataProvider,
    id: &VideoId,
) -> FetchOutcome<VideoRecord> {
    match provider.extract(&id.watch_url()).await {
        Ok(info) => VideoRecord::from_info(info).ok_or_else(|| {
            warn!(video_id = %id, "Extractor returned info without a title");
            FailureReason::Generic
        }),
        Err(err) => {
            let reason = classify(&err);
            warn!(video_id = %id, error = %err, reason = ?reason, "Video fetch failed");
            Err(reason)
        }
    }
}

/// Any failure here means "stay quiet", never an error reply.
pub async fn fetch_post_preview(
    provider: &dyn MetadataProvider,
    url: &str,
) -> FetchOutcome<PostRecord> {
    match provider.extract(url).await {
        Ok(info) => PostRecord::from_info(info).ok_or(FailureReason::NoContent),
        Err(err) => {
            debug!(url, error = %err, "Post fetch failed; suppressing reply");
            Err(FailureReason::NoContent)
        }
    }
}

/// The reply to send for `link`, or `None` when nothing should be sent.
pub async fn reply_for(provider: &dyn MetadataProvider, link: &Link) -> Option<String> {
    let reply = match link {
        Link::Video(id) => match fetch_video_preview(provider, id).await {
            Ok(record) => Some(format_video_preview(&record)),
            Err(reason) => reason.reply_text().map(ToOwned::to_owned),
        },
        Link::Post(url) => match fetch_post_preview(provider, url).await {
            Ok(record) => Some(format_post_preview(&record)),
            Err(reason) => reason.reply_text().map(ToOwned::to_owned),
        },
    };
    info!(link = ?link, replied = reply.is_some(), "Preview resolved");
    reply
}
