use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    provider::{MetadataProvider, ProviderError},
    record::RawInfo,
};

pub(crate) const WATCH: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Serves canned results per URL and records what was asked for.
#[derive(Clone, Default)]
pub(crate) struct FakeProvider {
    pub(crate) infos: HashMap<String, RawInfo>,
    pub(crate) failures: HashMap<String, String>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn extract(&self, url: &str) -> Result<RawInfo, ProviderError> {
        self.calls.lock().unwrap().push(url.to_owned());
        if let Some(info) = self.infos.get(url) {
            return Ok(info.clone());
        }
        let message = self
            .failures
            .get(url)
            .cloned()
            .unwrap_or_else(|| "ERROR: Unsupported URL".to_owned());
        Err(ProviderError::Extraction(message))
    }
}

pub(crate) fn video_info() -> RawInfo {
    RawInfo {
        title: Some("Never Gonna Give You Up".to_owned()),
        description: Some("The official video".to_owned()),
        channel: Some("Rick Astley".to_owned()),
        view_count: Some(1_500),
        like_count: None,
        duration_string: None,
        upload_date: Some("20091025".to_owned()),
        ..RawInfo::default()
    }
}
