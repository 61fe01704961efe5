use crate::assets::BackgroundCache;
use crate::config::Config;
use crate::flow::Submissions;
use crate::participants::ParticipantDirectory;
use genpdf::fonts::{FontData, FontFamily};
use std::sync::Arc;

pub struct AppState {
    pub participants: ParticipantDirectory,
    pub background: BackgroundCache,
    /// Absent when no bold font could be loaded; every generation then fails.
    pub font: Option<Arc<FontFamily<FontData>>>,
    pub submissions: Submissions,
}

impl AppState {
    pub fn new(
        config: &Config,
        font: Option<FontFamily<FontData>>,
    ) -> Result<Self, reqwest::Error> {
        let lookup_client = reqwest::Client::builder()
            .timeout(config.lookup_timeout)
            .build()?;
        let asset_client = reqwest::Client::builder().build()?;

        Ok(Self {
            participants: ParticipantDirectory::new(
                lookup_client,
                config.api_base_url.clone(),
                config.lookup_cache_ttl,
            ),
            background: BackgroundCache::new(asset_client, config.background.clone()),
            font: font.map(Arc::new),
            submissions: Submissions::default(),
        })
    }
}
