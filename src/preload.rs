//! Eager, best-effort priming of slide media ahead of display.
//!
//! Runs once at startup for the whole deck, independent of the active
//! index, and is never re-triggered by navigation. Every failure is logged
//! and swallowed; preloading must never block or break rendering.

use crate::cache::MediaCache;
use crate::deck::{MediaKind, Slide, SlideDeck};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Background preloader that warms the media cache.
pub struct Preloader {
    cache: Arc<RwLock<MediaCache>>,
    client: reqwest::Client,
}

impl Preloader {
    pub fn new(cache: Arc<RwLock<MediaCache>>) -> Self {
        Self {
            cache,
            client: reqwest::Client::new(),
        }
    }

    /// Kick off the one-shot deck preload on the runtime.
    pub fn spawn(self, deck: Arc<SlideDeck>) {
        tokio::spawn(async move {
            self.preload_all(&deck).await;
        });
    }

    /// Prime every slide's media. No play request is issued here.
    pub async fn preload_all(&self, deck: &SlideDeck) {
        tracing::info!("Preloading media for {} slides...", deck.len());
        for slide in deck.slides() {
            if let Err(e) = self.preload_slide(slide).await {
                tracing::warn!("Failed to preload media for slide {}: {:#}", slide.id, e);
            }
        }
        tracing::info!("Preloading complete");
    }

    async fn preload_slide(&self, slide: &Slide) -> Result<()> {
        if !slide.has_media() {
            return Ok(());
        }

        match slide.media_kind() {
            // Embeds are resolved by the host platform at render time;
            // there is nothing to fetch ahead of display.
            MediaKind::SocialEmbed { .. } | MediaKind::VideoPlatform { .. } => {
                tracing::debug!("Slide {} uses an embed, skipping preload", slide.id);
                Ok(())
            }
            MediaKind::Direct => {
                if slide.media.starts_with("http://") || slide.media.starts_with("https://") {
                    self.fetch_into_cache(slide).await
                } else {
                    // Local reference: just confirm it is there.
                    if !Path::new(&slide.media).exists() {
                        tracing::warn!(
                            "Slide {} media {:?} not found on disk",
                            slide.id,
                            slide.media
                        );
                    }
                    Ok(())
                }
            }
        }
    }

    async fn fetch_into_cache(&self, slide: &Slide) -> Result<()> {
        {
            let mut cache = self.cache.write().await;
            if cache.cached_path(slide.id, &slide.media).is_some() {
                tracing::debug!("Slide {} media already cached", slide.id);
                return Ok(());
            }
        }

        tracing::debug!("Downloading {} for slide {}", slide.media, slide.id);
        let response = self
            .client
            .get(&slide.media)
            .send()
            .await
            .context("Failed to send request")?
            .error_for_status()
            .context("Server returned error")?;
        let bytes = response.bytes().await.context("Failed to read response")?;

        let mut cache = self.cache.write().await;
        cache.store(slide.id, &slide.media, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::SlideDeck;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_preload_tolerates_unreachable_media() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(RwLock::new(
            MediaCache::with_capacity(dir.path().to_path_buf(), 1024).unwrap(),
        ));
        let deck = SlideDeck::new(vec![
            Slide {
                id: 1,
                title: "a".into(),
                description: "".into(),
                media: "/nonexistent/clip.mp4".into(),
            },
            Slide {
                id: 2,
                title: "b".into(),
                description: "".into(),
                media: String::new(),
            },
            Slide {
                id: 3,
                title: "c".into(),
                description: "".into(),
                media: "https://www.youtube.com/watch?v=abc".into(),
            },
        ])
        .unwrap();

        // Must complete without panicking or touching the cache.
        Preloader::new(cache.clone()).preload_all(&deck).await;
        assert_eq!(cache.read().await.entry_count(), 0);
    }
}
