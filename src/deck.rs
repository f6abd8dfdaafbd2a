//! Slide deck definitions and media reference classification.
//!
//! The deck is an ordered, fixed set of slides built once at startup and
//! never mutated afterwards. Each slide carries a URI-like media reference
//! that the renderer classifies into one of three handling modes.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use url::Url;

/// One carousel entry.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Slide {
    pub id: u32,
    pub title: String,
    pub description: String,
    /// URI-like media reference; may be empty.
    #[serde(default)]
    pub media: String,
}

/// How a slide's media reference is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    /// Short-form social post, shown through the twitframe wrapper.
    SocialEmbed { embed_url: String },
    /// Long-form video platform clip, addressed by its video id.
    VideoPlatform { embed_url: String },
    /// Directly playable media (local path or http url). Empty references
    /// fall through to this branch.
    Direct,
}

impl Slide {
    /// Classify the media reference. Malformed references never fail
    /// classification; they degrade to [`MediaKind::Direct`].
    pub fn media_kind(&self) -> MediaKind {
        if self.media.contains("x.com") {
            return MediaKind::SocialEmbed {
                embed_url: format!(
                    "https://twitframe.com/show?url={}",
                    urlencoding::encode(&self.media)
                ),
            };
        }

        if self.media.contains("youtube.com") {
            if let Some(id) = extract_video_id(&self.media) {
                return MediaKind::VideoPlatform {
                    embed_url: format!("https://www.youtube.com/embed/{}", id),
                };
            }
            tracing::debug!(
                "No video id in {:?}, falling back to direct media",
                self.media
            );
        }

        MediaKind::Direct
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

/// Pull the `v=` query parameter out of a watch URL.
fn extract_video_id(reference: &str) -> Option<String> {
    let url = Url::parse(reference).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// Ordered, non-empty collection of slides.
pub struct SlideDeck {
    slides: Vec<Slide>,
}

impl SlideDeck {
    /// Build a deck from an explicit slide list. The scheduler's modulo
    /// wraparound assumes at least one slide, so an empty list is an error.
    pub fn new(slides: Vec<Slide>) -> Result<Self> {
        if slides.is_empty() {
            bail!("Slide deck must contain at least one slide");
        }
        Ok(Self { slides })
    }

    /// Load a deck from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read deck file {:?}", path))?;
        let slides: Vec<Slide> =
            serde_json::from_str(&json).context("Failed to parse deck file")?;
        Self::new(slides)
    }

    /// The compiled-in default deck.
    pub fn builtin() -> Self {
        Self {
            slides: vec![
                Slide {
                    id: 1,
                    title: "Blockchain Gaming".into(),
                    description: "Experience the future of gaming with blockchain \
                                  technology. Learn about NFTs, play-to-earn mechanics, \
                                  and more."
                        .into(),
                    media: String::new(),
                },
                Slide {
                    id: 2,
                    title: "DeFi Fundamentals".into(),
                    description: "Master the basics of decentralized finance, from \
                                  staking to yield farming and beyond."
                        .into(),
                    media: String::new(),
                },
                Slide {
                    id: 3,
                    title: "Interactive Learning".into(),
                    description: "Learn by doing with our interactive tutorials and \
                                  hands-on exercises."
                        .into(),
                    media: String::new(),
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn get(&self, index: usize) -> &Slide {
        &self.slides[index]
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide_with_media(media: &str) -> Slide {
        Slide {
            id: 1,
            title: "t".into(),
            description: "d".into(),
            media: media.into(),
        }
    }

    #[test]
    fn test_social_reference_uses_embed_wrapper() {
        let slide = slide_with_media("https://x.com/someone/status/123");
        match slide.media_kind() {
            MediaKind::SocialEmbed { embed_url } => {
                assert!(embed_url.starts_with("https://twitframe.com/show?url="));
                // Original URL must be percent-encoded into the wrapper.
                assert!(embed_url.contains("https%3A%2F%2Fx.com%2Fsomeone%2Fstatus%2F123"));
            }
            other => panic!("expected social embed, got {:?}", other),
        }
    }

    #[test]
    fn test_video_platform_extracts_id() {
        let slide = slide_with_media("https://www.youtube.com/watch?v=abc123&t=5");
        assert_eq!(
            slide.media_kind(),
            MediaKind::VideoPlatform {
                embed_url: "https://www.youtube.com/embed/abc123".into()
            }
        );
    }

    #[test]
    fn test_video_platform_without_id_degrades_to_direct() {
        let slide = slide_with_media("https://www.youtube.com/watch?list=PL1");
        assert_eq!(slide.media_kind(), MediaKind::Direct);

        let slide = slide_with_media("https://www.youtube.com/watch?v=");
        assert_eq!(slide.media_kind(), MediaKind::Direct);
    }

    #[test]
    fn test_empty_reference_is_direct() {
        let slide = slide_with_media("");
        assert_eq!(slide.media_kind(), MediaKind::Direct);
        assert!(!slide.has_media());
    }

    #[test]
    fn test_plain_file_is_direct() {
        let slide = slide_with_media("/media/intro.mp4");
        assert_eq!(slide.media_kind(), MediaKind::Direct);
    }

    #[test]
    fn test_deck_rejects_empty_list() {
        assert!(SlideDeck::new(Vec::new()).is_err());
    }

    #[test]
    fn test_builtin_deck_is_nonempty() {
        let deck = SlideDeck::builtin();
        assert!(deck.len() >= 1);
        assert_eq!(deck.get(0).id, 1);
    }
}
