//! Episode and feed source types
//!
//! Payload items stored in the cache and the feed descriptors the refresh
//! pipeline iterates over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a feed's episode listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Stable identifier of the episode within its feed
    pub guid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl Episode {
    /// Creates an episode with only the required fields set.
    pub fn new(guid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
            audio_url: None,
            published_at: None,
            duration_secs: None,
        }
    }
}

/// A remote episode listing the pipeline keeps cached.
///
/// `id` doubles as the cache key and the batch sub-key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_deserialize_minimal() {
        let json = r#"{"guid": "ep-1", "title": "Pilot"}"#;
        let episode: Episode = serde_json::from_str(json).unwrap();
        assert_eq!(episode, Episode::new("ep-1", "Pilot"));
    }

    #[test]
    fn test_episode_deserialize_full() {
        let json = r#"{
            "guid": "ep-2",
            "title": "Second",
            "audio_url": "https://cdn.test/ep-2.mp3",
            "published_at": "2024-03-01T12:00:00Z",
            "duration_secs": 1800
        }"#;
        let episode: Episode = serde_json::from_str(json).unwrap();
        assert_eq!(episode.duration_secs, Some(1800));
        assert_eq!(
            episode.published_at.map(|d| d.to_rfc3339()),
            Some("2024-03-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_episode_skips_empty_optionals() {
        let json = serde_json::to_string(&Episode::new("ep-3", "Third")).unwrap();
        assert!(!json.contains("audio_url"));
        assert!(!json.contains("published_at"));
    }
}
