use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Device family recorded on guides authored without an explicit selection.
pub const UNSPECIFIED_DEVICE_FAMILY: &str = "N/A";

/// A versioned how-to guide, as stored locally, bundled as a seed, and served by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    /// Storage and navigation identity, e.g. "zoom-join-android-es"
    pub id: String,
    /// Groups language/device variants of the same guide; `id` stands in when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    pub title: String,
    /// Monotonic; the only precedence signal between two copies of one logical guide
    pub version: u64,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub device_families: Vec<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub steps: Vec<GuideStep>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GuideStatus>,
}

impl Guide {
    /// Key under which language/device variants collapse into one catalog entry.
    pub fn logical_key(&self) -> &str {
        self.base_id.as_deref().unwrap_or(&self.id)
    }

    /// Case-insensitive substring match against title or category.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
    }
}

/// One step of a guide. `step_number` is a 1-based display label that tracks position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuideStep {
    /// Client-side identity for editors; never required by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub step_number: u32,
    pub text: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tts: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GuideStatus {
    Draft,
    Private,
    Public,
    PendingReview,
    Rejected,
}

/// Direction for moving a step one position within its guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// App lifecycle transitions as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub language: String,
    pub tts_auto_play: bool,
    pub high_contrast: bool,
}

/// Partial settings body for `PATCH /me/settings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts_auto_play: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_contrast: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.tts_auto_play.is_none() && self.high_contrast.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub settings: Option<UserSettings>,
}

/// One page of the signed-in user's library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Library {
    #[serde(default)]
    pub favorites: Vec<Guide>,
    #[serde(default)]
    pub created: Vec<Guide>,
}

/// Filters for `GET /guides`. Unset fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_uid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_document() {
        let json = r#"{
            "id": "zoom-join-android-es",
            "baseId": "zoom-join-android",
            "title": "Unirse a Zoom",
            "version": 2,
            "lastUpdated": "2025-01-10",
            "deviceFamilies": ["android-generic"],
            "language": "es",
            "category": "Video Calls",
            "steps": [{"stepNumber": 1, "text": "Abra Zoom", "image": "", "tts": ""}]
        }"#;
        let guide: Guide = serde_json::from_str(json).expect("valid guide");
        assert_eq!(guide.logical_key(), "zoom-join-android");
        assert_eq!(guide.steps[0].step_number, 1);
        assert!(guide.steps[0].id.is_none());
        assert!(guide.status.is_none());
    }

    #[test]
    fn logical_key_falls_back_to_id() {
        let guide: Guide =
            serde_json::from_str(r#"{"id": "a", "title": "Join Zoom", "version": 1}"#).expect("valid guide");
        assert_eq!(guide.logical_key(), "a");
    }

    #[test]
    fn query_matches_title_or_category_ignoring_case() {
        let guide: Guide = serde_json::from_str(
            r#"{"id": "a", "title": "Join Zoom", "version": 1, "category": "Video Calls"}"#,
        )
        .expect("valid guide");
        assert!(guide.matches_query("zoom"));
        assert!(guide.matches_query("VIDEO"));
        assert!(!guide.matches_query("email"));
    }

    #[test]
    fn guide_query_omits_unset_filters() {
        let query = GuideQuery {
            search: Some("zoom".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        let value = serde_json::to_value(&query).expect("serializable");
        assert_eq!(value, serde_json::json!({"search": "zoom", "limit": 10}));
    }

    #[test]
    fn status_uses_kebab_case() {
        let json = serde_json::to_string(&GuideStatus::PendingReview).expect("serializable");
        assert_eq!(json, "\"pending-review\"");
    }
}
