use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{AppLifecycle, Guide, GuideStep, MoveDirection, UserSettings};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchGuidesParams {
    /// Words to look for in guide titles and categories, e.g. "zoom".
    pub query: String,
    /// Treat this call as a keystroke: wait for typing to settle and report `superseded`
    /// when a newer search arrives first.
    #[serde(default)]
    pub as_you_type: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetGuideParams {
    /// Guide id such as "zoom-join-android".
    pub guide_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCategoryParams {
    /// Category name such as "Video Calls" (case-insensitive).
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FavoriteParams {
    pub guide_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AppStateParams {
    /// New lifecycle state reported by the host.
    pub state: AppLifecycle,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SignInParams {
    pub email: String,
    /// Bearer credential issued by the identity provider.
    pub id_token: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateSettingsParams {
    pub language: Option<String>,
    pub tts_auto_play: Option<bool>,
    pub high_contrast: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LibraryParams {
    /// Page size (default: 20).
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StepInput {
    pub text: String,
    #[serde(default)]
    pub image: String,
    /// Text read aloud for this step; defaults to nothing.
    #[serde(default)]
    pub tts: String,
}

impl From<StepInput> for GuideStep {
    fn from(step: StepInput) -> Self {
        GuideStep {
            id: None,
            step_number: 0,
            text: step.text,
            image: step.image,
            tts: step.tts,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GuideDraftParams {
    pub title: String,
    #[serde(default)]
    pub category: String,
    /// Device families the guide applies to; empty means unspecified.
    #[serde(default)]
    pub device_families: Vec<String>,
    /// Steps in display order.
    pub steps: Vec<StepInput>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateGuideParams {
    pub guide_id: String,
    #[serde(flatten)]
    pub draft: GuideDraftParams,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MoveStepParams {
    pub guide_id: String,
    /// 1-based number of the step to move.
    pub step_number: u32,
    pub direction: MoveDirection,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddStepParams {
    pub guide_id: String,
    #[serde(flatten)]
    pub step: StepInput,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateStepParams {
    pub guide_id: String,
    /// 1-based number of the step to replace.
    pub step_number: u32,
    #[serde(flatten)]
    pub step: StepInput,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StepParams {
    pub guide_id: String,
    /// 1-based number of the step.
    pub step_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GuideSummary {
    pub id: String,
    pub base_id: Option<String>,
    pub title: String,
    pub category: String,
    pub language: String,
    pub version: u64,
    pub step_count: usize,
}

impl From<&Guide> for GuideSummary {
    fn from(guide: &Guide) -> Self {
        GuideSummary {
            id: guide.id.clone(),
            base_id: guide.base_id.clone(),
            title: guide.title.clone(),
            category: guide.category.clone(),
            language: guide.language.clone(),
            version: guide.version,
            step_count: guide.steps.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchGuidesResponse {
    pub results: Vec<GuideSummary>,
    /// A newer as-you-type search replaced this one; `results` is empty.
    pub superseded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GuideListResponse {
    pub guides: Vec<GuideSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GuideDetailResponse {
    pub guide: Guide,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FavoritesResponse {
    pub favorites: Vec<String>,
    /// False when the call did not change the list.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppStateResponse {
    /// A pending favorites push was sent.
    pub flushed: bool,
    /// A favorites push is still scheduled.
    pub sync_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionResponse {
    pub signed_in: bool,
    pub email: Option<String>,
    pub settings: UserSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsResponse {
    pub settings: UserSettings,
    /// The profile service accepted the change.
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LibraryResponse {
    pub favorites: Vec<GuideSummary>,
    pub created: Vec<GuideSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteGuideResponse {
    pub deleted: String,
}
