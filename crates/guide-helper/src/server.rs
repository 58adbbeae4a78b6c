/// MCP server exposing the guide helper to an assistant or UI shell.
///
/// Reading tools degrade to local data when the catalog is unreachable. Authoring and account
/// tools report failures back to the caller.
use std::sync::Arc;

use guide_common::api::{GuideCatalog, ProfileService};
use guide_common::mcp_api::{
    AddStepParams, AppStateParams, AppStateResponse, DeleteGuideResponse, FavoriteParams, FavoritesResponse,
    GetGuideParams, GuideDetailResponse, GuideDraftParams, GuideListResponse, GuideSummary,
    LibraryParams, LibraryResponse, ListCategoryParams, MoveStepParams, SearchGuidesParams,
    SearchGuidesResponse, SessionResponse, SettingsResponse, SignInParams, StepParams,
    UpdateGuideParams, UpdateSettingsParams, UpdateStepParams,
};
use guide_common::model::{Guide, SettingsPatch};
use guide_common::session::Session;
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::account::Account;
use crate::authoring::{Authoring, GuideDraft};
use crate::catalog::{CatalogService, SearchDebouncer};
use crate::config::Config;
use crate::favorites::FavoritesSync;
use crate::state::AppState;
use crate::store::GuideStore;

#[derive(Clone)]
pub struct GuideHelperServer {
    state: Arc<AppState>,
    catalog: Arc<CatalogService>,
    authoring: Arc<Authoring>,
    account: Arc<Account>,
    favorites: FavoritesSync,
    debouncer: Arc<SearchDebouncer>,
    tool_router: ToolRouter<GuideHelperServer>,
}

impl GuideHelperServer {
    pub fn new(
        config: &Config,
        state: Arc<AppState>,
        store: Arc<GuideStore>,
        remote: Arc<dyn GuideCatalog>,
        profile: Arc<dyn ProfileService>,
        favorites: FavoritesSync,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            Arc::clone(&state),
        ));
        let authoring = Arc::new(Authoring::new(store, remote, Arc::clone(&state)));
        let account = Arc::new(Account::new(Arc::clone(&state), profile));

        Self {
            state,
            catalog,
            authoring,
            account,
            favorites,
            debouncer: Arc::new(SearchDebouncer::new(config.search_debounce)),
            tool_router: Self::tool_router(),
        }
    }

    fn session_response(&self) -> SessionResponse {
        let session = self.state.session();
        SessionResponse {
            signed_in: session.is_some(),
            email: session.map(|s| s.email),
            settings: self.state.settings(),
        }
    }

    fn detail(&self, guide: Guide) -> GuideDetailResponse {
        GuideDetailResponse {
            is_favorite: self.state.is_favorite(&guide.id),
            guide,
        }
    }
}

#[tool_router]
impl GuideHelperServer {
    #[tool(description = "Search tech guides by title or category. Local guides are merged with the online catalog; the newest version of each guide wins.")]
    async fn search_guides(
        &self,
        Parameters(params): Parameters<SearchGuidesParams>,
    ) -> Result<Json<SearchGuidesResponse>, String> {
        let query = params.query.trim().to_string();

        let results = if params.as_you_type {
            self.catalog.search_as_you_type(&self.debouncer, &query).await
        } else {
            Some(self.catalog.search(&query).await)
        };

        Ok(Json(match results {
            Some(guides) => SearchGuidesResponse {
                results: summaries(&guides),
                superseded: false,
            },
            None => SearchGuidesResponse {
                results: Vec::new(),
                superseded: true,
            },
        }))
    }

    #[tool(description = "Open a guide by id (e.g. 'zoom-join-android') and return all of its steps. Counts as a view.")]
    async fn get_guide(
        &self,
        Parameters(params): Parameters<GetGuideParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let guide = self
            .catalog
            .open_guide(&guide_id)
            .await
            .ok_or_else(|| format!("guide not found: {guide_id}"))?;
        Ok(Json(self.detail(guide)))
    }

    #[tool(description = "List stored guides in a category such as 'Video Calls', 'Email' or 'Security'.")]
    async fn list_category(
        &self,
        Parameters(params): Parameters<ListCategoryParams>,
    ) -> Result<Json<GuideListResponse>, String> {
        let category = non_empty(&params.category, "category")?;
        let guides = self.catalog.browse_category(&category).await;
        Ok(Json(GuideListResponse {
            guides: summaries(&guides),
        }))
    }

    #[tool(description = "Suggested guides for the current language and device.")]
    async fn suggested_guides(&self) -> Result<Json<GuideListResponse>, String> {
        let guides = self.catalog.suggestions().await;
        Ok(Json(GuideListResponse {
            guides: summaries(&guides),
        }))
    }

    #[tool(description = "Recently opened guides, most recent first.")]
    async fn recent_guides(&self) -> Result<Json<GuideListResponse>, String> {
        let guides = self.catalog.recently_viewed().await;
        Ok(Json(GuideListResponse {
            guides: summaries(&guides),
        }))
    }

    #[tool(description = "Mark a guide as a favorite. Favorites are synced to the user's profile shortly after changes when signed in.")]
    async fn add_favorite(
        &self,
        Parameters(params): Parameters<FavoriteParams>,
    ) -> Result<Json<FavoritesResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let changed = self.state.add_favorite(&guide_id);
        Ok(Json(FavoritesResponse {
            favorites: self.state.favorites(),
            changed,
        }))
    }

    #[tool(description = "Remove a guide from the favorites.")]
    async fn remove_favorite(
        &self,
        Parameters(params): Parameters<FavoriteParams>,
    ) -> Result<Json<FavoritesResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let changed = self.state.remove_favorite(&guide_id);
        Ok(Json(FavoritesResponse {
            favorites: self.state.favorites(),
            changed,
        }))
    }

    #[tool(description = "List favorite guides in the order they were added. Guides not on this device are fetched from the catalog.")]
    async fn list_favorites(&self) -> Result<Json<GuideListResponse>, String> {
        let guides = self.catalog.favorite_guides().await;
        Ok(Json(GuideListResponse {
            guides: summaries(&guides),
        }))
    }

    #[tool(description = "Report an app lifecycle change ('active', 'inactive' or 'background'). Leaving the foreground sends pending favorite changes immediately.")]
    async fn app_state_changed(
        &self,
        Parameters(params): Parameters<AppStateParams>,
    ) -> Result<Json<AppStateResponse>, String> {
        let flushed = self.favorites.app_state_changed(params.state).await;
        Ok(Json(AppStateResponse {
            flushed,
            sync_pending: self.favorites.is_pending(),
        }))
    }

    #[tool(description = "Sign in with an identity token. Settings saved in the user's profile are applied.")]
    async fn sign_in(
        &self,
        Parameters(params): Parameters<SignInParams>,
    ) -> Result<Json<SessionResponse>, String> {
        let email = non_empty(&params.email, "email")?;
        let id_token = non_empty(&params.id_token, "id_token")?;
        self.account.sign_in(Session { email, id_token }).await;
        Ok(Json(self.session_response()))
    }

    #[tool(description = "Sign out. Favorites stay on the device and stop syncing.")]
    async fn sign_out(&self) -> Result<Json<SessionResponse>, String> {
        self.account.sign_out();
        Ok(Json(self.session_response()))
    }

    #[tool(description = "Change language, read-aloud or high-contrast settings. Saved to the profile when signed in.")]
    async fn update_settings(
        &self,
        Parameters(params): Parameters<UpdateSettingsParams>,
    ) -> Result<Json<SettingsResponse>, String> {
        let patch = SettingsPatch {
            language: params.language,
            tts_auto_play: params.tts_auto_play,
            high_contrast: params.high_contrast,
        };
        let (settings, synced) = self.account.update_settings(&patch).await;
        Ok(Json(SettingsResponse { settings, synced }))
    }

    #[tool(description = "The signed-in user's library: favorite and created guides, one page at a time.")]
    async fn get_library(
        &self,
        Parameters(params): Parameters<LibraryParams>,
    ) -> Result<Json<LibraryResponse>, String> {
        let library = self.account.library(params.limit, params.offset).await;
        Ok(Json(LibraryResponse {
            favorites: summaries(&library.favorites),
            created: summaries(&library.created),
        }))
    }

    #[tool(description = "Create a new guide. Requires sign-in. Needs a title and at least one step with text.")]
    async fn create_guide(
        &self,
        Parameters(params): Parameters<GuideDraftParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide = self
            .authoring
            .create(to_draft(params))
            .await
            .map_err(|e| format!("create failed: {e}"))?;
        info!(id = %guide.id, "create_guide completed");
        Ok(Json(self.detail(guide)))
    }

    #[tool(description = "Replace the title, category, devices and steps of an existing guide. Requires sign-in.")]
    async fn update_guide(
        &self,
        Parameters(params): Parameters<UpdateGuideParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let guide = self
            .authoring
            .update(&guide_id, to_draft(params.draft))
            .await
            .map_err(|e| format!("update failed: {e}"))?;
        Ok(Json(self.detail(guide)))
    }

    #[tool(description = "Delete a guide from the catalog and this device. Requires sign-in.")]
    async fn delete_guide(
        &self,
        Parameters(params): Parameters<GetGuideParams>,
    ) -> Result<Json<DeleteGuideResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        self.authoring
            .delete(&guide_id)
            .await
            .map_err(|e| format!("delete failed: {e}"))?;
        Ok(Json(DeleteGuideResponse { deleted: guide_id }))
    }

    #[tool(description = "Append a step to the end of a guide. Requires sign-in.")]
    async fn add_guide_step(
        &self,
        Parameters(params): Parameters<AddStepParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let guide = self
            .authoring
            .add_step(&guide_id, params.step.into())
            .await
            .map_err(|e| format!("add step failed: {e}"))?;
        Ok(Json(self.detail(guide)))
    }

    #[tool(description = "Replace the text, image and read-aloud text of one step. Requires sign-in.")]
    async fn update_guide_step(
        &self,
        Parameters(params): Parameters<UpdateStepParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let guide = self
            .authoring
            .update_step(&guide_id, params.step_number, params.step.into())
            .await
            .map_err(|e| format!("update step failed: {e}"))?;
        Ok(Json(self.detail(guide)))
    }

    #[tool(description = "Move one step of a guide up or down by one position. Steps are renumbered. Requires sign-in.")]
    async fn move_guide_step(
        &self,
        Parameters(params): Parameters<MoveStepParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let guide = self
            .authoring
            .move_step(&guide_id, params.step_number, params.direction)
            .await
            .map_err(|e| format!("move failed: {e}"))?;
        Ok(Json(self.detail(guide)))
    }

    #[tool(description = "Delete one step of a guide. Remaining steps are renumbered. Requires sign-in.")]
    async fn delete_guide_step(
        &self,
        Parameters(params): Parameters<StepParams>,
    ) -> Result<Json<GuideDetailResponse>, String> {
        let guide_id = non_empty(&params.guide_id, "guide_id")?;
        let guide = self
            .authoring
            .delete_step(&guide_id, params.step_number)
            .await
            .map_err(|e| format!("delete step failed: {e}"))?;
        Ok(Json(self.detail(guide)))
    }
}

fn non_empty(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn summaries(guides: &[Guide]) -> Vec<GuideSummary> {
    guides.iter().map(GuideSummary::from).collect()
}

fn to_draft(params: GuideDraftParams) -> GuideDraft {
    GuideDraft {
        title: params.title,
        category: params.category,
        device_families: params.device_families,
        steps: params.steps.into_iter().map(Into::into).collect(),
        is_private: params.is_private,
    }
}

#[tool_handler]
impl ServerHandler for GuideHelperServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "guide-helper".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tech guide helper. Step-by-step guides for everyday phone and computer tasks, \
                 available offline. Use search_guides or list_category to find a guide, \
                 get_guide to read it, and the favorite tools to bookmark it. Call \
                 app_state_changed when the host app leaves the foreground. Authoring \
                 tools require sign_in first."
                    .to_string(),
            ),
        }
    }
}
