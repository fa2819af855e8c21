//! API request handlers
//!
//! Every endpoint answers with the [`ApiResponse`] envelope. Library errors
//! map to HTTP status codes in [`ApiError`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::server::AppState;
use crate::auth::SessionInfo;
use crate::core::occupancy::find_room;
use crate::core::{
    building_summary, filter_rooms, floor_summary, suggest_rooms, Availability, OccupantPatch,
    RoomFilter, RoomSuggestion, RoomUpdate, RoomUpdateOutcome,
};
use crate::error::AllocError;
use crate::reports::{
    self, building_report, occupant_report, utilization_report, BuildingReport, CsvExport,
    ExcelReport, OccupantReport, SummaryMetrics, UtilizationReport,
};
use crate::store::BackupInfo;
use crate::types::{Occupant, OccupancySummary, OccupantStatus, RoomKey, RoomKind, RoomOccupancy};

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Library error on its way to an HTTP response
#[derive(Debug)]
pub struct ApiError(pub AllocError);

impl From<AllocError> for ApiError {
    fn from(e: AllocError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            AllocError::NotFound(_) => StatusCode::NOT_FOUND,
            AllocError::Conflict(_) => StatusCode::CONFLICT,
            AllocError::Validation(_) => StatusCode::BAD_REQUEST,
            AllocError::Auth(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(ApiResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn parse_status(value: Option<&str>) -> Result<OccupantStatus, ApiError> {
    Ok(value
        .map(str::parse::<OccupantStatus>)
        .transpose()?
        .unwrap_or(OccupantStatus::Current))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Reject requests without a live session when authentication is enabled
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.settings.auth_enabled {
        let token = bearer_token(request.headers())
            .ok_or_else(|| AllocError::Auth("Not logged in".to_string()))?;
        state.sessions.write().await.validate(&token, Utc::now())?;
    }
    Ok(next.run(request).await)
}

//==============================================================================
// Info
//==============================================================================

#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "Rooms API Server".to_string(),
        version: state.version.clone(),
        description: "Office room allocation: occupants, capacities and occupancy".to_string(),
        endpoints: vec![
            endpoint("GET", "/health", "Health check endpoint"),
            endpoint("POST", "/api/v1/login", "Start a session"),
            endpoint("GET", "/api/v1/occupants", "List occupants"),
            endpoint("GET", "/api/v1/rooms", "Room occupancy with filters"),
            endpoint("GET", "/api/v1/rooms/suggest", "Rooms for a new occupant"),
            endpoint("GET", "/api/v1/occupancy", "Occupancy by room, building and floor"),
            endpoint("GET", "/api/v1/reports/summary", "Headline metrics"),
            endpoint("POST", "/api/v1/save", "Write the workbook"),
        ],
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub auth_enabled: bool,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        auth_enabled: state.settings.auth_enabled,
    }))
}

//==============================================================================
// Sessions
//==============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub remaining_minutes: i64,
}

/// POST /api/v1/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let now = Utc::now();
    let session = state.sessions.write().await.login(&req.password, now)?;
    ok(LoginResponse {
        remaining_minutes: session.remaining_minutes(now),
        token: session.token,
        expires_at: session.expires_at,
    })
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

/// POST /api/v1/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<LogoutResponse> {
    let logged_out = match bearer_token(&headers) {
        Some(token) => state.sessions.write().await.logout(&token),
        None => false,
    };
    ok(LogoutResponse { logged_out })
}

/// GET /api/v1/session - remaining time, with a warning near expiry
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<SessionInfo> {
    let token =
        bearer_token(&headers).ok_or_else(|| AllocError::Auth("Not logged in".to_string()))?;
    let now = Utc::now();
    let session = state.sessions.write().await.validate(&token, now)?;
    ok(session.info(now))
}

//==============================================================================
// Occupants
//==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OccupantQuery {
    pub status: Option<String>,
    pub building: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub unassigned: bool,
}

/// GET /api/v1/occupants?status=&building=&search=&unassigned=
pub async fn list_occupants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OccupantQuery>,
) -> ApiResult<Vec<Occupant>> {
    let status = parse_status(query.status.as_deref())?;
    let workspace = state.workspace.read().await;
    let registry = workspace.occupants();

    let list = if query.unassigned {
        registry.unassigned(status)
    } else if let Some(term) = query.search.as_deref().filter(|t| !t.trim().is_empty()) {
        registry.search(status, term)
    } else {
        registry.filter_by_building(status, query.building.as_deref())
    };
    ok(list.into_iter().cloned().collect())
}

/// POST /api/v1/occupants
pub async fn add_occupant(
    State(state): State<Arc<AppState>>,
    Json(occupant): Json<Occupant>,
) -> ApiResult<Occupant> {
    state
        .workspace
        .write()
        .await
        .add_occupant(occupant.clone())?;
    ok(occupant)
}

/// PUT /api/v1/occupants/:status/:name
pub async fn update_occupant(
    State(state): State<Arc<AppState>>,
    Path((status, name)): Path<(String, String)>,
    Json(patch): Json<OccupantPatch>,
) -> ApiResult<Occupant> {
    let status = parse_status(Some(&status))?;
    let updated = state
        .workspace
        .write()
        .await
        .update_occupant(&name, status, patch)?;
    ok(updated)
}

/// DELETE /api/v1/occupants/:status/:name
pub async fn delete_occupant(
    State(state): State<Arc<AppState>>,
    Path((status, name)): Path<(String, String)>,
) -> ApiResult<Occupant> {
    let status = parse_status(Some(&status))?;
    let removed = state
        .workspace
        .write()
        .await
        .occupants_mut()
        .delete(&name, status)?;
    ok(removed)
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub name: String,
    pub from: OccupantStatus,
    pub to: OccupantStatus,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// POST /api/v1/occupants/move
pub async fn move_occupant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Occupant> {
    let moved = state
        .workspace
        .write()
        .await
        .move_occupant(&req.name, req.from, req.to, req.end_date)?;
    ok(moved)
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub name: String,
    pub building: String,
    pub office: String,
    #[serde(default = "current_status")]
    pub status: OccupantStatus,
}

fn current_status() -> OccupantStatus {
    OccupantStatus::Current
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub occupant: String,
    pub room: RoomOccupancy,
}

/// POST /api/v1/occupants/assign
pub async fn assign_occupant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<AssignResponse> {
    let key = RoomKey::new(&req.building, &req.office);
    let mut workspace = state.workspace.write().await;
    workspace.assign(&req.name, &key, req.status)?;
    let occupancy = workspace.occupancy();
    let room = find_room(&occupancy, &key)
        .cloned()
        .ok_or_else(|| AllocError::NotFound(format!("Room {}", key)))?;
    ok(AssignResponse {
        occupant: req.name,
        room,
    })
}

//==============================================================================
// Rooms
//==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RoomQuery {
    pub building: Option<String>,
    pub floor: Option<String>,
    /// Comma-separated availability classes, or `all`
    pub availability: Option<String>,
}

impl RoomQuery {
    fn filter(&self) -> Result<RoomFilter, ApiError> {
        let availability = match self.availability.as_deref().map(str::trim) {
            Some(list) if list.eq_ignore_ascii_case("all") => Availability::ALL.to_vec(),
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse::<Availability>)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        Ok(RoomFilter::new(
            self.building.clone().filter(|b| !b.is_empty()),
            self.floor.clone().filter(|f| !f.is_empty()),
            availability,
        ))
    }
}

/// GET /api/v1/rooms?building=&floor=&availability=vacant,has-space
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> ApiResult<Vec<RoomOccupancy>> {
    let filter = query.filter()?;
    let occupancy = state.workspace.read().await.occupancy();
    ok(filter_rooms(&occupancy, &filter).into_iter().cloned().collect())
}

#[derive(Deserialize)]
pub struct AddRoomRequest {
    pub building: String,
    pub office: String,
    pub capacity: Option<u32>,
    #[serde(default)]
    pub kind: RoomKind,
}

/// POST /api/v1/rooms
pub async fn add_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddRoomRequest>,
) -> ApiResult<RoomOccupancy> {
    let key = RoomKey::new(&req.building, &req.office);
    let capacity = req.capacity.unwrap_or(match req.kind {
        RoomKind::Storage => 0,
        RoomKind::Regular => state.settings.default_capacity,
    });
    let mut workspace = state.workspace.write().await;
    workspace.add_room(key.clone(), capacity, req.kind)?;
    let occupancy = workspace.occupancy();
    let room = find_room(&occupancy, &key)
        .cloned()
        .ok_or_else(|| AllocError::NotFound(format!("Room {}", key)))?;
    ok(room)
}

/// PUT /api/v1/rooms/:building/:office
pub async fn update_room(
    State(state): State<Arc<AppState>>,
    Path((building, office)): Path<(String, String)>,
    Json(update): Json<RoomUpdate>,
) -> ApiResult<RoomUpdateOutcome> {
    let key = RoomKey::new(&building, &office);
    let outcome = state.workspace.write().await.update_room(&key, update)?;
    ok(outcome)
}

#[derive(Serialize)]
pub struct DeleteRoomResponse {
    pub room: String,
    pub removed_occupants: usize,
}

/// DELETE /api/v1/rooms/:building/:office
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path((building, office)): Path<(String, String)>,
) -> ApiResult<DeleteRoomResponse> {
    let key = RoomKey::new(&building, &office);
    let removed = state.workspace.write().await.delete_room(&key)?;
    ok(DeleteRoomResponse {
        room: key.to_string(),
        removed_occupants: removed,
    })
}

#[derive(Deserialize)]
pub struct CapacityRequest {
    pub capacity: u32,
}

/// PUT /api/v1/rooms/:building/:office/capacity
pub async fn set_capacity(
    State(state): State<Arc<AppState>>,
    Path((building, office)): Path<(String, String)>,
    Json(req): Json<CapacityRequest>,
) -> ApiResult<RoomOccupancy> {
    let key = RoomKey::new(&building, &office);
    let mut workspace = state.workspace.write().await;
    workspace.set_capacity(&key, req.capacity)?;
    let occupancy = workspace.occupancy();
    let room = find_room(&occupancy, &key)
        .cloned()
        .ok_or_else(|| AllocError::NotFound(format!("Room {}", key)))?;
    ok(room)
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    pub status: Option<String>,
}

/// GET /api/v1/rooms/suggest?status=upcoming
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> ApiResult<Vec<RoomSuggestion>> {
    let status = parse_status(query.status.as_deref())?;
    let occupancy = state.workspace.read().await.occupancy();
    ok(suggest_rooms(&occupancy, status))
}

//==============================================================================
// Occupancy and reports
//==============================================================================

#[derive(Serialize)]
pub struct OccupancyResponse {
    pub rooms: Vec<RoomOccupancy>,
    pub buildings: Vec<OccupancySummary>,
    pub floors: Vec<OccupancySummary>,
}

/// GET /api/v1/occupancy
pub async fn occupancy(State(state): State<Arc<AppState>>) -> ApiResult<OccupancyResponse> {
    let rooms = state.workspace.read().await.occupancy();
    ok(OccupancyResponse {
        buildings: building_summary(&rooms),
        floors: floor_summary(&rooms, None),
        rooms,
    })
}

/// GET /api/v1/reports/summary
pub async fn report_summary(State(state): State<Arc<AppState>>) -> ApiResult<SummaryMetrics> {
    let workspace = state.workspace.read().await;
    ok(SummaryMetrics::compute(
        workspace.occupants(),
        &workspace.occupancy(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct BuildingQuery {
    pub building: Option<String>,
}

/// GET /api/v1/reports/buildings?building=
pub async fn report_buildings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BuildingQuery>,
) -> ApiResult<Vec<BuildingReport>> {
    let workspace = state.workspace.read().await;
    let occupancy = workspace.occupancy();
    let names: Vec<String> = match query.building {
        Some(b) => vec![b],
        None => building_summary(&occupancy)
            .into_iter()
            .map(|s| s.building)
            .collect(),
    };
    let reports = names
        .iter()
        .map(|name| building_report(workspace.occupants(), &occupancy, name))
        .collect::<Result<Vec<_>, _>>()?;
    ok(reports)
}

/// GET /api/v1/reports/utilization
pub async fn report_utilization(
    State(state): State<Arc<AppState>>,
) -> ApiResult<UtilizationReport> {
    let workspace = state.workspace.read().await;
    ok(utilization_report(
        workspace.occupants(),
        &workspace.occupancy(),
    ))
}

/// GET /api/v1/reports/occupants
pub async fn report_occupants(State(state): State<Arc<AppState>>) -> ApiResult<OccupantReport> {
    ok(occupant_report(state.workspace.read().await.occupants()))
}

//==============================================================================
// Persistence and export
//==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub ignore_warnings: bool,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub backup: Option<String>,
    pub warnings: Vec<String>,
    pub saved_at: String,
}

/// POST /api/v1/save - validate, back up and write the workbook. The body is
/// optional.
pub async fn save(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SaveRequest>>,
) -> ApiResult<SaveResponse> {
    let Json(req) = body.unwrap_or_default();
    let mut workspace = state.workspace.write().await;
    let outcome = workspace.save(req.ignore_warnings)?;
    ok(SaveResponse {
        backup: outcome.backup.map(|p| p.display().to_string()),
        warnings: outcome.warnings,
        saved_at: workspace
            .last_save()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
    })
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub current: usize,
    pub upcoming: usize,
    pub past: usize,
}

/// POST /api/v1/reload - drop unsaved edits
pub async fn reload(State(state): State<Arc<AppState>>) -> ApiResult<ReloadResponse> {
    let mut workspace = state.workspace.write().await;
    workspace.reload()?;
    let occupants = workspace.occupants();
    ok(ReloadResponse {
        current: occupants.count(OccupantStatus::Current),
        upcoming: occupants.count(OccupantStatus::Upcoming),
        past: occupants.count(OccupantStatus::Past),
    })
}

#[derive(Serialize)]
pub struct PathResponse {
    pub path: String,
}

/// POST /api/v1/backup
pub async fn create_backup(State(state): State<Arc<AppState>>) -> ApiResult<PathResponse> {
    let path = state.workspace.read().await.create_backup()?;
    ok(PathResponse {
        path: path.display().to_string(),
    })
}

/// GET /api/v1/backups
pub async fn list_backups(State(state): State<Arc<AppState>>) -> ApiResult<Vec<BackupInfo>> {
    ok(state.workspace.read().await.store().list_backups()?)
}

#[derive(Serialize)]
pub struct RestoreResponse {
    pub restored: String,
    pub previous: Option<String>,
}

/// POST /api/v1/backups/:name/restore
pub async fn restore_backup(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<RestoreResponse> {
    let previous = state.workspace.write().await.restore_backup(&name)?;
    ok(RestoreResponse {
        restored: name,
        previous: previous.map(|p| p.display().to_string()),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct CsvExportRequest {
    /// current, upcoming, past, rooms, buildings; everything when empty
    #[serde(default)]
    pub data: Vec<String>,
}

#[derive(Serialize)]
pub struct ExportResponse {
    pub files: Vec<String>,
}

/// POST /api/v1/export/csv
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CsvExportRequest>>,
) -> ApiResult<ExportResponse> {
    let Json(req) = body.unwrap_or_default();
    let mut selection = req
        .data
        .iter()
        .map(|s| s.parse::<CsvExport>())
        .collect::<Result<Vec<_>, _>>()?;
    if selection.is_empty() {
        selection = CsvExport::ALL.to_vec();
    }
    let workspace = state.workspace.read().await;
    let files = reports::export_csv(
        workspace.occupants(),
        &workspace.occupancy(),
        &state.settings.export_dir,
        &selection,
    )?;
    ok(ExportResponse {
        files: files.iter().map(|p| p.display().to_string()).collect(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ExcelExportRequest {
    /// full, building or utilization
    #[serde(default)]
    pub report: Option<String>,
    pub building: Option<String>,
}

impl ExcelExportRequest {
    fn report(&self) -> Result<ExcelReport, AllocError> {
        match (self.report.as_deref().unwrap_or("full"), &self.building) {
            ("full", _) => Ok(ExcelReport::Full),
            ("utilization", _) => Ok(ExcelReport::Utilization),
            ("building", Some(b)) if !b.trim().is_empty() => Ok(ExcelReport::Building(b.clone())),
            ("building", _) => Err(AllocError::Validation(
                "A building is required for a building report".to_string(),
            )),
            (other, _) => Err(AllocError::Validation(format!(
                "Unknown report '{}'. Expected full, building or utilization",
                other
            ))),
        }
    }
}

/// POST /api/v1/export/excel
pub async fn export_excel(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ExcelExportRequest>>,
) -> ApiResult<ExportResponse> {
    let Json(req) = body.unwrap_or_default();
    let report = req.report()?;
    let workspace = state.workspace.read().await;
    let path = reports::export_excel_report(
        &report,
        workspace.occupants(),
        &workspace.occupancy(),
        &state.settings.export_dir,
    )?;
    ok(ExportResponse {
        files: vec![path.display().to_string()],
    })
}
