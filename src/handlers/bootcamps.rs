// handlers/bootcamps.rs - /api/v1/bootcamps

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, RawQuery, State},
    Json,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path as FsPath;
use tracing::{error, info};

use super::json_body;
use crate::auth::policy::{ensure_owner, ensure_role};
use crate::auth::Principal;
use crate::database::models::{BOOTCAMPS, COURSES};
use crate::database::schema::{Document, FieldKind, ID_FIELD};
use crate::error::ApiError;
use crate::filter::{AdvancedQuery, Condition, Filter, FindQuery};
use crate::middleware::{AdvancedResults, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::PUBLISHING_ROLES;

const UPLOAD_FIELD: &str = "file";

/// GET /api/v1/bootcamps - Advanced results with each bootcamp's courses
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Vec<Document>> {
    let query = AdvancedQuery::parse(raw.as_deref(), &BOOTCAMPS, &state.config.query)?;
    let mut results = AdvancedResults::fetch(&state.repository(&BOOTCAMPS), &query).await?;
    attach_courses(&state, &mut results.data).await?;
    Ok(results.into_response())
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let bootcamp = state.repository(&BOOTCAMPS).select_404(&id).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /api/v1/bootcamps - Owned by the caller
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let body = json_body(payload)?;

    let mut derived = Map::new();
    derived.insert("user".to_string(), Value::String(principal.id.clone()));
    let bootcamp = state.repository(&BOOTCAMPS).create(&body, derived).await?;

    info!(bootcamp = ?bootcamp.get(ID_FIELD), user = %principal.id, "Created bootcamp");
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let body = json_body(payload)?;
    let bootcamps = state.repository(&BOOTCAMPS);

    let existing = bootcamps.select_404(&id).await?;
    ensure_owner(&principal, &existing, &format!("update bootcamp {}", id))?;

    let bootcamp = bootcamps.update_404(&id, &body).await?;
    Ok(ApiResponse::created(bootcamp))
}

/// DELETE /api/v1/bootcamps/:id - Removes the bootcamp and its courses
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let bootcamps = state.repository(&BOOTCAMPS);

    let existing = bootcamps.select_404(&id).await?;
    ensure_owner(&principal, &existing, &format!("delete bootcamp {}", id))?;

    let courses = state
        .repository(&COURSES)
        .delete_many(&courses_of(&id))
        .await?;
    if !bootcamps.delete(&id).await? {
        return Err(bootcamps.not_found(&id).into());
    }

    info!(bootcamp = %id, courses, "Deleted bootcamp");
    Ok(ApiResponse::success(json!({})))
}

/// PUT /api/v1/bootcamps/:id/photo - Multipart upload of one image in field `file`
pub async fn photo(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let bootcamps = state.repository(&BOOTCAMPS);

    let existing = bootcamps.select_404(&id).await?;
    ensure_owner(&principal, &existing, &format!("update bootcamp {}", id))?;

    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let Some((file_name, content_type, bytes)) = upload else {
        return Err(ApiError::bad_request("Please upload a file"));
    };
    if !content_type.as_deref().is_some_and(|ct| ct.starts_with("image")) {
        return Err(ApiError::bad_request("Please upload an image file"));
    }
    let max = state.config.upload.max_file_upload;
    if bytes.len() > max {
        return Err(ApiError::bad_request(format!("Please upload an image less than {}", max)));
    }

    let stored_name = photo_file_name(&id, file_name.as_deref());
    let target = state.config.upload.file_upload_path.join(&stored_name);
    if let Err(e) = tokio::fs::write(&target, &bytes).await {
        error!("Failed to write upload {}: {}", target.display(), e);
        return Err(ApiError::internal_server_error("Problem with file upload"));
    }

    let mut changes = Map::new();
    changes.insert("photo".to_string(), Value::String(stored_name.clone()));
    bootcamps.update_404(&id, &changes).await?;

    info!(bootcamp = %id, file = %stored_name, bytes = bytes.len(), "Stored bootcamp photo");
    Ok(ApiResponse::success(stored_name))
}

/// `photo_<id>` plus the uploaded file's extension.
fn photo_file_name(id: &str, original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("photo_{}{}", id, ext)
}

pub(crate) fn courses_of(bootcamp_id: &str) -> Filter {
    Filter::new().with(Condition::eq("bootcamp", FieldKind::Reference, json!(bootcamp_id)))
}

/// Attach `courses: [{id, title, description}]` to each bootcamp.
async fn attach_courses(state: &AppState, bootcamps: &mut [Document]) -> Result<(), ApiError> {
    let ids: Vec<Value> = bootcamps
        .iter()
        .filter_map(|b| b.get(ID_FIELD).cloned())
        .collect();
    if ids.is_empty() {
        return Ok(());
    }

    let query = FindQuery {
        projection: Some(vec!["title".into(), "description".into(), "bootcamp".into()]),
        ..FindQuery::filtered(Filter::new().with(Condition::one_of("bootcamp", FieldKind::Reference, ids)))
    };
    let courses = state.repository(&COURSES).select_any(&query).await?;

    let mut by_bootcamp: HashMap<String, Vec<Value>> = HashMap::new();
    for mut course in courses {
        let Some(Value::String(owner)) = course.remove("bootcamp") else {
            continue;
        };
        by_bootcamp.entry(owner).or_default().push(Value::Object(course));
    }

    for bootcamp in bootcamps.iter_mut() {
        let courses = bootcamp
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .and_then(|id| by_bootcamp.remove(id))
            .unwrap_or_default();
        bootcamp.insert("courses".to_string(), Value::Array(courses));
    }
    Ok(())
}
