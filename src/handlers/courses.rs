// handlers/courses.rs - /api/v1/courses and /api/v1/bootcamps/:bootcampId/courses

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Json,
};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::bootcamps::courses_of;
use super::json_body;
use crate::auth::policy::{ensure_owner, ensure_role, OWNER_FIELD};
use crate::auth::Principal;
use crate::database::models::{BOOTCAMPS, COURSES};
use crate::database::schema::{Document, FieldKind, ID_FIELD};
use crate::error::ApiError;
use crate::filter::{AdvancedQuery, Condition, Filter, FindQuery, SortKey};
use crate::middleware::{AdvancedResults, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::PUBLISHING_ROLES;

const BOOTCAMP_FIELD: &str = "bootcamp";

/// GET /api/v1/courses - Advanced results with the parent bootcamp populated
pub async fn list(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Vec<Document>> {
    let query = AdvancedQuery::parse(raw.as_deref(), &COURSES, &state.config.query)?;
    let mut results = AdvancedResults::fetch(&state.repository(&COURSES), &query).await?;
    populate_bootcamps(&state, &mut results.data).await?;
    Ok(results.into_response())
}

/// GET /api/v1/bootcamps/:bootcampId/courses - Every course of one bootcamp, unpaged
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> ApiResult<Vec<Document>> {
    let query = FindQuery {
        sort: vec![SortKey::asc("createdAt")],
        ..FindQuery::filtered(courses_of(&bootcamp_id))
    };
    let courses = state.repository(&COURSES).select_any(&query).await?;
    Ok(ApiResponse::list(courses))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let course = state.repository(&COURSES).select_404(&id).await?;
    let mut courses = [course];
    populate_bootcamps(&state, &mut courses).await?;
    let [course] = courses;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:bootcampId/courses
///
/// The course inherits the bootcamp's owner, so only that owner or an admin
/// may add to it.
pub async fn create(
    State(state): State<AppState>,
    principal: Principal,
    Path(bootcamp_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let body = json_body(payload)?;

    let bootcamp = state.repository(&BOOTCAMPS).select_404(&bootcamp_id).await?;
    ensure_owner(
        &principal,
        &bootcamp,
        &format!("add a course to bootcamp {}", bootcamp_id),
    )?;

    let owner = bootcamp
        .get(OWNER_FIELD)
        .cloned()
        .unwrap_or_else(|| Value::String(principal.id.clone()));
    let mut derived = Map::new();
    derived.insert(BOOTCAMP_FIELD.to_string(), Value::String(bootcamp_id.clone()));
    derived.insert(OWNER_FIELD.to_string(), owner);

    let course = state.repository(&COURSES).create(&body, derived).await?;
    info!(course = ?course.get(ID_FIELD), bootcamp = %bootcamp_id, "Created course");
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let body = json_body(payload)?;
    let courses = state.repository(&COURSES);

    let existing = courses.select_404(&id).await?;
    ensure_owner(&principal, &existing, &format!("update the course {}", id))?;

    let course = courses.update_404(&id, &body).await?;
    Ok(ApiResponse::created(course))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    ensure_role(&principal, PUBLISHING_ROLES)?;
    let courses = state.repository(&COURSES);

    let existing = courses.select_404(&id).await?;
    ensure_owner(&principal, &existing, &format!("delete the course {}", id))?;

    if !courses.delete(&id).await? {
        return Err(courses.not_found(&id).into());
    }
    info!(course = %id, "Deleted course");
    Ok(ApiResponse::success(json!({})))
}

/// Replace each course's `bootcamp` id with `{id, name, description}`.
///
/// Ids of bootcamps that no longer exist are left as they are.
async fn populate_bootcamps(state: &AppState, courses: &mut [Document]) -> Result<(), ApiError> {
    let ids = bootcamp_ids(courses);
    if ids.is_empty() {
        return Ok(());
    }

    let query = FindQuery {
        projection: Some(vec!["name".into(), "description".into()]),
        ..FindQuery::filtered(Filter::new().with(Condition::one_of(ID_FIELD, FieldKind::Reference, ids)))
    };
    let bootcamps: HashMap<String, Document> = state
        .repository(&BOOTCAMPS)
        .select_any(&query)
        .await?
        .into_iter()
        .filter_map(|b| {
            let id = b.get(ID_FIELD)?.as_str()?.to_string();
            Some((id, b))
        })
        .collect();

    for course in courses.iter_mut() {
        let parent = course
            .get(BOOTCAMP_FIELD)
            .and_then(Value::as_str)
            .and_then(|id| bootcamps.get(id))
            .cloned();
        if let Some(parent) = parent {
            course.insert(BOOTCAMP_FIELD.to_string(), Value::Object(parent));
        }
    }
    Ok(())
}

/// Distinct parent ids in first-seen order.
fn bootcamp_ids(courses: &[Document]) -> Vec<Value> {
    let mut seen = HashSet::new();
    courses
        .iter()
        .filter_map(|c| c.get(BOOTCAMP_FIELD).and_then(Value::as_str))
        .filter(|id| seen.insert(*id))
        .map(|id| Value::String(id.to_string()))
        .collect()
}
