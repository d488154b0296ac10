use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    Json,
};
use axum_extra::extract::{Query as MultiQuery, QueryRejection as MultiQueryRejection};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::auth::Caller;
use crate::constants::*;
use crate::error::{AppError, Result};
use crate::models::{
    CreateFamilyRequest, FamilyAuthorityRequest, FamilyCreated, FamilyCreatedNickname,
    FamilyMember, FamilyView, InviteCodeRequest, MyFamily, UpdateFamilyRequest,
};
use crate::response::ApiResponse;
use crate::routes::validation::parse_user_ids;
use crate::AppState;

/// Multipart part carrying the representative image
const REPRESENT_IMG_PART: &str = "representImg";
/// Multipart part carrying the JSON body of a create request
const CREATE_FAMILY_PART: &str = "postFamilyReq";
/// Multipart part carrying the JSON body of an update request
const UPDATE_FAMILY_PART: &str = "familyUpdateReq";

type Envelope<T> = Json<ApiResponse<T>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersQuery {
    #[serde(default = "default_include_self")]
    pub include_self: bool,
}

fn default_include_self() -> bool {
    true
}

/// `userIds` may be repeated (`?userIds=1&userIds=2`) or hold a list (`?userIds=1,2`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdsQuery {
    #[serde(default)]
    pub user_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCycleQuery {
    pub upload_cycle: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityResponse {
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct MyFamiliesResponse {
    pub count: usize,
    pub list: Vec<MyFamily>,
}

struct Upload {
    bytes: Bytes,
    content_type: Option<String>,
}

/// Split a multipart family form into its JSON request part and optional image
async fn read_family_form<T: DeserializeOwned>(
    mut multipart: Multipart,
    request_part: &str,
) -> Result<(T, Option<Upload>)> {
    let mut request = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == REPRESENT_IMG_PART {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            image = Some(Upload {
                bytes,
                content_type,
            });
        } else if name == request_part {
            let bytes = field.bytes().await?;
            let parsed = serde_json::from_slice::<T>(&bytes).map_err(|e| {
                AppError::invalid_input(format!("Invalid {} part: {}", request_part, e))
            })?;
            request = Some(parsed);
        }
    }

    let request = request
        .ok_or_else(|| AppError::invalid_input(format!("Missing {} part", request_part)))?;
    Ok((request, image))
}

/// Create a family
///
/// POST /families/family (multipart: `representImg` + `postFamilyReq`)
pub async fn create_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    multipart: Multipart,
) -> Result<Envelope<FamilyCreated>> {
    let (request, image) =
        read_family_form::<CreateFamilyRequest>(multipart, CREATE_FAMILY_PART).await?;
    let image = image.ok_or_else(|| {
        AppError::invalid_input(format!("Missing {} part", REPRESENT_IMG_PART))
    })?;

    let represent_img = state
        .images
        .store(&image.bytes, image.content_type.as_deref())
        .await?;
    let created = state
        .families
        .create_family(caller, request, represent_img)
        .await?;

    Ok(ApiResponse::ok(created))
}

/// GET /families/:family_id
pub async fn get_family(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<FamilyView>> {
    let Path(family_id) = path?;
    Ok(ApiResponse::ok(state.families.get_family(family_id).await?))
}

/// Caller nickname and family creation date
///
/// GET /families/:family_id/created
pub async fn get_family_created_nickname(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<FamilyCreatedNickname>> {
    let Path(family_id) = path?;
    let res = state
        .families
        .get_family_created_nickname(caller, family_id)
        .await?;
    Ok(ApiResponse::ok(res))
}

/// GET /families/:family_id/users?includeSelf=bool
pub async fn get_family_all_members(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<Query<MembersQuery>, QueryRejection>,
) -> Result<Envelope<Vec<FamilyMember>>> {
    let Path(family_id) = path?;
    let Query(query) = query?;
    let members = state
        .families
        .get_family_all_members(family_id, query.include_self, caller)
        .await?;
    Ok(ApiResponse::ok(members))
}

/// POST /families/inviteCode
pub async fn get_family_by_invite_code(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InviteCodeRequest>, JsonRejection>,
) -> Result<Envelope<FamilyView>> {
    let Json(payload) = payload?;
    let family = state
        .families
        .get_family_by_invite_code(&payload.invite_code)
        .await?;
    Ok(ApiResponse::ok(family))
}

/// POST /families/:family_id/join
pub async fn join_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    state.families.join_family(caller, family_id).await?;
    Ok(ApiResponse::ok(MSG_JOINED))
}

/// POST /families/:family_id/invitations?userIds=1,2
pub async fn invite_user(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<MultiQuery<UserIdsQuery>, MultiQueryRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    let MultiQuery(query) = query?;
    let user_ids = parse_user_ids(query.user_ids.as_slice())?;

    state
        .families
        .invite_user(caller, &user_ids, family_id)
        .await?;
    Ok(ApiResponse::ok(MSG_INVITED))
}

/// PATCH /families/:family_id/invitations/accept
pub async fn accept_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    state.families.accept_family(caller, family_id).await?;
    Ok(ApiResponse::ok(MSG_ACCEPTED))
}

/// PATCH /families/:family_id/invitations/reject
pub async fn reject_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    state.families.reject_family(caller, family_id).await?;
    Ok(ApiResponse::ok(MSG_REJECTED))
}

/// PATCH /families/:family_id?uploadCycle=int
pub async fn update_upload_cycle(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<Query<UploadCycleQuery>, QueryRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    let Query(query) = query?;
    state
        .families
        .update_upload_cycle(caller, family_id, query.upload_cycle)
        .await?;
    Ok(ApiResponse::ok(MSG_UPLOAD_CYCLE_UPDATED))
}

/// Delete a family with its memberships, posts and comments
///
/// DELETE /families/:family_id
pub async fn delete_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    state.families.delete_family(caller, family_id).await?;
    Ok(ApiResponse::ok(MSG_FAMILY_DELETED))
}

/// Update name and, when a new image is attached, the representative image
///
/// PATCH /families/:family_id/update (multipart: `familyUpdateReq` + optional `representImg`)
pub async fn update_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
    multipart: Multipart,
) -> Result<Envelope<FamilyView>> {
    let Path(family_id) = path?;
    let (request, image) =
        read_family_form::<UpdateFamilyRequest>(multipart, UPDATE_FAMILY_PART).await?;

    let represent_img = match image {
        Some(upload) => Some(
            state
                .images
                .store(&upload.bytes, upload.content_type.as_deref())
                .await?,
        ),
        None => None,
    };

    let family = state
        .families
        .update_family(caller, family_id, request, represent_img)
        .await?;
    Ok(ApiResponse::ok(family))
}

/// DELETE /families/:family_id/withdraw
pub async fn withdraw_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    state.families.withdraw_family(caller, family_id).await?;
    Ok(ApiResponse::ok(MSG_WITHDRAWN))
}

/// Forced removal
///
/// DELETE /families/:family_id/users?userIds=1,2
pub async fn emission_family(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<MultiQuery<UserIdsQuery>, MultiQueryRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    let MultiQuery(query) = query?;
    let user_ids = parse_user_ids(query.user_ids.as_slice())?;

    state
        .families
        .emission_family(caller, family_id, &user_ids)
        .await?;
    Ok(ApiResponse::ok(MSG_MEMBERS_REMOVED))
}

/// PATCH /families/:family_id/authority
pub async fn change_family_authority(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<FamilyAuthorityRequest>, JsonRejection>,
) -> Result<Envelope<&'static str>> {
    let Path(family_id) = path?;
    let Json(payload) = payload?;
    state
        .families
        .change_family_authority(caller, family_id, payload)
        .await?;
    Ok(ApiResponse::ok(MSG_AUTHORITY_CHANGED))
}

/// GET /families/:family_id/authority
pub async fn get_family_authority(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<AuthorityResponse>> {
    let Path(family_id) = path?;
    let is_owner = state
        .families
        .get_family_authority(caller, family_id)
        .await?;
    Ok(ApiResponse::ok(AuthorityResponse { is_owner }))
}

/// GET /families/myfamilies
pub async fn get_my_families(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Envelope<MyFamiliesResponse>> {
    let list = state.families.get_my_families(caller).await?;
    Ok(ApiResponse::ok(MyFamiliesResponse {
        count: list.len(),
        list,
    }))
}

/// GET /families/:family_id/famillyName
pub async fn get_family_name(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Envelope<String>> {
    let Path(family_id) = path?;
    let name = state.families.get_family_name(caller, family_id).await?;
    Ok(ApiResponse::ok(name))
}
