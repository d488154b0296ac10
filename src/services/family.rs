//! Family use cases.
//!
//! Every mutating operation runs inside one [`WriteTx`] that holds the write
//! lock from its first statement and is committed on success or rolled back
//! on any error, so a rejected batch (invite, forced removal) leaves no
//! partial writes behind and concurrent writers are serialised. The caller id
//! is always passed in explicitly.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;

use crate::constants::*;
use crate::db::{families, memberships, moments, users, WriteTx};
use crate::error::{is_unique_violation, AppError, Result};
use crate::models::{
    CreateFamilyRequest, Family, FamilyAuthorityRequest, FamilyCreated, FamilyCreatedNickname,
    FamilyMember, FamilyView, MemberStatus, Membership, MyFamily, NewFamily, UpdateFamilyRequest,
    User,
};

#[derive(Debug, Clone)]
pub struct FamilyService {
    pool: SqlitePool,
}

impl FamilyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a family owned by `owner_id` with a freshly drawn invite code.
    /// The owner becomes its first active member.
    pub async fn create_family(
        &self,
        owner_id: i64,
        request: CreateFamilyRequest,
        represent_img: String,
    ) -> Result<FamilyCreated> {
        let family_name = Family::validate_name(&request.family_name)?;
        let upload_cycle = Family::validate_upload_cycle(request.upload_cycle)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result =
            create_family_tx(tx.conn()?, owner_id, family_name, upload_cycle, represent_img).await;
        tx.finish(result).await
    }

    pub async fn get_family(&self, family_id: i64) -> Result<FamilyView> {
        let mut conn = self.pool.acquire().await?;
        Ok(require_family(&mut conn, family_id).await?.view())
    }

    pub async fn get_family_by_invite_code(&self, invite_code: &str) -> Result<FamilyView> {
        let invite_code = invite_code.trim();
        if invite_code.is_empty() {
            return Err(AppError::invalid_input("Invite code must not be blank"));
        }

        let mut conn = self.pool.acquire().await?;
        families::find_by_invite_code(&mut conn, invite_code)
            .await?
            .map(|family| family.view())
            .ok_or_else(|| AppError::not_found(ERR_FAMILY_NOT_FOUND))
    }

    /// Caller nickname and family creation date for the main screen
    pub async fn get_family_created_nickname(
        &self,
        caller: i64,
        family_id: i64,
    ) -> Result<FamilyCreatedNickname> {
        let mut conn = self.pool.acquire().await?;
        let user = require_user(&mut conn, caller).await?;
        let family = require_family(&mut conn, family_id).await?;
        require_active_member(&mut conn, caller, family_id).await?;

        Ok(FamilyCreatedNickname::new(user.nickname, family.created_at))
    }

    pub async fn update_family(
        &self,
        caller: i64,
        family_id: i64,
        request: UpdateFamilyRequest,
        represent_img: Option<String>,
    ) -> Result<FamilyView> {
        let family_name = Family::validate_name(&request.family_name)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result =
            update_family_tx(tx.conn()?, caller, family_id, family_name, represent_img).await;
        tx.finish(result).await
    }

    pub async fn update_upload_cycle(
        &self,
        caller: i64,
        family_id: i64,
        upload_cycle: i32,
    ) -> Result<()> {
        let upload_cycle = Family::validate_upload_cycle(upload_cycle)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = update_upload_cycle_tx(tx.conn()?, caller, family_id, upload_cycle).await;
        tx.finish(result).await
    }

    /// Delete a family together with its memberships, posts and comments
    pub async fn delete_family(&self, caller: i64, family_id: i64) -> Result<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = delete_family_tx(tx.conn()?, caller, family_id).await;
        tx.finish(result).await
    }

    // =========================================================================
    // Membership workflow
    // =========================================================================

    /// Invite users into a family.
    ///
    /// Every candidate is checked before anything is written; the first
    /// unknown user or existing member/invitee rejects the whole batch.
    /// Previously removed users are re-invited by restating their row.
    pub async fn invite_user(&self, caller: i64, user_ids: &[i64], family_id: i64) -> Result<()> {
        let user_ids = validate_batch(user_ids)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = invite_user_tx(tx.conn()?, caller, &user_ids, family_id).await;
        tx.finish(result).await
    }

    /// Accept a pending invitation. Accepting again once active is a no-op.
    pub async fn accept_family(&self, caller: i64, family_id: i64) -> Result<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = accept_family_tx(tx.conn()?, caller, family_id).await;
        tx.finish(result).await
    }

    pub async fn reject_family(&self, caller: i64, family_id: i64) -> Result<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = reject_family_tx(tx.conn()?, caller, family_id).await;
        tx.finish(result).await
    }

    /// Join directly, e.g. after resolving an invite code. A pending
    /// invitation for the same family is consumed.
    pub async fn join_family(&self, caller: i64, family_id: i64) -> Result<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = join_family_tx(tx.conn()?, caller, family_id).await;
        tx.finish(result).await
    }

    /// Leave a family. The owner has to hand over authority first.
    pub async fn withdraw_family(&self, caller: i64, family_id: i64) -> Result<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = withdraw_family_tx(tx.conn()?, caller, family_id).await;
        tx.finish(result).await
    }

    /// Remove members on the owner's behalf; all targets or none.
    pub async fn emission_family(
        &self,
        caller: i64,
        family_id: i64,
        user_ids: &[i64],
    ) -> Result<()> {
        let user_ids = validate_batch(user_ids)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = emission_family_tx(tx.conn()?, caller, family_id, &user_ids).await;
        tx.finish(result).await
    }

    // =========================================================================
    // Authority
    // =========================================================================

    /// Hand ownership to another active member
    pub async fn change_family_authority(
        &self,
        caller: i64,
        family_id: i64,
        request: FamilyAuthorityRequest,
    ) -> Result<()> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result =
            change_family_authority_tx(tx.conn()?, caller, family_id, request.user_id).await;
        tx.finish(result).await
    }

    pub async fn get_family_authority(&self, caller: i64, family_id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(require_family(&mut conn, family_id).await?.is_owned_by(caller))
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub async fn get_my_families(&self, caller: i64) -> Result<Vec<MyFamily>> {
        let mut conn = self.pool.acquire().await?;
        require_user(&mut conn, caller).await?;
        Ok(memberships::list_families_for_user(&mut conn, caller).await?)
    }

    pub async fn get_family_name(&self, caller: i64, family_id: i64) -> Result<String> {
        let mut conn = self.pool.acquire().await?;
        let family = require_family(&mut conn, family_id).await?;
        require_active_member(&mut conn, caller, family_id).await?;
        Ok(family.family_name)
    }

    /// Active members of a family, optionally without the caller
    pub async fn get_family_all_members(
        &self,
        family_id: i64,
        include_self: bool,
        caller: i64,
    ) -> Result<Vec<FamilyMember>> {
        let mut conn = self.pool.acquire().await?;
        require_family(&mut conn, family_id).await?;
        require_active_member(&mut conn, caller, family_id).await?;

        let members = memberships::list_active_members(&mut conn, family_id).await?;
        Ok(members
            .into_iter()
            .filter(|member| include_self || member.user_id != caller)
            .collect())
    }
}

// =============================================================================
// Transaction bodies
// =============================================================================

async fn create_family_tx(
    conn: &mut SqliteConnection,
    owner_id: i64,
    family_name: String,
    upload_cycle: i32,
    represent_img: String,
) -> Result<FamilyCreated> {
    let owner = require_user(conn, owner_id).await?;
    let new_family = NewFamily {
        owner_id: owner.id,
        family_name,
        upload_cycle,
        represent_img,
        created_at: Utc::now(),
    };

    let (family_id, invite_code) = insert_with_unique_code(conn, &new_family).await?;
    memberships::insert(
        conn,
        owner.id,
        family_id,
        MemberStatus::Active,
        new_family.created_at,
    )
    .await?;

    tracing::info!("Family {} created by user {}", family_id, owner.id);

    Ok(FamilyCreated {
        family_id,
        nickname: owner.nickname,
        invite_code,
        profile_img: owner.profile_img,
        represent_img: new_family.represent_img,
        created_at: new_family.created_at,
    })
}

async fn update_family_tx(
    conn: &mut SqliteConnection,
    caller: i64,
    family_id: i64,
    family_name: String,
    represent_img: Option<String>,
) -> Result<FamilyView> {
    let family = require_family(conn, family_id).await?;
    require_owner(&family, caller)?;

    let represent_img = represent_img.unwrap_or(family.represent_img);
    families::update_details(conn, family_id, &family_name, &represent_img, Utc::now()).await?;

    tracing::info!("Family {} updated by owner {}", family_id, caller);

    Ok(require_family(conn, family_id).await?.view())
}

async fn update_upload_cycle_tx(
    conn: &mut SqliteConnection,
    caller: i64,
    family_id: i64,
    upload_cycle: i32,
) -> Result<()> {
    let family = require_family(conn, family_id).await?;
    require_owner(&family, caller)?;

    families::update_upload_cycle(conn, family_id, upload_cycle, Utc::now()).await?;

    tracing::info!(
        "Family {} upload cycle changed {} -> {}",
        family_id,
        family.upload_cycle,
        upload_cycle
    );
    Ok(())
}

async fn delete_family_tx(conn: &mut SqliteConnection, caller: i64, family_id: i64) -> Result<()> {
    let family = require_family(conn, family_id).await?;
    require_owner(&family, caller)?;

    let (comments, posts) = moments::delete_for_family(conn, family_id).await?;
    let members = memberships::delete_for_family(conn, family_id).await?;
    families::delete(conn, family_id).await?;

    tracing::info!(
        "Family {} deleted by owner {}: {} memberships, {} posts, {} comments removed",
        family_id,
        caller,
        members,
        posts,
        comments
    );
    Ok(())
}

async fn invite_user_tx(
    conn: &mut SqliteConnection,
    caller: i64,
    user_ids: &[i64],
    family_id: i64,
) -> Result<()> {
    require_family(conn, family_id).await?;
    require_active_member(conn, caller, family_id).await?;

    let mut invitees = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        require_user(conn, user_id).await?;
        let existing = memberships::find(conn, user_id, family_id).await?;
        match existing.as_ref().map(|m| m.status) {
            Some(MemberStatus::Active) => {
                tracing::warn!("User {} already belongs to family {}", user_id, family_id);
                return Err(AppError::access_denied(ERR_ALREADY_MEMBER));
            }
            Some(MemberStatus::Pending) => {
                tracing::warn!("User {} already invited to family {}", user_id, family_id);
                return Err(AppError::access_denied(ERR_ALREADY_INVITED));
            }
            Some(MemberStatus::Removed) | None => invitees.push((user_id, existing)),
        }
    }

    let now = Utc::now();
    for (user_id, existing) in invitees {
        match existing {
            Some(removed) => {
                memberships::save(conn, &removed.with_status(MemberStatus::Pending, now)).await?;
            }
            None => {
                memberships::insert(conn, user_id, family_id, MemberStatus::Pending, now)
                    .await
                    .map_err(|e| conflict_as(e, ERR_ALREADY_INVITED))?;
            }
        }
    }

    tracing::info!(
        "User {} invited {} user(s) to family {}",
        caller,
        user_ids.len(),
        family_id
    );
    Ok(())
}

async fn accept_family_tx(conn: &mut SqliteConnection, caller: i64, family_id: i64) -> Result<()> {
    require_user(conn, caller).await?;
    require_family(conn, family_id).await?;

    let membership = memberships::find(conn, caller, family_id)
        .await?
        .ok_or_else(|| AppError::not_found(ERR_INVITATION_NOT_FOUND))?;

    match membership.status {
        MemberStatus::Active => {
            tracing::info!("User {} already active in family {}", caller, family_id);
            Ok(())
        }
        MemberStatus::Removed => Err(AppError::not_found(ERR_INVITATION_NOT_FOUND)),
        MemberStatus::Pending => {
            let accepted = membership.with_status(MemberStatus::Active, Utc::now());
            memberships::save(conn, &accepted).await?;
            tracing::info!("User {} accepted invitation to family {}", caller, family_id);
            Ok(())
        }
    }
}

async fn reject_family_tx(conn: &mut SqliteConnection, caller: i64, family_id: i64) -> Result<()> {
    require_user(conn, caller).await?;
    require_family(conn, family_id).await?;

    let membership = memberships::find(conn, caller, family_id)
        .await?
        .filter(Membership::is_pending)
        .ok_or_else(|| AppError::not_found(ERR_INVITATION_NOT_FOUND))?;

    memberships::save(conn, &membership.with_status(MemberStatus::Removed, Utc::now())).await?;

    tracing::info!("User {} rejected invitation to family {}", caller, family_id);
    Ok(())
}

async fn join_family_tx(conn: &mut SqliteConnection, caller: i64, family_id: i64) -> Result<()> {
    require_user(conn, caller).await?;
    require_family(conn, family_id).await?;

    match memberships::find(conn, caller, family_id).await? {
        Some(membership) if membership.is_active() => {
            return Err(AppError::access_denied(ERR_ALREADY_MEMBER));
        }
        Some(membership) => {
            memberships::save(conn, &membership.with_status(MemberStatus::Active, Utc::now()))
                .await?;
        }
        None => {
            memberships::insert(conn, caller, family_id, MemberStatus::Active, Utc::now())
                .await
                .map_err(|e| conflict_as(e, ERR_ALREADY_MEMBER))?;
        }
    }

    tracing::info!("User {} joined family {}", caller, family_id);
    Ok(())
}

async fn withdraw_family_tx(
    conn: &mut SqliteConnection,
    caller: i64,
    family_id: i64,
) -> Result<()> {
    let family = require_family(conn, family_id).await?;
    if family.is_owned_by(caller) {
        return Err(AppError::access_denied(ERR_OWNER_CANNOT_LEAVE));
    }

    let membership = memberships::find(conn, caller, family_id)
        .await?
        .filter(Membership::is_active)
        .ok_or_else(|| AppError::not_found(ERR_NOT_A_MEMBER))?;

    memberships::save(conn, &membership.with_status(MemberStatus::Removed, Utc::now())).await?;

    tracing::info!("User {} left family {}", caller, family_id);
    Ok(())
}

async fn emission_family_tx(
    conn: &mut SqliteConnection,
    caller: i64,
    family_id: i64,
    user_ids: &[i64],
) -> Result<()> {
    let family = require_family(conn, family_id).await?;
    require_owner(&family, caller)?;

    let mut targets = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        if family.is_owned_by(user_id) {
            return Err(AppError::access_denied(ERR_CANNOT_REMOVE_OWNER));
        }
        let membership = memberships::find(conn, user_id, family_id)
            .await?
            .filter(Membership::is_active)
            .ok_or_else(|| {
                AppError::not_found(format!("User {} is not a member of this family", user_id))
            })?;
        targets.push(membership);
    }

    let now = Utc::now();
    for membership in &targets {
        memberships::save(conn, &membership.with_status(MemberStatus::Removed, now)).await?;
    }

    tracing::info!(
        "Owner {} removed {} member(s) from family {}",
        caller,
        targets.len(),
        family_id
    );
    Ok(())
}

async fn change_family_authority_tx(
    conn: &mut SqliteConnection,
    caller: i64,
    family_id: i64,
    new_owner: i64,
) -> Result<()> {
    let family = require_family(conn, family_id).await?;
    require_owner(&family, caller)?;
    if new_owner == caller {
        return Err(AppError::invalid_input("Already the owner of this family"));
    }
    require_user(conn, new_owner).await?;

    memberships::find(conn, new_owner, family_id)
        .await?
        .filter(Membership::is_active)
        .ok_or_else(|| {
            AppError::not_found("The new owner must be an active member of this family")
        })?;

    families::update_owner(conn, family_id, new_owner, Utc::now()).await?;

    tracing::info!(
        "Family {} ownership moved from {} to {}",
        family_id,
        caller,
        new_owner
    );
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

async fn require_user(conn: &mut SqliteConnection, user_id: i64) -> Result<User> {
    users::find_by_id(conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(ERR_USER_NOT_FOUND))
}

async fn require_family(conn: &mut SqliteConnection, family_id: i64) -> Result<Family> {
    families::find_by_id(conn, family_id)
        .await?
        .ok_or_else(|| AppError::not_found(ERR_FAMILY_NOT_FOUND))
}

async fn require_active_member(
    conn: &mut SqliteConnection,
    user_id: i64,
    family_id: i64,
) -> Result<Membership> {
    memberships::find(conn, user_id, family_id)
        .await?
        .filter(Membership::is_active)
        .ok_or_else(|| {
            tracing::warn!("User {} is not an active member of family {}", user_id, family_id);
            AppError::access_denied(ERR_NOT_A_MEMBER)
        })
}

fn require_owner(family: &Family, caller: i64) -> Result<()> {
    if family.is_owned_by(caller) {
        Ok(())
    } else {
        tracing::warn!("User {} is not the owner of family {}", caller, family.id);
        Err(AppError::access_denied(ERR_OWNER_ONLY))
    }
}

/// Non-empty, bounded, duplicates collapsed in first-seen order
fn validate_batch(user_ids: &[i64]) -> Result<Vec<i64>> {
    if user_ids.is_empty() {
        return Err(AppError::invalid_input("At least one user id is required"));
    }

    let mut seen = HashSet::new();
    let unique: Vec<i64> = user_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    if unique.len() > MAX_BATCH_USERS {
        return Err(AppError::invalid_input(format!(
            "At most {} users can be handled at once",
            MAX_BATCH_USERS
        )));
    }
    Ok(unique)
}

/// A concurrent writer won the race for the same (user, family) row
fn conflict_as(err: sqlx::Error, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::access_denied(message)
    } else {
        err.into()
    }
}

fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LENGTH)
        .map(char::from)
        .collect()
}

async fn insert_with_unique_code(
    conn: &mut SqliteConnection,
    family: &NewFamily,
) -> Result<(i64, String)> {
    for _ in 0..INVITE_CODE_ATTEMPTS {
        let invite_code = generate_invite_code();
        match families::insert(conn, family, &invite_code).await {
            Ok(family_id) => return Ok((family_id, invite_code)),
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!("Invite code collision, drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(AppError::Internal(format!(
        "no unused invite code after {} attempts",
        INVITE_CODE_ATTEMPTS
    )))
}
