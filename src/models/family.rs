use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CREATED_AT_FORMAT, MAX_FAMILY_NAME_CHARS, MAX_UPLOAD_CYCLE, MIN_UPLOAD_CYCLE,
};
use crate::error::{AppError, Result};

/// Family row joined with its owner's nickname
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Family {
    pub id: i64,
    pub owner_id: i64,
    pub owner_nickname: String,
    pub family_name: String,
    /// Notification cadence in days
    pub upload_cycle: i32,
    pub invite_code: String,
    /// Representative image URL
    pub represent_img: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Family {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }

    pub fn view(&self) -> FamilyView {
        FamilyView {
            family_id: self.id,
            owner: self.owner_nickname.clone(),
            family_name: self.family_name.clone(),
            upload_cycle: self.upload_cycle,
            invite_code: self.invite_code.clone(),
            represent_img: self.represent_img.clone(),
        }
    }

    /// Validate and normalise a family name
    pub fn validate_name(name: &str) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("Family name must not be blank"));
        }
        if trimmed.chars().count() > MAX_FAMILY_NAME_CHARS {
            return Err(AppError::invalid_input(format!(
                "Family name must be at most {} characters",
                MAX_FAMILY_NAME_CHARS
            )));
        }
        Ok(trimmed.to_string())
    }

    pub fn validate_upload_cycle(upload_cycle: i32) -> Result<i32> {
        if !(MIN_UPLOAD_CYCLE..=MAX_UPLOAD_CYCLE).contains(&upload_cycle) {
            return Err(AppError::invalid_input(format!(
                "Upload cycle must be between {} and {} days",
                MIN_UPLOAD_CYCLE, MAX_UPLOAD_CYCLE
            )));
        }
        Ok(upload_cycle)
    }
}

/// Values written when a family is created
#[derive(Debug, Clone)]
pub struct NewFamily {
    pub owner_id: i64,
    pub family_name: String,
    pub upload_cycle: i32,
    pub represent_img: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyRequest {
    pub family_name: String,
    pub upload_cycle: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFamilyRequest {
    pub family_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyAuthorityRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeRequest {
    pub invite_code: String,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyCreated {
    pub family_id: i64,
    /// Owner nickname
    pub nickname: String,
    pub invite_code: String,
    /// Owner profile image
    pub profile_img: Option<String>,
    pub represent_img: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyView {
    pub family_id: i64,
    /// Owner nickname
    pub owner: String,
    pub family_name: String,
    pub upload_cycle: i32,
    pub invite_code: String,
    pub represent_img: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyCreatedNickname {
    pub nickname: String,
    pub created_at: String,
}

impl FamilyCreatedNickname {
    pub fn new(nickname: String, created_at: DateTime<Utc>) -> Self {
        Self {
            nickname,
            created_at: created_at.format(CREATED_AT_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MyFamily {
    pub family_id: i64,
    pub family_name: String,
}
