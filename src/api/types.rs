use serde::{Deserialize, Serialize};

use crate::models::link::{LinkView, TagView};
use crate::models::pagination::Pagination;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub name: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteSignupRequest {
    pub name: String,
    pub password: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub name: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub links: Vec<LinkView>,
    pub pages: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<TagView>,
}

#[derive(Debug, Serialize)]
pub struct InviteView {
    pub token: String,
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimant: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub page: Option<u64>,
}
