use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound for `per_page` on paginated listings
pub const PER_PAGE_MAX: i64 = 50;

/// Random bytes behind a wishlist invite code (hex encoded, so twice as many chars)
pub const WISHLIST_CODE_LENGTH: usize = 5;

/// Message sent on every unexpected failure
pub const INTERNAL_SERVER_ERROR_TEXT: &str = "Something went wrong.";

/// Default message for successful responses
pub const SUCCESS_MESSAGE: &str = "success";

/// Message for successful mutations that carry no payload
pub const ACTION_PERFORMED: &str = "Action performed successfully.";

// ==================== Entities ====================

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named collection of items owned by a user.
/// `code` is the invite code other users can join with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A wishlist entry. `user_id` is the user who claimed it, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub wishlist_id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership granting a user access to a wishlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistUser {
    pub id: String,
    pub wishlist_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Friend edge between two users. `user_id` sent the request, `friend_id` received it.
/// Lookups treat the pair as unordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFriend {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub request_accepted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserFriend {
    /// The other side of the edge as seen from `user_id`
    pub fn other_side(&self, user_id: &str) -> &str {
        if self.user_id == user_id {
            &self.friend_id
        } else {
            &self.user_id
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AddFriend,
    AddToWishlist,
    RemoveFriend,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::AddFriend => "add_friend",
            NotificationType::AddToWishlist => "add_to_wishlist",
            NotificationType::RemoveFriend => "remove_friend",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add_friend" => Ok(NotificationType::AddFriend),
            "add_to_wishlist" => Ok(NotificationType::AddToWishlist),
            "remove_friend" => Ok(NotificationType::RemoveFriend),
            other => Err(format!("unknown notification type: {}", other)),
        }
    }
}

/// An event triggered by `by_user_id` and delivered to `user_id`.
/// `object_id` points at the wishlist for `add_to_wishlist`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub user_id: String,
    pub by_user_id: String,
    pub object_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==================== API views ====================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserDetail {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_accepted: Option<bool>,
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            request_accepted: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistData {
    pub id: String,
    pub name: String,
    pub code: String,
    pub user: Option<UserDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<UserDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemData {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub wishlist: Option<WishlistData>,
    /// The claimer
    pub user: Option<UserDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationData {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub by_user: Option<UserDetail>,
    pub user: Option<UserDetail>,
    pub wishlist: Option<WishlistData>,
}

#[derive(Debug, Serialize)]
pub struct CodeData {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDetail,
}

// ==================== Request forms ====================
//
// Fields are optional strings so presence checks produce the
// business-rule messages instead of a framework rejection.

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgetPasswordForm {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FriendForm {
    pub user_id: Option<String>,
    pub accept_request: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateWishlistForm {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddWishlistUserForm {
    pub user_id: Option<String>,
    pub wishlist_id: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveWishlistUserForm {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WishlistQuery {
    pub wishlist_id: Option<String>,
    pub get_members: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateItemForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub item_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectItemForm {
    pub is_select: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// Returns `(limit, offset)`, or `None` when no page was requested
    /// and the full list should be returned.
    pub fn window(&self) -> Option<(i64, i64)> {
        let per_page = match self.per_page {
            Some(n) if n > 0 => n,
            _ => PER_PAGE_MAX,
        };
        match self.page {
            None | Some(0) => None,
            Some(page) => {
                let page = page.max(1);
                // huge pages clamp to the last representable offset and read nothing
                Some((per_page, (page - 1).saturating_mul(per_page)))
            }
        }
    }

    pub fn exceeds_limit(&self) -> bool {
        matches!(self.per_page, Some(n) if n > PER_PAGE_MAX)
    }
}

/// Trimmed, non-empty value of an optional form field
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Form flag semantics: set, non-empty, and not `0`/`false`
pub fn is_truthy(value: &Option<String>) -> bool {
    match present(value) {
        Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
        None => false,
    }
}

// ==================== Response envelope ====================

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Uniform body for every endpoint: `{data, code, message, status}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub code: u16,
    pub message: String,
    pub status: ResponseStatus,
}

impl<T> ApiResponse<T> {
    pub fn success(code: u16, message: impl Into<String>, data: Option<T>) -> Self {
        let message = message.into();
        Self {
            data,
            code,
            message: if message.is_empty() {
                SUCCESS_MESSAGE.to_string()
            } else {
                message
            },
            status: ResponseStatus::Success,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            data: None,
            code,
            message: message.into(),
            status: ResponseStatus::Error,
        }
    }
}
