//! Application services: business rules over the store.
//!
//! Rule violations come back as `ServiceError::Rule` carrying the message
//! shown to the client; everything else is an unexpected failure.

mod item;
mod notification;
mod user;
mod wishlist;

pub use item::{ItemSelection, ItemService};
pub use notification::NotificationService;
pub use user::UserService;
pub use wishlist::{WishlistSelection, WishlistService};

use thiserror::Error;

use crate::mail::MailError;
use crate::models::{UserDetail, Wishlist, WishlistData};
use crate::store::{OptionalRecord, Store, StoreError, StoreResult};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business-rule violation, reported to the client as-is
    #[error("{0}")]
    Rule(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn rule<T>(message: impl Into<String>) -> ServiceResult<T> {
    Err(ServiceError::Rule(message.into()))
}

pub(crate) fn user_detail(store: &Store, user_id: &str) -> StoreResult<Option<UserDetail>> {
    Ok(store.get_user(user_id).optional()?.map(|u| UserDetail::from(&u)))
}

pub(crate) fn wishlist_data(
    store: &Store,
    wishlist: &Wishlist,
    with_members: bool,
) -> StoreResult<WishlistData> {
    let members = if with_members {
        Some(
            store
                .list_wishlist_members(&wishlist.id)?
                .iter()
                .map(UserDetail::from)
                .collect(),
        )
    } else {
        None
    };

    Ok(WishlistData {
        id: wishlist.id.clone(),
        name: wishlist.name.clone(),
        code: wishlist.code.clone(),
        user: user_detail(store, &wishlist.user_id)?,
        members,
    })
}
