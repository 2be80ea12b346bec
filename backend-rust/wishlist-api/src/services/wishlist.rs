use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;

use super::{rule, wishlist_data, NotificationService, ServiceResult};
use crate::models::*;
use crate::store::{OptionalRecord, Store, StoreError};

/// Either a single wishlist (when one was asked for by id) or a list
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WishlistSelection {
    One(Option<WishlistData>),
    Many(Vec<WishlistData>),
}

/// Fresh invite code: random bytes, hex encoded
pub fn generate_code() -> String {
    let mut bytes = [0u8; WISHLIST_CODE_LENGTH];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}

/// Wishlists and their membership
#[derive(Clone)]
pub struct WishlistService {
    store: Arc<Store>,
    notifications: NotificationService,
}

impl WishlistService {
    pub fn new(store: Arc<Store>, notifications: NotificationService) -> Self {
        Self { store, notifications }
    }

    pub fn create(&self, me: &User, form: &CreateWishlistForm) -> ServiceResult<WishlistData> {
        let name = match present(&form.name) {
            Some(n) => n,
            None => return rule("Name is required."),
        };

        let mut wishlist = Wishlist {
            id: String::new(),
            user_id: me.id.clone(),
            name: name.to_string(),
            code: generate_code(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.store.create_wishlist(&mut wishlist)?;

        log::info!("User {} created wishlist {}", me.id, wishlist.id);
        Ok(wishlist_data(&self.store, &wishlist, false)?)
    }

    /// Adds a member. By id, only the owner may add; by code, holding the
    /// invite code is enough.
    pub fn add_member(&self, me: &User, form: &AddWishlistUserForm) -> ServiceResult<()> {
        let user_id = match present(&form.user_id) {
            Some(id) => id,
            None => return rule("User id is required."),
        };

        let wishlist = match (present(&form.wishlist_id), present(&form.code)) {
            (Some(id), _) => {
                let wishlist = self.find(id)?;
                if let Some(ref w) = wishlist {
                    if w.user_id != me.id {
                        return rule("Wishlist doesn't belong to the logged in user.");
                    }
                }
                wishlist
            }
            (None, Some(code)) => self.store.get_wishlist_by_code(code).optional()?,
            (None, None) => return rule("Wishlist id or code is required."),
        };
        let wishlist = match wishlist {
            Some(w) => w,
            None => return rule("Wishlist not found."),
        };

        let user = match self.store.get_user(user_id).optional()? {
            Some(u) => u,
            None => return rule("User not found."),
        };

        let mut member = WishlistUser {
            id: String::new(),
            wishlist_id: wishlist.id.clone(),
            user_id: user.id.clone(),
            created_at: Utc::now(),
        };
        match self.store.add_wishlist_user(&mut member) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return rule("User already member of wishlist."),
            Err(e) => return Err(e.into()),
        }

        self.notifications.notify(
            NotificationType::AddToWishlist,
            &user.id,
            &me.id,
            Some(&wishlist.id),
        )?;

        log::info!("User {} added {} to wishlist {}", me.id, user.id, wishlist.id);
        Ok(())
    }

    /// Removes `user_id` (owner only) or, without one, `me`. The removed
    /// member's claims on this wishlist's items are released.
    pub fn remove_member(
        &self,
        me: &User,
        wishlist_id: &str,
        form: &RemoveWishlistUserForm,
    ) -> ServiceResult<()> {
        let wishlist = match self.find(wishlist_id)? {
            Some(w) => w,
            None => return rule("Wishlist not found."),
        };

        let target_id = match present(&form.user_id) {
            Some(user_id) => {
                if wishlist.user_id != me.id {
                    return rule("Wishlist doesn't belong to the logged in user.");
                }
                match self.store.get_user(user_id).optional()? {
                    Some(u) => u.id,
                    None => return rule("User not found."),
                }
            }
            None => me.id.clone(),
        };

        match self.store.remove_wishlist_user(&wishlist.id, &target_id) {
            Ok(released) => {
                log::info!(
                    "Removed {} from wishlist {} ({} claims released)",
                    target_id,
                    wishlist.id,
                    released
                );
                Ok(())
            }
            Err(StoreError::NotFound(_)) => rule("User is not the member of wishlist."),
            Err(e) => Err(e.into()),
        }
    }

    /// Wishlists owned by `me`; a single one when `wishlist_id` is given
    pub fn owned(&self, me: &User, query: &WishlistQuery) -> ServiceResult<WishlistSelection> {
        let with_members = is_truthy(&query.get_members);

        if let Some(id) = present(&query.wishlist_id) {
            let data = match self.find(id)? {
                Some(w) if w.user_id == me.id => Some(wishlist_data(&self.store, &w, with_members)?),
                _ => None,
            };
            return Ok(WishlistSelection::One(data));
        }

        let mut data = Vec::new();
        for wishlist in self.store.list_wishlists_by_owner(&me.id)? {
            data.push(wishlist_data(&self.store, &wishlist, with_members)?);
        }
        Ok(WishlistSelection::Many(data))
    }

    /// Wishlists `me` has been added to; a single one when `wishlist_id` is given
    pub fn memberships(&self, me: &User, query: &WishlistQuery) -> ServiceResult<WishlistSelection> {
        let with_members = is_truthy(&query.get_members);

        if let Some(id) = present(&query.wishlist_id) {
            let mut data = None;
            if let Some(w) = self.find(id)? {
                if self.store.is_wishlist_member(&w.id, &me.id)? {
                    data = Some(wishlist_data(&self.store, &w, with_members)?);
                }
            }
            return Ok(WishlistSelection::One(data));
        }

        let mut data = Vec::new();
        for wishlist in self.store.list_member_wishlists(&me.id)? {
            data.push(wishlist_data(&self.store, &wishlist, with_members)?);
        }
        Ok(WishlistSelection::Many(data))
    }

    pub fn delete(&self, me: &User, wishlist_id: &str) -> ServiceResult<()> {
        let wishlist = self.owned_by(me, wishlist_id)?;
        self.store.delete_wishlist(&wishlist.id)?;
        log::info!("User {} deleted wishlist {}", me.id, wishlist.id);
        Ok(())
    }

    pub fn regenerate_code(&self, me: &User, wishlist_id: &str) -> ServiceResult<CodeData> {
        let wishlist = self.owned_by(me, wishlist_id)?;
        let code = generate_code();
        self.store.update_wishlist_code(&wishlist.id, &code)?;
        Ok(CodeData { code })
    }

    fn find(&self, wishlist_id: &str) -> ServiceResult<Option<Wishlist>> {
        Ok(self.store.get_wishlist(wishlist_id).optional()?)
    }

    fn owned_by(&self, me: &User, wishlist_id: &str) -> ServiceResult<Wishlist> {
        match self.find(wishlist_id)? {
            Some(w) if w.user_id == me.id => Ok(w),
            _ => rule("Wishlist not found."),
        }
    }
}
