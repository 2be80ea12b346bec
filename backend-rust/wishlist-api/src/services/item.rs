use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use super::{rule, user_detail, wishlist_data, ServiceResult};
use crate::models::*;
use crate::store::{OptionalRecord, Store};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ItemSelection {
    One(Option<ItemData>),
    Many(Vec<ItemData>),
}

/// Items on wishlists and who has claimed them
#[derive(Clone)]
pub struct ItemService {
    store: Arc<Store>,
}

impl ItemService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        me: &User,
        wishlist_id: &str,
        form: &CreateItemForm,
    ) -> ServiceResult<ItemData> {
        let name = match present(&form.name) {
            Some(n) => n,
            None => return rule("Name is required."),
        };
        let wishlist = self.accessible_wishlist(me, wishlist_id)?;

        let mut item = Item {
            id: String::new(),
            wishlist_id: wishlist.id.clone(),
            user_id: None,
            name: name.to_string(),
            description: present(&form.description).map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.store.create_item(&mut item)?;

        log::info!("User {} added item {} to wishlist {}", me.id, item.id, wishlist.id);
        self.render(&item, &wishlist)
    }

    pub fn list(&self, me: &User, wishlist_id: &str, query: &ItemQuery) -> ServiceResult<ItemSelection> {
        let wishlist = self.accessible_wishlist(me, wishlist_id)?;

        if let Some(item_id) = present(&query.item_id) {
            let data = match self.store.get_item(item_id).optional()? {
                Some(item) if item.wishlist_id == wishlist.id => Some(self.render(&item, &wishlist)?),
                _ => None,
            };
            return Ok(ItemSelection::One(data));
        }

        let items = self.store.list_items(&wishlist.id)?;
        let mut data = Vec::with_capacity(items.len());
        for item in &items {
            data.push(self.render(item, &wishlist)?);
        }
        Ok(ItemSelection::Many(data))
    }

    /// Claims (`is_select` truthy) or releases an item for `me`
    pub fn select(&self, me: &User, item_id: &str, form: &SelectItemForm) -> ServiceResult<()> {
        let item = match self.store.get_item(item_id).optional()? {
            Some(item) => item,
            None => return rule("Item not found."),
        };

        let mine = match item.user_id.as_deref() {
            Some(claimer) if claimer != me.id => {
                return rule("Item is already selected by a user.")
            }
            Some(_) => true,
            None => false,
        };

        if !self.store.is_wishlist_member(&item.wishlist_id, &me.id)? {
            return rule("User is not the member of item wishlist.");
        }

        if is_truthy(&form.is_select) {
            if mine {
                return rule("User has already selected this item.");
            }
            // lost a race with another member
            if !self.store.claim_item(&item.id, &me.id)? {
                return rule("Item is already selected by a user.");
            }
            log::info!("User {} selected item {}", me.id, item.id);
        } else if self.store.release_item(&item.id, &me.id)? {
            log::info!("User {} released item {}", me.id, item.id);
        }
        Ok(())
    }

    fn accessible_wishlist(&self, me: &User, wishlist_id: &str) -> ServiceResult<Wishlist> {
        let wishlist = match self.store.get_wishlist(wishlist_id).optional()? {
            Some(w) => w,
            None => return rule("Wishlist not found."),
        };
        if wishlist.user_id != me.id && !self.store.is_wishlist_member(&wishlist.id, &me.id)? {
            return rule("User is not the member of item wishlist.");
        }
        Ok(wishlist)
    }

    fn render(&self, item: &Item, wishlist: &Wishlist) -> ServiceResult<ItemData> {
        let user = match item.user_id.as_deref() {
            Some(claimer) => user_detail(&self.store, claimer)?,
            None => None,
        };
        Ok(ItemData {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            wishlist: Some(wishlist_data(&self.store, wishlist, false)?),
            user,
        })
    }
}
