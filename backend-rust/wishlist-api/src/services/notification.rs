use chrono::Utc;
use std::sync::Arc;

use super::{rule, user_detail, wishlist_data, ServiceResult};
use crate::models::*;
use crate::store::{OptionalRecord, Store};

/// Records actor-triggered events for a target user and renders them back
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<Store>,
}

impl NotificationService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn notify(
        &self,
        notification_type: NotificationType,
        target_id: &str,
        actor_id: &str,
        object_id: Option<&str>,
    ) -> ServiceResult<Notification> {
        let mut notification = Notification {
            id: String::new(),
            notification_type,
            user_id: target_id.to_string(),
            by_user_id: actor_id.to_string(),
            object_id: object_id.map(String::from),
            created_at: Utc::now(),
        };
        self.store.create_notification(&mut notification)?;
        log::debug!(
            "Notification {} ({}) from {} to {}",
            notification.id,
            notification_type,
            actor_id,
            target_id
        );
        Ok(notification)
    }

    /// Notifications for `me`, newest first
    pub fn list(&self, me: &User, page: PageQuery) -> ServiceResult<Vec<NotificationData>> {
        if page.exceeds_limit() {
            return rule(format!(
                "per_page page can not exceed the limit {}.",
                PER_PAGE_MAX
            ));
        }

        let notifications = self.store.list_notifications(&me.id, page.window())?;
        let mut data = Vec::with_capacity(notifications.len());
        for notification in &notifications {
            data.push(self.render(notification)?);
        }
        Ok(data)
    }

    pub fn delete(&self, me: &User, notification_id: &str) -> ServiceResult<()> {
        match self.store.get_notification(notification_id).optional()? {
            Some(n) if n.user_id == me.id => {
                self.store.delete_notification(&n.id)?;
                Ok(())
            }
            _ => rule("Notification not found."),
        }
    }

    fn render(&self, notification: &Notification) -> ServiceResult<NotificationData> {
        let wishlist = match (notification.notification_type, &notification.object_id) {
            (NotificationType::AddToWishlist, Some(wishlist_id)) => {
                match self.store.get_wishlist(wishlist_id).optional()? {
                    Some(w) => Some(wishlist_data(&self.store, &w, false)?),
                    None => None,
                }
            }
            _ => None,
        };

        Ok(NotificationData {
            id: notification.id.clone(),
            notification_type: notification.notification_type,
            by_user: user_detail(&self.store, &notification.by_user_id)?,
            user: user_detail(&self.store, &notification.user_id)?,
            wishlist,
        })
    }
}
