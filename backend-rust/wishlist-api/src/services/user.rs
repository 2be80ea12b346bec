use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use super::{rule, NotificationService, ServiceError, ServiceResult};
use crate::auth::{AuthService, AuthUser};
use crate::mail::Mailer;
use crate::models::*;
use crate::store::{OptionalRecord, Store, StoreError};

pub const NEW_PASSWORD_SUBJECT: &str = "Wishlist new password";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Accounts, profiles and the friend graph
#[derive(Clone)]
pub struct UserService {
    store: Arc<Store>,
    auth: Arc<AuthService>,
    mailer: Arc<Mailer>,
    notifications: NotificationService,
}

impl UserService {
    pub fn new(
        store: Arc<Store>,
        auth: Arc<AuthService>,
        mailer: Arc<Mailer>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            auth,
            mailer,
            notifications,
        }
    }

    pub fn register(&self, form: &RegisterForm) -> ServiceResult<UserDetail> {
        let (username, email, password) =
            match (present(&form.username), present(&form.email), present(&form.password)) {
                (Some(u), Some(e), Some(p)) => (u, e, p),
                _ => return rule("Missing required parameters."),
            };

        if !is_valid_email(email) {
            return rule("Invalid email provided.");
        }
        if self.store.get_user_by_email(email).optional()?.is_some() {
            return rule("Email is already in use.");
        }
        if self.store.get_user_by_username(username).optional()?.is_some() {
            return rule("Username is already in use.");
        }

        let mut user = User {
            id: String::new(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: self.auth.hash_password(password)?,
            first_name: present(&form.first_name).map(String::from),
            last_name: present(&form.last_name).map(String::from),
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        match self.store.create_user(&mut user) {
            Ok(()) => {}
            // lost a race with a concurrent registration
            Err(StoreError::Conflict(_)) => return rule("Username is already in use."),
            Err(e) => return Err(e.into()),
        }

        log::info!("Registered user {} ({})", user.username, user.id);
        Ok(UserDetail::from(&user))
    }

    pub fn login(&self, form: &LoginForm) -> ServiceResult<LoginResponse> {
        let (username, password) = match (present(&form.username), present(&form.password)) {
            (Some(u), Some(p)) => (u, p),
            _ => return rule("Missing required parameters."),
        };

        let user = match self.store.get_user_by_username(username).optional()? {
            Some(u) => u,
            None => return Err(ServiceError::Unauthorized("Invalid credentials.".to_string())),
        };

        if !self.auth.verify_password(password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized("Invalid credentials.".to_string()));
        }
        if !user.enabled {
            return Err(ServiceError::Unauthorized("Account is disabled.".to_string()));
        }

        let token = self.auth.generate_token(&user.id)?;
        Ok(LoginResponse {
            token,
            user: UserDetail::from(&user),
        })
    }

    /// Loads the user behind a bearer token. Tokens of deleted users are rejected.
    pub fn current(&self, auth_user: &AuthUser) -> ServiceResult<User> {
        match self.store.get_user(&auth_user.user_id).optional()? {
            Some(user) if user.enabled => Ok(user),
            _ => Err(ServiceError::Unauthorized("Unknown user".to_string())),
        }
    }

    pub fn list_users(&self, page: PageQuery) -> ServiceResult<Vec<UserDetail>> {
        if page.exceeds_limit() {
            return rule(format!(
                "per_page page can not exceed the limit {}.",
                PER_PAGE_MAX
            ));
        }

        Ok(self
            .store
            .list_users(page.window())?
            .iter()
            .map(UserDetail::from)
            .collect())
    }

    /// Sends a friend request, or accepts one when `accept_request` is set
    pub fn friend_action(&self, me: &User, form: &FriendForm) -> ServiceResult<()> {
        let target = self.target_user(&form.user_id)?;
        if target.id == me.id {
            return rule("Two same users can't be friends.");
        }

        if is_truthy(&form.accept_request) {
            self.accept_friend_request(me, &target)
        } else {
            self.send_friend_request(me, &target)
        }
    }

    pub fn send_friend_request(&self, me: &User, target: &User) -> ServiceResult<()> {
        if let Some(edge) = self.store.find_friend_edge(&me.id, &target.id).optional()? {
            return if edge.request_accepted {
                rule("This user is already a friend.")
            } else {
                rule("Friend request has already been sent.")
            };
        }

        let mut edge = UserFriend {
            id: String::new(),
            user_id: me.id.clone(),
            friend_id: target.id.clone(),
            request_accepted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        match self.store.create_friend_edge(&mut edge) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return rule("Friend request has already been sent."),
            Err(e) => return Err(e.into()),
        }

        self.notifications
            .notify(NotificationType::AddFriend, &target.id, &me.id, None)?;

        log::info!("Friend request {} -> {}", me.id, target.id);
        Ok(())
    }

    /// Only the recipient of a pending request can accept it
    pub fn accept_friend_request(&self, me: &User, target: &User) -> ServiceResult<()> {
        let edge = match self.store.find_friend_edge(&me.id, &target.id).optional()? {
            Some(edge) => edge,
            None => return rule("User don't have pending request."),
        };

        if edge.request_accepted {
            return rule("Request has already been accepted.");
        }
        if edge.friend_id != me.id {
            return rule("User don't have pending request.");
        }

        self.store.accept_friend_edge(&edge.id)?;
        log::info!("Friend request {} -> {} accepted", target.id, me.id);
        Ok(())
    }

    /// Drops the edge in either direction, pending or accepted
    pub fn remove_friend(&self, me: &User, form: &FriendForm) -> ServiceResult<()> {
        let target = self.target_user(&form.user_id)?;

        match self.store.find_friend_edge(&me.id, &target.id).optional()? {
            Some(edge) => {
                self.store.delete_friend_edge(&edge.id)?;
                log::info!("Friendship {} / {} removed", me.id, target.id);
                Ok(())
            }
            None => rule("This user is not a friend."),
        }
    }

    /// Everyone with an edge to `me`, flagged with the acceptance state
    pub fn friends(&self, me: &User) -> ServiceResult<Vec<UserDetail>> {
        let mut friends = Vec::new();
        for edge in self.store.list_friend_edges(&me.id)? {
            if let Some(user) = self.store.get_user(edge.other_side(&me.id)).optional()? {
                let mut detail = UserDetail::from(&user);
                detail.request_accepted = Some(edge.request_accepted);
                friends.push(detail);
            }
        }
        Ok(friends)
    }

    /// Applies the non-empty fields of the form
    pub fn update_profile(&self, me: &User, form: &UpdateUserForm) -> ServiceResult<UserDetail> {
        let mut user = me.clone();

        if let Some(username) = present(&form.username) {
            if let Some(existing) = self.store.get_user_by_username(username).optional()? {
                if existing.id != user.id {
                    return rule("User already exists with this username.");
                }
            }
            user.username = username.to_string();
        }
        if let Some(password) = present(&form.password) {
            user.password_hash = self.auth.hash_password(password)?;
        }
        if let Some(first_name) = present(&form.first_name) {
            user.first_name = Some(first_name.to_string());
        }
        if let Some(last_name) = present(&form.last_name) {
            user.last_name = Some(last_name.to_string());
        }

        match self.store.update_user(&mut user) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return rule("User already exists with this username."),
            Err(e) => return Err(e.into()),
        }
        Ok(UserDetail::from(&user))
    }

    pub fn delete_account(&self, me: &User) -> ServiceResult<()> {
        self.store.delete_user(&me.id)?;
        log::info!("Deleted user {} ({})", me.username, me.id);
        Ok(())
    }

    /// Replaces the password with a generated one and mails it to the user
    pub async fn reset_password(&self, form: &ForgetPasswordForm) -> ServiceResult<()> {
        let email = match present(&form.email) {
            Some(e) => e,
            None => return rule("Email is required."),
        };

        let mut user = match self.store.get_user_by_email(email).optional()? {
            Some(u) => u,
            None => return rule("User not found."),
        };

        let new_password = AuthService::generate_password();
        user.password_hash = self.auth.hash_password(&new_password)?;
        self.store.update_user(&mut user)?;

        let body = format!(
            "<p>Your new Wishlist password is: <strong>{}</strong></p>\
             <p>Please change it after signing in.</p>",
            new_password
        );
        let message = self.mailer.compose(&user.email, NEW_PASSWORD_SUBJECT, body);
        self.mailer.send(&message).await?;

        log::info!("Password reset for user {}", user.id);
        Ok(())
    }

    fn target_user(&self, user_id: &Option<String>) -> ServiceResult<User> {
        let user_id = match present(user_id) {
            Some(id) => id,
            None => return rule("User id is required."),
        };
        match self.store.get_user(user_id).optional()? {
            Some(user) => Ok(user),
            None => rule("User not found."),
        }
    }
}
