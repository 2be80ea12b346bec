use actix_web::error::{InternalError, QueryPayloadError, UrlencodedError};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthService, AuthUser};
use crate::mail::Mailer;
use crate::models::*;
use crate::services::{
    ItemService, NotificationService, ServiceError, ServiceResult, UserService, WishlistService,
};
use crate::store::Store;

pub struct AppState {
    pub users: UserService,
    pub wishlists: WishlistService,
    pub items: ItemService,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(store: Arc<Store>, auth_service: Arc<AuthService>, mailer: Arc<Mailer>) -> Self {
        let notifications = NotificationService::new(store.clone());
        Self {
            users: UserService::new(
                store.clone(),
                auth_service,
                mailer,
                notifications.clone(),
            ),
            wishlists: WishlistService::new(store.clone(), notifications.clone()),
            items: ItemService::new(store),
            notifications,
        }
    }
}

// ==================== Envelope helpers ====================

fn respond<T: Serialize>(endpoint: &str, result: ServiceResult<T>, message: &str) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(ApiResponse::success(200, message, Some(data))),
        Err(e) => failure(endpoint, e),
    }
}

/// For endpoints that only perform an action; `data` is null
fn acknowledge(endpoint: &str, result: ServiceResult<()>) -> HttpResponse {
    match result {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::<()>::success(200, ACTION_PERFORMED, None)),
        Err(e) => failure(endpoint, e),
    }
}

fn failure(endpoint: &str, err: ServiceError) -> HttpResponse {
    match err {
        ServiceError::Rule(message) => {
            bad_request(message)
        }
        ServiceError::Unauthorized(message) => {
            HttpResponse::Unauthorized().json(ApiResponse::<()>::error(401, message))
        }
        e => {
            log::error!("[{}]: {}", endpoint, e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(500, INTERNAL_SERVER_ERROR_TEXT))
        }
    }
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::error(400, message))
}

/// Malformed or missing form bodies get the JSON envelope instead of actix's plain text
fn form_error(err: UrlencodedError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected form body for {}: {}", req.path(), err);
    let response = bad_request(format!("Invalid form data: {}", err));
    InternalError::from_response(err, response).into()
}

fn query_error(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected query string for {}: {}", req.path(), err);
    let response = bad_request(format!("Invalid query parameters: {}", err));
    InternalError::from_response(err, response).into()
}

/// Resolves the bearer token to a live user, or the response to send instead
fn signed_in(state: &AppState, auth_user: &AuthUser, endpoint: &str) -> Result<User, HttpResponse> {
    state
        .users
        .current(auth_user)
        .map_err(|e| failure(endpoint, e))
}

// ==================== Health Check ====================

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// ==================== Client (no auth) ====================

pub async fn register(state: web::Data<AppState>, form: web::Form<RegisterForm>) -> impl Responder {
    respond(
        "register_api",
        state.users.register(&form),
        "User registered successfully.",
    )
}

pub async fn login(state: web::Data<AppState>, form: web::Form<LoginForm>) -> impl Responder {
    respond("login_api", state.users.login(&form), "")
}

pub async fn forget_password(
    state: web::Data<AppState>,
    form: web::Form<ForgetPasswordForm>,
) -> impl Responder {
    match state.users.reset_password(&form).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::<()>::success(
            200,
            "Email with the new password has been sent to the user.",
            None,
        )),
        Err(e) => failure("forget_password_api", e),
    }
}

// ==================== Users & Friends ====================

pub async fn list_users(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<PageQuery>,
) -> impl Responder {
    if let Err(resp) = signed_in(&state, &auth_user, "user_api") {
        return resp;
    }
    respond("user_api", state.users.list_users(*query), "")
}

pub async fn delete_user(state: web::Data<AppState>, auth_user: AuthUser) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "delete_user_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match state.users.delete_account(&me) {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::<()>::success(
            200,
            "User deleted successfully.",
            None,
        )),
        Err(e) => failure("delete_user_api", e),
    }
}

pub async fn user_details(state: web::Data<AppState>, auth_user: AuthUser) -> impl Responder {
    match signed_in(&state, &auth_user, "user_details_api") {
        Ok(me) => HttpResponse::Ok().json(ApiResponse::success(200, "", Some(UserDetail::from(&me)))),
        Err(resp) => resp,
    }
}

pub async fn update_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    form: web::Form<UpdateUserForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "update_user_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond(
        "update_user_api",
        state.users.update_profile(&me, &form),
        "User updated successfully.",
    )
}

pub async fn friends(state: web::Data<AppState>, auth_user: AuthUser) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "friend_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond("friend_api", state.users.friends(&me), "")
}

pub async fn add_friend(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    form: web::Form<FriendForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "add_friend_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge("add_friend_api", state.users.friend_action(&me, &form))
}

pub async fn remove_friend(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    form: web::Form<FriendForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "remove_friend_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge("remove_friend_api", state.users.remove_friend(&me, &form))
}

// ==================== Wishlists ====================

pub async fn create_wishlist(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    form: web::Form<CreateWishlistForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "create_wishlist_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond(
        "create_wishlist_api",
        state.wishlists.create(&me, &form),
        "Wishlist created successfully.",
    )
}

pub async fn list_wishlists(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<WishlistQuery>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "wishlist_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond("wishlist_api", state.wishlists.owned(&me, &query), "")
}

pub async fn delete_wishlist(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "delete_wishlist_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge("delete_wishlist_api", state.wishlists.delete(&me, &path))
}

pub async fn generate_code(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "generate_code_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond(
        "generate_code_api",
        state.wishlists.regenerate_code(&me, &path),
        "",
    )
}

pub async fn add_wishlist_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    form: web::Form<AddWishlistUserForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "add_wishlist_user_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge("add_wishlist_user_api", state.wishlists.add_member(&me, &form))
}

pub async fn remove_wishlist_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    form: web::Form<RemoveWishlistUserForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "remove_wishlist_user_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge(
        "remove_wishlist_user_api",
        state.wishlists.remove_member(&me, &path, &form),
    )
}

pub async fn member_wishlists(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<WishlistQuery>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "member_wishlist_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond(
        "member_wishlist_api",
        state.wishlists.memberships(&me, &query),
        "",
    )
}

// ==================== Items ====================

pub async fn create_item(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    form: web::Form<CreateItemForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "create_item_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond(
        "create_item_api",
        state.items.create(&me, &path, &form),
        "Item created successfully.",
    )
}

pub async fn list_items(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    query: web::Query<ItemQuery>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "items_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond("items_api", state.items.list(&me, &path, &query), "")
}

pub async fn select_item(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    form: web::Form<SelectItemForm>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "select_item_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge("select_item_api", state.items.select(&me, &path, &form))
}

// ==================== Notifications ====================

pub async fn list_notifications(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "notification_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    respond("notification_api", state.notifications.list(&me, *query), "")
}

pub async fn delete_notification(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let me = match signed_in(&state, &auth_user, "delete_notification_api") {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    acknowledge(
        "delete_notification_api",
        state.notifications.delete(&me, &path),
    )
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(web::FormConfig::default().error_handler(form_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))

        // Health check
        .route("/health", web::get().to(health))

        // Client routes (no auth required)
        .route("/api/client/register", web::post().to(register))
        .route("/api/client/login", web::post().to(login))
        .route("/api/client/forget-password", web::post().to(forget_password))

        // Users and friends
        .route("/api/user/user", web::get().to(list_users))
        .route("/api/user/user", web::delete().to(delete_user))
        .route("/api/user/user-details", web::get().to(user_details))
        .route("/api/user/update-user", web::put().to(update_user))
        .route("/api/user/friend", web::get().to(friends))
        .route("/api/user/add-friend", web::post().to(add_friend))
        .route("/api/user/remove-friend", web::post().to(remove_friend))

        // Wishlists
        .route("/api/user/wishlist", web::post().to(create_wishlist))
        .route("/api/user/wishlist", web::get().to(list_wishlists))
        .route("/api/user/wishlist/user", web::post().to(add_wishlist_user))
        .route("/api/user/wishlist/{wishlist_id}", web::delete().to(delete_wishlist))
        .route("/api/user/wishlist/{wishlist_id}/generate-code", web::get().to(generate_code))
        .route("/api/user/wishlist/{wishlist_id}/user/remove", web::post().to(remove_wishlist_user))
        .route("/api/user/member-wishlist", web::get().to(member_wishlists))

        // Items
        .route("/api/user/wishlist/{wishlist_id}/item", web::post().to(create_item))
        .route("/api/user/wishlist/{wishlist_id}/items", web::get().to(list_items))
        .route("/api/user/item/{item_id}/select", web::post().to(select_item))

        // Notifications
        .route("/api/user/notification", web::get().to(list_notifications))
        .route("/api/user/notification/{notification_id}", web::delete().to(delete_notification));
}
