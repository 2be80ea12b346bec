use actix_web::{test, web, App};
use chrono::Utc;
use std::sync::Arc;

use wishlist_api::api::{self, AppState};
use wishlist_api::auth::AuthService;
use wishlist_api::mail::Mailer;
use wishlist_api::models::User;
use wishlist_api::store::Store;

fn setup() -> (Arc<Store>, Arc<AuthService>) {
    let store = Arc::new(Store::in_memory().unwrap());
    let auth_service = Arc::new(AuthService::new("test_secret".to_string()).with_bcrypt_cost(4));
    (store, auth_service)
}

macro_rules! init_app {
    ($store:expr, $auth:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($auth.clone()))
                .app_data(web::Data::new(AppState::new(
                    $store.clone(),
                    $auth.clone(),
                    Arc::new(Mailer::disabled()),
                )))
                .configure(api::configure_routes),
        )
        .await
    };
}

/// Helper to create a user directly in the store and mint a token for them
fn create_user(store: &Store, auth_service: &AuthService, username: &str) -> (User, String) {
    let mut user = User {
        id: String::new(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: auth_service.hash_password("password123").unwrap(),
        first_name: Some(username.to_string()),
        last_name: None,
        enabled: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    store.create_user(&mut user).unwrap();
    let token = auth_service.generate_token(&user.id).unwrap();
    (user, token)
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_create_and_list_wishlists() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (owner, token) = create_user(&store, &auth_service, "owner");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&token))
        .set_form([("name", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Name is required.");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&token))
        .set_form([("name", "Birthday")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["name"], "Birthday");
    assert_eq!(body["data"]["user"]["id"], owner.id.as_str());
    assert_eq!(body["data"]["code"].as_str().unwrap().len(), 10);
    let wishlist_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0].get("members").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/api/user/wishlist?wishlist_id={}&get_members=1", wishlist_id))
        .insert_header(bearer(&token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["id"], wishlist_id.as_str());
    assert!(body["data"]["members"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/user/wishlist?wishlist_id=missing")
        .insert_header(bearer(&token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["data"].is_null());
}

#[actix_web::test]
async fn test_join_by_code_notifies_member() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (_, owner_token) = create_user(&store, &auth_service, "owner");
    let (bob, bob_token) = create_user(&store, &auth_service, "bob");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&owner_token))
        .set_form([("name", "Birthday")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let wishlist_id = body["data"]["id"].as_str().unwrap().to_string();
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist/user")
        .insert_header(bearer(&bob_token))
        .set_form([("user_id", bob.id.as_str()), ("code", code.as_str())])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "success");
    assert!(body["data"].is_null());

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist/user")
        .insert_header(bearer(&owner_token))
        .set_form([("user_id", bob.id.as_str()), ("wishlist_id", wishlist_id.as_str())])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "User already member of wishlist.");

    let req = test::TestRequest::get()
        .uri("/api/user/member-wishlist")
        .insert_header(bearer(&bob_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["id"], wishlist_id.as_str());

    let req = test::TestRequest::get()
        .uri("/api/user/notification")
        .insert_header(bearer(&bob_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["type"], "add_to_wishlist");
    assert_eq!(body["data"][0]["wishlist"]["id"], wishlist_id.as_str());
}

#[actix_web::test]
async fn test_add_member_by_id_requires_owner() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (_, owner_token) = create_user(&store, &auth_service, "owner");
    let (bob, bob_token) = create_user(&store, &auth_service, "bob");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&owner_token))
        .set_form([("name", "Birthday")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let wishlist_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist/user")
        .insert_header(bearer(&bob_token))
        .set_form([("user_id", bob.id.as_str()), ("wishlist_id", wishlist_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Wishlist doesn't belong to the logged in user.");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist/user")
        .insert_header(bearer(&owner_token))
        .set_form([("user_id", "")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "User id is required.");
}

#[actix_web::test]
async fn test_regenerate_code_and_delete() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (_, owner_token) = create_user(&store, &auth_service, "owner");
    let (_, bob_token) = create_user(&store, &auth_service, "bob");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&owner_token))
        .set_form([("name", "Birthday")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let wishlist_id = body["data"]["id"].as_str().unwrap().to_string();
    let old_code = body["data"]["code"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/user/wishlist/{}/generate-code", wishlist_id))
        .insert_header(bearer(&owner_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let new_code = body["data"]["code"].as_str().unwrap();
    assert_eq!(new_code.len(), 10);
    assert_ne!(new_code, old_code);
    assert!(store.get_wishlist_by_code(&old_code).is_err());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/user/wishlist/{}", wishlist_id))
        .insert_header(bearer(&bob_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Wishlist not found.");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/user/wishlist/{}", wishlist_id))
        .insert_header(bearer(&owner_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(store.get_wishlist(&wishlist_id).is_err());
}

#[actix_web::test]
async fn test_remove_member_releases_claims() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (owner, owner_token) = create_user(&store, &auth_service, "owner");
    let (bob, bob_token) = create_user(&store, &auth_service, "bob");

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist")
        .insert_header(bearer(&owner_token))
        .set_form([("name", "Birthday")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let wishlist_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/user/wishlist/user")
        .insert_header(bearer(&owner_token))
        .set_form([("user_id", bob.id.as_str()), ("wishlist_id", wishlist_id.as_str())])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/user/wishlist/{}/item", wishlist_id))
        .insert_header(bearer(&owner_token))
        .set_form([("name", "Scarf")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let item_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/user/item/{}/select", item_id))
        .insert_header(bearer(&bob_token))
        .set_form([("is_select", "1")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // a non-owner cannot remove other members
    let req = test::TestRequest::post()
        .uri(&format!("/api/user/wishlist/{}/user/remove", wishlist_id))
        .insert_header(bearer(&bob_token))
        .set_form([("user_id", owner.id.as_str())])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Wishlist doesn't belong to the logged in user.");

    let req = test::TestRequest::post()
        .uri(&format!("/api/user/wishlist/{}/user/remove", wishlist_id))
        .insert_header(bearer(&owner_token))
        .set_form([("user_id", bob.id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    assert!(store.get_item(&item_id).unwrap().user_id.is_none());
    assert!(!store.is_wishlist_member(&wishlist_id, &bob.id).unwrap());

    let req = test::TestRequest::post()
        .uri(&format!("/api/user/wishlist/{}/user/remove", wishlist_id))
        .insert_header(bearer(&bob_token))
        .set_form([("user_id", "")])
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "User is not the member of wishlist.");
}
