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

fn create_user(store: &Store, auth_service: &AuthService, username: &str) -> (User, String) {
    let mut user = User {
        id: String::new(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: auth_service.hash_password("password123").unwrap(),
        first_name: None,
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
async fn test_friend_requests_are_listed_newest_first() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (target, target_token) = create_user(&store, &auth_service, "target");

    let mut senders = Vec::new();
    for name in ["first", "second", "third"] {
        let (sender, token) = create_user(&store, &auth_service, name);
        let req = test::TestRequest::post()
            .uri("/api/user/add-friend")
            .insert_header(bearer(&token))
            .set_form([("user_id", target.id.as_str())])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        senders.push(sender);
    }

    let req = test::TestRequest::get()
        .uri("/api/user/notification")
        .insert_header(bearer(&target_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["type"], "add_friend");
    assert_eq!(data[0]["by_user"]["id"], senders[2].id.as_str());
    assert_eq!(data[0]["user"]["id"], target.id.as_str());
    assert!(data[0]["wishlist"].is_null());
    assert_eq!(data[2]["by_user"]["id"], senders[0].id.as_str());

    let req = test::TestRequest::get()
        .uri("/api/user/notification?page=2&per_page=2")
        .insert_header(bearer(&target_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["by_user"]["id"], senders[0].id.as_str());

    let req = test::TestRequest::get()
        .uri("/api/user/notification?per_page=100")
        .insert_header(bearer(&target_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_delete_notification() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);
    let (target, target_token) = create_user(&store, &auth_service, "target");
    let (_, sender_token) = create_user(&store, &auth_service, "sender");

    let req = test::TestRequest::post()
        .uri("/api/user/add-friend")
        .insert_header(bearer(&sender_token))
        .set_form([("user_id", target.id.as_str())])
        .to_request();
    test::call_service(&app, req).await;

    let notification_id = store.list_notifications(&target.id, None).unwrap()[0].id.clone();
    let uri = format!("/api/user/notification/{}", notification_id);

    // not the sender's to delete
    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&sender_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Notification not found.");

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&target_token))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "success");
    assert!(store.list_notifications(&target.id, None).unwrap().is_empty());
}

#[actix_web::test]
async fn test_health() {
    let (store, auth_service) = setup();
    let app = init_app!(store, auth_service);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
}
