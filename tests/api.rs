use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use carmarket::{app::build_app, config::AppConfig, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    build_app(AppState::fake())
}

fn app_with_external_signin() -> Router {
    build_app(AppState::in_memory(AppConfig {
        external_signin_enabled: true,
        ..AppState::fake_config()
    }))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Registers and signs in; returns (user id, access token).
async fn register(app: &Router, name: &str) -> (String, String) {
    let email = format!("{name}@example.com");
    let (status, _) = call(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "username": name, "email": email, "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": email, "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["access_token"].as_str().unwrap().to_string(),
    )
}

fn images(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://img.example/{i}.jpg")).collect()
}

async fn create(app: &Router, token: &str, title: &str, tags: &[&str]) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/car/create",
        Some(token),
        Some(json!({
            "title": title,
            "description": "well kept",
            "tags": tags,
            "images": images(1),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["car"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_responds() {
    let res = app()
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_signup_is_a_conflict() {
    let app = app();
    register(&app, "ada").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "username": "ada2", "email": "ADA@example.com", "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = app();
    register(&app, "ada").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "not-the-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn creating_requires_authentication() {
    let (status, body) = call(
        &app(),
        Method::POST,
        "/api/car/create",
        None,
        Some(json!({ "title": "Civic", "description": "x", "images": images(1) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn image_count_is_capped_at_ten() {
    let app = app();
    let (user_id, token) = register(&app, "ada").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/car/create",
        Some(&token),
        Some(json!({ "title": "Civic", "description": "x", "images": images(11) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You can upload a maximum of 10 images");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/car/create",
        Some(&token),
        Some(json!({ "title": "Civic", "description": "x", "images": images(10) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["car"]["user_ref"], user_id.as_str());
    assert_eq!(body["car"]["images"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn other_users_cannot_touch_a_listing() {
    let app = app();
    let (_, owner) = register(&app, "ada").await;
    let (_, intruder) = register(&app, "eve").await;
    let car_id = create(&app, &owner, "Civic", &["sedan"]).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/car/update/{car_id}"),
        Some(&intruder),
        Some(json!({ "title": "Stolen" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Car not found or unauthorized");

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/car/delete/{car_id}"),
        Some(&intruder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::GET, &format!("/api/car/get/{car_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["car"]["title"], "Civic");
}

#[tokio::test]
async fn owner_updates_then_deletes_once() {
    let app = app();
    let (_, token) = register(&app, "ada").await;
    let car_id = create(&app, &token, "Civic", &[]).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/car/update/{car_id}"),
        Some(&token),
        Some(json!({ "title": "Civic Si", "offer": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["car"]["title"], "Civic Si");
    assert_eq!(body["car"]["description"], "well kept");
    assert_eq!(body["car"]["offer"], true);

    let uri = format!("/api/car/delete/{car_id}");
    let (status, body) = call(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Car deleted successfully");

    let (status, body) = call(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Car not found or unauthorized");

    let (status, body) = call(&app, Method::GET, &format!("/api/car/get/{car_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Car not found");
}

#[tokio::test]
async fn search_filters_and_pages() {
    let app = app();
    let (_, token) = register(&app, "ada").await;
    create(&app, &token, "Civic", &["sedan", "honda"]).await;
    create(&app, &token, "Accord", &["Sedan"]).await;
    create(&app, &token, "Ranger", &["pickup"]).await;

    let (status, body) = call(&app, Method::GET, "/api/car/get?searchTerm=sedan", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let mut titles: Vec<&str> = body["cars"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Accord", "Civic"]);

    let (_, body) = call(&app, Method::GET, "/api/car/get?limit=2&sort=title&order=asc", None, None).await;
    assert_eq!(body["cars"][0]["title"], "Accord");
    assert_eq!(body["has_more"], true);
    assert_eq!(body["next_start_index"], 2);

    let (_, body) = call(&app, Method::GET, "/api/car/get?limit=2&startIndex=2&sort=title&order=asc", None, None).await;
    assert_eq!(body["cars"].as_array().unwrap().len(), 1);
    assert_eq!(body["has_more"], false);

    let (status, body) = call(&app, Method::GET, "/api/car/get?sort=price", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn listings_are_scoped_to_their_owner() {
    let app = app();
    let (ada_id, ada) = register(&app, "ada").await;
    let (eve_id, eve) = register(&app, "eve").await;
    create(&app, &ada, "Civic", &[]).await;
    create(&app, &ada, "Accord", &[]).await;
    create(&app, &eve, "Ranger", &[]).await;

    let (status, body) = call(&app, Method::GET, &format!("/api/user/listings/{ada_id}"), Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cars"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, Method::GET, &format!("/api/user/listings/{eve_id}"), Some(&ada), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found or unauthorized");
}

#[tokio::test]
async fn deleted_account_leaves_listings_behind() {
    let app = app();
    let (ada_id, ada) = register(&app, "ada").await;
    let car_id = create(&app, &ada, "Civic", &[]).await;

    let (status, body) = call(&app, Method::DELETE, &format!("/api/user/delete/{ada_id}"), Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User has been deleted!");

    let (status, _) = call(&app, Method::GET, &format!("/api/car/get/{car_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleted_account_cannot_create_listings() {
    let app = app();
    let (ada_id, ada) = register(&app, "ada").await;
    let car_id = create(&app, &ada, "Civic", &[]).await;

    let (status, _) = call(&app, Method::DELETE, &format!("/api/user/delete/{ada_id}"), Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/car/create",
        Some(&ada),
        Some(json!({ "title": "Ghost", "description": "x", "images": images(1) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/car/update/{car_id}"),
        Some(&ada),
        Some(json!({ "title": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = call(&app, Method::GET, "/api/car/get", None, None).await;
    assert_eq!(body["cars"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_signin_email_is_just_bad_credentials() {
    let (status, body) = call(
        &app(),
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "nobody", "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn external_signin_is_off_by_default() {
    let (status, body) = call(
        &app(),
        Method::POST,
        "/api/auth/google",
        None,
        Some(json!({ "email": "jane@example.com", "name": "Jane Doe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "External sign-in is disabled");
}

#[tokio::test]
async fn external_signin_creates_then_reuses_accounts() {
    let app = app_with_external_signin();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/google",
        None,
        Some(json!({
            "email": "Jane@Example.com",
            "name": "Jane Doe",
            "photo": "https://img.example/jane.png",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let username = body["user"]["username"].as_str().unwrap();
    assert!(username.starts_with("janedoe"));
    assert_eq!(username.len(), "janedoe".len() + 4);
    assert_eq!(body["user"]["avatar"], "https://img.example/jane.png");
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert!(body["access_token"].is_string());
    let jane_id = body["user"]["id"].clone();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/google",
        None,
        Some(json!({ "email": "jane@example.com", "name": "Someone Else" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], jane_id);
    assert_eq!(body["user"]["username"].as_str(), Some(username));

    let (ada_id, _) = register(&app, "ada").await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/api/auth/google",
        None,
        Some(json!({ "email": "ada@example.com", "name": "Ada" })),
    )
    .await;
    assert_eq!(body["user"]["id"], ada_id.as_str());
}

#[tokio::test]
async fn refresh_issues_a_new_pair_and_rejects_access_tokens() {
    let app = app();
    register(&app, "ada").await;
    let (_, signin) = call(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter2hunter2" })),
    )
    .await;
    let refresh_token = signin["refresh_token"].as_str().unwrap();
    let access_token = signin["access_token"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], signin["user"]["id"]);
    let renewed = body["access_token"].as_str().unwrap();
    assert!(body["refresh_token"].is_string());

    let (status, _) = call(&app, Method::POST, "/api/car/create", Some(renewed), Some(json!({
        "title": "Civic", "description": "x", "images": images(1),
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": access_token })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (status, _) = call(&app, Method::POST, "/api/car/create", Some(refresh_token), Some(json!({
        "title": "Civic", "description": "x", "images": images(1),
    })))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_rehashes_password_and_guards_email() {
    let app = app();
    let (ada_id, ada) = register(&app, "ada").await;
    let (eve_id, _) = register(&app, "eve").await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/user/update/{ada_id}"),
        Some(&ada),
        Some(json!({ "username": "ada l.", "password": "correct-horse-battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "ada l.");
    assert!(body["user"].get("password_hash").is_none());

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter2hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "correct-horse-battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/user/update/{ada_id}"),
        Some(&ada),
        Some(json!({ "email": "EVE@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/user/update/{eve_id}"),
        Some(&ada),
        Some(json!({ "username": "hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found or unauthorized");
}

#[tokio::test]
async fn profiles_are_readable_without_the_password_hash() {
    let app = app();
    let (ada_id, _) = register(&app, "ada").await;
    let (_, eve) = register(&app, "eve").await;

    let (status, body) = call(&app, Method::GET, &format!("/api/user/{ada_id}"), Some(&eve), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body.to_string().contains("argon2"));

    let (status, _) = call(&app, Method::GET, &format!("/api/user/{ada_id}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_alone_authenticates() {
    let app = app();
    register(&app, "ada").await;

    let res = app
        .clone()
        .oneshot(
            Request::post("/api/auth/signin")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "ada@example.com", "password": "hunter2hunter2" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("access_token="));

    let res = app
        .clone()
        .oneshot(
            Request::post("/api/car/create")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, cookie)
                .body(Body::from(
                    json!({ "title": "Civic", "description": "x", "images": images(1) }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .oneshot(Request::get("/api/auth/signout").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cleared = res.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("access_token=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn openapi_document_and_ui_are_served() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["openapi"].as_str().unwrap().starts_with("3."));
    assert!(body["paths"]["/api/car/create"]["post"].is_object());
    assert!(body["components"]["schemas"]["CreateCarRequest"].is_object());

    let res = app
        .oneshot(Request::get("/api/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/api/docs/openapi.json"));
}
