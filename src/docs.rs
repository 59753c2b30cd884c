//! OpenAPI description of the REST surface, served under `/api/docs`.

use axum::{response::Html, routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::state::AppState;
use crate::{app, auth, cars, dto, error, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Car Management API",
        description = "Car listings marketplace: accounts, listings and search."
    ),
    paths(
        app::health,
        auth::handlers::signup,
        auth::handlers::signin,
        auth::handlers::external_signin,
        auth::handlers::refresh,
        auth::handlers::signout,
        users::handlers::get_user,
        users::handlers::update_user,
        users::handlers::delete_user,
        users::handlers::user_listings,
        cars::handlers::search_cars,
        cars::handlers::get_car,
        cars::handlers::create_car,
        cars::handlers::update_car,
        cars::handlers::delete_car,
    ),
    components(schemas(
        error::ErrorResponse,
        dto::MessageResponse,
        auth::dto::SignupRequest,
        auth::dto::SigninRequest,
        auth::dto::ExternalSigninRequest,
        auth::dto::RefreshRequest,
        auth::dto::AuthResponse,
        auth::dto::SignupResponse,
        auth::dto::PublicUser,
        users::dto::UpdateUserRequest,
        users::dto::UserResponse,
        cars::repo_types::Car,
        cars::dto::CreateCarRequest,
        cars::dto::UpdateCarRequest,
        cars::dto::CarResponse,
        cars::dto::CarListResponse,
        cars::dto::SearchResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Sign-up, sign-in and sessions"),
        (name = "users", description = "The caller's own account"),
        (name = "cars", description = "Listings"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the secured paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

const SWAGGER_UI: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Car Management API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/api/docs/openapi.json", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/docs", get(|| async { Html(SWAGGER_UI) }))
        .route("/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
