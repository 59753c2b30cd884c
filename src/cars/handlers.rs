use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::ActiveUser,
    cars::{
        dto::{CarResponse, CreateCarRequest, SearchResponse, UpdateCarRequest},
        query::SearchParams,
        services,
    },
    dto::MessageResponse,
    error::{AppJson, AppPath, AppQuery, AppResult, ErrorResponse},
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/car/get", get(search_cars))
        .route("/car/get/:id", get(get_car))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/car/create", post(create_car))
        .route("/car/update/:id", post(update_car))
        .route("/car/delete/:id", delete(delete_car))
}

// --- handlers ---

#[utoipa::path(
    get,
    path = "/api/car/get",
    tag = "cars",
    params(SearchParams),
    responses(
        (status = 200, description = "One page of matching listings", body = SearchResponse),
        (status = 400, description = "Unsupported sort key or order", body = ErrorResponse),
    )
)]
#[instrument(skip(state))]
pub async fn search_cars(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    let page = services::search_cars(state.cars.as_ref(), params).await?;
    Ok(Json(SearchResponse {
        success: true,
        cars: page.cars,
        has_more: page.has_more,
        next_start_index: page.next_start_index,
    }))
}

#[utoipa::path(
    get,
    path = "/api/car/get/{id}",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "The listing", body = CarResponse),
        (status = 404, description = "Car not found", body = ErrorResponse),
    )
)]
#[instrument(skip(state))]
pub async fn get_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<CarResponse>> {
    let car = services::get_car(state.cars.as_ref(), id).await?;
    Ok(Json(CarResponse {
        success: true,
        car,
        message: None,
    }))
}

#[utoipa::path(
    post,
    path = "/api/car/create",
    tag = "cars",
    request_body = CreateCarRequest,
    responses(
        (status = 201, description = "Listing created, owned by the caller", body = CarResponse),
        (status = 400, description = "Missing field or more than 10 images", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, payload))]
pub async fn create_car(
    State(state): State<AppState>,
    ActiveUser(user_id): ActiveUser,
    AppJson(payload): AppJson<CreateCarRequest>,
) -> AppResult<(StatusCode, Json<CarResponse>)> {
    let car = services::create_car(state.cars.as_ref(), user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CarResponse {
            success: true,
            car,
            message: Some("Car created successfully".into()),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/car/update/{id}",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Listing id")),
    request_body = UpdateCarRequest,
    responses(
        (status = 200, description = "Updated listing", body = CarResponse),
        (status = 404, description = "Car not found or unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, payload))]
pub async fn update_car(
    State(state): State<AppState>,
    ActiveUser(user_id): ActiveUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateCarRequest>,
) -> AppResult<Json<CarResponse>> {
    let car = services::update_car(state.cars.as_ref(), id, user_id, payload).await?;
    Ok(Json(CarResponse {
        success: true,
        car,
        message: Some("Car updated successfully".into()),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/car/delete/{id}",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing deleted", body = MessageResponse),
        (status = 404, description = "Car not found or unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_car(
    State(state): State<AppState>,
    ActiveUser(user_id): ActiveUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete_car(state.cars.as_ref(), id, user_id).await?;
    Ok(Json(MessageResponse::ok("Car deleted successfully")))
}
