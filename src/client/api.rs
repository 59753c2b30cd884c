use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::dto::{
    AuthResponse, ExternalSigninRequest, PublicUser, RefreshRequest, SigninRequest, SignupRequest,
    SignupResponse,
};
use crate::cars::dto::{
    CarListResponse, CarResponse, CreateCarRequest, SearchResponse, UpdateCarRequest,
};
use crate::cars::query::SearchParams;
use crate::cars::repo_types::Car;
use crate::dto::MessageResponse;
use crate::users::dto::{UpdateUserRequest, UserResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reported by the API; `message` is its `error` field verbatim.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Typed client for the marketplace REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<T>().await?);
        }
        let message = match res.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Api { status, message })
    }

    // --- auth ---

    pub async fn signup(&self, req: &SignupRequest) -> Result<SignupResponse, ClientError> {
        self.send(self.http.post(self.url("/auth/signup")).json(req)).await
    }

    /// Signs in and keeps the access token for later calls.
    pub async fn signin(&mut self, req: &SigninRequest) -> Result<AuthResponse, ClientError> {
        let res: AuthResponse = self.send(self.http.post(self.url("/auth/signin")).json(req)).await?;
        self.token = Some(res.access_token.clone());
        Ok(res)
    }

    pub async fn external_signin(
        &mut self,
        req: &ExternalSigninRequest,
    ) -> Result<AuthResponse, ClientError> {
        let res: AuthResponse = self.send(self.http.post(self.url("/auth/google")).json(req)).await?;
        self.token = Some(res.access_token.clone());
        Ok(res)
    }

    pub async fn refresh(&mut self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let res: AuthResponse = self.send(self.http.post(self.url("/auth/refresh")).json(&body)).await?;
        self.token = Some(res.access_token.clone());
        Ok(res)
    }

    pub async fn signout(&mut self) -> Result<MessageResponse, ClientError> {
        let res = self.send(self.http.get(self.url("/auth/signout"))).await?;
        self.token = None;
        Ok(res)
    }

    // --- users ---

    pub async fn get_user(&self, id: Uuid) -> Result<PublicUser, ClientError> {
        let res: UserResponse = self.send(self.http.get(self.url(&format!("/user/{id}")))).await?;
        Ok(res.user)
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<PublicUser, ClientError> {
        let res: UserResponse = self
            .send(self.http.post(self.url(&format!("/user/update/{id}"))).json(req))
            .await?;
        Ok(res.user)
    }

    pub async fn delete_user(&mut self, id: Uuid) -> Result<MessageResponse, ClientError> {
        let res = self
            .send(self.http.delete(self.url(&format!("/user/delete/{id}"))))
            .await?;
        self.token = None;
        Ok(res)
    }

    pub async fn user_listings(&self, id: Uuid) -> Result<Vec<Car>, ClientError> {
        let res: CarListResponse = self
            .send(self.http.get(self.url(&format!("/user/listings/{id}"))))
            .await?;
        Ok(res.cars)
    }

    // --- cars ---

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse, ClientError> {
        self.send(self.http.get(self.url("/car/get")).query(params)).await
    }

    pub async fn get_car(&self, id: Uuid) -> Result<Car, ClientError> {
        let res: CarResponse = self.send(self.http.get(self.url(&format!("/car/get/{id}")))).await?;
        Ok(res.car)
    }

    pub async fn create_car(&self, req: &CreateCarRequest) -> Result<Car, ClientError> {
        let res: CarResponse = self.send(self.http.post(self.url("/car/create")).json(req)).await?;
        Ok(res.car)
    }

    pub async fn update_car(&self, id: Uuid, req: &UpdateCarRequest) -> Result<Car, ClientError> {
        let res: CarResponse = self
            .send(self.http.post(self.url(&format!("/car/update/{id}"))).json(req))
            .await?;
        Ok(res.car)
    }

    pub async fn delete_car(&self, id: Uuid) -> Result<MessageResponse, ClientError> {
        self.send(self.http.delete(self.url(&format!("/car/delete/{id}"))))
            .await
    }
}
