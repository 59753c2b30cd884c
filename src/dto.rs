use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plain acknowledgement body, e.g. after a delete or sign-out.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
