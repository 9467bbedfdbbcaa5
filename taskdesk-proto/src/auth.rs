//! Authentication payloads for the `/auth` endpoints.

use serde::{Deserialize, Serialize};

/// An authenticated user as described by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier (matches `Task::assignee_id`).
    pub id: String,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Role name, e.g. `USER` or `ADMIN`.
    pub role: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password, sent over the API transport.
    pub password: String,
}

/// Successful `POST /auth/login` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque bearer credential.
    pub token: String,
    /// The user the token belongs to.
    pub user: User,
}

/// Successful `POST /auth/refresh` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Replacement bearer credential.
    pub token: String,
}
