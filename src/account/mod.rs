//! Account and authentication operations.
//!
//! Typed wrappers over [`ApiClient`] for the signup/login/profile endpoints.
//! The login exchange itself never touches the credential store: the server
//! sets the session cookie on the response and the client's shared jar
//! captures it.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{ApiClient, ApiError};

/// User role as serialized by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Administrative user.
    Admin,
    /// Standard user.
    User,
}

/// Payload for `POST /api/auth/signup`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    /// Login email address.
    pub email: String,
    /// Plain-text password (sent over the transport only, never logged).
    pub password: String,
    /// Display name.
    pub name: String,
    /// Company the user belongs to.
    pub company: String,
    /// Requested role.
    pub role: Role,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("company", &self.company)
            .field("role", &self.role)
            .finish()
    }
}

/// Payload for `POST /api/auth/login`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Login email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Response shape shared by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Server-assigned user id.
    pub user_id: i64,
    /// Login email address.
    pub email: String,
    /// Granted role.
    pub role: Role,
    /// Optional informational message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Partial profile update for `PUT /api/users/{id}`.
///
/// Absent fields are omitted from the payload and left unchanged server-side.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New email, when changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New password, when changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New display name, when changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New company, when changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// New role, when changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("company", &self.company)
            .field("role", &self.role)
            .finish()
    }
}

/// Payload for `POST /api/users/{id}/change-password`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

/// Payload for `DELETE /api/users/{id}` password confirmation.
#[derive(Clone, Serialize)]
struct DeleteAccountRequest {
    password: String,
}

/// Account operations over a borrowed client.
#[derive(Debug, Clone, Copy)]
pub struct AccountService<'a> {
    client: &'a ApiClient,
}

impl<'a> AccountService<'a> {
    /// Creates a service over the given client.
    #[must_use]
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`], typically `ValidationFailed` for rejected input.
    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.client.post("/api/auth/signup", request).await
    }

    /// Authenticates and establishes a session.
    ///
    /// On success the server's `Set-Cookie` lands in the client's jar; the
    /// next request will carry the credential automatically.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`], typically `Unauthorized` for bad credentials.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.client.post("/api/auth/login", request).await
    }

    /// Ends the session.
    ///
    /// The server call is best-effort: a failure is logged, never propagated,
    /// and the local credential is cleared either way.
    pub async fn logout(&self) {
        if let Err(error) = self
            .client
            .post_empty::<IgnoredAny>("/api/auth/logout")
            .await
        {
            warn!(%error, "logout request failed; clearing local session anyway");
        }
        self.client.end_session();
    }

    /// Fetches the authenticated user's identity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when no valid session exists.
    pub async fn current_user(&self) -> Result<AuthResponse, ApiError> {
        self.client.get("/api/auth/me").await
    }

    /// Applies a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on rejection or transport failure.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<AuthResponse, ApiError> {
        self.client
            .put(&format!("/api/users/{user_id}"), update)
            .await
    }

    /// Changes the account password.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on rejection or transport failure.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let request = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let _: IgnoredAny = self
            .client
            .post(&format!("/api/users/{user_id}/change-password"), &request)
            .await?;
        Ok(())
    }

    /// Deletes the account after password confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on rejection or transport failure.
    pub async fn delete_account(&self, user_id: i64, password: &str) -> Result<(), ApiError> {
        let request = DeleteAccountRequest {
            password: password.to_string(),
        };
        let _: IgnoredAny = self
            .client
            .delete_with_body(&format!("/api/users/{user_id}"), &request)
            .await?;
        Ok(())
    }

    /// Whether a credential is currently stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.is_authenticated()
    }
}
