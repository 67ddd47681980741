//! Authentication and user administration endpoints

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::UserInfo;
use crate::client::{ApiClient, ApiError, OutboundRequest};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ApiClient {
    /// Authenticate and start a session.
    ///
    /// A 401 here means bad credentials and does not trigger session expiry.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, ApiError> {
        let request = OutboundRequest::post("/api/auth/login")
            .json(&LoginRequest { username, password })?
            .without_session_teardown();

        let response: LoginResponse = self.send(request).await?;

        self.session()
            .login(response.access_token, response.user.clone())
            .map_err(|e| self.report_session_error(e))?;

        info!("Logged in as {}", response.user.username);
        Ok(response.user)
    }

    /// End the local session. The backend keeps no session state to revoke.
    pub fn logout(&self) {
        self.session().logout();
    }

    pub async fn current_user(&self) -> Result<UserInfo, ApiError> {
        self.send(OutboundRequest::get("/api/auth/me")).await
    }

    /// Fetch the current user and replace the one held by the session
    pub async fn refresh_current_user(&self) -> Result<UserInfo, ApiError> {
        let user = self.current_user().await?;

        self.session()
            .replace_user(user.clone())
            .map_err(|e| self.report_session_error(e))?;

        Ok(user)
    }

    pub async fn list_users(&self, page: Option<u32>, size: Option<u32>) -> Result<Vec<UserInfo>, ApiError> {
        let request = OutboundRequest::get("/api/auth/users")
            .param_opt("page", page)
            .param_opt("size", size);
        self.send(request).await
    }

    pub async fn create_user(&self, user: &UserCreate) -> Result<UserInfo, ApiError> {
        self.send(OutboundRequest::post("/api/auth/users").json(user)?).await
    }

    pub async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<UserInfo, ApiError> {
        let request = OutboundRequest::put("/api/auth/users").segment(user_id).json(update)?;
        self.send(request).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.execute(OutboundRequest::delete("/api/auth/users").segment(user_id))
            .await
    }
}
