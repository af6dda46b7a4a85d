//! REST-backed [`IdentityProvider`] for identity-toolkit style account
//! services, with highscores stored in a realtime-database style JSON store.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use multitetris_core::identity::{AuthError, IdentityProvider, Profile};
use multitetris_core::player::AccountLink;

use crate::config::IdentityConfig;

pub struct RestIdentity {
    client: reqwest::Client,
    config: IdentityConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: String,
    id_token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Serialize)]
struct HighscoreUpdate {
    score: u64,
}

fn transport(e: reqwest::Error) -> AuthError {
    AuthError::Transport(e.to_string())
}

impl RestIdentity {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn post_account<B: Serialize, R: DeserializeOwned>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<R, AuthError> {
        let url = format!(
            "{}/accounts:{action}",
            self.config.auth_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }
}

/// Decode a success body, or map an `{"error":{"message":CODE}}` body.
async fn read_json<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, AuthError> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;
    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| AuthError::Unexpected(e.to_string()));
    }
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(AuthError::from_code(&body.error.message)),
        Err(_) => Err(AuthError::Unexpected(format!("HTTP {status}"))),
    }
}

impl From<AuthResponse> for Profile {
    fn from(resp: AuthResponse) -> Self {
        let display_name = if resp.display_name.is_empty() {
            resp.email.split('@').next().unwrap_or_default().to_string()
        } else {
            resp.display_name
        };
        Profile {
            account_id: resp.local_id,
            email: resp.email,
            display_name,
            id_token: resp.id_token,
        }
    }
}

impl IdentityProvider for RestIdentity {
    async fn login(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let resp: AuthResponse = self
            .post_account(
                "signInWithPassword",
                &SignInRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        tracing::info!(account_id = %resp.local_id, "Logged in");
        Ok(resp.into())
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Profile, AuthError> {
        let resp: AuthResponse = self
            .post_account(
                "signUp",
                &SignUpRequest {
                    email,
                    password,
                    display_name,
                    return_secure_token: true,
                },
            )
            .await?;
        tracing::info!(account_id = %resp.local_id, "Registered account");
        let mut profile: Profile = resp.into();
        if !display_name.is_empty() {
            profile.display_name = display_name.to_string();
        }
        Ok(profile)
    }

    async fn submit_highscore(&self, account: &AccountLink, score: u64) -> Result<(), AuthError> {
        if self.config.highscore_url.is_empty() {
            return Err(AuthError::Unexpected(
                "identity.highscore_url is not configured".to_string(),
            ));
        }
        let url = format!(
            "{}/{}.json",
            self.config.highscore_url.trim_end_matches('/'),
            account.account_id
        );
        let resp = self
            .client
            .patch(url)
            .query(&[("auth", account.id_token.as_str())])
            .json(&HighscoreUpdate { score })
            .send()
            .await
            .map_err(transport)?;
        let _: serde_json::Value = read_json(resp).await?;
        tracing::info!(account_id = %account.account_id, score, "Highscore submitted");
        Ok(())
    }
}
