use serde::Deserialize;
use std::time::Duration;

use crate::errors::AuthError;

const AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Who the identity provider says the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send a browser that has no authorization code yet.
    fn authorization_url(&self) -> String;

    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthError>;
}

/// Google OAuth 2.0 authorization-code flow.
pub struct GoogleIdentity {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
}

impl GoogleIdentity {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and `GOOGLE_REDIRECT_URI`, if all are set.
    pub fn from_env() -> Option<Result<Self, AuthError>> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let client_id = var("GOOGLE_CLIENT_ID")?;
        let client_secret = var("GOOGLE_CLIENT_SECRET")?;
        let redirect_uri = var("GOOGLE_REDIRECT_URI")?;
        Some(Self::new(client_id, client_secret, redirect_uri))
    }
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(AuthError::Rejected { status, body })
}

#[async_trait::async_trait]
impl IdentityProvider for GoogleIdentity {
    fn authorization_url(&self) -> String {
        let mut url = reqwest::Url::parse(AUTHORIZATION_URL).expect("static authorization url");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid profile email")
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true");
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, AuthError> {
        let res = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let token: TokenResponse = check(res).await?.json().await?;
        let access_token = token
            .access_token
            .ok_or(AuthError::MissingClaim("access_token"))?;

        let res = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        let info: UserInfo = check(res).await?.json().await?;

        Ok(Identity {
            email: info.email.ok_or(AuthError::MissingClaim("email"))?,
            name: info.name,
        })
    }
}
