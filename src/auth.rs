// src/auth.rs
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::core::FsOps;
use crate::environment::AuthSettings;
use crate::error::AuthError;
use crate::session::{AuthEvent, AuthUser, IdentityProvider};

const TOKEN_ENDPOINT: &str = "/auth/v1/token";
const SIGNUP_ENDPOINT: &str = "/auth/v1/signup";
const LOGOUT_ENDPOINT: &str = "/auth/v1/logout";
const AUTH_TIMEOUT_SECS: u64 = 30;
/// Tokens this close to expiry are refreshed up front.
const EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct UserMetadata {
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64, // Expiration timestamp
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Claims {
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp <= now + EXPIRY_LEEWAY_SECS
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.unwrap_or_default(),
            full_name: claims.user_metadata.full_name,
        }
    }
}

/// Tokens persisted between CLI runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Decode the access token's claims, verifying HS256 when a secret is given.
pub fn decode_claims(token: &str, jwt_secret: Option<&str>) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is handled by the caller so an expired token can still be refreshed
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let key = match jwt_secret {
        Some(secret) => DecodingKey::from_secret(secret.as_bytes()),
        None => {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        }
    };

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Pull `access_token`/`refresh_token` out of an OAuth redirect URL.
///
/// The fragment is checked before the query string.
pub fn parse_callback_url(url: &str) -> Result<StoredTokens, AuthError> {
    let parsed = Url::parse(url).map_err(|_| AuthError::MissingCallbackToken)?;

    let mut sources = Vec::new();
    if let Some(fragment) = parsed.fragment() {
        sources.push(fragment.to_string());
    }
    if let Some(query) = parsed.query() {
        sources.push(query.to_string());
    }

    for source in sources {
        let pairs = form_pairs(&source);
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };

        if let Some(description) = get("error_description").or_else(|| get("error")) {
            return Err(AuthError::Provider {
                status: 400,
                body: description,
            });
        }
        if let Some(access_token) = get("access_token") {
            return Ok(StoredTokens {
                access_token,
                refresh_token: get("refresh_token"),
            });
        }
    }

    Err(AuthError::MissingCallbackToken)
}

/// True when `location` looks like an OAuth redirect back into the app.
pub fn is_callback_location(location: &str) -> bool {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    path.ends_with("/auth/callback") || location.contains("access_token=")
}

fn form_pairs(encoded: &str) -> Vec<(String, String)> {
    // Reuse Url's form decoding by parking the pairs in a query string
    match Url::parse(&format!("http://callback.local/?{}", encoded)) {
        Ok(url) => url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// GoTrue-compatible hosted identity provider.
pub struct HostedAuthProvider {
    client: Client,
    settings: AuthSettings,
    tokens: Mutex<Option<StoredTokens>>,
    events: broadcast::Sender<AuthEvent>,
}

impl HostedAuthProvider {
    pub fn new(settings: AuthSettings) -> Result<Self, AuthError> {
        if !settings.is_configured() {
            return Err(AuthError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .build()?;
        let (events, _) = broadcast::channel(32);

        Ok(Self {
            client,
            settings: AuthSettings {
                url: settings.url.trim_end_matches('/').to_string(),
                ..settings
            },
            tokens: Mutex::new(None),
            events,
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    fn user_from_token(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        Ok(decode_claims(access_token, self.settings.jwt_secret.as_deref())?.into())
    }

    fn emit(&self, event: AuthEvent) {
        // No listener is fine
        let _ = self.events.send(event);
    }

    async fn post(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, AuthError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.settings.url, endpoint))
            .query(query)
            .header("apikey", &self.settings.anon_key)
            .json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Auth provider returned {} for {}: {}", status, endpoint, body);
            return Err(AuthError::Provider { status, body });
        }
        Ok(response)
    }

    async fn request_tokens(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<StoredTokens, AuthError> {
        let response = self
            .post(TOKEN_ENDPOINT, &[("grant_type", grant_type)], None, body)
            .await?;
        let tokens: TokenResponse = response.json().await?;

        match tokens.access_token {
            Some(access_token) => Ok(StoredTokens {
                access_token,
                refresh_token: tokens.refresh_token,
            }),
            None => Err(AuthError::Provider {
                status: 200,
                body: "Token response carries no access token".to_string(),
            }),
        }
    }

    async fn current_tokens(&self) -> Result<Option<StoredTokens>, AuthError> {
        let mut guard = self.tokens.lock().await;
        if guard.is_none() {
            *guard = self.load_tokens().await?;
        }
        Ok(guard.clone())
    }

    async fn load_tokens(&self) -> Result<Option<StoredTokens>, AuthError> {
        let path = &self.settings.session_file;
        if !path.exists() {
            return Ok(None);
        }

        let content = FsOps::read_file_safe(path)
            .await
            .map_err(|e| AuthError::Storage(format!("{:#}", e)))?;
        match serde_json::from_str(&content) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn store_tokens(&self, tokens: StoredTokens) -> Result<(), AuthError> {
        let content =
            serde_json::to_string_pretty(&tokens).map_err(|e| AuthError::Storage(e.to_string()))?;
        FsOps::write_file_safe(&self.settings.session_file, &content)
            .await
            .map_err(|e| AuthError::Storage(format!("{:#}", e)))?;
        *self.tokens.lock().await = Some(tokens);
        Ok(())
    }

    async fn forget_tokens(&self) {
        *self.tokens.lock().await = None;
        FsOps::remove_file_quiet(&self.settings.session_file).await;
    }

    async fn sign_in_with(&self, tokens: StoredTokens) -> Result<AuthUser, AuthError> {
        let user = self.user_from_token(&tokens.access_token)?;
        self.store_tokens(tokens).await?;
        self.emit(AuthEvent::SignedIn(Some(user.clone())));
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for HostedAuthProvider {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        let Some(tokens) = self.current_tokens().await? else {
            return Ok(None);
        };

        let claims = decode_claims(&tokens.access_token, self.settings.jwt_secret.as_deref())?;
        if !claims.is_expired(chrono::Utc::now().timestamp()) {
            return Ok(Some(claims.into()));
        }

        let Some(refresh_token) = tokens.refresh_token else {
            debug!("Access token expired and no refresh token stored");
            self.forget_tokens().await;
            return Ok(None);
        };

        info!("Access token expired, refreshing");
        let refreshed = match self
            .request_tokens("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(tokens) => tokens,
            Err(e) if e.rejects_grant() => {
                info!("Refresh token rejected, dropping stored session");
                self.forget_tokens().await;
                return Err(e);
            }
            Err(e) => {
                warn!("Token refresh failed, keeping stored session: {}", e);
                return Err(e);
            }
        };

        let user = self.user_from_token(&refreshed.access_token)?;
        self.store_tokens(refreshed).await?;
        self.emit(AuthEvent::TokenRefreshed);
        Ok(Some(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let tokens = self
            .request_tokens("password", json!({ "email": email, "password": password }))
            .await?;
        self.sign_in_with(tokens).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Option<AuthUser>, AuthError> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });
        let response = self.post(SIGNUP_ENDPOINT, &[], None, body).await?;
        let tokens: TokenResponse = response.json().await?;

        match tokens.access_token {
            Some(access_token) => {
                let user = self
                    .sign_in_with(StoredTokens {
                        access_token,
                        refresh_token: tokens.refresh_token,
                    })
                    .await?;
                Ok(Some(user))
            }
            None => {
                info!("Sign-up for {} awaits email confirmation", email);
                self.emit(AuthEvent::SignedIn(None));
                Ok(None)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let tokens = self.current_tokens().await.unwrap_or_default();
        self.forget_tokens().await;
        self.emit(AuthEvent::SignedOut);

        match tokens {
            Some(tokens) => self
                .post(LOGOUT_ENDPOINT, &[], Some(&tokens.access_token), json!({}))
                .await
                .map(|_| ()),
            None => Ok(()),
        }
    }

    /// Stores the redirect's tokens and announces the sign-in.
    async fn complete_callback(&self, url: &str) -> Result<AuthUser, AuthError> {
        let tokens = parse_callback_url(url)?;
        let user = self.sign_in_with(tokens).await?;
        info!("OAuth callback completed for {}", user.email);
        Ok(user)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
