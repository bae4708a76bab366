use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::FetchError;

/// OAuth2 client-credentials grant against a token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ClientCredentials {
    /// Exchange the client id/secret for a bearer access token.
    #[instrument(level = "debug", skip(self, client), fields(token_url = %self.token_url))]
    pub async fn access_token(&self, client: &Client) -> Result<String, FetchError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        let resp = client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Auth(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Auth(format!("unreadable token response: {e}")))?;
        debug!(
            token_type = token.token_type.as_deref().unwrap_or("bearer"),
            expires_in = ?token.expires_in,
            "obtained access token"
        );
        Ok(token.access_token)
    }
}
