use std::fmt;

use oauth2::{basic::BasicClient, AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use serde::Deserialize;
use tracing::warn;

type HappyClient = Client<
    oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
    oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::StandardRevocableToken,
    oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub fn as_str(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    pub(crate) fn userinfo_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://www.googleapis.com/oauth2/v2/userinfo",
            Github => "https://api.github.com/user",
        }
    }

    pub(crate) fn scopes(&self) -> &'static [&'static str] {
        use ClientProvider::*;
        match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        }
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Deserialize, Default)]
struct SecretFile {
    google: Option<ProviderSecret>,
    github: Option<ProviderSecret>,
}

#[derive(Deserialize)]
struct ProviderSecret {
    client_id: String,
    client_secret: String,
}

#[derive(Clone)]
pub struct Clients {
    google_client: Option<HappyClient>,
    github_client: Option<HappyClient>,
}

impl Clients {
    pub fn disabled() -> Self {
        Clients {
            google_client: None,
            github_client: None,
        }
    }

    /// Reads provider credentials from a JSON file. A missing or malformed
    /// file disables OAuth sign-in rather than failing startup.
    pub fn from_file(path: &str, public_url: &str) -> Clients {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("no OAuth client secrets at {path} ({e}), OAuth sign-in disabled");
                return Clients::disabled();
            }
        };

        let file: SecretFile = match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!("could not parse {path} ({e}), OAuth sign-in disabled");
                return Clients::disabled();
            }
        };

        Clients {
            google_client: file.google.map(|secret| {
                build_client(
                    secret,
                    "https://accounts.google.com/o/oauth2/auth",
                    "https://oauth2.googleapis.com/token",
                    &format!("{public_url}/oauth/google/callback"),
                )
            }),
            github_client: file.github.map(|secret| {
                build_client(
                    secret,
                    "https://github.com/login/oauth/authorize",
                    "https://github.com/login/oauth/access_token",
                    &format!("{public_url}/oauth/github/callback"),
                )
            }),
        }
    }

    pub fn get_client(&self, provider: ClientProvider) -> crate::AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }
        .ok_or_else(|| {
            crate::AppError::Internal(anyhow::anyhow!("OAuth provider {provider} keys not supplied"))
        })
    }
}

fn build_client(secret: ProviderSecret, auth_url: &str, token_url: &str, redirect_url: &str) -> HappyClient {
    // the URLs are compile-time constants apart from redirect, which comes
    // from validated config
    BasicClient::new(ClientId::new(secret.client_id))
        .set_client_secret(ClientSecret::new(secret.client_secret))
        .set_auth_uri(AuthUrl::new(auth_url.to_string()).expect("static auth url"))
        .set_token_uri(TokenUrl::new(token_url.to_string()).expect("static token url"))
        .set_redirect_uri(RedirectUrl::new(redirect_url.to_string()).expect("redirect url"))
}
