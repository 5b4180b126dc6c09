use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use oauth2::{CsrfToken, PkceCodeChallenge, Scope};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    AppResult,
};

use super::{ClientProvider, Clients};

#[derive(Deserialize)]
pub(crate) struct AuthorizeQuery {
    pub(crate) return_url: Option<String>,
}

/// Kicks off the PKCE authorization-code flow; identity providers supply the
/// credentials, so OAuth entry skips signup level 1 entirely.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn authorize(
    Path(provider): Path<ClientProvider>,
    Query(AuthorizeQuery { return_url }): Query<AuthorizeQuery>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let client = clients.get_client(provider)?;

    let (pkce_code_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let mut request = client
        .authorize_url(CsrfToken::new_random)
        .set_pkce_challenge(pkce_code_challenge);
    for scope in provider.scopes() {
        request = request.add_scope(Scope::new(scope.to_string()));
    }
    let (authorize_url, csrf_state) = request.url();

    session.insert(CSRF_STATE, csrf_state.secret()).await?;
    session.insert(PKCE_VERIFIER, pkce_verifier.secret()).await?;
    if let Some(return_url) = return_url {
        session.insert(RETURN_URL, return_url).await?;
    }

    Ok(Redirect::to(authorize_url.as_str()).into_response())
}
