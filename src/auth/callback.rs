use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    db,
    profiles::{guard, resolver},
    session::{self, CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    AppError, AppResult,
};

use super::{create_account, find_account_by_email, notice_redirect, ClientProvider, Clients};

#[derive(Deserialize)]
pub(crate) struct CallbackQuery {
    pub(crate) state: Option<String>,
    pub(crate) code: Option<String>,
}

#[derive(Deserialize)]
struct UserInfo {
    email: Option<String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn callback(
    Path(provider): Path<ClientProvider>,
    Query(CallbackQuery { state, code }): Query<CallbackQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Response> {
    let state = CsrfToken::new(state.ok_or_else(|| anyhow::anyhow!("OAuth: without state"))?);
    let code = AuthorizationCode::new(code.ok_or_else(|| anyhow::anyhow!("OAuth: without code"))?);

    let Some(stored_state) = session.get::<String>(CSRF_STATE).await? else {
        return Err(AppError::Internal(anyhow::anyhow!("no csrf_state in session")));
    };
    if state.secret().as_str() != stored_state.as_str() {
        return Err(AppError::Internal(anyhow::anyhow!("csrf tokens don't match")));
    }

    let Some(pkce_verifier) = session.get::<String>(PKCE_VERIFIER).await? else {
        return Err(AppError::Internal(anyhow::anyhow!("no pkce_verifier in session")));
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let info: UserInfo = http_client
        .get(provider.userinfo_url())
        .bearer_auth(token_result.access_token().secret())
        .header(reqwest::header::USER_AGENT, "polymat")
        .send()
        .await?
        .json()
        .await?;

    let Some(email) = info.email.filter(|e| !e.is_empty()) else {
        return Ok(notice_redirect("/login", "no_email"));
    };

    let account_id = match find_account_by_email(&db_pool, &email).await? {
        Some(account) => account.id,
        // new identity: account now, profile in signup level 2
        None => create_account(&db_pool, &email, None, provider.as_str()).await?,
    };

    session::sign_in(&session, &account_id).await?;
    sqlx::query("UPDATE users SET last_login=? WHERE id=?")
        .bind(db::now())
        .bind(&account_id)
        .execute(&db_pool)
        .await?;

    // known email with a complete profile lands on its canonical route,
    // anything else continues profile completion
    let status = resolver::resolve(&db_pool, Some(&account_id)).await;
    if let Some(to) = guard::redirect_for(&status, "/oauth/callback") {
        return Ok(Redirect::to(&to).into_response());
    }

    let return_url: Option<String> = session.get(RETURN_URL).await?;
    Ok(Redirect::to(return_url.as_deref().unwrap_or("/")).into_response())
}
