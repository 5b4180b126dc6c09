use tower_sessions::Session;

use crate::AppResult;

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// Account id of the signed-in user, if any.
pub async fn current_user(session: &Session) -> AppResult<Option<String>> {
    Ok(session.get::<String>(USER_ID).await?)
}

pub async fn sign_in(session: &Session, account_id: &str) -> AppResult<()> {
    session.insert(USER_ID, account_id).await?;
    Ok(())
}
