use axum::{
    debug_handler,
    extract::State,
    response::Redirect,
    routing::get,
    Router,
};
use polymat::{
    auth, db, profiles, session, signup, spaces, storage, AppResult, AppState, Config,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, Session, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load();

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(&config.database_url)
        .await?;
    db::init_db(&db_pool).await?;

    let clients = auth::Clients::from_file(&config.client_secret_path, &config.public_url);

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_minutes,
        )));

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        db_pool,
        clients,
        channels: spaces::SpaceChannels::default(),
        config,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/files/{name}", get(storage::serve))
        .merge(auth::router())
        .merge(signup::router())
        .nest("/space", spaces::router())
        .merge(profiles::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

/// `/` just routes to wherever the session belongs.
#[debug_handler(state = AppState)]
async fn index(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Redirect> {
    let account_id = session::current_user(&session).await?;
    let status = profiles::resolver::resolve(&db_pool, account_id.as_deref()).await;
    let to = profiles::guard::redirect_for(&status, "/").unwrap_or_else(|| "/login".to_string());
    Ok(Redirect::to(&to))
}
