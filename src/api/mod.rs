use crate::api::handlers::{auth, health, me, root, users};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{net::TcpListener, signal, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub(crate) mod email;
pub(crate) mod error;
pub(crate) mod handlers;
mod openapi;

pub use email::EmailSender;
pub use handlers::auth::{AuthConfig, RateLimiter};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: auth::AuthConfig,
    rate_limiter: Arc<dyn auth::RateLimiter>,
    email_sender: Arc<dyn email::EmailSender>,
    cors_origins: Vec<String>,
) -> Result<()> {
    let started = root::ServerStart(Instant::now());

    // Shut down on ctrl-c or SIGTERM so in-flight requests can drain.
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_shutdown_watcher(tx);

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let cookie_origin = auth_config.public_base_url().to_string();
    let auth_state = Arc::new(auth::AuthState::new(auth_config, rate_limiter, email_sender));

    let origins = if cors_origins.is_empty() {
        vec![frontend_origin(&cookie_origin)?]
    } else {
        cors_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim())
                    .with_context(|| format!("Invalid CORS origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?
    };
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true);

    let app = Router::new()
        .merge(openapi::swagger_ui())
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .route("/auth/register", post(auth::register::register))
        .route("/auth/login", post(auth::login::login))
        .route("/auth/logout", post(auth::login::logout))
        .route(
            "/auth/change-password",
            post(auth::password::change_password),
        )
        .route(
            "/auth/forgot-password",
            post(auth::password::forgot_password),
        )
        .route("/auth/reset-password", post(auth::password::reset_password))
        .route(
            "/auth/reset-password/validate",
            get(auth::password::validate_reset_token),
        )
        .route(
            "/auth/request-verify",
            post(auth::verification::request_verify),
        )
        .route("/auth/verify-email", post(auth::verification::verify_email))
        .route(
            "/auth/verify-email/validate",
            get(auth::verification::validate_verify_token),
        )
        .route("/users/me", get(me::read_me).patch(me::update_me))
        .route("/admin/users", get(users::list_users))
        .route(
            "/admin/users/:user_id",
            axum::routing::patch(users::update_user).delete(users::delete_user),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state))
                .layer(Extension(started))
                .layer(Extension(pool)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    // ConnectInfo carries the peer address for the rate limiter's fallback
    // when no proxy headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(async move {
            rx.recv().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn spawn_shutdown_watcher(tx: mpsc::UnboundedSender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {err}");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => error!("Failed to listen for SIGTERM: {err}"),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        let _ = tx.send(());
    });
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(public_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(public_base_url)
        .with_context(|| format!("Invalid public base URL: {public_base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Public base URL must include a valid host: {public_base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
