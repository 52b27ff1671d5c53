//! talentvote server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router, middleware};
use talentvote_api::{
    TrustedProxies, middleware::AppState, rate_limit::RateLimiterState, router as api_router,
};
use talentvote_common::Config;
use talentvote_core::{
    AuthorizeNetGateway, CompetitionService, ContestantService, EligibilityService,
    FirebaseIdentityVerifier, InvitationService, LedgerService, NoOpMailer, PaymentGateway,
    PurchaseService, PurchaseSettings, ReceiptMailer, SessionService, SmtpReceiptMailer,
    VotePackageService, VoteRecorder, VotingService,
};
use talentvote_db::repositories::{
    CompetitionRepository, ContestantRepository, InvitationRepository, PaymentAuditRepository,
    UserRepository, VotePackageRepository, VotePurchaseRepository, VoteRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle rate limit windows are dropped.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talentvote=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting talentvote server...");

    // Load configuration
    let config = Config::load()?;
    let timezone = config.voting.tz()?;

    // Connect to database
    let db = talentvote_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    talentvote_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let competition_repo = CompetitionRepository::new(Arc::clone(&db));
    let contestant_repo = ContestantRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));
    let package_repo = VotePackageRepository::new(Arc::clone(&db));
    let purchase_repo = VotePurchaseRepository::new(Arc::clone(&db));
    let audit_repo = PaymentAuditRepository::new(Arc::clone(&db));
    let invitation_repo = InvitationRepository::new(Arc::clone(&db));

    // External collaborators
    let verifier = Arc::new(FirebaseIdentityVerifier::new(
        config.identity.project_id.clone(),
    )?);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(AuthorizeNetGateway::new(&config.payment)?);
    let mailer: Arc<dyn ReceiptMailer> = if config.email.enabled {
        Arc::new(SmtpReceiptMailer::new(&config.email)?)
    } else {
        info!("Email disabled, purchase receipts will not be sent");
        Arc::new(NoOpMailer)
    };

    // Initialize services
    let recorder = VoteRecorder::new(vote_repo.clone(), timezone);
    let eligibility = EligibilityService::new(
        competition_repo.clone(),
        contestant_repo.clone(),
        vote_repo.clone(),
        timezone,
    );

    let purchase_service = PurchaseService::new(
        competition_repo.clone(),
        contestant_repo.clone(),
        package_repo.clone(),
        purchase_repo.clone(),
        audit_repo,
        recorder.clone(),
        gateway,
        mailer,
        PurchaseSettings {
            currency: config.payment.currency.clone(),
            sales_tax_bps: config.payment.sales_tax_bps,
            max_individual_votes: i64::from(config.voting.max_individual_votes),
        },
    );

    let state = AppState {
        session_service: SessionService::new(verifier, user_repo),
        competition_service: CompetitionService::new(
            competition_repo.clone(),
            contestant_repo.clone(),
            config.voting.default_max_votes_per_day,
        ),
        contestant_service: ContestantService::new(
            competition_repo.clone(),
            contestant_repo.clone(),
        ),
        voting_service: VotingService::new(eligibility, recorder),
        purchase_service,
        ledger_service: LedgerService::new(
            competition_repo.clone(),
            contestant_repo,
            purchase_repo,
            vote_repo,
        ),
        package_service: VotePackageService::new(competition_repo, package_repo),
        invitation_service: InvitationService::new(invitation_repo),
    };

    // Rate limiting
    let rate_limiter = RateLimiterState::new();
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup().await;
        }
    });

    // Build router
    let app = Router::new()
        .nest("/api", api_router(rate_limiter.clone()))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            talentvote_api::rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            talentvote_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(TrustedProxies::new(
            config.server.trusted_proxies.iter().copied(),
        )))
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
