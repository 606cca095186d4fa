use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use gavel::{
    application::{
        comments::CommentFeedService,
        error::AppError,
        feed::SidebarService,
        posts::PostFeedService,
        repos::{
            CommentsRepo, ContestsRepo, OrganizationsRepo, PostsRepo, ProfilesRepo, SessionsRepo,
            StatsRepo, TicketsRepo,
        },
        tickets::TicketFeedService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings);

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "serving feed pages");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> HttpState {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let tickets_repo: Arc<dyn TicketsRepo> = repositories.clone();
    let profiles_repo: Arc<dyn ProfilesRepo> = repositories.clone();
    let organizations_repo: Arc<dyn OrganizationsRepo> = repositories.clone();
    let contests_repo: Arc<dyn ContestsRepo> = repositories.clone();
    let stats_repo: Arc<dyn StatsRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();

    HttpState {
        posts: Arc::new(PostFeedService::new(posts_repo, comments_repo.clone())),
        tickets: Arc::new(TicketFeedService::new(tickets_repo)),
        comments: Arc::new(CommentFeedService::new(comments_repo)),
        sidebar: Arc::new(SidebarService::new(
            stats_repo,
            contests_repo,
            profiles_repo,
            organizations_repo.clone(),
        )),
        sessions: sessions_repo,
        organizations: organizations_repo,
        db: repositories,
        site_domain: Arc::from(settings.server.site_domain.as_str()),
    }
}
