use binarycomp::{api, config::Config, db::init_db, CompEngine, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;
    let port = config.port;

    let pool = init_db(&config.database_path).await?;
    let repo = Arc::new(Repository::new(pool));
    let engine = Arc::new(CompEngine::new(repo.clone(), config.plan.clone()));

    let app = api::create_router(api::AppState::new(repo, engine));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
