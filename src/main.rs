use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_comments::cache::{CommentCache, MemoryCommentCache, RedisCommentCache};
use task_comments::client::CommentsClient;
use task_comments::config::Config;
use task_comments::db::Database;
use task_comments::guard::HttpOwnershipGuard;
use task_comments::service::CommentService;
use task_comments::api;

#[derive(Parser)]
#[command(name = "task-comments")]
#[command(about = "Comment microservice for tasks, with a write-through cache")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides COMMENTS_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port for HTTP API (overrides COMMENTS_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Talk to a running comment service
    Comments {
        /// Base URL of the comment service
        #[arg(long, env = "COMMENTS_URL", default_value = "http://localhost:8001")]
        url: String,

        /// Bearer token of the acting user
        #[arg(long, env = "COMMENTS_TOKEN")]
        token: Option<String>,

        #[command(subcommand)]
        action: CommentAction,
    },
}

#[derive(Subcommand)]
enum CommentAction {
    /// List comments of a task
    List { task_id: String },
    /// Add a comment to a task
    Add {
        task_id: String,
        #[arg(long)]
        user_id: i64,
        content: String,
    },
    /// Replace the text of a comment
    Edit {
        task_id: String,
        comment_id: i64,
        content: String,
    },
    /// Delete one comment
    Delete { task_id: String, comment_id: i64 },
    /// Delete every comment of a task
    Purge { task_id: String },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "task_comments=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = match &config.db_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn build_service(config: &Config) -> anyhow::Result<CommentService> {
    let db = open_database(config)?;

    let cache: Arc<dyn CommentCache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCommentCache::connect(url, config.cache_ttl).await?),
        None => {
            tracing::warn!("No Redis configured, using in-process comment cache");
            Arc::new(MemoryCommentCache::new(config.cache_ttl))
        }
    };

    let guard = HttpOwnershipGuard::new(
        config.require_task_service_url()?,
        config.upstream_timeout,
    )?;

    Ok(
        CommentService::new(Arc::new(db), cache, Arc::new(guard))
            .with_call_timeout(config.upstream_timeout),
    )
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let service = build_service(&config).await?;
    let app = api::create_router(service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Comment service listening on http://{}", config.bind_addr());

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_client(client: CommentsClient, action: CommentAction) -> anyhow::Result<()> {
    let output = match action {
        CommentAction::List { task_id } => {
            serde_json::to_string_pretty(&client.list_comments(&task_id).await?)?
        }
        CommentAction::Add {
            task_id,
            user_id,
            content,
        } => serde_json::to_string_pretty(&client.add_comment(&task_id, user_id, &content).await?)?,
        CommentAction::Edit {
            task_id,
            comment_id,
            content,
        } => serde_json::to_string_pretty(
            &client.update_comment(&task_id, comment_id, &content).await?,
        )?,
        CommentAction::Delete {
            task_id,
            comment_id,
        } => client.delete_comment(&task_id, comment_id).await?.detail,
        CommentAction::Purge { task_id } => client.delete_comments_by_task(&task_id).await?.detail,
    };

    println!("{}", output);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { host, port }) => serve(Config::from_env()?, host, port).await?,
        Some(Commands::Migrate) => {
            let config = Config::from_env()?;
            open_database(&config)?;
            tracing::info!("Migrations applied");
        }
        Some(Commands::Comments { url, token, action }) => {
            run_client(CommentsClient::new(&url, token)?, action).await?
        }
        None => serve(Config::from_env()?, None, None).await?,
    }

    Ok(())
}
