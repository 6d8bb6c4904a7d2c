use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use manga_tracker::client::TrackerClient;
use manga_tracker::config::{self, ServerConfig, StoredSession, DEFAULT_PORT};
use manga_tracker::models::{CreateChapterInput, CreateMangaInput, CreateSiteInput, Credentials};
use manga_tracker::registry::{ToggleOutcome, Tracker};
use manga_tracker::session::{SessionHandle, SessionProvider};
use manga_tracker::{api, db, render};

#[derive(Parser)]
#[command(name = "mtrk")]
#[command(about = "Track fansub sites, manga titles and the chapters you have read")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tracker API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// SQLite database file (defaults to MANGA_TRACKER_DB or the data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage fansub sites
    #[command(subcommand)]
    Site(SiteCommand),
    /// Manage tracked mangas
    #[command(subcommand)]
    Manga(MangaCommand),
    /// Manage the chapters of a manga
    #[command(subcommand)]
    Chapter(ChapterCommand),
    /// Show site and manga counts
    Stats,
}

#[derive(Subcommand)]
enum SiteCommand {
    Add {
        name: String,
        url: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Rm { id: Uuid },
}

#[derive(Subcommand)]
enum MangaCommand {
    Add {
        title: String,
        /// Fansub site the manga is read on
        #[arg(long)]
        site: Uuid,
    },
    List,
    /// Switch between active and paused
    Toggle { id: Uuid },
    Rm { id: Uuid },
}

#[derive(Subcommand)]
enum ChapterCommand {
    Add {
        manga_id: Uuid,
        number: String,
        #[arg(long)]
        title: Option<String>,
        /// Release date (YYYY-MM-DD)
        #[arg(long)]
        release_date: Option<NaiveDate>,
    },
    List { manga_id: Uuid },
    /// Switch between read and unread
    Toggle { manga_id: Uuid, id: Uuid },
    Rm { manga_id: Uuid, id: Uuid },
}

/// Initialize tracing with output to stdout (server) or stderr (client commands)
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "manga_tracker=debug,tower_http=debug".into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Commands::Serve { .. });
    init_tracing(use_stderr);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve { port, db } => serve(port, db).await,
        Commands::Signup { email, password } => {
            let remote = Remote::new(config::api_url(), SessionHandle::new());
            let user = remote.provider.sign_up(Credentials::new(email, password)).await?;
            println!(
                "Account created for {}. Run `mtrk login` to sign in.",
                user.email
            );
            Ok(())
        }
        Commands::Login { email, password } => {
            let api_url = config::api_url();
            let remote = Remote::new(api_url.clone(), SessionHandle::new());
            let session = remote
                .provider
                .sign_in(Credentials::new(email, password))
                .await?;

            StoredSession {
                api_url,
                email: session.user.email.clone(),
                access_token: session.access_token,
            }
            .save()?;
            println!("Signed in as {}", session.user.email);
            Ok(())
        }
        Commands::Logout => logout().await,
        Commands::Whoami => {
            let remote = Remote::resume().await?;
            if let Some(user) = remote.provider.current_user() {
                println!("{} ({})", user.email, user.id);
            }
            Ok(())
        }
        Commands::Site(command) => site(command).await,
        Commands::Manga(command) => manga(command).await,
        Commands::Chapter(command) => chapter(command).await,
        Commands::Stats => {
            let mut tracker = Remote::resume().await?.tracker;
            tracker.refresh().await?;
            print!("{}", render::render_stats(&tracker.stats()));
            Ok(())
        }
    }
}

async fn serve(port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env();
    config.port = port;
    if db_path.is_some() {
        config.db_path = db_path;
    }

    tracing::info!("Starting manga tracker server on port {}", config.port);

    let db = match config.db_path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let app = api::create_router_with_config(db, config.security);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!(
        "Manga tracker listening on http://127.0.0.1:{}",
        config.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn logout() -> anyhow::Result<()> {
    let Some(stored) = StoredSession::load()? else {
        println!("Not signed in.");
        return Ok(());
    };
    // The local sign-in is forgotten even if the server can't be reached
    StoredSession::clear()?;

    let remote = Remote::new(stored.api_url, SessionHandle::new());
    if remote.provider.resume(&stored.access_token).await?.is_some() {
        remote.provider.sign_out().await?;
    }
    println!("Signed out {}", stored.email);
    Ok(())
}

async fn site(command: SiteCommand) -> anyhow::Result<()> {
    let mut tracker = Remote::resume().await?.tracker;

    match command {
        SiteCommand::Add {
            name,
            url,
            description,
        } => {
            let mut input = CreateSiteInput::new(name, url);
            input.description = description;
            let site = tracker.sites.create(input).await?;
            println!("Added site \"{}\" ({})", site.name, site.id);
        }
        SiteCommand::List => {
            tracker.refresh().await?;
            print!(
                "{}",
                render::render_sites(tracker.sites.sites(), tracker.mangas.mangas())
            );
        }
        SiteCommand::Rm { id } => {
            tracker.sync().await?;
            let evicted = tracker.remove_site(id).await?;
            if evicted > 0 {
                println!("Removed site {} and {} manga(s) read on it", id, evicted);
            } else {
                println!("Removed site {}", id);
            }
        }
    }
    Ok(())
}

async fn manga(command: MangaCommand) -> anyhow::Result<()> {
    let mut tracker = Remote::resume().await?.tracker;

    match command {
        MangaCommand::Add { title, site } => {
            let manga = tracker
                .mangas
                .create(CreateMangaInput::new(title, site))
                .await?;
            println!(
                "Added \"{}\" on {} ({})",
                manga.manga.title,
                manga.site_name().unwrap_or("unknown site"),
                manga.manga.id
            );
        }
        MangaCommand::List => {
            let mangas = tracker.mangas.list().await?;
            print!("{}", render::render_mangas(mangas));
        }
        MangaCommand::Toggle { id } => {
            tracker.mangas.list().await?;
            match tracker.mangas.toggle_active(id).await? {
                ToggleOutcome::Updated(manga) => {
                    let state = if manga.manga.is_active {
                        "active"
                    } else {
                        "paused"
                    };
                    println!("\"{}\" is now {}", manga.manga.title, state);
                }
                ToggleOutcome::NotFound => bail!("Manga {} not found", id),
            }
        }
        MangaCommand::Rm { id } => {
            tracker.mangas.remove(id).await?;
            println!("Removed manga {}", id);
        }
    }
    Ok(())
}

async fn chapter(command: ChapterCommand) -> anyhow::Result<()> {
    let tracker = Remote::resume().await?.tracker;

    match command {
        ChapterCommand::Add {
            manga_id,
            number,
            title,
            release_date,
        } => {
            let mut chapters = tracker.chapters(manga_id);
            let mut input = CreateChapterInput::new(number);
            input.chapter_title = title;
            input.release_date = release_date;
            let chapter = chapters.create(input).await?;
            println!(
                "Added chapter {} ({})",
                chapter.chapter_number, chapter.id
            );
        }
        ChapterCommand::List { manga_id } => {
            let mut chapters = tracker.chapters(manga_id);
            chapters.list().await?;
            print!("{}", render::render_chapters(chapters.chapters()));
            println!(
                "{} read, {} unread",
                chapters.read_count(),
                chapters.unread_count()
            );
        }
        ChapterCommand::Toggle { manga_id, id } => {
            let mut chapters = tracker.chapters(manga_id);
            chapters.list().await?;
            match chapters.toggle_read(id).await? {
                ToggleOutcome::Updated(chapter) => println!(
                    "Chapter {} marked {}",
                    chapter.chapter_number,
                    chapter.read_status().as_str()
                ),
                ToggleOutcome::NotFound => bail!("Chapter {} not found", id),
            }
        }
        ChapterCommand::Rm { manga_id, id } => {
            let mut chapters = tracker.chapters(manga_id);
            chapters.remove(id).await?;
            println!("Removed chapter {}", id);
        }
    }
    Ok(())
}

/// The client side of the CLI: a session provider and the registries, both
/// talking to the API through one [`TrackerClient`].
struct Remote {
    provider: SessionProvider,
    tracker: Tracker,
}

impl Remote {
    fn new(api_url: String, handle: SessionHandle) -> Self {
        let client = Arc::new(TrackerClient::new(api_url, handle.clone()));
        Self {
            provider: SessionProvider::new(client.clone(), handle.clone()),
            tracker: Tracker::new(client, handle),
        }
    }

    /// Resume the stored sign-in, failing if there is none or it expired.
    async fn resume() -> anyhow::Result<Self> {
        let stored = StoredSession::load()?
            .context("Not signed in. Run `mtrk login` first")?;

        let remote = Self::new(stored.api_url, SessionHandle::new());
        if remote.provider.resume(&stored.access_token).await?.is_none() {
            bail!("Session expired. Run `mtrk login` again");
        }
        Ok(remote)
    }
}
