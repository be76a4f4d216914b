use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use manga_reader_lib::{
    auth::{AccessDecision, AdminGuard},
    settings::AppConfig,
    utils::init_logging,
    AppContext,
};

#[derive(Parser, Debug)]
#[command(name = "manga-reader", about = "Manga reader client tools")]
struct Cli {
    /// Path to the local session store
    #[arg(long, default_value = "manga-reader.sqlite3")]
    store: PathBuf,

    /// Optional JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report reading activity for a chapter until Ctrl-C
    Heartbeat {
        #[arg(long)]
        manga: String,
        #[arg(long)]
        chapter: u32,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Defaults to the manga's first listed genre
        #[arg(long)]
        genre: Option<String>,
    },
    /// Show the manga detail and chapter list
    Show {
        #[arg(long)]
        manga: String,
    },
    /// Print or toggle the persisted theme
    Theme {
        #[arg(long)]
        toggle: bool,
    },
    /// Store a token and role for the admin console
    Login {
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "reader")]
        role: String,
    },
    /// Forget the stored session; `--all` also drops every other local setting
    Logout {
        #[arg(long)]
        all: bool,
    },
    /// Check whether the stored session may open the admin console
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(config.debug);

    let ctx = AppContext::new(config, cli.store)?;

    match cli.command {
        Command::Heartbeat {
            manga,
            chapter,
            page,
            genre,
        } => {
            let coordinates = ctx.reading_coordinates(&manga, chapter, page, genre).await;

            let reporter = ctx.reporter();
            reporter.update_coordinates(coordinates).await;
            info!(
                "Reporting every {}s to {}; press Ctrl-C to stop",
                ctx.config.heartbeat_interval_secs,
                ctx.config.base_url()
            );

            tokio::signal::ctrl_c().await?;
            reporter.stop().await;
            reporter.flush().await;

            let stats = reporter.delivery_stats().await;
            println!("delivered: {}, failed: {}", stats.delivered, stats.failed);
        }
        Command::Show { manga } => {
            let catalog = ctx.catalog();
            let detail = catalog.manga(&manga).await?;
            println!("{} ({})", detail.title, detail.id);
            if let Some(author) = &detail.author {
                println!("by {author}");
            }
            if !detail.genres.is_empty() {
                println!("genres: {}", detail.genres.join(", "));
            }
            for chapter in catalog.chapters(&manga).await? {
                println!(
                    "  ch.{:>4}  {}",
                    chapter.chapter_number,
                    chapter.title.as_deref().unwrap_or("")
                );
            }
        }
        Command::Theme { toggle } => {
            let themes = ctx.themes();
            let theme = if toggle { themes.toggle()? } else { themes.load()? };
            println!("{}", theme.as_str());
        }
        Command::Login { token, role } => {
            AdminGuard::new(&ctx.store).sign_in(&token, &role)?;
            println!("signed in as {role}");
        }
        Command::Logout { all } => {
            if all {
                ctx.store.clear()?;
                println!("local store cleared");
            } else {
                AdminGuard::new(&ctx.store).sign_out()?;
                println!("signed out");
            }
        }
        Command::Whoami => {
            let guard = AdminGuard::new(&ctx.store);
            let role = guard.role()?.unwrap_or_else(|| "-".into());
            let access = match guard.check()? {
                AccessDecision::Granted => "admin console: granted",
                AccessDecision::RedirectToLogin => "admin console: login required",
                AccessDecision::Forbidden => "admin console: forbidden",
            };
            println!("role: {role}\n{access}");
            if let Some(since) = guard.signed_in_at()? {
                println!("signed in since {}", since.to_rfc3339());
            }
        }
    }

    Ok(())
}
