use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flibusta_fetch::config::{find_config_file, get_config, load_config, to_toml, Config};
use flibusta_fetch::models::{Author, Book, SearchResult};
use flibusta_fetch::sources::{StatusSender, StatusUpdate};
use flibusta_fetch::Catalog;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// flibusta-fetch - Search, browse and download books from an online ebook catalog
#[derive(Parser, Debug)]
#[command(name = "flibusta-fetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search, browse and download books from an online ebook catalog", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Catalog base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search books by title or free text
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Zero-based result page
        #[arg(long, short, default_value_t = 0)]
        page: u32,
    },

    /// Search authors by name
    #[command(alias = "a")]
    Authors {
        /// Author name
        query: String,

        /// Zero-based result page
        #[arg(long, short, default_value_t = 0)]
        page: u32,
    },

    /// List an author's books
    AuthorBooks {
        /// Author identifier
        id: String,
    },

    /// Download a book file
    #[command(alias = "d")]
    Download {
        /// Download URL of the book file
        url: String,

        /// Directory to save the file in
        #[arg(long, short, default_value = ".")]
        output: PathBuf,

        /// Requested format; the file is renamed unless it already has this extension
        #[arg(long, short)]
        format: Option<String>,

        /// Book title used when the file has to be renamed
        #[arg(long, short, requires = "format")]
        title: Option<String>,
    },

    /// Check which access path of the catalog is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("flibusta_fetch={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(&cli)?;
    tracing::debug!("Effective configuration:\n{}", to_toml(&config)?);

    let catalog = Catalog::new(&config).context("Failed to create catalog client")?;

    // Status updates are printed as they arrive, independent of results
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<StatusUpdate>();
    let quiet = cli.quiet;
    let status_printer = tokio::spawn(async move {
        while let Some(update) = status_rx.recv().await {
            if !quiet {
                eprintln!("{}", update);
            }
        }
    });

    let outcome = run(&cli, &catalog, &status_tx).await;

    drop(status_tx);
    if let Err(e) = status_printer.await {
        tracing::debug!("Status printer stopped: {}", e);
    }

    outcome
}

async fn run(cli: &Cli, catalog: &Catalog, status: &StatusSender) -> Result<()> {
    match &cli.command {
        Commands::Search { query, page } => {
            let result = catalog.search_books(query, *page, Some(status)).await;
            let result = result.context("Search failed on both catalog sources")?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_books(&result);
            }
        }

        Commands::Authors { query, page } => {
            let result = catalog.search_authors(query, *page, Some(status)).await;
            let result = result.context("Author search failed on both catalog sources")?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_authors(&result);
            }
        }

        Commands::AuthorBooks { id } => {
            let result = catalog.author_books(id, 0, Some(status)).await;
            let result = result.context("Could not list the author's books")?;
            if cli.json {
                print_json(&result)?;
            } else {
                print_books(&result);
            }
        }

        Commands::Download {
            url,
            output,
            format,
            title,
        } => {
            let book = catalog
                .download(url)
                .await
                .with_context(|| format!("Download failed: {}", url))?;

            let filename = match format {
                Some(format) => book.filename_for(title.as_deref().unwrap_or_default(), format),
                None => book.filename.clone(),
            };

            tokio::fs::create_dir_all(output)
                .await
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let path = output.join(filename);
            tokio::fs::write(&path, &book.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            if cli.json {
                print_json(&serde_json::json!({
                    "path": path,
                    "size": book.size(),
                }))?;
            } else if !cli.quiet {
                println!("Saved {} ({} bytes)", path.display(), book.size());
            }
        }

        Commands::Check => {
            let report = catalog.check_connection().await;
            if cli.json {
                print_json(&serde_json::json!({
                    "connected": report.is_connected(),
                    "source": report.reachable,
                }))?;
            } else {
                println!("{}", report);
            }
            if !report.is_connected() {
                anyhow::bail!("Catalog unreachable");
            }
        }
    }

    Ok(())
}

/// Layer the config file (explicit or discovered), environment and flags
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        get_config()?
    };

    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_books(result: &SearchResult<Book>) {
    if result.is_empty() {
        println!("No books found ({} catalog)", result.source);
        return;
    }

    println!("{} books ({} catalog)", result.len(), result.source);
    println!();
    for book in &result.items {
        let authors = book.author_names();
        if authors.is_empty() {
            println!("[{}] {}", book.id, book.title);
        } else {
            println!("[{}] {} - {}", book.id, book.title, authors);
        }
        if let Some(year) = &book.year {
            println!("  Year: {}", year);
        }
        for link in &book.download_links {
            println!("  {}: {}", link.format, link.url);
        }
    }

    if result.has_more {
        println!();
        println!("More results available, use --page to continue");
    }
}

fn print_authors(result: &SearchResult<Author>) {
    if result.is_empty() {
        println!("No authors found ({} catalog)", result.source);
        return;
    }

    println!("{} authors ({} catalog)", result.len(), result.source);
    println!();
    for author in &result.items {
        match author.books_count {
            Some(count) => println!("[{}] {} ({} books)", author.id, author.name, count),
            None => println!("[{}] {}", author.id, author.name),
        }
    }

    if result.has_more {
        println!();
        println!("More results available, use --page to continue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["flibusta-fetch", "check"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.json);
        assert!(cli.timeout.is_none());
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["flibusta-fetch", "-vv", "check"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from(["flibusta-fetch", "search", "Пикник", "--page", "2"]);
        match cli.command {
            Commands::Search { query, page } => {
                assert_eq!(query, "Пикник");
                assert_eq!(page, 2);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "flibusta-fetch",
            "authors",
            "Толстой",
            "--json",
            "--timeout",
            "10",
            "--base-url",
            "http://localhost:8080",
        ]);
        assert!(cli.json);
        assert_eq!(cli.timeout, Some(10));
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_cli_download_command() {
        let cli = Cli::parse_from([
            "flibusta-fetch",
            "download",
            "http://flibusta.is/b/123/fb2",
            "--format",
            "fb2",
            "--title",
            "Война и мир",
            "--output",
            "/tmp/books",
        ]);
        match cli.command {
            Commands::Download {
                url,
                output,
                format,
                title,
            } => {
                assert_eq!(url, "http://flibusta.is/b/123/fb2");
                assert_eq!(output, PathBuf::from("/tmp/books"));
                assert_eq!(format.as_deref(), Some("fb2"));
                assert_eq!(title.as_deref(), Some("Война и мир"));
            }
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_cli_title_requires_format() {
        let result = Cli::try_parse_from([
            "flibusta-fetch",
            "download",
            "http://flibusta.is/b/123/fb2",
            "--title",
            "Война и мир",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_author_books_command() {
        let cli = Cli::parse_from(["flibusta-fetch", "author-books", "5678"]);
        match cli.command {
            Commands::AuthorBooks { id } => assert_eq!(id, "5678"),
            _ => panic!("Expected AuthorBooks command"),
        }
    }
}
