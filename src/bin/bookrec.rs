//! Binary entry point for the book recommender.
#![forbid(unsafe_code)]

#[path = "bookrec/config.rs"]
mod config;
#[path = "bookrec/ui.rs"]
mod ui;

use std::error::Error;
use std::io::IsTerminal;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bookrec::{
    catalog::{
        load_books, load_popular, load_similarity, ColumnNames, DataPaths, PopularBook, Tables,
        TablesStats,
    },
    error::LoadError,
    logging::init_logging,
    recommend::{RecommendationResult, Recommender, DEFAULT_RECOMMENDATIONS},
    server::{self, ServerOptions, DEFAULT_PORT},
};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;

use config::CliConfig;
use ui::Ui;

const NO_MATCH_NOTICE: &str = "No matches found — try a different title.";

#[derive(Parser, Debug)]
#[command(
    name = "bookrec",
    version,
    about = "Similar-book recommendations from precomputed similarity tables",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "BOOKREC_CONFIG",
        value_name = "FILE",
        help = "Config file (defaults to the user config directory)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory holding similarity.csv, books.csv and popular.csv"
    )]
    data_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Log filter when RUST_LOG is unset (default: info for serve, warn otherwise)"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ColorArg::Auto,
        help = "Colour text output (auto: only on a terminal)"
    )]
    color: ColorArg,

    #[arg(long, global = true, help = "Suppress decorations and spinners")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ServeCmd {
    #[arg(long, value_name = "HOST", help = "Bind address host [default: 127.0.0.1]")]
    host: Option<IpAddr>,

    #[arg(long, value_name = "PORT", help = "Bind port [default: 8501]")]
    port: Option<u16>,

    #[arg(long, value_name = "N", help = "Recommendations shown per search [default: 5]")]
    count: Option<usize>,

    #[arg(long, value_name = "DIR", help = "Directory of static assets to serve")]
    assets: Option<PathBuf>,

    #[arg(
        long = "allow-origin",
        value_name = "ORIGIN",
        action = ArgAction::Append,
        help = "Additional CORS origin to allow (repeatable)"
    )]
    allow_origins: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Serve the recommendation web page")]
    Serve(ServeCmd),

    #[command(about = "Print books similar to a title")]
    Recommend {
        #[arg(value_name = "TITLE")]
        title: String,

        #[arg(short = 'n', long = "count", default_value_t = DEFAULT_RECOMMENDATIONS)]
        count: usize,
    },

    #[command(about = "Print the popularity table")]
    Popular {
        #[arg(long, value_name = "N", help = "Only print the first N books")]
        limit: Option<usize>,
    },

    #[command(about = "Print table sizes and consistency counts")]
    Stats,

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

impl ColorArg {
    fn enabled(self) -> bool {
        match self {
            ColorArg::Auto => std::io::stdout().is_terminal(),
            ColorArg::Always => true,
            ColorArg::Never => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecommendOutput<'a> {
    query: &'a str,
    matched: Option<String>,
    results: Vec<RecommendationResult>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "bookrec", &mut std::io::stdout());
        return Ok(());
    }

    let default_filter = match cli.command {
        Command::Serve(_) => "info",
        _ => "warn",
    };
    init_logging(cli.log_level.as_deref().unwrap_or(default_filter));

    let ui = Ui::new(cli.color.enabled(), cli.quiet);
    let config = CliConfig::load(cli.config.clone())?;
    let paths = config.data_paths(cli.data_dir.as_deref());
    let recommender = load_recommender(&ui, &paths, &config.columns())?;
    if cli.format == OutputFormat::Text && !cli.quiet {
        ui.notice(&format!(
            "Loaded {} titles and {} popular books",
            recommender.tables().titles.len(),
            recommender.popular().len()
        ));
    }

    match cli.command {
        Command::Serve(cmd) => {
            let options = build_server_options(cmd, &config);
            let addr = SocketAddr::from(options.socket_parts());
            if cli.format == OutputFormat::Text {
                ui.notice(&format!("Serving on http://{addr}/ (Ctrl-C to stop)"));
            }
            server::serve(Arc::new(recommender), options).await?;
        }
        Command::Recommend { title, count } => {
            let found = recommender.lookup(&title, count);
            let output = RecommendOutput {
                query: &title,
                matched: found.matched,
                results: found.results,
            };
            emit(cli.format, &output, || print_recommend_text(&ui, &output))?;
        }
        Command::Popular { limit } => {
            let books = recommender.popular();
            let shown = &books[..limit.unwrap_or(books.len()).min(books.len())];
            emit(cli.format, &shown, || print_popular_text(&ui, shown))?;
        }
        Command::Stats => {
            let stats = recommender.stats();
            emit(cli.format, &stats, || {
                print_stats_text(&ui, &stats, &paths, config.path())
            })?;
        }
        Command::Completions { .. } => {}
    }

    Ok(())
}

fn load_recommender(
    ui: &Ui,
    paths: &DataPaths,
    columns: &ColumnNames,
) -> Result<Recommender, Box<dyn Error>> {
    let progress = ui.progress(3);
    let (titles, similarity) = progress.step(&paths.similarity, || {
        load_similarity(&paths.similarity)
    })?;
    let catalog = progress.step(&paths.books, || load_books(&paths.books, columns))?;
    let popular = progress.step(&paths.popular, || load_popular(&paths.popular, columns))?;
    let tables = Tables::new(titles, similarity, catalog, popular)
        .map_err(|err| LoadError::Table {
            path: paths.similarity.clone(),
            source: err,
        })?;
    let elapsed = progress.finish();
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "tables ready");
    Ok(Recommender::new(tables))
}

fn build_server_options(cmd: ServeCmd, config: &CliConfig) -> ServerOptions {
    let section = config.server();
    let defaults = ServerOptions::default();
    let mut allow_origins = section.allow_origins.clone();
    allow_origins.extend(cmd.allow_origins);
    ServerOptions {
        host: cmd.host.or(section.host).unwrap_or(defaults.host),
        port: cmd.port.or(section.port).unwrap_or(DEFAULT_PORT),
        count: cmd.count.or(section.count).unwrap_or(defaults.count),
        assets_dir: cmd.assets.or_else(|| section.assets.clone()),
        allow_origins,
    }
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_recommend_text(ui: &Ui, output: &RecommendOutput<'_>) {
    let Some(matched) = output.matched.as_deref() else {
        ui.notice(NO_MATCH_NOTICE);
        return;
    };
    ui.fields("Recommendations", &[("query", output.query), ("matched", matched)]);
    if output.results.is_empty() {
        ui.notice(NO_MATCH_NOTICE);
        return;
    }
    ui.ranked(
        "Similar books",
        output.results.iter().map(|result| {
            (
                result.title.clone(),
                format!("by {} (score {:.3})", result.author, result.score),
            )
        }),
    );
}

fn print_popular_text(ui: &Ui, books: &[PopularBook]) {
    if books.is_empty() {
        ui.notice("Popularity table is empty.");
        return;
    }
    ui.ranked(
        "Top books",
        books.iter().map(|book| {
            (
                book.title.clone(),
                format!(
                    "by {} ⭐ {:.2} | {} votes",
                    book.author, book.average_rating, book.rating_count
                ),
            )
        }),
    );
}

fn print_stats_text(
    ui: &Ui,
    stats: &TablesStats,
    paths: &DataPaths,
    config_path: Option<&Path>,
) {
    ui.fields(
        "Artifacts",
        &[
            ("similarity", paths.similarity.display().to_string()),
            ("books", paths.books.display().to_string()),
            ("popular", paths.popular.display().to_string()),
            (
                "config",
                config_path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "(defaults)".into()),
            ),
        ],
    );
    ui.fields(
        "Tables",
        &[
            ("titles", stats.titles),
            ("matrix_dimension", stats.matrix_dimension),
            ("catalog_records", stats.catalog_records),
            ("catalog_titles", stats.catalog_titles),
            ("indexed_without_catalog", stats.indexed_without_catalog),
            ("catalog_without_index", stats.catalog_without_index),
            ("popular_books", stats.popular_books),
        ],
    );
}
