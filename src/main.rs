use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use frontpage::cli::render::{self, SourceReport};
use frontpage::cli::{Cli, Commands};
use frontpage::config::Config;
use frontpage::logging;
use frontpage::services::FrontpageService;
use frontpage::sources::{Source, SourceRegistry};
use frontpage::storage::{CacheBackend, MemoryCache, SqliteCache, SqliteStorage};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    Config::load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::load_with_env(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Some(level) = cli.log {
        config.logging.level = level;
    }
    logging::init(&config.logging.level);

    let cache: Arc<dyn CacheBackend> = match &config.cache.path {
        Some(path) => {
            let storage = SqliteStorage::new(path)
                .with_context(|| format!("failed to open cache at {}", path))?;
            let cache = SqliteCache::new(storage);
            let purged = cache.purge_expired()?;
            info!(path = %path, purged, "using sqlite cache");
            Arc::new(cache)
        }
        None => Arc::new(MemoryCache::new()),
    };

    let sources = SourceRegistry::new().build(&config)?;
    let service = FrontpageService::new(sources, cache, config.limit, config.max_age());

    match cli.command {
        Commands::Poll {
            json,
            merged,
            source,
        } => cmd_poll(&service, json, merged, source.as_deref()),
        Commands::Sources => cmd_sources(&service),
        Commands::ClearCache => cmd_clear_cache(&service),
    }
}

fn cmd_poll(
    service: &FrontpageService,
    json: bool,
    merged: bool,
    only: Option<&str>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if merged {
        let updates = service.latest();
        if json {
            serde_json::to_writer_pretty(&mut out, &updates)?;
            writeln!(out)?;
        } else if updates.is_empty() {
            writeln!(out, "No updates.")?;
        } else {
            render::write_merged(&mut out, &updates)?;
        }
        return Ok(());
    }

    let polled = match only {
        Some(name) => match service.find(name) {
            Some(source) => vec![service.poll_source(source)],
            None => bail!("no source named {}", name),
        },
        None => service.poll_all(),
    };

    if json {
        let reports: Vec<SourceReport<'_>> = polled.iter().map(SourceReport::from).collect();
        serde_json::to_writer_pretty(&mut out, &reports)?;
        writeln!(out)?;
    } else if polled.iter().all(|p| p.updates.is_empty()) {
        writeln!(out, "No updates.")?;
    } else {
        render::write_sections(&mut out, &polled)?;
    }

    Ok(())
}

fn cmd_sources(service: &FrontpageService) -> anyhow::Result<()> {
    let sources = service.sources();

    if sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!("Configured sources:\n");
    for source in sources {
        println!("  {} [{}]", source.name(), source.source_type());
        if source.title() != source.name() {
            println!("    Title: {}", source.title());
        }
        match source {
            Source::Feed(feed) => println!("    Feed: {}", feed.feed_url()),
            Source::Git(git) => {
                for repository in git.repositories() {
                    println!("    Repository: {} ({})", repository.path, repository.label);
                }
            }
        }
        println!("    Cache key: {}", source.cache_key());
        println!("    Limit: {}", source.settings().limit());
        if let Some(max_age) = source.settings().max_age {
            println!("    Max age: {}s", max_age.as_secs());
        }
        if let Some(link) = source.link() {
            println!("    Link: {}", link);
        }
        println!();
    }

    Ok(())
}

fn cmd_clear_cache(service: &FrontpageService) -> anyhow::Result<()> {
    service.clear_cache()?;
    println!("Cache cleared.");
    Ok(())
}
