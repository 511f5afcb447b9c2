use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use thousands::Separable;

use feedpager::{
    core::{LoadMoreOutcome, PaginationCoordinator},
    domain::Post,
    infrastructure::{
        cli::Cli,
        config::Config,
        memory_source::{synthetic_feed, InMemorySource},
    },
    utils::{initialize_logging, initialize_panic_handler},
};

fn load_feed(args: &Cli) -> Result<Vec<Post>> {
    match &args.feed {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).wrap_err_with(|| format!("parsing {}", path.display()))
        }
        None => Ok(synthetic_feed(args.synthetic, chrono::Utc::now())),
    }
}

fn print_page(posts: &[Post], from: usize) {
    for (i, post) in posts.iter().enumerate().skip(from) {
        println!(
            "{:>4}. [{}] {} by {} ({} likes)",
            i + 1,
            post.kind,
            post.title,
            post.author,
            post.likes.separate_with_commas()
        );
    }
}

async fn tokio_main() -> Result<()> {
    initialize_logging()?;

    initialize_panic_handler()?;

    let args = <Cli as Parser>::parse();

    let mut config = Config::new()?.pagination;
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(sort) = args.sort {
        config.sort = sort;
    }
    config.validate()?;

    let source = InMemorySource::new(load_feed(&args)?)
        .with_latency(Duration::from_millis(args.latency));
    let pager = PaginationCoordinator::new(source, config);
    pager.apply_filters(args.criteria());

    let mut shown = 0;
    for _ in 0..args.pages {
        let outcome = pager.load_more().await?;
        let visible = pager.visible_page();

        if args.json {
            println!("{}", serde_json::to_string_pretty(visible.get(shown..).unwrap_or(&[]))?);
        } else {
            print_page(&visible, shown);
            let metadata = pager.metadata();
            let total = metadata
                .total_matching
                .map_or_else(|| String::from("?"), |n| n.separate_with_commas());
            println!(
                "-- showing {} of {total} ({})",
                visible.len().separate_with_commas(),
                pager.mode()
            );
        }
        shown = visible.len();

        if let LoadMoreOutcome::Loaded(update) = outcome {
            if update.incomplete {
                println!("-- filtered page is incomplete, press again for more");
            }
            if !update.has_more {
                break;
            }
        }
    }

    tracing::info!(metrics = ?pager.metrics(), "session finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = tokio_main().await {
        eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
        Err(e)
    } else {
        Ok(())
    }
}
