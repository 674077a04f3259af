//! fixbuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use fixbuddy::{
    cli::{Args, Commands, Config, Verbosity},
    embedding::build_embedder,
    rag::RetrievalContext,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("{} {}", "error:".red().bold(), message);
        std::process::exit(2);
    }

    let config = load_config(&args)?;
    telemetry::init_logging(args.verbosity(), &config.telemetry);

    if !args.needs_index() {
        return show_config(&args, &config);
    }

    let ctx = initialize(&args, &config).await?;

    match &args.command {
        Commands::Context { question, json } => run_context(&args, &config, &ctx, question, *json).await?,
        Commands::Recommend {
            question,
            top_n,
            threshold,
        } => run_recommend(&config, &ctx, question, *top_n, *threshold)?,
        Commands::Stats => show_stats(&ctx),
        Commands::Config => {}
    }

    Ok(())
}

/// Configuration file plus command-line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;

    if let Some(guides) = &args.guides {
        config.corpus.guides_path = guides.clone();
    }
    if let Some(posts) = &args.posts {
        config.corpus.posts_path = posts.clone();
    }
    if args.offline {
        config.apply_offline();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn spinner(verbosity: Verbosity, message: &str) -> Option<ProgressBar> {
    if !verbosity.show_progress() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Load the model and build the index before serving anything
async fn initialize(args: &Args, config: &Config) -> Result<RetrievalContext> {
    let pb = spinner(args.verbosity(), "Building index...");

    let result: Result<RetrievalContext> = async {
        let embedder = build_embedder(&config.embedding).context("Failed to load embedding model")?;
        RetrievalContext::initialize(config.index_settings(), embedder)
            .await
            .context("Failed to build index")
    }
    .await;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result
}

async fn run_context(args: &Args, config: &Config, ctx: &RetrievalContext, question: &str, json: bool) -> Result<()> {
    let pipeline = config.pipeline()?;
    let pb = spinner(args.verbosity(), "Retrieving...");
    let outcome = pipeline.run(ctx, question).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.is_empty() {
        eprintln!("{}", "No relevant documents found.".yellow());
    } else {
        println!("{}", outcome.context.text);
    }

    if args.verbosity().show_stats() || config.telemetry.show_stats {
        eprintln!();
        eprintln!("{}", "Retrieval".bold());
        for query in &outcome.queries {
            eprintln!("  {} {}", "?".cyan(), query);
        }
        eprintln!("{}", outcome.stats);
    }

    Ok(())
}

fn run_recommend(
    config: &Config,
    ctx: &RetrievalContext,
    question: &str,
    top_n: Option<usize>,
    threshold: Option<f32>,
) -> Result<()> {
    let top_n = top_n.unwrap_or(config.recommender.top_n);
    let threshold = threshold.or(config.recommender.similarity_threshold);
    let matches = ctx.recommend(question, top_n, threshold)?;

    if matches.is_empty() {
        eprintln!("{}", "No guide is similar enough.".yellow());
        return Ok(());
    }

    for (rank, m) in matches.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            m.guide.title.bold(),
            format!("({:.3})", m.score).dimmed()
        );
        println!("   guideid: {}  {}", m.guide.guideid, m.guide.url.cyan());
    }

    Ok(())
}

fn show_stats(ctx: &RetrievalContext) {
    let stats = ctx.stats();
    println!("{}", "Index".bold());
    println!("  Guides:     {}", stats.guides);
    println!("  Posts:      {}", stats.posts);
    println!("  Documents:  {}", stats.documents);
    println!("  Chunks:     {}", stats.chunks);
    println!("  Model:      {} ({}d)", stats.model_id, stats.dimension);
    println!("  Build time: {}ms", stats.build_ms);
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let source = match &args.config {
        Some(path) => path.display().to_string(),
        None => match Config::default_path() {
            Some(path) if path.exists() => path.display().to_string(),
            _ => "built-in defaults".to_string(),
        },
    };

    println!("{} {}", "Configuration:".bold(), source.dimmed());
    println!();
    print!("{}", toml::to_string_pretty(config).context("Failed to render configuration")?);
    Ok(())
}
