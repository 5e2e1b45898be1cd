//! context-kit CLI - Select token-budgeted context and estimate prompt cost

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use context_kit::{
    cache::{CacheManager, MemoKey, StoredValue},
    config::{CategoryBoost, Config, ContextRoot},
    context::{
        discover_context_files, format_report, score_relevance, ContextSelector, DynamicContext, ReportOptions,
        Selection,
    },
    embeddings::{EmbeddingCache, OllamaEmbedder},
    metrics::{UsageLog, UsageRecord, UsageTracker},
    scoring::{KeywordScorer, Scorer, SemanticScorer},
    tokens::{models, TokenEstimator, TruncateFrom, MODELS},
    ui::{Spinner, TerminalRenderer},
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "context-kit")]
#[command(about = "Select token-budgeted context for LLM prompts, estimate cost, and manage caches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/context-kit/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,

    /// Print the full error chain on failure
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the most relevant context for a task within a token budget
    Select(SelectArgs),

    /// Count, check and trim tokens
    #[command(subcommand)]
    Tokens(TokenCommands),

    /// Inspect and manage the general-purpose cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Inspect and prune the embedding cache
    #[command(subcommand)]
    Embeddings(EmbeddingCommands),

    /// Record and summarize model usage
    #[command(subcommand)]
    Usage(UsageCommands),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct SelectArgs {
    /// Task description to score context against
    task: String,

    /// Token budget (default: context.max_tokens)
    #[arg(short, long)]
    max_tokens: Option<usize>,

    /// Keep at most this many documents before packing
    #[arg(long)]
    top_n: Option<usize>,

    /// Minimum relevance score (default: context.min_score)
    #[arg(long)]
    min_score: Option<f32>,

    /// Context root directory; repeatable, replaces configured roots
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Category boost as prefix=value; repeatable, checked before configured boosts
    #[arg(short, long = "boost")]
    boosts: Vec<CategoryBoost>,

    /// Skip git/timestamp context
    #[arg(long)]
    no_dynamic: bool,

    /// Use keyword overlap even if embeddings are available
    #[arg(long)]
    keyword_only: bool,

    /// Annotate chunks with relevance scores
    #[arg(long)]
    show_scores: bool,

    /// Annotate chunks with token counts
    #[arg(long)]
    show_tokens: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit JSON
    #[arg(long)]
    json: bool,

    /// Reuse an identical selection computed within this many seconds
    #[arg(long)]
    cache_ttl: Option<u64>,
}

/// Text given inline, from a file, or on stdin
#[derive(Args)]
struct InputArgs {
    /// Text to analyze (reads stdin when neither text nor --file is given)
    text: Option<String>,

    /// Read text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Model to count for (default: tokens.default_model)
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Count tokens
    Count {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        json: bool,
    },

    /// Check text against a model's context window
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Tokens reserved for the response
        #[arg(short, long, default_value = "0")]
        reserve: usize,

        #[arg(long)]
        json: bool,
    },

    /// Count, price and limit-check a prompt, optionally truncating it
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Tokens reserved for the response (default: tokens.default_max_output_tokens)
        #[arg(long)]
        max_output: Option<usize>,

        /// Truncate the prompt if it does not fit
        #[arg(long)]
        auto_truncate: bool,

        /// Which side to cut when truncating (start, end, middle)
        #[arg(long, default_value = "end")]
        from: TruncateFrom,

        /// Write the truncated prompt here
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Truncate text to a token budget
    Truncate {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        max_tokens: usize,

        /// Tokens reserved for the response
        #[arg(short, long, default_value = "0")]
        reserve: usize,

        /// Which side to cut (start, end, middle)
        #[arg(long, default_value = "end")]
        from: TruncateFrom,
    },

    /// Fit text to a budget by dropping prose before structure
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        max_tokens: usize,
    },

    /// Estimate the cost of a call
    Cost {
        #[arg(long)]
        input_tokens: usize,

        #[arg(long, default_value = "0")]
        output_tokens: usize,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List known models with limits and prices
    Models {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show hit/miss counters and contents
    Stats {
        /// Number of most-hit keys to list
        #[arg(long, default_value = "10")]
        top: usize,

        #[arg(long)]
        json: bool,
    },

    /// Print a cached value
    Get { key: String },

    /// Delete one key
    Delete { key: String },

    /// Delete keys containing a pattern, or everything with --all
    Invalidate {
        pattern: Option<String>,

        #[arg(long, conflicts_with = "pattern")]
        all: bool,
    },

    /// Remove expired entries
    Cleanup,

    /// Seconds until a key expires
    Ttl { key: String },
}

#[derive(Subcommand)]
enum EmbeddingCommands {
    /// Show cache size and backend availability
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Remove embeddings older than N days (default: embeddings.max_age_days)
    Prune {
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
enum UsageCommands {
    /// Append a usage record priced from the model tables
    Record {
        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        input_tokens: u64,

        #[arg(long, default_value = "0")]
        output_tokens: u64,

        /// Free-form label (task name, command, ...)
        #[arg(long)]
        label: Option<String>,
    },

    /// Summarize recorded usage
    Report {
        /// Only include the last N days
        #[arg(long)]
        days: Option<i64>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// Show only one section (tokens, context, cache, embeddings, dynamic)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let verbose = cli.verbose;
    if let Err(e) = run(cli) {
        let renderer = TerminalRenderer::new();
        renderer.render_error(&e.to_string());
        if verbose {
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr; RUST_LOG takes precedence over --log-level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    if let Commands::Config(cmd) = cli.command {
        return run_config_command(cmd, &config_path);
    }

    let config = Config::load_from(config_path.clone())
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    debug!("Loaded configuration from {}", config_path.display());

    let renderer = TerminalRenderer::new();
    match cli.command {
        Commands::Select(args) => run_select(&config, args, &renderer),
        Commands::Tokens(cmd) => run_tokens_command(&config, cmd, &renderer),
        Commands::Cache(cmd) => run_cache_command(&config, cmd, &renderer),
        Commands::Embeddings(cmd) => run_embeddings_command(&config, cmd, &renderer),
        Commands::Usage(cmd) => run_usage_command(&config, cmd, &renderer),
        Commands::Config(_) => Ok(()),
    }
}

#[derive(Serialize)]
struct SelectReport<'a> {
    task: &'a str,
    scorer: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic: Option<&'a DynamicContext>,
    #[serde(flatten)]
    selection: &'a Selection,
}

fn run_select(config: &Config, args: SelectArgs, renderer: &TerminalRenderer) -> Result<()> {
    let tokens = TokenEstimator::from_settings(&config.tokens);
    let max_tokens = args.max_tokens.unwrap_or(config.context.max_tokens);
    let min_score = args.min_score.unwrap_or(config.context.min_score);
    let top_n = args.top_n.or(config.context.top_n);

    let roots: Vec<ContextRoot> = if args.roots.is_empty() {
        config.context.roots.clone()
    } else {
        args.roots.iter().map(|path| ContextRoot::new(path, root_label(path))).collect()
    };
    let boosts: Vec<CategoryBoost> = args.boosts.iter().chain(&config.context.boosts).cloned().collect();
    let with_dynamic = config.dynamic.enabled && !args.no_dynamic;
    let options = ReportOptions {
        show_scores: args.show_scores,
        show_tokens: args.show_tokens,
    };

    let produce = || -> Result<String> {
        let mut chunks = discover_context_files(&roots, &config.context.extensions, &tokens);
        info!("Scoring {} documents for: {}", chunks.len(), args.task);

        let scorer = if args.keyword_only {
            SemanticScorer::Keyword(KeywordScorer)
        } else {
            let embeddings = Arc::new(EmbeddingCache::open(&config.cache.dir));
            SemanticScorer::from_settings(&config.embeddings, embeddings)
        };

        let spinner = Spinner::start(format!("Scoring {} documents ({})", chunks.len(), scorer.name()));
        score_relevance(&args.task, &mut chunks, &scorer, &boosts);
        spinner.finish();

        let selection = ContextSelector::new(&tokens).select(&chunks, max_tokens, top_n, min_score);
        let dynamic = with_dynamic.then(|| {
            DynamicContext::gather(&config.dynamic).with_recent_files(&roots, config.dynamic.recent_files)
        });

        if args.json {
            let report = SelectReport {
                task: &args.task,
                scorer: scorer.name(),
                dynamic: dynamic.as_ref(),
                selection: &selection,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        } else {
            Ok(format_report(&selection, dynamic.as_ref(), options))
        }
    };

    let output = match args.cache_ttl {
        Some(ttl) => {
            let cache = CacheManager::open(&config.cache);
            let key = MemoKey::builder("context_kit::select")
                .arg(&args.task)
                .kwarg("max_tokens", max_tokens)
                .kwarg("min_score", min_score)
                .debug_kwarg("top_n", top_n)
                .debug_kwarg("roots", &roots)
                .debug_kwarg("boosts", &boosts)
                .debug_kwarg("extensions", &config.context.extensions)
                .kwarg("keyword_only", args.keyword_only)
                .kwarg("dynamic", with_dynamic)
                .kwarg("json", args.json)
                .kwarg("show_scores", args.show_scores)
                .kwarg("show_tokens", args.show_tokens)
                .build();
            cache.try_cached(&key, Some(Duration::from_secs(ttl)), produce)?
        }
        None => produce()?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &output).with_context(|| format!("Failed to write {}", path.display()))?;
            renderer.render_success(&format!("Context written to {}", path.display()));
        }
        None if args.json => println!("{}", output),
        None => renderer.render_markdown(&output),
    }

    Ok(())
}

fn root_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl InputArgs {
    fn read(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()));
        }

        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    }

    fn model(&self, config: &Config) -> String {
        self.model.clone().unwrap_or_else(|| config.tokens.default_model.clone())
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_tokens_command(config: &Config, cmd: TokenCommands, renderer: &TerminalRenderer) -> Result<()> {
    let tokens = TokenEstimator::from_settings(&config.tokens);

    match cmd {
        TokenCommands::Count { input, json } => {
            let text = input.read()?;
            let model = input.model(config);
            let count = tokens.count_tokens(&text, &model);

            if json {
                print_json(&serde_json::json!({
                    "model": model,
                    "tokens": count,
                    "characters": text.chars().count(),
                    "words": text.split_whitespace().count(),
                }))?;
            } else {
                renderer.render_field("Model", &model, 10);
                renderer.render_field("Tokens", count, 10);
                renderer.render_field("Characters", text.chars().count(), 10);
            }
        }
        TokenCommands::Check { input, reserve, json } => {
            let text = input.read()?;
            let model = input.model(config);
            let count = tokens.count_tokens(&text, &model);
            let check = tokens.check_limits(count, &model, reserve);

            if json {
                print_json(&serde_json::json!({
                    "model": model,
                    "tokens": count,
                    "reserved_output_tokens": reserve,
                    "context_limit": check.context_limit,
                    "remaining": check.remaining,
                    "within_limit": check.within_limit,
                }))?;
            } else {
                renderer.render_field("Model", &model, 13);
                renderer.render_field("Tokens", count, 13);
                renderer.render_field("Context limit", check.context_limit, 13);
                renderer.render_field("Remaining", check.remaining, 13);
                if check.within_limit {
                    renderer.render_success("Within context window");
                } else {
                    renderer.render_warning("Exceeds context window");
                }
            }
        }
        TokenCommands::Validate {
            input,
            max_output,
            auto_truncate,
            from,
            output,
            json,
        } => {
            let text = input.read()?;
            let model = input.model(config);
            let max_output = max_output.unwrap_or(config.tokens.default_max_output_tokens);
            let (ok, report) = tokens.validate_before_send(&text, &model, max_output, auto_truncate, from);

            if let (Some(path), Some(prompt)) = (&output, &report.truncated_prompt) {
                std::fs::write(path, prompt).with_context(|| format!("Failed to write {}", path.display()))?;
            }

            if json {
                print_json(&report)?;
            } else {
                renderer.render_field("Model", &report.model, 14);
                renderer.render_field("Prompt tokens", report.prompt_tokens, 14);
                renderer.render_field("Output tokens", report.max_output_tokens, 14);
                renderer.render_field("Context limit", report.context_limit, 14);
                renderer.render_field("Remaining", report.remaining, 14);
                renderer.render_field("Est. cost", format!("${:.6}", report.estimated_cost), 14);
                if report.truncated {
                    renderer.render_info(&format!(
                        "Prompt truncated from {} to {} tokens",
                        report.original_prompt_tokens, report.prompt_tokens
                    ));
                }
            }

            if !ok {
                bail!("Prompt does not fit the {} context window", model);
            }
        }
        TokenCommands::Truncate {
            input,
            max_tokens,
            reserve,
            from,
        } => {
            let text = input.read()?;
            let model = input.model(config);
            println!("{}", tokens.truncate_to_fit(&text, &model, max_tokens, reserve, from));
        }
        TokenCommands::Summarize { input, max_tokens } => {
            let text = input.read()?;
            let model = input.model(config);
            println!("{}", tokens.summarize_to_fit(&text, &model, max_tokens));
        }
        TokenCommands::Cost {
            input_tokens,
            output_tokens,
            model,
            json,
        } => {
            let model = model.unwrap_or_else(|| config.tokens.default_model.clone());
            let cost = tokens.estimate_cost(input_tokens, output_tokens, &model);

            if json {
                print_json(&serde_json::json!({
                    "model": model,
                    "input_tokens": input_tokens,
                    "output_tokens": output_tokens,
                    "estimated_cost": cost,
                    "priced": models::lookup(&model).is_some(),
                }))?;
            } else {
                renderer.render_field("Model", &model, 9);
                renderer.render_field("Est. cost", format!("${:.6}", cost), 9);
            }
        }
        TokenCommands::Models { json } => {
            if json {
                print_json(&MODELS)?;
            } else {
                renderer.render_heading(&format!(
                    "{:<22} {:>10} {:>10} {:>10}",
                    "MODEL", "CONTEXT", "IN $/M", "OUT $/M"
                ));
                for model in MODELS {
                    println!(
                        "{:<22} {:>10} {:>10.3} {:>10.3}",
                        model.id, model.context_limit, model.input_price, model.output_price
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_cache_command(config: &Config, cmd: CacheCommands, renderer: &TerminalRenderer) -> Result<()> {
    let cache = CacheManager::open(&config.cache);

    match cmd {
        CacheCommands::Stats { top, json } => {
            let stats = cache.get_stats(top);
            if json {
                print_json(&stats)?;
            } else {
                print!("{}", stats);
            }
        }
        CacheCommands::Get { key } => {
            let Some(entry) = cache.get_entry(&key) else {
                bail!("No live cache entry for '{}'", key);
            };
            match &entry.value {
                StoredValue::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
                StoredValue::Binary(_) => {
                    renderer.render_info(&format!("<binary value, {} bytes>", entry.size_bytes))
                }
            }
        }
        CacheCommands::Delete { key } => {
            if cache.delete(&key) {
                renderer.render_success(&format!("Deleted '{}'", key));
            } else {
                renderer.render_info(&format!("No entry for '{}'", key));
            }
        }
        CacheCommands::Invalidate { pattern, all } => {
            if pattern.is_none() && !all {
                bail!("Give a pattern, or --all to clear the whole cache");
            }
            let removed = cache.invalidate(pattern.as_deref());
            renderer.render_success(&format!("Removed {} entries", removed));
        }
        CacheCommands::Cleanup => {
            let removed = cache.cleanup_expired();
            renderer.render_success(&format!("Removed {} expired entries", removed));
        }
        CacheCommands::Ttl { key } => match cache.get_ttl(&key) {
            Some(secs) => println!("{}", secs),
            None if cache.exists(&key) => renderer.render_info(&format!("'{}' never expires", key)),
            None => bail!("No live cache entry for '{}'", key),
        },
    }

    Ok(())
}

fn run_embeddings_command(config: &Config, cmd: EmbeddingCommands, renderer: &TerminalRenderer) -> Result<()> {
    let cache = EmbeddingCache::open(&config.cache.dir);

    match cmd {
        EmbeddingCommands::Stats { json } => {
            let available = config.embeddings.enabled && OllamaEmbedder::from_settings(&config.embeddings).is_some();

            if json {
                print_json(&serde_json::json!({
                    "entries": cache.len(),
                    "dir": config.cache.dir.display().to_string(),
                    "model": config.embeddings.model,
                    "url": config.embeddings.url,
                    "available": available,
                }))?;
            } else {
                renderer.render_field("Entries", cache.len(), 9);
                renderer.render_field("Directory", config.cache.dir.display(), 9);
                renderer.render_field("Model", &config.embeddings.model, 9);
                renderer.render_field("Backend", if available { "available" } else { "unavailable" }, 9);
            }
        }
        EmbeddingCommands::Prune { days } => {
            let days = days.unwrap_or(config.embeddings.max_age_days);
            let removed = cache.clear_old(days);
            renderer.render_success(&format!("Removed {} embeddings older than {} days", removed, days));
        }
    }

    Ok(())
}

fn run_usage_command(config: &Config, cmd: UsageCommands, renderer: &TerminalRenderer) -> Result<()> {
    let log = UsageLog::open(&config.cache.dir);

    match cmd {
        UsageCommands::Record {
            model,
            input_tokens,
            output_tokens,
            label,
        } => {
            let tokens = TokenEstimator::from_settings(&config.tokens);
            let model = model.unwrap_or_else(|| config.tokens.default_model.clone());
            let mut record = UsageRecord::new(model, input_tokens, output_tokens, &tokens);
            if let Some(label) = label {
                record = record.with_label(label);
            }

            log.append(&record)
                .with_context(|| format!("Failed to append to {}", log.path().display()))?;
            renderer.render_success(&format!("Recorded {} (${:.6})", record.model, record.cost_usd));
        }
        UsageCommands::Report { days, json } => {
            let records = log
                .load()
                .with_context(|| format!("Failed to read {}", log.path().display()))?;
            let since = days.map(|d| Utc::now() - chrono::Duration::days(d));
            let summary = UsageTracker::from_records(records).summary(since);

            if json {
                print_json(&summary)?;
            } else {
                print!("{}", summary);
            }
        }
    }

    Ok(())
}

fn run_config_command(cmd: ConfigCommands, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => config_init(path, force)?,
        ConfigCommands::Show { section } => config_show(path, section)?,
        ConfigCommands::Path => config_path(path),
        ConfigCommands::Validate => config_validate(path)?,
    }
    Ok(())
}

fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists at: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    Config::default().save_to(path.to_path_buf())?;

    println!("Configuration file created at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Point context.roots at your documentation directories");
    println!("  2. Optionally start Ollama for semantic scoring:");
    println!("     ollama pull nomic-embed-text");
    println!("  3. Optionally use Redis for the cache:");
    println!("     export CACHE_BACKEND=redis REDIS_URL=redis://localhost:6379");

    Ok(())
}

fn config_show(path: &Path, section: Option<String>) -> Result<()> {
    let config = Config::load_from(path.to_path_buf())?;

    let display = match section.as_deref().map(str::to_lowercase).as_deref() {
        None => toml::to_string_pretty(&config)?,
        Some("tokens") => toml::to_string_pretty(&config.tokens)?,
        Some("context") => toml::to_string_pretty(&config.context)?,
        Some("cache") => toml::to_string_pretty(&config.cache)?,
        Some("embeddings") => toml::to_string_pretty(&config.embeddings)?,
        Some("dynamic") => toml::to_string_pretty(&config.dynamic)?,
        Some(other) => {
            println!("Unknown section: {}", other);
            println!("Available: tokens, context, cache, embeddings, dynamic");
            return Ok(());
        }
    };

    println!("{}", display);

    println!("\n--- Environment Variables ---");
    for var in [
        "CONTEXT_KIT_MODEL",
        "CONTEXT_KIT_CACHE_DIR",
        "CACHE_BACKEND",
        "REDIS_URL",
        "REDIS_HOST",
        "OLLAMA_URL",
        "OLLAMA_EMBED_MODEL",
    ] {
        println!("{}: {}", var, std::env::var(var).unwrap_or_else(|_| "not set".to_string()));
    }

    Ok(())
}

fn config_path(path: &Path) {
    println!("{}", path.display());

    if path.exists() {
        println!("(file exists)");
    } else {
        println!("(file does not exist - run 'config init' to create)");
    }
}

fn config_validate(path: &Path) -> Result<()> {
    let config = Config::load_from(path.to_path_buf())?;

    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid!");
            println!();
            println!("Default model: {}", config.tokens.default_model);
            for root in &config.context.roots {
                let status = if root.path.is_dir() { "found" } else { "missing" };
                println!("  Context root {} ({}): {}", root.label, root.path.display(), status);
            }
            println!("Cache: {:?} in {}", config.cache.backend, config.cache.dir.display());
            if config.embeddings.enabled {
                println!("Embeddings: {} at {}", config.embeddings.model, config.embeddings.url);
            } else {
                println!("Embeddings: disabled (keyword similarity)");
            }
            Ok(())
        }
        Err(e) => {
            println!("Configuration validation failed:");
            println!("  {}", e);
            Err(e.into())
        }
    }
}
