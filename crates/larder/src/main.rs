//! Generate personalized recipes through the cache, or inspect the cache.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Get or generate a recipe
//! larder generate "quick breakfast with eggs" --profile profile.json
//!
//! # Same request with preferences and today's remaining macros
//! larder generate "high protein lunch" --profile profile.json \
//!   --preferences prefs.json --macros macros.json
//!
//! # Show the prompt a cache miss would send, without calling the provider
//! larder prompt "quick breakfast with eggs" --profile profile.json
//!
//! # Cache administration
//! larder stats
//! larder purge
//! larder clear --cache-dir /tmp/larder
//! ```

use clap::{Args, Parser, Subcommand};
use larder::cache::config::{DEFAULT_MAX_ENTRIES, DEFAULT_SIMILARITY_THRESHOLD};
use larder::cache::{CacheConfig, CacheManager, CacheStats, FileStore};
use larder::context::{GenerationRequest, MacroTargets, Preferences, UserProfile};
use larder::generate::{GeneratorConfig, OpenRouterGenerator, RecipeService, RetryConfig};
use larder::prompt::PromptAssembler;
use larder::{DEFAULT_MODEL, OpenRouterClient};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Personalized recipe generation with a safety-gated cache.
#[derive(Parser)]
#[command(name = "larder", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    // ── Cache ──────────────────────────────────────────────────
    /// Directory holding one JSON file per cached recipe
    #[arg(long, global = true, default_value = ".larder/cache")]
    cache_dir: PathBuf,

    /// Days before a cached recipe expires
    #[arg(long, global = true, default_value_t = 7)]
    ttl_days: u64,

    /// Maximum number of cached recipes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ENTRIES)]
    max_entries: usize,

    /// Minimum similarity score (0.0 – 1.0) for reusing a non-identical request
    #[arg(long, global = true, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f64,

    /// Only reuse recipes for identical requests
    #[arg(long, global = true)]
    no_similarity: bool,

    // ── Output ─────────────────────────────────────────────────
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a recipe from the cache or generate a new one
    Generate {
        #[command(flatten)]
        request: RequestArgs,

        /// Model to generate with
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Maximum tokens in the generated recipe
        #[arg(long, default_value_t = 2048)]
        max_tokens: u32,

        /// Sampling temperature
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,

        /// Retries on transient provider errors
        #[arg(long, default_value_t = 2)]
        retries: u32,
    },
    /// Print the prompt a cache miss would send
    Prompt {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Show cache statistics
    Stats,
    /// Remove expired and corrupt cache entries
    Purge,
    /// Delete every cached recipe
    Clear,
}

#[derive(Args)]
struct RequestArgs {
    /// What to cook, e.g. "quick breakfast with eggs"
    prompt: String,

    /// Requesting user id
    #[arg(long)]
    user: Option<String>,

    /// Path to the user profile JSON
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Path to the preferences JSON
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// Path to the remaining-macros JSON
    #[arg(long)]
    macros: Option<PathBuf>,
}

/// Loaded request context.
struct RequestContext {
    request: GenerationRequest,
    profile: UserProfile,
    preferences: Preferences,
    macros: Option<MacroTargets>,
}

impl RequestArgs {
    fn load(&self) -> Result<RequestContext, String> {
        let mut request = GenerationRequest::new(&self.prompt);
        if let Some(user) = &self.user {
            request = request.with_user(user);
        }
        let profile = match &self.profile {
            Some(path) => UserProfile::load_or_default(path)?,
            None => UserProfile::default(),
        };
        let preferences = self
            .preferences
            .as_deref()
            .map(Preferences::load_or_default)
            .unwrap_or_default();
        let macros = self.macros.as_deref().map(load_macros).transpose()?;
        Ok(RequestContext {
            request,
            profile,
            preferences,
            macros,
        })
    }
}

fn load_macros(path: &Path) -> Result<MacroTargets, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read macros {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("failed to parse macros {}: {e}", path.display()))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("larder=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("larder=info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open_cache(cli: &Cli) -> Result<CacheManager, String> {
    let store = FileStore::open(&cli.cache_dir).map_err(|e| e.to_string())?;
    let mut config = CacheConfig::default()
        .with_ttl(Duration::from_secs(cli.ttl_days.saturating_mul(SECS_PER_DAY)))
        .with_max_entries(cli.max_entries)
        .with_similarity_threshold(cli.threshold);
    if cli.no_similarity {
        config = config.without_similarity();
    }
    Ok(CacheManager::new(Arc::new(store), config))
}

fn format_timestamp(ms: Option<u64>) -> String {
    ms.and_then(|ms| i64::try_from(ms).ok())
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_stats(stats: &CacheStats) -> String {
    [
        format!("entries:          {}", stats.count),
        format!("total size:       {} bytes", stats.total_size_bytes),
        format!("oldest:           {}", format_timestamp(stats.oldest_timestamp)),
        format!("newest:           {}", format_timestamp(stats.newest_timestamp)),
        format!("max access count: {}", stats.max_access_count),
        format!("corrupt records:  {}", stats.corrupt_records),
    ]
    .join("\n")
}

async fn run(cli: Cli) -> Result<(), String> {
    match &cli.command {
        Command::Generate {
            request,
            model,
            max_tokens,
            temperature,
            retries,
        } => {
            let ctx = request.load()?;
            let cache = open_cache(&cli)?;
            let api_key = std::env::var("OPENROUTER_KEY")
                .map_err(|_| "OPENROUTER_KEY not set".to_string())?;
            let config = GeneratorConfig::default()
                .with_model(model)
                .with_max_tokens(*max_tokens)
                .with_temperature(*temperature);
            let generator = OpenRouterGenerator::new(OpenRouterClient::new(api_key)?, config);
            let service = RecipeService::new(cache, generator)
                .with_retry(RetryConfig::with_retries(*retries));

            let outcome = service
                .get_or_generate(
                    &ctx.request,
                    &ctx.profile,
                    &ctx.preferences,
                    ctx.macros.as_ref(),
                )
                .await
                .map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&outcome)
                .map_err(|e| format!("failed to render recipe: {e}"))?;
            println!("{json}");
        }
        Command::Prompt { request } => {
            let ctx = request.load()?;
            let prompt = PromptAssembler::default()
                .assemble(
                    &ctx.request,
                    &ctx.profile,
                    &ctx.preferences,
                    ctx.macros.as_ref(),
                )
                .map_err(|e| e.to_string())?;
            println!("=== system ===\n{}\n\n=== user ===\n{}", prompt.system, prompt.user);
        }
        Command::Stats => {
            let stats = open_cache(&cli)?.stats().map_err(|e| e.to_string())?;
            println!("{}", render_stats(&stats));
        }
        Command::Purge => {
            let removed = open_cache(&cli)?
                .purge_expired()
                .map_err(|e| e.to_string())?;
            println!("removed {removed} entries");
        }
        Command::Clear => {
            open_cache(&cli)?.clear().map_err(|e| e.to_string())?;
            println!("cache cleared");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
