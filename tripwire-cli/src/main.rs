//! Tripwire CLI
//!
//! Multi-signal scam message detection with optional LLM oracle fusion.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use tripwire_core::{ConversationContext, EngineConfig, HistoryMessage, PatternLibrary, RuleEngine};
use tripwire_oracle::{backend_from_settings, BackendSettings, DetectionPrompt, LlmOracle, Provider, SharedOracle};
use tripwire_runtime::{DetectionReport, DetectionRequest, Detector, DetectorConfig};

#[derive(Parser)]
#[command(name = "tripwire")]
#[command(author, version, about = "Tripwire: multi-signal scam message detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    /// Scam library JSON (default: built-in library)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Engine tuning TOML (default: built-in values)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Oracle consulted after the rule engine
    #[arg(long, value_enum, default_value = "none", global = true)]
    oracle: OracleChoice,

    /// Oracle model (default depends on provider)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", global = true, hide_env_values = true)]
    anthropic_key: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
    #[arg(long, env = "OPENROUTER_API_KEY", global = true, hide_env_values = true)]
    openrouter_key: Option<String>,

    /// OpenAI-compatible endpoint (required for --oracle local)
    #[arg(long, env = "TRIPWIRE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Oracle timeout in seconds
    #[arg(long, default_value = "10", global = true)]
    oracle_timeout: u64,

    /// Detection prompt TOML (default: built-in prompt)
    #[arg(long, global = true)]
    prompt: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single message
    Detect {
        /// The message text
        #[arg(short, long)]
        message: String,

        /// Sender identifier (e.g. HDFCBK)
        #[arg(long)]
        sender_id: Option<String>,

        /// Conversation history as a JSON array of {role, text}
        #[arg(long)]
        history: Option<PathBuf>,

        /// Prior turns in the conversation (overrides the history length)
        #[arg(long)]
        turns: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a JSONL file of requests
    Batch {
        /// Input file, one request per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: reports_<timestamp>.jsonl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Concurrent detections
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Show library statistics or one scam type
    Library {
        /// Scam type identifier to show
        #[arg(long)]
        scam_type: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OracleChoice {
    None,
    Anthropic,
    Openai,
    Openrouter,
    Local,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match &cli.command {
        Commands::Detect {
            message,
            sender_id,
            history,
            turns,
            json,
        } => {
            let mut request = DetectionRequest::new(message);
            if let Some(sender_id) = sender_id {
                request = request.with_sender(sender_id);
            }
            if let Some(path) = history {
                request = request.with_history(read_history(path)?);
            }
            if let Some(turn_count) = turns {
                request.context = Some(ConversationContext {
                    turn_count: *turn_count,
                    ..Default::default()
                });
            }

            let detector = build_detector(&cli)?;
            let report = detector.detect(request).await;
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Batch {
            input,
            output,
            concurrency,
        } => {
            let detector = build_detector(&cli)?;
            run_batch(&detector, input, output.clone(), *concurrency).await?;
        }
        Commands::Library { scam_type } => {
            let engine = build_engine(&cli)?;
            show_library(engine.library(), scam_type.as_deref())?;
        }
    }

    Ok(())
}

fn build_engine(cli: &Cli) -> Result<RuleEngine> {
    let library = match &cli.library {
        Some(path) => {
            let load = PatternLibrary::from_file(path);
            if load.is_degraded() {
                warn!("Library {} loaded with {} issues", path.display(), load.issues.len());
            }
            load.library
        }
        None => PatternLibrary::embedded(),
    };

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    Ok(RuleEngine::new(library, config))
}

fn build_oracle(cli: &Cli) -> Result<Option<SharedOracle>> {
    let (provider, key) = match cli.oracle {
        OracleChoice::None => return Ok(None),
        OracleChoice::Anthropic => (
            Provider::Anthropic,
            cli.anthropic_key.clone().ok_or_else(|| {
                anyhow!("Anthropic API key required. Set ANTHROPIC_API_KEY or use --anthropic-key")
            })?,
        ),
        OracleChoice::Openai => (
            Provider::OpenAI,
            cli.api_key
                .clone()
                .ok_or_else(|| anyhow!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key"))?,
        ),
        OracleChoice::Openrouter => (
            Provider::OpenRouter,
            cli.openrouter_key.clone().ok_or_else(|| {
                anyhow!("OpenRouter API key required. Set OPENROUTER_API_KEY or use --openrouter-key")
            })?,
        ),
        OracleChoice::Local => {
            if cli.base_url.is_none() {
                return Err(anyhow!("Local oracle requires an endpoint. Set TRIPWIRE_BASE_URL or use --base-url"));
            }
            (Provider::Local, String::new())
        }
    };

    let prompt = match &cli.prompt {
        Some(path) => DetectionPrompt::from_file(path)?,
        None => DetectionPrompt::embedded(),
    };

    let mut settings = BackendSettings::new(provider, &key);
    if let Some(model) = &cli.model {
        settings = settings.with_model(model);
    }
    settings.base_url = cli.base_url.clone();
    settings.max_tokens = prompt.output.max_tokens;
    settings.temperature = prompt.output.temperature;
    settings.request_timeout = Duration::from_secs(cli.oracle_timeout.max(1));

    let backend = backend_from_settings(&settings)?;
    Ok(Some(Arc::new(LlmOracle::with_prompt(backend, prompt))))
}

fn build_detector(cli: &Cli) -> Result<Detector> {
    let mut config = DetectorConfig::local(build_engine(cli)?)
        .with_timeout(Duration::from_secs(cli.oracle_timeout.max(1)));
    if let Some(oracle) = build_oracle(cli)? {
        config = config.with_oracle(oracle);
    }
    Ok(Detector::new(config))
}

fn read_history(path: &Path) -> Result<Vec<HistoryMessage>> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read history {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| anyhow!("Invalid history {}: {}", path.display(), e))
}

fn print_report(report: &DetectionReport) {
    let result = &report.result;
    let verdict = if result.is_scam() { "🚨 SCAM" } else { "✅ Not a scam" };

    println!("{} (confidence {:.2})", verdict, result.confidence());
    if let Some(scam_type) = result.scam_type() {
        println!("🏷️  Type: {}", scam_type);
    }
    println!("🧭 Path: {:?} | Oracle: {:?}", report.path, report.oracle);
    if !result.indicators().is_empty() {
        println!("🔍 Indicators:");
        for indicator in result.indicators() {
            println!("   - {}", indicator);
        }
    }
}

async fn run_batch(detector: &Detector, input: &Path, output: Option<PathBuf>, concurrency: usize) -> Result<()> {
    let content = fs::read_to_string(input)
        .map_err(|e| anyhow!("Failed to read {}: {}", input.display(), e))?;

    let mut requests = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let request: DetectionRequest = serde_json::from_str(line)
            .map_err(|e| anyhow!("{}:{}: invalid request: {}", input.display(), n + 1, e))?;
        requests.push(request);
    }

    println!("📥 {} requests from {}", requests.len(), input.display());
    let reports = detector.detect_batch(requests, concurrency).await;

    let mut lines = Vec::with_capacity(reports.len());
    for report in &reports {
        lines.push(serde_json::to_string(report)?);
    }

    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("reports_{}.jsonl", timestamp))
    });
    fs::write(&output_path, lines.join("\n") + "\n")?;

    let flagged = reports.iter().filter(|r| r.result.is_scam()).count();
    println!("✅ {} flagged as scam out of {}", flagged, reports.len());
    println!("📄 Reports saved to: {}", output_path.display());

    Ok(())
}

fn show_library(library: &PatternLibrary, scam_type: Option<&str>) -> Result<()> {
    let Some(id) = scam_type else {
        let stats = library.stats();
        println!("📚 Scam library v{} (updated {})", stats.library_version, stats.last_updated);
        println!("   Scam types: {}", stats.total_scam_types);
        println!("   Patterns:   {} compiled / {} declared", stats.compiled_patterns, stats.total_patterns);
        println!("   Keywords:   {}", stats.total_keywords);
        println!("   Fingerprint: {}", stats.fingerprint);
        for definition in library.scam_types() {
            let risk = definition.risk_level.map(|r| r.as_str()).unwrap_or("unknown");
            println!("   - {} ({}, {})", definition.id, definition.category, risk);
        }
        return Ok(());
    };

    let definition = library
        .get(id)
        .ok_or_else(|| anyhow!("Unknown scam type: {}", id))?;

    println!("🏷️  {}", definition.id);
    println!("   Category: {}", definition.category);
    println!(
        "   Risk: {}",
        definition.risk_level.map(|r| r.as_str()).unwrap_or("unknown")
    );
    match definition.confidence_weight {
        Some(weight) => println!("   Confidence weight: {:.2}", weight),
        None => println!("   Confidence weight: default"),
    }
    println!("   Keywords: {}", definition.keywords.join(", "));
    println!("   Intent signals: {}", definition.intent_signals.join(", "));
    println!("   Patterns:");
    for pattern in &definition.patterns {
        println!("     {}", pattern.as_str());
    }
    if !definition.example_messages.is_empty() {
        println!("   Examples:");
        for example in &definition.example_messages {
            println!("     \"{}\"", example);
        }
    }

    Ok(())
}
