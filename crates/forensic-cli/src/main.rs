// Forensic CLI - rank log evidence and assemble forensic prompts

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use forensic_core::{ingest::chunks_from_lines, ForensicReport, LogChunk};
use forensic_rag::{
    load_config, validate_top_k, EngineConfig, Explainer, ForensicEngine, ForensicOutput,
    Investigation, OllamaExplainer,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_ROLE: &str = "Senior Site Reliability Engineer";

#[derive(Parser)]
#[command(name = "forensic")]
#[command(version = "0.1.0")]
#[command(about = "Forensic log evidence ranking and failure reconstruction", long_about = None)]
struct Cli {
    /// Engine config file (TOML)
    #[arg(short, long, env = "FORENSIC_CONFIG")]
    config: Option<PathBuf>,

    /// Industry module, overrides the config file (GENERAL, FINTECH, HEALTHCARE, ...)
    #[arg(short, long, env = "FORENSIC_INDUSTRY")]
    industry: Option<String>,

    /// Embed query and chunks with the local BGE model
    #[cfg(feature = "fastembed")]
    #[arg(long)]
    embed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank log chunks for a query
    Rank {
        /// Log file (.json array of chunks, or one log line per chunk)
        file: PathBuf,

        /// Natural language query
        query: String,

        /// Number of chunks to keep
        #[arg(short = 'k', long, default_value = "10", allow_negative_numbers = true)]
        top_k: i64,
    },

    /// Rank, reconstruct the failure timeline, enrich the report and print the prompt
    Investigate {
        /// Log file (.json array of chunks, or one log line per chunk)
        file: PathBuf,

        /// Natural language query
        query: String,

        /// Persona the model should answer as
        #[arg(short, long, default_value = DEFAULT_ROLE)]
        role: String,

        /// Number of chunks to keep
        #[arg(short = 'k', long, default_value = "10", allow_negative_numbers = true)]
        top_k: i64,

        /// Existing report fields (JSON object)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print the whole output as JSON
        #[arg(long)]
        json: bool,

        /// Send the prompt to Ollama for an explanation
        #[arg(long)]
        explain: bool,

        #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
        ollama_url: String,

        #[arg(long, env = "OLLAMA_MODEL", default_value = "qwen3:8b")]
        model: String,
    },

    /// Print the effective engine configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = effective_config(cli.config.as_deref(), cli.industry.as_deref())?;

    #[cfg(feature = "fastembed")]
    let embed = cli.embed;
    #[cfg(not(feature = "fastembed"))]
    let embed = false;

    match cli.command {
        Commands::Rank { file, query, top_k } => {
            let engine = build_engine(config, embed)?;
            rank_chunks(&engine, &file, &query, top_k)?;
        }
        Commands::Investigate {
            file,
            query,
            role,
            top_k,
            report,
            json,
            explain,
            ollama_url,
            model,
        } => {
            let engine = build_engine(config, embed)?;
            let request = Investigation {
                role,
                query,
                top_k: validate_top_k(top_k)?,
            };
            let output = investigate(&engine, &file, &request, report.as_deref(), json)?;
            if explain {
                let explainer = OllamaExplainer::new(ollama_url, model);
                explain_output(&explainer, &output).await?;
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn effective_config(path: Option<&Path>, industry: Option<&str>) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(industry) = industry {
        config.compliance.industry = industry.to_string();
    }
    Ok(config)
}

#[cfg_attr(not(feature = "fastembed"), allow(unused_variables))]
fn build_engine(config: EngineConfig, embed: bool) -> Result<ForensicEngine, Box<dyn Error>> {
    let engine = ForensicEngine::new(config)?;

    #[cfg(feature = "fastembed")]
    let engine = if embed {
        let provider = forensic_rag::FastEmbedProvider::bge_base()?;
        engine.with_embedding_provider(std::sync::Arc::new(provider))?
    } else {
        engine
    };

    Ok(engine)
}

fn load_chunks(file: &Path) -> Result<Vec<LogChunk>, Box<dyn Error>> {
    let content = fs::read_to_string(file)?;
    let chunks = match file.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str::<Vec<LogChunk>>(&content)?,
        _ => chunks_from_lines(&content),
    };
    info!(file = %file.display(), chunks = chunks.len(), "Chunks loaded");
    Ok(chunks)
}

fn load_report(file: Option<&Path>) -> Result<ForensicReport, Box<dyn Error>> {
    let Some(file) = file else {
        return Ok(ForensicReport::new());
    };
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(file)?)?;
    ForensicReport::from_value(value).ok_or_else(|| "report must be a JSON object".into())
}

fn rank_chunks(engine: &ForensicEngine, file: &Path, query: &str, top_k: i64) -> Result<(), Box<dyn Error>> {
    let top_k = validate_top_k(top_k)?;
    let chunks = load_chunks(file)?;

    println!("\n{} \"{}\"", "Ranking:".cyan().bold(), query);
    println!("{}", "─".repeat(60).dimmed());

    let ranked = engine.rank(query, &chunks, top_k)?;

    if ranked.is_empty() {
        println!("{}", "No evidence selected.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Score", "Lexical", "Vector", "Recency", "Time", "Chunk"]);

    for (i, entry) in ranked.iter().enumerate() {
        let time = entry
            .chunk
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            (i + 1).to_string(),
            format!("{:.2}", entry.score),
            entry.breakdown.lexical.to_string(),
            format!("{:.2}", entry.breakdown.vector),
            format!("{:.2}", entry.breakdown.recency),
            time,
            severity_colored(&truncate(&entry.chunk.text, 60)),
        ]);
    }

    println!("{table}");
    println!(
        "\n{} {} of {}",
        "Selected:".dimmed(),
        ranked.len().to_string().green(),
        chunks.len()
    );

    for skipped in &ranked.excluded {
        println!("{} {} ({})", "Excluded:".red().bold(), skipped.id, skipped.error);
    }

    Ok(())
}

fn investigate(
    engine: &ForensicEngine,
    file: &Path,
    request: &Investigation,
    report: Option<&Path>,
    json: bool,
) -> Result<ForensicOutput, Box<dyn Error>> {
    let chunks = load_chunks(file)?;
    let report = load_report(report)?;
    let output = engine.investigate(request, &chunks, report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(output);
    }

    println!("\n{}", "Prompt:".green().bold());
    println!("{}", "─".repeat(60).dimmed());
    println!("{}", output.prompt);
    println!("{}", "─".repeat(60).dimmed());

    println!("\n{}", "Report:".green().bold());
    println!("{}", serde_json::to_string_pretty(&output.report)?);

    println!(
        "\n{} {} | {} {} | {} {}",
        "Evidence:".dimmed(),
        output.selected.len().to_string().yellow(),
        "Excluded:".dimmed(),
        output.excluded.len().to_string().yellow(),
        "Industry:".dimmed(),
        engine.industry().to_string().cyan()
    );

    Ok(output)
}

async fn explain_output(explainer: &dyn Explainer, output: &ForensicOutput) -> Result<(), Box<dyn Error>> {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Asking {}...", explainer.model()));

    let explanation = explainer.explain(output).await;
    spinner.finish_and_clear();
    let explanation = explanation?;

    println!("\n{}", "Explanation:".green().bold());
    println!("{}", explanation.text);
    if let Some(audit_type) = &explanation.audit_type {
        println!("{} {}", "Filed under:".dimmed(), audit_type.cyan());
    }
    Ok(())
}

fn severity_colored(text: &str) -> String {
    if text.contains("FATAL") {
        text.red().bold().to_string()
    } else if text.contains("ERROR") {
        text.red().to_string()
    } else if text.contains("WARN") {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max - 3).collect::<String>())
    } else {
        text.to_string()
    }
}
