use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use pipeline_academy::app::{Academy, TransformPreview};
use pipeline_academy::comparison::comparison;
use pipeline_academy::config::{Config, DEFAULT_CONFIG_PATH};
use pipeline_academy::domain::demo_data::raw_transform_record;
use pipeline_academy::logging;
use pipeline_academy::observability;
use pipeline_academy::pipeline::extract::SourceKind;
use pipeline_academy::pipeline::load::{LoadActivity, LoadStrategy};
use pipeline_academy::pipeline::simulator::PipelinePhase;
use pipeline_academy::pipeline::transform::{Rule, TransformRules};
use pipeline_academy::quiz::QuizState;
use pipeline_academy::server;

#[derive(Parser)]
#[command(name = "pipeline_academy")]
#[command(about = "Interactive lessons on ETL and ELT data pipelines")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every lesson over HTTP
    Serve {
        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Watch one pipeline job move through extract, transform and load
    Overview,
    /// Pull items from sources into the staging bucket (comma-separated: db, api, csv)
    Extract {
        #[arg(long, default_value = "db,api,csv")]
        sources: String,
    },
    /// Clean the sample raw record with the chosen rules
    Transform {
        /// Rules to enable (comma-separated). Available: standardize_name, format_date, clean_currency
        #[arg(long)]
        rules: Option<String>,
        /// Enable every rule
        #[arg(long)]
        all: bool,
    },
    /// Load the incoming batch into the demo warehouse
    Load {
        /// full or incremental
        #[arg(long, default_value = "incremental")]
        strategy: String,
    },
    /// Compare the ETL and ELT paradigms
    Compare,
    /// Take the quiz. Answers are option numbers starting at 1
    Quiz {
        /// Answers in order (comma-separated). Read from stdin when omitted
        #[arg(long)]
        answers: Option<String>,
    },
}

fn parse_list<T>(list: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().with_context(|| format!("invalid value '{s}'")))
        .collect()
}

fn print_preview(preview: &TransformPreview) {
    let enabled: Vec<String> = preview.rules.enabled().iter().map(|r| r.label().to_string()).collect();
    println!("🧰 Rules: {}", if enabled.is_empty() { "none".to_string() } else { enabled.join(", ") });
    println!("   raw:     {} | {} | {} | {}", preview.raw.name, preview.raw.signup_date, preview.raw.amount, preview.raw.status);
    println!(
        "   cleaned: {} | {} | {} | {}",
        preview.cleaned.name, preview.cleaned.signup_date, preview.cleaned.amount, preview.cleaned.status
    );
    if !preview.changed_fields.is_empty() {
        println!("   ✨ changed: {}", preview.changed_fields.join(", "));
    }
}

async fn run_overview(academy: &Academy) -> Result<()> {
    let Some(mut rx) = academy.simulator.start_and_watch() else {
        warn!("Pipeline already running");
        return Ok(());
    };
    println!("🚀 {}", academy.simulator.phase());
    while rx.changed().await.is_ok() {
        let phase = *rx.borrow_and_update();
        println!("➡️  {}", phase);
        if phase == PipelinePhase::Done {
            break;
        }
    }
    println!("✅ Pipeline job finished. Button now reads '{}'", academy.simulator.view().button_label);
    Ok(())
}

async fn run_extract(academy: &Academy, config: &Config, sources: &str) -> Result<()> {
    let kinds: Vec<SourceKind> = parse_list(sources)?;
    let settle = config.timings.extract_delay() + Duration::from_millis(50);
    for kind in kinds {
        println!("📥 {} ({})", kind.display_name(), kind.shape());
        academy.extractor.extract(kind);
        tokio::time::sleep(settle).await;
    }
    let staging = academy.extractor.snapshot();
    println!("🪣 Staging bucket holds {} item(s):", staging.items().len());
    for item in staging.items() {
        println!("   - {} [{}] {}", item.label, item.kind, item.id);
    }
    Ok(())
}

async fn run_load(academy: &Academy, strategy: LoadStrategy) -> Result<()> {
    let mut rx = academy.loader.subscribe();
    if !academy.loader.begin(strategy) {
        warn!("Loader busy, {} load skipped", strategy);
        return Ok(());
    }
    println!("🏗️  Running {} load...", strategy);
    while *rx.borrow_and_update() != LoadActivity::Idle {
        if rx.changed().await.is_err() {
            break;
        }
    }
    let view = academy.loader.view();
    println!("📦 Warehouse ({} rows):", view.rows.len());
    for row in &view.rows {
        let marker = if row.fresh { "✨" } else { "  " };
        println!("   {} {} {} {}", marker, row.record.id, row.record.name, row.record.amount);
    }
    Ok(())
}

async fn run_quiz(academy: &Academy, answers: Option<String>) -> Result<()> {
    let scripted: Option<Vec<usize>> = answers.map(|a| parse_list(&a)).transpose()?;
    let mut scripted = scripted.map(Vec::into_iter);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut rx = academy.quiz.subscribe();

    while let QuizState::Answering(index) = academy.quiz.session().state() {
        let bank = academy.quiz.bank();
        let Some(question) = bank.get(index) else { break };
        println!("\n❓ ({}/{}) {}", index + 1, bank.len(), question.question);
        for (i, option) in question.options.iter().enumerate() {
            println!("   {}. {}", i + 1, option);
        }

        let choice = match scripted.as_mut() {
            Some(it) => match it.next() {
                Some(choice) => choice,
                None => break,
            },
            None => match lines.next() {
                Some(line) => match line?.trim().parse::<usize>() {
                    Ok(choice) => choice,
                    Err(_) => {
                        println!("⚠️  Enter an option number");
                        continue;
                    }
                },
                None => break,
            },
        };

        let Some(option) = choice.checked_sub(1) else {
            println!("⚠️  Options start at 1");
            continue;
        };
        match academy.quiz.select_option(option) {
            Ok(Some(feedback)) if feedback.correct => println!("✅ Correct!"),
            Ok(Some(feedback)) => println!("❌ Wrong, the answer was {}", feedback.correct_answer + 1),
            Ok(None) => continue,
            Err(e) => {
                println!("⚠️  {}", e);
                continue;
            }
        }

        // Wait for the feedback delay to move the quiz on
        loop {
            rx.changed().await?;
            let session = rx.borrow_and_update().clone();
            if !session.is_answered || session.is_complete {
                break;
            }
        }
    }

    let session = academy.quiz.session();
    if session.is_complete {
        let bank = academy.quiz.bank();
        println!("\n🏁 Score: {}/{}", session.score, bank.len());
        println!("{}", session.verdict(bank).message());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;

    logging::init_logging(&config.logging);
    observability::init_metrics();
    info!(config = %cli.config.display(), "Configuration loaded");

    let academy = Arc::new(Academy::from_config(&config)?);

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            if let Err(e) = server::start_server(academy, &config.server.host, port).await {
                error!("Server failed: {}", e);
                return Err(e.into());
            }
        }
        Commands::Overview => run_overview(&academy).await?,
        Commands::Extract { sources } => run_extract(&academy, &config, &sources).await?,
        Commands::Transform { rules, all } => {
            let rules = match (all, rules) {
                (true, _) => TransformRules::all(),
                (false, Some(list)) => TransformRules::from_rules(parse_list::<Rule>(&list)?),
                (false, None) => TransformRules::default(),
            };
            print_preview(&TransformPreview::new(raw_transform_record(), rules));
        }
        Commands::Load { strategy } => run_load(&academy, strategy.parse()?).await?,
        Commands::Compare => {
            for summary in comparison() {
                let stages: Vec<String> = summary.stages.iter().map(|s| format!("{s:?}")).collect();
                println!("🔀 {}: {}", summary.title, stages.join(" → "));
                println!("   transforms in: {}", summary.transform_location);
                println!("   {}", summary.description);
            }
        }
        Commands::Quiz { answers } => run_quiz(&academy, answers).await?,
    }
    Ok(())
}
