//! Terminal front-end for the bedside simulator.
//!
//! Runs a line-oriented consultation loop against the Gemini gateway:
//! plain input is sent to the patient, slash commands inspect clinical
//! data panels and submit a diagnosis for scoring.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bedside::audio::{NullSink, SpeakingState, SpeechPlayer};
use bedside::case::CaseDefinition;
use bedside::config::Config;
use bedside::gateway::PatientGateway;
use bedside::gateway::gemini::GeminiGateway;
use bedside::sim::{
    ClinicalDataStore, ConversationController, DataCategory, EvaluationController,
    EvaluationReport, Sender, SlotStatus, Transcript,
};

/// Virtual-patient diagnostic training simulator.
#[derive(Parser)]
#[command(name = "bedside", version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Generate a patient portrait and save it as portrait.jpg
    #[arg(long)]
    portrait: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path).context("failed to load config")?,
        None => Config::default(),
    };

    let case = Arc::new(CaseDefinition::appendicitis());
    let gateway: Arc<dyn PatientGateway> =
        Arc::new(GeminiGateway::new(&config.gateway, cli.api_key.clone()));
    info!(gateway = gateway.name(), patient = %case.profile.name, "starting session");

    if cli.portrait {
        match gateway.generate_portrait(&case.portrait_prompt).await {
            Ok(bytes) => {
                std::fs::write("portrait.jpg", &bytes)
                    .context("failed to write portrait.jpg")?;
                println!("Saved portrait.jpg ({} bytes).", bytes.len());
            }
            Err(error) => warn!(%error, "portrait generation failed"),
        }
    }

    let transcript = Transcript::new();
    let store = ClinicalDataStore::new(gateway.clone(), case.clone(), transcript.clone());
    let speech = SpeechPlayer::from_config(
        Arc::new(NullSink),
        SpeakingState::default(),
        &config.audio,
    );

    let mut conversation = ConversationController::new(
        gateway.clone(),
        case.clone(),
        transcript.clone(),
        store.clone(),
        Some(speech),
    );
    let mut evaluation = EvaluationController::new(gateway, case);
    conversation.start();

    println!("Type to talk to the patient. Commands: /data <history|exam|labs|imaging>, /submit <diagnosis>, /report, /quit");
    let mut printed = flush_transcript(&transcript, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            printed = flush_transcript(&transcript, printed);
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let (command, arg) = rest.split_once(' ').unwrap_or((rest, ""));
            match command {
                "quit" | "exit" => break,
                "data" => show_data(&store, arg),
                "submit" => match evaluation.submit(arg).await {
                    Ok(()) => {
                        if let Some(report) = evaluation.report() {
                            print_report(report);
                        }
                        if evaluation.celebration().is_active() {
                            println!("\u{1f389} Outstanding performance!");
                        }
                    }
                    Err(error) => println!("Evaluation failed: {error}"),
                },
                "report" => match evaluation.report() {
                    Some(report) => print_report(report),
                    None => println!("No report yet; use /submit <diagnosis> first."),
                },
                _ => println!("Unknown command: /{command}"),
            }
        } else if let Err(error) = conversation.send_user_message(line).await {
            println!("{error}");
        }

        printed = flush_transcript(&transcript, printed);
    }

    Ok(())
}

/// Print transcript entries appended since the last flush. Returns the new
/// high-water mark.
fn flush_transcript(transcript: &Transcript, printed: usize) -> usize {
    let messages = transcript.snapshot();
    for message in &messages[printed..] {
        let label = match message.sender {
            Sender::User => "You",
            Sender::Patient => "Patient",
            Sender::System => "*",
        };
        println!("{label}: {}", message.text);
    }
    messages.len()
}

fn show_data(store: &ClinicalDataStore, arg: &str) {
    let Ok(category) = arg.trim().parse::<DataCategory>() else {
        println!("Unknown category: {arg:?}. Expected history, exam, labs, or imaging.");
        return;
    };
    match store.status(category) {
        SlotStatus::Populated => {
            if let Some(text) = store.get(category) {
                println!("--- {} ---\n{text}", category.label());
            }
        }
        SlotStatus::Loading => println!("{} data is still being generated.", category.label()),
        SlotStatus::Empty => println!(
            "{} data is not available yet. Ask the patient the right questions.",
            category.label()
        ),
    }
}

fn print_report(report: &EvaluationReport) {
    println!("=== Evaluation: {}/100 ===", report.score);
    println!("{}", report.overall_summary);
    for task in &report.critical_checklist {
        let mark = if task.status { "[x]" } else { "[ ]" };
        println!("  {mark} {} - {}", task.task, task.feedback);
    }
    if !report.missed_opportunities.is_empty() {
        println!("Missed opportunities:");
        for item in &report.missed_opportunities {
            println!("  - {item}");
        }
    }
    println!("Textbook insight: {}", report.textbook_insight);
}
