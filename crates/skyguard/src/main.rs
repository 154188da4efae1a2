//! `skyguard` - CLI for the safety risk register
//!
//! This binary records hazards, changes their status and renders the
//! register's projections: the risk table, the 5x5 matrix and the dashboard
//! statistics.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use skyguard::aggregate::{DashboardSummary, MatrixCell, StageBreakdown, StatusBreakdown};
use skyguard::cli::{
    AddCommand, Cli, Command, ConfigCommand, ListCommand, OutputFormat, StatsCommand,
    StatusCommand, SuggestCommand,
};
use skyguard::suggest::{
    GeminiProvider, SuggestOutcome, Suggestion, SuggestionAssistant, SuggestionRequest,
};
use skyguard::{init_logging, Config, RiskDraft, RiskId, RiskRecord, RiskStore, SqliteSlot};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config_path = cli.config.clone();
    let load_config =
        || Config::load_from(config_path.clone()).context("failed to load configuration");

    // Execute the command
    match cli.command {
        Command::Add(cmd) => handle_add(&load_config()?, cmd).await,
        Command::List(cmd) => handle_list(&load_config()?, &cmd),
        Command::Status(cmd) => handle_status(&load_config()?, &cmd),
        Command::Remove(cmd) => handle_remove(&load_config()?, &cmd.id),
        Command::Stats(cmd) => handle_stats(&load_config()?, &cmd),
        Command::Matrix => handle_matrix(&load_config()?),
        Command::Suggest(cmd) => handle_suggest(&load_config()?, cmd).await,
        Command::Config(cmd) => handle_config(config_path.clone(), cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<RiskStore<SqliteSlot>> {
    let path = config.database_path();
    let slot = SqliteSlot::open(&path, config.storage.slot_name.clone())
        .with_context(|| format!("failed to open register at {}", path.display()))?;
    Ok(RiskStore::open(slot))
}

fn build_assistant(config: &Config) -> anyhow::Result<SuggestionAssistant<GeminiProvider>> {
    if !config.suggestion.enabled {
        bail!("the suggestion service is disabled in the configuration");
    }
    let Some(api_key) = config.api_key() else {
        bail!("no API key configured (set suggestion.api_key, GEMINI_API_KEY or API_KEY)");
    };
    let provider = GeminiProvider::new(
        config.suggestion.endpoint.clone(),
        config.suggestion.model.clone(),
        api_key,
        config.suggestion_timeout(),
    )?;
    Ok(SuggestionAssistant::new(provider, config.suggestion_timeout()))
}

async fn handle_add(config: &Config, cmd: AddCommand) -> anyhow::Result<()> {
    let mut draft = RiskDraft::new(cmd.title.clone(), cmd.description.clone(), cmd.stage.into());

    if cmd.suggest {
        let assistant = build_assistant(config)?;
        match assistant.enrich(&mut draft).await {
            SuggestOutcome::Suggested(suggestion) => {
                println!("Consequences: {}", suggestion.consequences);
                println!();
            }
            _ => println!("No suggestion available; using the values given."),
        }
    }

    // Explicit flags win over a suggestion
    if let Some(likelihood) = cmd.likelihood() {
        draft.likelihood = likelihood;
    }
    if let Some(severity) = cmd.severity {
        draft.severity = severity.into();
    }
    if let Some(mitigation) = cmd.mitigation {
        draft.mitigation_plan = mitigation;
    }

    let record = draft.finalize()?;
    let mut store = open_store(config)?;
    store.add(record.clone())?;

    println!("Recorded {}", record.id);
    println!(
        "  {} ({} {}, {})",
        record.title,
        record.matrix_code(),
        record.tier(),
        record.stage
    );
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let records = store.filter_by_stage(cmd.stage);

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Table => print_table(&records),
        OutputFormat::Plain => {
            for record in records {
                print_record(record);
                println!();
            }
        }
    }
    Ok(())
}

fn print_table(records: &[&RiskRecord]) {
    if records.is_empty() {
        println!("No risks recorded.");
        return;
    }

    println!(
        "{:<26}  {:<32}  {:<20}  {:<4}  {:<12}  {:<9}",
        "ID", "TITLE", "STAGE", "CODE", "TIER", "STATUS"
    );
    for record in records {
        println!(
            "{:<26}  {:<32}  {:<20}  {:<4}  {:<12}  {:<9}",
            record.id.as_str(),
            truncate(&record.title, 32),
            record.stage.label(),
            record.matrix_code(),
            record.tier().label(),
            record.status.to_string()
        );
    }
}

fn print_record(record: &RiskRecord) {
    println!("{}  {}", record.id, record.title);
    println!("  Stage:        {}", record.stage);
    println!(
        "  Risk:         {} ({} / {}) {}",
        record.matrix_code(),
        record.likelihood.label(),
        record.severity.label(),
        record.tier()
    );
    println!("  Status:       {}", record.status);
    println!("  Description:  {}", record.description);
    println!("  Mitigation:   {}", record.mitigation_plan);
    println!("  Created:      {}", record.created_at.to_rfc3339());
    println!("  Last review:  {}", record.last_review.to_rfc3339());
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let id = RiskId::from(cmd.id.as_str());
    if !store.update_status(&id, cmd.status.into()) {
        bail!("no risk with id {id}");
    }
    println!("{id} is now {}", skyguard::Status::from(cmd.status));
    Ok(())
}

fn handle_remove(config: &Config, id: &str) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let id = RiskId::from(id);
    if !store.remove(&id) {
        bail!("no risk with id {id}");
    }
    println!("Removed {id}");
    Ok(())
}

fn handle_stats(config: &Config, cmd: &StatsCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let summary = store.dashboard_summary();
    let stages = store.stage_breakdown();
    let statuses = store.status_breakdown();

    if cmd.json {
        let stats = serde_json::json!({
            "summary": summary,
            "stages": stages,
            "statuses": statuses,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print_summary(&summary);
    println!();
    print_stage_breakdown(&stages);
    println!();
    print_status_breakdown(&statuses);

    let slot = store.backend().stats()?;
    println!();
    println!("[Storage]");
    println!("  Database:           {}", store.backend().path().display());
    println!("  Slot:               {}", slot.slot_name);
    println!("  Payload size:       {} bytes", slot.payload_bytes);
    if let Some(updated_at) = slot.updated_at {
        println!("  Last write:         {}", updated_at.to_rfc3339());
    }
    Ok(())
}

fn print_summary(summary: &DashboardSummary) {
    println!("Safety Performance Indicators");
    println!("=============================");
    println!("  Total risks:        {}", summary.total);
    println!("  Critical (High):    {}", summary.critical);
    println!("  Unresolved High:    {}", summary.unresolved_critical);
    println!("  Latent:             {}", summary.latent);
    println!(
        "  Mitigation:         {}%",
        summary.mitigation_efficiency_rounded()
    );
}

fn print_stage_breakdown(stages: &[StageBreakdown]) {
    println!("[By stage]");
    for row in stages {
        println!(
            "  {:<28} {:>3}  (high {}, medium {}, low {})",
            row.stage.label(),
            row.total,
            row.high,
            row.medium,
            row.low
        );
    }
}

fn print_status_breakdown(statuses: &StatusBreakdown) {
    println!("[By status]");
    println!("  Active:             {}", statuses.active);
    println!("  Mitigated:          {}", statuses.mitigated);
    println!("  Latent:             {}", statuses.latent);
}

fn handle_matrix(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let matrix = store.risk_matrix();

    println!("Risk Matrix (likelihood x severity)");
    println!();
    print!("{:<24}", "");
    for severity in skyguard::Severity::ALL {
        print!("  {:^7}", severity.to_string());
    }
    println!();

    for row in &matrix {
        let Some(first) = row.first() else { continue };
        print!(
            "{:<24}",
            format!("{} {}", first.likelihood, first.likelihood.label())
        );
        for cell in row {
            print!("  {}", matrix_cell(cell));
        }
        println!();
    }

    let samples: Vec<&MatrixCell> = matrix
        .iter()
        .flatten()
        .filter(|cell| cell.count > 0)
        .collect();
    if !samples.is_empty() {
        println!();
        for cell in samples {
            println!(
                "  {}{}: {}",
                cell.likelihood,
                cell.severity,
                cell.sample_titles.join("; ")
            );
        }
    }
    Ok(())
}

fn matrix_cell(cell: &MatrixCell) -> String {
    let marker = match cell.tier {
        skyguard::Tier::High => 'H',
        skyguard::Tier::Medium => 'M',
        skyguard::Tier::Low => 'L',
    };
    format!("{:>3} {:<3}", cell.count, marker)
}

async fn handle_suggest(config: &Config, cmd: SuggestCommand) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    let request = SuggestionRequest {
        title: cmd.title,
        description: cmd.description,
        stage: cmd.stage.into(),
    };

    match assistant.request(&request).await {
        SuggestOutcome::Suggested(suggestion) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&suggestion)?);
            } else {
                print_suggestion(&suggestion);
            }
            Ok(())
        }
        SuggestOutcome::NotReady => bail!("title and description must not be blank"),
        SuggestOutcome::Busy | SuggestOutcome::NoResult => {
            bail!("no suggestion available")
        }
    }
}

fn print_suggestion(suggestion: &Suggestion) {
    let tier = skyguard::classify(
        suggestion.suggested_likelihood,
        suggestion.suggested_severity,
    );
    println!("Consequences:");
    println!("  {}", suggestion.consequences);
    println!();
    println!("Suggested mitigation:");
    println!("  {}", suggestion.suggested_mitigation);
    println!();
    println!(
        "Suggested classification: {}{} ({})",
        suggestion.suggested_likelihood, suggestion.suggested_severity, tier
    );
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Slot name:          {}", config.storage.slot_name);
                println!();
                println!("[Suggestion]");
                println!("  Enabled:            {}", config.suggestion.enabled);
                println!("  Endpoint:           {}", config.suggestion.endpoint);
                println!("  Model:              {}", config.suggestion.model);
                println!("  Timeout (secs):     {}", config.suggestion.timeout_secs);
                println!(
                    "  API key:            {}",
                    if config.api_key().is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                );
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
