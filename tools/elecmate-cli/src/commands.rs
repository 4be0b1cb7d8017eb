//! Command handlers for the consultation CLI.

use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use console::style;
use dialoguer::Input;
use elecmate_core::{ConsultationSummary, Message, StreamCallbacks};
use elecmate_router::RouterClient;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use uuid::Uuid;

const AGENT_ROLES: &[(&str, &str)] = &[
    ("designer", "circuit design, cable sizing and protective devices"),
    ("installer", "installation methods, routes and containment"),
    ("health-safety", "hazards, risk assessment and control measures"),
    ("commissioning", "inspection, testing and certification"),
    ("cost-engineer", "materials and labour costing"),
];

/// Streams tokens straight to the terminal, with a spinner while the
/// agents are still thinking.
struct ConsoleCallbacks {
    spinner: ProgressBar,
    printing: AtomicBool,
}

impl ConsoleCallbacks {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner());
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));
        spinner.set_message("contacting the router...");
        Self {
            spinner,
            printing: AtomicBool::new(false),
        }
    }

    fn start_printing(&self) -> bool {
        !self.printing.swap(true, Ordering::SeqCst)
    }

    fn finish(&self) {
        if !self.printing.load(Ordering::SeqCst) {
            self.spinner.finish_and_clear();
        }
    }
}

#[async_trait]
impl StreamCallbacks for ConsoleCallbacks {
    async fn on_token(&self, text: &str) {
        if self.start_printing() {
            self.spinner.finish_and_clear();
        }
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    async fn on_agent_start(&self, agent: &str, index: Option<u32>, total: Option<u32>) {
        let position = match (index, total) {
            (Some(i), Some(n)) => format!(" ({i}/{n})"),
            _ => String::new(),
        };
        let line = format!("{}{position}", style(agent).cyan().bold());
        if self.printing.load(Ordering::SeqCst) {
            println!("\n\n{line}");
        } else {
            self.spinner.set_message(format!("consulting {agent}..."));
            self.spinner.println(line);
        }
    }

    async fn on_elapsed_time(&self, seconds: u64) {
        if !self.printing.load(Ordering::SeqCst) {
            self.spinner
                .set_message(format!("agents working... {seconds}s"));
        }
    }

    async fn on_still_working(&self, note: &str) {
        self.spinner.println(format!("{}", style(note).dim()));
    }

    async fn on_error(&self, message: &str) {
        self.spinner
            .println(format!("{}", style(message).yellow()));
    }
}

pub async fn consult(
    client: &RouterClient,
    message: &str,
    agents: Option<Vec<String>>,
    target: Option<&str>,
    design_file: Option<&Path>,
    stats: bool,
) -> Result<()> {
    let design = load_design(design_file)?;
    let history = vec![Message::user(message)];

    let callbacks = ConsoleCallbacks::new();
    let outcome = client
        .stream_consultation(&history, &design, agents.as_deref(), target, &callbacks)
        .await;
    callbacks.finish();

    let summary = outcome?;
    println!();
    print_summary(&summary);

    if stats {
        print_stats(client).await;
    }
    Ok(())
}

pub async fn chat(client: &RouterClient, agents: Option<Vec<String>>) -> Result<()> {
    println!(
        "{}",
        style("Elec-Mate consultation session. Type 'exit' to leave.").dim()
    );

    let design = json!({ "conversationId": Uuid::new_v4().to_string() });
    let mut history: Vec<Message> = Vec::new();

    loop {
        let prompt: String = Input::new()
            .with_prompt(format!("[{}] you", chrono::Local::now().format("%H:%M:%S")))
            .interact_text()
            .context("failed to read input")?;
        if prompt.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        history.push(Message::user(prompt));

        let callbacks = ConsoleCallbacks::new();
        match client
            .stream_consultation(&history, &design, agents.as_deref(), None, &callbacks)
            .await
        {
            Ok(summary) => {
                callbacks.finish();
                println!();
                print_summary(&summary);

                let mut reply = Message::assistant(summary.response);
                if !summary.agents.is_empty() {
                    reply.agents = Some(summary.agents);
                }
                history.push(reply);
            }
            Err(err) => {
                callbacks.finish();
                eprintln!("{}", style(err).red());
                // the failed turn stays in the history so it can be retried
            }
        }
    }
    Ok(())
}

pub fn list_agents() {
    println!("{}", style("Available agents").bold());
    for (name, role) in AGENT_ROLES {
        println!("  {:<14} {}", style(name).cyan(), role);
    }
}

fn load_design(path: Option<&Path>) -> Result<Value> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read design file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("design file {} is not valid JSON", path.display()))
        }
        None => Ok(json!({ "conversationId": Uuid::new_v4().to_string() })),
    }
}

fn print_summary(summary: &ConsultationSummary) {
    if !summary.citations.is_empty() {
        println!("\n{}", style("Citations").bold());
        for citation in &summary.citations {
            let source = citation.source.as_deref().unwrap_or("unknown source");
            let reference = citation.reference.as_deref().unwrap_or("-");
            println!("  {} {}", style(reference).cyan(), source);
        }
    }

    if let Some(data) = &summary.structured_data {
        if let Ok(pretty) = serde_json::to_string_pretty(data) {
            println!("\n{}", style("Structured output").bold());
            println!("{pretty}");
        }
    }

    if !summary.consulted_agents.is_empty() {
        println!(
            "\n{} {}",
            style("Consulted:").dim(),
            summary.consulted_agents.join(", ")
        );
    }
    if !summary.suggested_next_agents.is_empty() {
        println!(
            "{} {}",
            style("Suggested next:").dim(),
            summary.suggested_next_agents.join(", ")
        );
    }
}

async fn print_stats(client: &RouterClient) {
    let snapshot = client.metrics().snapshot().await;
    println!("\n{}", style("Consultation metrics").bold());
    println!(
        "  consultations: {} ({} ok, {} failed)",
        snapshot.consultations, snapshot.successes, snapshot.failures
    );
    println!("  token chunks:  {}", snapshot.token_chunks);
    println!("  avg latency:   {:?}", snapshot.avg_latency);
    for (agent, activity) in &snapshot.agents {
        println!(
            "  {:<14} {} responses, {} errors, {} skips",
            agent, activity.responses, activity.errors, activity.skips
        );
    }
}
