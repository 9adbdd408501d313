#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input, Select};
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tandem::adapter::{EndpointConfig, HttpMethod, HttpTransport};
use tandem::clipboard;
use tandem::config::Settings;
use tandem::history::{Role, Slot};
use tandem::providers::ProviderCatalog;
use tandem::session::{SendOutcome, Session};
use tandem::store::JsonFileStore;
use tandem::util::truncate_with_ellipsis;

/// `tandem` - one prompt, two endpoints, side-by-side answers.
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(version = "0.1.0")]
#[command(about = "Side-by-side comparison chat for any two AI HTTP endpoints.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive dual-pane chat loop
    Chat,

    /// Send one message and print the replies
    Send {
        /// Message text
        message: String,

        /// Target a single slot (primary or secondary); default is both
        #[arg(short, long)]
        slot: Option<String>,
    },

    /// Inspect or edit the two endpoint slots
    Endpoint {
        #[command(subcommand)]
        endpoint_command: EndpointCommands,
    },

    /// Show or clear conversation history
    History {
        #[command(subcommand)]
        history_command: HistoryCommands,
    },

    /// Write a pane's transcript to a markdown file
    Export {
        /// Slot to export (primary or secondary)
        slot: String,

        /// Directory to write into (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Inspect or copy captured request/response traces
    Trace {
        #[command(subcommand)]
        trace_command: TraceCommands,
    },

    /// List the builtin providers
    Providers {
        /// Show full details for one provider id
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum EndpointCommands {
    /// Print the current configuration for one or both slots
    Show {
        /// Slot to show (primary or secondary); default is both
        #[arg(short, long)]
        slot: Option<String>,
    },

    /// Edit one slot (interactive form when no flags are given)
    Edit {
        /// Slot to edit (primary or secondary)
        slot: String,

        /// Display label for the pane
        #[arg(long)]
        label: Option<String>,

        /// Endpoint URL
        #[arg(long)]
        url: Option<String>,

        /// Provider id (gemini, openai, claude)
        #[arg(long)]
        provider: Option<String>,

        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(long)]
        method: Option<String>,

        /// Content-Type header default
        #[arg(long)]
        content_type: Option<String>,

        /// Header as key=value (repeatable; replaces the existing set)
        #[arg(long = "header")]
        headers: Vec<String>,

        /// Query parameter as key=value (repeatable; replaces the existing set)
        #[arg(long = "param")]
        params: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// Print a pane's conversation
    Show {
        /// Slot to show (primary or secondary); default is both
        #[arg(short, long)]
        slot: Option<String>,
    },

    /// Clear one pane, or everything when no slot is given
    Clear {
        /// Slot to clear (primary or secondary)
        #[arg(short, long)]
        slot: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TraceCommands {
    /// Print the request and response views of a trace
    Show {
        /// Assistant turn id (shown next to each reply)
        turn_id: String,

        /// Request view only
        #[arg(long)]
        request: bool,

        /// Response view only
        #[arg(long)]
        response: bool,
    },

    /// Copy a trace as formatted JSON (or just the answer text)
    Copy {
        /// Assistant turn id
        turn_id: String,

        /// Copy only the extracted answer text
        #[arg(long)]
        answer: bool,
    },
}

/// Flag-driven changes for `endpoint edit`.
#[derive(Debug, Default)]
struct EndpointOverrides {
    label: Option<String>,
    url: Option<String>,
    provider: Option<String>,
    method: Option<String>,
    content_type: Option<String>,
    headers: Vec<String>,
    params: Vec<String>,
}

impl EndpointOverrides {
    fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.url.is_none()
            && self.provider.is_none()
            && self.method.is_none()
            && self.content_type.is_none()
            && self.headers.is_empty()
            && self.params.is_empty()
    }
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let settings = Settings::load_or_init()?;
    let store = JsonFileStore::new(&settings.resolved_data_dir);
    let transport = HttpTransport::new(settings.request_timeout(), settings.connect_timeout());
    let mut session = Session::load(Box::new(store), Box::new(transport))?;

    match cli.command {
        Commands::Chat => run_chat(&mut session).await,

        Commands::Send { message, slot } => handle_send(&mut session, &message, slot.as_deref()).await,

        Commands::Endpoint { endpoint_command } => match endpoint_command {
            EndpointCommands::Show { slot } => handle_endpoint_show(&session, slot.as_deref()),
            EndpointCommands::Edit {
                slot,
                label,
                url,
                provider,
                method,
                content_type,
                headers,
                params,
            } => {
                let overrides = EndpointOverrides {
                    label,
                    url,
                    provider,
                    method,
                    content_type,
                    headers,
                    params,
                };
                handle_endpoint_edit(&mut session, &slot, overrides)
            }
        },

        Commands::History { history_command } => match history_command {
            HistoryCommands::Show { slot } => handle_history_show(&session, slot.as_deref()),
            HistoryCommands::Clear { slot, yes } => {
                handle_history_clear(&mut session, slot.as_deref(), yes)
            }
        },

        Commands::Export { slot, out } => handle_export(&session, slot.parse()?, out),

        Commands::Trace { trace_command } => match trace_command {
            TraceCommands::Show {
                turn_id,
                request,
                response,
            } => handle_trace_show(&session, &turn_id, request, response),
            TraceCommands::Copy { turn_id, answer } => {
                handle_trace_copy(&session, &turn_id, answer)
            }
        },

        Commands::Providers { id } => handle_providers(&session, id.as_deref()),
    }
}

// ── Sending ─────────────────────────────────────────────────────────────

async fn handle_send(session: &mut Session, message: &str, slot: Option<&str>) -> Result<()> {
    match slot {
        Some(slot) => {
            let slot: Slot = slot.parse()?;
            let outcome = session.send(slot, message).await?;
            announce_outcome(&pane_label(session, slot), &outcome);
        }
        None => {
            let outcomes = session.send_both(message).await?;
            announce_outcome(&pane_label(session, Slot::Primary), &outcomes.primary);
            announce_outcome(&pane_label(session, Slot::Secondary), &outcomes.secondary);
        }
    }
    Ok(())
}

fn pane_label(session: &Session, slot: Slot) -> String {
    let label = session.endpoint(slot).label.trim();
    if label.is_empty() {
        slot.default_label().to_string()
    } else {
        label.to_string()
    }
}

fn announce_outcome(label: &str, outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Reply { turn_id, content } => {
            println!("{} {content}", style(format!("{label}:")).green().bold());
            println!("  {}", style(format!("trace: {turn_id}")).dim());
        }
        SendOutcome::Failed(err) => {
            println!(
                "{} {}",
                style(format!("{label}:")).red().bold(),
                style(format!("❌ error: {err}")).red()
            );
        }
    }
}

// ── Chat loop ───────────────────────────────────────────────────────────

async fn run_chat(session: &mut Session) -> Result<()> {
    println!(
        "{} {} | {}",
        style("tandem").cyan().bold(),
        pane_label(session, Slot::Primary),
        pane_label(session, Slot::Secondary)
    );
    print_chat_help();

    let mut editor = rustyline::DefaultEditor::new()?;
    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(&line);

        if let Some(rest) = line.strip_prefix('/') {
            let (command, arg) = rest.split_once(' ').unwrap_or((rest, ""));
            match command {
                "quit" | "exit" | "q" => break,
                "primary" | "secondary" => {
                    let slot: Slot = command.parse()?;
                    let outcome = session.send(slot, arg).await?;
                    announce_outcome(&pane_label(session, slot), &outcome);
                }
                "export" => match arg.trim().parse::<Slot>() {
                    Ok(slot) => {
                        if let Err(err) = handle_export(session, slot, None) {
                            println!("❌ {err}");
                        }
                    }
                    Err(err) => println!("❌ {err}"),
                },
                "clear" => {
                    if Confirm::new()
                        .with_prompt("Clear all history for both panes?")
                        .default(false)
                        .interact()?
                    {
                        session.clear_all()?;
                        println!("✅ all history cleared");
                    }
                }
                "help" => print_chat_help(),
                other => println!("❌ unknown command '/{other}' (try /help)"),
            }
        } else {
            let outcomes = session.send_both(&line).await?;
            announce_outcome(&pane_label(session, Slot::Primary), &outcomes.primary);
            announce_outcome(&pane_label(session, Slot::Secondary), &outcomes.secondary);
        }
    }
    Ok(())
}

fn print_chat_help() {
    println!(
        "{}",
        style(
            "plain lines go to both panes | /primary <msg> /secondary <msg> /export <slot> /clear /quit"
        )
        .dim()
    );
}

// ── Endpoint configuration ──────────────────────────────────────────────

fn handle_endpoint_show(session: &Session, slot: Option<&str>) -> Result<()> {
    match slot {
        Some(slot) => print_endpoint(slot.parse()?, session),
        None => {
            for slot in Slot::ALL {
                print_endpoint(slot, session);
            }
        }
    }
    Ok(())
}

fn print_endpoint(slot: Slot, session: &Session) {
    let config = session.endpoint(slot);
    println!("{}", style(format!("[{slot}] {}", config.label)).bold());
    println!("  provider:     {}", config.provider);
    println!("  url:          {}", config.url);
    println!("  method:       {}", config.method);
    println!("  content-type: {}", config.content_type);
    if !config.headers.is_empty() {
        println!("  headers:");
        for (key, value) in &config.headers {
            println!("    {key}: {value}");
        }
    }
    if !config.params.is_empty() {
        println!("  params:");
        for (key, value) in &config.params {
            println!("    {key}={value}");
        }
    }
}

fn handle_endpoint_edit(
    session: &mut Session,
    slot: &str,
    overrides: EndpointOverrides,
) -> Result<()> {
    let slot: Slot = slot.parse()?;
    let config = if overrides.is_empty() {
        edit_interactively(session, slot)?
    } else {
        apply_overrides(session.endpoint(slot), session.catalog(), overrides)?
    };
    session.save_endpoint(slot, config)?;
    println!("✅ {slot} endpoint saved");
    Ok(())
}

fn apply_overrides(
    current: &EndpointConfig,
    catalog: &ProviderCatalog,
    overrides: EndpointOverrides,
) -> Result<EndpointConfig> {
    let mut config = current.clone();
    if let Some(provider) = overrides.provider {
        // Switching provider autofills its default endpoint unless the
        // caller supplies a URL of their own.
        if provider != config.provider && overrides.url.is_none() {
            if let Some(descriptor) = catalog.get(&provider) {
                config.url = descriptor.default_url.clone();
            }
        }
        config.provider = provider;
    }
    if let Some(label) = overrides.label {
        config.label = label;
    }
    if let Some(url) = overrides.url {
        config.url = url;
    }
    if let Some(method) = overrides.method {
        config.method = method.parse()?;
    }
    if let Some(content_type) = overrides.content_type {
        config.content_type = content_type;
    }
    if !overrides.headers.is_empty() {
        config.headers = parse_kv_pairs(&overrides.headers)?;
    }
    if !overrides.params.is_empty() {
        config.params = parse_kv_pairs(&overrides.params)?;
    }
    Ok(config)
}

fn edit_interactively(session: &Session, slot: Slot) -> Result<EndpointConfig> {
    let current = session.endpoint(slot).clone();
    let catalog = session.catalog();

    let label: String = Input::new()
        .with_prompt("Label")
        .default(current.label.clone())
        .interact_text()?;

    let names: Vec<String> = catalog
        .entries()
        .iter()
        .map(|d| format!("{} ({})", d.display_name, d.id))
        .collect();
    let current_index = catalog
        .entries()
        .iter()
        .position(|d| d.id == current.provider)
        .unwrap_or(0);
    let picked = Select::new()
        .with_prompt("Provider")
        .items(&names)
        .default(current_index)
        .interact()?;
    let descriptor = &catalog.entries()[picked];
    println!("  {}", style(format!("auth style: {}", descriptor.default_auth)).dim());

    let url_default = if descriptor.id == current.provider {
        current.url.clone()
    } else {
        descriptor.default_url.clone()
    };
    let url: String = Input::new()
        .with_prompt("URL")
        .default(url_default)
        .interact_text()?;

    let methods = ["GET", "POST", "PUT", "PATCH", "DELETE"];
    let method_index = methods
        .iter()
        .position(|m| *m == current.method.as_str())
        .unwrap_or(1);
    let method_pick = Select::new()
        .with_prompt("Method")
        .items(&methods)
        .default(method_index)
        .interact()?;
    let method: HttpMethod = methods[method_pick].parse()?;

    let content_type: String = Input::new()
        .with_prompt("Content-Type")
        .default(current.content_type.clone())
        .interact_text()?;

    let headers = prompt_kv_set("header", &current.headers)?;
    let params = prompt_kv_set("query param", &current.params)?;

    Ok(EndpointConfig {
        label,
        url,
        provider: descriptor.id.clone(),
        method,
        content_type,
        headers,
        params,
    })
}

fn prompt_kv_set(
    noun: &str,
    current: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut map = current.clone();
    if !map.is_empty() {
        println!("Current {noun}s:");
        for (key, value) in &map {
            println!("  {key}={value}");
        }
        if Confirm::new()
            .with_prompt(format!("Drop the existing {noun}s?"))
            .default(false)
            .interact()?
        {
            map.clear();
        }
    }
    loop {
        let entry: String = Input::new()
            .with_prompt(format!("Add {noun} key=value (empty to finish)"))
            .allow_empty(true)
            .interact_text()?;
        let entry = entry.trim();
        if entry.is_empty() {
            break;
        }
        match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => println!("  expected key=value"),
        }
    }
    Ok(map)
}

fn parse_kv_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{pair}'"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("empty key in '{pair}'");
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

// ── History ─────────────────────────────────────────────────────────────

fn handle_history_show(session: &Session, slot: Option<&str>) -> Result<()> {
    match slot {
        Some(slot) => print_transcript(session, slot.parse()?),
        None => {
            for slot in Slot::ALL {
                print_transcript(session, slot);
            }
        }
    }
    Ok(())
}

fn print_transcript(session: &Session, slot: Slot) {
    println!("{}", style(format!("[{slot}] {}", pane_label(session, slot))).bold());
    let turns = session.transcript(slot);
    if turns.is_empty() {
        println!("  (no turns)");
        return;
    }
    for turn in turns {
        let role = match turn.role {
            Role::User => style("you").cyan(),
            Role::Assistant => style("ai ").green(),
        };
        println!(
            "  {} {role} {}",
            style(&turn.timestamp).dim(),
            truncate_with_ellipsis(&turn.content, 400)
        );
        if let Some(turn_id) = &turn.turn_id {
            if turn.role == Role::Assistant {
                println!("      {}", style(format!("trace: {turn_id}")).dim());
            }
        }
    }
}

fn handle_history_clear(session: &mut Session, slot: Option<&str>, yes: bool) -> Result<()> {
    match slot {
        Some(slot) => {
            let slot: Slot = slot.parse()?;
            if !yes
                && !Confirm::new()
                    .with_prompt(format!("Clear the {slot} pane's history?"))
                    .default(false)
                    .interact()?
            {
                return Ok(());
            }
            let (turns, traces) = session.clear_history(slot)?;
            println!("✅ cleared {turns} turns and {traces} traces from {slot}");
        }
        None => {
            if !yes
                && !Confirm::new()
                    .with_prompt("Clear all history for both panes?")
                    .default(false)
                    .interact()?
            {
                return Ok(());
            }
            session.clear_all()?;
            println!("✅ all history cleared");
        }
    }
    Ok(())
}

// ── Export & traces ─────────────────────────────────────────────────────

fn handle_export(session: &Session, slot: Slot, out: Option<PathBuf>) -> Result<()> {
    let (filename, document) = session.export(slot)?;
    let dir = out.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(filename);
    std::fs::write(&path, document)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("✅ transcript written to {}", path.display());
    Ok(())
}

fn handle_trace_show(
    session: &Session,
    turn_id: &str,
    request_only: bool,
    response_only: bool,
) -> Result<()> {
    if request_only && response_only {
        bail!("use --request or --response, not both");
    }
    let Some(trace) = session.trace_for(turn_id) else {
        bail!("no trace recorded for turn '{turn_id}'");
    };

    if !response_only {
        println!("{}", style("Request").bold().underlined());
        println!("url:    {}", trace.request.url);
        println!("method: {}", trace.request.method);
        println!("headers:\n{}", serde_json::to_string_pretty(&trace.request.headers)?);
        match &trace.request.body {
            Some(body) => println!("body:\n{}", serde_json::to_string_pretty(body)?),
            None => println!("body: (none)"),
        }
    }
    if !request_only {
        if !response_only {
            println!();
        }
        println!("{}", style("Response").bold().underlined());
        println!("status: {} {}", trace.response.status, trace.response.status_text);
        println!(
            "headers:\n{}",
            serde_json::to_string_pretty(&trace.response.headers)?
        );
        println!("body:\n{}", serde_json::to_string_pretty(&trace.response.body)?);
    }
    Ok(())
}

fn handle_trace_copy(session: &Session, turn_id: &str, answer: bool) -> Result<()> {
    let text = if answer {
        session
            .answer_text(turn_id)
            .with_context(|| format!("no answer recorded for turn '{turn_id}'"))?
            .to_string()
    } else {
        session
            .trace_for(turn_id)
            .with_context(|| format!("no trace recorded for turn '{turn_id}'"))?
            .pretty_json()?
    };

    let destination = clipboard::copy_text(&text)?;
    let what = if answer { "answer" } else { "trace" };
    println!("📋 {what} copied to {destination}");
    Ok(())
}

// ── Providers ───────────────────────────────────────────────────────────

fn handle_providers(session: &Session, id: Option<&str>) -> Result<()> {
    let catalog = session.catalog();
    match id {
        Some(id) => {
            let Some(descriptor) = catalog.get(id) else {
                bail!("unknown provider '{}' (known: {})", id, catalog.ids().join(", "));
            };
            println!("{} ({})", style(&descriptor.display_name).bold(), descriptor.id);
            println!("  {}", descriptor.description);
            println!("  auth:       {}", descriptor.default_auth);
            println!("  endpoint:   {}", descriptor.default_url);
            println!("  reply path: {}", descriptor.reply_path);
            println!("  error path: {}", descriptor.error_path);
            println!("  template:   {}", descriptor.request_template);
        }
        None => {
            for descriptor in catalog.entries() {
                println!(
                    "{:<8} {:<12} {}",
                    style(&descriptor.id).bold(),
                    descriptor.display_name,
                    descriptor.description
                );
            }
        }
    }
    Ok(())
}
