//! todone - task manager with AI research briefings
//!
//! CLI entry point for managing tasks and serving the research API.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tokio::sync::broadcast;
use tracing::{debug, info};

use todone::app::App;
use todone::chat::ChatSession;
use todone::cli::{Cli, Command, OutputFormat, get_log_path};
use todone::config::Config;
use todone::domain::{Feedback, FeedbackType, IdResolver, Research, Task, TaskStatus};
use todone::events::TdEvent;
use todone::lifecycle::ResearchJob;
use todone::server;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Commands that call the research or chat model
fn needs_llm(command: &Command) -> bool {
    matches!(
        command,
        Command::Serve { .. } | Command::Add { .. } | Command::Retry { .. } | Command::Chat { .. }
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let command = cli.command.unwrap_or(Command::List {
        status: None,
        all: false,
        format: OutputFormat::Text,
    });
    debug!(?command, "main: dispatching command");

    let app = App::build(config, needs_llm(&command)).await?;
    let result = run(&app, command).await;
    app.shutdown().await?;
    result
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Serve { host, port } => cmd_serve(app, host, port).await,
        Command::Add { title } => cmd_add(app, &title.join(" ")).await,
        Command::List { status, all, format } => cmd_list(app, status, all, format).await,
        Command::Show { id, format } => cmd_show(app, &id, format).await,
        Command::Complete { id } => {
            let task = app.controller.complete(&resolve_id(app, &id).await?).await?;
            print_done("Completed", &task);
            Ok(())
        }
        Command::Archive { id } => {
            let task = app.controller.archive(&resolve_id(app, &id).await?).await?;
            print_done("Archived", &task);
            Ok(())
        }
        Command::Restore { id } => {
            let task = app.controller.restore(&resolve_id(app, &id).await?).await?;
            print_done("Restored", &task);
            Ok(())
        }
        Command::Delete { id } => {
            let task = app.controller.delete(&resolve_id(app, &id).await?).await?;
            print_done("Deleted", &task);
            Ok(())
        }
        Command::Retry { id } => cmd_retry(app, &id).await,
        Command::Rename { id, title } => {
            let task = app
                .controller
                .rename(&resolve_id(app, &id).await?, &title.join(" "))
                .await?;
            print_done("Renamed", &task);
            Ok(())
        }
        Command::Reorder { ids } => {
            let mut resolved = Vec::with_capacity(ids.len());
            for id in &ids {
                resolved.push(resolve_id(app, id).await?);
            }
            let tasks = app.controller.reorder(&resolved).await;
            print_tasks(app, &tasks).await;
            Ok(())
        }
        Command::Top { id } => {
            let tasks = app.controller.move_to_top(&resolve_id(app, &id).await?).await?;
            print_tasks(app, &tasks).await;
            Ok(())
        }
        Command::Bottom { id } => {
            let tasks = app.controller.move_to_bottom(&resolve_id(app, &id).await?).await?;
            print_tasks(app, &tasks).await;
            Ok(())
        }
        Command::Feedback { id, kind, comment } => {
            let task = app
                .controller
                .set_feedback(&resolve_id(app, &id).await?, Feedback::new(kind, comment))
                .await?;
            print_done("Feedback saved for", &task);
            Ok(())
        }
        Command::Chat { id, message } => cmd_chat(app, &id, &message.join(" ")).await,
        Command::Quota => cmd_quota(app).await,
        Command::Clear { yes } => {
            if !yes {
                return Err(eyre!("Refusing to remove all tasks without --yes"));
            }
            app.controller.flush().await;
            app.state.clear_all().await?;
            println!("{} Removed all tasks", "✓".green());
            Ok(())
        }
    }
}

async fn resolve_id(app: &App, reference: &str) -> Result<String> {
    let ids: Vec<String> = app.controller.tasks().await.into_iter().map(|t| t.id).collect();
    match IdResolver::new(&ids).resolve(reference) {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(eyre!("No task matches '{}'", reference)),
        Err(candidates) => Err(eyre!("'{}' is ambiguous: {}", reference, candidates.join(", "))),
    }
}

async fn cmd_serve(app: &App, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = app.config.server.clone();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    println!("Serving on http://{} (logs: {})", config.addr(), get_log_path().display());
    server::serve(&config, app.server_state()).await
}

async fn cmd_add(app: &App, title: &str) -> Result<()> {
    let mut rx = app.events.subscribe();
    let added = app.controller.add_task(title).await?;
    match added.research {
        None => print_done("Added personal task", &added.task),
        Some(job) => {
            let id = job.task_id().to_string();
            wait_with_progress(&mut rx, job).await?;
            report_research(app, &id).await?;
        }
    }
    Ok(())
}

async fn cmd_retry(app: &App, reference: &str) -> Result<()> {
    let id = resolve_id(app, reference).await?;
    let mut rx = app.events.subscribe();
    let (_, job) = app.controller.retry_research(&id).await?;
    wait_with_progress(&mut rx, job).await?;
    report_research(app, &id).await
}

/// Print simulated progress until the research job has been reconciled
async fn wait_with_progress(rx: &mut broadcast::Receiver<TdEvent>, job: ResearchJob) -> Result<()> {
    let task_id = job.task_id().to_string();
    let wait = job.wait();
    tokio::pin!(wait);
    loop {
        tokio::select! {
            result = &mut wait => return Ok(result?),
            event = rx.recv() => match event {
                Ok(TdEvent::ProgressUpdated { task_id: id, message, progress, .. }) if id == task_id => {
                    eprintln!("  {} {}", format!("{:>3}%", progress).cyan(), message.dimmed());
                }
                Ok(TdEvent::ResearchFailed { task_id: id, message }) if id == task_id => {
                    eprintln!("  {} {}", "✗".red(), message);
                }
                Err(broadcast::error::RecvError::Closed) => break,
                _ => {}
            },
        }
    }
    Ok(wait.await?)
}

async fn report_research(app: &App, id: &str) -> Result<()> {
    let task = app
        .controller
        .get(id)
        .await
        .ok_or_else(|| eyre!("Task {} disappeared", id))?;
    match task.status {
        TaskStatus::Ready => {
            print_done("Researched", &task);
            if let Some(research) = &task.research {
                print_research(research);
            }
        }
        TaskStatus::Personal => print_done("No research needed for", &task),
        _ => {
            println!(
                "{} Research failed for {}; run `td retry {}` to try again",
                "✗".red(),
                task.title.bold(),
                short_id(&task.id)
            );
            println!("  {} research requests left", app.controller.remaining_requests().await);
        }
    }
    Ok(())
}

async fn cmd_list(app: &App, status: Option<TaskStatus>, all: bool, format: OutputFormat) -> Result<()> {
    let tasks = match status {
        Some(status) => app
            .controller
            .tasks()
            .await
            .into_iter()
            .filter(|t| t.status == status)
            .collect(),
        None if all => app.controller.tasks().await,
        None => app.controller.active_tasks().await,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
        OutputFormat::Text if tasks.is_empty() => println!("No tasks"),
        OutputFormat::Text => print_tasks(app, &tasks).await,
    }
    Ok(())
}

async fn cmd_show(app: &App, reference: &str, format: OutputFormat) -> Result<()> {
    let id = resolve_id(app, reference).await?;
    let task = app
        .controller
        .get(&id)
        .await
        .ok_or_else(|| eyre!("No task matches '{}'", reference))?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!("{} {}", task.title.bold(), format!("[{}]", colored_status(task.status)).dimmed());
    println!("{} {}", "id:".dimmed(), task.id);
    if let Some(feedback) = &task.feedback {
        let verdict = match feedback.kind {
            FeedbackType::Positive => "👍",
            FeedbackType::Negative => "👎",
        };
        println!("{} {} {}", "feedback:".dimmed(), verdict, feedback.comment.as_deref().unwrap_or(""));
    }
    match &task.research {
        Some(research) => print_research(research),
        None => println!("{}", "No research for this task".dimmed()),
    }
    Ok(())
}

async fn cmd_chat(app: &App, reference: &str, message: &str) -> Result<()> {
    let id = resolve_id(app, reference).await?;
    let task = app
        .controller
        .get(&id)
        .await
        .ok_or_else(|| eyre!("No task matches '{}'", reference))?;

    let mut session = ChatSession::new();
    match session.send(&app.chat, &task, message).await {
        Some(reply) => println!("{}", reply.content),
        None => println!("{}", todone::chat::MISSING_MESSAGE_REPLY),
    }
    Ok(())
}

async fn cmd_quota(app: &App) -> Result<()> {
    let max = app.config.governor.rate_limit_max;
    let remaining = app.controller.remaining_requests().await;
    println!("{}/{} research requests left", remaining.to_string().bold(), max);
    let reset_at = app.controller.quota_reset_at().await;
    if let Some(at) = reset_at.and_then(chrono::DateTime::from_timestamp_millis) {
        println!("Resets at {}", at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn colored_status(status: TaskStatus) -> colored::ColoredString {
    match status {
        TaskStatus::Pending => status.as_str().yellow(),
        TaskStatus::Researching => status.as_str().cyan(),
        TaskStatus::Ready => status.as_str().green(),
        TaskStatus::Personal => status.as_str().blue(),
        TaskStatus::Completed => status.as_str().dimmed(),
        TaskStatus::Archived => status.as_str().dimmed(),
    }
}

fn print_done(verb: &str, task: &Task) {
    println!("{} {} {} {}", "✓".green(), verb, task.title.bold(), short_id(&task.id).dimmed());
}

async fn print_tasks(app: &App, tasks: &[Task]) {
    for task in tasks {
        let progress = match app.controller.progress(&task.id).await {
            Some(p) => format!(" {}%", p.progress),
            None => String::new(),
        };
        println!(
            "{} {:<11} {}{}",
            short_id(&task.id).yellow(),
            colored_status(task.status),
            task.title,
            progress.dimmed()
        );
    }
}

fn print_research(research: &Research) {
    println!();
    println!("{}", research.summary);

    if let Some(info) = research.quick_info.as_ref().filter(|i| !i.is_empty()) {
        println!();
        let fields = [
            ("Phone", info.phone_formatted.as_ref().or(info.phone.as_ref())),
            ("Hours", info.hours.as_ref()),
            ("Address", info.address.as_ref()),
            ("Website", info.website.as_ref()),
            ("Price", info.price.as_ref()),
            ("Details", info.details.as_ref()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {:<8} {}", format!("{}:", label).dimmed(), value);
            }
        }
    }

    if let Some(options) = research.options.as_ref().filter(|o| !o.is_empty()) {
        println!();
        for option in options {
            let badge = option.badge.as_deref().map(|b| format!(" [{}]", b)).unwrap_or_default();
            let price = option.price.as_deref().unwrap_or("");
            println!("  • {}{} {}", option.title.bold(), badge.green(), price);
            if let Some(subtitle) = &option.subtitle {
                println!("    {}", subtitle.dimmed());
            }
            println!("    {} {}", option.action_label, option.action_url.underline());
        }
    }

    if !research.key_actions.is_empty() {
        println!();
        let primary = research.primary_action().map(|a| a.label.as_str());
        for action in &research.key_actions {
            let marker = if Some(action.label.as_str()) == primary { "→" } else { " " };
            println!("  {} {}: {}", marker.green(), action.label, action.value);
        }
    }

    if !research.sources.is_empty() {
        println!();
        println!("{}", "Sources".dimmed());
        for source in &research.sources {
            println!("  - {} {}", source.title, source.url.as_deref().unwrap_or("").dimmed());
        }
    }

    if let Some(question) = &research.follow_up_question {
        println!();
        println!("{} {}", "?".cyan(), question);
    }
}
