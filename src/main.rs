//! CLI entry point for neo.

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use clap::Parser;
use neo::approver::{ApprovalPrompter, DenyAll, TerminalPrompter};
use neo::cli::Args;
use neo::config::{load_config_with_source, Config};
use neo::directives::{DispatchReport, Dispatcher};
use neo::executor::TerminalExecutor;
use neo::handlers::TerminalHandler;
use neo::policy::ApprovalGate;
use neo::render::{report_json, ReportRenderer};
use tokio::io::AsyncReadExt;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Exit statuses after a signal, as a shell would report them.
const EXIT_HANGUP: i32 = 129;
const EXIT_INTERRUPTED: i32 = 130;
const EXIT_TERMINATED: i32 = 143;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = match load_config_with_source(args.config.as_deref()) {
        Ok(loaded) => {
            debug!(source = ?loaded.source, "config loaded");
            loaded.config
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    args.apply_to(&mut config);

    let text = match read_input(&args).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let code = run(&args, &config, &text).await;
    std::process::exit(code);
}

fn init_logging(debug: bool) {
    // Logs share stderr with approval prompts; stdout carries only results.
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn read_input(args: &Args) -> std::io::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return tokio::fs::read_to_string(path).await;
    }
    if std::io::stdin().is_terminal() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no input: pass TEXT, --file PATH, or pipe text on stdin",
        ));
    }
    let mut text = String::new();
    tokio::io::stdin().read_to_string(&mut text).await?;
    Ok(text)
}

async fn run(args: &Args, config: &Config, text: &str) -> i32 {
    let color = config.display.color;
    let prompter: Arc<dyn ApprovalPrompter> = if TerminalPrompter::available() {
        Arc::new(TerminalPrompter::new(color))
    } else {
        warn!("no terminal for approval prompts; commands that need approval will be denied");
        Arc::new(DenyAll)
    };
    let gate = ApprovalGate::new(prompter).with_timeout(config.approval_timeout());
    let executor = Arc::new(TerminalExecutor::new(config.executor_settings()));
    let terminal = Arc::new(
        TerminalHandler::new(executor.clone())
            .with_max_output_bytes(config.display.max_output_bytes),
    );
    let dispatcher = Dispatcher::with_terminal(gate, terminal);
    let mut policy = config.session_policy();

    let report = tokio::select! {
        report = dispatcher.process(text, &mut policy) => Ok(report),
        _ = tokio::signal::ctrl_c() => Err(("interrupted", EXIT_INTERRUPTED)),
        _ = wait_for_signal(SignalKind::terminate()) => Err(("terminated", EXIT_TERMINATED)),
        _ = wait_for_signal(SignalKind::hangup()) => Err(("hangup", EXIT_HANGUP)),
    };
    executor.shutdown().await;

    let report = match report {
        Ok(report) => report,
        Err((reason, code)) => {
            eprintln!("{reason}");
            return code;
        }
    };
    match print_report(args.json, color, &report) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: failed to write results: {e}");
            1
        }
    }
}

/// Resolves when `kind` is delivered. Never resolves if the handler cannot
/// be installed.
async fn wait_for_signal(kind: SignalKind) {
    match signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!("cannot listen for {kind:?}: {e}");
            std::future::pending::<()>().await;
        }
    }
}

fn print_report(json: bool, color: bool, report: &DispatchReport) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        let text = report_json(report).map_err(std::io::Error::other)?;
        writeln!(out, "{text}")?;
        return Ok(());
    }
    ReportRenderer::new(color).render(report, &mut out)?;
    if !report.is_empty() {
        writeln!(out, "\n{}", report.follow_up_prompt())?;
    }
    out.flush()
}
