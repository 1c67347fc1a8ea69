//! `tidings doctor` — config validation and engine health check.
//!
//! Runs a series of checks and prints a report with `[ok]`, `[warn]`,
//! `[fail]`, or `[info]` per item. Exits non-zero when any check fails.

use std::path::Path;

use {
    anyhow::Result,
    chrono::Utc,
    tidings_config::{DeliveryKind, Severity, TidingsConfig, validate},
    tidings_streams::{SourceLoader, Stream, StreamStore},
};

use crate::app::{self, App};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct Section {
    title: String,
    items: Vec<(Status, String)>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push((status, message.into()));
    }

    fn count(&self, status: Status) -> usize {
        self.items.iter().filter(|(s, _)| *s == status).count()
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for (status, message) in &section.items {
            eprintln!("  [{}{}{RESET}]  {message}", status.color(), status.label());
        }
        eprintln!();
    }
    let errors = sections.iter().map(|s| s.count(Status::Fail)).sum();
    let warnings = sections.iter().map(|s| s.count(Status::Warn)).sum();
    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(explicit_config: Option<&Path>) -> Result<()> {
    eprintln!("{BOLD}tidings doctor{RESET}");
    eprintln!("{BOLD}=============={RESET}\n");

    let mut sections = vec![check_config(explicit_config)];

    match App::load(explicit_config) {
        Ok(app) => {
            sections.push(check_schedule(&app.config));
            sections.push(check_delivery(&app.config));
            let (store_section, streams) = check_store(&app).await;
            sections.push(store_section);
            if let Some(streams) = streams {
                sections.push(check_sources(&app, &streams).await);
            }
        },
        Err(e) => {
            let mut section = Section::new("Engine");
            section.push(Status::Fail, format!("cannot start: {e:#}"));
            sections.push(section);
        },
    }

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── Checks ──────────────────────────────────────────────────────────────────

fn check_config(explicit: Option<&Path>) -> Section {
    let result = validate::validate(explicit);
    let label = result
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({label})"));

    if result.diagnostics.iter().all(|d| d.severity == Severity::Info) {
        section.push(Status::Ok, "Config valid");
    }
    for d in &result.diagnostics {
        let message = if d.path.is_empty() {
            d.message.clone()
        } else {
            format!("{}: {}", d.path, d.message)
        };
        section.push(d.severity.into(), message);
    }
    section
}

fn check_schedule(config: &TidingsConfig) -> Section {
    let mut section = Section::new("Schedule");
    if !config.schedule.enabled {
        section.push(Status::Info, "Daily schedule disabled");
        return section;
    }
    match app::daily_schedule(config) {
        Ok(schedule) => {
            let next = schedule.next_after(Utc::now());
            section.push(
                Status::Ok,
                format!(
                    "Daily at {} ({}), next run {}",
                    schedule.time.format("%H:%M"),
                    schedule.tz,
                    next.to_rfc3339()
                ),
            );
        },
        Err(e) => section.push(Status::Fail, e.to_string()),
    }
    section
}

fn check_delivery(config: &TidingsConfig) -> Section {
    let mut section = Section::new("Delivery");
    match config.delivery.kind {
        DeliveryKind::Console => section.push(Status::Info, "Console sink (messages go to stdout)"),
        DeliveryKind::Webhook => match app::build_sink(&config.delivery) {
            Ok(_) => section.push(
                Status::Ok,
                format!(
                    "Webhook sink: {}",
                    config.delivery.webhook_url.as_deref().unwrap_or_default()
                ),
            ),
            Err(e) => section.push(Status::Fail, e.to_string()),
        },
    }
    section
}

async fn check_store(app: &App) -> (Section, Option<Vec<Stream>>) {
    let path = app.store.path();
    let mut section = Section::new(format!("Stream store ({})", path.display()));

    if !path.exists() {
        section.push(Status::Info, "Store does not exist yet; it is created on first use");
        return (section, None);
    }

    match app.store.load().await {
        Ok(streams) => {
            let subscribers: usize = streams.iter().map(|s| s.subscribers.len()).sum();
            section.push(
                Status::Ok,
                format!("{} stream(s), {subscribers} subscription(s)", streams.len()),
            );
            if streams.is_empty() {
                section.push(Status::Info, "No streams defined");
            }
            (section, Some(streams))
        },
        Err(e) => {
            section.push(Status::Fail, e.to_string());
            (section, None)
        },
    }
}

async fn check_sources(app: &App, streams: &[Stream]) -> Section {
    let mut section = Section::new("Event sources");
    for stream in streams {
        match app.loader.load(stream, app.store.base_dir()).await {
            Ok(_) => section.push(Status::Ok, format!("{} → {}", stream.name, stream.source)),
            Err(e) => section.push(Status::Fail, format!("{}: {e}", stream.name)),
        }
        if stream.subscribers.is_empty() {
            section.push(Status::Info, format!("{} has no subscribers", stream.name));
        }
    }
    section
}

