//! Colorful console output for pair-search events.
//!
//! Provides a custom `tracing` layer that formats search events with colors.
//!
//! ## Log Levels
//!
//! - **INFO**: Lifecycle events (search start/end)
//! - **DEBUG**: Per-pair verdicts and phase results
//! - **WARN**: Solver retries, failed and undetermined statements

use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Instant;

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "idxinteract_search=info";

/// Initializes console output.
///
/// Safe to call multiple times - only the first call has effect. Does
/// nothing if another global subscriber is already installed.
pub fn init() {
    INIT.get_or_init(|| {
        EPOCH.get_or_init(Instant::now);

        let mut builder = EnvFilter::builder();
        if let Ok(directive) = DEFAULT_FILTER.parse::<Directive>() {
            builder = builder.with_default_directive(directive);
        }
        let filter = builder.from_env_lossy();

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(SearchConsoleLayer)
            .try_init();
    });
}

fn elapsed_secs() -> f64 {
    EPOCH.get().map(|e| e.elapsed().as_secs_f64()).unwrap_or(0.0)
}

/// A tracing layer that formats search events with colors.
pub struct SearchConsoleLayer;

impl<S: Subscriber> Layer<S> for SearchConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("idxinteract") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor);
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    c: Option<String>,
    d: Option<String>,
    statement: Option<String>,
    verdict: Option<String>,
    error: Option<String>,
    statements: Option<u64>,
    candidate_indexes: Option<u64>,
    pairs: Option<u64>,
    pruned: Option<u64>,
    threads: Option<u64>,
    interacting: Option<u64>,
    undetermined: Option<u64>,
    attempt: Option<u64>,
    duration_ms: Option<u64>,
    delta: Option<f64>,
}

impl EventVisitor {
    fn set_text(&mut self, name: &str, value: String) {
        match name {
            "event" => self.event = Some(value),
            "c" => self.c = Some(value),
            "d" => self.d = Some(value),
            "statement" => self.statement = Some(value),
            "verdict" => self.verdict = Some(value),
            "error" => self.error = Some(value),
            _ => {}
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.set_text(field.name(), s.trim_matches('"').to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_text(field.name(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "statements" => self.statements = Some(value),
            "candidate_indexes" => self.candidate_indexes = Some(value),
            "pairs" => self.pairs = Some(value),
            "pruned" => self.pruned = Some(value),
            "threads" => self.threads = Some(value),
            "interacting" => self.interacting = Some(value),
            "undetermined" => self.undetermined = Some(value),
            "attempt" => self.attempt = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "delta" {
            self.delta = Some(value);
        }
    }
}

fn format_event(v: &EventVisitor) -> String {
    match v.event.as_deref().unwrap_or("") {
        "search_start" => format_search_start(v),
        "search_end" => format_search_end(v),
        "pair_verdict" => format_pair_verdict(v),
        "solver_retry" | "statement_undetermined" | "statement_failed" | "refinement_stopped" => {
            format_warning(v)
        }
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs()).bright_black().to_string()
}

fn count(n: Option<u64>) -> String {
    n.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_search_start(v: &EventVisitor) -> String {
    format!(
        "{} {} Searching │ {} statements │ {} indexes │ {} pairs │ {} threads │ δ = {}",
        format_elapsed(),
        "▶".bright_green().bold(),
        count(v.statements).bright_yellow(),
        count(v.candidate_indexes).bright_yellow(),
        count(v.pairs).bright_yellow(),
        count(v.threads).white(),
        v.delta.unwrap_or(0.0).bright_magenta(),
    )
}

fn format_search_end(v: &EventVisitor) -> String {
    let undetermined = v.undetermined.unwrap_or(0);
    let undetermined_text = if undetermined > 0 {
        count(v.undetermined).bright_red().bold().to_string()
    } else {
        count(v.undetermined).white().to_string()
    };
    format!(
        "{} {} Search complete │ {} interacting │ {} undetermined │ {} of {} pairs pruned │ {}",
        format_elapsed(),
        "■".bright_cyan().bold(),
        count(v.interacting).bright_green().bold(),
        undetermined_text,
        count(v.pruned).white(),
        count(v.pairs).white(),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
    )
}

fn format_pair_verdict(v: &EventVisitor) -> String {
    let verdict = v.verdict.as_deref().unwrap_or("unknown");
    let icon = match verdict {
        "interacting" => "✓".bright_green().to_string(),
        "undetermined" => "?".bright_red().to_string(),
        _ => "·".bright_black().to_string(),
    };
    format!(
        "{} {} ({}, {}) {}",
        format_elapsed(),
        icon,
        v.c.as_deref().unwrap_or("?"),
        v.d.as_deref().unwrap_or("?"),
        verdict.white(),
    )
}

fn format_warning(v: &EventVisitor) -> String {
    let mut output = format!(
        "{} {} {}",
        format_elapsed(),
        "⚠".bright_yellow().bold(),
        v.event.as_deref().unwrap_or("").yellow(),
    );
    if let (Some(c), Some(d)) = (&v.c, &v.d) {
        output.push_str(&format!(" │ ({c}, {d})"));
    }
    if let Some(q) = &v.statement {
        output.push_str(&format!(" │ {q}"));
    }
    if let Some(attempt) = v.attempt {
        output.push_str(&format!(" │ attempt {attempt}"));
    }
    if let Some(err) = &v.error {
        output.push_str(&format!(" │ {}", err.bright_red()));
    }
    output
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init();
        init();
        tracing::info!(event = "search_start", pairs = 3u64, threads = 1u64);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(1500), "1.50s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
    }

    #[test]
    fn test_unknown_events_are_silent() {
        let v = EventVisitor {
            event: Some("program_built".to_string()),
            ..EventVisitor::default()
        };
        assert!(format_event(&v).is_empty());
    }

    #[test]
    fn test_search_end_mentions_counts() {
        let v = EventVisitor {
            event: Some("search_end".to_string()),
            interacting: Some(1234),
            pairs: Some(10),
            pruned: Some(7),
            ..EventVisitor::default()
        };
        let out = format_event(&v);
        assert!(out.contains("1,234"));
        assert!(out.contains("Search complete"));
    }

    #[test]
    fn test_pair_verdict_names_the_pair() {
        let v = EventVisitor {
            event: Some("pair_verdict".to_string()),
            c: Some("i1".to_string()),
            d: Some("i2".to_string()),
            verdict: Some("interacting".to_string()),
            ..EventVisitor::default()
        };
        let out = format_event(&v);
        assert!(out.contains("(i1, i2)"));
        assert!(out.contains("interacting"));
    }
}
