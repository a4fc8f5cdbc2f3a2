//! Structured logging for the monitoring flow.
//!
//! JSONL records with level and domain filtering, written per run under
//! `LOG_DIR/RUN_ID` (events + trace streams plus a manifest) and mirrored to
//! stdout. Domain helpers below keep call sites to one line.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// Categories for filtering via `LOG_DOMAINS` (comma-separated or "all").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Session,  // Page transitions, advisories
    Forecast, // Ticks, probabilities, window boundaries
    Risk,     // Level changes, summaries
    Fetch,    // Outbound prediction calls
    System,   // Startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Session => "session",
            Domain::Forecast => "forecast",
            Domain::Risk => "risk",
            Domain::Fetch => "fetch",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", Utc::now().timestamp_millis(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        let events = File::create(run_dir.join("events.jsonl")).unwrap_or_else(|err| {
            eprintln!("[log] failed to create events log: {}", err);
            File::create("/tmp/hypopredict-events.jsonl").expect("events fallback")
        });
        let trace = File::create(run_dir.join("trace.jsonl")).unwrap_or_else(|err| {
            eprintln!("[log] failed to create trace log: {}", err);
            File::create("/tmp/hypopredict-trace.jsonl").expect("trace fallback")
        });

        RunContext {
            run_id,
            events: Mutex::new(BufWriter::new(events)),
            trace: Mutex::new(BufWriter::new(trace)),
        }
    })
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

/// RFC3339 timestamp with milliseconds.
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured record.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }

    let ctx = ensure_run_context();
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    println!("{}", line);
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Domain helpers
// =============================================================================

pub fn log_transition(session_id: &str, from: &str, to: &str, trigger: &str) {
    log(
        Level::Info,
        Domain::Session,
        "transition",
        obj(&[
            ("session_id", v_str(session_id)),
            ("from", v_str(from)),
            ("to", v_str(to)),
            ("trigger", v_str(trigger)),
        ]),
    );
}

pub fn log_advisory(session_id: &str, page: &str, message: &str) {
    log(
        Level::Warn,
        Domain::Session,
        "advisory",
        obj(&[
            ("session_id", v_str(session_id)),
            ("page", v_str(page)),
            ("message", v_str(message)),
        ]),
    );
}

pub fn log_tick(session_id: &str, minute: u32, probability: f64, level: &str) {
    log(
        Level::Debug,
        Domain::Forecast,
        "tick",
        obj(&[
            ("session_id", v_str(session_id)),
            ("minute", json!(minute)),
            ("probability", v_num(probability)),
            ("level", v_str(level)),
        ]),
    );
}

pub fn log_fetch_error(endpoint: &str, error: &str) {
    log(
        Level::Error,
        Domain::Fetch,
        "fetch_error",
        obj(&[("endpoint", v_str(endpoint)), ("error", v_str(error))]),
    );
}

pub fn log_forecast_summary(endpoint: &str, points: usize, max_risk: f64, message: &str) {
    log(
        Level::Info,
        Domain::Risk,
        "forecast_summary",
        obj(&[
            ("endpoint", v_str(endpoint)),
            ("points", json!(points)),
            ("max_risk", v_num(max_risk)),
            ("message", v_str(message)),
        ]),
    );
}

pub fn log_session_summary(session_id: &str, minutes: u32, history_len: usize, peak: f64) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("session_id", v_str(session_id)),
            ("minutes", json!(minutes)),
            ("history_len", json!(history_len)),
            ("peak_probability", v_num(peak)),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(0.5))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 0.5);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_domain_names() {
        assert_eq!(Domain::Session.as_str(), "session");
        assert_eq!(Domain::Fetch.as_str(), "fetch");
    }
}
