//! Headless demo driver: runs the scripted monitoring flow against either a
//! user-supplied data URL or the demo person/day catalog, logging every
//! transition and tick.

use anyhow::Result;
use serde_json::json;

use hypopredict::catalog::{chart_asset_in, person_code, DataOptions};
use hypopredict::config::Config;
use hypopredict::ecg::EcgSynth;
use hypopredict::logging::{self, log, obj, v_num, v_str, Domain, Level};
use hypopredict::predict::{
    run_selection, HttpPredictionService, PredictionService, SelectionError,
};
use hypopredict::series::{combine, RawSeries};
use hypopredict::session::SessionStore;
use hypopredict::ticker::{ForecastTicker, TickOutcome};

const SESSION_ID: &str = "local";

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("api_base", v_str(&cfg.api_base)),
            ("listen_addr", v_str(&cfg.listen_addr)),
            ("tick_secs", json!(cfg.tick_secs)),
            ("demo_ticks", json!(cfg.demo_ticks)),
        ]),
    );

    let mut store = SessionStore::new();
    let service = HttpPredictionService::new(&cfg);
    let options = DataOptions::builtin();

    let name = cfg.user_name.clone().unwrap_or_else(|| "Demo Clinician".to_string());
    {
        let session = store.session(SESSION_ID);
        if let Err(adv) = session.submit_name(&name) {
            logging::log_advisory(SESSION_ID, session.page.as_str(), &adv.message());
            return Ok(());
        }
        logging::log_transition(SESSION_ID, "welcome", "load_data", "submit_name");
    }

    if let Some(data_url) = cfg.data_url.clone() {
        let session = store.session(SESSION_ID);
        match session.connect_data_source(&data_url) {
            Ok(()) => logging::log_transition(SESSION_ID, "load_data", "forecast", "connect_data_source"),
            Err(adv) => {
                logging::log_advisory(SESSION_ID, session.page.as_str(), &adv.message());
                return Ok(());
            }
        }
    } else {
        let person = cfg.person.clone().unwrap_or_else(|| "Person 8".to_string());
        let day = cfg.day.clone().unwrap_or_else(|| "Day 3".to_string());

        {
            let session = store.session(SESSION_ID);
            session.choose_demo_mode().ok();
            logging::log_transition(SESSION_ID, "load_data", "select_person_day", "choose_demo_mode");
        }
        let session = store.session(SESSION_ID);
        match run_selection(session, &person, &day, &options, &service).await {
            Ok((flat, summary)) => {
                logging::log_transition(SESSION_ID, "select_person_day", "forecast", "select_person_day");
                logging::log_forecast_summary(
                    "predict_from_url",
                    flat.len(),
                    summary.max_risk,
                    summary.message(),
                );
            }
            Err(SelectionError::Advisory(adv)) => {
                // Recoverable user error: nothing was fetched, state is
                // unchanged, and a headless run has nothing left to do.
                logging::log_advisory(SESSION_ID, "select_person_day", &adv.message());
                return Ok(());
            }
            Err(SelectionError::Service(e)) => {
                // Surfaced and recoverable; the local forecast loop below
                // still runs against the untouched session.
                logging::log_fetch_error("predict_from_url", &e.to_string());
            }
        }
        if let Some(code) = person_code(&person) {
            run_fused_forecast(&service, code).await;
            match chart_asset_in(&cfg.chart_dirs, code) {
                Some(path) => log(
                    Level::Info,
                    Domain::System,
                    "chart_asset",
                    obj(&[("path", v_str(&path.to_string_lossy()))]),
                ),
                None => log(
                    Level::Info,
                    Domain::System,
                    "chart_asset_placeholder",
                    obj(&[("code", json!(code))]),
                ),
            }
        }
    }

    // One display window of synthetic ECG alongside the forecast.
    let mut synth = EcgSynth::new();
    let wave = synth.waveform(5.0, 250);
    let peak_mv = wave.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    log(
        Level::Debug,
        Domain::Forecast,
        "ecg_window",
        obj(&[("samples", json!(wave.len())), ("peak_mv", v_num(peak_mv))]),
    );

    // Local forecast loop: sample -> estimate -> append, once per tick.
    let mut ticker = ForecastTicker::new(cfg.tick_secs);
    let session = store.session(SESSION_ID);
    ticker
        .run(session, cfg.demo_ticks, |outcome| {
            match outcome {
                TickOutcome::Advanced { minute, probability, level, .. } => {
                    logging::log_tick(SESSION_ID, *minute, *probability, level.label());
                }
                TickOutcome::Complete => {
                    log(Level::Info, Domain::Forecast, "window_complete", obj(&[]));
                }
                TickOutcome::Idle => {}
            }
            true
        })
        .await;

    let session = store.session(SESSION_ID);
    let peak = session.history.values().into_iter().fold(0.0_f64, f64::max);
    logging::log_session_summary(SESSION_ID, session.current_minute, session.history.len(), peak);
    Ok(())
}

/// Fetch and fuse the two-model forecast when the person has a code.
async fn run_fused_forecast(service: &impl PredictionService, code: u32) {
    match service.predict_fusion(code).await {
        Ok(resp) => {
            let fused = combine(
                &RawSeries::from_map(&resp.pred_fusion),
                &RawSeries::from_map(&resp.pred_cnn),
            );
            let max_combined = fused.combined.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
            logging::log_forecast_summary(
                "predict_fusion_local",
                fused.combined.len(),
                max_combined,
                "combined 0.4 cnn + 0.6 fusion",
            );
        }
        Err(e) => logging::log_fetch_error("predict_fusion_local", &e.to_string()),
    }
}
