//! Deterministic scenario replay.
//!
//! Loads a JSON timeline of scripted page events, runs the full engine
//! against a [`ScriptedPage`] under a manual clock, and emits a JSON
//! report of everything the watcher did. This is the executable face of
//! the crate; the engine itself never touches wall-clock time.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use aw_common::settings::WatcherSettings;
use aw_common::{keys, Error};
use aw_page::{PointerSignal, ScriptedPage};
use aw_store::{MemoryBackend, SettingsStore};

use crate::clock::{Clock, ManualClock};
use crate::coordinator::Coordinator;
use crate::watcher::Watcher;

/// Report format version.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Clock granularity for replay. Fine enough to land between the 15ms
/// pointer-sequence steps.
const REPLAY_STEP_MS: u64 = 5;

/// One scripted page event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioAction {
    AdBreakStart,
    RevealSkipControl,
    AdBreakEnd,
    Navigate,
    /// Whether clicking the skip control actually ends the break.
    SetSkipWorks { works: bool },
    Unload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

/// A replayable scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_scenario_settings")]
    pub settings: WatcherSettings,
    pub duration_ms: u64,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

fn default_scenario_settings() -> WatcherSettings {
    WatcherSettings {
        enabled: true,
        ..WatcherSettings::default()
    }
}

impl Scenario {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path)?;
        let mut scenario: Scenario = serde_json::from_str(&raw)
            .map_err(|err| Error::InvalidScenario(format!("{}: {err}", path.display())))?;
        if scenario.duration_ms == 0 {
            return Err(Error::InvalidScenario("duration_ms must be positive".into()));
        }
        scenario.timeline.sort_by_key(|event| event.at_ms);
        Ok(scenario)
    }
}

/// What the engine did over one replay.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub schema_version: u32,
    pub generated_at: String,
    pub duration_ms: u64,
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub pointer_signals: usize,
    pub clicks: usize,
    pub activations: usize,
    pub ads_skipped: i64,
    pub watching: bool,
    pub torn_down: bool,
}

/// Run a scenario start to finish.
pub fn run(scenario: &Scenario) -> Result<ReplayReport, Error> {
    let backend = Rc::new(RefCell::new(MemoryBackend::new()));
    let store = SettingsStore::new(backend);
    let clock = ManualClock::new();

    let mut coordinator = Coordinator::new(store.clone(), Box::new(clock.clone()));
    coordinator
        .ensure_defaults()
        .map_err(|err| Error::Storage(err.to_string()))?;
    store
        .write_entries(vec![
            (
                keys::WATCHER_ENABLED.to_string(),
                json!(scenario.settings.enabled),
            ),
            (
                keys::MUTE_AD_SOUND.to_string(),
                json!(scenario.settings.mute_ad_sound),
            ),
            (keys::BLUR_ADS.to_string(), json!(scenario.settings.blur_ads)),
        ])
        .map_err(|err| Error::Storage(err.to_string()))?;

    let mut watcher = Watcher::new(store.clone(), Box::new(clock.clone()));
    let mut host = ScriptedPage::new();
    watcher.bootstrap(&mut host);
    info!(duration_ms = scenario.duration_ms, events = scenario.timeline.len(), "replay started");

    let mut pending = scenario.timeline.iter().copied().peekable();
    let mut sessions_started = 0;
    let mut sessions_ended = 0;
    let mut was_active = watcher.is_ad_active();

    while clock.now_ms() < scenario.duration_ms {
        let step = REPLAY_STEP_MS.min(scenario.duration_ms - clock.now_ms());
        clock.advance(step);

        while pending
            .peek()
            .is_some_and(|event| event.at_ms <= clock.now_ms())
        {
            if let Some(event) = pending.next() {
                debug!(at_ms = event.at_ms, action = ?event.action, "timeline event");
                apply_action(event.action, &mut host, &mut watcher);
            }
        }

        for target in host.drain_mutations() {
            watcher.notify_mutation(target);
        }
        watcher.pump(&mut host);

        let active = watcher.is_ad_active();
        if active && !was_active {
            sessions_started += 1;
        } else if !active && was_active {
            sessions_ended += 1;
        }
        was_active = active;
    }

    let ads_skipped = store
        .read_counter()
        .map_err(|err| Error::Storage(err.to_string()))?;
    let clicks = host
        .dispatch_log
        .iter()
        .filter(|(_, signal)| *signal == PointerSignal::Click)
        .count();
    Ok(ReplayReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        duration_ms: scenario.duration_ms,
        sessions_started,
        sessions_ended,
        pointer_signals: host.dispatch_log.len(),
        clicks,
        activations: host.activation_log.len(),
        ads_skipped,
        watching: watcher.is_watching(),
        torn_down: watcher.is_torn_down(),
    })
}

fn apply_action(action: ScenarioAction, host: &mut ScriptedPage, watcher: &mut Watcher) {
    match action {
        ScenarioAction::AdBreakStart => host.begin_ad_break(),
        ScenarioAction::RevealSkipControl => {
            host.reveal_skip_control();
        }
        ScenarioAction::AdBreakEnd => host.end_ad_break(),
        ScenarioAction::Navigate => watcher.notify_navigated(),
        ScenarioAction::SetSkipWorks { works } => host.set_skip_ends_break(works),
        ScenarioAction::Unload => watcher.notify_unload(),
    }
}
