//! Offline replay of captured snapshots.
//!
//! Consecutive snapshots are diffed into mutation batches and fed to a session exactly as
//! the live observer would, so selector tables can be checked against real captures.

use crate::cli::ReplayArgs;
use crate::settings::Settings;
use anyhow::{Context, Result};
use futures::StreamExt;
use podium_core::flasher::FLASH_INTERVAL;
use podium_core::projector::HtmlOverlay;
use podium_core::surface::locate_message_list;
use podium_core::{Detection, PresentationConfig, PresentationSession, SelectorResolver};
use podium_dom::{diff_snapshots, DomSnapshot};
use podium_events::{subscribe_to_event, CONFIG_UPDATED_EVENT};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub snapshots: usize,
    pub chat_detected: bool,
    /// Overlay frames written to the output
    pub frames: usize,
    /// Every alert id seen during the replay
    pub alert_ids: BTreeSet<String>,
    pub flash_ticks: u32,
}

/// A session plus its overlay, driven one snapshot at a time.
pub struct Replay<W: Write> {
    session: PresentationSession,
    overlay: HtmlOverlay,
    previous: Option<DomSnapshot>,
    present: bool,
    out: W,
    summary: ReplaySummary,
}

impl<W: Write> Replay<W> {
    pub fn new(settings: &Settings, present: bool, out: W) -> Self {
        let resolver = SelectorResolver::new(settings.selector_table());
        Self {
            session: PresentationSession::with_resolver(settings.presentation.clone(), resolver),
            overlay: HtmlOverlay::new(),
            previous: None,
            present,
            out,
            summary: ReplaySummary::default(),
        }
    }

    pub fn session(&self) -> &PresentationSession {
        &self.session
    }

    pub fn overlay(&self) -> &HtmlOverlay {
        &self.overlay
    }

    pub fn is_flashing(&self) -> bool {
        self.session.is_flashing()
    }

    /// Feed the next capture. Until the chat is detected each capture is only a readiness
    /// poll; afterwards it is diffed against the previous one.
    pub fn step(&mut self, doc: DomSnapshot) -> Result<()> {
        self.summary.snapshots += 1;

        if self.session.chat().is_none() {
            match self.session.poll_surface(&doc) {
                Detection::NotYet => info!(
                    snapshot = self.summary.snapshots,
                    "chat not found yet, waiting for the next snapshot"
                ),
                Detection::Ready(_) => {
                    self.summary.chat_detected = true;
                    if !locate_message_list(self.session.resolver(), &doc).is_ready() {
                        warn!("chat detected but no message list to observe");
                    }
                    if self.present && self.session.enter_presentation(&doc, &mut self.overlay) {
                        self.write_frame()?;
                    }
                }
            }
            self.previous = Some(doc);
            return Ok(());
        }

        let batch = match &self.previous {
            Some(previous) => diff_snapshots(previous, &doc),
            None => Vec::new(),
        };
        debug!(mutations = batch.len(), "replaying batch");

        let outcome = self.session.handle_mutations(&doc, &batch, &mut self.overlay);
        self.summary.alert_ids.extend(outcome.alerts.ids.iter().cloned());
        if outcome.flashing_started {
            info!("alert flashing started");
        }
        if outcome.rendered {
            self.write_frame()?;
        }
        self.previous = Some(doc);
        Ok(())
    }

    /// Apply a configuration pushed while the replay runs. Before the first capture it is
    /// only stored.
    pub fn apply_config(&mut self, config: PresentationConfig) -> Result<()> {
        let Some(doc) = self.previous.take() else {
            self.session.set_config(config);
            return Ok(());
        };
        let was_rendered = self.overlay.render_count();
        self.session.apply_config(config, &doc, &mut self.overlay);
        self.previous = Some(doc);
        if self.overlay.render_count() > was_rendered {
            self.write_frame()?;
        }
        Ok(())
    }

    pub fn flash_tick(&mut self) {
        if let Some(color) = self.session.flash_tick(&mut self.overlay) {
            self.summary.flash_ticks += 1;
            debug!(color, "flash");
        }
    }

    pub fn stop_flashing(&mut self) {
        if self.session.stop_flashing(&mut self.overlay) {
            info!("alert dismissed");
        }
    }

    fn write_frame(&mut self) -> Result<()> {
        self.summary.frames += 1;
        writeln!(self.out, "{}", self.overlay.to_html()).context("failed to write overlay frame")?;
        Ok(())
    }

    /// Tear the session down and hand back the summary and the output.
    pub fn finish(mut self) -> (ReplaySummary, W) {
        self.session.teardown(&mut self.overlay);
        (self.summary, self.out)
    }
}

pub fn load_snapshots(paths: &[PathBuf]) -> Result<Vec<DomSnapshot>> {
    paths
        .iter()
        .map(|path| {
            DomSnapshot::from_path(path)
                .with_context(|| format!("failed to load snapshot {}", path.display()))
        })
        .collect()
}

/// Replay every snapshot of `args`, ticking the flasher and applying configuration pushed on
/// the event bus in between.
///
/// Captures before the chat is detected are readiness polls and come `poll_interval_ms`
/// apart, after an initial `initial_delay_ms`; later ones come `interval_ms` apart.
pub async fn run_replay<W: Write>(args: &ReplayArgs, settings: &Settings, out: W) -> Result<ReplaySummary> {
    let snapshots = load_snapshots(&args.snapshots)?;
    info!(count = snapshots.len(), "replaying snapshots");

    let mut replay = Replay::new(settings, args.present, out);
    let mut config_updates = subscribe_to_event::<PresentationConfig>(CONFIG_UPDATED_EVENT);
    let mut pending = snapshots.into_iter();
    let mut exhausted = false;
    let mut flash_budget = args.flash_ticks;

    let next_capture = sleep(Duration::from_millis(args.initial_delay_ms));
    tokio::pin!(next_capture);
    let mut flash = interval(FLASH_INTERVAL);
    flash.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if exhausted && !(replay.is_flashing() && flash_budget > 0) {
            break;
        }

        tokio::select! {
            _ = &mut next_capture, if !exhausted => {
                match pending.next() {
                    Some(doc) => replay.step(doc)?,
                    None => exhausted = true,
                }
                let wait = if replay.session().chat().is_some() {
                    args.interval_ms
                } else {
                    args.poll_interval_ms
                };
                next_capture
                    .as_mut()
                    .reset(Instant::now() + Duration::from_millis(wait.max(1)));
            }
            _ = flash.tick(), if replay.is_flashing() && flash_budget > 0 => {
                replay.flash_tick();
                flash_budget -= 1;
                if flash_budget == 0 {
                    replay.stop_flashing();
                }
            }
            Some(event) = config_updates.next() => {
                info!("configuration update received");
                replay.apply_config(event.data)?;
            }
        }
    }

    let (summary, _) = replay.finish();
    info!(
        snapshots = summary.snapshots,
        frames = summary.frames,
        alerts = summary.alert_ids.len(),
        "replay finished"
    );
    Ok(summary)
}
