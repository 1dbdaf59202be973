use crate::projector::{OverlaySurface, BASE_BACKGROUND};
use podium_events::{emit_alert_signal, AlertSignal};
use std::time::Duration;

pub const FLASH_INTERVAL: Duration = Duration::from_millis(500);
pub const FLASH_COLOR: &str = "#d33";

/// Alternating overlay background while an alert is active.
///
/// The flasher owns no timer: the caller ticks it every [`FLASH_INTERVAL`] while
/// [`Flasher::is_active`] holds, so stopping it is enough to end the cycle.
#[derive(Debug, Default)]
pub struct Flasher {
    active: bool,
    lit: bool,
}

impl Flasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns false when already flashing.
    pub fn start(&mut self, surface: &mut dyn OverlaySurface) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.lit = false;
        surface.set_stop_flashing_visible(true);
        emit_alert_signal(AlertSignal::Started);
        true
    }

    /// Flip the background. Returns the colour applied, or `None` when stopped.
    pub fn tick(&mut self, surface: &mut dyn OverlaySurface) -> Option<&'static str> {
        if !self.active {
            return None;
        }
        self.lit = !self.lit;
        let color = if self.lit { FLASH_COLOR } else { BASE_BACKGROUND };
        surface.set_background(color);
        Some(color)
    }

    /// Returns false when nothing was flashing.
    pub fn stop(&mut self, surface: &mut dyn OverlaySurface) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.lit = false;
        surface.set_stop_flashing_visible(false);
        surface.set_background(BASE_BACKGROUND);
        emit_alert_signal(AlertSignal::Stopped);
        true
    }
}
