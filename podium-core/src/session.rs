//! The coordinating object of the overlay.
//!
//! All state the pipeline keeps between mutation batches lives here: the mode flag, the
//! recency window, the flasher and the current configuration. Document snapshots and the
//! overlay surface are borrowed per call.

use crate::alerts::{scan_for_alerts, AlertScan};
use crate::classifier::is_relevant;
use crate::config::PresentationConfig;
use crate::flasher::Flasher;
use crate::host_log::host_info;
use crate::projector::{project, OverlaySurface};
use crate::recency::RecencyWindow;
use crate::selectors::{SelectorResolver, SelectorTarget};
use crate::surface::{chat_title, detect_chat_view, ChatSurface, Detection};
use podium_dom::{DomMutation, DomSnapshot};
use podium_events::request_fullscreen;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Presenting { chat_title: String },
}

/// What one mutation batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// The classifier saw a message-related change
    pub relevant: bool,
    /// The overlay was re-rendered at least once
    pub rendered: bool,
    pub alerts: AlertScan,
    pub flashing_started: bool,
}

#[derive(Debug)]
pub struct PresentationSession {
    config: PresentationConfig,
    resolver: SelectorResolver,
    mode: Mode,
    chat: Option<ChatSurface>,
    window: RecencyWindow,
    flasher: Flasher,
}

impl PresentationSession {
    pub fn new(config: PresentationConfig) -> Self {
        Self::with_resolver(config, SelectorResolver::default())
    }

    pub fn with_resolver(config: PresentationConfig, resolver: SelectorResolver) -> Self {
        Self {
            config,
            resolver,
            mode: Mode::Idle,
            chat: None,
            window: RecencyWindow::new(),
            flasher: Flasher::new(),
        }
    }

    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_presenting(&self) -> bool {
        matches!(self.mode, Mode::Presenting { .. })
    }

    pub fn is_flashing(&self) -> bool {
        self.flasher.is_active()
    }

    pub fn chat(&self) -> Option<ChatSurface> {
        self.chat
    }

    pub fn window(&self) -> &RecencyWindow {
        &self.window
    }

    /// One readiness poll. Remembers the chat once found; on `NotYet` the caller polls again
    /// after [`crate::surface::SURFACE_POLL_INTERVAL`].
    pub fn poll_surface(&mut self, doc: &DomSnapshot) -> Detection<ChatSurface> {
        let detection = detect_chat_view(&self.resolver, doc);
        match detection {
            Detection::Ready(surface) => {
                if self.chat.is_none() {
                    host_info("Chat detected, presentation mode available");
                }
                self.chat = Some(surface);
            }
            Detection::NotYet => debug!("chat view not available yet"),
        }
        detection
    }

    /// Mount the overlay and show the current messages. Returns false when no chat has been
    /// detected yet or the session is already presenting.
    pub fn enter_presentation(&mut self, doc: &DomSnapshot, surface: &mut dyn OverlaySurface) -> bool {
        if self.chat.is_none() || self.is_presenting() {
            return false;
        }
        let title = chat_title(&self.resolver, doc);
        host_info(format!("Entering presentation mode for {title}"));

        surface.mount(&title);
        surface.apply_styles(&self.config.dynamic_styles());
        request_fullscreen(true);
        self.mode = Mode::Presenting { chat_title: title };

        self.refresh(doc, surface, &BTreeSet::new());
        true
    }

    /// Leave presentation: stops flashing, removes the overlay and resets the window.
    pub fn exit_presentation(&mut self, surface: &mut dyn OverlaySurface) -> bool {
        if !self.is_presenting() {
            return false;
        }
        self.flasher.stop(surface);
        surface.unmount();
        request_fullscreen(false);
        self.window.clear();
        self.mode = Mode::Idle;
        host_info("Exited presentation mode");
        true
    }

    /// Returns whether the session is presenting afterwards.
    pub fn toggle_presentation(&mut self, doc: &DomSnapshot, surface: &mut dyn OverlaySurface) -> bool {
        if self.is_presenting() {
            self.exit_presentation(surface);
        } else {
            self.enter_presentation(doc, surface);
        }
        self.is_presenting()
    }

    /// React to one mutation batch observed on the message list.
    ///
    /// The classifier gates re-extraction; the alert scan runs on every batch, presenting or
    /// not.
    pub fn handle_mutations(
        &mut self,
        doc: &DomSnapshot,
        batch: &[DomMutation],
        surface: &mut dyn OverlaySurface,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            relevant: is_relevant(&self.resolver, doc, batch),
            ..BatchOutcome::default()
        };

        if self.config.inspection_mode {
            host_info(format!(
                "Mutation detected: {} changes, new messages: {}",
                batch.len(),
                outcome.relevant
            ));
        }

        if self.is_presenting() && outcome.relevant {
            outcome.rendered |= self.refresh(doc, surface, &BTreeSet::new());
        }

        let scan = scan_for_alerts(&self.resolver, doc, &self.config);

        if self.is_presenting() && scan.has_reaction_alert() && self.flasher.start(surface) {
            host_info("Alert reaction detected, flashing started");
            outcome.flashing_started = true;
        }

        if self.is_presenting() && self.config.popup_alerts_enabled && !scan.ids.is_empty() {
            host_info(format!("Found {} messages with alert emoji", scan.ids.len()));
            outcome.rendered |= self.refresh(doc, surface, &scan.ids);
        }

        outcome.alerts = scan;
        outcome
    }

    /// Store a configuration snapshot without touching the overlay. Used when no document
    /// is at hand; the next pass picks it up.
    pub fn set_config(&mut self, config: PresentationConfig) {
        self.config = config;
        host_info("Configuration updated");
    }

    /// Take a new configuration snapshot. While presenting the overlay is restyled and
    /// re-rendered in full so the new message count applies immediately.
    pub fn apply_config(
        &mut self,
        config: PresentationConfig,
        doc: &DomSnapshot,
        surface: &mut dyn OverlaySurface,
    ) {
        self.set_config(config);
        if !self.is_presenting() {
            return;
        }
        surface.apply_styles(&self.config.dynamic_styles());
        self.window.clear();
        self.refresh(doc, surface, &BTreeSet::new());
    }

    pub fn stop_flashing(&mut self, surface: &mut dyn OverlaySurface) -> bool {
        self.flasher.stop(surface)
    }

    /// Advance the flash cycle; call every [`crate::flasher::FLASH_INTERVAL`].
    pub fn flash_tick(&mut self, surface: &mut dyn OverlaySurface) -> Option<&'static str> {
        self.flasher.tick(surface)
    }

    /// Release everything: no flash cycle and no mounted overlay survive this call.
    pub fn teardown(&mut self, surface: &mut dyn OverlaySurface) {
        self.flasher.stop(surface);
        if surface.is_mounted() {
            surface.unmount();
        }
        if self.is_presenting() {
            request_fullscreen(false);
        }
        self.window.clear();
        self.mode = Mode::Idle;
        self.chat = None;
        debug!("presentation session torn down");
    }

    /// Re-extract the newest messages and render them when something changed or alerts
    /// force it. Returns whether the overlay was rendered.
    fn refresh(
        &mut self,
        doc: &DomSnapshot,
        surface: &mut dyn OverlaySurface,
        alert_ids: &BTreeSet<String>,
    ) -> bool {
        if !self.is_presenting() {
            return false;
        }
        let messages = self.resolver.resolve(doc, SelectorTarget::Container);
        let update = self.window.update(
            &self.resolver,
            doc,
            &messages,
            self.config.effective_max_messages(),
        );
        if update.records.is_empty() {
            host_info("No message elements found");
            return false;
        }
        if !update.should_render(alert_ids) {
            return false;
        }

        host_info(format!(
            "Found {} message elements, new messages: {}",
            update.records.len(),
            update.changed
        ));
        if self.config.inspection_mode && !alert_ids.is_empty() {
            let ids: Vec<&str> = alert_ids.iter().map(String::as_str).collect();
            host_info(format!("Alert message ids: {}", ids.join(", ")));
        }

        let items = project(&update.records, alert_ids, &self.config);
        surface.render(&items);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::HtmlOverlay;
    use podium_dom::{diff_snapshots, ElementBuilder};

    fn chat(messages: &[(&str, &str)]) -> DomSnapshot {
        DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .class("two")
                .child(ElementBuilder::new("header").text("Team"))
                .child(
                    ElementBuilder::new("div")
                        .attr("data-testid", "conversation-panel-messages")
                        .children(messages.iter().map(|(id, text)| {
                            ElementBuilder::new("div").attr("role", "row").child(
                                ElementBuilder::new("div")
                                    .class("_amk4")
                                    .attr("data-id", id)
                                    .child(ElementBuilder::new("span").class("_ao3e").text(text)),
                            )
                        })),
                )
                .build(),
        )
    }

    #[test]
    fn presenting_requires_a_detected_chat() {
        let doc = chat(&[("a", "hi")]);
        let mut overlay = HtmlOverlay::new();
        let mut session = PresentationSession::new(PresentationConfig::default());

        assert!(!session.enter_presentation(&doc, &mut overlay));
        assert!(session.poll_surface(&doc).is_ready());
        assert!(session.toggle_presentation(&doc, &mut overlay));
        assert_eq!(
            session.mode(),
            &Mode::Presenting {
                chat_title: "WhatsApp Chat".to_string()
            }
        );
        assert_eq!(overlay.render_count(), 1);
        assert!(!session.toggle_presentation(&doc, &mut overlay));
        assert!(!overlay.is_mounted());
        assert!(session.window().is_empty());
    }

    #[test]
    fn unrelated_batches_do_not_render() {
        let doc = chat(&[("a", "hi")]);
        let mut overlay = HtmlOverlay::new();
        let mut session = PresentationSession::new(PresentationConfig::default());
        session.poll_surface(&doc);
        session.enter_presentation(&doc, &mut overlay);

        let batch = vec![DomMutation::Attributes {
            target: doc.root_id(),
            attribute: "class".to_string(),
        }];
        let outcome = session.handle_mutations(&doc, &batch, &mut overlay);
        assert!(!outcome.relevant);
        assert!(!outcome.rendered);
        assert_eq!(overlay.render_count(), 1);
    }

    #[test]
    fn new_message_renders_while_presenting_only() {
        let old = chat(&[("a", "hi")]);
        let new = chat(&[("a", "hi"), ("b", "there")]);
        let batch = diff_snapshots(&old, &new);
        let mut overlay = HtmlOverlay::new();
        let mut session = PresentationSession::new(PresentationConfig::default());
        session.poll_surface(&old);

        let idle = session.handle_mutations(&new, &batch, &mut overlay);
        assert!(idle.relevant);
        assert!(!idle.rendered);

        session.enter_presentation(&old, &mut overlay);
        let presenting = session.handle_mutations(&new, &batch, &mut overlay);
        assert!(presenting.rendered);
        assert_eq!(overlay.items().len(), 2);
    }

    #[test]
    fn empty_message_list_replaces_the_window() {
        let doc = chat(&[("a", "hi")]);
        let mut overlay = HtmlOverlay::new();
        let mut session = PresentationSession::new(PresentationConfig::default());
        session.poll_surface(&doc);
        session.enter_presentation(&doc, &mut overlay);
        assert_eq!(session.window().records().len(), 1);

        // list emptied, a stray reaction still forces a pass
        let cleared = DomSnapshot::from_raw(
            ElementBuilder::new("div")
                .class("two")
                .child(ElementBuilder::new("header").text("Team"))
                .child(
                    ElementBuilder::new("div")
                        .attr("data-testid", "conversation-panel-messages")
                        .child(
                            ElementBuilder::new("div")
                                .class("x78zum5 x1n2onr6")
                                .child(ElementBuilder::new("button").attr("aria-label", "reaction 🚨")),
                        ),
                )
                .build(),
        );
        let outcome = session.handle_mutations(&cleared, &[], &mut overlay);
        assert!(!outcome.alerts.ids.is_empty());
        assert!(!outcome.rendered);
        assert!(session.window().is_empty());
        assert!(session.window().seen_fingerprints().is_empty());
        assert_eq!(overlay.render_count(), 1);

        // the old message reappearing counts as new again
        let back = session.handle_mutations(&doc, &diff_snapshots(&cleared, &doc), &mut overlay);
        assert!(back.rendered);
    }

    #[test]
    fn config_set_while_idle_is_kept() {
        let mut session = PresentationSession::new(PresentationConfig::default());
        session.set_config(PresentationConfig {
            max_messages: 1,
            ..PresentationConfig::default()
        });
        assert_eq!(session.config().max_messages, 1);
        assert!(!session.is_presenting());
    }

    #[test]
    fn teardown_leaves_nothing_running() {
        let doc = chat(&[("a", "hi")]);
        let mut overlay = HtmlOverlay::new();
        let mut session = PresentationSession::new(PresentationConfig::default());
        session.poll_surface(&doc);
        session.enter_presentation(&doc, &mut overlay);
        session.flasher.start(&mut overlay);

        session.teardown(&mut overlay);
        assert!(!session.is_flashing());
        assert!(!overlay.is_mounted());
        assert_eq!(session.flash_tick(&mut overlay), None);
        assert!(session.chat().is_none());
    }
}
