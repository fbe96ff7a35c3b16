//! The object a host drives
//!
//! `FieldSession` owns the field, the frame clock, pointer handling, the pop
//! lifecycle and the content panel. The host feeds it frames, pointer events,
//! resizes and visibility changes, and drains `SessionEvent`s to perform the
//! side effects that live outside the crate (lookups, downloads, the detail
//! view, upsell prompts).

use crate::consts::INIT_RETRY_MS;
use crate::content::{
    ActivityRecord, ContentError, ContentPanel, DownloadLink, DownloadTicket, LookupQuery,
    LookupTicket,
};
use crate::settings::{Settings, default_labels};
use crate::sim::{
    BalloonColor, FieldState, FrameClock, InteractionMachine, Intent, LayoutError, PointerEvent,
    PopManager, PopOutcome, Surface, TickInput, TickReport, generate_field, tick,
};

/// Side effects requested by the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Look up activities for a popped label
    LookupRequested {
        ticket: LookupTicket,
        query: LookupQuery,
    },
    /// Open the detail view for a popped balloon
    ShowDetail {
        id: u32,
        label: String,
        color: BalloonColor,
    },
    /// A gated label was popped
    UpsellRequested { label: String },
    /// Balloon is back in the field
    Restored { id: u32 },
    DownloadRequested {
        ticket: DownloadTicket,
        file_id: String,
    },
    /// Open this URL
    DownloadReady { ticket: DownloadTicket, url: String },
}

/// Whether the field has been laid out yet
#[derive(Debug, Clone, Copy, PartialEq)]
enum InitStatus {
    /// Try on the next frame at or after this time (`None`: next frame)
    Pending { retry_at: Option<f64> },
    Ready,
}

pub struct FieldSession {
    settings: Settings,
    state: FieldState,
    clock: FrameClock,
    interaction: InteractionMachine,
    pops: PopManager,
    panel: ContentPanel,
    events: Vec<SessionEvent>,
    init: InitStatus,
    /// Last host timestamp seen (ms)
    now_ms: f64,
    torn_down: bool,
}

impl FieldSession {
    pub fn new(settings: Settings, seed: u64, surface: Surface) -> Self {
        log::info!(
            "Creating field session (seed {}, tier {})",
            seed,
            settings.tier.as_str()
        );
        let pops = PopManager::new(&settings);
        Self {
            settings,
            state: FieldState::new(seed, surface),
            clock: FrameClock::new(),
            interaction: InteractionMachine::new(),
            pops,
            panel: ContentPanel::new(),
            events: Vec::new(),
            init: InitStatus::Pending { retry_at: None },
            now_ms: 0.0,
            torn_down: false,
        }
    }

    fn initialize(&mut self, now_ms: f64) {
        let fallback;
        let labels = if self.settings.labels.is_empty() {
            log::warn!("No labels configured, using defaults");
            fallback = default_labels();
            &fallback
        } else {
            &self.settings.labels
        };

        match generate_field(&mut self.state, self.settings.balloon_count, labels) {
            Ok(_) => {
                self.interaction.reset();
                self.pops.relayout();
                self.init = InitStatus::Ready;
            }
            Err(LayoutError::Unmeasured { width, height }) => {
                log::debug!(
                    "Surface not measured yet ({}x{}), retrying in {}ms",
                    width,
                    height,
                    INIT_RETRY_MS
                );
                self.init = InitStatus::Pending {
                    retry_at: Some(now_ms + INIT_RETRY_MS),
                };
            }
            Err(e) => {
                log::error!("Field initialization failed: {}", e);
                self.init = InitStatus::Pending {
                    retry_at: Some(now_ms + INIT_RETRY_MS),
                };
            }
        }
    }

    /// New surface size; the field is laid out again on the next frame
    pub fn resize(&mut self, surface: Surface) {
        if self.torn_down {
            return;
        }
        let unchanged = surface == self.state.surface;
        self.state.surface = surface;
        match self.init {
            // Keep the pending retry time for a surface that is still unmeasured
            InitStatus::Pending { .. } if unchanged => {}
            InitStatus::Ready if unchanged => {}
            _ => {
                log::info!("Surface resized to {}x{}", surface.width, surface.height);
                self.init = InitStatus::Pending { retry_at: None };
            }
        }
    }

    /// Run one animation frame at host time `now_ms`
    ///
    /// Returns `None` when nothing was simulated (paused, not laid out yet, or
    /// torn down).
    pub fn frame(&mut self, now_ms: f64) -> Option<TickReport> {
        if self.torn_down {
            return None;
        }
        self.now_ms = now_ms;

        if let InitStatus::Pending { retry_at } = self.init {
            if retry_at.is_some_and(|t| now_ms < t) {
                return None;
            }
            self.initialize(now_ms);
            if self.init != InitStatus::Ready {
                return None;
            }
        }

        let delta = self.clock.advance(now_ms)?;
        self.panel.clear_expired(now_ms);

        let input = TickInput {
            delta,
            particle_budget: self.settings.particle_budget(),
        };
        let pops = &mut self.pops;
        let panel = &mut self.panel;
        let events = &mut self.events;
        let report = tick(&mut self.state, &input, |state: &mut FieldState, id| {
            match pops.pop(state, id, now_ms) {
                PopOutcome::Popped { query, .. } => {
                    if let Some(ticket) = panel.begin_lookup(&query) {
                        events.push(SessionEvent::LookupRequested { ticket, query });
                    }
                }
                PopOutcome::Gated { label } => {
                    events.push(SessionEvent::UpsellRequested { label });
                }
                PopOutcome::Ignored => {}
            }
        });

        if let Some(reveal) = self.pops.poll_reveal(now_ms) {
            self.events.push(SessionEvent::ShowDetail {
                id: reveal.id,
                label: reveal.label,
                color: reveal.color,
            });
        }

        Some(report)
    }

    /// Handle a pointer event (ignored before layout and after teardown)
    pub fn pointer(&mut self, event: &PointerEvent) {
        if self.torn_down || self.init != InitStatus::Ready {
            return;
        }
        self.interaction.handle(event, &mut self.state);
    }

    /// Page visibility; hidden pauses the clock
    pub fn set_hidden(&mut self, hidden: bool) {
        if hidden {
            log::debug!("Field hidden, pausing");
            self.clock.pause();
            // A gesture cannot survive the page going away
            if self.interaction.phase() != &crate::sim::InteractionPhase::Idle {
                self.interaction.reset();
                self.state.push_intent(Intent::Release);
            }
        } else {
            log::debug!("Field visible, resuming");
            self.clock.resume();
        }
    }

    /// Host notification of the detail view flag
    pub fn set_detail_visible(&mut self, visible: bool) {
        if self.torn_down {
            return;
        }
        for id in self.pops.observe_detail(visible, &mut self.state) {
            self.events.push(SessionEvent::Restored { id });
        }
    }

    /// Ask the host to fetch a download link for `file_id`
    pub fn request_download(&mut self, file_id: &str) {
        if let Some(ticket) = self.panel.begin_download(file_id) {
            self.events.push(SessionEvent::DownloadRequested {
                ticket,
                file_id: file_id.to_string(),
            });
        }
    }

    /// Deliver a lookup result; returns false if it was discarded
    pub fn resolve_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<Vec<ActivityRecord>, ContentError>,
    ) -> bool {
        self.panel.resolve_lookup(ticket, result)
    }

    /// Deliver a download result
    pub fn resolve_download(
        &mut self,
        ticket: DownloadTicket,
        result: Result<DownloadLink, ContentError>,
    ) {
        if let Some(url) = self.panel.resolve_download(ticket, result, self.now_ms) {
            self.events.push(SessionEvent::DownloadReady { ticket, url });
        }
    }

    /// Take the events queued since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stop everything; later frames, pointer events and results are ignored
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        log::info!("Tearing down field session");
        self.torn_down = true;
        self.panel.close();
        self.pops.cancel();
        self.events.clear();
        self.state.intents.clear();
    }

    pub fn is_ready(&self) -> bool {
        self.init == InitStatus::Ready
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn panel(&self) -> &ContentPanel {
        &self.panel
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Host time of the last frame (ms)
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{DEFAULT_BALLOON_COUNT, NOMINAL_FRAME_MS, REVEAL_DELAY_MS};
    use crate::sim::BalloonState;
    use crate::sim::test_support::balloon_at;
    use glam::Vec2;

    fn ready_session(settings: Settings) -> FieldSession {
        let mut session = FieldSession::new(settings, 42, Surface::new(1280.0, 720.0));
        assert!(session.frame(0.0).is_some());
        // Spread out, non-overlapping balloons so taps are unambiguous
        session.state.balloons = (0..10)
            .map(|i| balloon_at(i, 100.0 + i as f32 * 110.0, 300.0, i as i32))
            .collect();
        session
    }

    fn double_tap(session: &mut FieldSession, p: Vec2, t: f64) {
        session.pointer(&PointerEvent::down(p, t));
        session.pointer(&PointerEvent::up(p, t + 40.0));
        session.pointer(&PointerEvent::down(p, t + 150.0));
        session.pointer(&PointerEvent::up(p, t + 190.0));
    }

    fn lookup_ticket(events: &[SessionEvent]) -> Option<LookupTicket> {
        events.iter().find_map(|e| match e {
            SessionEvent::LookupRequested { ticket, .. } => Some(*ticket),
            _ => None,
        })
    }

    #[test]
    fn test_initializes_on_first_frame() {
        let mut session = FieldSession::new(Settings::default(), 1, Surface::new(1280.0, 720.0));
        assert!(!session.is_ready());
        assert!(session.frame(0.0).is_some());
        assert!(session.is_ready());
        assert_eq!(session.state().balloons.len(), DEFAULT_BALLOON_COUNT);
    }

    #[test]
    fn test_unmeasured_surface_retries() {
        let mut session = FieldSession::new(Settings::default(), 1, Surface::default());
        assert!(session.frame(0.0).is_none());
        assert!(!session.is_ready());
        // Same unmeasured size again keeps the retry schedule
        session.resize(Surface::default());
        assert!(session.frame(50.0).is_none());

        session.resize(Surface::new(800.0, 600.0));
        assert!(session.frame(60.0).is_some());
        assert!(session.is_ready());
    }

    #[test]
    fn test_pointer_ignored_before_layout() {
        let mut session = FieldSession::new(Settings::default(), 1, Surface::default());
        session.pointer(&PointerEvent::down(Vec2::new(10.0, 10.0), 0.0));
        assert!(session.state().intents.is_empty());
    }

    #[test]
    fn test_double_tap_pops_and_reveals_then_restores() {
        let mut session = ready_session(Settings::default());
        let target = session.state().balloon(7).unwrap().display_pos();
        double_tap(&mut session, target, 1000.0);
        session.frame(1200.0);

        let b = session.state().balloon(7).unwrap();
        assert_eq!(b.state, BalloonState::Popped);
        assert!(!session.state().fragments.is_empty());

        let events = session.drain_events();
        let lookups: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::LookupRequested { query, .. } => Some(query.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(lookups, vec![LookupQuery::for_label("s")]);
        assert!(session.panel().is_loading());

        session.frame(1200.0 + REVEAL_DELAY_MS);
        let events = session.drain_events();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::ShowDetail { id: 7, .. }]
        ));

        session.set_detail_visible(true);
        session.set_detail_visible(false);
        assert_eq!(session.drain_events(), vec![SessionEvent::Restored { id: 7 }]);
        let b = session.state().balloon(7).unwrap();
        assert_eq!(b.state, BalloonState::Active);
        assert!(b.pos.distance(Vec2::new(100.0 + 7.0 * 110.0, 300.0)) <= 20.0);

        session.set_detail_visible(false);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_lookup_result_fills_panel() {
        let mut session = ready_session(Settings::default());
        let target = session.state().balloon(2).unwrap().display_pos();
        double_tap(&mut session, target, 0.0);
        session.frame(200.0);
        let ticket = lookup_ticket(&session.drain_events()).unwrap();

        let records = crate::content::parse_activities(r#"[{"id": "1", "name": "Hiss"}]"#);
        assert!(session.resolve_lookup(ticket, records));
        assert_eq!(session.panel().activities().len(), 1);
    }

    #[test]
    fn test_results_after_teardown_are_discarded() {
        let mut session = ready_session(Settings::default());
        let target = session.state().balloon(4).unwrap().display_pos();
        double_tap(&mut session, target, 0.0);
        session.frame(200.0);
        let ticket = lookup_ticket(&session.drain_events()).unwrap();

        session.teardown();
        assert!(!session.resolve_lookup(ticket, Ok(vec![])));
        assert!(session.frame(300.0).is_none());
        session.pointer(&PointerEvent::down(Vec2::new(100.0, 300.0), 400.0));
        assert!(session.state().intents.is_empty());
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_gated_label_requests_upsell() {
        let settings = Settings {
            free_sample_label: Some("r".into()),
            ..Settings::default()
        };
        let mut session = ready_session(settings);
        let target = session.state().balloon(1).unwrap().display_pos();
        double_tap(&mut session, target, 0.0);
        session.frame(200.0);

        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::UpsellRequested { label: "s".into() }]
        );
        assert!(!session.state().balloon(1).unwrap().is_popped());
    }

    #[test]
    fn test_hidden_pauses_without_time_jump() {
        let mut session = ready_session(Settings::default());
        session.frame(16.0);
        let before = session.state().time_ms;

        session.set_hidden(true);
        assert!(session.frame(32.0).is_none());
        session.set_hidden(false);
        assert!(session.frame(60_000.0).is_some());
        assert!((session.state().time_ms - before - NOMINAL_FRAME_MS).abs() < 1e-6);
    }

    #[test]
    fn test_download_flow() {
        let mut session = ready_session(Settings::default());
        session.request_download("f1");
        let ticket = match session.drain_events().as_slice() {
            [SessionEvent::DownloadRequested { ticket, file_id }] => {
                assert_eq!(file_id, "f1");
                *ticket
            }
            other => panic!("unexpected events {:?}", other),
        };
        let link = DownloadLink {
            success: true,
            url: Some("https://files.example/f1".into()),
        };
        session.resolve_download(ticket, Ok(link));
        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::DownloadReady {
                ticket,
                url: "https://files.example/f1".into()
            }]
        );
    }

    #[test]
    fn test_failed_download_sets_error_badge() {
        let mut session = ready_session(Settings::default());
        session.frame(1000.0);
        session.request_download("f2");
        let ticket = match session.drain_events().as_slice() {
            [SessionEvent::DownloadRequested { ticket, .. }] => *ticket,
            other => panic!("unexpected events {:?}", other),
        };
        session.resolve_download(ticket, Err(ContentError::Download("timeout".into())));
        assert!(session.drain_events().is_empty());
        assert!(session.panel().has_download_error("f2", 1000.0));
    }

    #[test]
    fn test_resize_during_reveal_delay_still_shows_detail() {
        let mut session = ready_session(Settings::default());
        let target = session.state().balloon(4).unwrap().display_pos();
        double_tap(&mut session, target, 1000.0);
        session.frame(1200.0);
        let ticket = lookup_ticket(&session.drain_events()).unwrap();

        session.resize(Surface::new(1000.0, 700.0));
        session.frame(1300.0);
        assert!(session.is_ready());
        session.frame(1200.0 + REVEAL_DELAY_MS);
        let events = session.drain_events();
        assert!(matches!(
            events.as_slice(),
            [SessionEvent::ShowDetail { id: 4, .. }]
        ));

        let records = crate::content::parse_activities(r#"[{"id": "9", "name": "Buzz"}]"#);
        assert!(session.resolve_lookup(ticket, records));
        assert_eq!(session.panel().activities().len(), 1);
    }

    #[test]
    fn test_resize_relays_out_field() {
        let mut session = ready_session(Settings::default());
        assert_eq!(session.state().balloons.len(), 10);
        session.resize(Surface::new(900.0, 700.0));
        assert!(session.frame(100.0).is_some());
        assert_eq!(session.state().balloons.len(), DEFAULT_BALLOON_COUNT);
        assert!(
            session
                .state()
                .balloons
                .iter()
                .all(|b| b.pos.x <= 900.0 && b.pos.y <= 700.0)
        );
    }
}
