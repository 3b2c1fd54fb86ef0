//! Tracker session
//!
//! One [`TrackerSession`] per client. It owns everything the widget needs:
//! the client's identity and role, both settings stores, the sync engine,
//! the relay, the render projector with its surface, and the two timers.
//!
//! Inbound work arrives from three sources and goes through one dispatcher:
//!
//! ```text
//!   world store changes ──┐
//!   client store changes ─┼──► TrackerEvent / RelayEvent ──► handlers
//!   relay events ─────────┘
//! ```
//!
//! The receivers are subscribed when the session is created, so nothing
//! written between `new` and `start` is missed. Drain them either with
//! [`TrackerSession::pump`] (deterministic, used by tests and the CLI) or
//! hand them to a background task with [`TrackerSession::spawn_listener`].

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{FearError, FearResult};
use crate::render::{tracker_opacity, MemorySurface, Projector, RenderAction, Surface};
use crate::settings::{
    module_bool, module_position, module_string, register_module_settings, DEFAULT_PULSE_COLOR,
    POSITION, PULSE_COLOR, TRACKER_SIZE, VISIBILITY,
};
use crate::store::{SettingChange, SettingsStore};
use crate::sync::{
    BroadcastChannel, NoticeLevel, Relay, RelayEvent, RelayReceiver, SessionEvent, SyncEngine,
    SyncOutcome, TrackerEvent, TrackerState,
};
use crate::system_bar::hide_system_bar;
use crate::theme::TrackerSize;
use crate::timer::Debouncer;
use crate::types::{format_px, ClientId, Length, Position, Role, SettingKey};

const DEFAULT_TOP: &str = "100px";
const RESET_NOTICE: &str = "Daggerheart Fear Tracker: Reset to Top Center.";
const RESET_FAILED_NOTICE: &str = "Could not reset Fear Tracker position.";

/// Pending notifications, owned by whoever drains them
struct Inbox {
    world_rx: broadcast::Receiver<SettingChange>,
    client_rx: broadcast::Receiver<SettingChange>,
    relay_rx: RelayReceiver,
}

enum Incoming {
    Setting(SettingChange),
    Relay(RelayEvent),
}

fn drain_changes(rx: &mut broadcast::Receiver<SettingChange>, batch: &mut Vec<Incoming>) {
    use broadcast::error::TryRecvError;

    loop {
        match rx.try_recv() {
            Ok(change) => batch.push(Incoming::Setting(change)),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Setting notifications lagged"),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

struct SessionInner<S, C, V> {
    client_id: ClientId,
    role: Role,
    world: S,
    client: S,
    engine: SyncEngine<S>,
    relay: Relay<C>,
    config: TrackerConfig,
    projector: Mutex<Projector>,
    surface: Mutex<V>,
    inbox: Mutex<Option<Inbox>>,
    event_tx: broadcast::Sender<SessionEvent>,
    resize: Debouncer,
    auto_hide: Debouncer,
}

impl<S, C, V> SessionInner<S, C, V>
where
    S: SettingsStore,
    C: BroadcastChannel,
    V: Surface + 'static,
{
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn rendered(&self, (action, left_side_count, max): (RenderAction, u32, u32)) {
        debug!(?action, left_side_count, max, "Rendered tracker");
        self.emit(SessionEvent::Rendered {
            action,
            left_side_count,
            max,
        });
    }

    /// Full teardown and rebuild from the stores
    fn rebuild(&self) {
        let result = {
            let projector = self.projector.lock();
            let mut surface = self.surface.lock();
            projector.rebuild(&mut *surface, &self.world, &self.client)
        };
        self.rendered(result);
        self.apply_glow();
    }

    /// Move pips to show `left` inactive pips
    fn render_value(&self, left: u32) {
        let result = {
            let projector = self.projector.lock();
            let mut surface = self.surface.lock();
            projector.update(&mut *surface, &self.world, &self.client, left)
        };
        if result.0 == RenderAction::Rebuilt {
            self.apply_glow();
        }
        self.rendered(result);
    }

    fn apply_visibility(&self) {
        let visible = module_bool(&self.world, VISIBILITY, true);
        let mut surface = self.surface.lock();
        surface.set_opacity(tracker_opacity(visible, self.role));
        surface.set_visibility_icon(visible);
    }

    fn apply_glow(&self) {
        let color = module_string(&self.world, PULSE_COLOR, DEFAULT_PULSE_COLOR);
        self.surface.lock().set_glow_color(&color);
    }
}

/// A tracker widget for one client
pub struct TrackerSession<S, C, V = MemorySurface> {
    inner: Arc<SessionInner<S, C, V>>,
}

impl<S, C, V> Clone for TrackerSession<S, C, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, C, V> TrackerSession<S, C, V>
where
    S: SettingsStore,
    C: BroadcastChannel,
    V: Surface + 'static,
{
    /// Create a session and subscribe to its stores and channel.
    ///
    /// Nothing is registered, written or drawn until [`start`](Self::start).
    pub fn new(role: Role, world: S, client: S, channel: C, surface: V, config: TrackerConfig) -> Self {
        let client_id = channel.local_id();
        let relay = Relay::new(channel);
        let inbox = Inbox {
            world_rx: world.subscribe(),
            client_rx: client.subscribe(),
            relay_rx: relay.receiver(),
        };
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(SessionInner {
                client_id,
                role,
                engine: SyncEngine::new(world.clone(), role),
                world,
                client,
                relay,
                projector: Mutex::new(Projector::new(role, config.viewport_width)),
                config,
                surface: Mutex::new(surface),
                inbox: Mutex::new(Some(inbox)),
                event_tx,
                resize: Debouncer::new(),
                auto_hide: Debouncer::new(),
            }),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.inner.client_id
    }

    pub fn role(&self) -> Role {
        self.inner.role
    }

    pub fn world(&self) -> &S {
        &self.inner.world
    }

    pub fn client(&self) -> &S {
        &self.inner.client
    }

    pub fn engine(&self) -> &SyncEngine<S> {
        &self.inner.engine
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> TrackerState {
        self.inner.engine.snapshot()
    }

    /// Session events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Inspect the surface
    pub fn with_surface<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        let surface = self.inner.surface.lock();
        f(&*surface)
    }

    /// Register settings, reconcile once and draw the tracker
    pub async fn start(&self) {
        let inner = &self.inner;
        register_module_settings(&inner.world, &inner.client);
        info!(client = %inner.client_id, role = %inner.role, "Starting fear tracker");

        if inner.role.is_privileged() {
            let visibility = SettingKey::module(VISIBILITY);
            if !module_bool(&inner.world, VISIBILITY, true) {
                if let Err(e) = inner.world.set(&visibility, json!(true)).await {
                    warn!(error = %e, "Could not force tracker visible");
                }
            }

            let authority = inner.engine.adapter().read_authoritative();
            if let Some(raw) = authority.and_then(|a| a.number()) {
                let outcome = inner.engine.sync_mirror_from_authority(raw).await;
                self.announce_value(outcome).await;
            }
        }

        inner.rebuild();
        inner.apply_visibility();
        hide_system_bar(&inner.client).await;
        self.note_activity();
    }

    /// Shift `delta` pips to the inactive side and propagate the result
    pub async fn modify_count(&self, delta: i32) -> SyncOutcome {
        let outcome = self.inner.engine.modify_count(delta).await;
        if let SyncOutcome::Written(left) = outcome {
            self.announce_value(outcome).await;
            self.inner.render_value(left);
            let max = self.inner.engine.max();
            let stored = self.inner.engine.adapter().read_mirror(max);
            self.inner
                .engine
                .sync_authority_from_mirror(max - stored)
                .await;
        }
        self.note_activity();
        outcome
    }

    /// Activate `n` more pips
    pub async fn add_fear(&self, n: u32) -> SyncOutcome {
        self.modify_count(-(n.min(i32::MAX as u32) as i32)).await
    }

    /// Deactivate `n` pips
    pub async fn remove_fear(&self, n: u32) -> SyncOutcome {
        self.modify_count(n.min(i32::MAX as u32) as i32).await
    }

    /// Flip the world visibility flag. Gamemaster only; returns the new flag.
    pub async fn toggle_visibility(&self) -> Option<bool> {
        let inner = &self.inner;
        if !inner.role.is_privileged() {
            return None;
        }

        let visible = !module_bool(&inner.world, VISIBILITY, true);
        if let Err(e) = inner
            .world
            .set(&SettingKey::module(VISIBILITY), json!(visible))
            .await
        {
            warn!(error = %e, "Could not change tracker visibility");
            return None;
        }

        inner.apply_visibility();
        if let Err(e) = inner.relay.publish(RelayEvent::VisibilityChanged).await {
            warn!(error = %e, "Failed to broadcast visibility change");
        }
        info!(visible, "Tracker visibility toggled");
        self.note_activity();
        Some(visible)
    }

    /// Move the tracker; omitted coordinates center it horizontally and put
    /// it 100px from the top
    pub async fn reset_position(&self, x: Option<Length>, y: Option<Length>) -> FearResult<Position> {
        let result = self.try_reset_position(x, y).await;
        match &result {
            Ok(position) => {
                info!(%position, "Tracker position reset");
                self.inner.emit(SessionEvent::Notice {
                    level: NoticeLevel::Info,
                    message: RESET_NOTICE.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Could not reset tracker position");
                self.inner.emit(SessionEvent::Notice {
                    level: NoticeLevel::Warning,
                    message: RESET_FAILED_NOTICE.to_string(),
                });
            }
        }
        result
    }

    async fn try_reset_position(&self, x: Option<Length>, y: Option<Length>) -> FearResult<Position> {
        let inner = &self.inner;
        let width = inner
            .surface
            .lock()
            .container_width()
            .ok_or(FearError::NotRendered)?;

        let left = match x {
            Some(x) => x.to_css(),
            None => {
                let scale =
                    TrackerSize::from_setting(&module_string(&inner.client, TRACKER_SIZE, "normal"))
                        .scale();
                let viewport = inner.projector.lock().viewport_width();
                format_px((viewport / 2.0 - width * scale / 2.0).max(0.0))
            }
        };
        let top = y.map(|y| y.to_css()).unwrap_or_else(|| DEFAULT_TOP.to_string());
        let position = Position::new(left, top);

        self.move_to(position.clone()).await?;
        Ok(position)
    }

    /// Persist a new overlay position, as at the end of a drag
    pub async fn move_to(&self, position: Position) -> FearResult<()> {
        let inner = &self.inner;
        inner
            .client
            .set(&SettingKey::module(POSITION), serde_json::to_value(&position)?)
            .await?;
        inner.surface.lock().set_position(&position);
        Ok(())
    }

    /// Record a new viewport width and re-render once resizing settles
    pub fn resize_viewport(&self, width: f64) {
        if !(width.is_finite() && width > 0.0) {
            debug!(width, "Ignoring invalid viewport width");
            return;
        }
        self.inner.projector.lock().set_viewport_width(width);

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .resize
            .arm(self.inner.config.resize_debounce(), async move {
                if let Some(inner) = Weak::upgrade(&weak) {
                    inner.rebuild();
                    inner.apply_visibility();
                }
            });
    }

    /// Undim the tracker and restart the auto-hide timer
    pub fn note_activity(&self) {
        let Some(delay) = self.inner.config.auto_hide_after() else {
            return;
        };
        self.inner.surface.lock().set_dimmed(false);

        let weak = Arc::downgrade(&self.inner);
        self.inner.auto_hide.arm(delay, async move {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.surface.lock().set_dimmed(true);
            }
        });
    }

    /// Publish a newly written mirror value to the other clients
    async fn announce_value(&self, outcome: SyncOutcome) {
        let Some(left_side_count) = outcome.written() else {
            return;
        };
        if let Err(e) = self
            .inner
            .relay
            .publish(RelayEvent::ValueChanged { left_side_count })
            .await
        {
            warn!(error = %e, "Failed to broadcast fear value");
        }
    }

    /// React to one store notification
    pub async fn handle_setting(&self, change: SettingChange) {
        let inner = &self.inner;
        match TrackerEvent::classify(&change) {
            TrackerEvent::AuthorityChanged(_) => {
                let stored = inner.engine.adapter().read_authoritative();
                let Some(raw) = stored.and_then(|a| a.number()) else {
                    debug!(key = %change.key, "Ignoring non-numeric fear value");
                    return;
                };
                let outcome = inner.engine.sync_mirror_from_authority(raw).await;
                self.announce_value(outcome).await;
            }
            TrackerEvent::BoundsChanged => {
                if inner.role.is_privileged() {
                    let authority = inner.engine.adapter().read_authoritative();
                    if let Some(raw) = authority.and_then(|a| a.number()) {
                        let outcome = inner.engine.sync_mirror_from_authority(raw).await;
                        self.announce_value(outcome).await;
                    }
                }
                inner.rebuild();
                inner.apply_visibility();
            }
            TrackerEvent::MirrorChanged(raw) => {
                debug!(%raw, "Mirror changed");
                let max = inner.engine.max();
                let left = inner.engine.adapter().read_mirror(max);
                inner.render_value(left);
                if inner.role.is_privileged() {
                    let outcome = inner.engine.normalize_mirror().await;
                    self.announce_value(outcome).await;
                    inner.engine.sync_authority_from_mirror(max - left).await;
                }
            }
            TrackerEvent::VisibilityChanged => inner.apply_visibility(),
            TrackerEvent::PulseColorChanged => inner.apply_glow(),
            TrackerEvent::AppearanceChanged => {
                inner.rebuild();
                inner.apply_visibility();
            }
            TrackerEvent::SystemBarPreferenceChanged => {
                hide_system_bar(&inner.client).await;
            }
            TrackerEvent::PositionChanged => {
                let position = module_position(&inner.client);
                inner.surface.lock().set_position(&position);
            }
            TrackerEvent::Unrelated => {}
        }
    }

    /// React to one event from another client. Never publishes.
    pub async fn handle_relay(&self, event: RelayEvent) {
        let inner = &self.inner;
        match event {
            RelayEvent::ValueChanged { left_side_count } => {
                debug!(left_side_count, "Received fear value from relay");
                inner.render_value(left_side_count);
                if inner.role.is_privileged() {
                    let max = inner.engine.max();
                    let left = inner.engine.adapter().read_mirror(max);
                    inner.engine.sync_authority_from_mirror(max - left).await;
                }
            }
            RelayEvent::VisibilityChanged => inner.apply_visibility(),
        }
    }

    fn drain_inbox(&self) -> Vec<Incoming> {
        let mut guard = self.inner.inbox.lock();
        let Some(inbox) = guard.as_mut() else {
            return Vec::new();
        };

        // Relay events first: the store notifications that follow confirm
        // or supersede them.
        let mut batch = Vec::new();
        while let Some(event) = inbox.relay_rx.try_recv() {
            batch.push(Incoming::Relay(event));
        }
        drain_changes(&mut inbox.world_rx, &mut batch);
        drain_changes(&mut inbox.client_rx, &mut batch);
        batch
    }

    /// Handle every pending notification, including the ones handling
    /// produces, until none are left. Returns how many were handled.
    ///
    /// Does nothing once [`spawn_listener`](Self::spawn_listener) took the
    /// receivers.
    pub async fn pump(&self) -> usize {
        let mut handled = 0;
        loop {
            let batch = self.drain_inbox();
            if batch.is_empty() {
                return handled;
            }
            for incoming in batch {
                handled += 1;
                match incoming {
                    Incoming::Setting(change) => self.handle_setting(change).await,
                    Incoming::Relay(event) => self.handle_relay(event).await,
                }
            }
        }
    }

    /// Pump several sessions in turn until all of them are idle
    pub async fn settle(sessions: &[Self]) -> usize {
        let mut total = 0;
        loop {
            let mut round = 0;
            for session in sessions {
                round += session.pump().await;
            }
            if round == 0 {
                return total;
            }
            total += round;
        }
    }

    /// Move the receivers to a background task that handles them as they
    /// arrive. Returns `None` if the receivers were already taken.
    pub fn spawn_listener(&self) -> Option<JoinHandle<()>> {
        let mut inbox = self.inner.inbox.lock().take()?;
        let session = self.clone();

        Some(tokio::spawn(async move {
            use broadcast::error::RecvError;

            debug!(client = %session.client_id(), "Session listener started");
            loop {
                tokio::select! {
                    change = inbox.world_rx.recv() => match change {
                        Ok(change) => session.handle_setting(change).await,
                        Err(RecvError::Lagged(skipped)) => warn!(skipped, "World notifications lagged"),
                        Err(RecvError::Closed) => break,
                    },
                    change = inbox.client_rx.recv() => match change {
                        Ok(change) => session.handle_setting(change).await,
                        Err(RecvError::Lagged(skipped)) => warn!(skipped, "Client notifications lagged"),
                        Err(RecvError::Closed) => break,
                    },
                    event = inbox.relay_rx.recv() => match event {
                        Some(event) => session.handle_relay(event).await,
                        None => break,
                    },
                }
            }
            debug!(client = %session.client_id(), "Session listener ended");
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{register_system_settings, HIDE_TRACKER_CLIENT, LEFT_SIDE_COUNT};
    use crate::store::MemoryStore;
    use crate::sync::{HubPort, LocalHub};
    use std::time::Duration;

    type Session = TrackerSession<MemoryStore, HubPort>;

    fn world() -> MemoryStore {
        let world = MemoryStore::new();
        register_system_settings(&world);
        world
    }

    fn session(role: Role, world: &MemoryStore, hub: &LocalHub, config: TrackerConfig) -> Session {
        TrackerSession::new(
            role,
            world.clone(),
            MemoryStore::new(),
            hub.join(ClientId::new()),
            MemorySurface::new(),
            config,
        )
    }

    #[tokio::test]
    async fn test_start_renders_and_forces_visibility() {
        let world = world();
        let hub = LocalHub::new();
        let gm = session(Role::Gamemaster, &world, &hub, TrackerConfig::default());
        register_module_settings(&world, gm.client());
        world
            .set(&SettingKey::module(VISIBILITY), json!(false))
            .await
            .unwrap();

        gm.start().await;
        gm.pump().await;

        assert_eq!(world.get(&SettingKey::module(VISIBILITY)), Some(json!(true)));
        gm.with_surface(|s| {
            assert!(s.is_mounted());
            assert_eq!(s.inactive_count(), 12);
            assert_eq!(s.opacity, 1.0);
            assert_eq!(s.glow_color.as_deref(), Some(DEFAULT_PULSE_COLOR));
        });
    }

    #[tokio::test]
    async fn test_start_pulls_existing_authority() {
        let world = world();
        world
            .set(&SettingKey::system(crate::settings::SYSTEM_FEAR), json!(4))
            .await
            .unwrap();
        let hub = LocalHub::new();
        let gm = session(Role::Gamemaster, &world, &hub, TrackerConfig::default());

        gm.start().await;
        gm.pump().await;

        assert_eq!(world.get(&SettingKey::module(LEFT_SIDE_COUNT)), Some(json!(8)));
        gm.with_surface(|s| assert_eq!(s.active_count(), 4));
    }

    #[tokio::test]
    async fn test_session_events() {
        let world = world();
        let hub = LocalHub::new();
        let gm = session(Role::Gamemaster, &world, &hub, TrackerConfig::default());
        let mut events = gm.subscribe();
        gm.start().await;

        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Rendered {
                action: RenderAction::Rebuilt,
                left_side_count: 12,
                max: 12,
            }
        );

        assert_eq!(gm.add_fear(1).await, SyncOutcome::Written(11));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Rendered {
                action: RenderAction::Updated,
                left_side_count: 11,
                max: 12,
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_visibility_is_gamemaster_only() {
        let world = world();
        let hub = LocalHub::new();
        let gm = session(Role::Gamemaster, &world, &hub, TrackerConfig::default());
        let player = session(Role::Player, &world, &hub, TrackerConfig::default());
        gm.start().await;
        player.start().await;
        TrackerSession::settle(&[gm.clone(), player.clone()]).await;

        assert_eq!(player.toggle_visibility().await, None);
        assert_eq!(gm.toggle_visibility().await, Some(false));
        TrackerSession::settle(&[gm.clone(), player.clone()]).await;

        gm.with_surface(|s| {
            assert_eq!(s.opacity, 0.5);
            assert!(!s.eye_open);
        });
        player.with_surface(|s| assert_eq!(s.opacity, 0.0));
    }

    #[tokio::test]
    async fn test_reset_position_centers() {
        let world = world();
        let hub = LocalHub::new();
        let player = session(Role::Player, &world, &hub, TrackerConfig::default());
        let mut events = player.subscribe();
        player.start().await;
        while events.try_recv().is_ok() {}

        let position = player.reset_position(None, None).await.unwrap();
        assert_eq!(position, Position::new("610px", "100px"));
        assert_eq!(
            player.client().get(&SettingKey::module(POSITION)),
            Some(json!({ "left": "610px", "top": "100px" }))
        );
        player.with_surface(|s| assert_eq!(s.position.as_ref(), Some(&position)));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Notice {
                level: NoticeLevel::Info,
                message: RESET_NOTICE.to_string(),
            }
        );

        let position = player
            .reset_position(Some(Length::Px(10.0)), Some("5%".into()))
            .await
            .unwrap();
        assert_eq!(position, Position::new("10px", "5%"));
    }

    #[tokio::test]
    async fn test_reset_position_without_tracker_warns() {
        let world = world();
        let hub = LocalHub::new();
        let player = session(Role::Player, &world, &hub, TrackerConfig::default());
        register_module_settings(&world, player.client());
        player
            .client()
            .set(&SettingKey::module(HIDE_TRACKER_CLIENT), json!(true))
            .await
            .unwrap();
        player.start().await;
        let mut events = player.subscribe();

        let err = player.reset_position(None, None).await.unwrap_err();
        assert!(matches!(err, FearError::NotRendered));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Notice {
                level: NoticeLevel::Warning,
                message: RESET_FAILED_NOTICE.to_string(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_rebuilds_after_debounce() {
        let world = world();
        let hub = LocalHub::new();
        let player = session(Role::Player, &world, &hub, TrackerConfig::default());
        player.start().await;
        assert_eq!(player.with_surface(|s| s.rebuilds), 1);

        player.resize_viewport(900.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        player.resize_viewport(640.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(player.with_surface(|s| s.rebuilds), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        player.with_surface(|s| {
            assert_eq!(s.rebuilds, 2);
            assert_eq!(s.frame.as_ref().map(|f| f.slider_width), Some(600.0));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_hide_dims_after_inactivity() {
        let config = TrackerConfig {
            auto_hide_after_ms: Some(1000),
            ..TrackerConfig::default()
        };
        let world = world();
        let hub = LocalHub::new();
        let gm = session(Role::Gamemaster, &world, &hub, config);
        gm.start().await;

        tokio::time::sleep(Duration::from_millis(800)).await;
        gm.add_fear(1).await;
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!gm.with_surface(|s| s.dimmed));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(gm.with_surface(|s| s.dimmed));

        gm.note_activity();
        assert!(!gm.with_surface(|s| s.dimmed));
    }

    #[tokio::test]
    async fn test_listener_takes_the_inbox() {
        let world = world();
        let hub = LocalHub::new();
        let gm = session(Role::Gamemaster, &world, &hub, TrackerConfig::default());
        gm.start().await;

        let handle = gm.spawn_listener().unwrap();
        assert!(gm.spawn_listener().is_none());
        assert_eq!(gm.pump().await, 0);
        handle.abort();
    }
}
