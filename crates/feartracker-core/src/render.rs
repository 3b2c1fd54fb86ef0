//! Render projector
//!
//! Turns `(leftSideCount, max)` into pip positions on a [`Surface`]. Inactive
//! pips pack against the left edge, active pips against the right edge.
//! When the surface holds a different number of slots than `max`, the
//! bounds changed underneath us and the projector rebuilds instead of
//! moving pips.

use crate::bounds::resolve_max;
use crate::settings::{
    module_bool, module_number, module_position, module_string, DEFAULT_TRACKER_WIDTH,
    ENABLE_PULSE, ENABLE_SCALE_ANIMATION, HIDE_TRACKER_CLIENT, MAX_TRACKER_WIDTH,
    MIN_TRACKER_WIDTH, TRACKER_SIZE, TRACKER_WIDTH, VISIBILITY,
};
use crate::store::SettingsStore;
use crate::theme::{ThemeAssets, TrackerSize};
use crate::types::{Position, Role};
use crate::value::ValueAdapter;

/// Horizontal distance between neighbouring pips
pub const PIP_SPACING: f64 = 28.0;
/// Inset of the outermost pips from the slider edges
pub const PIP_MARGIN: f64 = 15.0;
/// Space kept free beside the slider when the viewport is narrow
pub const VIEWPORT_GUTTER: f64 = 40.0;
/// Width of one control button next to the slider
pub const CONTROL_WIDTH: f64 = 36.0;

/// Position and state of one pip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipSlot {
    pub left_px: f64,
    pub active: bool,
}

/// Pip layout for `left` inactive pips out of `max`
pub fn layout(left: u32, max: u32, width: f64) -> Vec<PipSlot> {
    let left = left.min(max);
    let active = max - left;
    let start = width - active as f64 * PIP_SPACING - PIP_MARGIN;

    (0..max)
        .map(|i| {
            if i >= left {
                PipSlot {
                    left_px: start + (i - left) as f64 * PIP_SPACING,
                    active: true,
                }
            } else {
                PipSlot {
                    left_px: i as f64 * PIP_SPACING + PIP_MARGIN,
                    active: false,
                }
            }
        })
        .collect()
}

/// Slider width that fits the viewport at the given scale
pub fn slider_width(preferred: f64, viewport: f64, scale: f64) -> f64 {
    let preferred = preferred.clamp(MIN_TRACKER_WIDTH, MAX_TRACKER_WIDTH);
    preferred.min(viewport / scale - VIEWPORT_GUTTER)
}

/// Tracker opacity: hidden trackers stay faintly visible to the gamemaster
pub fn tracker_opacity(visible: bool, role: Role) -> f32 {
    match (visible, role.is_privileged()) {
        (true, _) => 1.0,
        (false, true) => 0.5,
        (false, false) => 0.0,
    }
}

/// Everything needed to build the tracker from scratch
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub slot_count: u32,
    pub slider_width: f64,
    pub scale: f64,
    pub pip_margin_top: &'static str,
    pub assets: ThemeAssets,
    pub pulse: bool,
    pub breathing: bool,
    /// Minus, plus and visibility buttons
    pub controls: bool,
    pub visible: bool,
    pub opacity: f32,
    pub position: Position,
}

impl Frame {
    /// Unscaled width of the container around slider and controls
    pub fn container_width(&self) -> f64 {
        let controls = if self.controls { 3.0 * CONTROL_WIDTH } else { 0.0 };
        self.slider_width + controls
    }
}

/// What a render call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderAction {
    /// Tracker was torn down and rebuilt
    Rebuilt,
    /// Existing pips were moved
    Updated,
    /// Tracker is hidden on this client and was not mounted
    Hidden,
}

/// The drawing target; the host's DOM in a real client
pub trait Surface: Send {
    /// Number of pip slots mounted, `None` when nothing is mounted
    fn slot_count(&self) -> Option<usize>;
    fn mount(&mut self, frame: &Frame);
    fn unmount(&mut self);
    fn place(&mut self, slots: &[PipSlot]);
    /// Unscaled width of the mounted container
    fn container_width(&self) -> Option<f64>;
    fn set_opacity(&mut self, opacity: f32);
    fn set_visibility_icon(&mut self, visible: bool);
    fn set_position(&mut self, position: &Position);
    fn set_glow_color(&mut self, color: &str);
    fn set_dimmed(&mut self, dimmed: bool);
}

/// Builds frames from the stores and projects layouts onto a surface
#[derive(Debug, Clone)]
pub struct Projector {
    role: Role,
    viewport_width: f64,
}

impl Projector {
    pub fn new(role: Role, viewport_width: f64) -> Self {
        Self {
            role,
            viewport_width,
        }
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
    }

    /// Frame for the current settings, `None` when hidden on this client
    pub fn frame<S: SettingsStore>(&self, world: &S, client: &S) -> Option<Frame> {
        if module_bool(client, HIDE_TRACKER_CLIENT, false) {
            return None;
        }

        let size = TrackerSize::from_setting(&module_string(client, TRACKER_SIZE, "normal"));
        let preferred = module_number(client, TRACKER_WIDTH, DEFAULT_TRACKER_WIDTH);
        let visible = module_bool(world, VISIBILITY, true);

        Some(Frame {
            slot_count: resolve_max(world),
            slider_width: slider_width(preferred, self.viewport_width, size.scale()),
            scale: size.scale(),
            pip_margin_top: size.pip_margin_top(),
            assets: ThemeAssets::resolve(world),
            pulse: module_bool(world, ENABLE_PULSE, true),
            breathing: module_bool(world, ENABLE_SCALE_ANIMATION, true),
            controls: self.role.is_privileged(),
            visible,
            opacity: tracker_opacity(visible, self.role),
            position: module_position(client),
        })
    }

    /// Tear down and rebuild the tracker from the stored mirror
    pub fn rebuild<S: SettingsStore>(
        &self,
        surface: &mut dyn Surface,
        world: &S,
        client: &S,
    ) -> (RenderAction, u32, u32) {
        surface.unmount();
        let Some(frame) = self.frame(world, client) else {
            return (RenderAction::Hidden, 0, resolve_max(world));
        };

        let max = frame.slot_count;
        let left = ValueAdapter::new(world.clone(), self.role).read_mirror(max);
        surface.mount(&frame);
        surface.place(&layout(left, max, frame.slider_width));
        (RenderAction::Rebuilt, left, max)
    }

    /// Move pips to show `left` inactive pips, rebuilding when the mounted
    /// slot count no longer matches the bounds
    pub fn update<S: SettingsStore>(
        &self,
        surface: &mut dyn Surface,
        world: &S,
        client: &S,
        left: u32,
    ) -> (RenderAction, u32, u32) {
        let max = resolve_max(world);
        let left = left.min(max);

        match (surface.slot_count(), self.frame(world, client)) {
            (_, None) => {
                surface.unmount();
                (RenderAction::Hidden, left, max)
            }
            (Some(slots), Some(frame)) if slots == max as usize => {
                surface.place(&layout(left, max, frame.slider_width));
                (RenderAction::Updated, left, max)
            }
            (_, Some(frame)) => {
                surface.unmount();
                surface.mount(&frame);
                surface.place(&layout(left, max, frame.slider_width));
                (RenderAction::Rebuilt, left, max)
            }
        }
    }
}

/// In-memory surface that records what was drawn
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    pub frame: Option<Frame>,
    pub slots: Vec<PipSlot>,
    pub opacity: f32,
    pub eye_open: bool,
    pub position: Option<Position>,
    pub glow_color: Option<String>,
    pub dimmed: bool,
    pub rebuilds: usize,
    pub updates: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self) -> bool {
        self.frame.is_some()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn inactive_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.active).count()
    }
}

impl Surface for MemorySurface {
    fn slot_count(&self) -> Option<usize> {
        self.frame.as_ref().map(|f| f.slot_count as usize)
    }

    fn mount(&mut self, frame: &Frame) {
        self.opacity = frame.opacity;
        self.eye_open = frame.visible;
        self.position = Some(frame.position.clone());
        self.frame = Some(frame.clone());
        self.slots.clear();
        self.rebuilds += 1;
    }

    fn unmount(&mut self) {
        self.frame = None;
        self.slots.clear();
    }

    fn place(&mut self, slots: &[PipSlot]) {
        self.slots = slots.to_vec();
        self.updates += 1;
    }

    fn container_width(&self) -> Option<f64> {
        self.frame.as_ref().map(Frame::container_width)
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    fn set_visibility_icon(&mut self, visible: bool) {
        self.eye_open = visible;
    }

    fn set_position(&mut self, position: &Position) {
        self.position = Some(position.clone());
    }

    fn set_glow_color(&mut self, color: &str) {
        self.glow_color = Some(color.to_string());
    }

    fn set_dimmed(&mut self, dimmed: bool) {
        self.dimmed = dimmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{register_module_settings, register_system_settings, SYSTEM_HOMEBREW};
    use crate::store::MemoryStore;
    use crate::types::SettingKey;
    use serde_json::json;

    fn stores() -> (MemoryStore, MemoryStore) {
        let world = MemoryStore::new();
        let client = MemoryStore::new();
        register_module_settings(&world, &client);
        register_system_settings(&world);
        (world, client)
    }

    #[test]
    fn test_layout_one_active_on_the_right() {
        let slots = layout(11, 12, 700.0);
        assert_eq!(slots.len(), 12);
        assert_eq!(slots.iter().filter(|s| s.active).count(), 1);

        assert!(!slots[0].active);
        assert_eq!(slots[0].left_px, 15.0);
        assert_eq!(slots[10].left_px, 10.0 * 28.0 + 15.0);

        assert!(slots[11].active);
        assert_eq!(slots[11].left_px, 700.0 - 28.0 - 15.0);
    }

    #[test]
    fn test_layout_all_active() {
        let slots = layout(0, 3, 300.0);
        let lefts: Vec<f64> = slots.iter().map(|s| s.left_px).collect();
        assert_eq!(lefts, vec![201.0, 229.0, 257.0]);
        assert!(slots.iter().all(|s| s.active));
    }

    #[test]
    fn test_layout_clamps_left() {
        let slots = layout(20, 4, 300.0);
        assert!(slots.iter().all(|s| !s.active));
    }

    #[test]
    fn test_slider_width_fits_viewport() {
        assert_eq!(slider_width(700.0, 1920.0, 1.0), 700.0);
        assert_eq!(slider_width(700.0, 640.0, 1.0), 600.0);
        assert_eq!(slider_width(2000.0, 1920.0, 1.4), 1920.0 / 1.4 - 40.0);
        assert_eq!(slider_width(10.0, 1920.0, 1.0), 400.0);
    }

    #[test]
    fn test_opacity() {
        assert_eq!(tracker_opacity(true, Role::Player), 1.0);
        assert_eq!(tracker_opacity(false, Role::Gamemaster), 0.5);
        assert_eq!(tracker_opacity(false, Role::Player), 0.0);
    }

    #[test]
    fn test_player_frame_has_no_controls() {
        let (world, client) = stores();
        let frame = Projector::new(Role::Player, 1920.0)
            .frame(&world, &client)
            .unwrap();
        assert!(!frame.controls);
        assert_eq!(frame.container_width(), 700.0);

        let gm = Projector::new(Role::Gamemaster, 1920.0)
            .frame(&world, &client)
            .unwrap();
        assert_eq!(gm.container_width(), 700.0 + 3.0 * CONTROL_WIDTH);
    }

    #[tokio::test]
    async fn test_hidden_client_is_not_mounted() {
        let (world, client) = stores();
        client
            .set(&SettingKey::module(HIDE_TRACKER_CLIENT), json!(true))
            .await
            .unwrap();

        let mut surface = MemorySurface::new();
        let (action, _, _) =
            Projector::new(Role::Player, 1920.0).rebuild(&mut surface, &world, &client);
        assert_eq!(action, RenderAction::Hidden);
        assert!(!surface.is_mounted());
    }

    #[tokio::test]
    async fn test_update_rebuilds_on_slot_mismatch() {
        let (world, client) = stores();
        let projector = Projector::new(Role::Player, 1920.0);
        let mut surface = MemorySurface::new();

        projector.rebuild(&mut surface, &world, &client);
        assert_eq!(surface.rebuilds, 1);

        let (action, _, _) = projector.update(&mut surface, &world, &client, 10);
        assert_eq!(action, RenderAction::Updated);
        assert_eq!(surface.rebuilds, 1);
        assert_eq!(surface.active_count(), 2);

        world
            .set(&SettingKey::system(SYSTEM_HOMEBREW), json!({ "maxFear": 20 }))
            .await
            .unwrap();
        let (action, left, max) = projector.update(&mut surface, &world, &client, 10);
        assert_eq!(action, RenderAction::Rebuilt);
        assert_eq!((left, max), (10, 20));
        assert_eq!(surface.rebuilds, 2);
        assert_eq!(surface.slots.len(), 20);
        assert_eq!(surface.active_count(), 10);
    }

    #[test]
    fn test_update_on_unmounted_surface_mounts() {
        let (world, client) = stores();
        let mut surface = MemorySurface::new();
        let (action, _, _) =
            Projector::new(Role::Player, 1920.0).update(&mut surface, &world, &client, 12);
        assert_eq!(action, RenderAction::Rebuilt);
        assert!(surface.is_mounted());
        assert_eq!(surface.inactive_count(), 12);
    }
}
