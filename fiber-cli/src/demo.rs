//! Demo controllers bundled with the reference host

use fiber_core::prelude::*;
use fiber_core::{Collider, FiberConfig, RootRef};
use serde::Serialize;
use tracing::{info, warn};

/// Hit points lost per trigger overlap
pub const TRIGGER_DAMAGE: i32 = 25;

/// Ticks a fuse burns before it resets its root
pub const FUSE_TICKS: u32 = 3;

// ----------------------------------------------------------------------------
// Spinner: model + view, ticks once started
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rotation {
    pub angle: f32,
    pub rpm: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            angle: 0.0,
            rpm: 60.0,
        }
    }
}

impl Component for Rotation {}
impl Model for Rotation {}

#[derive(Debug, Default)]
pub struct SpinnerView {
    pub visible: bool,
}

impl BecameVisible for SpinnerView {
    fn on_became_visible(&mut self) {
        self.visible = true;
    }
}

impl BecameInvisible for SpinnerView {
    fn on_became_invisible(&mut self) {
        self.visible = false;
    }
}

impl Component for SpinnerView {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.became_visible().became_invisible()
    }
}

impl View for SpinnerView {}

#[derive(Default)]
pub struct Spinner {
    rotation: Option<Shared<Rotation>>,
    started: bool,
}

impl Start for Spinner {
    fn on_start(&mut self) {
        self.started = true;
    }
}

impl Tick for Spinner {
    fn on_tick(&mut self) {
        if !self.started {
            return;
        }
        if let Some(rotation) = &self.rotation {
            let mut rotation = rotation.borrow_mut();
            // rpm at 60 frames per second
            rotation.angle = (rotation.angle + rotation.rpm / 10.0) % 360.0;
        }
    }
}

impl Component for Spinner {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.start().tick()
    }
}

impl Controller for Spinner {
    type Model = Rotation;
    type View = SpinnerView;

    fn initialize(&mut self, parts: Parts<Self>) {
        self.rotation = parts.model;
    }

    fn rewire(&mut self, parts: Parts<Self>) {
        self.rotation = parts.model;
    }
}

// ----------------------------------------------------------------------------
// Health: model only, resets its root when depleted
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vitals {
    pub hp: i32,
    pub hits: u32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self { hp: 100, hits: 0 }
    }
}

impl Component for Vitals {}
impl Model for Vitals {}

#[derive(Default)]
pub struct Health {
    vitals: Option<Shared<Vitals>>,
    root: RootRef,
}

impl TriggerEnter for Health {
    fn on_trigger_enter(&mut self, other: &Collider) {
        let Some(vitals) = &self.vitals else {
            return;
        };
        let depleted = {
            let mut vitals = vitals.borrow_mut();
            vitals.hp -= TRIGGER_DAMAGE;
            vitals.hits += 1;
            vitals.hp <= 0
        };
        if depleted {
            info!(by = %other.node, "health depleted");
            if let Err(err) = self.root.reset() {
                warn!(error = %err, "failed to reset depleted root");
            }
        }
    }
}

impl Component for Health {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.trigger_enter()
    }
}

impl Controller for Health {
    type Model = Vitals;
    type View = NoView;

    fn initialize(&mut self, parts: Parts<Self>) {
        self.vitals = parts.model;
        self.root = parts.root;
    }

    fn rewire(&mut self, parts: Parts<Self>) {
        self.vitals = parts.model;
    }
}

// ----------------------------------------------------------------------------
// Fuse: no parts, resets its own root after a countdown
// ----------------------------------------------------------------------------

pub struct Fuse {
    remaining: u32,
    root: RootRef,
}

impl Default for Fuse {
    fn default() -> Self {
        Self {
            remaining: FUSE_TICKS,
            root: RootRef::default(),
        }
    }
}

impl Tick for Fuse {
    fn on_tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            info!("fuse burnt out");
            if let Err(err) = self.root.reset() {
                warn!(error = %err, "failed to reset burnt fuse");
            }
        }
    }
}

impl Component for Fuse {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.tick()
    }
}

impl Controller for Fuse {
    type Model = NoModel;
    type View = NoView;

    fn initialize(&mut self, parts: Parts<Self>) {
        self.root = parts.root;
    }
}

// ----------------------------------------------------------------------------
// Beacon: view only, persistent across scene loads
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BeaconLight {
    pub lit: bool,
}

impl PointerDown for BeaconLight {
    fn on_pointer_down(&mut self) {
        self.lit = !self.lit;
    }
}

impl Component for BeaconLight {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.pointer_down()
    }
}

impl View for BeaconLight {}

#[derive(Default)]
pub struct Beacon {
    pings: u32,
}

impl PointerDown for Beacon {
    fn on_pointer_down(&mut self) {
        self.pings += 1;
    }
}

impl Component for Beacon {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.pointer_down()
    }
}

impl Controller for Beacon {
    type Model = NoModel;
    type View = BeaconLight;
}

// ----------------------------------------------------------------------------
// Probe: hidden from listings
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct Probe {
    draws: u32,
}

impl DebugDraw for Probe {
    fn on_debug_draw(&mut self) {
        self.draws += 1;
    }
}

impl Component for Probe {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.debug_draw()
    }
}

impl Controller for Probe {
    type Model = NoModel;
    type View = NoView;
}

/// Define every demo controller type on `fiber`
pub fn define_all(fiber: &Fiber) {
    fiber.define(
        ControllerType::builder::<Spinner>()
            .constructor(Spinner::default)
            .model(Rotation::default)
            .view(SpinnerView::default)
            .description("Rotates its model every tick once started")
            .serialize_model()
            .build(),
    );
    fiber.define(
        ControllerType::builder::<Health>()
            .constructor(Health::default)
            .model(Vitals::default)
            .description("Loses hit points on trigger overlaps and resets at zero")
            .serialize_model()
            .build(),
    );
    fiber.define(
        ControllerType::builder::<Fuse>()
            .constructor(Fuse::default)
            .description("Counts down and resets its own root")
            .build(),
    );
    fiber.define(
        ControllerType::builder::<Beacon>()
            .constructor(Beacon::default)
            .view(BeaconLight::default)
            .configuration(Configuration::new(true))
            .description("Survives scene loads and toggles on pointer presses")
            .build(),
    );
    fiber.define(
        ControllerType::builder::<Probe>()
            .constructor(Probe::default)
            .description("Counts debug-draw passes")
            .hidden()
            .build(),
    );
}

/// A fresh context over an in-memory scene, with every demo type defined
pub fn fiber(config: FiberConfig) -> Fiber {
    let fiber = Fiber::with_config(SceneGraph::default(), config);
    define_all(&fiber);
    fiber
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiber_core::RootPhase;

    fn root(fiber: &Fiber, name: &str) -> CompositionRoot {
        CompositionRoot::new(fiber, fiber.spawn(name))
    }

    #[test]
    fn test_listing() {
        let fiber = fiber(FiberConfig::default());
        insta::assert_snapshot!(fiber.catalog().render_listing(false), @r"
        None
        Beacon   Survives scene loads and toggles on pointer presses
        Fuse     Counts down and resets its own root
        Health   Loses hit points on trigger overlaps and resets at zero
        Spinner  Rotates its model every tick once started
        ");
    }

    #[test]
    fn test_spinner_waits_for_start() {
        let fiber = fiber(FiberConfig::default());
        let spinner = root(&fiber, "spinner");
        spinner.construct::<Spinner>().unwrap();

        fiber.tick();
        assert_eq!(spinner.try_get_model::<Rotation>().unwrap().borrow().angle, 0.0);

        assert!(spinner.on_ready());
        fiber.tick();
        assert_eq!(spinner.try_get_model::<Rotation>().unwrap().borrow().angle, 6.0);
    }

    #[test]
    fn test_health_resets_when_depleted() {
        let fiber = fiber(FiberConfig::default());
        let target = root(&fiber, "target");
        let other = fiber.spawn("other");
        target.construct::<Health>().unwrap();

        let hit = Event::TriggerEnter(Collider { node: other });
        for _ in 0..3 {
            fiber.deliver(target.node(), &hit);
        }
        assert_eq!(target.try_get_model::<Vitals>().unwrap().borrow().hp, 25);

        fiber.deliver(target.node(), &hit);
        assert_eq!(target.phase(), RootPhase::Empty);
        assert!(fiber.get_first::<Health>().is_none());
    }

    #[test]
    fn test_fuse_burns_out() {
        let fiber = fiber(FiberConfig::default());
        let fuse = root(&fiber, "fuse");
        fuse.construct::<Fuse>().unwrap();

        for _ in 0..FUSE_TICKS - 1 {
            fiber.tick();
        }
        assert!(fuse.is_live());
        fiber.tick();
        assert!(!fuse.is_live());
        assert_eq!(fiber.subscriber_count(Channel::Tick), 0);
    }

    #[test]
    fn test_beacon_node_is_persistent() {
        let fiber = fiber(FiberConfig::default());
        let beacon = root(&fiber, "beacon");
        beacon.construct::<Beacon>().unwrap();

        assert!(fiber.with_scene(|scene| scene.is_persistent(beacon.node())));
        fiber.deliver(beacon.node(), &Event::PointerDown);
        assert!(beacon.try_get_view::<BeaconLight>().unwrap().borrow().lit);
        assert_eq!(beacon.try_get_controller::<Beacon>().unwrap().borrow().pings, 1);
    }
}
