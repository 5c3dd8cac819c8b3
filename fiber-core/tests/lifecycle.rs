//! End-to-end lifecycle tests for composition roots and the fiber context

use fiber_core::prelude::*;
use fiber_core::{FiberConfig, FiberError, PartSlot, RootPhase, RootRef};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Stats {
    hp: i32,
}
impl Component for Stats {}
impl Model for Stats {}

#[derive(Default)]
struct Sprite {
    visible: bool,
}
impl BecameVisible for Sprite {
    fn on_became_visible(&mut self) {
        self.visible = true;
    }
}
impl Component for Sprite {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.became_visible()
    }
}
impl View for Sprite {}

/// ControllerX: model + view, ticks
#[derive(Default)]
struct Hero {
    ticks: u32,
}
impl Tick for Hero {
    fn on_tick(&mut self) {
        self.ticks += 1;
    }
}
impl Component for Hero {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.tick()
    }
}
impl Controller for Hero {
    type Model = Stats;
    type View = Sprite;
}

/// Model with no zero-argument constructor
struct Inventory {
    _slots: Vec<u32>,
}
impl Component for Inventory {}
impl Model for Inventory {}

#[derive(Default)]
struct Merchant;
impl Component for Merchant {}
impl Controller for Merchant {
    type Model = Inventory;
    type View = NoView;
}

#[derive(Default)]
struct Villain;
impl Tick for Villain {
    fn on_tick(&mut self) {}
}
impl Component for Villain {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.tick()
    }
}
impl Controller for Villain {
    type Model = NoModel;
    type View = NoView;
}

thread_local! {
    static SELF_RESET_CALLS: Cell<u32> = const { Cell::new(0) };
}

/// Resets its own root on the first tick
#[derive(Default)]
struct Bomb {
    root: RootRef,
}
impl Tick for Bomb {
    fn on_tick(&mut self) {
        SELF_RESET_CALLS.with(|c| c.set(c.get() + 1));
        self.root.reset().unwrap();
    }
}
impl Component for Bomb {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.tick()
    }
}
impl Controller for Bomb {
    type Model = NoModel;
    type View = NoView;

    fn initialize(&mut self, parts: Parts<Self>) {
        self.root = parts.root;
    }
}

/// Rebuilds its own model on the first tick, then drains whichever model
/// it holds
#[derive(Default)]
struct Dynamo {
    model: Option<Shared<Stats>>,
    root: RootRef,
    refreshed: bool,
    rewires: u32,
}
impl Tick for Dynamo {
    fn on_tick(&mut self) {
        if !self.refreshed {
            self.refreshed = true;
            if let Some(root) = self.root.upgrade() {
                root.refresh_model().unwrap();
            }
        }
        if let Some(model) = &self.model {
            model.borrow_mut().hp -= 1;
        }
    }
}
impl Component for Dynamo {
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps.tick()
    }
}
impl Controller for Dynamo {
    type Model = Stats;
    type View = NoView;

    fn initialize(&mut self, parts: Parts<Self>) {
        self.model = parts.model;
        self.root = parts.root;
    }

    fn rewire(&mut self, parts: Parts<Self>) {
        self.model = parts.model;
        self.rewires += 1;
    }
}

fn fiber() -> Fiber {
    let fiber = Fiber::new(SceneGraph::default());
    fiber.define(ControllerType::new::<Hero>());
    fiber.define(ControllerType::new::<Villain>());
    fiber.define(ControllerType::new::<Bomb>());
    fiber.define(ControllerType::new::<Dynamo>());
    fiber.define(
        ControllerType::builder::<Merchant>()
            .constructor(Merchant::default)
            .build(),
    );
    fiber
}

fn root(fiber: &Fiber, name: &str) -> CompositionRoot {
    CompositionRoot::new(fiber, fiber.spawn(name))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_construct_with_model_and_view() {
    let fiber = fiber();
    let root = root(&fiber, "hero");

    root.construct::<Hero>().unwrap();

    assert!(root.has_model());
    assert!(root.has_view());
    let first = fiber.get_first::<Hero>().unwrap();
    assert!(Rc::ptr_eq(&first, &root.try_get_controller::<Hero>().unwrap()));

    let controller = root.controller_handle().unwrap();
    assert!(fiber.is_subscribed(&controller, Channel::Tick));
    let view = root.view_handle().unwrap();
    assert!(fiber.is_subscribed(&view, Channel::BecameVisible));
}

#[test]
fn test_construct_then_reset_leaves_nothing_behind() {
    let fiber = fiber();
    let root = root(&fiber, "hero");
    root.construct::<Hero>().unwrap();
    let controller = root.controller_handle().unwrap();
    let view = root.view_handle().unwrap();

    root.reset().unwrap();

    assert!(fiber.get_all::<Hero>().is_none());
    assert!(!fiber.is_stored(&controller));
    assert!(!fiber.is_stored(&view));
    assert_eq!(fiber.subscriber_count(Channel::Tick), 0);
    assert_eq!(fiber.subscriber_count(Channel::BecameVisible), 0);
}

#[test]
fn test_missing_model_constructor_is_skipped() {
    let fiber = fiber();
    let root = root(&fiber, "merchant");

    root.construct::<Merchant>().unwrap();

    assert!(!root.has_model());
    assert!(!root.has_view());
    assert!(root.is_live());
    assert_eq!(fiber.count::<Merchant>(), 1);
}

#[test]
fn test_missing_model_constructor_fails_in_strict_mode() {
    let fiber = Fiber::with_config(
        SceneGraph::default(),
        FiberConfig {
            strict_parts: true,
            ..FiberConfig::default()
        },
    );
    fiber.define(
        ControllerType::builder::<Merchant>()
            .constructor(Merchant::default)
            .build(),
    );
    let root = root(&fiber, "merchant");

    let err = root.construct::<Merchant>().unwrap_err();

    assert!(matches!(
        err,
        FiberError::MissingPart {
            slot: PartSlot::Model,
            ..
        }
    ));
    assert_eq!(root.phase(), RootPhase::Empty);
    assert!(fiber.get_first::<Merchant>().is_none());
}

#[test]
fn test_double_construct_replaces_the_triad() {
    let fiber = fiber();
    let root = root(&fiber, "actor");

    root.construct::<Hero>().unwrap();
    let hero = root.controller_handle().unwrap();
    root.construct::<Villain>().unwrap();

    assert!(fiber.get_first::<Hero>().is_none());
    assert!(!fiber.is_stored(&hero));
    assert_eq!(fiber.count::<Villain>(), 1);
    assert_eq!(fiber.subscriber_count(Channel::Tick), 1);
    assert_eq!(fiber.registry().len(), 1);
}

#[test]
fn test_queries_follow_registration_order() {
    let fiber = fiber();
    let roots: Vec<_> = ["a", "b", "c"].iter().map(|n| root(&fiber, n)).collect();
    for root in &roots {
        root.construct::<Villain>().unwrap();
    }
    let expected: Vec<_> = roots
        .iter()
        .map(|r| r.try_get_controller::<Villain>().unwrap())
        .collect();

    let all = fiber.get_all::<Villain>().unwrap();
    assert_eq!(all.len(), 3);
    for (got, want) in all.iter().zip(&expected) {
        assert!(Rc::ptr_eq(got, want));
    }
    assert!(Rc::ptr_eq(&fiber.get_first::<Villain>().unwrap(), &expected[0]));
    assert!(Rc::ptr_eq(&fiber.get_last::<Villain>().unwrap(), &expected[2]));
}

#[test]
fn test_reset_during_tick_pump() {
    SELF_RESET_CALLS.with(|c| c.set(0));
    let fiber = fiber();
    let bomb = root(&fiber, "bomb");
    let hero = root(&fiber, "hero");
    bomb.construct::<Bomb>().unwrap();
    hero.construct::<Hero>().unwrap();

    let delivered = fiber.tick();

    assert_eq!(delivered, 2);
    assert_eq!(SELF_RESET_CALLS.with(|c| c.get()), 1);
    assert_eq!(bomb.phase(), RootPhase::Empty);
    assert!(fiber.get_first::<Bomb>().is_none());
    assert_eq!(hero.try_get_controller::<Hero>().unwrap().borrow().ticks, 1);

    fiber.tick();
    assert_eq!(SELF_RESET_CALLS.with(|c| c.get()), 1);
    assert_eq!(hero.try_get_controller::<Hero>().unwrap().borrow().ticks, 2);
}

#[test]
fn test_refresh_from_own_handler_rewires_once_it_returns() {
    let fiber = fiber();
    let root = root(&fiber, "dynamo");
    root.construct::<Dynamo>().unwrap();
    let old = root.try_get_model::<Stats>().unwrap();

    fiber.tick();

    let model = root.try_get_model::<Stats>().unwrap();
    assert!(!Rc::ptr_eq(&old, &model));
    assert_eq!(fiber.pending_rewires(), 0);

    let controller = root.try_get_controller::<Dynamo>().unwrap();
    assert_eq!(controller.borrow().rewires, 1);
    assert!(Rc::ptr_eq(controller.borrow().model.as_ref().unwrap(), &model));
    let registered = fiber
        .registry()
        .triad(&root.controller_handle().unwrap())
        .and_then(|t| t.model.clone());
    assert_eq!(registered, root.model_handle());

    // The rest of the refreshing handler still held the old model
    assert_eq!(old.borrow().hp, -1);
    assert_eq!(model.borrow().hp, 0);

    fiber.tick();
    assert_eq!(model.borrow().hp, -1);
    assert_eq!(old.borrow().hp, -1);
}

#[test]
fn test_view_observers_run_before_the_node_is_destroyed() {
    let fiber = fiber();
    let root = root(&fiber, "hero");
    root.construct::<Hero>().unwrap();
    let node = root.node();
    let view = root.try_get_view::<Sprite>().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let out = log.clone();
    let weak = fiber.downgrade();
    view.on_destroy(move || {
        let fiber = weak.upgrade().unwrap();
        out.borrow_mut().push((
            fiber.get_first::<Hero>().is_some(),
            fiber.with_scene(|scene| scene.is_alive(node)),
        ));
    });

    view.destroy();

    // Unregistered by the root's observer, node still there for the rest
    assert_eq!(*log.borrow(), vec![(false, true)]);
    assert!(!fiber.with_scene(|scene| scene.is_alive(node)));
    assert_eq!(root.phase(), RootPhase::Empty);
}

#[test]
fn test_reset_of_a_later_entry_during_pump_skips_it() {
    thread_local! {
        static TARGET: RefCell<Option<RootRef>> = const { RefCell::new(None) };
    }

    #[derive(Default)]
    struct Sniper;
    impl Tick for Sniper {
        fn on_tick(&mut self) {
            TARGET.with(|t| {
                if let Some(target) = t.borrow_mut().take() {
                    target.reset().unwrap();
                }
            });
        }
    }
    impl Component for Sniper {
        fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
            caps.tick()
        }
    }
    impl Controller for Sniper {
        type Model = NoModel;
        type View = NoView;
    }

    let fiber = fiber();
    fiber.define(ControllerType::new::<Sniper>());
    let sniper = root(&fiber, "sniper");
    let victim = root(&fiber, "victim");
    sniper.construct::<Sniper>().unwrap();
    victim.construct::<Hero>().unwrap();
    let victim_controller = victim.try_get_controller::<Hero>().unwrap();
    TARGET.with(|t| *t.borrow_mut() = Some(victim.downgrade()));

    let delivered = fiber.tick();

    assert_eq!(delivered, 1);
    assert_eq!(victim_controller.borrow().ticks, 0);
    let stale: u64 = fiber.metrics().iter().map(|m| m.skipped_stale).sum();
    assert_eq!(stale, 1);
}

#[test]
fn test_register_and_unregister_are_idempotent() {
    let fiber = fiber();
    let root = root(&fiber, "hero");
    root.construct::<Hero>().unwrap();
    let controller = root.controller_handle().unwrap();
    let triad = fiber.registry().triad(&controller).cloned().unwrap();

    assert!(!fiber.register(&triad).unwrap());
    assert_eq!(fiber.subscriber_count(Channel::Tick), 1);

    assert!(fiber.unregister(&controller).unwrap().is_some());
    assert!(fiber.unregister(&controller).unwrap().is_none());
    assert!(fiber.get_all::<Hero>().is_none());
}

#[test]
fn test_node_scoped_events_reach_only_their_triad() {
    let fiber = fiber();
    let a = root(&fiber, "a");
    let b = root(&fiber, "b");
    a.construct::<Hero>().unwrap();
    b.construct::<Hero>().unwrap();

    fiber.deliver(b.node(), &Event::BecameVisible);

    assert!(!a.try_get_view::<Sprite>().unwrap().borrow().visible);
    assert!(b.try_get_view::<Sprite>().unwrap().borrow().visible);
}

#[test]
fn test_detach_destroys_the_node() {
    let fiber = fiber();
    let root = root(&fiber, "hero");
    root.construct::<Hero>().unwrap();
    let node = root.node();

    let seen = Rc::new(Cell::new(false));
    let flag = seen.clone();
    root.try_get_view::<Sprite>()
        .unwrap()
        .on_destroy(move || flag.set(true));

    root.detach().unwrap();

    assert!(seen.get());
    assert!(fiber.get_first::<Hero>().is_none());
    assert!(!fiber.with_scene(|scene| scene.is_alive(node)));
    assert!(fiber.root_of(node).is_none());
}

#[test]
fn test_detach_without_view_still_unregisters() {
    let fiber = fiber();
    let root = root(&fiber, "villain");
    root.construct::<Villain>().unwrap();

    root.detach().unwrap();

    assert!(fiber.get_first::<Villain>().is_none());
    assert_eq!(fiber.subscriber_count(Channel::Tick), 0);
}

#[test]
fn test_shutdown_tears_everything_down() {
    let fiber = fiber();
    let hero = root(&fiber, "hero");
    let villain = root(&fiber, "villain");
    hero.construct::<Hero>().unwrap();
    villain.construct::<Villain>().unwrap();
    let hero_node = hero.node();

    fiber.shutdown();

    assert!(fiber.registry().is_empty());
    assert_eq!(fiber.subscriber_count(Channel::Tick), 0);
    assert_eq!(hero.phase(), RootPhase::Empty);
    assert_eq!(villain.phase(), RootPhase::Empty);
    // Scene nodes belong to the host
    assert!(fiber.with_scene(|scene| scene.is_alive(hero_node)));

    assert!(fiber.init());
    villain.construct::<Villain>().unwrap();
    assert_eq!(fiber.count::<Villain>(), 1);
}

#[test]
fn test_scene_load_keeps_persistent_views() {
    let fiber = Fiber::new(SceneGraph::new("title"));
    fiber.define(
        ControllerType::builder::<Hero>()
            .constructor(Hero::default)
            .model(Stats::default)
            .view(Sprite::default)
            .configuration(Configuration::new(true))
            .build(),
    );
    let kept = root(&fiber, "kept");
    kept.construct::<Hero>().unwrap();
    let dropped = root(&fiber, "dropped");
    dropped.construct_type(&Rc::new(ControllerType::new::<Hero>())).unwrap();

    let destroyed = fiber.with_scene(|scene| scene.load("level-1"));

    assert_eq!(destroyed, vec![dropped.node()]);
    assert!(fiber.with_scene(|scene| scene.is_alive(kept.node())));

    kept.try_get_view::<Sprite>().unwrap().release_to_active_scene();
    assert!(!fiber.with_scene(|scene| scene.is_persistent(kept.node())));
}
