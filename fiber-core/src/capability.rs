//! Capability traits and per-type capability tables
//!
//! Each capability is a single-method trait tied to one [`Channel`]. A
//! component lists the channels it wants in [`Component::capabilities`]; the
//! builder methods are bounded on the matching trait, so a listed channel is
//! always backed by an implementation. Tables are erased once per concrete
//! type and cached by the dispatcher.

use fiber_types::{Channel, Collider, Collider2d, Collision, Collision2d, Event};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Base trait for everything a composition root manages
///
/// # Example
///
/// ```
/// use fiber_core::{Capabilities, Component, Tick};
///
/// #[derive(Default)]
/// struct Counter(u32);
///
/// impl Tick for Counter {
///     fn on_tick(&mut self) {
///         self.0 += 1;
///     }
/// }
///
/// impl Component for Counter {
///     fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
///         caps.tick()
///     }
/// }
///
/// assert_eq!(Counter::capabilities(Capabilities::new()).channels(), vec![fiber_core::Channel::Tick]);
/// ```
pub trait Component: Any + Sized {
    /// Channels this component is subscribed to. Defaults to none.
    fn capabilities(caps: Capabilities<Self>) -> Capabilities<Self> {
        caps
    }
}

/// Outcome of invoking one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The target was already mutably borrowed further up the stack
    Busy,
    /// The erased object was not of the table's type
    Mismatch,
}

/// Erased handler invocation: receives the `RefCell<T>` behind a handle
pub type Invoke = Rc<dyn Fn(&dyn Any, &Event) -> Delivery>;

/// Typed capability table under construction
pub struct Capabilities<T> {
    entries: Vec<(Channel, fn(&mut T, &Event))>,
}

impl<T: Any> Capabilities<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn with(mut self, channel: Channel, handler: fn(&mut T, &Event)) -> Self {
        if !self.entries.iter().any(|(c, _)| *c == channel) {
            self.entries.push((channel, handler));
        }
        self
    }

    /// Channels declared so far, in declaration order
    pub fn channels(&self) -> Vec<Channel> {
        self.entries.iter().map(|(channel, _)| *channel).collect()
    }

    /// Erase the table so it can be stored next to objects of any type
    pub fn erase(self) -> CapabilityTable {
        let entries = self
            .entries
            .into_iter()
            .map(|(channel, handler)| {
                let invoke: Invoke = Rc::new(move |cell: &dyn Any, event: &Event| {
                    let Some(cell) = cell.downcast_ref::<RefCell<T>>() else {
                        return Delivery::Mismatch;
                    };
                    match cell.try_borrow_mut() {
                        Ok(mut target) => {
                            handler(&mut *target, event);
                            Delivery::Delivered
                        }
                        Err(_) => Delivery::Busy,
                    }
                });
                (channel, invoke)
            })
            .collect();

        CapabilityTable { entries }
    }
}

impl<T: Any> Default for Capabilities<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Erased capability table for one concrete type
#[derive(Clone, Default)]
pub struct CapabilityTable {
    entries: Vec<(Channel, Invoke)>,
}

impl CapabilityTable {
    pub fn of<T: Component>() -> Self {
        T::capabilities(Capabilities::new()).erase()
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.entries.iter().map(|(channel, _)| *channel)
    }

    pub fn implements(&self, channel: Channel) -> bool {
        self.entries.iter().any(|(c, _)| *c == channel)
    }

    pub fn entries(&self) -> &[(Channel, Invoke)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.channels()).finish()
    }
}

macro_rules! define_capabilities {
    (@call $target:ident, $event:ident, $channel:ident, $method:ident) => {{
        let _ = $event;
        $target.$method()
    }};
    (@call $target:ident, $event:ident, $channel:ident, $method:ident, $arg:ident) => {
        if let Event::$channel($arg) = $event {
            $target.$method($arg)
        }
    };
    ($(
        $(#[$meta:meta])*
        $channel:ident => $trait_:ident :: $method:ident ( $($arg:ident : $payload:ty)? ) as $builder:ident;
    )*) => {
        $(
            $(#[$meta])*
            pub trait $trait_ {
                fn $method(&mut self $(, $arg: &$payload)?);
            }
        )*

        impl<T: Any> Capabilities<T> {
            $(
                #[doc = concat!("Subscribe to the `", stringify!($channel), "` channel.")]
                pub fn $builder(self) -> Self
                where
                    T: $trait_,
                {
                    self.with(Channel::$channel, |target: &mut T, event: &Event| {
                        define_capabilities!(@call target, event, $channel, $method $(, $arg)?)
                    })
                }
            )*
        }
    };
}

define_capabilities! {
    /// Runs once, on the first ready tick after the triad went live.
    Start => Start::on_start() as start;
    /// Per-frame update.
    Tick => Tick::on_tick() as tick;
    /// Fixed-step update.
    FixedTick => FixedTick::on_fixed_tick() as fixed_tick;
    /// Update after every `Tick` of the frame has run.
    LateTick => LateTick::on_late_tick() as late_tick;
    Enable => Enable::on_enable() as enable;
    Disable => Disable::on_disable() as disable;
    /// The bound node is being detached from the scene.
    Destroy => Destroy::on_destroy() as destroy;
    PointerDown => PointerDown::on_pointer_down() as pointer_down;
    PointerUp => PointerUp::on_pointer_up() as pointer_up;
    PointerEnter => PointerEnter::on_pointer_enter() as pointer_enter;
    PointerExit => PointerExit::on_pointer_exit() as pointer_exit;
    PointerOver => PointerOver::on_pointer_over() as pointer_over;
    PointerDrag => PointerDrag::on_pointer_drag() as pointer_drag;
    TriggerEnter => TriggerEnter::on_trigger_enter(other: Collider) as trigger_enter;
    TriggerExit => TriggerExit::on_trigger_exit(other: Collider) as trigger_exit;
    TriggerStay => TriggerStay::on_trigger_stay(other: Collider) as trigger_stay;
    TriggerEnter2d => TriggerEnter2d::on_trigger_enter_2d(other: Collider2d) as trigger_enter_2d;
    TriggerExit2d => TriggerExit2d::on_trigger_exit_2d(other: Collider2d) as trigger_exit_2d;
    TriggerStay2d => TriggerStay2d::on_trigger_stay_2d(other: Collider2d) as trigger_stay_2d;
    CollisionEnter => CollisionEnter::on_collision_enter(collision: Collision) as collision_enter;
    CollisionExit => CollisionExit::on_collision_exit(collision: Collision) as collision_exit;
    CollisionStay => CollisionStay::on_collision_stay(collision: Collision) as collision_stay;
    CollisionEnter2d => CollisionEnter2d::on_collision_enter_2d(collision: Collision2d) as collision_enter_2d;
    CollisionExit2d => CollisionExit2d::on_collision_exit_2d(collision: Collision2d) as collision_exit_2d;
    CollisionStay2d => CollisionStay2d::on_collision_stay_2d(collision: Collision2d) as collision_stay_2d;
    BecameVisible => BecameVisible::on_became_visible() as became_visible;
    BecameInvisible => BecameInvisible::on_became_invisible() as became_invisible;
    /// Editor-style debug drawing.
    DebugDraw => DebugDraw::on_debug_draw() as debug_draw;
}
