//! Shared types for fiber
//!
//! This crate provides the plain data exchanged between the host frame loop
//! and the fiber core: scene node identifiers, the closed set of notification
//! channels, and the events delivered on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scene node identifier, assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Notification channel
///
/// Every capability a component can implement is tied to exactly one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Start,
    Tick,
    FixedTick,
    LateTick,
    Enable,
    Disable,
    Destroy,
    PointerDown,
    PointerUp,
    PointerEnter,
    PointerExit,
    PointerOver,
    PointerDrag,
    TriggerEnter,
    TriggerExit,
    TriggerStay,
    #[serde(rename = "trigger_enter_2d")]
    TriggerEnter2d,
    #[serde(rename = "trigger_exit_2d")]
    TriggerExit2d,
    #[serde(rename = "trigger_stay_2d")]
    TriggerStay2d,
    CollisionEnter,
    CollisionExit,
    CollisionStay,
    #[serde(rename = "collision_enter_2d")]
    CollisionEnter2d,
    #[serde(rename = "collision_exit_2d")]
    CollisionExit2d,
    #[serde(rename = "collision_stay_2d")]
    CollisionStay2d,
    BecameVisible,
    BecameInvisible,
    DebugDraw,
}

impl Channel {
    /// Every channel, in declaration order
    pub const ALL: [Channel; 28] = [
        Channel::Start,
        Channel::Tick,
        Channel::FixedTick,
        Channel::LateTick,
        Channel::Enable,
        Channel::Disable,
        Channel::Destroy,
        Channel::PointerDown,
        Channel::PointerUp,
        Channel::PointerEnter,
        Channel::PointerExit,
        Channel::PointerOver,
        Channel::PointerDrag,
        Channel::TriggerEnter,
        Channel::TriggerExit,
        Channel::TriggerStay,
        Channel::TriggerEnter2d,
        Channel::TriggerExit2d,
        Channel::TriggerStay2d,
        Channel::CollisionEnter,
        Channel::CollisionExit,
        Channel::CollisionStay,
        Channel::CollisionEnter2d,
        Channel::CollisionExit2d,
        Channel::CollisionStay2d,
        Channel::BecameVisible,
        Channel::BecameInvisible,
        Channel::DebugDraw,
    ];

    /// Cadence channels are pumped once per frame for every subscriber.
    /// All other channels are routed to the node a triad is bound to.
    pub fn is_cadence(&self) -> bool {
        matches!(self, Channel::Tick | Channel::FixedTick | Channel::LateTick)
    }

    /// Whether events on this channel carry a payload
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            Channel::TriggerEnter
                | Channel::TriggerExit
                | Channel::TriggerStay
                | Channel::TriggerEnter2d
                | Channel::TriggerExit2d
                | Channel::TriggerStay2d
                | Channel::CollisionEnter
                | Channel::CollisionExit
                | Channel::CollisionStay
                | Channel::CollisionEnter2d
                | Channel::CollisionExit2d
                | Channel::CollisionStay2d
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Start => "start",
            Channel::Tick => "tick",
            Channel::FixedTick => "fixed_tick",
            Channel::LateTick => "late_tick",
            Channel::Enable => "enable",
            Channel::Disable => "disable",
            Channel::Destroy => "destroy",
            Channel::PointerDown => "pointer_down",
            Channel::PointerUp => "pointer_up",
            Channel::PointerEnter => "pointer_enter",
            Channel::PointerExit => "pointer_exit",
            Channel::PointerOver => "pointer_over",
            Channel::PointerDrag => "pointer_drag",
            Channel::TriggerEnter => "trigger_enter",
            Channel::TriggerExit => "trigger_exit",
            Channel::TriggerStay => "trigger_stay",
            Channel::TriggerEnter2d => "trigger_enter_2d",
            Channel::TriggerExit2d => "trigger_exit_2d",
            Channel::TriggerStay2d => "trigger_stay_2d",
            Channel::CollisionEnter => "collision_enter",
            Channel::CollisionExit => "collision_exit",
            Channel::CollisionStay => "collision_stay",
            Channel::CollisionEnter2d => "collision_enter_2d",
            Channel::CollisionExit2d => "collision_exit_2d",
            Channel::CollisionStay2d => "collision_stay_2d",
            Channel::BecameVisible => "became_visible",
            Channel::BecameInvisible => "became_invisible",
            Channel::DebugDraw => "debug_draw",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The other party of a 3D trigger overlap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub node: NodeId,
}

/// The other party of a 2D trigger overlap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider2d {
    pub node: NodeId,
}

/// Contact information for a 3D collision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub other: NodeId,
    pub contact: [f32; 3],
    pub relative_velocity: [f32; 3],
}

impl Collision {
    pub fn with(other: NodeId) -> Self {
        Self {
            other,
            contact: [0.0; 3],
            relative_velocity: [0.0; 3],
        }
    }
}

/// Contact information for a 2D collision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision2d {
    pub other: NodeId,
    pub contact: [f32; 2],
    pub relative_velocity: [f32; 2],
}

impl Collision2d {
    pub fn with(other: NodeId) -> Self {
        Self {
            other,
            contact: [0.0; 2],
            relative_velocity: [0.0; 2],
        }
    }
}

/// A host event, delivered on exactly one channel
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Tick,
    FixedTick,
    LateTick,
    Enable,
    Disable,
    Destroy,
    PointerDown,
    PointerUp,
    PointerEnter,
    PointerExit,
    PointerOver,
    PointerDrag,
    TriggerEnter(Collider),
    TriggerExit(Collider),
    TriggerStay(Collider),
    TriggerEnter2d(Collider2d),
    TriggerExit2d(Collider2d),
    TriggerStay2d(Collider2d),
    CollisionEnter(Collision),
    CollisionExit(Collision),
    CollisionStay(Collision),
    CollisionEnter2d(Collision2d),
    CollisionExit2d(Collision2d),
    CollisionStay2d(Collision2d),
    BecameVisible,
    BecameInvisible,
    DebugDraw,
}

impl Event {
    /// The channel this event is delivered on
    pub fn channel(&self) -> Channel {
        match self {
            Event::Start => Channel::Start,
            Event::Tick => Channel::Tick,
            Event::FixedTick => Channel::FixedTick,
            Event::LateTick => Channel::LateTick,
            Event::Enable => Channel::Enable,
            Event::Disable => Channel::Disable,
            Event::Destroy => Channel::Destroy,
            Event::PointerDown => Channel::PointerDown,
            Event::PointerUp => Channel::PointerUp,
            Event::PointerEnter => Channel::PointerEnter,
            Event::PointerExit => Channel::PointerExit,
            Event::PointerOver => Channel::PointerOver,
            Event::PointerDrag => Channel::PointerDrag,
            Event::TriggerEnter(_) => Channel::TriggerEnter,
            Event::TriggerExit(_) => Channel::TriggerExit,
            Event::TriggerStay(_) => Channel::TriggerStay,
            Event::TriggerEnter2d(_) => Channel::TriggerEnter2d,
            Event::TriggerExit2d(_) => Channel::TriggerExit2d,
            Event::TriggerStay2d(_) => Channel::TriggerStay2d,
            Event::CollisionEnter(_) => Channel::CollisionEnter,
            Event::CollisionExit(_) => Channel::CollisionExit,
            Event::CollisionStay(_) => Channel::CollisionStay,
            Event::CollisionEnter2d(_) => Channel::CollisionEnter2d,
            Event::CollisionExit2d(_) => Channel::CollisionExit2d,
            Event::CollisionStay2d(_) => Channel::CollisionStay2d,
            Event::BecameVisible => Channel::BecameVisible,
            Event::BecameInvisible => Channel::BecameInvisible,
            Event::DebugDraw => Channel::DebugDraw,
        }
    }

    /// Build the event for a channel that carries no payload
    pub fn bare(channel: Channel) -> Option<Event> {
        let event = match channel {
            Channel::Start => Event::Start,
            Channel::Tick => Event::Tick,
            Channel::FixedTick => Event::FixedTick,
            Channel::LateTick => Event::LateTick,
            Channel::Enable => Event::Enable,
            Channel::Disable => Event::Disable,
            Channel::Destroy => Event::Destroy,
            Channel::PointerDown => Event::PointerDown,
            Channel::PointerUp => Event::PointerUp,
            Channel::PointerEnter => Event::PointerEnter,
            Channel::PointerExit => Event::PointerExit,
            Channel::PointerOver => Event::PointerOver,
            Channel::PointerDrag => Event::PointerDrag,
            Channel::BecameVisible => Event::BecameVisible,
            Channel::BecameInvisible => Event::BecameInvisible,
            Channel::DebugDraw => Event::DebugDraw,
            _ => return None,
        };
        Some(event)
    }

    /// Build the event for a channel whose payload names another node
    pub fn with_other(channel: Channel, other: NodeId) -> Option<Event> {
        let event = match channel {
            Channel::TriggerEnter => Event::TriggerEnter(Collider { node: other }),
            Channel::TriggerExit => Event::TriggerExit(Collider { node: other }),
            Channel::TriggerStay => Event::TriggerStay(Collider { node: other }),
            Channel::TriggerEnter2d => Event::TriggerEnter2d(Collider2d { node: other }),
            Channel::TriggerExit2d => Event::TriggerExit2d(Collider2d { node: other }),
            Channel::TriggerStay2d => Event::TriggerStay2d(Collider2d { node: other }),
            Channel::CollisionEnter => Event::CollisionEnter(Collision::with(other)),
            Channel::CollisionExit => Event::CollisionExit(Collision::with(other)),
            Channel::CollisionStay => Event::CollisionStay(Collision::with(other)),
            Channel::CollisionEnter2d => Event::CollisionEnter2d(Collision2d::with(other)),
            Channel::CollisionExit2d => Event::CollisionExit2d(Collision2d::with(other)),
            Channel::CollisionStay2d => Event::CollisionStay2d(Collision2d::with(other)),
            _ => return None,
        };
        Some(event)
    }
}
