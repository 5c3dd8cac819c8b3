//! Error types for registry, container and construction failures

use crate::handle::ObjectId;
use std::fmt;

/// Errors raised by the fiber core
///
/// Container errors are invariant violations and propagate to whoever drove
/// the registration. Queries never fail; they return `None` instead.
#[derive(Debug, thiserror::Error)]
pub enum FiberError {
    #[error("{object} is already registered in the container of {type_name} instances")]
    DuplicateMember {
        type_name: &'static str,
        object: ObjectId,
    },

    #[error("container of {type_name} instances does not contain {object}")]
    MissingMember {
        type_name: &'static str,
        object: ObjectId,
    },

    #[error("cannot instantiate {type_name}: no zero-argument constructor registered")]
    Instantiation { type_name: &'static str },

    #[error("{slot} of {type_name} has no zero-argument constructor")]
    MissingPart {
        type_name: &'static str,
        slot: PartSlot,
    },

    #[error("unknown controller type: {0}")]
    UnknownController(String),
}

pub type Result<T> = std::result::Result<T, FiberError>;

/// The sub-object slots of a triad that can be rebuilt independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartSlot {
    Model,
    View,
    Configuration,
}

impl fmt::Display for PartSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartSlot::Model => write!(f, "model"),
            PartSlot::View => write!(f, "view"),
            PartSlot::Configuration => write!(f, "configuration"),
        }
    }
}
