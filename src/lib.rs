//! Interaction core of a paged story deck: swipe classification, gesture
//! ownership arbitration and the offset-driven card transforms.

pub mod capture;
pub mod config;
pub mod deck;
pub mod gestures;
pub mod input;
pub mod interpolate;
pub mod live;
pub mod logging;
pub mod offset;
pub mod swipe;
pub mod trace;
pub mod tracker;
pub mod transform;

pub use deck::{DeckCommand, DeckController, DeckListener, DeckSettings};
pub use gestures::{GestureArbiter, Ownership, should_capture};
pub use swipe::{SwipeConfig, SwipeDirection, TouchSample, classify};
pub use transform::{TransformDescriptor, TransformDeriver, derive_transform, overlay_opacity};
