use serde::{Deserialize, Serialize};

/// One sample of an active touch sequence.
///
/// `dx`/`dy` are cumulative since the touch went down, `vx`/`vy` are the
/// instantaneous velocity in viewport units per millisecond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    #[serde(rename = "touches")]
    pub active_touch_count: usize,
    pub dx: f32,
    pub dy: f32,
    pub vx: f32,
    pub vy: f32,
}

impl TouchSample {
    pub fn new(active_touch_count: usize, dx: f32, dy: f32, vx: f32, vy: f32) -> Self {
        Self {
            active_touch_count,
            dx,
            dy,
            vx,
            vy,
        }
    }

    /// A sample with NaN or infinite components carries no usable motion.
    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite() && self.vx.is_finite() && self.vy.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwipeConfig {
    pub velocity_threshold: f32,
    pub directional_offset_threshold: f32,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: 0.3,
            directional_offset_threshold: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
    /// No qualifying swipe: a tap.
    None,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::None => "none",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Fast enough along the swipe axis and close enough to it on the cross axis.
pub fn is_valid_swipe(
    velocity: f32,
    velocity_threshold: f32,
    cross_axis_offset: f32,
    offset_threshold: f32,
) -> bool {
    velocity.abs() > velocity_threshold && cross_axis_offset.abs() < offset_threshold
}

/// Horizontal wins over vertical when a sample qualifies on both axes.
pub fn classify(sample: &TouchSample, config: &SwipeConfig) -> SwipeDirection {
    if !sample.is_finite() {
        return SwipeDirection::None;
    }

    let SwipeConfig {
        velocity_threshold,
        directional_offset_threshold,
    } = *config;

    if is_valid_swipe(
        sample.vx,
        velocity_threshold,
        sample.dy,
        directional_offset_threshold,
    ) {
        if sample.dx > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    } else if is_valid_swipe(
        sample.vy,
        velocity_threshold,
        sample.dx,
        directional_offset_threshold,
    ) {
        if sample.dy > 0.0 {
            SwipeDirection::Down
        } else {
            SwipeDirection::Up
        }
    } else {
        SwipeDirection::None
    }
}
