//! Offset-to-transform derivation for the cards of the deck.
//!
//! Every card listens to the same horizontal offset. A card sitting exactly on
//! its own page is untransformed; one page away it is rotated about the Y axis
//! like the face of a cube, with a translation correcting the displacement the
//! perspective projection introduces.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::interpolate::Interpolation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 800.0,
        }
    }
}

/// Tunables of the flip effect.
///
/// `compensation_divisor` is tuned for a perspective distance equal to the
/// viewport width. It is not derived from the geometry; changing the
/// perspective or the rotation angle requires re-tuning it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub max_rotation_deg: f32,
    pub compensation_divisor: f32,
    pub edge_epsilon: f32,
    pub overlay_opacity: f32,
    pub dismiss_scale: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            max_rotation_deg: 60.0,
            compensation_divisor: 2.38,
            edge_epsilon: 0.1,
            overlay_opacity: 0.9,
            dismiss_scale: 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Degrees(pub f32);

impl fmt::Display for Degrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print "-0deg"
        let v = if self.0 == 0.0 { 0.0 } else { self.0 };
        write!(f, "{v}deg")
    }
}

impl Serialize for Degrees {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformOp {
    Perspective(f32),
    TranslateX(f32),
    RotateY(Degrees),
    TranslateY(f32),
    Scale(f32),
}

/// Placement of one card. Serialized as the op list, in application order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformDescriptor {
    pub perspective: f32,
    pub translate_x: f32,
    pub rotate_y: Degrees,
    pub translate_x_after_rotate: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl TransformDescriptor {
    /// Later ops apply in the space produced by earlier ones; the order is
    /// part of the effect.
    pub fn ops(&self) -> [TransformOp; 6] {
        [
            TransformOp::Perspective(self.perspective),
            TransformOp::TranslateX(self.translate_x),
            TransformOp::RotateY(self.rotate_y),
            TransformOp::TranslateX(self.translate_x_after_rotate),
            TransformOp::TranslateY(self.translate_y),
            TransformOp::Scale(self.scale),
        ]
    }
}

impl Serialize for TransformDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ops().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformDeriver {
    pub viewport: Viewport,
    pub calibration: Calibration,
}

impl TransformDeriver {
    pub fn new(viewport: Viewport, calibration: Calibration) -> Self {
        Self {
            viewport,
            calibration,
        }
    }

    pub fn page_x(&self, index: usize) -> f32 {
        self.viewport.width * index as f32
    }

    fn page_domain(&self, index: usize) -> [f32; 3] {
        let p = self.page_x(index);
        let w = self.viewport.width;
        [p - w, p, p + w]
    }

    pub fn derive(
        &self,
        index: usize,
        offset: f32,
        dismiss_progress: f32,
        swiped_horizontally: bool,
    ) -> TransformDescriptor {
        let Viewport { width: w, height: h } = self.viewport;
        let cal = &self.calibration;
        let p = self.page_x(index);
        let domain = self.page_domain(index);

        let translate_x = Interpolation::clamped(domain, [w / 2.0, 0.0, -w / 2.0]).at(offset);
        let rotate_y = Interpolation::clamped(
            domain,
            [cal.max_rotation_deg, 0.0, -cal.max_rotation_deg],
        )
        .at(offset);

        let eps = cal.edge_epsilon;
        let pivot = w / cal.compensation_divisor;
        let translate_x_after_rotate = Interpolation::clamped(
            [p - w, p - w + eps, p, p + w - eps, p + w],
            [w, pivot, 0.0, -pivot, -w],
        )
        .at(offset);

        let dismiss_domain = [-1.0, 0.0, h];
        let translate_y =
            Interpolation::extended(dismiss_domain, [0.0, 0.0, h / 2.0]).at(dismiss_progress);
        let scale = if swiped_horizontally {
            1.0
        } else {
            Interpolation::extended(dismiss_domain, [1.0, 1.0, cal.dismiss_scale])
                .at(dismiss_progress)
        };

        TransformDescriptor {
            perspective: w,
            translate_x,
            rotate_y: Degrees(rotate_y),
            translate_x_after_rotate,
            translate_y,
            scale,
        }
    }

    /// Darkening of a card: transparent when focused, dim one page away.
    pub fn overlay_opacity(&self, index: usize, offset: f32) -> f32 {
        let o = self.calibration.overlay_opacity;
        Interpolation::clamped(self.page_domain(index), [o, 0.0, o]).at(offset)
    }

    /// Whether the card's interpolation domain contains `offset`.
    pub fn is_visible(&self, index: usize, offset: f32) -> bool {
        let [lo, _, hi] = self.page_domain(index);
        offset > lo && offset < hi
    }
}

/// [`TransformDeriver::derive`] with the stock calibration.
pub fn derive_transform(
    index: usize,
    offset: f32,
    dismiss_progress: f32,
    swiped_horizontally: bool,
    viewport_width: f32,
    viewport_height: f32,
) -> TransformDescriptor {
    let viewport = Viewport {
        width: viewport_width,
        height: viewport_height,
    };
    TransformDeriver::new(viewport, Calibration::default()).derive(
        index,
        offset,
        dismiss_progress,
        swiped_horizontally,
    )
}

pub fn overlay_opacity(index: usize, offset: f32, viewport_width: f32) -> f32 {
    let viewport = Viewport {
        width: viewport_width,
        ..Viewport::default()
    };
    TransformDeriver::new(viewport, Calibration::default()).overlay_opacity(index, offset)
}
