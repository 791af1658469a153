use proptest::prelude::*;

use storydeck::swipe::{SwipeConfig, SwipeDirection, TouchSample, classify};
use storydeck::transform::derive_transform;

fn cfg() -> SwipeConfig {
    SwipeConfig::default()
}

proptest! {
    #[test]
    fn fast_horizontal_with_small_drift_is_horizontal(
        dx in 0.01f32..2000.0,
        dy in -79.9f32..79.9,
        speed in 0.31f32..20.0,
        vy in -20.0f32..20.0,
        right in any::<bool>(),
    ) {
        let (dx, vx) = if right { (dx, speed) } else { (-dx, -speed) };
        let expected = if right { SwipeDirection::Right } else { SwipeDirection::Left };
        prop_assert_eq!(classify(&TouchSample::new(1, dx, dy, vx, vy), &cfg()), expected);
    }

    #[test]
    fn fast_vertical_with_small_drift_is_vertical(
        dx in -79.9f32..79.9,
        dy in 0.01f32..2000.0,
        vx in -0.3f32..0.3,
        speed in 0.31f32..20.0,
        down in any::<bool>(),
    ) {
        let (dy, vy) = if down { (dy, speed) } else { (-dy, -speed) };
        let expected = if down { SwipeDirection::Down } else { SwipeDirection::Up };
        prop_assert_eq!(classify(&TouchSample::new(1, dx, dy, vx, vy), &cfg()), expected);
    }

    #[test]
    fn slow_samples_are_taps(
        dx in -500.0f32..500.0,
        dy in -500.0f32..500.0,
        vx in -0.3f32..0.3,
        vy in -0.3f32..0.3,
    ) {
        prop_assert_eq!(classify(&TouchSample::new(1, dx, dy, vx, vy), &cfg()), SwipeDirection::None);
    }

    #[test]
    fn transform_stays_within_channel_ranges(
        index in 0usize..10,
        offset in -8000.0f32..8000.0,
        dismiss in -1.0f32..800.0,
        horizontal in any::<bool>(),
    ) {
        let t = derive_transform(index, offset, dismiss, horizontal, 400.0, 800.0);
        prop_assert!(t.rotate_y.0 >= -60.0 && t.rotate_y.0 <= 60.0);
        prop_assert!(t.translate_x >= -200.0 && t.translate_x <= 200.0);
        prop_assert!(t.translate_x_after_rotate >= -400.0 && t.translate_x_after_rotate <= 400.0);
        prop_assert!(t.scale >= 0.75 - 1e-6 && t.scale <= 1.0);
        prop_assert!(t.translate_y >= 0.0 && t.translate_y <= 400.0 + 1e-3);
        // rotation and slide always lean the same way
        prop_assert!(t.rotate_y.0 * t.translate_x >= 0.0);
    }
}
