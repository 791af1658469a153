use std::time::Duration;

fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScrollAnimation {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
}

impl ScrollAnimation {
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn value(&self) -> f32 {
        self.from + (self.to - self.from) * ease_in_out_cubic(self.progress())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OffsetTracker {
    value: f32,
    scroll: Option<ScrollAnimation>,
}

impl OffsetTracker {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            scroll: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    // drag/scroll input wins over a programmatic scroll
    pub fn set(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        self.scroll = None;
        self.value = value;
    }

    pub fn scroll_to(&mut self, target: f32, duration: Duration) {
        if !target.is_finite() {
            return;
        }
        if duration.is_zero() || target == self.value {
            self.scroll = None;
            self.value = target;
            return;
        }
        self.scroll = Some(ScrollAnimation {
            from: self.value,
            to: target,
            duration,
            elapsed: Duration::ZERO,
        });
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_some()
    }

    pub fn target(&self) -> f32 {
        self.scroll.map(|s| s.to).unwrap_or(self.value)
    }

    pub fn advance(&mut self, dt: Duration) -> f32 {
        if let Some(mut anim) = self.scroll.take() {
            anim.elapsed += dt;
            if anim.progress() >= 1.0 {
                self.value = anim.to;
            } else {
                self.value = anim.value();
                self.scroll = Some(anim);
            }
        }
        self.value
    }
}
