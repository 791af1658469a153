use std::time::Instant;

use crate::swipe::TouchSample;
use crate::transform::Viewport;

#[derive(Debug, Clone, Default)]
struct SlotState {
    tracking_id: i32, // -1 = inactive
    x_norm: f32,
    y_norm: f32,
    seen_x: bool,
    seen_y: bool,
    active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    Start,
    Move(TouchSample),
    End(Option<TouchSample>),
}

/// Running state of one touch sequence, in viewport units.
#[derive(Debug, Clone, Default)]
struct Sequence {
    touches: usize,
    prev_centroid: (f32, f32),
    prev_ms: u64,
    dx: f32,
    dy: f32,
    vx: f32,
    vy: f32,
    moved: bool,
    last_sample: Option<TouchSample>,
}

#[derive(Debug)]
pub struct Tracker {
    slots: Vec<SlotState>,
    cur_slot: i32,
    // normalization
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    viewport: Viewport,
    smooth_ema: f32,
    slop: f32,
    start_instant: Instant,
    seq: Option<Sequence>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(Viewport::default(), 0.5)
    }
}

impl Tracker {
    pub fn new(viewport: Viewport, smooth_ema: f32) -> Self {
        Self {
            slots: vec![SlotState::default(); 10],
            cur_slot: 0,
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            viewport,
            smooth_ema: smooth_ema.clamp(0.01, 1.0),
            slop: 0.0,
            start_instant: Instant::now(),
            seq: None,
        }
    }

    pub fn set_norm_ranges(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min = x_min;
        self.x_max = x_max.max(x_min + 1);
        self.y_min = y_min;
        self.y_max = y_max.max(y_min + 1);
    }

    pub fn set_viewport(&mut self, viewport: Viewport, smooth_ema: f32) {
        self.viewport = viewport;
        self.smooth_ema = smooth_ema.clamp(0.01, 1.0);
    }

    /// Moves stay silent until the centroid has travelled `px` from where
    /// the touch went down, so the first move carries a readable direction.
    pub fn set_slop(&mut self, px: f32) {
        self.slop = if px.is_finite() { px.max(0.0) } else { 0.0 };
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.active && s.tracking_id >= 0 && s.seen_x && s.seen_y)
            .count()
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = slot.clamp(0, (self.slots.len() as i32) - 1);
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        let s = &mut self.slots[self.cur_slot as usize];
        if tracking_id < 0 {
            // release
            s.tracking_id = -1;
            s.active = false;
        } else {
            // new touch: position is unknown until both axes report
            *s = SlotState {
                tracking_id,
                x_norm: s.x_norm,
                y_norm: s.y_norm,
                seen_x: false,
                seen_y: false,
                active: true,
            };
        }
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let nx = ((raw - self.x_min) as f32 / (self.x_max - self.x_min) as f32).clamp(0.0, 1.0);
        let s = &mut self.slots[self.cur_slot as usize];
        s.x_norm = nx;
        s.seen_x = true;
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let ny = ((raw - self.y_min) as f32 / (self.y_max - self.y_min) as f32).clamp(0.0, 1.0);
        let s = &mut self.slots[self.cur_slot as usize];
        s.y_norm = ny;
        s.seen_y = true;
    }

    fn centroid(&self) -> Option<(usize, (f32, f32))> {
        let act: Vec<&SlotState> = self
            .slots
            .iter()
            .filter(|s| s.active && s.tracking_id >= 0 && s.seen_x && s.seen_y)
            .collect();
        if act.is_empty() {
            return None;
        }
        let n = act.len() as f32;
        let sumx: f32 = act.iter().map(|s| s.x_norm).sum();
        let sumy: f32 = act.iter().map(|s| s.y_norm).sum();
        Some((
            act.len(),
            (
                sumx / n * self.viewport.width,
                sumy / n * self.viewport.height,
            ),
        ))
    }

    pub fn on_syn_report(&mut self) -> Option<TouchEvent> {
        let now = self.start_instant.elapsed().as_millis() as u64;
        self.on_syn_report_at(now)
    }

    /// Closes a frame at `now_ms`.
    pub fn on_syn_report_at(&mut self, now_ms: u64) -> Option<TouchEvent> {
        let ema = self.smooth_ema;
        let slop = self.slop;
        let Some((touches, c)) = self.centroid() else {
            return self.seq.take().map(|seq| TouchEvent::End(seq.last_sample));
        };

        if self.seq.is_none() {
            self.seq = Some(Sequence {
                touches,
                prev_centroid: c,
                prev_ms: now_ms,
                ..Sequence::default()
            });
            return Some(TouchEvent::Start);
        }
        let seq = self.seq.as_mut()?;

        if touches != seq.touches {
            // finger count changed: rebase so displacement stays continuous
            seq.touches = touches;
            seq.prev_centroid = c;
            seq.prev_ms = now_ms;
            if !seq.moved {
                return None;
            }
            let sample = TouchSample::new(touches, seq.dx, seq.dy, seq.vx, seq.vy);
            seq.last_sample = Some(sample);
            return Some(TouchEvent::Move(sample));
        }

        let ddx = c.0 - seq.prev_centroid.0;
        let ddy = c.1 - seq.prev_centroid.1;
        if ddx == 0.0 && ddy == 0.0 {
            return None;
        }
        let dt = now_ms.saturating_sub(seq.prev_ms).max(1) as f32;
        seq.vx = ema * (ddx / dt) + (1.0 - ema) * seq.vx;
        seq.vy = ema * (ddy / dt) + (1.0 - ema) * seq.vy;
        seq.dx += ddx;
        seq.dy += ddy;
        seq.prev_centroid = c;
        seq.prev_ms = now_ms;

        if !seq.moved {
            if seq.dx.hypot(seq.dy) < slop {
                return None;
            }
            seq.moved = true;
        }
        let sample = TouchSample::new(touches, seq.dx, seq.dy, seq.vx, seq.vy);
        seq.last_sample = Some(sample);
        Some(TouchEvent::Move(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::CaptureRule;

    fn tracker() -> Tracker {
        // 1000 raw units map onto a 400x800 viewport; EMA off
        let mut t = Tracker::new(Viewport::default(), 1.0);
        t.set_norm_ranges(0, 1000, 0, 1000);
        t
    }

    fn touch(t: &mut Tracker, slot: i32, id: i32, x: i32, y: i32) {
        t.on_slot(slot);
        t.on_tracking_id(id);
        t.on_pos_x(x);
        t.on_pos_y(y);
    }

    fn move_to(t: &mut Tracker, slot: i32, x: i32, y: i32) {
        t.on_slot(slot);
        t.on_pos_x(x);
        t.on_pos_y(y);
    }

    fn lift(t: &mut Tracker, slot: i32) {
        t.on_slot(slot);
        t.on_tracking_id(-1);
    }

    #[test]
    fn single_finger_drag_produces_samples() {
        let mut t = tracker();
        assert_eq!(t.on_syn_report_at(0), None);

        touch(&mut t, 0, 7, 500, 500);
        assert_eq!(t.on_syn_report_at(0), Some(TouchEvent::Start));

        move_to(&mut t, 0, 250, 500);
        let Some(TouchEvent::Move(s)) = t.on_syn_report_at(100) else {
            panic!("expected a move");
        };
        assert_eq!(s.active_touch_count, 1);
        assert!((s.dx - -100.0).abs() < 1e-3);
        assert_eq!(s.dy, 0.0);
        assert!((s.vx - -1.0).abs() < 1e-3);

        lift(&mut t, 0);
        assert_eq!(t.on_syn_report_at(120), Some(TouchEvent::End(Some(s))));
        assert_eq!(t.active_count(), 0);
    }

    #[test]
    fn stationary_frames_emit_nothing() {
        let mut t = tracker();
        touch(&mut t, 0, 1, 100, 100);
        t.on_syn_report_at(0);
        move_to(&mut t, 0, 100, 100);
        assert_eq!(t.on_syn_report_at(16), None);
    }

    #[test]
    fn tap_without_motion_ends_without_sample() {
        let mut t = tracker();
        touch(&mut t, 0, 1, 100, 100);
        t.on_syn_report_at(0);
        lift(&mut t, 0);
        assert_eq!(t.on_syn_report_at(50), Some(TouchEvent::End(None)));
    }

    #[test]
    fn second_finger_rebases_displacement() {
        let mut t = tracker();
        touch(&mut t, 0, 1, 100, 100);
        t.on_syn_report_at(0);
        move_to(&mut t, 0, 100, 200);
        t.on_syn_report_at(10);

        touch(&mut t, 1, 2, 900, 900);
        let Some(TouchEvent::Move(s)) = t.on_syn_report_at(20) else {
            panic!("expected a move");
        };
        assert_eq!(s.active_touch_count, 2);
        assert!((s.dy - 80.0).abs() < 1e-3);
    }

    #[test]
    fn slop_holds_back_the_first_move() {
        let mut t = tracker();
        t.set_slop(8.0);
        touch(&mut t, 0, 1, 500, 100);
        assert_eq!(t.on_syn_report_at(0), Some(TouchEvent::Start));

        // 5 raw units = 4 px down
        move_to(&mut t, 0, 500, 105);
        assert_eq!(t.on_syn_report_at(10), None);

        move_to(&mut t, 0, 500, 115);
        let Some(TouchEvent::Move(s)) = t.on_syn_report_at(20) else {
            panic!("expected a move");
        };
        assert!((s.dy - 12.0).abs() < 1e-3);
        assert!(CaptureRule::default().should_capture(s.active_touch_count, s.dy));

        // past the slop every frame reports
        move_to(&mut t, 0, 500, 116);
        assert!(matches!(t.on_syn_report_at(30), Some(TouchEvent::Move(_))));
    }

    #[test]
    fn press_inside_slop_ends_as_tap() {
        let mut t = tracker();
        t.set_slop(8.0);
        touch(&mut t, 0, 1, 500, 500);
        t.on_syn_report_at(0);
        move_to(&mut t, 0, 502, 501);
        assert_eq!(t.on_syn_report_at(10), None);
        lift(&mut t, 0);
        assert_eq!(t.on_syn_report_at(20), Some(TouchEvent::End(None)));
    }
}
