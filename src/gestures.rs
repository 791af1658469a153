use log::debug;
use serde::{Deserialize, Serialize};

use crate::swipe::{SwipeConfig, SwipeDirection, TouchSample, classify};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ownership {
    #[default]
    Undecided,
    SelfOwned,
    AncestorOwned,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRule {
    pub touch_count: usize,
    pub min_dy: f32,
}

impl Default for CaptureRule {
    fn default() -> Self {
        Self {
            touch_count: 1,
            min_dy: 5.0,
        }
    }
}

impl CaptureRule {
    pub fn should_capture(&self, touch_count: usize, dy: f32) -> bool {
        touch_count == self.touch_count && dy > self.min_dy
    }
}

pub fn should_capture(touch_count: usize, dy: f32) -> bool {
    CaptureRule::default().should_capture(touch_count, dy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterSignal {
    PauseAutoplay,
    HideBackOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDecision {
    pub ownership: Ownership,
    pub assume_horizontal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureOutcome {
    pub direction: SwipeDirection,
    pub ownership: Ownership,
    pub sample: Option<TouchSample>,
}

#[derive(Debug, Clone)]
pub struct GestureArbiter {
    swipe: SwipeConfig,
    rule: CaptureRule,
    ownership: Ownership,
    active: bool,
    last_sample: Option<TouchSample>,
}

impl GestureArbiter {
    pub fn new(swipe: SwipeConfig, rule: CaptureRule) -> Self {
        Self {
            swipe,
            rule,
            ownership: Ownership::Undecided,
            active: false,
            last_sample: None,
        }
    }

    pub fn set_swipe_config(&mut self, swipe: SwipeConfig) {
        self.swipe = swipe;
    }

    pub fn set_capture_rule(&mut self, rule: CaptureRule) {
        self.rule = rule;
    }

    pub fn swipe_config(&self) -> &SwipeConfig {
        &self.swipe
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin(&mut self) -> [ArbiterSignal; 2] {
        if self.active {
            debug!("arbiter: new touch sequence before the previous one ended");
        }
        self.active = true;
        self.ownership = Ownership::Undecided;
        self.last_sample = None;
        [ArbiterSignal::PauseAutoplay, ArbiterSignal::HideBackOverlay]
    }

    /// Returns the capture decision on the first move of a sequence only.
    pub fn on_move(&mut self, sample: TouchSample) -> Option<CaptureDecision> {
        if !self.active {
            debug!("arbiter: move outside of a touch sequence ignored");
            return None;
        }
        self.last_sample = Some(sample);

        if self.ownership != Ownership::Undecided {
            return None;
        }

        let captured = self
            .rule
            .should_capture(sample.active_touch_count, sample.dy);
        self.ownership = if captured {
            Ownership::SelfOwned
        } else {
            Ownership::AncestorOwned
        };
        debug!(
            "arbiter: touches={} dy={:.1} -> {:?}",
            sample.active_touch_count, sample.dy, self.ownership
        );

        Some(CaptureDecision {
            ownership: self.ownership,
            assume_horizontal: !captured,
        })
    }

    /// Fingers lifted. `final_sample` overrides the last recorded move.
    pub fn release(&mut self, final_sample: Option<TouchSample>) -> GestureOutcome {
        self.finish(final_sample, "release")
    }

    pub fn terminate(&mut self, final_sample: Option<TouchSample>) -> GestureOutcome {
        self.finish(final_sample, "terminate")
    }

    fn finish(&mut self, final_sample: Option<TouchSample>, why: &str) -> GestureOutcome {
        let sample = final_sample.or(self.last_sample);
        let direction = sample
            .map(|s| classify(&s, &self.swipe))
            .unwrap_or(SwipeDirection::None);
        let outcome = GestureOutcome {
            direction,
            ownership: self.ownership,
            sample,
        };
        debug!(
            "arbiter: {why} owned={:?} -> {}",
            outcome.ownership,
            direction.as_str()
        );

        self.active = false;
        self.ownership = Ownership::Undecided;
        self.last_sample = None;
        outcome
    }
}

impl Default for GestureArbiter {
    fn default() -> Self {
        Self::new(SwipeConfig::default(), CaptureRule::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(touches: usize, dx: f32, dy: f32, vx: f32, vy: f32) -> TouchSample {
        TouchSample::new(touches, dx, dy, vx, vy)
    }

    #[test]
    fn capture_rule_matches_one_finger_pull_down() {
        assert!(should_capture(1, 10.0));
        assert!(!should_capture(2, 10.0));
        assert!(!should_capture(1, 2.0));
        assert!(!should_capture(1, 5.0));
        assert!(!should_capture(1, -30.0));
        assert!(!should_capture(0, 10.0));
    }

    #[test]
    fn begin_emits_optimistic_signals() {
        let mut arb = GestureArbiter::default();
        let signals = arb.begin();
        assert_eq!(
            signals,
            [ArbiterSignal::PauseAutoplay, ArbiterSignal::HideBackOverlay]
        );
        assert!(arb.is_active());
        assert_eq!(arb.ownership(), Ownership::Undecided);
    }

    #[test]
    fn decides_once_per_sequence() {
        let mut arb = GestureArbiter::default();
        arb.begin();

        let first = arb.on_move(mv(1, 0.0, 12.0, 0.0, 0.4));
        assert_eq!(
            first,
            Some(CaptureDecision {
                ownership: Ownership::SelfOwned,
                assume_horizontal: false,
            })
        );

        // a second finger later does not flip ownership
        assert_eq!(arb.on_move(mv(2, 40.0, 12.0, 0.9, 0.0)), None);
        assert_eq!(arb.ownership(), Ownership::SelfOwned);
    }

    #[test]
    fn declined_capture_assumes_horizontal() {
        let mut arb = GestureArbiter::default();
        arb.begin();
        let d = arb.on_move(mv(1, 30.0, 1.0, 0.6, 0.0)).unwrap();
        assert_eq!(d.ownership, Ownership::AncestorOwned);
        assert!(d.assume_horizontal);

        // even a later downward pull stays with the ancestor
        assert_eq!(arb.on_move(mv(1, 30.0, 50.0, 0.0, 1.0)), None);
        assert_eq!(arb.ownership(), Ownership::AncestorOwned);
    }

    #[test]
    fn new_sequence_rearbitrates() {
        let mut arb = GestureArbiter::default();
        arb.begin();
        arb.on_move(mv(2, 0.0, 10.0, 0.0, 0.0));
        arb.release(None);

        arb.begin();
        let d = arb.on_move(mv(1, 0.0, 10.0, 0.0, 0.0)).unwrap();
        assert_eq!(d.ownership, Ownership::SelfOwned);
    }

    #[test]
    fn release_classifies_final_sample() {
        let mut arb = GestureArbiter::default();
        arb.begin();
        arb.on_move(mv(1, 0.0, 20.0, 0.0, 0.2));
        let out = arb.release(Some(mv(1, 2.0, 240.0, 0.0, 1.4)));
        assert_eq!(out.direction, SwipeDirection::Down);
        assert_eq!(out.ownership, Ownership::SelfOwned);
        assert!(!arb.is_active());
        assert_eq!(arb.ownership(), Ownership::Undecided);
    }

    #[test]
    fn release_falls_back_to_last_move() {
        let mut arb = GestureArbiter::default();
        arb.begin();
        arb.on_move(mv(1, -150.0, 3.0, -0.8, 0.0));
        let out = arb.terminate(None);
        assert_eq!(out.direction, SwipeDirection::Left);
    }

    #[test]
    fn release_without_samples_is_a_tap() {
        let mut arb = GestureArbiter::default();
        arb.begin();
        let out = arb.release(None);
        assert_eq!(out.direction, SwipeDirection::None);
        assert_eq!(out.sample, None);
        assert_eq!(out.ownership, Ownership::Undecided);
    }

    #[test]
    fn moves_outside_a_sequence_are_ignored() {
        let mut arb = GestureArbiter::default();
        assert_eq!(arb.on_move(mv(1, 0.0, 10.0, 0.0, 0.0)), None);
        assert_eq!(arb.ownership(), Ownership::Undecided);
    }

    #[test]
    fn custom_capture_rule() {
        let rule = CaptureRule {
            touch_count: 2,
            min_dy: 20.0,
        };
        assert!(rule.should_capture(2, 21.0));
        assert!(!rule.should_capture(1, 21.0));
        assert!(!rule.should_capture(2, 20.0));
    }
}
