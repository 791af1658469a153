use std::{collections::HashMap, str::FromStr, time::Duration};

use log::{debug, info};
use serde::Serialize;

use crate::gestures::{ArbiterSignal, CaptureDecision, CaptureRule, GestureArbiter, GestureOutcome};
use crate::offset::OffsetTracker;
use crate::swipe::{SwipeConfig, SwipeDirection, TouchSample};
use crate::transform::{Calibration, TransformDeriver, TransformDescriptor, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeckAction {
    Next,
    Previous,
    Dismiss,
    CancelDismiss,
    Tap,
    None,
}

impl FromStr for DeckAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" => Ok(Self::Next),
            "previous" | "prev" => Ok(Self::Previous),
            "dismiss" => Ok(Self::Dismiss),
            "cancel-dismiss" => Ok(Self::CancelDismiss),
            "tap" => Ok(Self::Tap),
            "none" => Ok(Self::None),
            other => Err(format!("unknown deck action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub left: DeckAction,
    pub right: DeckAction,
    pub up: DeckAction,
    pub down: DeckAction,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            left: DeckAction::Next,
            right: DeckAction::Previous,
            up: DeckAction::CancelDismiss,
            down: DeckAction::Dismiss,
        }
    }
}

impl Bindings {
    // keys are flattened `swipe.<direction>`; missing ones keep defaults
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, String> {
        let mut b = Self::default();
        for (key, value) in map {
            let action: DeckAction = value
                .parse()
                .map_err(|e| format!("binding '{key}': {e}"))?;
            match key.as_str() {
                "swipe.left" => b.left = action,
                "swipe.right" => b.right = action,
                "swipe.up" => b.up = action,
                "swipe.down" => b.down = action,
                other => return Err(format!("unknown binding key '{other}'")),
            }
        }
        Ok(b)
    }

    pub fn action_for(&self, direction: SwipeDirection) -> DeckAction {
        match direction {
            SwipeDirection::Left => self.left,
            SwipeDirection::Right => self.right,
            SwipeDirection::Up => self.up,
            SwipeDirection::Down => self.down,
            SwipeDirection::None => DeckAction::Tap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum DeckCommand {
    PauseAutoplay,
    ResumeAutoplay,
    SetBackOpacity { opacity: f32 },
    ScrollTo { offset: f32, duration_ms: u64 },
    FocusChanged { index: usize },
    Dismiss,
    CancelDismiss,
    SwipedHorizontally { value: bool },
}

/// Receiver of deck output. Every method is optional.
pub trait DeckListener {
    fn on_command(&mut self, _command: &DeckCommand) {}
    fn on_swipe(&mut self, _direction: SwipeDirection, _sample: &TouchSample) {}
    fn on_swipe_left(&mut self, _sample: &TouchSample) {}
    fn on_swipe_right(&mut self, _sample: &TouchSample) {}
    fn on_swipe_up(&mut self, _sample: &TouchSample) {}
    fn on_swipe_down(&mut self, _sample: &TouchSample) {}
    fn on_tap(&mut self, _sample: &TouchSample) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl DeckListener for NoopListener {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckSettings {
    pub viewport: Viewport,
    pub calibration: Calibration,
    pub swipe: SwipeConfig,
    pub capture: CaptureRule,
    pub item_count: usize,
    pub autoplay: bool,
    pub scroll_duration: Duration,
    pub bindings: Bindings,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            calibration: Calibration::default(),
            swipe: SwipeConfig::default(),
            capture: CaptureRule::default(),
            item_count: 1,
            autoplay: true,
            scroll_duration: Duration::from_millis(1000),
            bindings: Bindings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardFrame {
    pub index: usize,
    pub transform: TransformDescriptor,
    pub opacity: f32,
}

#[derive(Debug)]
pub struct DeckController<L: DeckListener = NoopListener> {
    deriver: TransformDeriver,
    arbiter: GestureArbiter,
    offset: OffsetTracker,
    focused: usize,
    item_count: usize,
    swiped_horizontally: bool,
    autoplay: bool,
    paused: bool,
    back_opacity: f32,
    dismiss_progress: f32,
    dismissing: bool,
    bindings: Bindings,
    scroll_duration: Duration,
    listener: L,
}

impl<L: DeckListener> DeckController<L> {
    pub fn new(settings: DeckSettings, listener: L) -> Self {
        Self {
            deriver: TransformDeriver::new(settings.viewport, settings.calibration),
            arbiter: GestureArbiter::new(settings.swipe, settings.capture),
            offset: OffsetTracker::default(),
            focused: 0,
            item_count: settings.item_count,
            swiped_horizontally: true,
            autoplay: settings.autoplay,
            paused: !settings.autoplay,
            back_opacity: 0.0,
            dismiss_progress: 0.0,
            dismissing: false,
            bindings: settings.bindings,
            scroll_duration: settings.scroll_duration,
            listener,
        }
    }

    /// Swaps in reloaded settings. The gesture in flight is kept; focus is
    /// clamped to the new item count and the offset re-targets its page.
    pub fn apply_settings(&mut self, settings: DeckSettings) {
        self.deriver = TransformDeriver::new(settings.viewport, settings.calibration);
        self.arbiter.set_swipe_config(settings.swipe);
        self.arbiter.set_capture_rule(settings.capture);
        self.item_count = settings.item_count;
        self.autoplay = settings.autoplay;
        self.bindings = settings.bindings;
        self.scroll_duration = settings.scroll_duration;
        if self.item_count == 0 {
            self.focused = 0;
            return;
        }
        self.on_focused_index_changed(self.focused);
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn focused_index(&self) -> usize {
        self.focused
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn offset(&self) -> f32 {
        self.offset.value()
    }

    pub fn swiped_horizontally(&self) -> bool {
        self.swiped_horizontally
    }

    pub fn is_autoplay_paused(&self) -> bool {
        self.paused
    }

    pub fn back_opacity(&self) -> f32 {
        self.back_opacity
    }

    pub fn is_dismissing(&self) -> bool {
        self.dismissing
    }

    pub fn dismiss_progress(&self) -> f32 {
        self.dismiss_progress
    }

    pub fn arbiter(&self) -> &GestureArbiter {
        &self.arbiter
    }

    fn emit(&mut self, command: DeckCommand) {
        debug!("deck: {command:?}");
        self.listener.on_command(&command);
    }

    pub fn on_gesture_start(&mut self) {
        for signal in self.arbiter.begin() {
            match signal {
                ArbiterSignal::PauseAutoplay => {
                    self.paused = true;
                    self.emit(DeckCommand::PauseAutoplay);
                }
                ArbiterSignal::HideBackOverlay => {
                    self.back_opacity = 0.0;
                    self.emit(DeckCommand::SetBackOpacity { opacity: 0.0 });
                }
            }
        }
    }

    // a move without a start opens the sequence implicitly
    pub fn on_gesture_sample(&mut self, sample: TouchSample) -> Option<CaptureDecision> {
        if !self.arbiter.is_active() {
            self.on_gesture_start();
        }
        let decision = self.arbiter.on_move(sample)?;
        self.swiped_horizontally = decision.assume_horizontal;
        self.emit(DeckCommand::SwipedHorizontally {
            value: decision.assume_horizontal,
        });
        Some(decision)
    }

    pub fn on_gesture_end(&mut self, sample: Option<TouchSample>) -> SwipeDirection {
        let outcome = self.arbiter.release(sample);
        self.resolve(outcome)
    }

    pub fn on_gesture_terminate(&mut self, sample: Option<TouchSample>) -> SwipeDirection {
        let outcome = self.arbiter.terminate(sample);
        self.resolve(outcome)
    }

    fn resolve(&mut self, outcome: GestureOutcome) -> SwipeDirection {
        let direction = outcome.direction;
        let sample = outcome.sample.unwrap_or_default();

        self.listener.on_swipe(direction, &sample);
        match direction {
            SwipeDirection::Left => self.listener.on_swipe_left(&sample),
            SwipeDirection::Right => self.listener.on_swipe_right(&sample),
            SwipeDirection::Up => self.listener.on_swipe_up(&sample),
            SwipeDirection::Down => self.listener.on_swipe_down(&sample),
            SwipeDirection::None => self.listener.on_tap(&sample),
        }

        match self.bindings.action_for(direction) {
            DeckAction::Next => self.step(1),
            DeckAction::Previous => self.step(-1),
            DeckAction::Dismiss => {
                self.dismissing = true;
                self.emit(DeckCommand::Dismiss);
            }
            DeckAction::CancelDismiss => {
                self.dismissing = false;
                self.dismiss_progress = 0.0;
                self.emit(DeckCommand::CancelDismiss);
            }
            DeckAction::Tap => {
                if direction != SwipeDirection::None {
                    self.listener.on_tap(&sample);
                }
            }
            DeckAction::None => {}
        }

        if self.autoplay && !self.dismissing {
            self.paused = false;
            self.emit(DeckCommand::ResumeAutoplay);
        }
        direction
    }

    fn step(&mut self, delta: isize) {
        let Some(target) = self.focused.checked_add_signed(delta) else {
            debug!("deck: already at the first card");
            return;
        };
        if target >= self.item_count {
            debug!("deck: already at the last card");
            return;
        }
        self.on_focused_index_changed(target);
    }

    pub fn on_focused_index_changed(&mut self, new_index: usize) {
        if self.item_count == 0 {
            return;
        }
        let index = new_index.min(self.item_count - 1);
        if index != self.focused {
            info!("deck: focus {} -> {}", self.focused, index);
            self.focused = index;
            self.emit(DeckCommand::FocusChanged { index });
        }

        let target = self.deriver.page_x(index);
        if target != self.offset.target() {
            self.offset.scroll_to(target, self.scroll_duration);
            self.emit(DeckCommand::ScrollTo {
                offset: target,
                duration_ms: self.scroll_duration.as_millis() as u64,
            });
        }
    }

    pub fn on_scroll(&mut self, offset: f32) {
        self.offset.set(offset);
    }

    /// The scroller came to rest: focus follows the page the offset is
    /// heading to.
    pub fn on_scroll_settled(&mut self) {
        let w = self.deriver.viewport.width;
        if self.item_count == 0 || w <= 0.0 {
            return;
        }
        // target, not value: a paging scroll may still be running
        let page = (self.offset.target() / w).round().max(0.0) as usize;
        let index = page.min(self.item_count - 1);
        if index != self.focused {
            info!("deck: settled on card {index}");
            self.focused = index;
            self.emit(DeckCommand::FocusChanged { index });
        }
    }

    pub fn set_dismiss_progress(&mut self, progress: f32) {
        if progress.is_finite() {
            self.dismiss_progress = progress;
        }
    }

    pub fn advance(&mut self, dt: Duration) -> f32 {
        self.offset.advance(dt)
    }

    pub fn transform_for(&self, index: usize) -> TransformDescriptor {
        self.deriver.derive(
            index,
            self.offset.value(),
            self.dismiss_progress,
            self.swiped_horizontally,
        )
    }

    pub fn opacity_for(&self, index: usize) -> f32 {
        self.deriver.overlay_opacity(index, self.offset.value())
    }

    pub fn frame(&self) -> Vec<CardFrame> {
        let offset = self.offset.value();
        let w = self.deriver.viewport.width;
        if self.item_count == 0 || w <= 0.0 {
            return Vec::new();
        }
        let center = ((offset / w).round().max(0.0) as usize).min(self.item_count - 1);
        let lo = center.saturating_sub(1);
        let hi = (center + 1).min(self.item_count - 1);
        (lo..=hi)
            .filter(|&i| self.deriver.is_visible(i, offset))
            .map(|index| CardFrame {
                index,
                transform: self.transform_for(index),
                opacity: self.opacity_for(index),
            })
            .collect()
    }
}
