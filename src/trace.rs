use std::io::BufRead;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deck::{CardFrame, DeckCommand, DeckController, DeckListener, DeckSettings};
use crate::gestures::Ownership;
use crate::swipe::{SwipeDirection, TouchSample};

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
}

/// Sample as recorded; any missing field makes it degenerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RawSample {
    pub touches: Option<usize>,
    pub dx: Option<f32>,
    pub dy: Option<f32>,
    pub vx: Option<f32>,
    pub vy: Option<f32>,
}

impl RawSample {
    pub fn into_sample(self) -> Option<TouchSample> {
        Some(TouchSample::new(
            self.touches?,
            self.dx?,
            self.dy?,
            self.vx?,
            self.vy?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TraceEvent {
    Start,
    Move(RawSample),
    Release {
        #[serde(default)]
        sample: Option<RawSample>,
    },
    Terminate {
        #[serde(default)]
        sample: Option<RawSample>,
    },
    Scroll {
        offset: f32,
    },
    Settle,
    Dismiss {
        progress: f32,
    },
    Focus {
        index: usize,
    },
    Advance {
        ms: u64,
    },
    Frame,
}

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReplayRecord {
    Command(DeckCommand),
    Capture { ownership: Ownership, swiped_horizontally: bool },
    Swipe { direction: SwipeDirection },
    Tap,
    Frame { offset: f32, cards: Vec<CardFrame> },
}

#[derive(Debug, Default)]
pub struct ReplayLog {
    pub records: Vec<ReplayRecord>,
}

impl DeckListener for ReplayLog {
    fn on_command(&mut self, command: &DeckCommand) {
        self.records.push(ReplayRecord::Command(*command));
    }

    fn on_swipe(&mut self, direction: SwipeDirection, _sample: &TouchSample) {
        self.records.push(ReplayRecord::Swipe { direction });
    }

    fn on_tap(&mut self, _sample: &TouchSample) {
        self.records.push(ReplayRecord::Tap);
    }
}

pub fn parse_line(line: &str, line_no: usize) -> Result<Option<TraceEvent>, TraceError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| TraceError::Parse {
            line: line_no,
            source,
        })
}

pub fn apply<L: DeckListener>(deck: &mut DeckController<L>, event: TraceEvent) -> Option<ReplayRecord> {
    debug!("trace: {event:?}");
    match event {
        TraceEvent::Start => deck.on_gesture_start(),
        TraceEvent::Move(raw) => match raw.into_sample() {
            Some(sample) => {
                if let Some(d) = deck.on_gesture_sample(sample) {
                    return Some(ReplayRecord::Capture {
                        ownership: d.ownership,
                        swiped_horizontally: d.assume_horizontal,
                    });
                }
            }
            None => debug!("trace: degenerate move sample dropped"),
        },
        TraceEvent::Release { sample } => {
            deck.on_gesture_end(sample.and_then(RawSample::into_sample));
        }
        TraceEvent::Terminate { sample } => {
            deck.on_gesture_terminate(sample.and_then(RawSample::into_sample));
        }
        TraceEvent::Scroll { offset } => deck.on_scroll(offset),
        TraceEvent::Settle => deck.on_scroll_settled(),
        TraceEvent::Dismiss { progress } => deck.set_dismiss_progress(progress),
        TraceEvent::Focus { index } => deck.on_focused_index_changed(index),
        TraceEvent::Advance { ms } => {
            deck.advance(Duration::from_millis(ms));
        }
        TraceEvent::Frame => {
            return Some(ReplayRecord::Frame {
                offset: deck.offset(),
                cards: deck.frame(),
            });
        }
    }
    None
}

/// Runs a whole trace and returns everything the deck emitted, in order.
pub fn replay<R: BufRead>(reader: R, settings: DeckSettings) -> Result<Vec<ReplayRecord>, TraceError> {
    let mut deck = DeckController::new(settings, ReplayLog::default());
    let mut out = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(event) = parse_line(&line, i + 1)? else {
            continue;
        };
        let extra = apply(&mut deck, event);
        out.append(&mut deck.listener_mut().records);
        out.extend(extra);
    }
    Ok(out)
}
