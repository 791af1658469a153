//! Snapshot export of the compose screen.
//!
//! The capture is an injected capability: whoever owns the screen attaches a
//! [`SnapshotSource`] to a [`CaptureTrigger`] and hands the trigger to the
//! component that fires it. While the snapshot is taken the text placeholder
//! is cleared so it does not end up in the image.

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PLACEHOLDER: &str = "Tap to Type";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("nothing to capture: view is not mounted")]
    NotMounted,
    #[error("snapshot failed: {0}")]
    Snapshot(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotOptions {
    pub format: ImageFormat,
    pub quality: f32,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: 0.9,
        }
    }
}

/// Encoded image, typically a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(pub String);

pub trait SnapshotSource {
    fn take_snapshot(&mut self, options: &SnapshotOptions) -> Result<Snapshot, CaptureError>;
}

pub trait AlertSink {
    fn alert(&mut self, message: &str);
}

/// Logs the alert; for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&mut self, message: &str) {
        warn!("capture: {message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    text: String,
    default: String,
}

impl Default for Placeholder {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl Placeholder {
    pub fn new(default: &str) -> Self {
        Self {
            text: default.to_string(),
            default: default.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Clears the text until the returned guard is dropped.
    pub fn clear_for_capture(&mut self) -> PlaceholderOverride<'_> {
        self.text.clear();
        PlaceholderOverride { placeholder: self }
    }
}

/// Restores the default placeholder text on drop.
#[derive(Debug)]
pub struct PlaceholderOverride<'a> {
    placeholder: &'a mut Placeholder,
}

impl PlaceholderOverride<'_> {
    pub fn text(&self) -> &str {
        &self.placeholder.text
    }
}

impl Drop for PlaceholderOverride<'_> {
    fn drop(&mut self) {
        self.placeholder.text = self.placeholder.default.clone();
    }
}

#[derive(Debug)]
pub struct CaptureTrigger<S: SnapshotSource> {
    source: Option<S>,
    options: SnapshotOptions,
}

impl<S: SnapshotSource> CaptureTrigger<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            options: SnapshotOptions::default(),
        }
    }

    pub fn detached() -> Self {
        Self {
            source: None,
            options: SnapshotOptions::default(),
        }
    }

    pub fn attach(&mut self, source: S) {
        self.source = Some(source);
    }

    pub fn detach(&mut self) -> Option<S> {
        self.source.take()
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    /// Takes a snapshot and passes it to `on_image`. Failures go to
    /// `alerts`; the placeholder is restored either way. Returns whether an
    /// image was produced.
    pub fn capture<A, F>(&mut self, placeholder: &mut Placeholder, alerts: &mut A, on_image: F) -> bool
    where
        A: AlertSink + ?Sized,
        F: FnOnce(Snapshot),
    {
        let Some(source) = self.source.as_mut() else {
            info!("capture: no view attached, skipping");
            return false;
        };

        let _guard = placeholder.clear_for_capture();
        match source.take_snapshot(&self.options) {
            Ok(image) => {
                info!("capture: snapshot taken ({} bytes)", image.0.len());
                on_image(image);
                true
            }
            Err(e) => {
                alerts.alert(&e.to_string());
                false
            }
        }
    }
}
