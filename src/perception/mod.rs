//! Perception source abstraction
//!
//! The recognition collaborator produces one `PerceptionFrame` per tick.
//! Decision logic consumes frames through the `PerceptionSource` trait and
//! never branches on where they came from; live capture and recorded
//! replay are just two implementations selected by configuration.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::core::error::Result;

/// One discrete update of externally observed encounter state
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerceptionFrame {
    pub target_present: bool,
    /// None when the target's health bar is not readable this tick
    pub target_health_percent: Option<f32>,
    pub self_health_percent: f32,
    /// A cast is currently in progress
    pub cast_busy: bool,
    /// Age of the underlying capture when this frame was delivered
    pub perception_age_ms: u64,
}

impl PerceptionFrame {
    /// A fresh, quiet frame: full health, no target, nothing in flight
    pub fn quiet() -> Self {
        Self {
            target_present: false,
            target_health_percent: None,
            self_health_percent: 100.0,
            cast_busy: false,
            perception_age_ms: 0,
        }
    }
}

/// Per-tick frame supplier
pub trait PerceptionSource {
    /// Next frame, or None when the source is exhausted (replay ended,
    /// capture stopped)
    fn next_frame(&mut self) -> Option<PerceptionFrame>;
}

/// Replays a recorded frame trace, one frame per call
#[derive(Debug, Default)]
pub struct ReplaySource {
    frames: VecDeque<PerceptionFrame>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = PerceptionFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Load a JSON array of frames recorded by a previous session
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let frames: Vec<PerceptionFrame> = serde_json::from_str(&content)?;
        Ok(Self::new(frames))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PerceptionSource for ReplaySource {
    fn next_frame(&mut self) -> Option<PerceptionFrame> {
        self.frames.pop_front()
    }
}

/// Live frames delivered by the recognition collaborator over a channel
///
/// Non-blocking: if no fresh frame has arrived this tick, the last frame
/// is repeated with its age bumped by one tick so staleness detection
/// still fires.
pub struct ChannelSource {
    rx: tokio::sync::mpsc::Receiver<PerceptionFrame>,
    last: Option<PerceptionFrame>,
    tick_interval_ms: u64,
}

impl ChannelSource {
    pub fn new(rx: tokio::sync::mpsc::Receiver<PerceptionFrame>, tick_interval_ms: u64) -> Self {
        Self {
            rx,
            last: None,
            tick_interval_ms,
        }
    }
}

impl PerceptionSource for ChannelSource {
    fn next_frame(&mut self) -> Option<PerceptionFrame> {
        match self.rx.try_recv() {
            Ok(frame) => {
                self.last = Some(frame);
                Some(frame)
            }
            Err(tokio::sync::mpsc::error::TryRecvError::Empty) => {
                self.last.as_mut().map(|frame| {
                    frame.perception_age_ms += self.tick_interval_ms;
                    *frame
                })
            }
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected) => None,
        }
    }
}
