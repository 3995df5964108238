use std::sync::Arc;

use crate::{chunk::MediaChunk, manifest::Format};

/// Why a format was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    #[default]
    Unspecified,
    Initial,
    Manual,
    Adaptive,
    /// Evaluator specific reason.
    Custom(u32),
}

impl Trigger {
    const CUSTOM_BASE: u32 = 10000;

    pub fn code(&self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Initial => 1,
            Self::Manual => 2,
            Self::Adaptive => 3,
            Self::Custom(code) => Self::CUSTOM_BASE + code,
        }
    }
}

/// Result buffer of a [FormatEvaluator].
///
/// The chunk source owns a single instance and hands it to the evaluator on every poll, so an
/// evaluator can read its previous decision before overwriting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub format: Option<Format>,
    pub trigger: Trigger,
    /// Number of queued chunks to keep. Set to the current queue length before evaluation.
    pub queue_size: usize,
}

impl Evaluation {
    pub fn new() -> Self {
        Self {
            format: None,
            trigger: Trigger::Initial,
            queue_size: 0,
        }
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::new()
    }
}

/// Chooses the format of the next chunk.
pub trait FormatEvaluator: Send {
    fn enable(&mut self) {}

    fn disable(&mut self) {}

    /// `formats` is sorted by decreasing bitrate. `queue` holds the chunks already requested,
    /// oldest first.
    fn evaluate(
        &mut self,
        queue: &[Arc<MediaChunk>],
        playback_position_us: i64,
        formats: &[Format],
        evaluation: &mut Evaluation,
    );
}

/// Always selects the same format.
#[derive(Debug, Clone, Default)]
pub struct FixedEvaluator {
    index: usize,
}

impl FixedEvaluator {
    /// Selects the highest bitrate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `formats[index]`, falling back to the lowest bitrate when out of range.
    pub fn with_index(index: usize) -> Self {
        Self { index }
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

impl FormatEvaluator for FixedEvaluator {
    fn evaluate(
        &mut self,
        _queue: &[Arc<MediaChunk>],
        _playback_position_us: i64,
        formats: &[Format],
        evaluation: &mut Evaluation,
    ) {
        let format = formats.get(self.index).or(formats.last());
        if evaluation.format.as_ref() != format {
            evaluation.trigger = if evaluation.format.is_none() {
                Trigger::Initial
            } else {
                Trigger::Manual
            };
            evaluation.format = format.cloned();
        }
    }
}
