//! Hysteresis state machine that turns per-frame probabilities into segments.
//!
//! Every transition consumes the probability of one frame together with the
//! running sample count *after* that frame, and yields the next state plus at
//! most one closed segment.

use super::config::SegmenterParams;
use super::result::{VadOutput, VadStatus};
use super::segmenter::{SegmentEndReason, SpeechSegment};

/// Speech region that has been triggered but not yet closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSpeech {
    /// First sample of the region.
    pub start: u64,
    /// Sample where the current run of confident silence began.
    pub silence_start: Option<u64>,
    /// Silence boundary long enough to split an over-long region at.
    pub split_point: Option<u64>,
    /// Sample where speech resumed after `split_point` was recorded.
    pub resume_at: Option<u64>,
}

impl ActiveSpeech {
    fn new(start: u64) -> Self {
        Self {
            start,
            silence_start: None,
            split_point: None,
            resume_at: None,
        }
    }

    /// True while speech has not resumed since the recorded split point.
    fn awaiting_resume(&self) -> bool {
        self.resume_at.unwrap_or(0) < self.split_point.unwrap_or(0)
    }

    fn close(&self, end: u64, reason: SegmentEndReason) -> SpeechSegment {
        SpeechSegment {
            start: self.start,
            end,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SegmentState {
    #[default]
    Idle,
    Triggered(ActiveSpeech),
}

impl SegmentState {
    pub fn is_triggered(&self) -> bool {
        matches!(self, SegmentState::Triggered(_))
    }

    /// Start of the open region, if any.
    pub fn open_start(&self) -> Option<u64> {
        match self {
            SegmentState::Idle => None,
            SegmentState::Triggered(active) => Some(active.start),
        }
    }

    /// Fold one frame into the state.
    ///
    /// `current_sample` is the number of samples consumed including this
    /// frame, so the frame itself starts at `current_sample - frame_samples`.
    pub fn next(
        self,
        output: VadOutput,
        current_sample: u64,
        params: &SegmenterParams,
    ) -> (SegmentState, Option<SpeechSegment>) {
        let frame_start = current_sample - params.frame_samples as u64;
        let status = output.status(params.thresholds);

        let mut active = match (self, status) {
            (SegmentState::Idle, VadStatus::Speech) => {
                return (SegmentState::Triggered(ActiveSpeech::new(frame_start)), None);
            }
            (SegmentState::Idle, _) => return (SegmentState::Idle, None),
            (SegmentState::Triggered(active), _) => active,
        };

        if status == VadStatus::Speech {
            if active.silence_start.take().is_some() && active.awaiting_resume() {
                active.resume_at = Some(frame_start);
            }
            return (SegmentState::Triggered(active), None);
        }

        if params.exceeds_max_speech(current_sample - active.start) {
            return Self::force_split(active, current_sample);
        }

        if status == VadStatus::Unknown {
            return (SegmentState::Triggered(active), None);
        }

        let silence_start = *active.silence_start.get_or_insert(current_sample);
        let silence_len = current_sample - silence_start;

        if silence_len > params.min_silence_samples_at_max_speech {
            active.split_point = Some(silence_start);
        }

        if silence_len >= params.min_silence_samples
            && silence_start - active.start > params.min_speech_samples
        {
            let segment = active.close(silence_start, SegmentEndReason::Silence);
            return (SegmentState::Idle, Some(segment));
        }

        (SegmentState::Triggered(active), None)
    }

    /// Close an open region at the end of the stream.
    pub fn finish(self, total_samples: u64) -> Option<SpeechSegment> {
        match self {
            SegmentState::Idle => None,
            SegmentState::Triggered(active) => {
                Some(active.close(total_samples, SegmentEndReason::EndOfStream))
            }
        }
    }

    fn force_split(
        active: ActiveSpeech,
        current_sample: u64,
    ) -> (SegmentState, Option<SpeechSegment>) {
        let Some(split_point) = active.split_point else {
            let segment = active.close(current_sample, SegmentEndReason::MaxDuration);
            return (SegmentState::Idle, Some(segment));
        };

        let segment = active.close(split_point, SegmentEndReason::MaxDuration);
        if active.awaiting_resume() {
            return (SegmentState::Idle, Some(segment));
        }

        // Speech resumed after the split point; the remainder carries on.
        let resume_at = active.resume_at.unwrap_or(0);
        (
            SegmentState::Triggered(ActiveSpeech::new(resume_at)),
            Some(segment),
        )
    }
}
