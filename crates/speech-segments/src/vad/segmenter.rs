use super::VadEngine;
use super::config::{SegmenterConfig, SegmenterParams};
use super::error::{VadError, VadResult};
use super::scorer::FrameScorer;
use super::state::SegmentState;
use crate::AudioData;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentEndReason {
    Silence,
    MaxDuration,
    EndOfStream,
}

/// A closed `[start, end)` interval of speech, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub start: u64,
    pub end: u64,
    pub reason: SegmentEndReason,
}

impl SpeechSegment {
    pub fn duration_samples(&self) -> u64 {
        self.end - self.start
    }

    pub fn start_seconds(&self, sample_rate: u32) -> f32 {
        self.start as f32 / sample_rate as f32
    }

    pub fn end_seconds(&self, sample_rate: u32) -> f32 {
        self.end as f32 / sample_rate as f32
    }

    /// Start and end in seconds, rounded to a tenth for display.
    pub fn rounded_seconds(&self, sample_rate: u32) -> (f32, f32) {
        (
            round_tenths(self.start_seconds(sample_rate)),
            round_tenths(self.end_seconds(sample_rate)),
        )
    }
}

fn round_tenths(seconds: f32) -> f32 {
    (seconds * 10.0).round_ties_even() / 10.0
}

/// Streaming speech segmenter.
///
/// Slices audio into non-overlapping frames, scores each one through a
/// [`FrameScorer`] and folds the probabilities into a [`SegmentState`].
/// One instance handles one stream at a time.
pub struct SpeechSegmenter<E: VadEngine> {
    scorer: FrameScorer<E>,
    params: SegmenterParams,
    state: SegmentState,
    current_sample: u64,
    pending_samples: Vec<f32>,
    speeches: Vec<SpeechSegment>,
}

impl<E: VadEngine> SpeechSegmenter<E> {
    pub fn new(vad: E, config: SegmenterConfig) -> VadResult<Self> {
        let params = config.resolve(vad.sample_rate())?;
        Ok(Self::with_params(vad, params))
    }

    fn with_params(vad: E, params: SegmenterParams) -> Self {
        let mut scorer = FrameScorer::new(vad, params.context_samples, params.frame_samples);
        scorer.reset();

        Self {
            scorer,
            params,
            state: SegmentState::Idle,
            current_sample: 0,
            pending_samples: Vec::new(),
            speeches: Vec::new(),
        }
    }

    pub fn params(&self) -> &SegmenterParams {
        &self.params
    }

    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    pub fn frame_samples(&self) -> usize {
        self.params.frame_samples
    }

    pub fn engine(&self) -> &E {
        self.scorer.engine()
    }

    /// Returns true while a speech region is open.
    pub fn in_speech(&self) -> bool {
        self.state.is_triggered()
    }

    /// Samples scored so far in the current run.
    pub fn current_sample(&self) -> u64 {
        self.current_sample
    }

    /// Segments closed so far in the current run, in chronological order.
    pub fn speeches(&self) -> &[SpeechSegment] {
        &self.speeches
    }

    /// Start a new run: clears segments, logic state and scorer context.
    pub fn reset(&mut self) {
        self.scorer.reset();
        self.state = SegmentState::Idle;
        self.current_sample = 0;
        self.pending_samples.clear();
        self.speeches.clear();
        log::debug!("segmenter reset");
    }

    /// Segment a complete buffer from scratch.
    ///
    /// Trailing samples that do not fill a frame are never scored, but a
    /// region still open at the end is closed at `samples.len()`.
    pub fn process(&mut self, samples: &[f32]) -> VadResult<Vec<SpeechSegment>> {
        self.reset();

        let frames = samples.chunks_exact(self.params.frame_samples);
        let remainder = frames.remainder().len();
        for frame in frames {
            self.push_frame(frame)?;
        }
        if remainder > 0 {
            log::debug!("{remainder} trailing samples shorter than a frame were not scored");
        }

        self.finish(samples.len() as u64);
        Ok(self.speeches.clone())
    }

    /// Segment mono audio, checking it matches the engine's sample rate.
    pub fn process_audio(&mut self, audio: &AudioData) -> VadResult<Vec<SpeechSegment>> {
        if audio.sample_rate != self.params.sample_rate {
            return Err(VadError::InvalidInput(format!(
                "expected {} Hz audio, got {} Hz",
                self.params.sample_rate, audio.sample_rate
            )));
        }
        if audio.channels != 1 {
            return Err(VadError::InvalidInput(format!(
                "expected mono audio, got {} channels",
                audio.channels
            )));
        }

        self.process(&audio.samples)
    }

    /// Score exactly one frame and return the segment it closed, if any.
    pub fn push_frame(&mut self, frame: &[f32]) -> VadResult<Option<SpeechSegment>> {
        let output = self.scorer.advance(frame)?;
        self.current_sample += self.params.frame_samples as u64;

        log::trace!(
            "frame at {} samples: probability {:.3}",
            self.current_sample - self.params.frame_samples as u64,
            output.probability
        );

        let (state, segment) = self.state.next(output, self.current_sample, &self.params);
        self.state = state;

        if let Some(segment) = segment {
            self.record(segment);
        }
        Ok(segment)
    }

    /// Buffer arbitrary-length input and score every complete frame.
    pub fn process_samples(&mut self, samples: &[f32]) -> VadResult<Vec<SpeechSegment>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        self.pending_samples.extend_from_slice(samples);
        let frame_samples = self.params.frame_samples;
        let mut segments = Vec::new();

        // Taken so frames can borrow it while `push_frame` borrows `self`.
        let mut pending = std::mem::take(&mut self.pending_samples);
        let mut consumed = 0;
        let mut scored = Ok(());
        for frame in pending.chunks_exact(frame_samples) {
            scored = self
                .push_frame(frame)
                .map(|segment| segments.extend(segment));
            if scored.is_err() {
                break;
            }
            consumed += frame_samples;
        }
        pending.drain(..consumed);
        self.pending_samples = pending;
        scored?;

        Ok(segments)
    }

    /// Close any open region at the number of samples received and start a
    /// new run.
    pub fn finalize(&mut self) -> Option<SpeechSegment> {
        let total = self.current_sample + self.pending_samples.len() as u64;
        let segment = self.finish(total);
        self.reset();
        segment
    }

    fn finish(&mut self, total_samples: u64) -> Option<SpeechSegment> {
        let segment = std::mem::take(&mut self.state).finish(total_samples);
        if let Some(segment) = segment {
            self.record(segment);
        }
        segment
    }

    fn record(&mut self, segment: SpeechSegment) {
        log::debug!(
            "speech segment {}..{} ({:?})",
            segment.start,
            segment.end,
            segment.reason
        );
        self.speeches.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::VadOutput;
    use crate::vad::scorer::ScriptedVad;

    /// Scores each frame by its mean absolute amplitude.
    struct MockVad {
        sample_rate: u32,
        threshold: f32,
    }

    impl MockVad {
        fn new(sample_rate: u32, threshold: f32) -> Self {
            Self {
                sample_rate,
                threshold,
            }
        }
    }

    impl VadEngine for MockVad {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn reset(&mut self) {}

        fn compute(&mut self, samples: &[f32]) -> VadResult<VadOutput> {
            let avg = samples.iter().map(|v| v.abs()).sum::<f32>() / samples.len() as f32;
            let prob = if avg >= self.threshold { 0.9 } else { 0.1 };
            Ok(VadOutput::new(prob))
        }
    }

    fn short_config() -> SegmenterConfig {
        SegmenterConfig::default()
            .with_min_silence_ms(32)
            .with_min_speech_ms(100)
    }

    #[test]
    fn segments_speech_from_silence() {
        let vad = MockVad::new(16_000, 0.2);
        let mut segmenter = SpeechSegmenter::new(vad, short_config()).unwrap();
        let frame = segmenter.frame_samples();

        let mut samples = vec![0.0; frame * 2];
        samples.extend(vec![0.8; frame * 4]);
        samples.extend(vec![0.0; frame * 3]);

        let segments = segmenter.process(&samples).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 1_024);
        assert_eq!(segments[0].reason, SegmentEndReason::Silence);
        assert!(!segmenter.in_speech());
    }

    #[test]
    fn rejects_unsupported_engine_rate() {
        let vad = MockVad::new(44_100, 0.2);
        let err = SpeechSegmenter::new(vad, SegmenterConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, VadError::UnsupportedSampleRate(44_100)));
    }

    #[test]
    fn streaming_matches_whole_buffer() {
        let probabilities = vec![0.1, 0.9, 0.9, 0.9, 0.9, 0.1, 0.1, 0.1, 0.9, 0.9];
        let samples = vec![0.0; 512 * probabilities.len() + 100];

        let mut whole =
            SpeechSegmenter::new(ScriptedVad::new(16_000, probabilities.clone()), short_config())
                .unwrap();
        let expected = whole.process(&samples).unwrap();

        let mut streaming =
            SpeechSegmenter::new(ScriptedVad::new(16_000, probabilities), short_config()).unwrap();
        let mut segments = Vec::new();
        for chunk in samples.chunks(300) {
            segments.extend(streaming.process_samples(chunk).unwrap());
        }
        segments.extend(streaming.finalize());

        assert_eq!(segments, expected);
        assert_eq!(expected.len(), 2);
        assert_eq!(expected[1].end, samples.len() as u64);
        assert_eq!(expected[1].reason, SegmentEndReason::EndOfStream);
    }

    #[test]
    fn finalize_without_open_region_returns_none() {
        let mut segmenter =
            SpeechSegmenter::new(ScriptedVad::new(16_000, vec![0.1, 0.1]), short_config()).unwrap();
        segmenter.process_samples(&[0.0; 1_024]).unwrap();
        assert_eq!(segmenter.finalize(), None);
        assert_eq!(segmenter.current_sample(), 0);
    }

    #[test]
    fn push_frame_reports_closed_segment() {
        let probabilities = vec![0.9, 0.9, 0.9, 0.9, 0.1, 0.1];
        let mut segmenter =
            SpeechSegmenter::new(ScriptedVad::new(16_000, probabilities), short_config()).unwrap();
        let frame = vec![0.0; segmenter.frame_samples()];

        let closed: Vec<_> = (0..6)
            .filter_map(|_| segmenter.push_frame(&frame).unwrap())
            .collect();

        assert_eq!(
            closed,
            vec![SpeechSegment {
                start: 0,
                end: 2_560,
                reason: SegmentEndReason::Silence,
            }]
        );
        assert_eq!(segmenter.speeches(), closed.as_slice());
    }

    #[test]
    fn process_audio_rejects_stereo() {
        let mut segmenter =
            SpeechSegmenter::new(ScriptedVad::new(16_000, Vec::new()), short_config()).unwrap();
        let audio = AudioData::new(vec![0.0; 2_048], 2, 16_000);
        assert!(matches!(
            segmenter.process_audio(&audio),
            Err(VadError::InvalidInput(_))
        ));
    }

    #[test]
    fn segment_serializes_reason_in_snake_case() {
        let segment = SpeechSegment {
            start: 0,
            end: 2_560,
            reason: SegmentEndReason::MaxDuration,
        };
        let json = serde_json::to_string(&segment).unwrap();
        assert_eq!(json, r#"{"start":0,"end":2560,"reason":"max_duration"}"#);

        let parsed: SpeechSegment =
            serde_json::from_str(r#"{"start":512,"end":4096,"reason":"end_of_stream"}"#).unwrap();
        assert_eq!(
            parsed,
            SpeechSegment {
                start: 512,
                end: 4_096,
                reason: SegmentEndReason::EndOfStream,
            }
        );
    }

    #[test]
    fn streaming_keeps_partial_frame_for_next_call() {
        let mut segmenter =
            SpeechSegmenter::new(ScriptedVad::new(16_000, vec![0.1; 4]), short_config()).unwrap();

        segmenter.process_samples(&[0.0; 700]).unwrap();
        assert_eq!(segmenter.current_sample(), 512);
        assert_eq!(segmenter.engine().frames_scored(), 1);

        segmenter.process_samples(&[0.0; 400]).unwrap();
        assert_eq!(segmenter.current_sample(), 1_024);
        assert_eq!(segmenter.engine().frames_scored(), 2);
    }

    #[test]
    fn rounds_seconds_to_tenths() {
        let segment = SpeechSegment {
            start: 4_000,
            end: 40_000,
            reason: SegmentEndReason::Silence,
        };
        // 0.25 s sits on a tie and rounds to even.
        assert_eq!(segment.rounded_seconds(16_000), (0.2, 2.5));
        assert_eq!(segment.duration_samples(), 36_000);
    }
}
