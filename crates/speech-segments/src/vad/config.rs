use super::error::{VadError, VadResult};
use super::result::VadThresholds;
use serde::{Deserialize, Serialize};

/// Trailing samples carried into the next frame at 16 kHz.
pub const CONTEXT_SAMPLES_16K: usize = 64;
/// Trailing samples carried into the next frame at 8 kHz.
pub const CONTEXT_SAMPLES_8K: usize = 32;
/// Silence that makes a boundary usable as a forced split point.
pub const MIN_SILENCE_AT_MAX_SPEECH_MS: u32 = 98;

/// Configuration for a VAD engine.
#[derive(Debug, Clone)]
pub struct VadConfig {
    pub sample_rate: u32,
}

impl VadConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn validate(&self) -> VadResult<()> {
        if self.sample_rate != 8_000 && self.sample_rate != 16_000 {
            return Err(VadError::UnsupportedSampleRate(self.sample_rate));
        }
        Ok(())
    }

    pub fn context_samples(&self) -> usize {
        if self.sample_rate == 8_000 {
            CONTEXT_SAMPLES_8K
        } else {
            CONTEXT_SAMPLES_16K
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
        }
    }
}

/// User-facing segmentation settings, expressed in milliseconds and seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub window_ms: u32,
    pub threshold: f32,
    pub min_silence_ms: u32,
    pub speech_pad_ms: u32,
    pub min_speech_ms: u32,
    /// `None` (or an infinite value) leaves segment length unbounded.
    pub max_speech_s: Option<f32>,
}

impl SegmenterConfig {
    pub fn with_window_ms(mut self, ms: u32) -> Self {
        self.window_ms = ms;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_silence_ms(mut self, ms: u32) -> Self {
        self.min_silence_ms = ms;
        self
    }

    pub fn with_speech_pad_ms(mut self, ms: u32) -> Self {
        self.speech_pad_ms = ms;
        self
    }

    pub fn with_min_speech_ms(mut self, ms: u32) -> Self {
        self.min_speech_ms = ms;
        self
    }

    pub fn with_max_speech_s(mut self, seconds: f32) -> Self {
        self.max_speech_s = Some(seconds);
        self
    }

    pub fn without_max_speech(mut self) -> Self {
        self.max_speech_s = None;
        self
    }

    /// Convert the millisecond settings into sample counts for `sample_rate`.
    ///
    /// All configuration errors surface here, so a segmenter never fails on
    /// a bad setting once it has been constructed.
    pub fn resolve(&self, sample_rate: u32) -> VadResult<SegmenterParams> {
        let vad_config = VadConfig::new(sample_rate);
        vad_config.validate()?;

        if self.window_ms == 0 {
            return Err(VadError::InvalidConfig(
                "window_ms must be greater than zero".to_string(),
            ));
        }
        if self.min_speech_ms == 0 {
            return Err(VadError::InvalidConfig(
                "min_speech_ms must be greater than zero".to_string(),
            ));
        }
        if self.min_silence_ms == 0 {
            return Err(VadError::InvalidConfig(
                "min_silence_ms must be greater than zero".to_string(),
            ));
        }
        if self.speech_pad_ms == 0 {
            return Err(VadError::InvalidConfig(
                "speech_pad_ms must be greater than zero".to_string(),
            ));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(VadError::InvalidConfig(format!(
                "threshold must be within (0, 1), got {}",
                self.threshold
            )));
        }

        let sr_per_ms = (sample_rate / 1000) as usize;
        let frame_samples = self.window_ms as usize * sr_per_ms;
        if frame_samples == 0 {
            return Err(VadError::InvalidConfig(format!(
                "window of {} ms resolves to zero samples at {} Hz",
                self.window_ms, sample_rate
            )));
        }
        let speech_pad_samples = sr_per_ms * self.speech_pad_ms as usize;

        let max_speech_samples = match self.max_speech_s {
            Some(seconds) if seconds.is_nan() || seconds <= 0.0 => {
                return Err(VadError::InvalidConfig(format!(
                    "max_speech_s must be positive, got {seconds}"
                )));
            }
            Some(seconds) if seconds.is_finite() => {
                let samples = sample_rate as f32 * seconds
                    - frame_samples as f32
                    - 2.0 * speech_pad_samples as f32;
                if samples <= 0.0 {
                    return Err(VadError::InvalidConfig(format!(
                        "max_speech_s of {seconds} s leaves no room after the frame and padding"
                    )));
                }
                Some(samples)
            }
            _ => None,
        };

        Ok(SegmenterParams {
            sample_rate,
            frame_samples,
            context_samples: vad_config.context_samples(),
            thresholds: VadThresholds::from_speech(self.threshold),
            min_speech_samples: (sr_per_ms * self.min_speech_ms as usize) as u64,
            min_silence_samples: (sr_per_ms * self.min_silence_ms as usize) as u64,
            min_silence_samples_at_max_speech: (sr_per_ms
                * MIN_SILENCE_AT_MAX_SPEECH_MS as usize)
                as u64,
            speech_pad_samples: speech_pad_samples as u64,
            max_speech_samples,
        })
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            window_ms: 32,
            threshold: 0.5,
            min_silence_ms: 100,
            speech_pad_ms: 30,
            min_speech_ms: 250,
            max_speech_s: None,
        }
    }
}

/// Sample-domain parameters derived once from a [`SegmenterConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterParams {
    pub sample_rate: u32,
    pub frame_samples: usize,
    pub context_samples: usize,
    pub thresholds: VadThresholds,
    pub min_speech_samples: u64,
    pub min_silence_samples: u64,
    pub min_silence_samples_at_max_speech: u64,
    pub speech_pad_samples: u64,
    pub max_speech_samples: Option<f32>,
}

impl SegmenterParams {
    /// Whether a segment that has run for `elapsed` samples must be split.
    pub fn exceeds_max_speech(&self, elapsed: u64) -> bool {
        match self.max_speech_samples {
            Some(max) => elapsed as f32 > max,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_sample_rate() {
        let config = VadConfig::new(22_050);
        let err = config.validate().unwrap_err();
        match err {
            VadError::UnsupportedSampleRate(rate) => assert_eq!(rate, 22_050),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_sample_rate() {
        let config = VadConfig::new(16_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn context_is_smaller_at_8k() {
        assert_eq!(VadConfig::new(8_000).context_samples(), 32);
        assert_eq!(VadConfig::new(16_000).context_samples(), 64);
    }

    #[test]
    fn resolves_default_config_at_16k() {
        let params = SegmenterConfig::default().resolve(16_000).unwrap();
        assert_eq!(params.frame_samples, 512);
        assert_eq!(params.context_samples, 64);
        assert_eq!(params.min_silence_samples, 1_600);
        assert_eq!(params.min_speech_samples, 4_000);
        assert_eq!(params.speech_pad_samples, 480);
        assert_eq!(params.min_silence_samples_at_max_speech, 1_568);
        assert_eq!(params.max_speech_samples, None);
        assert_eq!(params.thresholds.speech, 0.5);
        assert!((params.thresholds.silence - 0.35).abs() < 1e-6);
    }

    #[test]
    fn resolves_window_at_8k() {
        let params = SegmenterConfig::default().resolve(8_000).unwrap();
        assert_eq!(params.frame_samples, 256);
        assert_eq!(params.context_samples, 32);
    }

    #[test]
    fn max_speech_subtracts_frame_and_padding() {
        let params = SegmenterConfig::default()
            .with_max_speech_s(10.0)
            .resolve(16_000)
            .unwrap();
        assert_eq!(params.max_speech_samples, Some(160_000.0 - 512.0 - 960.0));
        assert!(!params.exceeds_max_speech(158_528));
        assert!(params.exceeds_max_speech(158_529));
    }

    #[test]
    fn infinite_max_speech_is_unbounded() {
        let params = SegmenterConfig::default()
            .with_max_speech_s(f32::INFINITY)
            .resolve(16_000)
            .unwrap();
        assert_eq!(params.max_speech_samples, None);
        assert!(!params.exceeds_max_speech(u64::MAX));
    }

    #[test]
    fn rejects_zero_window() {
        let err = SegmenterConfig::default()
            .with_window_ms(0)
            .resolve(16_000)
            .unwrap_err();
        assert!(matches!(err, VadError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        for threshold in [0.0, 1.0, -0.2, f32::NAN] {
            let err = SegmenterConfig::default()
                .with_threshold(threshold)
                .resolve(16_000)
                .unwrap_err();
            assert!(matches!(err, VadError::InvalidConfig(_)));
        }
    }

    #[test]
    fn rejects_non_positive_durations() {
        let zero_speech = SegmenterConfig::default().with_min_speech_ms(0);
        let zero_silence = SegmenterConfig::default().with_min_silence_ms(0);
        let zero_pad = SegmenterConfig::default().with_speech_pad_ms(0);
        let negative_max = SegmenterConfig::default().with_max_speech_s(-1.0);
        let tiny_max = SegmenterConfig::default().with_max_speech_s(0.01);

        for config in [zero_speech, zero_silence, zero_pad, negative_max, tiny_max] {
            assert!(matches!(
                config.resolve(16_000),
                Err(VadError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn loads_partial_config_from_toml() {
        let config: SegmenterConfig = toml::from_str(
            r#"
threshold = 0.6
min_silence_ms = 300
max_speech_s = 15.0
"#,
        )
        .unwrap();

        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.min_silence_ms, 300);
        assert_eq!(config.max_speech_s, Some(15.0));
        assert_eq!(config.window_ms, 32);
        assert_eq!(config.min_speech_ms, 250);
    }
}
