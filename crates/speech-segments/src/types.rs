use serde::{Deserialize, Serialize};

/// On-disk sample encoding of a WAV file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SampleEncoding {
    /// Unsigned 8-bit PCM, offset-binary around 128.
    Pcm8,
    #[default]
    Pcm16,
    Pcm32,
    Float32,
}

impl SampleEncoding {
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            SampleEncoding::Pcm8 => 8,
            SampleEncoding::Pcm16 => 16,
            SampleEncoding::Pcm32 | SampleEncoding::Float32 => 32,
        }
    }
}

/// Audio data with normalized samples
#[derive(Clone, Debug, PartialEq)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Number of audio channels (typically 1 for mono)
    pub channels: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Encoding the samples were read from, and are written back as
    pub encoding: SampleEncoding,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            encoding: SampleEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: SampleEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Average all channels into a single one.
    pub fn to_mono(&self) -> AudioData {
        let samples = if self.channels > 1 {
            downmix_to_mono(&self.samples, self.channels)
        } else {
            self.samples.clone()
        };
        AudioData {
            samples,
            channels: 1,
            sample_rate: self.sample_rate,
            encoding: self.encoding,
        }
    }

    /// Copy the frames in `[start, end)`, clamping `end` to the audio length.
    pub fn slice_frames(&self, start: usize, end: usize) -> AudioData {
        let end = end.min(self.frames());
        let start = start.min(end);
        AudioData {
            samples: self.samples[start * self.channels..end * self.channels].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
            encoding: self.encoding,
        }
    }
}

fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    samples
        .chunks_exact(channels)
        .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmixes_interleaved_stereo() {
        let audio = AudioData::new(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, 16_000);
        let mono = audio.to_mono();

        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples, vec![0.5, 0.5, 0.0]);
        assert_eq!(mono.frames(), audio.frames());
    }

    #[test]
    fn slices_by_frame_and_clamps() {
        let audio = AudioData::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 2, 8_000);

        assert_eq!(audio.slice_frames(1, 2).samples, vec![2.0, 3.0]);
        assert_eq!(audio.slice_frames(2, 10).samples, vec![4.0, 5.0]);
        assert!(audio.slice_frames(5, 10).samples.is_empty());
    }

    #[test]
    fn reports_duration() {
        let audio = AudioData::new(vec![0.0; 32_000], 2, 16_000);
        assert_eq!(audio.frames(), 16_000);
        assert_eq!(audio.duration_secs(), 1.0);
    }
}
