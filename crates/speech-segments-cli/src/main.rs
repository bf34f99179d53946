use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use speech_segments::vad::{ScriptedVad, SegmenterConfig, SpeechSegment, SpeechSegmenter};
use speech_segments::{AudioData, write_segment};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "speech-segments")]
#[command(about = "Speech segments - Detect speech regions in audio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect speech in a WAV file with the Silero VAD model
    Detect(DetectArgs),
    /// Segment a recorded trace of per-frame speech probabilities
    Replay {
        /// Text file with one probability per line
        #[arg(short, long)]
        probabilities: PathBuf,

        /// Sample rate the probabilities were scored at (8000 or 16000)
        #[arg(short, long, default_value = "16000")]
        sample_rate: u32,

        #[command(flatten)]
        segmenter: SegmenterArgs,

        /// Print segments as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
#[cfg_attr(not(feature = "silero"), allow(dead_code))]
struct DetectArgs {
    /// Path to the input WAV file (8 or 16 kHz)
    #[arg(short, long)]
    input: PathBuf,

    /// Local Silero ONNX model (conflicts with --hf-repo)
    #[arg(short, long, conflicts_with = "hf_repo")]
    model: Option<PathBuf>,

    /// HuggingFace repository to fetch the model from
    #[arg(long)]
    hf_repo: Option<String>,

    /// Model file inside the HuggingFace repository
    #[arg(long)]
    hf_file: Option<String>,

    /// HuggingFace revision (branch, tag, or commit)
    #[arg(long)]
    hf_revision: Option<String>,

    #[command(flatten)]
    segmenter: SegmenterArgs,

    /// Write every segment to <dir>/segment_<i>.wav
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print segments as JSON
    #[arg(long)]
    json: bool,
}

/// Segmentation settings, layered over the defaults and an optional file.
#[derive(Args, Debug, Default)]
struct SegmenterArgs {
    /// TOML file with segmentation settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Speech probability threshold
    #[arg(long)]
    threshold: Option<f32>,

    /// Frame length in milliseconds
    #[arg(long)]
    window_ms: Option<u32>,

    /// Silence required to close a segment
    #[arg(long)]
    min_silence_ms: Option<u32>,

    /// Speech required before silence may close a segment
    #[arg(long)]
    min_speech_ms: Option<u32>,

    /// Padding subtracted from the maximum segment length
    #[arg(long)]
    speech_pad_ms: Option<u32>,

    /// Maximum segment length in seconds
    #[arg(long)]
    max_speech_s: Option<f32>,
}

impl SegmenterArgs {
    fn to_config(&self) -> Result<SegmenterConfig> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("Loading segmenter settings from {}", path.display());
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("Invalid settings in {}", path.display()))?
            }
            None => SegmenterConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config = config.with_threshold(threshold);
        }
        if let Some(ms) = self.window_ms {
            config = config.with_window_ms(ms);
        }
        if let Some(ms) = self.min_silence_ms {
            config = config.with_min_silence_ms(ms);
        }
        if let Some(ms) = self.min_speech_ms {
            config = config.with_min_speech_ms(ms);
        }
        if let Some(ms) = self.speech_pad_ms {
            config = config.with_speech_pad_ms(ms);
        }
        if let Some(seconds) = self.max_speech_s {
            config = config.with_max_speech_s(seconds);
        }

        Ok(config)
    }
}

#[derive(Serialize)]
struct SegmentReport {
    start: u64,
    end: u64,
    start_seconds: f32,
    end_seconds: f32,
    reason: speech_segments::SegmentEndReason,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => detect(args)?,
        Commands::Replay {
            probabilities,
            sample_rate,
            segmenter,
            json,
        } => replay(&probabilities, sample_rate, &segmenter, json)?,
    }

    Ok(())
}

#[cfg(feature = "silero")]
fn detect(args: DetectArgs) -> Result<()> {
    use speech_segments::model_source::{SILERO_HF_FILE, SILERO_HF_REPO};
    use speech_segments::vad::{SileroVad, VadConfig};
    use speech_segments::{ModelSource, read_wav};

    log::info!("Loading WAV file: {}", args.input.display());
    let audio = read_wav(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let vad_config = VadConfig::new(audio.sample_rate);
    vad_config
        .validate()
        .context("Input must be sampled at 8000 or 16000 Hz")?;

    let source = match (&args.model, &args.hf_repo) {
        (Some(path), _) => ModelSource::from_file(path),
        (None, repo) => ModelSource::from_hf(
            repo.as_deref().unwrap_or(SILERO_HF_REPO),
            args.hf_file.as_deref().unwrap_or(SILERO_HF_FILE),
        ),
    };
    let source = match &args.hf_revision {
        Some(revision) => source.with_revision(revision),
        None => source,
    };

    log::info!("Initializing VAD with model: {:?}", source);
    let engine = SileroVad::new(source, vad_config).context("Failed to initialize VAD")?;
    let mut segmenter = SpeechSegmenter::new(engine, args.segmenter.to_config()?)?;

    let mono = audio.to_mono();
    log::info!("Processing {} samples...", mono.samples.len());
    let segments = segmenter.process_audio(&mono)?;

    print_segments(&segments, audio.sample_rate, args.json)?;

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let saved = export_segments(&audio, &segments, dir);
        log::info!("Saved {saved} of {} segments", segments.len());
    }

    Ok(())
}

#[cfg(not(feature = "silero"))]
fn detect(_args: DetectArgs) -> Result<()> {
    anyhow::bail!("speech-segments was built without the `silero` feature; use `replay` instead")
}

/// Write each segment as a WAV file. A segment that fails to write is
/// skipped and does not consume an index.
#[cfg_attr(not(feature = "silero"), allow(dead_code))]
fn export_segments(audio: &AudioData, segments: &[SpeechSegment], dir: &Path) -> usize {
    let mut saved = 0;
    for segment in segments {
        match write_segment(audio, segment, saved, dir) {
            Ok(path) => {
                log::info!("Saved segment to {}", path.display());
                saved += 1;
            }
            Err(err) => log::warn!(
                "Skipping segment {}..{}: {err}",
                segment.start,
                segment.end
            ),
        }
    }
    saved
}

fn replay(path: &Path, sample_rate: u32, args: &SegmenterArgs, json: bool) -> Result<()> {
    log::info!("Loading probabilities from {}", path.display());
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let probabilities = parse_probabilities(&text)?;
    let frames = probabilities.len();

    let engine = ScriptedVad::new(sample_rate, probabilities);
    let mut segmenter = SpeechSegmenter::new(engine, args.to_config()?)?;
    let samples = vec![0.0; frames * segmenter.frame_samples()];

    log::info!("Replaying {} frames", frames);
    let segments = segmenter.process(&samples)?;
    print_segments(&segments, sample_rate, json)
}

/// One probability per line; blank lines and `#` comments are skipped.
fn parse_probabilities(text: &str) -> Result<Vec<f32>> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then_some((index + 1, line))
        })
        .map(|(line_number, line)| {
            line.parse::<f32>()
                .with_context(|| format!("Line {line_number}: invalid probability '{line}'"))
        })
        .collect()
}

fn describe(segment: &SpeechSegment, sample_rate: u32) -> String {
    let (start, end) = segment.rounded_seconds(sample_rate);
    format!("Speech detected from {start:.1} s to {end:.1} s")
}

fn reports(segments: &[SpeechSegment], sample_rate: u32) -> Vec<SegmentReport> {
    segments
        .iter()
        .map(|segment| SegmentReport {
            start: segment.start,
            end: segment.end,
            start_seconds: segment.start_seconds(sample_rate),
            end_seconds: segment.end_seconds(sample_rate),
            reason: segment.reason,
        })
        .collect()
}

fn print_segments(segments: &[SpeechSegment], sample_rate: u32, json: bool) -> Result<()> {
    if json {
        let reports = reports(segments, sample_rate);
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if segments.is_empty() {
        log::info!("No speech detected");
    }
    for segment in segments {
        println!("{}", describe(segment, sample_rate));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use speech_segments::SegmentEndReason;
    use std::io::Write;

    #[test]
    fn parses_probabilities_skipping_comments_and_blanks() {
        let text = "# recorded trace\n0.1\n\n  0.9  # onset\n0.25\n";
        assert_eq!(parse_probabilities(text).unwrap(), vec![0.1, 0.9, 0.25]);
    }

    #[test]
    fn reports_line_of_bad_probability() {
        let err = parse_probabilities("0.1\nloud\n").unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threshold = 0.7\nmin_silence_ms = 200").unwrap();

        let args = SegmenterArgs {
            config: Some(file.path().to_path_buf()),
            min_silence_ms: Some(64),
            max_speech_s: Some(10.0),
            ..Default::default()
        };
        let config = args.to_config().unwrap();

        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.min_silence_ms, 64);
        assert_eq!(config.max_speech_s, Some(10.0));
        assert_eq!(config.window_ms, SegmenterConfig::default().window_ms);
    }

    #[test]
    fn no_flags_means_defaults() {
        let config = SegmenterArgs::default().to_config().unwrap();
        assert_eq!(config, SegmenterConfig::default());
    }

    #[test]
    fn describes_segment_in_tenths_of_a_second() {
        let segment = SpeechSegment {
            start: 1_024,
            end: 40_000,
            reason: SegmentEndReason::Silence,
        };
        assert_eq!(
            describe(&segment, 16_000),
            "Speech detected from 0.1 s to 2.5 s"
        );
    }

    #[test]
    fn json_reports_carry_seconds_and_reason() {
        let segments = [
            SpeechSegment {
                start: 8_000,
                end: 24_000,
                reason: SegmentEndReason::MaxDuration,
            },
            SpeechSegment {
                start: 32_000,
                end: 40_000,
                reason: SegmentEndReason::EndOfStream,
            },
        ];

        let json = serde_json::to_value(reports(&segments, 16_000)).unwrap();

        assert_eq!(json[0]["start"], 8_000);
        assert_eq!(json[0]["start_seconds"], 0.5);
        assert_eq!(json[0]["end_seconds"], 1.5);
        assert_eq!(json[0]["reason"], "max_duration");
        assert_eq!(json[1]["end"], 40_000);
        assert_eq!(json[1]["end_seconds"], 2.5);
        assert_eq!(json[1]["reason"], "end_of_stream");
    }

    #[test]
    fn export_skips_failed_segments_without_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let audio = AudioData::new(vec![0.25; 1_000], 1, 8_000);
        let segments = [
            SpeechSegment {
                start: 0,
                end: 200,
                reason: SegmentEndReason::Silence,
            },
            SpeechSegment {
                start: 2_000,
                end: 2_500,
                reason: SegmentEndReason::Silence,
            },
            SpeechSegment {
                start: 400,
                end: 1_000,
                reason: SegmentEndReason::EndOfStream,
            },
        ];

        let saved = export_segments(&audio, &segments, dir.path());

        assert_eq!(saved, 2);
        let second = speech_segments::read_wav(dir.path().join("segment_1.wav")).unwrap();
        assert_eq!(second.frames(), 600);
        assert!(!dir.path().join("segment_2.wav").exists());
    }

    #[test]
    fn cli_parses_replay_flags() {
        let cli = Cli::try_parse_from([
            "speech-segments",
            "replay",
            "--probabilities",
            "trace.txt",
            "--sample-rate",
            "8000",
            "--min-speech-ms",
            "100",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Replay {
                sample_rate,
                segmenter,
                json,
                ..
            } => {
                assert_eq!(sample_rate, 8_000);
                assert_eq!(segmenter.min_speech_ms, Some(100));
                assert!(json);
            }
            Commands::Detect(_) => panic!("expected replay"),
        }
    }
}
