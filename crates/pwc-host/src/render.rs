//! Headless render loop
//!
//! Stands in for the audio graph: a dedicated audio thread delivers one
//! block per channel per cycle to the shared compressor, while the calling
//! thread polls meters the way a UI would.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use pwc_core::Sample;
use pwc_dsp::analysis::{GainReduction, GainReductionMeter, dbfs_to_linear};
use pwc_dsp::signals::SineConfig;
use pwc_dsp::{MeterSnapshot, SharedCompressor};

use crate::config::{HostConfig, SignalConfig, SignalKind};

/// Block-wise test signal generator
#[derive(Debug, Clone)]
pub struct SignalSource {
    kind: SignalKind,
    amplitude: f64,
    sine: SineConfig,
    /// Frames of signal before silence
    frames: usize,
    step_at: usize,
}

impl SignalSource {
    pub fn new(signal: &SignalConfig, sample_rate: u32, frames: usize) -> Self {
        let amplitude = dbfs_to_linear(signal.level_dbfs);
        Self {
            kind: signal.kind,
            amplitude,
            sine: SineConfig {
                frequency: signal.frequency,
                amplitude,
                phase: 0.0,
                sample_rate: sample_rate as f64,
            },
            frames,
            step_at: frames / 4,
        }
    }

    /// Frames before the signal runs out
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    fn sample_at(&self, index: usize) -> Sample {
        if index >= self.frames {
            return 0.0;
        }
        match self.kind {
            SignalKind::Sine => self.sine.sample_at(index, 0.0),
            SignalKind::Dc => self.amplitude as Sample,
            SignalKind::Step if index >= self.step_at => self.amplitude as Sample,
            SignalKind::Impulse if index == 0 => self.amplitude as Sample,
            _ => 0.0,
        }
    }

    /// Fill `out` with the frames starting at `start`
    pub fn fill(&self, start: usize, out: &mut [Sample]) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.sample_at(start + i);
        }
    }
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub frames: usize,
    pub meters: MeterSnapshot,
    /// Channel 0 over the signal portion; `None` without one
    pub gain_reduction: Option<GainReduction>,
}

/// Render the configured run on an audio thread, reporting meters until done.
pub fn run(config: &HostConfig) -> Result<RenderSummary> {
    config.validate().context("Invalid host configuration")?;

    let comp = Arc::new(
        SharedCompressor::with_params(
            config.sample_rate as f64,
            config.channels,
            config.compressor,
        )
        .context("Failed to create compressor")?,
    );

    let total_frames = config.total_frames();
    let source = SignalSource::new(&config.signal, config.sample_rate, config.signal_frames());
    log::info!(
        "Rendering {:.2} s ({} frames, {:?} signal for {} frames) in blocks of {}",
        config.duration_secs,
        total_frames,
        config.signal.kind,
        source.frames(),
        config.block_size
    );

    let audio = {
        let comp = Arc::clone(&comp);
        let config = config.clone();
        thread::Builder::new()
            .name("pwc-audio".into())
            .spawn(move || audio_thread(&comp, &config, &source, total_frames))
            .context("Failed to spawn audio thread")?
    };

    let interval = Duration::from_millis(config.meter_interval_ms.max(1));
    while !audio.is_finished() {
        thread::sleep(interval);
        log_meters(&comp.meters());
    }

    let measured = audio
        .join()
        .map_err(|_| anyhow!("audio thread panicked"))?;

    let meters = comp.meters();
    let gain_reduction = measured.result();

    log::info!("Done: {} blocks processed", meters.blocks);
    if let Some(gr) = &gain_reduction {
        log::info!(
            "Channel 0: input RMS {:.4}, output RMS {:.4}, gain reduction {:.2} dB",
            gr.input_rms,
            gr.output_rms,
            gr.reduction_db
        );
    }

    Ok(RenderSummary {
        frames: total_frames,
        meters,
        gain_reduction,
    })
}

fn audio_thread(
    comp: &SharedCompressor,
    config: &HostConfig,
    source: &SignalSource,
    total_frames: usize,
) -> GainReductionMeter {
    let block = config.block_size;
    let mut input = vec![0.0; block];
    let mut output = vec![0.0; block];
    // Channel 0 while the signal plays
    let mut measured = GainReductionMeter::new();

    let started = Instant::now();
    let mut start = 0;
    while start < total_frames {
        let frames = block.min(total_frames - start);
        let live = start < source.frames();

        for (ch, slot) in (0..config.channels).zip(0_i32..) {
            if live {
                source.fill(start, &mut input[..frames]);
                comp.deliver_block(
                    &input[..frames],
                    &mut output[..frames],
                    config.sample_rate,
                    slot,
                );
                if ch == 0 {
                    measured.push(&input[..frames], &output[..frames]);
                }
            } else {
                // No input left: hand the graph's zeroed buffer to the compressor
                let silence = &mut output[..frames];
                silence.fill(0.0);
                comp.process_block_in_place(silence, slot);
            }
        }

        start += frames;

        if config.realtime {
            let due = Duration::from_secs_f64(start as f64 / config.sample_rate as f64);
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
    }

    measured
}

fn log_meters(meters: &MeterSnapshot) {
    for (ch, levels) in meters.channels.iter().enumerate() {
        log::info!(
            "ch{}: in {:>7.1} dBFS | out {:>7.1} dBFS | GR {:>5.1} dB",
            ch,
            levels.input_db(),
            levels.output_db(),
            levels.gain_reduction_db()
        );
    }
    log::debug!("{} blocks @ {} Hz", meters.blocks, meters.sample_rate);
}
