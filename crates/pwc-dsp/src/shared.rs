//! Thread-shared compressor
//!
//! One audio thread calls the block entry points; any number of control
//! threads call setters and read meters. Parameters, coefficients and
//! envelope state sit behind a single `parking_lot::Mutex`, taken once per
//! block. Meters are published lock-free through [`MeterBank`].
//!
//! Share it as `Arc<SharedCompressor>`.

use parking_lot::Mutex;
use pwc_core::{CompressorParams, PRIMARY_CHANNEL, PwcResult, Sample, sanitize};

use crate::dynamics::{CompressorCoeffs, SoftKneeCompressor};
use crate::metering::{ChannelLevels, MeterBank, MeterSnapshot};
use crate::Processor;

pub struct SharedCompressor {
    engine: Mutex<SoftKneeCompressor>,
    meters: MeterBank,
}

impl SharedCompressor {
    pub fn new(sample_rate: f64, channels: usize) -> PwcResult<Self> {
        Ok(Self::from_engine(SoftKneeCompressor::new(sample_rate, channels)?))
    }

    pub fn with_params(
        sample_rate: f64,
        channels: usize,
        params: CompressorParams,
    ) -> PwcResult<Self> {
        Ok(Self::from_engine(SoftKneeCompressor::with_params(
            sample_rate,
            channels,
            params,
        )?))
    }

    pub fn from_engine(engine: SoftKneeCompressor) -> Self {
        let meters = MeterBank::new(engine.channels());
        Self {
            engine: Mutex::new(engine),
            meters,
        }
    }

    #[inline]
    fn channel_slot(&self, channel: i32) -> Option<usize> {
        usize::try_from(channel).ok().filter(|&ch| ch < self.meters.channel_count())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // AUDIO THREAD
    // ═══════════════════════════════════════════════════════════════════════

    /// Compress `input` into `output` for one channel and publish its meters.
    ///
    /// Does nothing when the lengths differ or the channel is out of range.
    pub fn process_block(&self, input: &[Sample], output: &mut [Sample], channel: i32) {
        let mut engine = self.engine.lock();
        self.render(&mut engine, input, output, channel);
    }

    /// [`Self::process_block`] writing back into `buffer`.
    ///
    /// Used for silence injection when the graph has no input to offer.
    pub fn process_block_in_place(&self, buffer: &mut [Sample], channel: i32) {
        let Some(slot) = self.channel_slot(channel) else {
            return;
        };

        let levels = {
            let mut engine = self.engine.lock();
            let mut levels = ChannelLevels::default();
            for sample in buffer.iter_mut() {
                *sample = Self::run_sample(&mut engine, *sample, channel, &mut levels);
            }
            levels
        };

        self.publish(slot, levels);
    }

    /// Graph entry point: follow the graph's sample rate, then process.
    ///
    /// A zero or unchanged rate leaves the coefficients alone. Nothing is
    /// logged here; [`Self::set_sample_rate`] is the logging control path.
    pub fn deliver_block(
        &self,
        input: &[Sample],
        output: &mut [Sample],
        sample_rate: u32,
        channel: i32,
    ) {
        let mut engine = self.engine.lock();
        if sample_rate > 0 {
            engine.update_sample_rate(f64::from(sample_rate));
        }
        self.render(&mut engine, input, output, channel);
    }

    /// Process an interleaved buffer frame by frame.
    ///
    /// Left untouched when its length is not a whole number of frames.
    /// Lanes beyond this compressor's channel count pass through. Meters
    /// are not published.
    pub fn process_interleaved(&self, buffer: &mut [Sample], channels: usize) {
        if channels == 0 || buffer.len() % channels != 0 {
            return;
        }

        let mut engine = self.engine.lock();
        for frame in buffer.chunks_exact_mut(channels) {
            for (ch, sample) in (0_i32..).zip(frame.iter_mut()) {
                *sample = sanitize(engine.process_sample(sanitize(*sample), ch).0);
            }
        }
    }

    /// Single locked sample, for diagnostics and tests.
    pub fn process_sample(&self, sample: Sample, channel: i32) -> Sample {
        self.engine.lock().process_sample(sample, channel).0
    }

    fn render(
        &self,
        engine: &mut SoftKneeCompressor,
        input: &[Sample],
        output: &mut [Sample],
        channel: i32,
    ) {
        if input.len() != output.len() {
            return;
        }
        let Some(slot) = self.channel_slot(channel) else {
            return;
        };

        let mut levels = ChannelLevels::default();
        for (src, dst) in input.iter().zip(output.iter_mut()) {
            *dst = Self::run_sample(engine, *src, channel, &mut levels);
        }
        self.publish(slot, levels);
    }

    #[inline(always)]
    fn run_sample(
        engine: &mut SoftKneeCompressor,
        sample: Sample,
        channel: i32,
        levels: &mut ChannelLevels,
    ) -> Sample {
        let input = sanitize(sample);
        levels.input_peak = levels.input_peak.max((input as f64).abs());

        let (processed, gain) = engine.process_sample(input, channel);
        let output = sanitize(processed);

        levels.output_peak = levels.output_peak.max((output as f64).abs());
        levels.min_gain = levels.min_gain.min(gain);
        output
    }

    #[inline]
    fn publish(&self, slot: usize, levels: ChannelLevels) {
        self.meters.publish(slot, levels);
        if slot == PRIMARY_CHANNEL {
            self.meters.count_block();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONTROL THREADS
    // ═══════════════════════════════════════════════════════════════════════

    /// Current meters. Only the sample rate read takes the lock.
    pub fn meters(&self) -> MeterSnapshot {
        let sample_rate = self.engine.lock().sample_rate();
        self.meters.snapshot(sample_rate)
    }

    /// Zero every envelope. Parameters and meters are kept.
    pub fn reset(&self) {
        self.engine.lock().reset();
    }

    /// Clear the published meters and the block counter
    pub fn reset_meters(&self) {
        self.meters.clear();
    }

    /// Run `f` on the engine. The lock is released before this returns,
    /// so callers log after it.
    #[inline]
    fn with_engine<T>(&self, f: impl FnOnce(&mut SoftKneeCompressor) -> T) -> T {
        f(&mut *self.engine.lock())
    }

    pub fn set_threshold(&self, db: f64) {
        let threshold = self.with_engine(|engine| {
            engine.set_threshold(db);
            engine.threshold()
        });
        log::debug!("threshold -> {threshold:.2} dB");
    }

    pub fn set_ratio(&self, ratio: f64) {
        let ratio = self.with_engine(|engine| {
            engine.set_ratio(ratio);
            engine.ratio()
        });
        log::debug!("ratio -> {ratio:.2}:1");
    }

    pub fn set_knee(&self, db: f64) {
        let knee = self.with_engine(|engine| {
            engine.set_knee(db);
            engine.knee()
        });
        log::debug!("knee -> {knee:.2} dB");
    }

    pub fn set_attack(&self, ms: f64) {
        let attack = self.with_engine(|engine| {
            engine.set_attack(ms);
            engine.attack()
        });
        log::debug!("attack -> {attack:.2} ms");
    }

    pub fn set_release(&self, ms: f64) {
        let release = self.with_engine(|engine| {
            engine.set_release(ms);
            engine.release()
        });
        log::debug!("release -> {release:.2} ms");
    }

    /// Manual makeup gain; disables auto makeup. Non-finite values are ignored.
    pub fn set_makeup_gain(&self, db: f64) {
        let (makeup, auto) = self.with_engine(|engine| {
            engine.set_makeup_gain(db);
            (engine.makeup_gain(), engine.auto_makeup())
        });
        log::debug!("makeup -> {makeup:.2} dB (auto: {auto})");
    }

    pub fn set_auto_makeup(&self, enable: bool) {
        let makeup = self.with_engine(|engine| {
            engine.set_auto_makeup(enable);
            engine.makeup_gain()
        });
        log::debug!("auto makeup -> {enable} ({makeup:.2} dB)");
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.with_engine(|engine| engine.set_bypass(bypass));
        log::debug!("bypass -> {bypass}");
    }

    /// Follow a new sample rate from a control thread.
    ///
    /// Non-positive, non-finite and unchanged rates are ignored.
    pub fn set_sample_rate(&self, sample_rate: f64) {
        let previous = self.with_engine(|engine| {
            let previous = engine.sample_rate();
            engine.update_sample_rate(sample_rate).then_some(previous)
        });
        match previous {
            Some(previous) => log::info!("Sample rate {previous} -> {sample_rate} Hz"),
            None => log::debug!("sample rate {sample_rate} ignored"),
        }
    }

    pub fn apply_params(&self, params: &CompressorParams) {
        let applied = self.with_engine(|engine| {
            engine.apply_params(params);
            *engine.params()
        });
        log::debug!("parameters applied: {applied:?}");
    }

    pub fn params(&self) -> CompressorParams {
        *self.engine.lock().params()
    }

    pub fn coeffs(&self) -> CompressorCoeffs {
        *self.engine.lock().coeffs()
    }

    pub fn threshold(&self) -> f64 {
        self.engine.lock().threshold()
    }

    pub fn ratio(&self) -> f64 {
        self.engine.lock().ratio()
    }

    pub fn knee(&self) -> f64 {
        self.engine.lock().knee()
    }

    pub fn attack(&self) -> f64 {
        self.engine.lock().attack()
    }

    pub fn release(&self) -> f64 {
        self.engine.lock().release()
    }

    pub fn makeup_gain(&self) -> f64 {
        self.engine.lock().makeup_gain()
    }

    pub fn auto_makeup(&self) -> bool {
        self.engine.lock().auto_makeup()
    }

    pub fn bypass(&self) -> bool {
        self.engine.lock().bypass()
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.lock().sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.meters.channel_count()
    }

    pub fn peak(&self, channel: usize) -> Option<f64> {
        self.engine.lock().peak(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn stereo() -> SharedCompressor {
        SharedCompressor::new(48000.0, 2).unwrap()
    }

    thread_local! {
        static RECORDS: Cell<usize> = const { Cell::new(0) };
    }

    /// Counts log records per thread so parallel tests don't interfere.
    struct RecordCounter;

    impl log::Log for RecordCounter {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, _: &log::Record<'_>) {
            RECORDS.with(|n| n.set(n.get() + 1));
        }

        fn flush(&self) {}
    }

    static COUNTER: RecordCounter = RecordCounter;

    fn records_during(f: impl FnOnce()) -> usize {
        let _ = log::set_logger(&COUNTER);
        log::set_max_level(log::LevelFilter::Trace);
        let before = RECORDS.with(Cell::get);
        f();
        RECORDS.with(Cell::get) - before
    }

    #[test]
    fn test_silent_block() {
        let comp = stereo();
        let input = vec![0.0; 256];
        let mut output = vec![1.0; 256];
        comp.process_block(&input, &mut output, 0);

        assert!(output.iter().all(|&s| s == 0.0));
        let left = comp.meters().left();
        assert_eq!(left.min_gain, 1.0);
        assert_eq!(left.input_peak, 0.0);
        assert_eq!(left.output_peak, 0.0);
    }

    #[test]
    fn test_block_rejects_bad_calls() {
        let comp = stereo();
        let input = vec![0.5; 64];

        let mut short = vec![9.0; 32];
        comp.process_block(&input, &mut short, 0);
        assert!(short.iter().all(|&s| s == 9.0));

        let mut output = vec![9.0; 64];
        comp.process_block(&input, &mut output, -1);
        comp.process_block(&input, &mut output, 2);
        assert!(output.iter().all(|&s| s == 9.0));

        assert_eq!(comp.meters().blocks, 0);
        assert_eq!(comp.peak(0), Some(0.0));
    }

    #[test]
    fn test_block_counter_primary_only() {
        let comp = stereo();
        let input = vec![0.1; 32];
        let mut output = vec![0.0; 32];
        for _ in 0..5 {
            comp.process_block(&input, &mut output, 0);
            comp.process_block(&input, &mut output, 1);
        }
        comp.process_block(&input, &mut output, 1);
        assert_eq!(comp.meters().blocks, 5);
    }

    #[test]
    fn test_non_finite_block_sanitized() {
        let comp = stereo();
        let input = [Sample::NAN, Sample::INFINITY, 0.5, Sample::NEG_INFINITY];
        let mut output = [0.0; 4];
        comp.process_block(&input, &mut output, 1);

        assert!(output.iter().all(|s| s.is_finite()));
        assert_eq!(output[0], 0.0);
        assert_eq!(output[1], 0.0);
        let right = comp.meters().right();
        assert_eq!(right.input_peak, 0.5);
        assert!(right.output_peak.is_finite());
    }

    #[test]
    fn test_meters_track_reduction() {
        let comp = stereo();
        comp.set_attack(0.1);
        let input = vec![1.0; 4800];
        let mut output = vec![0.0; 4800];
        comp.process_block(&input, &mut output, 0);

        let left = comp.meters().left();
        assert_eq!(left.input_peak, 1.0);
        assert!(left.min_gain < 0.5);
        assert!(left.gain_reduction_db() > 6.0);
        assert_eq!(comp.meters().right(), ChannelLevels::default());
    }

    #[test]
    fn test_in_place_matches_out_of_place() {
        let a = stereo();
        let b = stereo();
        let input: Vec<Sample> = (0..512).map(|i| ((i as f32) * 0.05).sin()).collect();

        let mut output = vec![0.0; input.len()];
        a.process_block(&input, &mut output, 0);

        let mut buffer = input.clone();
        b.process_block_in_place(&mut buffer, 0);

        assert_eq!(output, buffer);
        assert_eq!(a.meters(), b.meters());
    }

    #[test]
    fn test_deliver_block_follows_rate() {
        let comp = stereo();
        let input = vec![0.2; 64];
        let mut output = vec![0.0; 64];

        comp.deliver_block(&input, &mut output, 44100, 0);
        assert_eq!(comp.sample_rate(), 44100.0);
        assert_eq!(comp.meters().sample_rate, 44100.0);

        comp.deliver_block(&input, &mut output, 0, 1);
        assert_eq!(comp.sample_rate(), 44100.0);
        assert_eq!(comp.meters().blocks, 1);
    }

    #[test]
    fn test_audio_path_never_logs() {
        let comp = stereo();
        let input = vec![0.5; 64];
        let mut output = vec![0.0; 64];

        let audio = records_during(|| {
            comp.deliver_block(&input, &mut output, 44100, 0);
            comp.deliver_block(&input, &mut output, 48000, 1);
            comp.process_block_in_place(&mut output, 0);
        });
        assert_eq!(audio, 0);
        assert_eq!(comp.sample_rate(), 48000.0);

        let control = records_during(|| comp.set_sample_rate(96000.0));
        assert_eq!(control, 1);
        assert_eq!(comp.sample_rate(), 96000.0);
    }

    #[test]
    fn test_non_finite_levels_keep_audio_flowing() {
        let comp = stereo();
        comp.set_makeup_gain(0.0);
        comp.set_makeup_gain(f64::NAN);
        comp.set_threshold(f64::INFINITY);
        assert_eq!(comp.makeup_gain(), 0.0);
        assert_eq!(comp.threshold(), -20.0);

        let input = vec![0.05; 64];
        let mut output = vec![0.0; 64];
        comp.process_block(&input, &mut output, 0);
        assert!(output.iter().all(|&s| s.is_finite() && s > 0.0));
        assert!(comp.process_sample(0.05, 1).is_finite());
    }

    #[test]
    fn test_interleaved() {
        let comp = stereo();
        let mut odd = vec![0.5; 7];
        comp.process_interleaved(&mut odd, 2);
        assert!(odd.iter().all(|&s| s == 0.5));

        comp.set_makeup_gain(0.0);
        let mut frames: Vec<Sample> = [1.0, 0.0].repeat(2000);
        comp.process_interleaved(&mut frames, 2);
        assert!(frames[frames.len() - 2] < 1.0);
        assert_eq!(frames[frames.len() - 1], 0.0);
        assert_eq!(comp.peak(1), Some(0.0));
    }

    #[test]
    fn test_process_sample_invalid_channels() {
        let comp = stereo();
        assert_eq!(comp.process_sample(0.5, -1), 0.5);
        assert_eq!(comp.process_sample(0.5, 10), 0.5);
    }

    #[test]
    fn test_setters_round_trip() {
        let comp = stereo();
        comp.set_threshold(-30.0);
        comp.set_ratio(8.0);
        comp.set_knee(3.0);
        comp.set_attack(5.0);
        comp.set_release(250.0);
        comp.set_bypass(true);
        assert_eq!(comp.threshold(), -30.0);
        assert_eq!(comp.ratio(), 8.0);
        assert_eq!(comp.knee(), 3.0);
        assert_eq!(comp.attack(), 5.0);
        assert_eq!(comp.release(), 250.0);
        assert!(comp.bypass());
        assert!(comp.auto_makeup());
        assert!((comp.makeup_gain() - 26.25).abs() < 1e-12);

        comp.set_makeup_gain(-2.0);
        assert!(!comp.auto_makeup());
        assert_eq!(comp.params().makeup_gain_db, -2.0);

        comp.set_auto_makeup(true);
        assert!((comp.makeup_gain() - 26.25).abs() < 1e-12);
    }

    #[test]
    fn test_reset_keeps_meters() {
        let comp = stereo();
        let input = vec![0.8; 128];
        let mut output = vec![0.0; 128];
        comp.process_block(&input, &mut output, 0);
        comp.reset();

        assert_eq!(comp.peak(0), Some(0.0));
        assert_eq!(comp.meters().blocks, 1);

        comp.reset_meters();
        assert_eq!(comp.meters().blocks, 0);
        assert_eq!(comp.meters().left(), ChannelLevels::default());
    }

    #[test]
    fn test_concurrent_control_and_audio() {
        let comp = Arc::new(stereo());
        let running = Arc::new(AtomicBool::new(true));

        let control = {
            let comp = Arc::clone(&comp);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut turns = 0_u32;
                while running.load(Ordering::Relaxed) {
                    comp.set_threshold(-10.0 - (turns % 30) as f64);
                    comp.set_attack(1.0 + (turns % 10) as f64);
                    let meters = comp.meters();
                    assert!(meters.left().min_gain <= 1.0);
                    turns = turns.wrapping_add(1);
                }
            })
        };

        let input = vec![0.7; 256];
        let mut output = vec![0.0; 256];
        for _ in 0..500 {
            comp.process_block(&input, &mut output, 0);
            comp.process_block(&input, &mut output, 1);
            assert!(output.iter().all(|s| s.is_finite()));
        }

        running.store(false, Ordering::Relaxed);
        control.join().unwrap();
        assert_eq!(comp.meters().blocks, 500);
    }
}
