//! Block processor
//!
//! [`Synth`] is the render entry point a host drives once per audio buffer.
//! Parameter automation and note events for the buffer are delivered first;
//! [`Synth::process`] then renders the buffer in sub-chunks, advancing the
//! patch automation before each chunk so mid-buffer changes land within one
//! chunk of their offset.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{debug, trace};

use crate::config::SynthConfig;
use crate::dsp::{self, Buffer};
use crate::patch::{Patch, ValueQueue};
use crate::synthesis::{Generator, Player, PlayerEvent};
use crate::tags::ParamId;

/// Host buffer size used by the offline helpers
const RENDER_BLOCK_SIZE: usize = 512;

pub struct Synth {
    config: SynthConfig,
    patch: Arc<Patch>,
    player: Player,
    /// Monotonic note trigger counter
    clock: u64,
    mix: Buffer,
}

impl Synth {
    /// Creates a synth with a default patch.
    pub fn new(config: SynthConfig) -> Result<Self> {
        Self::with_patch(config, Arc::new(Patch::new()))
    }

    /// Creates a synth rendering `patch`, which may be shared with a
    /// control thread.
    pub fn with_patch(config: SynthConfig, patch: Arc<Patch>) -> Result<Self> {
        config.validate()?;
        debug!(
            "Synth: {} Hz, chunk {} samples, {} voices",
            config.sample_rate, config.chunk_size, config.polyphony
        );
        let player = Player::new(patch.clone(), config.sample_rate, config.polyphony);
        Ok(Self {
            mix: vec![0.0; config.chunk_size],
            config,
            patch,
            player,
            clock: 0,
        })
    }

    /// Forwards voice and envelope notifications to `sender`.
    pub fn with_event_sender(mut self, sender: SyncSender<PlayerEvent>) -> Self {
        self.player = self.player.with_event_sender(sender);
        self
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn patch(&self) -> &Arc<Patch> {
        &self.patch
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Queues automation for the next [`process`](Self::process) call.
    pub fn begin_parameter_change<Q: ValueQueue + ?Sized>(&self, id: ParamId, queue: &Q) -> bool {
        self.patch.begin_parameter_change(id, queue)
    }

    /// Starts a note stamped with the synth's own trigger counter. Voice
    /// stealing only compares stamps, so hosts without timestamps can use
    /// this; see [`note_on_at`](Self::note_on_at) otherwise.
    pub fn note_on(&mut self, note_id: i32, velocity: f64, pitch: i32) {
        self.note_on_at(self.clock + 1, note_id, velocity, pitch);
    }

    /// Starts a note stamped with a host timestamp. The internal counter
    /// moves past it so later [`note_on`](Self::note_on) calls stay newer.
    pub fn note_on_at(&mut self, timestamp: u64, note_id: i32, velocity: f64, pitch: i32) {
        self.clock = self.clock.max(timestamp);
        trace!("Note on @{}: id={} pitch={}", timestamp, note_id, pitch);
        self.player.note_on(timestamp, note_id, velocity.clamp(0.0, 1.0), pitch);
    }

    pub fn note_off(&mut self, note_id: i32, pitch: i32) {
        trace!("Note off: id={} pitch={}", note_id, pitch);
        self.player.note_off(note_id, pitch);
    }

    pub fn all_notes_off(&mut self) {
        self.player.all_notes_off();
    }

    pub fn active_voices(&self) -> usize {
        self.player.active_voices()
    }

    /// Renders one host buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        for chunk in output.chunks_mut(self.config.chunk_size) {
            self.patch.advance_parameter_changes(chunk.len());
            let mix = &mut self.mix[..chunk.len()];
            self.player.perform(mix);
            dsp::to_f32(mix, chunk);
        }
        self.patch.end_parameter_changes();
    }

    /// Plays one note offline: held for `hold_seconds`, then released and
    /// rendered for `release_seconds` more.
    pub fn render_note(
        &mut self,
        pitch: i32,
        velocity: f64,
        hold_seconds: f64,
        release_seconds: f64,
    ) -> Vec<f32> {
        let hold = (hold_seconds.max(0.0) * self.config.sample_rate).round() as usize;
        let release = (release_seconds.max(0.0) * self.config.sample_rate).round() as usize;
        let mut output = vec![0.0f32; hold + release];

        self.note_on(pitch, velocity, pitch);
        let (held, released) = output.split_at_mut(hold);
        for block in held.chunks_mut(RENDER_BLOCK_SIZE) {
            self.process(block);
        }
        self.note_off(pitch, pitch);
        for block in released.chunks_mut(RENDER_BLOCK_SIZE) {
            self.process(block);
        }

        debug!(
            "Rendered pitch {} for {} samples, {} voices still active",
            pitch,
            output.len(),
            self.active_voices()
        );
        output
    }

    /// Unmodulated output of one generator at `frequency`, or with `None`
    /// the amplitude-weighted sum of every enabled generator.
    pub fn analysis_buffer(
        &self,
        generator: Option<usize>,
        frequency: f64,
        frames: usize,
    ) -> Result<Buffer> {
        let sample_rate = self.config.sample_rate;
        let mut out = vec![0.0; frames];
        match generator {
            Some(index) => {
                let gen = self
                    .patch
                    .generator(index)
                    .ok_or_else(|| anyhow!("No generator {}", index))?;
                Generator::synthesize(sample_rate, &gen.snapshot(), frequency, &mut out);
            }
            None => {
                let mut buf = vec![0.0; frames];
                for gen in self.patch.generators() {
                    let snapshot = gen.snapshot();
                    if !snapshot.on {
                        continue;
                    }
                    Generator::synthesize(sample_rate, &snapshot, frequency, &mut buf);
                    dsp::mul_scalar_inplace(&mut buf, snapshot.a);
                    dsp::add_inplace(&mut out, &buf);
                }
            }
        }
        Ok(out)
    }
}
