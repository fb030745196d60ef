//! Polyphonic voice pool
//!
//! The player owns a fixed set of voices behind one mutex. Note on reuses a
//! voice already bound to the note id, then any idle voice, and finally
//! steals the voice triggered longest ago.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;
use rayon::prelude::*;

use super::envelope::Stage;
use super::voice::Voice;
use crate::dsp;
use crate::patch::{GeneratorSnapshot, Patch};
use crate::tags::Target;
use crate::NUM_GENERATORS;

/// Notifications for observers outside the audio path
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayerEvent {
    /// A sounding voice was reclaimed for a new note
    VoiceStolen { note_id: i32, pitch: i32 },
    /// An envelope of a sounding note entered a new stage
    EnvelopeStageChange {
        note_id: i32,
        generator: usize,
        target: Target,
        stage: Stage,
    },
}

/// Read-only view of one voice slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceInfo {
    pub note_id: Option<i32>,
    pub pitch: i32,
    pub timestamp: u64,
    pub playing: bool,
}

/// Some hosts cannot supply stable note ids and send -1 or 0 instead; the
/// pitch stands in for those.
#[inline]
fn normalize_note_id(note_id: i32, pitch: i32) -> i32 {
    if note_id == -1 || note_id == 0 {
        pitch
    } else {
        note_id
    }
}

pub struct Player {
    patch: Arc<Patch>,
    voices: Mutex<Vec<Voice>>,
    events: Option<SyncSender<PlayerEvent>>,
}

impl Player {
    pub fn new(patch: Arc<Patch>, sample_rate: f64, polyphony: usize) -> Self {
        if !polyphony.is_power_of_two() {
            warn!("Polyphony {} is not a non-zero power of two", polyphony);
        }
        Self {
            patch,
            voices: Mutex::new((0..polyphony).map(|_| Voice::new(sample_rate)).collect()),
            events: None,
        }
    }

    /// Delivers voice and envelope notifications to `sender`. Events are
    /// dropped when the channel is full.
    pub fn with_event_sender(mut self, sender: SyncSender<PlayerEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn patch(&self) -> &Arc<Patch> {
        &self.patch
    }

    pub fn polyphony(&self) -> usize {
        self.voices.lock().len()
    }

    fn snapshots(&self) -> [GeneratorSnapshot; NUM_GENERATORS] {
        let generators = self.patch.generators();
        std::array::from_fn(|i| generators[i].snapshot())
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(sender) = &self.events {
            if sender.try_send(event).is_err() {
                trace!("Dropped player event {:?}", event);
            }
        }
    }

    /// Picks the slot for `note_id`, resetting it when it was bound to the
    /// same id or stolen. `None` only for an empty pool.
    fn new_voice(&self, voices: &mut [Voice], note_id: i32) -> Option<usize> {
        if let Some(i) = voices.iter().position(|v| v.note_id() == Some(note_id)) {
            debug!("Retriggering voice {} for note id {}", i, note_id);
            voices[i].reset();
            return Some(i);
        }

        if let Some(i) = voices
            .iter()
            .position(|v| v.note_id().is_none() || !v.playing())
        {
            debug!("Allocating voice {} for note id {}", i, note_id);
            return Some(i);
        }

        // First of the oldest voices on ties
        let (i, _) = voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.timestamp())?;
        let stolen = &mut voices[i];
        debug!(
            "Stealing voice {} (note id {:?}, pitch {}) for note id {}",
            i,
            stolen.note_id(),
            stolen.pitch(),
            note_id
        );
        self.emit(PlayerEvent::VoiceStolen {
            note_id: stolen.note_id().unwrap_or(stolen.pitch()),
            pitch: stolen.pitch(),
        });
        stolen.reset();
        Some(i)
    }

    pub fn note_on(&self, timestamp: u64, note_id: i32, velocity: f64, pitch: i32) {
        let note_id = normalize_note_id(note_id, pitch);
        let patches = self.snapshots();
        let mut voices = self.voices.lock();
        match self.new_voice(&mut voices, note_id) {
            Some(slot) => voices[slot].note_on(&patches, note_id, pitch, velocity, timestamp),
            None => warn!("No voices to play note id {} (pitch {})", note_id, pitch),
        }
    }

    pub fn note_off(&self, note_id: i32, pitch: i32) {
        let note_id = normalize_note_id(note_id, pitch);
        let mut voices = self.voices.lock();
        match voices
            .iter_mut()
            .find(|v| v.note_id() == Some(note_id) && v.playing())
        {
            Some(voice) => voice.note_off(),
            None => warn!("Note off for unknown note id {} (pitch {})", note_id, pitch),
        }
    }

    /// Releases every sounding voice.
    pub fn all_notes_off(&self) {
        let mut voices = self.voices.lock();
        for voice in voices.iter_mut().filter(|v| v.playing()) {
            voice.note_off();
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.lock().iter().filter(|v| v.playing()).count()
    }

    pub fn voice_info(&self) -> Vec<VoiceInfo> {
        self.voices
            .lock()
            .iter()
            .map(|v| VoiceInfo {
                note_id: v.note_id(),
                pitch: v.pitch(),
                timestamp: v.timestamp(),
                playing: v.playing(),
            })
            .collect()
    }

    /// Renders every voice in parallel and sums the result into `mix`.
    pub fn perform(&self, mix: &mut [f64]) {
        let patches = self.snapshots();
        let frames = mix.len();
        let mut voices = self.voices.lock();

        let rendered: Vec<Vec<&[f64]>> = voices
            .par_iter_mut()
            .map(|voice| voice.perform(&patches, frames))
            .collect();

        mix.fill(0.0);
        for buffer in rendered.iter().flatten() {
            dsp::add_inplace(mix, buffer);
        }
        drop(rendered);

        if self.events.is_some() {
            for voice in voices.iter_mut() {
                let Some(note_id) = voice.note_id() else {
                    continue;
                };
                voice.take_stage_changes(|generator, target, stage| {
                    self.emit(PlayerEvent::EnvelopeStageChange {
                        note_id,
                        generator,
                        target,
                        stage,
                    })
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_note_id() {
        assert_eq!(normalize_note_id(-1, 60), 60);
        assert_eq!(normalize_note_id(0, 61), 61);
        assert_eq!(normalize_note_id(12, 62), 12);
    }

    #[test]
    fn test_reuses_slot_for_same_note_id() {
        let player = Player::new(Arc::new(Patch::new()), 44100.0, 4);
        player.note_on(1, 5, 1.0, 60);
        player.note_on(2, 5, 1.0, 60);
        let info = player.voice_info();
        assert_eq!(info[0].note_id, Some(5));
        assert_eq!(info[0].timestamp, 2);
        assert_eq!(info[1].note_id, None);
        assert_eq!(player.active_voices(), 1);
    }

    #[test]
    fn test_perform_sums_voices() {
        let player = Player::new(Arc::new(Patch::new()), 44100.0, 4);
        let mut single = vec![0.0; 64];
        player.note_on(1, 1, 1.0, 60);
        player.perform(&mut single);

        let doubled = Player::new(Arc::new(Patch::new()), 44100.0, 4);
        doubled.note_on(1, 1, 1.0, 60);
        doubled.note_on(2, 2, 1.0, 60);
        let mut mix = vec![0.0; 64];
        doubled.perform(&mut mix);

        for (a, b) in single.iter().zip(&mix) {
            assert!((2.0 * a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_pool_drops_notes() {
        let player = Player::new(Arc::new(Patch::new()), 44100.0, 0);
        player.note_on(1, 1, 1.0, 60);
        player.note_off(1, 60);
        let mut mix = vec![1.0; 32];
        player.perform(&mut mix);
        assert_eq!(player.active_voices(), 0);
        assert!(mix.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_idle_player_renders_silence() {
        let player = Player::new(Arc::new(Patch::new()), 44100.0, 8);
        let mut mix = vec![1.0; 32];
        player.perform(&mut mix);
        assert!(mix.iter().all(|&v| v == 0.0));
    }
}
