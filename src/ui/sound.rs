/// Sound cues: procedural 8-bit style effects via rodio.
///
/// Each `Cue` is rendered to an in-memory WAV buffer once at startup.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Without the "sound" feature the stub engine does nothing.

use crate::domain::entity::Weapon;
use crate::sim::event::GameEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Sword,
    Bow,
    Hit,
    Hurt,
    Pickup,
    Clear,
    Die,
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const CUE_COUNT: usize = 7;

impl Cue {
    #[cfg_attr(not(feature = "sound"), allow(dead_code))]
    const ALL: [Cue; CUE_COUNT] = [Cue::Sword, Cue::Bow, Cue::Hit, Cue::Hurt, Cue::Pickup, Cue::Clear, Cue::Die];

    /// The cue a game event should make, if any. Enemy shots are silent.
    pub fn for_event(event: &GameEvent) -> Option<Cue> {
        match event {
            GameEvent::AttackLaunched { weapon: Weapon::Sword, by_player: true } => Some(Cue::Sword),
            GameEvent::AttackLaunched { weapon: Weapon::Bow, by_player: true } => Some(Cue::Bow),
            GameEvent::EnemyHit { .. } => Some(Cue::Hit),
            GameEvent::PlayerHurt { .. } => Some(Cue::Hurt),
            GameEvent::ItemCollected { .. } => Some(Cue::Pickup),
            GameEvent::ScreenCleared { .. } => Some(Cue::Clear),
            GameEvent::PlayerDied => Some(Cue::Die),
            _ => None,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    use super::{render, Cue, CUE_COUNT};

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// Indexed by `Cue as usize`.
        buffers: [Arc<Vec<u8>>; CUE_COUNT],
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output: {e}");
                    return None;
                }
            };
            let buffers = Cue::ALL.map(|cue| Arc::new(render(cue)));
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, cue: Cue) {
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            let cursor = Cursor::new(self.buffers[cue as usize].as_ref().clone());
            if let Ok(src) = rodio::Decoder::new(cursor) {
                sink.append(src);
                sink.detach();
            }
        }
    }
}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}

// ════════════════════════════════════════════════════════════
//  Waveforms: mono f32 samples in [-1, 1]
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const SAMPLE_RATE: u32 = 22050;

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn render(cue: Cue) -> Vec<u8> {
    let samples = match cue {
        Cue::Sword => gen_sweep(900.0, 300.0, 0.08, 0.5),
        Cue::Bow => gen_sweep(400.0, 1200.0, 0.06, 0.1),
        Cue::Hit => gen_sweep(250.0, 120.0, 0.07, 0.7),
        Cue::Hurt => gen_notes(&[(330.0, 0.06), (220.0, 0.12)], 0.3),
        Cue::Pickup => gen_notes(&[(1047.0, 0.045), (1319.0, 0.045), (1568.0, 0.06)], 0.25),
        Cue::Clear => gen_notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.3)], 0.3),
        Cue::Die => gen_notes(&[(440.0, 0.12), (370.0, 0.12), (311.0, 0.12), (261.0, 0.3)], 0.3),
    };
    make_wav(&samples)
}

fn sine(t: f32, freq: f32) -> f32 {
    (t * freq * std::f32::consts::TAU).sin()
}

/// Pitch sweep mixed with `noise` share of white noise; linear fade out.
fn gen_sweep(from_hz: f32, to_hz: f32, duration: f32, noise: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut seed: u32 = 0x9e37_79b9;
    (0..n)
        .map(|i| {
            let p = i as f32 / n as f32;
            let t = i as f32 / SAMPLE_RATE as f32;
            let tone = sine(t, from_hz + (to_hz - from_hz) * p);
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let white = (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
            (tone * (1.0 - noise) + white * noise) * (1.0 - p) * 0.3
        })
        .collect()
}

/// Note sequence with a 3rd harmonic; each note decays by 30%.
fn gen_notes(notes: &[(f32, f32)], volume: f32) -> Vec<f32> {
    let mut samples = Vec::new();
    for &(freq, dur) in notes {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        samples.extend((0..n).map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32) * 0.3;
            (sine(t, freq) * 0.75 + sine(t, freq * 3.0) * 0.25) * env * volume
        }));
    }
    samples
}

/// 16-bit mono PCM WAV.
fn make_wav(samples: &[f32]) -> Vec<u8> {
    const HEADER: usize = 44;
    let data_size = (samples.len() * 2) as u32;
    let mut buf = Vec::with_capacity(HEADER + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVEfmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());

    for &s in samples {
        buf.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
    }
    buf
}
