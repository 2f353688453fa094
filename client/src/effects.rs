//! Outbound effect requests consumed by presentation collaborators

use glam::Vec3;
use shared::HitZone;
use std::cell::RefCell;
use std::rc::Rc;

/// Kind of presentation effect the core asks for.
///
/// Rendering and audio own the actual playback; the combat core only
/// describes what should happen, where, and facing which way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    MuzzleFlash,
    Tracer,
    FireAudio,
    Impact,
    HitAudio(HitZone),
}

/// A single effect request.
#[derive(Debug, Clone)]
pub struct EffectRequest {
    pub kind: EffectKind,
    pub position: Vec3,
    pub direction: Vec3,
}

pub trait EffectSink {
    fn spawn_effect(&mut self, effect: EffectRequest);
}

/// Sink that drops every request, for headless simulation.
pub struct NullEffects;

impl EffectSink for NullEffects {
    fn spawn_effect(&mut self, _effect: EffectRequest) {}
}

/// Sink that keeps every request, used by the demo harness for its
/// end-of-run tally and by tests to assert on effect sequences.
#[derive(Default)]
pub struct RecordingEffects {
    pub requests: Vec<EffectRequest>,
}

impl RecordingEffects {
    pub fn count_of(&self, kind: EffectKind) -> usize {
        self.requests.iter().filter(|e| e.kind == kind).count()
    }

    pub fn hit_audio_count(&self) -> usize {
        self.requests
            .iter()
            .filter(|e| matches!(e.kind, EffectKind::HitAudio(_)))
            .count()
    }
}

impl EffectSink for RecordingEffects {
    fn spawn_effect(&mut self, effect: EffectRequest) {
        self.requests.push(effect);
    }
}

// Lets a caller hand the session a sink while keeping a handle for
// inspection. The core is single-threaded, so shared ownership via
// Rc<RefCell<..>> is sufficient.
impl<T: EffectSink> EffectSink for Rc<RefCell<T>> {
    fn spawn_effect(&mut self, effect: EffectRequest) {
        self.borrow_mut().spawn_effect(effect);
    }
}
