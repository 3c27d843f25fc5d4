//! Time-ordered queue of envelope events.

/// Identity of one voice instance. A frequency re-triggered after release
/// gets a fresh id, so stale events never touch the new voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// A point in a voice's lifecycle reached on the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeEvent {
    /// Attack ramp finished; the voice sustains.
    AttackComplete(VoiceId),
    /// Release ramp and stop buffer elapsed; the oscillator is stopped.
    ReleaseComplete(VoiceId),
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    at: f64,
    event: EnvelopeEvent,
}

/// Events sorted by due time; equal times pop in insertion order.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<Scheduled>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn push(&mut self, at: f64, event: EnvelopeEvent) {
        let pos = self.events.partition_point(|e| e.at <= at);
        self.events.insert(pos, Scheduled { at, event });
    }

    /// Pop the next event if it is due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<EnvelopeEvent> {
        match self.events.first() {
            Some(e) if e.at <= now => Some(self.events.remove(0).event),
            _ => None,
        }
    }
}
