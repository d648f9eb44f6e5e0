//! Bounded voice pool with oldest-first stealing.
//!
//! Voices live in an arena indexed by [`VoiceId`]. Busy voices are threaded
//! onto an intrusive doubly linked list in acquisition order so that marking
//! busy, releasing, and evicting the oldest are all O(1).
//!
//! ```text
//!   head (oldest)                        tail (newest)
//!   ┌────┐ next ┌────┐ next ┌────┐
//!   │ v2 │─────▶│ v0 │─────▶│ v3 │
//!   └────┘◀─────└────┘◀─────└────┘
//!          prev        prev
//! ```
//!
//! A voice moves Free → Reserved on [`VoicePool::acquire`], Reserved → Busy on
//! [`VoicePool::mark_busy`], and back to Free on [`VoicePool::release`].

use tinysound_common::VoiceId;
use tracing::{debug, warn};

use crate::backend::{AudioBackend, VoiceSink};
use crate::handle::AudioHandle;
use crate::sound::{SoundRef, SpatialSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    /// Handed out by `acquire`, not yet bound.
    Reserved,
    Busy,
}

struct VoiceSlot {
    sink: Box<dyn VoiceSink>,
    binding: Option<SoundRef>,
    generation: u32,
    state: SlotState,
    prev: Option<usize>,
    next: Option<usize>,
}

impl VoiceSlot {
    fn new(sink: Box<dyn VoiceSink>, state: SlotState) -> Self {
        Self {
            sink,
            binding: None,
            generation: 0,
            state,
            prev: None,
            next: None,
        }
    }

    /// Stop playback and return every per-session setting to its default.
    fn reset(&mut self) {
        self.sink.stop();
        self.sink.set_clip(None);
        self.sink.set_output(None);
        self.sink.set_looping(false);
        self.sink.set_spatial(SpatialSettings::FLAT);
    }
}

/// Result of a successful [`VoicePool::acquire`].
#[derive(Debug)]
pub struct Acquired {
    /// The voice, now reserved for the caller.
    pub voice: VoiceId,
    /// Descriptor of the session that was evicted to free this voice, if any.
    pub stolen: Option<SoundRef>,
}

/// Fixed-capacity set of reusable voices.
pub struct VoicePool {
    slots: Vec<VoiceSlot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    busy: usize,
    capacity: usize,
    steal_when_full: bool,
}

impl VoicePool {
    /// Create an empty pool. Capacity is at least one.
    #[must_use]
    pub fn new(capacity: usize, steal_when_full: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            busy: 0,
            capacity,
            steal_when_full,
        }
    }

    /// Pre-create up to `count` free voices. Returns how many were created.
    pub fn warm(&mut self, backend: &mut dyn AudioBackend, count: usize) -> usize {
        let target = count.min(self.capacity);
        let mut created = 0;
        while self.slots.len() < target {
            match backend.create_voice() {
                Ok(sink) => {
                    let idx = self.slots.len();
                    self.slots.push(VoiceSlot::new(sink, SlotState::Free));
                    self.free.push(idx);
                    created += 1;
                },
                Err(e) => {
                    warn!("Could only warm {} of {} voices: {}", self.slots.len(), target, e);
                    break;
                },
            }
        }
        created
    }

    /// Reserve a voice.
    ///
    /// Tries a free voice, then a new voice if under capacity, then (when
    /// stealing is enabled) evicts the oldest busy voice. Returns `None` when
    /// nothing is available.
    pub fn acquire(&mut self, backend: &mut dyn AudioBackend) -> Option<Acquired> {
        if let Some(idx) = self.free.pop() {
            self.slots[idx].state = SlotState::Reserved;
            return Some(Acquired {
                voice: voice_id(idx),
                stolen: None,
            });
        }

        if self.slots.len() < self.capacity {
            match backend.create_voice() {
                Ok(sink) => {
                    let idx = self.slots.len();
                    self.slots.push(VoiceSlot::new(sink, SlotState::Reserved));
                    debug!(voice = %voice_id(idx), "Created voice");
                    return Some(Acquired {
                        voice: voice_id(idx),
                        stolen: None,
                    });
                },
                Err(e) => warn!("Voice creation failed, falling back to stealing: {}", e),
            }
        }

        if !self.steal_when_full {
            return None;
        }

        let oldest = self.head?;
        let stolen = self.release(voice_id(oldest));
        // release pushed the slot onto the free stack; take it straight back
        if let Some(pos) = self.free.iter().rposition(|&i| i == oldest) {
            self.free.swap_remove(pos);
        }
        self.slots[oldest].state = SlotState::Reserved;
        debug!(voice = %voice_id(oldest), "Stole oldest voice");
        Some(Acquired {
            voice: voice_id(oldest),
            stolen,
        })
    }

    /// Bind a voice to a session and append it to the busy order.
    ///
    /// Marking an already-busy voice returns its current handle unchanged.
    /// Returns the invalid handle for an unknown voice.
    pub fn mark_busy(&mut self, voice: VoiceId, sound: SoundRef) -> AudioHandle {
        let idx = voice.index();
        let Some(state) = self.slots.get(idx).map(|slot| slot.state) else {
            return AudioHandle::invalid();
        };

        match state {
            SlotState::Busy => return self.handle_of(voice).unwrap_or_default(),
            SlotState::Free => {
                if let Some(pos) = self.free.iter().position(|&i| i == idx) {
                    self.free.swap_remove(pos);
                }
            },
            SlotState::Reserved => {},
        }

        let slot = &mut self.slots[idx];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Busy;
        let handle = AudioHandle::new(voice, slot.generation, sound.id());
        slot.binding = Some(sound);
        self.link_tail(idx);
        self.busy += 1;
        handle
    }

    /// Stop a voice, reset it, and return it to the free set.
    ///
    /// Returns the descriptor it was bound to. Releasing a free voice does
    /// nothing.
    pub fn release(&mut self, voice: VoiceId) -> Option<SoundRef> {
        let idx = voice.index();
        let state = self.slots.get(idx)?.state;
        if state == SlotState::Free {
            return None;
        }

        if state == SlotState::Busy {
            self.unlink(idx);
            self.busy -= 1;
        }

        let slot = &mut self.slots[idx];
        slot.reset();
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Free;
        self.free.push(idx);
        slot.binding.take()
    }

    /// True if the handle's session is still bound to its voice.
    #[must_use]
    pub fn is_valid(&self, handle: AudioHandle) -> bool {
        if !handle.is_issued() {
            return false;
        }
        self.slots.get(handle.voice().index()).is_some_and(|slot| {
            slot.state == SlotState::Busy
                && slot.generation == handle.generation()
                && slot.binding.as_ref().is_some_and(|s| s.id() == handle.sound())
        })
    }

    /// Current handle for a busy voice.
    #[must_use]
    pub fn handle_of(&self, voice: VoiceId) -> Option<AudioHandle> {
        let slot = self.slots.get(voice.index())?;
        if slot.state != SlotState::Busy {
            return None;
        }
        let sound = slot.binding.as_ref()?;
        Some(AudioHandle::new(voice, slot.generation, sound.id()))
    }

    /// Descriptor a busy voice is bound to.
    #[must_use]
    pub fn binding(&self, voice: VoiceId) -> Option<&SoundRef> {
        self.slots.get(voice.index())?.binding.as_ref()
    }

    /// Read access to a voice.
    #[must_use]
    pub fn voice(&self, voice: VoiceId) -> Option<&dyn VoiceSink> {
        let slot = self.slots.get(voice.index())?;
        Some(slot.sink.as_ref())
    }

    /// Write access to a voice.
    pub fn voice_mut(&mut self, voice: VoiceId) -> Option<&mut dyn VoiceSink> {
        let slot = self.slots.get_mut(voice.index())?;
        Some(slot.sink.as_mut())
    }

    /// Busy voices, oldest first.
    pub fn busy_voices(&self) -> BusyIter<'_> {
        BusyIter {
            pool: self,
            cursor: self.head,
        }
    }

    /// Number of busy voices.
    #[must_use]
    pub const fn busy_count(&self) -> usize {
        self.busy
    }

    /// Number of free voices.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of voices created so far.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of voices.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn link_tail(&mut self, idx: usize) {
        self.slots[idx].prev = self.tail;
        self.slots[idx].next = None;
        match self.tail {
            Some(tail) => self.slots[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("capacity", &self.capacity)
            .field("total", &self.slots.len())
            .field("busy", &self.busy)
            .field("free", &self.free.len())
            .field("steal_when_full", &self.steal_when_full)
            .finish()
    }
}

/// Iterator over busy voices in acquisition order.
pub struct BusyIter<'a> {
    pool: &'a VoicePool,
    cursor: Option<usize>,
}

impl Iterator for BusyIter<'_> {
    type Item = VoiceId;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        self.cursor = self.pool.slots[idx].next;
        Some(voice_id(idx))
    }
}

fn voice_id(idx: usize) -> VoiceId {
    VoiceId::new(idx as u32)
}
