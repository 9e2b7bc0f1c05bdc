use crate::constants::{CLIP_DURATION_SEC, CLIP_FADE_SEC, CLIP_FLOOR_GAIN};
use crate::error::AssetError;
use crate::points::CloudPoint;
use crate::spatial::Neighbor;
use fnv::FnvHashMap;
use glam::Vec3;
use smallvec::{smallvec, SmallVec};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(pub u64);

/// A reserved playback slot whose clip has not started yet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotTicket {
    pub id: SlotId,
    pub generation: Generation,
    pub rank: usize,
    pub point: CloudPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Pending(Generation),
    Playing,
}

#[derive(Debug, Default)]
pub struct AudioQueue {
    generation: Generation,
    last_rank: Option<usize>,
    next_id: u64,
    slots: FnvHashMap<SlotId, SlotState>,
}

impl AudioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn active(&self) -> usize {
        self.slots.len()
    }

    pub fn last_rank(&self) -> Option<usize> {
        self.last_rank
    }

    /// Start a new generation. Returns the pending slots that now belong to a
    /// stale selection so their fetches can be cancelled; they stay counted
    /// until released.
    pub fn advance_generation(&mut self) -> Vec<SlotId> {
        self.generation = Generation(self.generation.0 + 1);
        self.last_rank = None;
        let current = self.generation;
        let mut stale: Vec<SlotId> = self
            .slots
            .iter()
            .filter_map(|(id, s)| match s {
                SlotState::Pending(g) if *g != current => Some(*id),
                _ => None,
            })
            .collect();
        stale.sort_by_key(|id| id.0);
        stale
    }

    /// Reserve the next candidate if `generation` is current and a slot is free.
    pub fn enqueue_next(
        &mut self,
        generation: Generation,
        candidates: &[Neighbor],
        max_simultaneous: usize,
    ) -> Option<SlotTicket> {
        if generation != self.generation || candidates.is_empty() {
            return None;
        }
        if self.active() >= max_simultaneous.min(candidates.len()) {
            return None;
        }
        let rank = self.last_rank.map_or(0, |r| (r + 1) % candidates.len());
        self.last_rank = Some(rank);
        let id = SlotId(self.next_id);
        self.next_id += 1;
        self.slots.insert(id, SlotState::Pending(generation));
        log::debug!(
            "[queue] slot {} rank {} point {} ({} active)",
            id.0,
            rank,
            candidates[rank].point.index,
            self.active()
        );
        Some(SlotTicket {
            id,
            generation,
            rank,
            point: candidates[rank].point,
        })
    }

    /// A clip for `ticket` has decoded. Returns the playback plan when the
    /// ticket is still current; a stale or unknown ticket is released instead.
    pub fn admit(&mut self, ticket: &SlotTicket, volume: f32, start_time: f64) -> Option<PlaybackPlan> {
        let current = matches!(
            self.slots.get(&ticket.id),
            Some(SlotState::Pending(g)) if *g == self.generation
        );
        if !current {
            log::debug!("[queue] discarding stale clip for slot {}", ticket.id.0);
            self.release(ticket.id);
            return None;
        }
        self.slots.insert(ticket.id, SlotState::Playing);
        Some(PlaybackPlan::new(ticket, volume, start_time))
    }

    pub fn release(&mut self, id: SlotId) -> bool {
        self.slots.remove(&id).is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GainPoint {
    pub time: f64,
    pub gain: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FadeEnvelope {
    points: SmallVec<[GainPoint; 4]>,
}

impl FadeEnvelope {
    pub fn new(start: f64, duration: f64, fade: f64, peak: f32) -> Self {
        let fade = fade.min(duration * 0.5);
        let end = start + duration;
        Self {
            points: smallvec![
                GainPoint {
                    time: start,
                    gain: CLIP_FLOOR_GAIN,
                },
                GainPoint {
                    time: start + fade,
                    gain: peak,
                },
                GainPoint {
                    time: end - fade,
                    gain: peak,
                },
                GainPoint {
                    time: end,
                    gain: CLIP_FLOOR_GAIN,
                },
            ],
        }
    }

    pub fn points(&self) -> &[GainPoint] {
        &self.points
    }

    pub fn start(&self) -> f64 {
        self.points[0].time
    }

    pub fn end(&self) -> f64 {
        self.points[self.points.len() - 1].time
    }

    pub fn gain_at(&self, t: f64) -> f32 {
        let first = self.points[0];
        if t <= first.time {
            return first.gain;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time {
                let span = b.time - a.time;
                if span <= 0.0 {
                    return b.gain;
                }
                let k = ((t - a.time) / span) as f32;
                return a.gain + (b.gain - a.gain) * k;
            }
        }
        self.points[self.points.len() - 1].gain
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackPlan {
    pub slot: SlotId,
    pub point_index: u32,
    pub position: Vec3,
    pub envelope: FadeEnvelope,
}

impl PlaybackPlan {
    fn new(ticket: &SlotTicket, volume: f32, start_time: f64) -> Self {
        Self {
            slot: ticket.id,
            point_index: ticket.point.index,
            position: Vec3::new(ticket.point.position.x, 0.0, ticket.point.position.z),
            envelope: FadeEnvelope::new(start_time, CLIP_DURATION_SEC, CLIP_FADE_SEC, volume),
        }
    }
}

pub fn clip_url(base: &str, point_index: u32) -> String {
    format!("{}{}", base, point_index)
}

/// Platform side of playback: fetch + decode, the audio clock, and starting a
/// positioned source.
#[allow(async_fn_in_trait)]
pub trait AudioBackend {
    type Clip;

    async fn load_clip(&self, slot: SlotId, url: &str) -> Result<Self::Clip, AssetError>;

    fn current_time(&self) -> f64;

    /// Start `clip` per `plan`; `on_ended` must run exactly once when the source
    /// stops. On error `on_ended` is dropped without running.
    fn start_clip(
        &self,
        clip: Self::Clip,
        plan: &PlaybackPlan,
        on_ended: Box<dyn FnOnce()>,
    ) -> Result<(), AssetError>;
}

/// Fetch, decode and start the clip for `ticket`, freeing the slot on any
/// failure or when the selection moved on while the clip was loading.
pub async fn begin_playback<B: AudioBackend>(
    queue: Rc<RefCell<AudioQueue>>,
    backend: &B,
    ticket: SlotTicket,
    base_url: &str,
    volume: f32,
) {
    let url = clip_url(base_url, ticket.point.index);
    let clip = match backend.load_clip(ticket.id, &url).await {
        Ok(c) => c,
        Err(e) => {
            log::debug!("[audio] slot {}: {}", ticket.id.0, e);
            queue.borrow_mut().release(ticket.id);
            return;
        }
    };
    let start = backend.current_time();
    let Some(plan) = queue.borrow_mut().admit(&ticket, volume, start) else {
        return;
    };
    let q = queue.clone();
    let id = ticket.id;
    let on_ended = Box::new(move || {
        q.borrow_mut().release(id);
    });
    if let Err(e) = backend.start_clip(clip, &plan, on_ended) {
        log::debug!("[audio] slot {}: {}", id.0, e);
        queue.borrow_mut().release(id);
    }
}
