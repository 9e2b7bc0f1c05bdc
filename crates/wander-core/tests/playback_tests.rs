// Host-side tests for the playback driver with a scripted audio backend.

use glam::Vec3;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use wander_core::{
    begin_playback, AssetError, AudioBackend, AudioQueue, CloudPoint, Neighbor, PlaybackPlan,
    SlotId,
};

const BASE: &str = "https://audio.test/clips/";

#[derive(Default)]
struct ScriptedBackend {
    missing: HashSet<u32>,
    now: Cell<f64>,
    loads: RefCell<Vec<String>>,
    started: RefCell<Vec<PlaybackPlan>>,
    endings: RefCell<Vec<Box<dyn FnOnce()>>>,
    // Simulates a new selection landing while a clip is loading.
    reselect_during_load: Option<Rc<RefCell<AudioQueue>>>,
}

impl ScriptedBackend {
    fn finish_all(&self) {
        for end in self.endings.borrow_mut().drain(..) {
            end();
        }
    }
}

impl AudioBackend for ScriptedBackend {
    type Clip = String;

    async fn load_clip(&self, _slot: SlotId, url: &str) -> Result<String, AssetError> {
        self.loads.borrow_mut().push(url.to_string());
        if let Some(queue) = &self.reselect_during_load {
            queue.borrow_mut().advance_generation();
        }
        let index: u32 = url
            .trim_start_matches(BASE)
            .parse()
            .map_err(|_| AssetError::Decode(url.to_string()))?;
        if self.missing.contains(&index) {
            return Err(AssetError::Fetch {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(url.to_string())
    }

    fn current_time(&self) -> f64 {
        self.now.get()
    }

    fn start_clip(
        &self,
        _clip: String,
        plan: &PlaybackPlan,
        on_ended: Box<dyn FnOnce()>,
    ) -> Result<(), AssetError> {
        self.started.borrow_mut().push(plan.clone());
        self.endings.borrow_mut().push(on_ended);
        Ok(())
    }
}

fn candidates(n: u32) -> Vec<Neighbor> {
    (0..n)
        .map(|i| Neighbor {
            point: CloudPoint {
                index: 100 + i,
                position: Vec3::new(i as f32, 0.5, 2.0),
            },
            distance: 0.0,
        })
        .collect()
}

#[test]
fn successful_clip_plays_then_frees_its_slot() {
    let queue = Rc::new(RefCell::new(AudioQueue::new()));
    let backend = ScriptedBackend::default();
    backend.now.set(3.0);
    let c = candidates(3);
    let ticket = {
        let mut q = queue.borrow_mut();
        let g = q.generation();
        q.enqueue_next(g, &c, 5).unwrap()
    };
    pollster::block_on(begin_playback(queue.clone(), &backend, ticket, BASE, 0.4));

    assert_eq!(
        *backend.loads.borrow(),
        vec!["https://audio.test/clips/100".to_string()]
    );
    let started = backend.started.borrow();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].position, Vec3::new(0.0, 0.0, 2.0));
    assert_eq!(started[0].envelope.start(), 3.0);
    assert_eq!(started[0].envelope.end(), 8.0);
    assert!((started[0].envelope.gain_at(5.0) - 0.4).abs() < 1e-6);
    drop(started);
    assert_eq!(queue.borrow().active(), 1);

    backend.finish_all();
    assert_eq!(queue.borrow().active(), 0);
}

#[test]
fn fetch_failure_frees_the_slot_without_retry() {
    let queue = Rc::new(RefCell::new(AudioQueue::new()));
    let backend = ScriptedBackend {
        missing: [100].into_iter().collect(),
        ..Default::default()
    };
    let c = candidates(2);
    let ticket = {
        let mut q = queue.borrow_mut();
        let g = q.generation();
        q.enqueue_next(g, &c, 5).unwrap()
    };
    assert_eq!(queue.borrow().active(), 1);
    pollster::block_on(begin_playback(queue.clone(), &backend, ticket, BASE, 0.5));
    assert_eq!(queue.borrow().active(), 0);
    assert_eq!(backend.loads.borrow().len(), 1);
    assert!(backend.started.borrow().is_empty());

    // the next poll moves on to the following candidate
    let g = queue.borrow().generation();
    let next = queue.borrow_mut().enqueue_next(g, &c, 5).unwrap();
    assert_eq!(next.rank, 1);
}

#[test]
fn clip_decoded_after_reselection_is_discarded() {
    let queue = Rc::new(RefCell::new(AudioQueue::new()));
    let backend = ScriptedBackend {
        reselect_during_load: Some(queue.clone()),
        ..Default::default()
    };
    let c = candidates(2);
    let ticket = {
        let mut q = queue.borrow_mut();
        let g = q.generation();
        q.enqueue_next(g, &c, 5).unwrap()
    };
    pollster::block_on(begin_playback(queue.clone(), &backend, ticket, BASE, 0.5));
    assert!(backend.started.borrow().is_empty());
    assert_eq!(queue.borrow().active(), 0);
}

#[test]
fn stale_generation_enqueue_is_a_no_op() {
    let mut queue = AudioQueue::new();
    let c = candidates(4);
    let old = queue.generation();
    queue.advance_generation();
    assert!(queue.enqueue_next(old, &c, 5).is_none());
    assert_eq!(queue.active(), 0);
    assert_eq!(queue.last_rank(), None);
}

#[test]
fn active_slots_never_exceed_cap() {
    let queue = Rc::new(RefCell::new(AudioQueue::new()));
    let backend = ScriptedBackend::default();
    let c = candidates(10);
    for _ in 0..3 {
        let ticket = {
            let mut q = queue.borrow_mut();
            let g = q.generation();
            q.enqueue_next(g, &c, 3).unwrap()
        };
        pollster::block_on(begin_playback(queue.clone(), &backend, ticket, BASE, 0.5));
    }
    let g = queue.borrow().generation();
    assert!(queue.borrow_mut().enqueue_next(g, &c, 3).is_none());
    assert_eq!(queue.borrow().active(), 3);

    backend.finish_all();
    assert_eq!(queue.borrow().active(), 0);
    let ranks: Vec<u32> = backend
        .started
        .borrow()
        .iter()
        .map(|p| p.point_index)
        .collect();
    assert_eq!(ranks, vec![100, 101, 102]);
    let again = queue.borrow_mut().enqueue_next(g, &c, 3).unwrap();
    assert_eq!(again.rank, 3);
}
