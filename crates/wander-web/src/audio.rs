use crate::fetch;
use fnv::FnvHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use wander_core::constants::{PANNER_MAX_DISTANCE, PANNER_REF_DISTANCE, PANNER_ROLLOFF};
use wander_core::{AssetError, AudioBackend, ListenerPose, PlaybackPlan, SlotId};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// The audio backend once the first gesture has created the context.
pub type AudioSlot = Rc<RefCell<Option<Rc<WebAudioBackend>>>>;

fn graph_error(e: JsValue) -> AssetError {
    AssetError::Graph(format!("{:?}", e))
}

/// WebAudio playback: fetch with per-slot abort, decode, and a
/// source -> gain -> panner chain per clip.
pub struct WebAudioBackend {
    ctx: web::AudioContext,
    inflight: RefCell<FnvHashMap<SlotId, web::AbortController>>,
}

impl WebAudioBackend {
    pub fn new() -> anyhow::Result<Self> {
        let ctx = web::AudioContext::new()
            .map_err(|e| anyhow::anyhow!(format!("AudioContext error: {:?}", e)))?;
        Ok(Self {
            ctx,
            inflight: RefCell::new(FnvHashMap::default()),
        })
    }

    /// Create the backend on the first user gesture, or resume a suspended one.
    pub fn ensure_started(slot: &AudioSlot) {
        if let Some(backend) = slot.borrow().as_ref() {
            if backend.ctx.state() == web::AudioContextState::Suspended {
                let _ = backend.ctx.resume();
            }
            return;
        }
        match Self::new() {
            Ok(backend) => {
                log::info!(
                    "[audio] context started at {} Hz",
                    backend.ctx.sample_rate()
                );
                *slot.borrow_mut() = Some(Rc::new(backend));
            }
            Err(e) => log::error!("{:?}", e),
        }
    }

    /// Abort the fetches of slots whose selection went stale.
    pub fn cancel(&self, slots: &[SlotId]) {
        let mut inflight = self.inflight.borrow_mut();
        for id in slots {
            if let Some(controller) = inflight.remove(id) {
                log::debug!("[audio] aborting fetch for slot {}", id.0);
                controller.abort();
            }
        }
    }

    pub fn set_listener(&self, pose: &ListenerPose) {
        let listener = self.ctx.listener();
        let p = pose.position;
        listener.set_position(p.x as f64, p.y as f64, p.z as f64);
        let (f, u) = (pose.forward, pose.up);
        let _ = listener.set_orientation(
            f.x as f64, f.y as f64, f.z as f64, u.x as f64, u.y as f64, u.z as f64,
        );
    }

    fn panner(&self, plan: &PlaybackPlan) -> Result<web::PannerNode, AssetError> {
        let panner = web::PannerNode::new(&self.ctx).map_err(graph_error)?;
        panner.set_panning_model(web::PanningModelType::Hrtf);
        panner.set_distance_model(web::DistanceModelType::Linear);
        panner.set_ref_distance(PANNER_REF_DISTANCE);
        panner.set_max_distance(PANNER_MAX_DISTANCE);
        panner.set_rolloff_factor(PANNER_ROLLOFF);
        let p = plan.position;
        panner.set_position(p.x as f64, p.y as f64, p.z as f64);
        Ok(panner)
    }

    fn envelope_gain(&self, plan: &PlaybackPlan) -> Result<web::GainNode, AssetError> {
        let gain = web::GainNode::new(&self.ctx).map_err(graph_error)?;
        let param = gain.gain();
        let mut points = plan.envelope.points().iter();
        if let Some(first) = points.next() {
            param
                .set_value_at_time(first.gain, first.time)
                .map_err(graph_error)?;
        }
        for p in points {
            param
                .linear_ramp_to_value_at_time(p.gain, p.time)
                .map_err(graph_error)?;
        }
        Ok(gain)
    }
}

impl AudioBackend for WebAudioBackend {
    type Clip = web::AudioBuffer;

    async fn load_clip(&self, slot: SlotId, url: &str) -> Result<web::AudioBuffer, AssetError> {
        let controller = web::AbortController::new().map_err(graph_error)?;
        let signal = controller.signal();
        self.inflight.borrow_mut().insert(slot, controller);
        let fetched = fetch::fetch_array_buffer(url, Some(&signal)).await;
        self.inflight.borrow_mut().remove(&slot);
        let bytes = fetched?;

        let promise = self
            .ctx
            .decode_audio_data(&bytes)
            .map_err(|e| AssetError::Decode(format!("{:?}", e)))?;
        let decoded = JsFuture::from(promise)
            .await
            .map_err(|e| AssetError::Decode(format!("{:?}", e)))?;
        decoded
            .dyn_into::<web::AudioBuffer>()
            .map_err(|_| AssetError::Decode(format!("{} did not decode to a buffer", url)))
    }

    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn start_clip(
        &self,
        clip: web::AudioBuffer,
        plan: &PlaybackPlan,
        on_ended: Box<dyn FnOnce()>,
    ) -> Result<(), AssetError> {
        let panner = self.panner(plan)?;
        let gain = self.envelope_gain(plan)?;
        let source = web::AudioBufferSourceNode::new(&self.ctx).map_err(graph_error)?;
        source.set_buffer(Some(&clip));

        source.connect_with_audio_node(&gain).map_err(graph_error)?;
        gain.connect_with_audio_node(&panner).map_err(graph_error)?;
        panner
            .connect_with_audio_node(&self.ctx.destination())
            .map_err(graph_error)?;

        let ended = Closure::once_into_js(move || on_ended());
        source.set_onended(Some(ended.unchecked_ref()));
        source
            .start_with_when(plan.envelope.start())
            .map_err(graph_error)?;
        source
            .stop_with_when(plan.envelope.end())
            .map_err(graph_error)?;
        log::debug!(
            "[audio] slot {} playing point {} at ({:.2}, {:.2})",
            plan.slot.0,
            plan.point_index,
            plan.position.x,
            plan.position.z
        );
        Ok(())
    }
}
