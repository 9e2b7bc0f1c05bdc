use crate::audio::AudioSlot;
use crate::render;
use glam::Vec3;
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use wander_core::constants::PLANE_SEGMENTS;
use wander_core::{SceneCommand, Session};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub struct FrameContext<'a> {
    pub session: Rc<RefCell<Session>>,
    pub audio: AudioSlot,
    pub canvas: web::HtmlCanvasElement,
    pub gpu: Option<render::GpuState<'a>>,
    pub started: Instant,
    // Frames still run without a renderer so selection and audio keep working.
    pub fallback_sink: Vec<SceneCommand>,
}

impl<'a> FrameContext<'a> {
    pub fn frame(&mut self) {
        let now = self.started.elapsed();
        let (stale, pose) = {
            let mut session = self.session.borrow_mut();
            match self.gpu.as_mut() {
                Some(gpu) => {
                    gpu.resize_if_needed(self.canvas.width(), self.canvas.height());
                    let aspect = gpu.aspect();
                    session.frame(now, aspect, gpu);
                }
                None => {
                    let aspect =
                        self.canvas.width().max(1) as f32 / self.canvas.height().max(1) as f32;
                    session.frame(now, aspect, &mut self.fallback_sink);
                    self.fallback_sink.clear();
                }
            }
            (session.take_stale_slots(), session.listener())
        };

        if let Some(backend) = self.audio.borrow().as_ref() {
            backend.cancel(&stale);
            backend.set_listener(&pose);
        }

        if let Some(gpu) = self.gpu.as_mut() {
            if let Err(e) = gpu.render(now.as_secs_f32()) {
                log::warn!("[render] frame skipped: {:?}", e);
            }
        }
    }
}

pub async fn init_gpu(
    canvas: &web::HtmlCanvasElement,
    session: &Rc<RefCell<Session>>,
) -> Option<render::GpuState<'static>> {
    // leak a canvas clone to satisfy 'static lifetime for surface
    let leaked_canvas = Box::leak(Box::new(canvas.clone()));
    let (positions, heights) = {
        let s = session.borrow();
        let positions: Vec<Vec3> = s.cloud().points().iter().map(|p| p.position).collect();
        (positions, s.heightmap().plane_heights(PLANE_SEGMENTS))
    };
    match render::GpuState::new(leaked_canvas, &positions, &heights).await {
        Ok(g) => Some(g),
        Err(e) => {
            log::error!("WebGPU init error: {:?}", e);
            None
        }
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext<'static>>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    let frame_ctx_tick = frame_ctx.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_ctx_tick.borrow_mut().frame();
        request_frame(&tick_clone);
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let Some(w) = web::window() else {
        return;
    };
    if let Some(cb) = tick.borrow().as_ref() {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}
