use crate::audio::{AudioSlot, WebAudioBackend};
use crate::input;
use glam::Vec2;
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use wander_core::Session;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::JsCast;
use web_sys as web;

pub struct InputWiring {
    pub canvas: web::HtmlCanvasElement,
    pub session: Rc<RefCell<Session>>,
    pub audio: AudioSlot,
    pub started: Instant,
}

#[inline]
fn pointer_ndc(ev: &web::MouseEvent, canvas: &web::HtmlCanvasElement) -> Option<Vec2> {
    let rect = canvas.get_bounding_client_rect();
    input::client_to_ndc(
        Vec2::new(ev.client_x() as f32, ev.client_y() as f32),
        Vec2::new(rect.left() as f32, rect.top() as f32),
        Vec2::new(rect.width() as f32, rect.height() as f32),
    )
}

fn listen<E, F>(target: &web::EventTarget, kind: &str, handler: F)
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    if let Err(e) = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref()) {
        log::error!("[input] cannot listen for {}: {:?}", kind, e);
    }
    closure.forget();
}

pub fn wire_input_handlers(w: InputWiring) {
    let canvas_target: &web::EventTarget = w.canvas.as_ref();

    // pointermove
    {
        let session = w.session.clone();
        let canvas = w.canvas.clone();
        let started = w.started;
        listen(canvas_target, "pointermove", move |ev: web::PointerEvent| {
            if let Some(ndc) = pointer_ndc(&ev, &canvas) {
                session.borrow_mut().pointer_move(started.elapsed(), ndc);
            }
        });
    }

    // pointerdown: also the gesture that unlocks audio
    {
        let session = w.session.clone();
        let canvas = w.canvas.clone();
        let audio = w.audio.clone();
        let started = w.started;
        listen(canvas_target, "pointerdown", move |ev: web::PointerEvent| {
            WebAudioBackend::ensure_started(&audio);
            let Some(ndc) = pointer_ndc(&ev, &canvas) else {
                return;
            };
            let now = started.elapsed();
            {
                let mut s = session.borrow_mut();
                s.note_interaction(now);
                s.pointer_down(now, ndc);
            }
            let _ = canvas.set_pointer_capture(ev.pointer_id());
            ev.prevent_default();
        });
    }

    // pointerup on the window so releases outside the canvas still count
    if let Some(wnd) = web::window() {
        let session = w.session.clone();
        let canvas = w.canvas.clone();
        let started = w.started;
        listen(wnd.as_ref(), "pointerup", move |ev: web::PointerEvent| {
            session.borrow_mut().pointer_up(started.elapsed());
            let _ = canvas.release_pointer_capture(ev.pointer_id());
        });
    }

    // pointerleave
    {
        let session = w.session.clone();
        listen(canvas_target, "pointerleave", move |_ev: web::PointerEvent| {
            session.borrow_mut().pointer_leave();
        });
    }

    // wheel
    {
        let session = w.session.clone();
        let started = w.started;
        listen(canvas_target, "wheel", move |ev: web::WheelEvent| {
            let steps = input::wheel_steps(ev.delta_y());
            if steps != 0.0 {
                session.borrow_mut().wheel(started.elapsed(), steps);
            }
        });
    }
}
