use crate::audio::AudioSlot;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use wander_core::{begin_playback, Session};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

/// Repeating audio-queue tick. Each firing tries to reserve one slot and
/// re-arms itself with the interval from the current settings. Dropping the
/// poller clears the pending timeout.
pub struct QueuePoller {
    inner: Rc<PollerInner>,
}

struct PollerInner {
    session: Rc<RefCell<Session>>,
    audio: AudioSlot,
    timeout: Cell<Option<i32>>,
    tick: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl QueuePoller {
    pub fn start(session: Rc<RefCell<Session>>, audio: AudioSlot) -> Self {
        let inner = Rc::new(PollerInner {
            session,
            audio,
            timeout: Cell::new(None),
            tick: RefCell::new(None),
        });
        let weak: Weak<PollerInner> = Rc::downgrade(&inner);
        *inner.tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.fire();
            }
        }) as Box<dyn FnMut()>));
        inner.arm();
        Self { inner }
    }
}

impl Drop for QueuePoller {
    fn drop(&mut self) {
        if let Some(id) = self.inner.timeout.take() {
            if let Some(w) = web::window() {
                w.clear_timeout_with_handle(id);
            }
        }
        log::info!("[queue] poller stopped");
    }
}

impl PollerInner {
    fn arm(&self) {
        let interval = self.session.borrow().settings().queue_poll_interval();
        let Some(window) = web::window() else {
            return;
        };
        let tick = self.tick.borrow();
        let Some(callback) = tick.as_ref() else {
            return;
        };
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            interval.as_millis() as i32,
        ) {
            Ok(id) => self.timeout.set(Some(id)),
            Err(e) => log::error!("[queue] setTimeout failed: {:?}", e),
        }
    }

    fn fire(&self) {
        self.timeout.set(None);
        self.poll();
        self.arm();
    }

    fn poll(&self) {
        // No context until the first gesture; nothing is reserved meanwhile.
        let Some(backend) = self.audio.borrow().clone() else {
            return;
        };
        let (ticket, queue, base_url, volume) = {
            let session = self.session.borrow();
            let Some(ticket) = session.poll_queue() else {
                return;
            };
            let settings = session.settings();
            (
                ticket,
                session.audio_queue(),
                settings.audio_base_url.clone(),
                settings.volume,
            )
        };
        spawn_local(async move {
            begin_playback(queue, backend.as_ref(), ticket, &base_url, volume).await;
        });
    }
}
