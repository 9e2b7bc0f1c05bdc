use crate::overlay;
use std::cell::RefCell;
use std::rc::Rc;
use wander_core::{SettingAdjust, SettingEffect, Session};
use wasm_bindgen::JsCast;
use web_sys as web;

pub fn handle_global_keydown(
    ev: &web::KeyboardEvent,
    session: &Rc<RefCell<Session>>,
    document: &web::Document,
) {
    let key = ev.key();
    if key == "h" || key == "H" {
        overlay::toggle(document);
        return;
    }
    let Some(adjust) = SettingAdjust::from_key(&key) else {
        return;
    };
    let effect = session.borrow_mut().adjust_setting(adjust);
    if effect != SettingEffect::None {
        log::debug!("[settings] {:?} -> {:?}", adjust, effect);
    }
    overlay::render(document, session.borrow().settings());
    if matches!(adjust, SettingAdjust::Volume(_)) {
        // arrow keys would otherwise scroll the page
        ev.prevent_default();
    }
}

pub fn wire_global_keydown(session: Rc<RefCell<Session>>, document: web::Document) {
    if let Some(window) = web::window() {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move |ev: web::KeyboardEvent| {
                handle_global_keydown(&ev, &session, &document);
            }) as Box<dyn FnMut(_)>);
        let _ =
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
