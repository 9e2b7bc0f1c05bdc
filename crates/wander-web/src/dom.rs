use crate::input;
use anyhow::{anyhow, Context};
use wander_core::OVERRIDE_KEYS;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

pub fn window_document() -> anyhow::Result<(web::Window, web::Document)> {
    let window = web::window().context("no window")?;
    let document = window.document().context("no document")?;
    Ok((window, document))
}

pub fn canvas_by_id(document: &web::Document, id: &str) -> anyhow::Result<web::HtmlCanvasElement> {
    document
        .get_element_by_id(id)
        .with_context(|| format!("missing #{}", id))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow!(format!("#{} is not a canvas: {:?}", id, e)))
}

/// Keep the canvas backing store at CSS size * devicePixelRatio.
pub fn sync_canvas_backing_size(window: &web::Window, canvas: &web::HtmlCanvasElement) {
    let rect = canvas.get_bounding_client_rect();
    let (w, h) = input::backing_size(rect.width(), rect.height(), window.device_pixel_ratio());
    if canvas.width() != w {
        canvas.set_width(w);
    }
    if canvas.height() != h {
        canvas.set_height(h);
    }
}

pub fn wire_canvas_resize(window: &web::Window, canvas: &web::HtmlCanvasElement) {
    let canvas = canvas.clone();
    let closure = Closure::wrap(Box::new(move || {
        if let Some(w) = web::window() {
            sync_canvas_backing_size(&w, &canvas);
        }
    }) as Box<dyn FnMut()>);
    window
        .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
        .ok();
    closure.forget();
}

/// Settings overrides from the page query string, e.g. `?volume=0.3`.
pub fn query_overrides(window: &web::Window) -> Vec<(&'static str, String)> {
    let search = match window.location().search() {
        Ok(s) if !s.is_empty() => s,
        _ => return Vec::new(),
    };
    let Ok(params) = web::UrlSearchParams::new_with_str(&search) else {
        log::warn!("[settings] unreadable query string {}", search);
        return Vec::new();
    };
    OVERRIDE_KEYS
        .iter()
        .filter_map(|key| params.get(key).map(|v| (*key, v)))
        .collect()
}
