use wander_core::Settings;
use web_sys as web;

const HINT_ID: &str = "hint";

pub fn hint_text(settings: &Settings) -> String {
    format!(
        "auto-rotate {} [a]  ·  voices {} [ ]  ·  search limit {} , .  ·  search scale {:.1} - =  ·  volume {:.2} ↑ ↓  ·  [h] hide",
        if settings.auto_rotate { "on" } else { "off" },
        settings.max_simultaneous,
        settings.search_limit,
        settings.search_scale,
        settings.volume
    )
}

pub fn render(document: &web::Document, settings: &Settings) {
    if let Some(el) = document.get_element_by_id(HINT_ID) {
        el.set_text_content(Some(&hint_text(settings)));
    }
}

#[inline]
pub fn is_hidden(document: &web::Document) -> bool {
    document
        .get_element_by_id(HINT_ID)
        .and_then(|el| el.get_attribute("style"))
        .map(|s| s.contains("display:none"))
        .unwrap_or(false)
}

#[inline]
pub fn toggle(document: &web::Document) {
    if let Some(el) = document.get_element_by_id(HINT_ID) {
        let style = if is_hidden(document) { "" } else { "display:none" };
        let _ = el.set_attribute("style", style);
    }
}
