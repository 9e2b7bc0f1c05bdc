#![cfg(target_arch = "wasm32")]
mod audio;
mod dom;
mod events;
mod fetch;
mod frame;
mod input;
mod overlay;
mod poller;
mod render;

use anyhow::{anyhow, Context};
use audio::AudioSlot;
use instant::Instant;
use std::cell::RefCell;
use std::rc::Rc;
use wander_core::{Heightmap, PointCloud, Session, Settings};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("wander-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn load_points(url: &str) -> anyhow::Result<PointCloud> {
    let bytes = fetch::fetch_bytes(url).await?;
    let cloud = PointCloud::from_json(&bytes).with_context(|| format!("parsing {}", url))?;
    log::info!("[assets] {} points from {}", cloud.len(), url);
    Ok(cloud)
}

async fn load_heightmap(url: &str) -> anyhow::Result<Heightmap> {
    let bytes = fetch::fetch_bytes(url).await?;
    let heightmap = Heightmap::decode(&bytes).with_context(|| format!("decoding {}", url))?;
    let (w, h) = heightmap.dimensions();
    log::info!("[assets] heightmap {}x{} from {}", w, h, url);
    Ok(heightmap)
}

fn entropy_seed() -> anyhow::Result<u64> {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!(format!("getrandom: {}", e)))?;
    Ok(u64::from_le_bytes(buf))
}

async fn init() -> anyhow::Result<()> {
    let (window, document) = dom::window_document()?;
    let canvas = dom::canvas_by_id(&document, "app-canvas")?;
    dom::sync_canvas_backing_size(&window, &canvas);
    dom::wire_canvas_resize(&window, &canvas);

    let overrides = dom::query_overrides(&window);
    let settings =
        Settings::default().with_overrides(overrides.iter().map(|(k, v)| (*k, v.as_str())));

    // A missing cloud is not fatal: the piece still runs with no points.
    let cloud = match load_points(&settings.points_url).await {
        Ok(c) => c,
        Err(e) => {
            log::error!("[assets] points unavailable: {:?}", e);
            PointCloud::default()
        }
    };
    let heightmap_url = settings.heightmap_url.clone();

    let seed = entropy_seed()?;
    let session = Session::new(settings, cloud, seed);
    overlay::render(&document, session.settings());
    let session = Rc::new(RefCell::new(session));
    let session_for_terrain = session.clone();

    let gpu = frame::init_gpu(&canvas, &session).await;
    let audio: AudioSlot = Rc::new(RefCell::new(None));
    let started = Instant::now();

    events::wire_input_handlers(events::InputWiring {
        canvas: canvas.clone(),
        session: session.clone(),
        audio: audio.clone(),
        started,
    });
    events::wire_global_keydown(session.clone(), document.clone());

    let poller = Rc::new(RefCell::new(Some(poller::QueuePoller::start(
        session.clone(),
        audio.clone(),
    ))));
    {
        // The poll task ends with the page.
        let poller = poller.clone();
        let closure = Closure::wrap(Box::new(move || {
            poller.borrow_mut().take();
        }) as Box<dyn FnMut()>);
        window
            .add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref())
            .ok();
        closure.forget();
    }

    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
        session,
        audio,
        canvas,
        gpu,
        started,
        fallback_sink: Vec::new(),
    }));
    frame::start_loop(frame_ctx);
    log::info!("[init] running");

    // Terrain stays flat until the heightmap arrives.
    spawn_local(async move {
        match load_heightmap(&heightmap_url).await {
            Ok(h) => session_for_terrain.borrow_mut().set_heightmap(h),
            Err(e) => log::warn!("[assets] heightmap unavailable, using flat terrain: {:?}", e),
        }
    });
    Ok(())
}
