use std::cell::{Cell, RefCell};
use std::future::Future;

use gloo::events::EventListener;
use nurie_core::catalog::COURSE_CATALOG;
use nurie_core::{AssetError, AssetSource, EventOutcome, Feedback, PuzzleConfig, Session, SessionError};
use nurie_raster::ResvgBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, HtmlSelectElement, MouseEvent};

use crate::audio::WebAudio;
use crate::fetch::{FetchAssets, fetch_bytes, js_reason};
use crate::view;

pub(crate) type WebSession = Session<FetchAssets, ResvgBackend, WebAudio, StdRng>;

const CONFIG_PATH: &str = "config.json";

thread_local! {
    // Taken out while an async step runs; page input is disabled meanwhile.
    static SESSION: RefCell<Option<WebSession>> = RefCell::new(None);
    static AUDIO: RefCell<Option<WebAudio>> = RefCell::new(None);
    static PENDING_UNLOCK: Cell<bool> = Cell::new(false);
    static LISTENERS: RefCell<Vec<EventListener>> = RefCell::new(Vec::new());
}

pub(crate) fn run() {
    wasm_bindgen_futures::spawn_local(async {
        let config = load_config().await;
        start(config).await;
    });
}

async fn load_config() -> PuzzleConfig {
    let mut config = match FetchAssets.fetch_text(CONFIG_PATH).await {
        Ok(text) => match PuzzleConfig::from_json(&text) {
            Ok(config) => config,
            Err(err) => {
                gloo::console::warn!(format!("{CONFIG_PATH} ignored: {err}"));
                PuzzleConfig::default()
            }
        },
        Err(AssetError::NotFound { .. }) => PuzzleConfig::default(),
        Err(err) => {
            gloo::console::warn!(format!("{err}"));
            PuzzleConfig::default()
        }
    };
    if let Some(width) = view::working_display_px() {
        config.display_px = width;
    }
    config
}

async fn start(config: PuzzleConfig) {
    let audio = WebAudio::default();
    AUDIO.with(|slot| *slot.borrow_mut() = Some(audio.clone()));
    view::set_busy(true);
    let engine = ResvgBackend::with_font_data(load_fonts(&config.fonts).await);
    let mut session = Session::new(config, FetchAssets, engine, audio, seeded_rng());

    populate_courses();
    attach_listeners();

    if let Err(err) = session.select_random_course().await {
        report_error(&err);
    }
    sync_course_select(session.course());
    view::render(&session);
    put_back(session);
}

async fn load_fonts(urls: &[String]) -> Vec<Vec<u8>> {
    let mut fonts = Vec::new();
    for url in urls {
        match fetch_bytes(url).await {
            Ok(data) => fonts.push(data),
            Err(err) => gloo::console::warn!(format!("font {url} skipped: {}", js_reason(&err))),
        }
    }
    fonts
}

fn seeded_rng() -> StdRng {
    let seed = (js_sys::Math::random() * u64::MAX as f64) as u64;
    StdRng::seed_from_u64(seed ^ js_sys::Date::now() as u64)
}

/// Runs `step` on the session unless another step still holds it. Input is
/// held off until the session is back in its slot.
fn with_session<F, Fut>(label: &'static str, step: F)
where
    F: FnOnce(WebSession) -> Fut + 'static,
    Fut: Future<Output = WebSession> + 'static,
{
    let Some(session) = SESSION.with(|slot| slot.borrow_mut().take()) else {
        gloo::console::log!(format!("{label}: busy, ignored"));
        return;
    };
    view::set_busy(true);
    wasm_bindgen_futures::spawn_local(async move {
        let session = step(session).await;
        put_back(session);
    });
}

fn put_back(mut session: WebSession) {
    if PENDING_UNLOCK.with(|pending| pending.replace(false)) {
        wasm_bindgen_futures::spawn_local(async move {
            session.user_input().await;
            put_back(session);
        });
        return;
    }
    SESSION.with(|slot| *slot.borrow_mut() = Some(session));
    view::set_busy(false);
}

fn populate_courses() {
    let (Some(doc), Some(select)) = (view::document(), view::by_id("course")) else {
        return;
    };
    if select.child_element_count() > 0 {
        return;
    }
    for entry in COURSE_CATALOG {
        let Ok(option) = doc.create_element("option") else {
            continue;
        };
        let _ = option.set_attribute("value", entry.slug);
        option.set_text_content(Some(entry.label));
        let _ = select.append_child(&option);
    }
}

fn sync_course_select(course: Option<&str>) {
    let Some(select) = view::by_id("course").and_then(|node| node.dyn_into::<HtmlSelectElement>().ok())
    else {
        return;
    };
    if let Some(course) = course {
        select.set_value(course);
    }
}

fn attach_listeners() {
    let Some(doc) = view::document() else {
        return;
    };
    let mut listeners = Vec::new();

    for event in ["pointerdown", "keydown"] {
        listeners.push(EventListener::once(&doc, event, |_| unlock_audio()));
    }

    if let Some(select) = view::by_id("course") {
        listeners.push(EventListener::new(&select, "change", |event| {
            let Some(slug) = event
                .target()
                .and_then(|target| target.dyn_into::<HtmlSelectElement>().ok())
                .map(|select| select.value())
            else {
                return;
            };
            with_session("course", move |mut session| async move {
                if let Err(err) = session.select_course(&slug).await.map(|_| ()) {
                    report_error(&err);
                }
                view::render(&session);
                session
            });
        }));
    }

    if let Some(button) = view::by_id("startButton") {
        listeners.push(EventListener::new(&button, "click", |_| {
            with_session("next", |mut session| async move {
                if let Err(err) = session.next_problem().await.map(|_| ()) {
                    report_error(&err);
                }
                view::render(&session);
                session
            });
        }));
    }

    if let Some(panel) = view::by_id("colorPanel") {
        listeners.push(EventListener::new(&panel, "click", |event| {
            let Some(index) = event_element(event).and_then(|target| view::swatch_index(&target)) else {
                return;
            };
            with_session("swatch", move |mut session| async move {
                apply(&session.select_swatch(index).await, &session);
                session
            });
        }));
    }

    if let Some(container) = view::icon_container(view::WORKING_SLOT) {
        listeners.push(EventListener::new(&container, "click", |event| {
            let Some(target) = event_element(event).and_then(|target| view::node_for(&target)) else {
                return;
            };
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let (client_x, client_y) = (f64::from(mouse.client_x()), f64::from(mouse.client_y()));
            with_session("paint", move |mut session| async move {
                let layout = session.problem().and_then(|problem| problem.layout());
                let point = view::canvas_point(layout, client_x, client_y);
                apply(&session.activate(target, point).await, &session);
                session
            });
        }));
    }

    LISTENERS.with(|slot| slot.borrow_mut().extend(listeners));
}

fn unlock_audio() {
    AUDIO.with(|slot| {
        if let Some(audio) = slot.borrow().as_ref() {
            audio.resume();
        }
    });
    let Some(mut session) = SESSION.with(|slot| slot.borrow_mut().take()) else {
        PENDING_UNLOCK.with(|pending| pending.set(true));
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        session.user_input().await;
        put_back(session);
    });
}

fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn apply(result: &Result<Feedback, SessionError>, session: &WebSession) {
    let feedback = match result {
        Ok(feedback) => feedback,
        Err(err) => {
            report_error(err);
            return;
        }
    };
    let redraw = match &feedback.outcome {
        EventOutcome::Painted { .. } => view::render_working(session),
        EventOutcome::SwatchChanged { .. } => match session.problem() {
            Some(problem) => view::render_palette(problem.palette()),
            None => Ok(()),
        },
        EventOutcome::Ignored => Ok(()),
    };
    if let Err(err) = redraw {
        gloo::console::error!("redraw failed", err);
    }
    if let Some(score) = feedback.score {
        view::render_score(score);
    }
}

fn report_error(err: &SessionError) {
    gloo::console::error!(format!("{err}"));
}
