//! Phoneme Balloons entry point
//!
//! Handles platform-specific initialization and runs the field loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_field {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::HtmlCanvasElement;

    use glam::Vec2;
    use phoneme_balloons::content::{
        ContentError, ContentPanel, DownloadTicket, LookupQuery, LookupTicket, PanelView,
        parse_activities, parse_download,
    };
    use phoneme_balloons::renderer::{LabelSprite, RenderError, RenderState, build_frame};
    use phoneme_balloons::sim::{PointerEvent, PointerKind, PointerPhase, Surface};
    use phoneme_balloons::{FieldSession, SessionEvent, Settings};

    // Bindings to the host page: services, the detail view and the text layer
    #[wasm_bindgen(inline_js = "
        export function fetch_activities(label, include_private, limit) {
            const params = new URLSearchParams({ label, includePrivate: include_private, limit });
            return fetch('/api/activities?' + params).then(r => {
                if (!r.ok) throw new Error('HTTP ' + r.status);
                return r.text();
            });
        }

        export function download_file(file_id) {
            return fetch('/api/files/' + encodeURIComponent(file_id) + '/download')
                .then(r => r.text());
        }

        export function open_url(url) {
            window.open(url, '_blank', 'noopener');
        }

        export function show_detail(label, color) {
            window.dispatchEvent(new CustomEvent('balloon-detail', { detail: { label, color } }));
        }

        export function show_upsell(label) {
            window.dispatchEvent(new CustomEvent('balloon-upsell', { detail: { label } }));
        }

        export function render_panel(json) {
            window.dispatchEvent(new CustomEvent('balloon-panel', { detail: JSON.parse(json) }));
        }

        export function draw_labels(json) {
            const layer = document.getElementById('labels');
            if (!layer) return;
            layer.innerHTML = '';
            for (const l of JSON.parse(json)) {
                const el = document.createElement('span');
                el.textContent = l.text;
                el.style.cssText = `position:absolute;left:${l.x}px;top:${l.y}px;font-size:${l.size}px;transform:translate(-50%,-50%);pointer-events:none`;
                layer.appendChild(el);
            }
        }

        export function detail_visible() {
            return !!window.balloonDetailVisible;
        }

        export function take_download_request() {
            const queue = window.balloonDownloads || [];
            return queue.length ? queue.shift() : undefined;
        }
    ")]
    extern "C" {
        fn fetch_activities(label: &str, include_private: bool, limit: u32) -> js_sys::Promise;
        fn download_file(file_id: &str) -> js_sys::Promise;
        fn open_url(url: &str);
        fn show_detail(label: &str, color: &str);
        fn show_upsell(label: &str);
        fn render_panel(json: &str);
        fn draw_labels(json: &str);
        fn detail_visible() -> bool;
        fn take_download_request() -> Option<String>;
    }

    /// Field instance holding all state
    struct Field {
        session: FieldSession,
        render_state: Option<RenderState>,
        canvas: HtmlCanvasElement,
        surface: Surface,
    }

    impl Field {
        /// Re-measure the canvas; resizes the session and the render target on change
        fn measure(&mut self) {
            let surface = measure_canvas(&self.canvas);
            if surface == self.surface {
                return;
            }
            self.surface = surface;
            let (w, h) = surface.physical_size();
            self.canvas.set_width(w);
            self.canvas.set_height(h);
            self.session.resize(surface);
            if let Some(rs) = &mut self.render_state {
                rs.resize(&surface);
            }
        }

        fn render(&mut self) {
            let Some(rs) = &mut self.render_state else {
                return;
            };
            let max_fragments = self.session.settings().max_fragments();
            let frame = build_frame(self.session.state(), max_fragments);
            match rs.render(&frame.vertices) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => rs.reconfigure(),
                Err(e) => log::warn!("Render error: {:?}", e),
            }
            draw_labels(&labels_json(&frame.labels));
        }
    }

    fn measure_canvas(canvas: &HtmlCanvasElement) -> Surface {
        let window = web_sys::window();
        let dpr = window.as_ref().map_or(1.0, |w| w.device_pixel_ratio()) as f32;
        let touch = window
            .as_ref()
            .is_some_and(|w| w.navigator().max_touch_points() > 0);
        Surface {
            width: canvas.client_width() as f32,
            height: canvas.client_height() as f32,
            dpr,
            touch,
        }
    }

    fn labels_json(labels: &[LabelSprite]) -> String {
        let items: Vec<_> = labels
            .iter()
            .map(|l| {
                serde_json::json!({
                    "text": l.text,
                    "x": l.position.x,
                    "y": l.position.y,
                    "size": l.size,
                })
            })
            .collect();
        serde_json::Value::Array(items).to_string()
    }

    fn panel_json(panel: &ContentPanel) -> String {
        let value = match panel.view() {
            PanelView::Idle => serde_json::json!({ "state": "idle" }),
            PanelView::Loading { label } => serde_json::json!({ "state": "loading", "label": label }),
            PanelView::Empty { label } => serde_json::json!({ "state": "empty", "label": label }),
            PanelView::Activities { label, records } => {
                serde_json::json!({ "state": "activities", "label": label, "activities": records })
            }
        };
        value.to_string()
    }

    fn js_error(e: JsValue) -> String {
        e.as_string().unwrap_or_else(|| format!("{:?}", e))
    }

    async fn lookup(field: Rc<RefCell<Field>>, ticket: LookupTicket, query: LookupQuery) {
        let promise = fetch_activities(&query.label, query.include_private, query.limit);
        let result = match JsFuture::from(promise).await {
            Ok(body) => match body.as_string() {
                Some(json) => parse_activities(&json),
                None => Err(ContentError::Lookup("response was not text".into())),
            },
            Err(e) => Err(ContentError::Lookup(js_error(e))),
        };
        let mut f = field.borrow_mut();
        if f.session.resolve_lookup(ticket, result) {
            render_panel(&panel_json(f.session.panel()));
        }
    }

    async fn download(field: Rc<RefCell<Field>>, ticket: DownloadTicket, file_id: String) {
        let result = match JsFuture::from(download_file(&file_id)).await {
            Ok(body) => match body.as_string() {
                Some(json) => parse_download(&json),
                None => Err(ContentError::Download("response was not text".into())),
            },
            Err(e) => Err(ContentError::Download(js_error(e))),
        };
        let events = {
            let mut f = field.borrow_mut();
            f.session.resolve_download(ticket, result);
            render_panel(&panel_json(f.session.panel()));
            f.session.drain_events()
        };
        dispatch(&field, events);
    }

    fn dispatch(field: &Rc<RefCell<Field>>, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::LookupRequested { ticket, query } => {
                    spawn_local(lookup(field.clone(), ticket, query));
                }
                SessionEvent::DownloadRequested { ticket, file_id } => {
                    spawn_local(download(field.clone(), ticket, file_id));
                }
                SessionEvent::ShowDetail { label, color, .. } => {
                    show_detail(&label, color.as_str());
                }
                SessionEvent::UpsellRequested { label } => show_upsell(&label),
                SessionEvent::Restored { id } => log::debug!("Balloon {} back in the field", id),
                SessionEvent::DownloadReady { url, .. } => open_url(&url),
            }
        }
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger already set: {}", e).into());
        }

        log::info!("Phoneme Balloons starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()
            .map_err(|_| "not a canvas")?;

        let surface = measure_canvas(&canvas);
        let (width, height) = surface.physical_size();
        canvas.set_width(width);
        canvas.set_height(height);

        let seed = js_sys::Date::now() as u64;
        let settings = Settings::load();
        let field = Rc::new(RefCell::new(Field {
            session: FieldSession::new(settings, seed, surface),
            render_state: None,
            canvas: canvas.clone(),
            surface,
        }));

        // The field still runs (and stays interactive) without a GPU
        match init_renderer(&canvas, &surface).await {
            Ok(rs) => field.borrow_mut().render_state = Some(rs),
            Err(e) => log::error!("Renderer unavailable: {}", e),
        }

        setup_pointer_handlers(&canvas, field.clone());
        setup_lifecycle_handlers(field.clone());

        request_animation_frame(field);

        log::info!("Phoneme Balloons running (seed {})", seed);
        Ok(())
    }

    async fn init_renderer(
        canvas: &HtmlCanvasElement,
        surface: &Surface,
    ) -> Result<RenderState, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });
        let gpu_surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&gpu_surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);
        RenderState::new(gpu_surface, &adapter, surface).await
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, field: Rc<RefCell<Field>>) {
        let phases = [
            ("pointerdown", PointerPhase::Down),
            ("pointermove", PointerPhase::Move),
            ("pointerup", PointerPhase::Up),
            ("pointerleave", PointerPhase::Leave),
            ("pointercancel", PointerPhase::Leave),
        ];
        for (name, phase) in phases {
            let field = field.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::PointerEvent| {
                if phase == PointerPhase::Down {
                    event.prevent_default();
                }
                let pointer = PointerEvent::new(
                    PointerKind::from_dom(&event.pointer_type()),
                    phase,
                    Vec2::new(event.offset_x() as f32, event.offset_y() as f32),
                    event.time_stamp(),
                );
                field.borrow_mut().session.pointer(&pointer);
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_lifecycle_handlers(field: Rc<RefCell<Field>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let field = field.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let hidden = document_clone.visibility_state() == web_sys::VisibilityState::Hidden;
                field.borrow_mut().session.set_hidden(hidden);
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Resize
        {
            let field = field.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                field.borrow_mut().measure();
            });
            let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Page going away
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                field.borrow_mut().session.teardown();
            });
            let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(field: Rc<RefCell<Field>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            field_loop(field, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn field_loop(field: Rc<RefCell<Field>>, time: f64) {
        let events = {
            let mut f = field.borrow_mut();
            if f.session.is_torn_down() {
                log::info!("Field loop stopped");
                return;
            }
            if !f.session.is_ready() {
                f.measure();
            }
            while let Some(file_id) = take_download_request() {
                f.session.request_download(&file_id);
            }
            let ticked = f.session.frame(time).is_some();
            f.session.set_detail_visible(detail_visible());
            if ticked {
                f.render();
            }
            f.session.drain_events()
        };
        dispatch(&field, events);

        request_animation_frame(field);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_field::run().await
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Phoneme Balloons (native) starting...");
    log::info!("Native mode runs a headless session - serve the web build for the canvas");

    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Drive one session without a browser: pop a balloon, answer its lookup,
/// open and close the detail view.
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use phoneme_balloons::consts::NOMINAL_FRAME_MS;
    use phoneme_balloons::content::parse_activities;
    use phoneme_balloons::sim::{PointerEvent, Surface};
    use phoneme_balloons::{FieldSession, SessionEvent, Settings};

    let mut session = FieldSession::new(Settings::load(), 7, Surface::new(1280.0, 720.0));
    let mut now = 0.0;
    session.frame(now);

    let Some(target) = session
        .state()
        .balloons
        .first()
        .map(|b| (b.id, b.display_pos()))
    else {
        log::error!("Field is empty");
        return;
    };
    log::info!("Double tapping balloon {} at {:?}", target.0, target.1);

    for (dt, down) in [(0.0, true), (40.0, false), (150.0, true), (190.0, false)] {
        let event = if down {
            PointerEvent::down(target.1, now + dt)
        } else {
            PointerEvent::up(target.1, now + dt)
        };
        session.pointer(&event);
    }

    for _ in 0..90 {
        now += NOMINAL_FRAME_MS;
        if let Some(report) = session.frame(now) {
            if report.pops > 0 {
                log::info!("{} fragments in flight", session.state().fragments.len());
            }
        }
        for event in session.drain_events() {
            match event {
                SessionEvent::LookupRequested { ticket, query } => {
                    log::info!("Lookup for '{}' (limit {})", query.label, query.limit);
                    let body = r#"[{"id": "demo", "name": "Warm-up sounds"}]"#;
                    session.resolve_lookup(ticket, parse_activities(body));
                }
                SessionEvent::ShowDetail { label, .. } => {
                    log::info!("Detail view opened for '{}'", label);
                    session.set_detail_visible(true);
                    session.set_detail_visible(false);
                }
                other => log::info!("{:?}", other),
            }
        }
    }

    log::info!(
        "Done: {} active balloons, {} fragments left, {} activities loaded",
        session.state().active_count(),
        session.state().fragments.len(),
        session.panel().activities().len()
    );
}
