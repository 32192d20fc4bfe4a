use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, Element, EventTarget, HtmlElement, Storage, Window};

use crate::theme::{ThemeHost, ThemeManager, ICON_CLASS, STORAGE_KEY, THEME_ATTRIBUTE, TOGGLE_ID};
use crate::viewport::{ViewportEvent, ViewportHost, ViewportManager};

const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

pub fn dark_mode(window: &Window) -> Result<bool, JsValue> {
    Ok(window
        .match_media(DARK_QUERY)?
        .map(|q| q.matches())
        .unwrap_or(false))
}

/// Installs both managers on the current document.
pub fn install() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    install_theme(&window, &document)?;
    install_viewport(&window, &document)?;
    tracing::info!("page chrome installed");
    Ok(())
}

fn listen(
    target: &EventTarget,
    event: &str,
    passive: bool,
    handler: impl FnMut(web_sys::Event) + 'static,
) -> Result<(), JsValue> {
    let callback = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
    let options = AddEventListenerOptions::new();
    options.set_passive(passive);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.as_ref().unchecked_ref(),
        &options,
    )?;
    // listeners live as long as the page
    callback.forget();
    Ok(())
}

pub struct WebThemeHost {
    window: Window,
    body: Option<HtmlElement>,
    icon: Option<Element>,
    storage: Option<Storage>,
}

impl WebThemeHost {
    pub fn new(window: &Window, document: &Document) -> Self {
        let storage = window.local_storage().unwrap_or_else(|e| {
            tracing::warn!("local storage unavailable: {e:?}");
            None
        });
        let icon = document
            .get_elements_by_class_name(ICON_CLASS)
            .item(0);
        if icon.is_none() {
            tracing::warn!("no .{ICON_CLASS} element");
        }
        WebThemeHost {
            window: window.clone(),
            body: document.body(),
            icon,
            storage,
        }
    }
}

impl ThemeHost for WebThemeHost {
    fn stored(&self) -> Option<String> {
        let storage = self.storage.as_ref()?;
        storage.get_item(STORAGE_KEY).unwrap_or_else(|e| {
            tracing::warn!("failed to read {STORAGE_KEY:?}: {e:?}");
            None
        })
    }

    fn store(&mut self, theme: &str) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.set_item(STORAGE_KEY, theme) {
            tracing::warn!("failed to persist theme: {e:?}");
        }
    }

    fn prefers_dark(&self) -> bool {
        dark_mode(&self.window).unwrap_or_else(|e| {
            tracing::warn!("{DARK_QUERY} failed: {e:?}");
            false
        })
    }

    fn applied(&self) -> Option<String> {
        self.body.as_ref()?.get_attribute(THEME_ATTRIBUTE)
    }

    fn apply(&mut self, theme: &str) {
        let Some(body) = &self.body else {
            tracing::warn!("no body to apply theme to");
            return;
        };
        if let Err(e) = body.set_attribute(THEME_ATTRIBUTE, theme) {
            tracing::warn!("failed to set {THEME_ATTRIBUTE}: {e:?}");
        }
    }

    fn set_icon_class(&mut self, class: &str) {
        if let Some(icon) = &self.icon {
            icon.set_class_name(class);
        }
    }
}

fn install_theme(window: &Window, document: &Document) -> Result<(), JsValue> {
    let host = WebThemeHost::new(window, document);
    let manager = Rc::new(RefCell::new(ThemeManager::initialize(host)));

    match document.get_element_by_id(TOGGLE_ID) {
        Some(toggle) => {
            let manager = manager.clone();
            listen(&toggle, "click", true, move |_| {
                manager.borrow_mut().toggle_theme();
            })?;
        }
        None => tracing::warn!("no #{TOGGLE_ID} toggle control"),
    }

    if let Some(query) = window.match_media(DARK_QUERY)? {
        let q = query.clone();
        listen(&query, "change", true, move |_| {
            manager.borrow_mut().system_changed(q.matches());
        })?;
    }
    Ok(())
}

pub struct WebViewportHost {
    window: Window,
    root: Option<HtmlElement>,
}

impl ViewportHost for WebViewportHost {
    type Node = Element;

    fn inner_size(&self) -> Option<(f64, f64)> {
        let width = self.window.inner_width().ok()?.as_f64()?;
        let height = self.window.inner_height().ok()?.as_f64()?;
        Some((width, height))
    }

    fn set_property(&mut self, name: &str, value: &str) {
        let Some(root) = &self.root else {
            return;
        };
        if let Err(e) = root.style().set_property(name, value) {
            tracing::warn!("failed to set {name}: {e:?}");
        }
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }
}

type SharedViewport = Rc<RefCell<ViewportManager<WebViewportHost>>>;

/// Feeds `name` events to the manager as `event` and carries out its reaction.
fn listen_viewport(
    manager: &SharedViewport,
    window: &Window,
    target: &EventTarget,
    name: &str,
    passive: bool,
    event: fn(&web_sys::Event) -> ViewportEvent<Element>,
) -> Result<(), JsValue> {
    let manager = manager.clone();
    let window = window.clone();
    listen(target, name, passive, move |e| {
        let reaction = manager.borrow_mut().handle(event(&e));
        if reaction.prevent_default {
            e.prevent_default();
        }
        if let Some(delay) = reaction.settle_after {
            let manager = manager.clone();
            let settle = Closure::once_into_js(move || {
                manager.borrow_mut().handle(ViewportEvent::Settled);
            });
            if let Err(e) = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(settle.unchecked_ref(), delay)
            {
                tracing::warn!("failed to schedule viewport update: {e:?}");
            }
        }
    })
}

fn install_viewport(window: &Window, document: &Document) -> Result<(), JsValue> {
    let host = WebViewportHost {
        window: window.clone(),
        root: document
            .document_element()
            .and_then(|e| e.dyn_into::<HtmlElement>().ok()),
    };
    let manager: SharedViewport = Rc::new(RefCell::new(ViewportManager::initialize(host)));

    listen_viewport(&manager, window, window, "resize", true, |_| {
        ViewportEvent::Resize
    })?;
    listen_viewport(&manager, window, window, "orientationchange", true, |_| {
        ViewportEvent::OrientationChange
    })?;
    listen_viewport(&manager, window, document, "touchend", false, |_| {
        ViewportEvent::TouchEnd {
            now: js_sys::Date::now(),
        }
    })?;
    listen_viewport(&manager, window, document, "touchmove", false, |e| {
        ViewportEvent::TouchMove {
            target: e.target().and_then(|t| t.dyn_into::<Element>().ok()),
        }
    })?;
    Ok(())
}
