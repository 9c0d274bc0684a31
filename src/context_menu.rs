use leptos::prelude::window;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement, MouseEvent};

pub const POPUP_CLASS: &str = "ctx-menu";
pub const COPY_ITEM_ICON: &str = "🖼";
pub const COPY_ITEM_TITLE: &str = "Copy image embed code";

// Popups opened outside the Leptos menu model carry this attribute so they
// can be torn down with raw DOM calls without touching managed nodes.
const HOST_POPUP_ATTR: &str = "data-host-popup";
const AUGMENTED_ATTR: &str = "data-embed-copy";

pub const POPUP_STYLE: &str = "position: fixed; z-index: 1000; min-width: 200px; background: var(--bg-primary); border: 1px solid var(--border-color); border-radius: var(--radius-md); padding: 4px; box-shadow: 0 4px 14px rgba(0, 0, 0, 0.18);";
pub const ITEM_STYLE: &str = "display: flex; align-items: center; gap: 0.5rem; padding: 0.4rem 0.6rem; border-radius: 4px; cursor: pointer; font-size: 0.9rem; background: transparent;";
const ICON_STYLE: &str = "width: 1.2em; text-align: center;";

/// Walks ancestor links from the click target, inclusive, until an image
/// element is found. Returns its source, preferring the `src` attribute and
/// falling back to the live property when the attribute is empty.
pub fn find_image_source(event: &MouseEvent) -> Option<String> {
    let mut element = event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok());
    while let Some(current) = element {
        if current.tag_name().eq_ignore_ascii_case("img") {
            return image_source(&current);
        }
        element = current.parent_element();
    }
    None
}

fn image_source(element: &Element) -> Option<String> {
    if let Some(attr) = element.get_attribute("src") {
        if !attr.is_empty() {
            return Some(attr);
        }
    }
    let live = element.dyn_ref::<HtmlImageElement>().map(|img| img.src())?;
    if live.is_empty() {
        None
    } else {
        Some(live)
    }
}

/// Runs `callback` after a zero-delay deferral, once the host has finished
/// rendering whatever popup the current event produces.
pub fn defer(callback: impl FnOnce() + 'static) {
    defer_ms(callback, 0);
}

pub fn defer_ms(callback: impl FnOnce() + 'static, delay_ms: i32) {
    let callback = Closure::once_into_js(callback);
    let _ = window().set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref::<js_sys::Function>(),
        delay_ms,
    );
}

/// Appends the copy entry to the currently open context-menu popup. Returns
/// false when no popup is open or it has already been augmented, so repeated
/// right-clicks never double-inject into one popup instance.
pub fn inject_copy_item(document: &Document, on_copy: impl Fn() + 'static) -> bool {
    let Ok(Some(popup)) = document.query_selector(&format!(".{POPUP_CLASS}")) else {
        return false;
    };
    if popup.has_attribute(AUGMENTED_ATTR) {
        return false;
    }
    let _ = popup.set_attribute(AUGMENTED_ATTR, "");

    let popup_to_hide = popup.clone();
    append_item(document, &popup, COPY_ITEM_ICON, COPY_ITEM_TITLE, move || {
        on_copy();
        if let Some(el) = popup_to_hide.dyn_ref::<HtmlElement>() {
            let _ = el.style().set_property("display", "none");
        }
    });
    true
}

/// Opens the reading view's popup. This path never consults the menu model,
/// which is exactly why the copy entry has to be injected after the fact.
pub fn open_host_popup(document: &Document, x: i32, y: i32, on_open: impl Fn() + 'static) {
    close_host_popups(document);
    let Ok(popup) = document.create_element("div") else {
        return;
    };
    popup.set_class_name(POPUP_CLASS);
    let _ = popup.set_attribute(HOST_POPUP_ATTR, "");
    let _ = popup.set_attribute("style", &format!("{POPUP_STYLE} left: {x}px; top: {y}px;"));
    append_item(document, &popup, "✏", "Open in editor", on_open);
    if let Some(body) = document.body() {
        let _ = body.append_child(&popup);
    }
}

pub fn close_host_popups(document: &Document) {
    if let Ok(list) = document.query_selector_all(&format!("[{HOST_POPUP_ATTR}]")) {
        for idx in 0..list.length() {
            if let Some(node) = list.get(idx) {
                if let Ok(el) = node.dyn_into::<Element>() {
                    el.remove();
                }
            }
        }
    }
}

fn append_item(
    document: &Document,
    popup: &Element,
    icon: &str,
    title: &str,
    on_click: impl Fn() + 'static,
) {
    let Ok(item) = document.create_element("div") else {
        return;
    };
    item.set_class_name("ctx-menu-item");
    let _ = item.set_attribute("style", ITEM_STYLE);

    if let Ok(icon_el) = document.create_element("span") {
        let _ = icon_el.set_attribute("style", ICON_STYLE);
        icon_el.set_text_content(Some(icon));
        let _ = item.append_child(&icon_el);
    }
    if let Ok(label_el) = document.create_element("span") {
        label_el.set_text_content(Some(title));
        let _ = item.append_child(&label_el);
    }

    if let Some(el) = item.dyn_ref::<HtmlElement>() {
        let enter_el = el.clone();
        let enter = Closure::<dyn FnMut()>::new(move || {
            let _ = enter_el.style().set_property("background", "var(--bg-secondary)");
        });
        let _ = el.add_event_listener_with_callback("mouseenter", enter.as_ref().unchecked_ref());
        enter.forget();

        let leave_el = el.clone();
        let leave = Closure::<dyn FnMut()>::new(move || {
            let _ = leave_el.style().set_property("background", "transparent");
        });
        let _ = el.add_event_listener_with_callback("mouseleave", leave.as_ref().unchecked_ref());
        leave.forget();
    }

    let click = Closure::<dyn FnMut()>::new(move || on_click());
    let _ = item.add_event_listener_with_callback("click", click.as_ref().unchecked_ref());
    click.forget();

    let _ = popup.append_child(&item);
}
