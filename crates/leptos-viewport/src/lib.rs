//! Leptos Viewport Utilities
//!
//! Responsive breakpoint signals and "near the end of the grid" triggers.
//! Listeners live for the page session and are leaked with `forget()`.

use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Breakpoint used by the storefront header and grid
pub const NARROW_LAYOUT_QUERY: &str = "(width <= 1080px) and (max-aspect-ratio: 6/7)";

/// How far ahead of the grid end a trigger fires, in pixels
pub const NEAR_END_MARGIN_PX: i32 = 400;

/// Which edge of the grid grows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthAxis {
    Vertical,
    Horizontal,
}

impl GrowthAxis {
    /// `rootMargin` that extends the viewport past the growing edge
    pub fn root_margin(self, margin_px: i32) -> String {
        match self {
            GrowthAxis::Vertical => format!("0px 0px {margin_px}px 0px"),
            GrowthAxis::Horizontal => format!("0px {margin_px}px 0px 0px"),
        }
    }
}

// ========================
// Breakpoints
// ========================

/// Signal tracking whether `query` matches. False when `matchMedia` is unavailable.
pub fn create_media_signal(query: &str) -> ReadSignal<bool> {
    let (matches_read, matches_write) = signal(false);

    let Some(win) = web_sys::window() else {
        return matches_read;
    };
    let Ok(Some(list)) = win.match_media(query) else {
        return matches_read;
    };
    matches_write.set(list.matches());

    let on_change = Closure::<dyn FnMut(web_sys::Event)>::new(move |ev: web_sys::Event| {
        if let Some(list) = ev.target().and_then(|t| t.dyn_into::<web_sys::MediaQueryList>().ok()) {
            matches_write.set(list.matches());
        }
    });
    let _ = list.add_event_listener_with_callback("change", on_change.as_ref().unchecked_ref());
    on_change.forget();

    matches_read
}

// ========================
// Near-end triggers
// ========================

/// Whether the scrolled position is within `margin` of the content end.
/// All values are in pixels along the growing axis.
pub fn within_margin(scroll_offset: f64, viewport_extent: f64, content_extent: f64, margin: f64) -> bool {
    if content_extent <= 0.0 {
        return false;
    }
    scroll_offset + viewport_extent >= content_extent - margin
}

/// Call `on_near_end` whenever `sentinel` comes within `margin_px` of the viewport.
/// Returns the observer so the caller can `disconnect()` it.
pub fn bind_near_end_observer<F>(
    sentinel: &web_sys::Element,
    axis: GrowthAxis,
    margin_px: i32,
    on_near_end: F,
) -> Option<web_sys::IntersectionObserver>
where
    F: Fn() + 'static,
{
    let on_intersect = Closure::<dyn FnMut(js_sys::Array, web_sys::IntersectionObserver)>::new(
        move |entries: js_sys::Array, _observer: web_sys::IntersectionObserver| {
            let visible = entries.iter().any(|entry| {
                entry
                    .dyn_into::<web_sys::IntersectionObserverEntry>()
                    .map(|e| e.is_intersecting())
                    .unwrap_or(false)
            });
            if visible {
                on_near_end();
            }
        },
    );

    let init = web_sys::IntersectionObserverInit::new();
    init.set_root_margin(&axis.root_margin(margin_px));
    let observer =
        web_sys::IntersectionObserver::new_with_options(on_intersect.as_ref().unchecked_ref(), &init).ok()?;
    observer.observe(sentinel);
    on_intersect.forget();
    Some(observer)
}

/// Whether `sentinel` currently sits within `margin_px` of the viewport.
/// Used to re-check after a trigger was dropped.
pub fn is_near_viewport(sentinel: &web_sys::Element, axis: GrowthAxis, margin_px: i32) -> bool {
    let Some(win) = web_sys::window() else {
        return false;
    };
    let rect = sentinel.get_bounding_client_rect();
    let (leading_edge, viewport) = match axis {
        GrowthAxis::Vertical => (
            rect.top(),
            win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0),
        ),
        GrowthAxis::Horizontal => (
            rect.left(),
            win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0),
        ),
    };
    leading_edge <= viewport + margin_px as f64
}

/// Scroll listener for containers that scroll on their own (horizontal grids)
pub fn bind_scroll_near_end<F>(container: &web_sys::HtmlElement, axis: GrowthAxis, margin_px: i32, on_near_end: F)
where
    F: Fn() + 'static,
{
    let target = container.clone();
    let on_scroll = Closure::<dyn FnMut(web_sys::Event)>::new(move |_ev: web_sys::Event| {
        let near = match axis {
            GrowthAxis::Vertical => within_margin(
                target.scroll_top() as f64,
                target.client_height() as f64,
                target.scroll_height() as f64,
                margin_px as f64,
            ),
            GrowthAxis::Horizontal => within_margin(
                target.scroll_left() as f64,
                target.client_width() as f64,
                target.scroll_width() as f64,
                margin_px as f64,
            ),
        };
        if near {
            on_near_end();
        }
    });
    let _ = container.add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref());
    on_scroll.forget();
}
