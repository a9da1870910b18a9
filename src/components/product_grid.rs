//! Product Grid Component
//!
//! Lists the controller's display units and asks for more when the end of
//! the grid comes near. The observer only fires on crossings, so the end is
//! also re-checked after every response and after a throttled trigger.

use gloo_timers::future::TimeoutFuture;
use grid_engine::GrowthDirection;
use leptos::html::Div;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_viewport::{
    bind_near_end_observer, bind_scroll_near_end, is_near_viewport, GrowthAxis, NEAR_END_MARGIN_PX,
};
use tracing::debug;

use crate::components::{EndOfResults, HorizontalBar, PageBar, ProductEntry};
use crate::context::{use_grid, GridHandle};

/// Everything a near-end re-check needs, all handles
#[derive(Clone, Copy)]
struct NearEnd {
    grid: GridHandle,
    sentinel: NodeRef<Div>,
    axis: GrowthAxis,
    retry_pending: StoredValue<bool>,
}

impl NearEnd {
    fn sentinel_near(&self) -> bool {
        self.sentinel
            .get_untracked()
            .map(|el| is_near_viewport(&el, self.axis, NEAR_END_MARGIN_PX))
            .unwrap_or(false)
    }

    /// Ask for more; if throttled, try again once the throttle has passed
    fn request_more(self) {
        if self.grid.scroll_near_end() {
            return;
        }
        let Some(wait) = self.grid.throttle_remaining_ms() else {
            return;
        };
        if self.retry_pending.get_value() {
            return;
        }
        self.retry_pending.set_value(true);
        debug!(wait, "near-end trigger throttled, re-checking later");
        spawn_local(async move {
            TimeoutFuture::new(wait.min(u32::MAX as u64) as u32).await;
            self.retry_pending.set_value(false);
            if self.sentinel_near() {
                self.request_more();
            }
        });
    }
}

#[component]
pub fn ProductGrid() -> impl IntoView {
    let Some(grid) = use_grid() else {
        return view! { <p class="grid-error">"The catalog is unavailable right now."</p> }.into_any();
    };
    let axis = match grid.direction {
        GrowthDirection::Vertical => GrowthAxis::Vertical,
        GrowthDirection::Horizontal => GrowthAxis::Horizontal,
    };
    let container = NodeRef::<Div>::new();
    let sentinel = NodeRef::<Div>::new();

    let near_end = NearEnd {
        grid,
        sentinel,
        axis,
        retry_pending: StoredValue::new(false),
    };
    let on_near_end = move || near_end.request_more();

    // A batch may leave the sentinel inside the margin without a new crossing
    Effect::new(move |_| {
        if grid.settled.get() == 0 {
            return;
        }
        spawn_local(async move {
            // Let the new entries lay out first
            TimeoutFuture::new(0).await;
            if near_end.sentinel_near() {
                near_end.request_more();
            }
        });
    });

    // Bind once the elements are mounted
    Effect::new(move |_| match axis {
        GrowthAxis::Vertical => {
            if let Some(el) = sentinel.get() {
                bind_near_end_observer(&el, axis, NEAR_END_MARGIN_PX, on_near_end);
            }
        }
        GrowthAxis::Horizontal => {
            if let Some(el) = container.get() {
                bind_scroll_near_end(&el, axis, NEAR_END_MARGIN_PX, on_near_end);
            }
        }
    });

    let unit_ids = move || grid.units.with(|units| units.iter().map(|u| u.id()).collect::<Vec<_>>());

    view! {
        <section class="product-grid-section">
            <div
                class="product-grid"
                class:horizontal=move || axis == GrowthAxis::Horizontal
                node_ref=container
            >
                <For
                    each=unit_ids
                    key=|id| *id
                    children=move |id| {
                        let unit = grid.units.with_untracked(|units| units.iter().find(|u| u.id() == id).cloned());
                        unit.map(|unit| view! { <ProductEntry unit=unit skeleton=grid.skeleton /> })
                    }
                />
                <div class="grid-sentinel" node_ref=sentinel></div>
            </div>
            <HorizontalBar container=container />
            <EndOfResults />
            <PageBar />
        </section>
    }
    .into_any()
}
