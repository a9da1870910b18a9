//! Entry Factory
//!
//! Creates display units for catalog items and recycles deactivated ones.
//!
//! A unit cannot show data before the shared entry skeleton (its markup) has
//! been loaded. Data handed over earlier is parked on the unit and applied
//! once [`StructureReady`] resolves; a unit deactivated in the meantime
//! ignores the late application.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use url::Url;

use crate::error::ValidationError;
use crate::models::ItemData;

/// Render a price in minor units as `<whole>.<cents> USD`
pub fn format_price(minor_units: u64) -> String {
    format!("{}.{:02} USD", minor_units / 100, minor_units % 100)
}

// ========================
// Skeleton readiness
// ========================

/// Parsed entry markup shared by every unit of one factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySkeleton {
    markup: Rc<str>,
}

impl EntrySkeleton {
    pub fn new(markup: impl Into<Rc<str>>) -> Self {
        Self { markup: markup.into() }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

type ReadyCallback = Box<dyn FnOnce(&EntrySkeleton)>;

enum ReadyState {
    Pending(Vec<ReadyCallback>),
    Ready(EntrySkeleton),
}

/// Resolves exactly once, when the skeleton markup is available
#[derive(Clone)]
pub struct StructureReady(Rc<RefCell<ReadyState>>);

impl Default for StructureReady {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(ReadyState::Pending(Vec::new()))))
    }
}

impl StructureReady {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.0.borrow(), ReadyState::Ready(_))
    }

    pub fn skeleton(&self) -> Option<EntrySkeleton> {
        match &*self.0.borrow() {
            ReadyState::Ready(skeleton) => Some(skeleton.clone()),
            ReadyState::Pending(_) => None,
        }
    }

    /// Run `callback` now if resolved, otherwise on resolution
    pub fn when_ready(&self, callback: impl FnOnce(&EntrySkeleton) + 'static) {
        if let Some(skeleton) = self.skeleton() {
            callback(&skeleton);
            return;
        }
        if let ReadyState::Pending(waiting) = &mut *self.0.borrow_mut() {
            waiting.push(Box::new(callback));
        }
    }

    /// Returns false if already resolved; the first skeleton stays
    pub fn resolve(&self, skeleton: EntrySkeleton) -> bool {
        let mut state = self.0.borrow_mut();
        if matches!(*state, ReadyState::Ready(_)) {
            return false;
        }
        let previous = std::mem::replace(&mut *state, ReadyState::Ready(skeleton.clone()));
        drop(state);

        if let ReadyState::Pending(waiting) = previous {
            for callback in waiting {
                callback(&skeleton);
            }
        }
        true
    }
}

// ========================
// Display units
// ========================

/// The formatted fields a unit shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub image_src: String,
    pub name: String,
    pub culture: String,
    pub price: String,
    pub href: String,
}

impl From<&ItemData> for RenderedEntry {
    fn from(item: &ItemData) -> Self {
        Self {
            image_src: item.image_url.to_string(),
            name: item.display_name.clone(),
            culture: item.culture_label.clone(),
            price: format_price(item.price_minor_units),
            href: item.detail_url.to_string(),
        }
    }
}

type Observer = Rc<dyn Fn(Option<&RenderedEntry>)>;

struct UnitState {
    id: u64,
    active: bool,
    pending: Option<ItemData>,
    rendered: Option<RenderedEntry>,
    observers: Vec<Observer>,
}

/// One display slot for a catalog item. Clones share the same slot.
#[derive(Clone)]
pub struct DisplayUnit {
    state: Rc<RefCell<UnitState>>,
    factory: Weak<FactoryInner>,
}

impl PartialEq for DisplayUnit {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("DisplayUnit")
            .field("id", &state.id)
            .field("active", &state.active)
            .field("rendered", &state.rendered)
            .finish()
    }
}

impl DisplayUnit {
    pub fn id(&self) -> u64 {
        self.state.borrow().id
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    /// Data waiting for the skeleton
    pub fn has_pending(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    pub fn rendered(&self) -> Option<RenderedEntry> {
        self.state.borrow().rendered.clone()
    }

    /// Get told whenever the rendered fields change. Dropped on deactivation.
    pub fn observe(&self, observer: impl Fn(Option<&RenderedEntry>) + 'static) {
        self.state.borrow_mut().observers.push(Rc::new(observer));
    }

    /// Removal hook for the host: the unit left the DOM
    pub fn disconnect(&self) {
        if let Some(inner) = self.factory.upgrade() {
            EntryFactory { inner }.deactivate(self);
        }
    }

    fn apply_pending(&self) {
        let (entry, observers) = {
            let mut state = self.state.borrow_mut();
            if !state.active {
                return;
            }
            let Some(item) = state.pending.take() else {
                return;
            };
            let entry = RenderedEntry::from(&item);
            state.rendered = Some(entry.clone());
            (entry, state.observers.clone())
        };
        for observer in observers {
            observer(Some(&entry));
        }
    }

    fn downgrade(&self) -> WeakUnit {
        WeakUnit {
            state: Rc::downgrade(&self.state),
            factory: self.factory.clone(),
        }
    }
}

struct WeakUnit {
    state: Weak<RefCell<UnitState>>,
    factory: Weak<FactoryInner>,
}

impl WeakUnit {
    fn upgrade(&self) -> Option<DisplayUnit> {
        Some(DisplayUnit {
            state: self.state.upgrade()?,
            factory: self.factory.clone(),
        })
    }
}

// ========================
// Factory
// ========================

struct FactoryInner {
    origin: Url,
    pool: RefCell<Vec<DisplayUnit>>,
    structure: StructureReady,
    next_id: Cell<u64>,
}

/// Shared handle; clones use the same pool and skeleton
#[derive(Clone)]
pub struct EntryFactory {
    inner: Rc<FactoryInner>,
}

impl EntryFactory {
    /// `origin` resolves relative image and product links
    pub fn new(origin: Url) -> Self {
        Self {
            inner: Rc::new(FactoryInner {
                origin,
                pool: RefCell::new(Vec::new()),
                structure: StructureReady::new(),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn structure(&self) -> StructureReady {
        self.inner.structure.clone()
    }

    /// Hand over the loaded entry markup. Only the first call counts.
    pub fn provide_markup(&self, markup: impl Into<Rc<str>>) -> bool {
        let accepted = self.inner.structure.resolve(EntrySkeleton::new(markup));
        if !accepted {
            tracing::warn!("entry skeleton already loaded, ignoring new markup");
        }
        accepted
    }

    /// Validate raw item data and bind it to a (possibly recycled) unit
    pub fn create_entry(&self, raw: &Value) -> Result<DisplayUnit, ValidationError> {
        let item = ItemData::from_json(raw, &self.inner.origin)?;
        Ok(self.activate(item))
    }

    fn activate(&self, item: ItemData) -> DisplayUnit {
        let recycled = self.inner.pool.borrow_mut().pop();
        let unit = recycled.unwrap_or_else(|| self.construct());
        {
            let mut state = unit.state.borrow_mut();
            state.active = true;
            state.pending = Some(item);
        }

        let weak = unit.downgrade();
        self.inner.structure.when_ready(move |_| {
            if let Some(unit) = weak.upgrade() {
                unit.apply_pending();
            }
        });
        unit
    }

    fn construct(&self) -> DisplayUnit {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        tracing::debug!(id, "constructing new display unit");
        DisplayUnit {
            state: Rc::new(RefCell::new(UnitState {
                id,
                active: false,
                pending: None,
                rendered: None,
                observers: Vec::new(),
            })),
            factory: Rc::downgrade(&self.inner),
        }
    }

    /// Wipe a unit and return it to the pool. Inactive units are left alone.
    pub fn deactivate(&self, unit: &DisplayUnit) {
        let observers = {
            let mut state = unit.state.borrow_mut();
            if !state.active {
                return;
            }
            state.active = false;
            state.pending = None;
            state.rendered = None;
            std::mem::take(&mut state.observers)
        };
        for observer in observers {
            observer(None);
        }
        self.inner.pool.borrow_mut().push(unit.clone());
    }

    /// Units waiting in the pool
    pub fn pooled(&self) -> usize {
        self.inner.pool.borrow().len()
    }

    /// Units ever constructed by this factory
    pub fn constructed(&self) -> u64 {
        self.inner.next_id.get()
    }

    /// Drop every pooled unit
    pub fn reset(&self) {
        self.inner.pool.borrow_mut().clear();
    }
}
