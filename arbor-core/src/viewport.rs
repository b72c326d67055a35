//! Scroll container model shared by the shells.
//!
//! The visible canvas is pinned in place; the container only exists to
//! provide a scroll range, and wheel input is forwarded into it by hand.
//! Listener registration is scoped: dropping a [`WheelSubscription`]
//! unregisters its handler.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::config::CONTENT_PAGES;

/// Vertical wheel input; positive scrolls down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta_y: f32,
}

/// Anything with a vertical scroll offset
pub trait ScrollTarget {
    fn scroll_offset(&self) -> f32;

    /// Set the offset; implementations clamp to their own range.
    fn set_scroll_offset(&mut self, offset: f32);
}

/// Advance `target` by the wheel delta
pub fn apply_wheel<T: ScrollTarget + ?Sized>(target: &mut T, event: &WheelEvent) {
    let offset = target.scroll_offset() + event.delta_y;
    target.set_scroll_offset(offset);
}

/// A scroll container whose content is a fixed multiple of its own height
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollViewport {
    offset: f32,
    viewport_height: f32,
    content_height: f32,
}

impl ScrollViewport {
    pub fn new(viewport_height: f32) -> Self {
        Self {
            offset: 0.0,
            viewport_height,
            content_height: viewport_height * CONTENT_PAGES,
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn max_offset(&self) -> f32 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    pub fn scroll_by(&mut self, delta: f32) {
        let offset = self.offset + delta;
        self.set_scroll_offset(offset);
    }

    /// Resize the viewport; the content keeps its proportion and the
    /// offset is pulled back into range.
    pub fn resize(&mut self, viewport_height: f32) {
        self.viewport_height = viewport_height;
        self.content_height = viewport_height * CONTENT_PAGES;
        self.offset = self.offset.clamp(0.0, self.max_offset());
    }
}

impl ScrollTarget for ScrollViewport {
    fn scroll_offset(&self) -> f32 {
        self.offset
    }

    fn set_scroll_offset(&mut self, offset: f32) {
        self.offset = offset.clamp(0.0, self.max_offset());
    }
}

type Handler = Box<dyn FnMut(&WheelEvent)>;
type Handlers = RefCell<Vec<(u64, Handler)>>;

/// Fans wheel events out to the registered handlers
#[derive(Default)]
pub struct WheelRouter {
    handlers: Rc<Handlers>,
    next_id: Cell<u64>,
}

impl WheelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` until the returned guard is dropped
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe(&self, handler: impl FnMut(&WheelEvent) + 'static) -> WheelSubscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push((id, Box::new(handler)));
        log::trace!("wheel handler {} subscribed", id);
        WheelSubscription {
            id,
            handlers: Rc::downgrade(&self.handlers),
        }
    }

    /// Deliver `event` to every live handler, in subscription order.
    ///
    /// Handlers must not subscribe or unsubscribe from inside the callback.
    pub fn dispatch(&self, event: WheelEvent) {
        for (_, handler) in self.handlers.borrow_mut().iter_mut() {
            handler(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

/// Keeps a wheel handler registered for as long as it lives
pub struct WheelSubscription {
    id: u64,
    handlers: Weak<Handlers>,
}

impl Drop for WheelSubscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.borrow_mut().retain(|(id, _)| *id != self.id);
            log::trace!("wheel handler {} unsubscribed", self.id);
        }
    }
}

/// The shell's scroll handler: wheel deltas move `target` for as long as the
/// returned subscription lives.
pub fn bind_scroll<T>(router: &WheelRouter, target: Rc<RefCell<T>>) -> WheelSubscription
where
    T: ScrollTarget + 'static,
{
    router.subscribe(move |event| apply_wheel(&mut *target.borrow_mut(), event))
}
