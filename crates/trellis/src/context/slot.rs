// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Late-bound handler slot.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use trellis_serve::handler::Handler;
use trellis_serve::http::{Request, Response, ResponseExt, Status};

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Binding of a slot.
enum Binding {
    /// Owned handler.
    Strong(Arc<dyn Handler>),
    /// Handler owned elsewhere, e.g., by the handler tree the slot is part of.
    Weak(Weak<dyn Handler>),
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Late-bound handler slot.
///
/// Slots are handed out while the handler tree is built, before the handler
/// they stand for exists, which is the case for singleton nodes, as well as
/// for the root of the application, which is the target of captures. Slots
/// are bound exactly once, and answer with "404 Not Found" until then.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trellis::context::Slot;
/// use trellis_serve::handler::Handler;
/// use trellis_serve::http::{Request, Response, ResponseExt, Status};
///
/// // Create slot and bind it after handing out a clone
/// let slot = Slot::new();
/// let clone = slot.clone();
/// slot.bind(Arc::new(|_: Request| Response::from_text("bound")));
///
/// // Clone forwards to bound handler
/// let res = clone.handle(Request::new());
/// assert_eq!(res.status, Status::Ok);
/// ```
#[derive(Clone, Default)]
pub struct Slot {
    /// Binding, set once.
    inner: Arc<OnceLock<Binding>>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Slot {
    /// Creates an unbound slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the slot to the given handler, returning whether the slot was
    /// unbound before.
    pub fn bind(&self, handler: Arc<dyn Handler>) -> bool {
        self.inner.set(Binding::Strong(handler)).is_ok()
    }

    /// Binds the slot to the given handler without owning it.
    pub fn bind_weak(&self, handler: &Arc<dyn Handler>) -> bool {
        let weak = Arc::downgrade(handler);
        self.inner.set(Binding::Weak(weak)).is_ok()
    }

    /// Returns the bound handler, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn Handler>> {
        match self.inner.get()? {
            Binding::Strong(handler) => Some(Arc::clone(handler)),
            Binding::Weak(handler) => handler.upgrade(),
        }
    }

    /// Returns whether the slot is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.get().is_some()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Handler for Slot {
    fn handle(&self, req: Request) -> Response {
        match self.get() {
            Some(handler) => handler.handle(req),
            None => Response::from_status(Status::NotFound),
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Slot")
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn hello(_: Request) -> Response {
        Response::from_text("hello")
    }

    #[test]
    fn answers_not_found_until_bound() {
        let slot = Slot::new();
        assert_eq!(slot.handle(Request::new()).status, Status::NotFound);
        assert!(slot.bind(Arc::new(hello)));
        assert!(!slot.bind(Arc::new(hello)));
        assert_eq!(slot.handle(Request::new()).status, Status::Ok);
    }

    #[test]
    fn weak_binding_follows_owner() {
        let slot = Slot::new();
        let handler: Arc<dyn Handler> = Arc::new(hello);
        assert!(slot.bind_weak(&handler));
        assert_eq!(slot.handle(Request::new()).status, Status::Ok);
        drop(handler);
        assert_eq!(slot.handle(Request::new()).status, Status::NotFound);
    }
}
