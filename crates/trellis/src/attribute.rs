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

//! Request attributes written by the engine.
//!
//! Nodes communicate with each other and with the handlers at the end of the
//! pipeline through request attributes. Router variables are written under
//! their template names, while everything the engine itself records is kept
//! in the `trellis.` namespace.

pub use trellis_serve::http::request::BASE;
use trellis_serve::http::Request;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Reference of the request as originally received, before any capture.
pub const CAPTURED: &str = "trellis.captured";

/// Capture targets visited while handling the request, one per line.
pub const HISTORY: &str = "trellis.capture.history";

/// Mount point of the application handling the request.
pub const ROOT: &str = "trellis.root";

/// Name of the user authenticated by basic authentication.
pub const USER: &str = "trellis.user";

/// Status code of the error an error page is rendered for.
pub const ERROR: &str = "trellis.error";

/// Dispatch identifier.
pub const DISPATCH_ID: &str = "trellis.dispatch.id";

/// Dispatcher name.
pub const DISPATCH_DISPATCHER: &str = "trellis.dispatch.dispatcher";

/// Library URI of dispatch targets.
pub const DISPATCH_RESOURCES: &str = "trellis.dispatch.resources";

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the request was issued internally through a capture.
#[inline]
#[must_use]
pub fn is_internal(req: &Request) -> bool {
    req.attributes.contains(HISTORY)
}
