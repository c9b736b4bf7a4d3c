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

//! Request-routing configuration engine.
//!
//! Applications are declared as route tables, mapping URI templates to
//! descriptors of nodes, which are resolved into a tree of handlers when the
//! application is assembled. Nodes serve static files, execute documents
//! through pluggable executors, capture and redirect requests, dispatch to
//! language-specific handlers, and wrap other nodes with filters. All
//! configuration errors surface during assembly, so a running application
//! only ever answers with responses.

#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

pub mod application;
pub mod attribute;
pub mod component;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod document;
mod error;
pub mod executor;
pub mod node;
pub mod settings;
pub mod template;

pub use error::{Error, Result};
