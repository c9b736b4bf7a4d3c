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

//! Configuration error.

use std::{io, result};
use thiserror::Error;

use trellis_serve::handler;
use trellis_serve::handler::matcher;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Configuration error.
///
/// All errors are raised while an application is assembled, and abort the
/// assembly as a whole. Request-time failures never surface as errors, as
/// they are turned into responses by the handlers that encounter them.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown node type.
    #[error("unknown node type: {0}")]
    UnknownType(String),

    /// Malformed descriptor.
    #[error("malformed descriptor: {0}")]
    Malformed(String),

    /// Conflicting singleton configuration.
    #[error("conflicting configuration for singleton node: {0}")]
    Singleton(&'static str),

    /// Dispatch without manual resource.
    #[error("dispatch requires a manual resource in application: {0}")]
    ManualRequired(String),

    /// Unknown resource.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Unknown virtual host.
    #[error("unknown virtual host: {0}")]
    UnknownHost(String),

    /// Unknown application.
    #[error("unknown application: {0}")]
    UnknownApplication(String),

    /// Unknown status code.
    #[error("unknown status code: {0}")]
    Status(u16),

    /// Cyclic configuration.
    #[error("cyclic configuration at: {0}")]
    Cycle(String),

    /// Missing compiler.
    #[error("no compiler registered for: {0}")]
    Compiler(String),

    /// Unsupported option.
    #[error("unsupported option: {0}")]
    Unsupported(String),

    /// Error at route.
    #[error("{uri}: {source}")]
    Route {
        /// Route URI.
        uri: String,
        /// Underlying error.
        source: Box<Error>,
    },

    /// JSON error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Matcher error.
    #[error(transparent)]
    Matcher(#[from] matcher::Error),

    /// Handler error.
    #[error(transparent)]
    Handler(#[from] handler::Error),
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Error {
    /// Attaches the given route URI to the error, unless the error already
    /// carries a more specific one from a nested route.
    #[must_use]
    pub fn at<S>(self, uri: S) -> Self
    where
        S: Into<String>,
    {
        match self {
            Error::Route { .. } => self,
            err => Error::Route { uri: uri.into(), source: Box::new(err) },
        }
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl From<matcher::route::Error> for Error {
    #[inline]
    fn from(err: matcher::route::Error) -> Self {
        Error::Matcher(err.into())
    }
}

// ----------------------------------------------------------------------------
// Type aliases
// ----------------------------------------------------------------------------

/// Configuration result.
pub type Result<T = ()> = result::Result<T, Error>;
