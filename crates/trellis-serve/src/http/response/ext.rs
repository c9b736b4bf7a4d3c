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

//! HTTP response extensions.

use httpdate::fmt_http_date;
use std::fs;
use std::io::Result;
use std::path::Path;

use crate::http::{Header, MediaTypes, Status};

use super::Response;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Extension trait for the `Response` type providing additional functionality.
pub trait ResponseExt: Sized {
    /// Creates a response from a file, with the media type looked up from the
    /// file extension in the given table.
    ///
    /// # Errors
    ///
    /// Returns the I/O error in case the file can't be read.
    fn from_file<P>(path: P, types: &MediaTypes) -> Result<Response>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = fs::read(path)?;
        let res = Response::new()
            .status(Status::Ok)
            .header(Header::ContentType, types.for_path(path))
            .header(Header::ContentLength, content.len())
            .body(content);

        // Add modification date, if the file system provides one
        let modified = fs::metadata(path)?.modified().ok();
        Ok(match modified {
            Some(time) => res.header(Header::LastModified, fmt_http_date(time)),
            None => res,
        })
    }

    /// Creates a response from plain text.
    fn from_text<S>(content: S) -> Response
    where
        S: Into<String>,
    {
        Response::new() // fmt
            .status(Status::Ok)
            .text(content)
    }

    /// Creates a response from a status code, with the reason phrase as the
    /// body, which is particularly useful for error handling.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::{Response, ResponseExt, Status};
    ///
    /// // Create response from status
    /// let res = Response::from_status(Status::NotFound);
    /// assert_eq!(res.body, b"Not Found");
    /// ```
    #[must_use]
    fn from_status(status: Status) -> Response {
        Response::new() // fmt
            .status(status)
            .text(status.reason())
    }

    /// Creates a redirect response with the given status.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::{Header, Response, ResponseExt, Status};
    ///
    /// // Create redirect response
    /// let res = Response::redirect(Status::MovedPermanently, "/coffee/");
    /// assert_eq!(res.headers.get(Header::Location), Some("/coffee/"));
    /// ```
    #[must_use]
    fn redirect<L>(status: Status, location: L) -> Response
    where
        L: ToString,
    {
        Response::new()
            .status(status)
            .header(Header::Location, location)
            .header(Header::ContentLength, 0)
    }

    /// Sets the given text as the body of the response.
    #[must_use]
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>;
}

// ----------------------------------------------------------------------------
// Blanket implementations
// ----------------------------------------------------------------------------

impl ResponseExt for Response {
    fn text<S>(self, content: S) -> Response
    where
        S: Into<String>,
    {
        let content = content.into();
        self.header(Header::ContentType, "text/plain; charset=utf-8")
            .header(Header::ContentLength, content.len())
            .body(content)
    }
}
