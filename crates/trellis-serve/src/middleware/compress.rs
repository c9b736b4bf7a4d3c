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

//! Middleware for response compression.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

use crate::handler::Handler;
use crate::http::media::matches;
use crate::http::{Header, Request, Response};
use crate::middleware::Middleware;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Media types which are already compressed.
const COMPRESSED: &[&str] = &[
    "image/*",
    "video/*",
    "audio/*",
    "font/woff",
    "font/woff2",
    "application/zip",
    "application/gzip",
];

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Middleware for response compression.
///
/// Successful responses with a body of at least the configured size are gzip
/// encoded, if the client accepts it. Responses that are already encoded, or
/// have a media type that is either excluded or known to be compressed, are
/// passed through unchanged.
///
/// # Examples
///
/// ```
/// use trellis_serve::handler::Handler;
/// use trellis_serve::http::{Header, Request, Response, ResponseExt};
/// use trellis_serve::middleware::{Compress, Middleware};
///
/// // Create middleware
/// let middleware = Compress::new(16);
///
/// // Handle request with middleware
/// let text = |_: Request| Response::from_text("a".repeat(64));
/// let req = Request::new().header(Header::AcceptEncoding, "gzip, br");
/// let res = middleware.process(req, &text);
/// assert_eq!(res.headers.get(Header::ContentEncoding), Some("gzip"));
/// assert!(res.body.len() < 64);
/// ```
#[derive(Clone, Debug)]
pub struct Compress {
    /// Minimum body size in bytes.
    threshold: usize,
    /// Excluded media type patterns.
    exclude: Vec<String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Compress {
    /// Creates a middleware for response compression.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self { threshold, exclude: Vec::new() }
    }

    /// Excludes the given media type patterns from compression.
    #[must_use]
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Returns whether the response is eligible for compression.
    fn is_eligible(&self, res: &Response) -> bool {
        if !res.status.is_success()
            || res.body.len() < self.threshold.max(1)
            || res.headers.contains(Header::ContentEncoding)
        {
            return false;
        }
        let media_type = res.media_type().unwrap_or_default();
        let mut iter = COMPRESSED
            .iter()
            .copied()
            .chain(self.exclude.iter().map(String::as_str));
        !iter.any(|pattern| matches(pattern, media_type))
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Middleware for Compress {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        let accepts = req
            .headers
            .get(Header::AcceptEncoding)
            .is_some_and(accepts_gzip);
        let mut res = next.handle(req);
        if !accepts || !self.is_eligible(&res) {
            return res;
        }

        // Encode body, and leave the response untouched on failure
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        let Ok(body) = encoder
            .write_all(&res.body)
            .and_then(|()| encoder.finish())
        else {
            return res;
        };

        // Update headers to reflect encoding
        res.headers.insert(Header::ContentEncoding, "gzip");
        res.headers.insert(Header::ContentLength, body.len());
        let vary = match res.headers.get(Header::Vary) {
            Some(vary) => format!("{vary}, Accept-Encoding"),
            None => String::from("Accept-Encoding"),
        };
        res.headers.insert(Header::Vary, vary);
        res.body = body;
        res
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the given `Accept-Encoding` value accepts gzip.
fn accepts_gzip(value: &str) -> bool {
    value.split(',').any(|token| {
        let mut parts = token.split(';').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let rejected = parts.any(|param| {
            param
                .strip_prefix("q=")
                .and_then(|q| q.parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        (name.eq_ignore_ascii_case("gzip") || name == "*") && !rejected
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use flate2::read::GzDecoder;
    use std::io::Read;

    use super::*;
    use crate::http::ResponseExt;

    fn text(_: Request) -> Response {
        Response::from_text("trellis ".repeat(32))
    }

    #[test]
    fn compresses_above_threshold() {
        let req = Request::new().header(Header::AcceptEncoding, "gzip");
        let res = Compress::new(64).process(req, &text);
        assert_eq!(res.headers.get(Header::Vary), Some("Accept-Encoding"));

        let mut decoded = String::new();
        GzDecoder::new(res.body.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "trellis ".repeat(32));
    }

    #[test]
    fn skips_small_excluded_or_unaccepted() {
        let req = || Request::new().header(Header::AcceptEncoding, "gzip");
        let res = Compress::new(1024).process(req(), &text);
        assert!(!res.headers.contains(Header::ContentEncoding));

        let res = Compress::new(1).exclude(["text/*"]).process(req(), &text);
        assert!(!res.headers.contains(Header::ContentEncoding));

        let req = Request::new().header(Header::AcceptEncoding, "gzip;q=0");
        let res = Compress::new(1).process(req, &text);
        assert!(!res.headers.contains(Header::ContentEncoding));
    }
}
