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

//! Cache control node.

use httpdate::fmt_http_date;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::media::matches;
use trellis_serve::http::{Header, Request, Response};
use trellis_serve::middleware::Middleware;

use crate::config::Ordered;
use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::settings::units::FAR_FUTURE;
use crate::settings::MaxAge;
use crate::Result;

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Cache control node, setting client caching headers by media type.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CacheControlNode {
    /// Maximum ages by media type pattern.
    #[serde(default)]
    pub media_types: Ordered<MaxAge>,
    /// Maximum age for media types without pattern.
    #[serde(default)]
    pub default: MaxAge,
    /// Next node.
    pub next: Descriptor,
}

/// Middleware setting client caching headers by media type.
///
/// Only successful responses are altered. A positive maximum age allows
/// clients to cache the response for that many seconds, zero forbids caching,
/// and negative maximum ages leave the response untouched.
///
/// # Examples
///
/// ```
/// use trellis::node::cache_control::CacheControl;
/// use trellis::settings::MaxAge;
/// use trellis_serve::http::{Header, Request, Response, ResponseExt};
/// use trellis_serve::middleware::Middleware;
///
/// // Create middleware caching style sheets for a day
/// let middleware = CacheControl::new(MaxAge::UNSET)
///     .rule("text/css", MaxAge(86_400));
///
/// // Handle request
/// let next = |_: Request| {
///     Response::from_text("body {}").header(Header::ContentType, "text/css")
/// };
/// let res = middleware.process(Request::new(), &next);
/// assert_eq!(res.headers.get(Header::CacheControl), Some("max-age=86400"));
/// ```
#[derive(Clone, Debug)]
pub struct CacheControl {
    /// Maximum ages by media type pattern.
    rules: Vec<(String, MaxAge)>,
    /// Maximum age for media types without pattern.
    default: MaxAge,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl CacheControl {
    /// Creates a middleware with the given default maximum age.
    #[must_use]
    pub fn new(default: MaxAge) -> Self {
        Self { rules: Vec::new(), default }
    }

    /// Adds a maximum age for the given media type pattern.
    #[must_use]
    pub fn rule<P>(mut self, pattern: P, max_age: MaxAge) -> Self
    where
        P: Into<String>,
    {
        self.rules.push((pattern.into(), max_age));
        self
    }

    /// Returns the maximum age for the given media type.
    fn max_age(&self, media_type: Option<&str>) -> MaxAge {
        media_type
            .and_then(|media_type| {
                self.rules
                    .iter()
                    .find(|(pattern, _)| matches(pattern, media_type))
            })
            .map_or(self.default, |(_, max_age)| *max_age)
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for CacheControlNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        let next = ctx.resolve_handler(&self.next, uri)?;
        let middleware = self.media_types.iter().fold(
            CacheControl::new(self.default),
            |middleware, (pattern, max_age)| middleware.rule(pattern, *max_age),
        );
        Ok(Resolved::handler(Layer::new(middleware, next)))
    }

    fn name(&self) -> &str {
        "cacheControl"
    }
}

impl Middleware for CacheControl {
    fn process(&self, req: Request, next: &dyn Handler) -> Response {
        let mut res = next.handle(req);
        if !res.status.is_success() {
            return res;
        }

        // Negative maximum ages leave the response untouched
        let MaxAge(seconds) = self.max_age(res.media_type());
        match u64::try_from(seconds) {
            Ok(0) => {
                res.headers.insert(Header::CacheControl, "no-cache");
                res.headers.insert(Header::Expires, fmt_http_date(UNIX_EPOCH));
            }
            Ok(seconds) => {
                // Maximum ages beyond the far future are clamped to it
                let seconds = seconds.min(FAR_FUTURE.unsigned_abs());
                let value = format!("max-age={seconds}");
                res.headers.insert(Header::CacheControl, value);
                let expires = SystemTime::now()
                    .checked_add(Duration::from_secs(seconds))
                    .map(fmt_http_date);
                if let Some(expires) = expires {
                    res.headers.insert(Header::Expires, expires);
                }
            }
            Err(_) => {}
        }
        res
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::http::{ResponseExt, Status};

    use super::*;

    fn respond(media_type: &'static str) -> impl Fn(Request) -> Response {
        move |_: Request| {
            Response::from_text("").header(Header::ContentType, media_type)
        }
    }

    fn middleware() -> CacheControl {
        let node: CacheControlNode = serde_json::from_value(serde_json::json!({
            "mediaTypes": {
                "image/*": "1d",
                "text/css": "farFuture",
                "text/html": 0
            },
            "default": -1,
            "next": "!200"
        }))
        .unwrap();
        node.media_types.iter().fold(
            CacheControl::new(node.default),
            |middleware, (pattern, max_age)| middleware.rule(pattern, *max_age),
        )
    }

    #[test]
    fn sets_max_age_by_media_type() {
        let res = middleware().process(Request::new(), &respond("image/png"));
        assert_eq!(res.headers.get(Header::CacheControl), Some("max-age=86400"));
        assert!(res.headers.contains(Header::Expires));
        let res = middleware().process(Request::new(), &respond("text/css"));
        let value = format!("max-age={FAR_FUTURE}");
        assert_eq!(res.headers.get(Header::CacheControl), Some(value.as_str()));
    }

    #[test]
    fn clamps_max_age_to_far_future() {
        let middleware = CacheControl::new(MaxAge(300_000_000_000));
        let res = middleware.process(Request::new(), &respond("text/css"));
        let value = format!("max-age={FAR_FUTURE}");
        assert_eq!(res.headers.get(Header::CacheControl), Some(value.as_str()));
        assert!(res.headers.contains(Header::Expires));
    }

    #[test]
    fn forbids_caching_with_zero() {
        let next = respond("text/html; charset=utf-8");
        let res = middleware().process(Request::new(), &next);
        assert_eq!(res.headers.get(Header::CacheControl), Some("no-cache"));
        assert_eq!(
            res.headers.get(Header::Expires),
            Some("Thu, 01 Jan 1970 00:00:00 GMT")
        );
    }

    #[test]
    fn leaves_other_responses_untouched() {
        let res = middleware().process(Request::new(), &respond("text/plain"));
        assert!(!res.headers.contains(Header::CacheControl));
        let missing = |_: Request| Response::from_status(Status::NotFound);
        let res = middleware().process(Request::new(), &missing);
        assert!(!res.headers.contains(Header::CacheControl));
    }
}
