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

//! HTTP headers.

use std::collections::btree_map::Iter;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::error::{Error, Result};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// HTTP header map.
///
/// Requests and responses share the same header map, which stores owned
/// values keyed by [`Header`]. Since keys are small integers, a [`BTreeMap`]
/// is faster than a hash map, and gives us a stable iteration order when
/// formatting headers for display.
///
/// # Examples
///
/// ```
/// use trellis_serve::http::{Header, Headers};
///
/// // Create header map and add header
/// let mut headers = Headers::new();
/// headers.insert(Header::ContentType, "text/plain");
/// assert_eq!(headers.get(Header::ContentType), Some("text/plain"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    /// Ordered map of headers.
    inner: BTreeMap<Header, String>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Headers {
    /// Creates a header map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for the given header.
    #[inline]
    #[must_use]
    pub fn get(&self, header: Header) -> Option<&str> {
        self.inner.get(&header).map(String::as_str)
    }

    /// Returns whether the header is contained.
    #[inline]
    #[must_use]
    pub fn contains(&self, header: Header) -> bool {
        self.inner.contains_key(&header)
    }

    /// Updates the given header, replacing any previous value.
    #[allow(clippy::needless_pass_by_value)]
    #[inline]
    pub fn insert<V>(&mut self, header: Header, value: V)
    where
        V: ToString,
    {
        self.inner.insert(header, value.to_string());
    }

    /// Updates the given header, unless it's already set.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::{Header, Headers};
    ///
    /// // Create header map and add header twice
    /// let mut headers = Headers::new();
    /// headers.insert_if_absent(Header::Vary, "Origin");
    /// headers.insert_if_absent(Header::Vary, "Accept-Encoding");
    /// assert_eq!(headers.get(Header::Vary), Some("Origin"));
    /// ```
    #[allow(clippy::needless_pass_by_value)]
    #[inline]
    pub fn insert_if_absent<V>(&mut self, header: Header, value: V)
    where
        V: ToString,
    {
        self.inner.entry(header).or_insert_with(|| value.to_string());
    }

    /// Removes the given header, returning its value.
    #[inline]
    pub fn remove(&mut self, header: Header) -> Option<String> {
        self.inner.remove(&header)
    }

    /// Returns an iterator over all headers.
    #[inline]
    pub fn iter(&self) -> Iter<'_, Header, String> {
        self.inner.iter()
    }
}

#[allow(clippy::must_use_candidate)]
impl Headers {
    /// Returns the number of headers.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether there are any headers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a Header, &'a String);
    type IntoIter = Iter<'a, Header, String>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V> FromIterator<(Header, V)> for Headers
where
    V: ToString,
{
    /// Creates a header map from an iterator.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis_serve::http::{Header, Headers};
    ///
    /// // Create header map from iterator
    /// let headers = Headers::from_iter([
    ///     (Header::Accept, "text/plain"),
    ///     (Header::AcceptLanguage, "en"),
    /// ]);
    /// assert_eq!(headers.len(), 2);
    /// ```
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (Header, V)>,
    {
        let mut headers = Headers::new();
        for (header, value) in iter {
            headers.insert(header, value);
        }
        headers
    }
}

// ----------------------------------------------------------------------------

impl fmt::Display for Headers {
    /// Formats the header map for display.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (header, value) in &self.inner {
            writeln!(f, "{}: {value}", header.name())?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------

impl AsRef<str> for Header {
    #[inline]
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Defines and implements HTTP headers.
macro_rules! define_and_impl_header {
    (
        $(
            $(#[$_:meta])*
            $group:ident: {
                $(
                    $(#[$comment:meta])*
                    $name:ident = $header:expr
                ),+
                $(,)?
            }
        )+
    ) => {
        /// HTTP header.
        ///
        /// This enum lists the headers the routing engine and its nodes read
        /// or write. Unknown headers are dropped when a host converts its own
        /// request representation, as no node could act on them anyway.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Header {
            $(
                $(
                    $(#[$comment])*
                    $name,
                )+
            )+
        }

        impl Header {
            /// Returns the canonical header name.
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    $($(Header::$name => $header,)+)+
                }
            }
        }

        /// Case-insensitive lookup table for header names.
        static LOOKUP: LazyLock<HashMap<String, Header>> =
            LazyLock::new(|| {
                HashMap::from_iter([
                    $($(($header.to_ascii_lowercase(), Header::$name),)+)+
                ])
            });

        impl FromStr for Header {
            type Err = Error;

            /// Parses a header name, ignoring case.
            ///
            /// # Examples
            ///
            /// ```
            /// # use std::error::Error;
            /// # fn main() -> Result<(), Box<dyn Error>> {
            /// use trellis_serve::http::Header;
            ///
            /// // Parse header name
            /// let header: Header = "cache-control".parse()?;
            /// assert_eq!(header, Header::CacheControl);
            /// # Ok(())
            /// # }
            /// ```
            fn from_str(value: &str) -> Result<Self> {
                LOOKUP
                    .get(&value.to_ascii_lowercase())
                    .copied()
                    .ok_or_else(|| Error::Header(value.to_string()))
            }
        }
    };
}

// ----------------------------------------------------------------------------

define_and_impl_header! {

    /// Content description.
    Content: {
        /// Content-Disposition
        ContentDisposition = "Content-Disposition",
        /// Content-Encoding
        ContentEncoding = "Content-Encoding",
        /// Content-Language
        ContentLanguage = "Content-Language",
        /// Content-Length
        ContentLength = "Content-Length",
        /// Content-Type
        ContentType = "Content-Type",
    }

    /// Content negotiation.
    Negotiation: {
        /// Accept
        Accept = "Accept",
        /// Accept-Charset
        AcceptCharset = "Accept-Charset",
        /// Accept-Encoding
        AcceptEncoding = "Accept-Encoding",
        /// Accept-Language
        AcceptLanguage = "Accept-Language",
        /// Vary
        Vary = "Vary",
    }

    /// Caching and conditional requests.
    Caching: {
        /// Age
        Age = "Age",
        /// Cache-Control
        CacheControl = "Cache-Control",
        /// Date
        Date = "Date",
        /// ETag
        ETag = "ETag",
        /// Expires
        Expires = "Expires",
        /// If-Modified-Since
        IfModifiedSince = "If-Modified-Since",
        /// If-None-Match
        IfNoneMatch = "If-None-Match",
        /// Last-Modified
        LastModified = "Last-Modified",
        /// Pragma
        Pragma = "Pragma",
    }

    /// Authentication.
    Authentication: {
        /// Authorization
        Authorization = "Authorization",
        /// WWW-Authenticate
        WwwAuthenticate = "WWW-Authenticate",
    }

    /// Cross-origin resource sharing.
    Cors: {
        /// Access-Control-Allow-Credentials
        AccessControlAllowCredentials = "Access-Control-Allow-Credentials",
        /// Access-Control-Allow-Headers
        AccessControlAllowHeaders = "Access-Control-Allow-Headers",
        /// Access-Control-Allow-Methods
        AccessControlAllowMethods = "Access-Control-Allow-Methods",
        /// Access-Control-Allow-Origin
        AccessControlAllowOrigin = "Access-Control-Allow-Origin",
        /// Access-Control-Expose-Headers
        AccessControlExposeHeaders = "Access-Control-Expose-Headers",
        /// Access-Control-Max-Age
        AccessControlMaxAge = "Access-Control-Max-Age",
        /// Access-Control-Request-Headers
        AccessControlRequestHeaders = "Access-Control-Request-Headers",
        /// Access-Control-Request-Method
        AccessControlRequestMethod = "Access-Control-Request-Method",
        /// Origin
        Origin = "Origin",
    }

    /// Request context.
    Context: {
        /// Allow
        Allow = "Allow",
        /// Cookie
        Cookie = "Cookie",
        /// Forwarded
        Forwarded = "Forwarded",
        /// Host
        Host = "Host",
        /// Location
        Location = "Location",
        /// Referer
        Referer = "Referer",
        /// Set-Cookie
        SetCookie = "Set-Cookie",
        /// User-Agent
        UserAgent = "User-Agent",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_ignoring_case() {
        assert_eq!(
            "www-authenticate".parse::<Header>().ok(),
            Some(Header::WwwAuthenticate)
        );
        assert_eq!(
            "ACCESS-CONTROL-MAX-AGE".parse::<Header>().ok(),
            Some(Header::AccessControlMaxAge)
        );
        assert!("X-Unknown".parse::<Header>().is_err());
    }

    #[test]
    fn formats_in_key_order() {
        let headers = Headers::from_iter([
            (Header::Location, "/a/"),
            (Header::ContentLength, "0"),
        ]);
        assert_eq!(
            headers.to_string(),
            "Content-Length: 0\nLocation: /a/\n"
        );
    }
}
