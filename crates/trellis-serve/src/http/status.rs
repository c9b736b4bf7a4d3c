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

//! HTTP status.

use std::fmt;

use super::error::{Error, Result};

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

#[allow(clippy::must_use_candidate)]
impl Status {
    /// Returns the numeric status code.
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Returns whether the status indicates success, i.e., `2xx`.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self.code(), 200..=299)
    }

    /// Returns whether the status indicates a redirection, i.e., `3xx`.
    #[inline]
    pub const fn is_redirection(&self) -> bool {
        matches!(self.code(), 300..=399)
    }

    /// Returns whether the status indicates a server error, i.e., `5xx`.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.code() >= 500
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl AsRef<str> for Status {
    #[inline]
    fn as_ref(&self) -> &str {
        self.reason()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

// ----------------------------------------------------------------------------
// Macros
// ----------------------------------------------------------------------------

/// Defines and implements HTTP status codes.
macro_rules! define_and_impl_status {
    (
        $(
            $(#[$_:meta])*
            $group:ident: {
                $(
                    $(#[$comment:meta])*
                    $name:ident = $code:literal, $reason:literal
                ),+
                $(,)?
            }
        )+
    ) => {
        /// HTTP status.
        #[allow(clippy::enum_variant_names)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Status {
            $(
                $(
                    $(#[$comment])*
                    $name = $code,
                )+
            )+
        }

        impl Status {
            /// Returns the reason phrase.
            #[must_use]
            pub const fn reason(&self) -> &'static str {
                match self {
                    $($(Status::$name => $reason,)+)+
                }
            }
        }

        impl TryFrom<u16> for Status {
            type Error = Error;

            /// Attempts to create a status from a numeric code.
            ///
            /// # Examples
            ///
            /// ```
            /// # use std::error::Error;
            /// # fn main() -> Result<(), Box<dyn Error>> {
            /// use trellis_serve::http::Status;
            ///
            /// // Create status from code
            /// let status = Status::try_from(404)?;
            /// assert_eq!(status, Status::NotFound);
            /// assert!(Status::try_from(299).is_err());
            /// # Ok(())
            /// # }
            /// ```
            fn try_from(code: u16) -> Result<Self> {
                match code {
                    $($($code => Ok(Status::$name),)+)+
                    _ => Err(Error::Status(code)),
                }
            }
        }
    };
}

// ----------------------------------------------------------------------------

define_and_impl_status! {

    /// 1xx
    Informational: {
        /// 100 Continue
        Continue = 100, "Continue",
        /// 101 Switching Protocols
        SwitchingProtocols = 101, "Switching Protocols",
    }

    /// 2xx
    Success: {
        /// 200 OK
        Ok = 200, "OK",
        /// 201 Created
        Created = 201, "Created",
        /// 202 Accepted
        Accepted = 202, "Accepted",
        /// 204 No Content
        NoContent = 204, "No Content",
        /// 206 Partial Content
        PartialContent = 206, "Partial Content",
    }

    /// 3xx
    Redirection: {
        /// 300 Multiple Choices
        MultipleChoices = 300, "Multiple Choices",
        /// 301 Moved Permanently
        MovedPermanently = 301, "Moved Permanently",
        /// 302 Found
        Found = 302, "Found",
        /// 303 See Other
        SeeOther = 303, "See Other",
        /// 304 Not Modified
        NotModified = 304, "Not Modified",
        /// 307 Temporary Redirect
        TemporaryRedirect = 307, "Temporary Redirect",
        /// 308 Permanent Redirect
        PermanentRedirect = 308, "Permanent Redirect",
    }

    /// 4xx
    ClientError: {
        /// 400 Bad Request
        BadRequest = 400, "Bad Request",
        /// 401 Unauthorized
        Unauthorized = 401, "Unauthorized",
        /// 403 Forbidden
        Forbidden = 403, "Forbidden",
        /// 404 Not Found
        NotFound = 404, "Not Found",
        /// 405 Method Not Allowed
        MethodNotAllowed = 405, "Method Not Allowed",
        /// 406 Not Acceptable
        NotAcceptable = 406, "Not Acceptable",
        /// 409 Conflict
        Conflict = 409, "Conflict",
        /// 410 Gone
        Gone = 410, "Gone",
        /// 413 Payload Too Large
        PayloadTooLarge = 413, "Payload Too Large",
        /// 414 URI Too Long
        UriTooLong = 414, "URI Too Long",
        /// 415 Unsupported Media Type
        UnsupportedMediaType = 415, "Unsupported Media Type",
        /// 418 I'm a Teapot
        ImATeapot = 418, "I'm a Teapot",
        /// 422 Unprocessable Entity
        UnprocessableEntity = 422, "Unprocessable Entity",
        /// 429 Too Many Requests
        TooManyRequests = 429, "Too Many Requests",
    }

    /// 5xx
    ServerError: {
        /// 500 Internal Server Error
        InternalServerError = 500, "Internal Server Error",
        /// 501 Not Implemented
        NotImplemented = 501, "Not Implemented",
        /// 502 Bad Gateway
        BadGateway = 502, "Bad Gateway",
        /// 503 Service Unavailable
        ServiceUnavailable = 503, "Service Unavailable",
        /// 504 Gateway Timeout
        GatewayTimeout = 504, "Gateway Timeout",
        /// 508 Loop Detected
        LoopDetected = 508, "Loop Detected",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_codes() {
        assert_eq!(Status::try_from(303).ok(), Some(Status::SeeOther));
        assert_eq!(Status::SeeOther.code(), 303);
        assert!(matches!(Status::try_from(999), Err(Error::Status(999))));
    }

    #[test]
    fn classifies_codes() {
        assert!(Status::NoContent.is_success());
        assert!(Status::TemporaryRedirect.is_redirection());
        assert!(Status::BadGateway.is_server_error());
        assert!(!Status::NotFound.is_server_error());
    }

    #[test]
    fn formats_with_reason() {
        assert_eq!(Status::NotFound.to_string(), "404 Not Found");
    }
}
