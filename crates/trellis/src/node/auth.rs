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

//! Basic authentication node.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;

use trellis_serve::handler::{Handler, Layer};
use trellis_serve::http::{Header, Request, Response, ResponseExt, Status};
use trellis_serve::middleware::Middleware;

use crate::attribute::USER;
use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::Result;

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Basic authentication node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthNode {
    /// Passwords by user name.
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
    /// Realm presented to clients.
    #[serde(default)]
    pub realm: Option<String>,
    /// Next node.
    pub next: Descriptor,
}

/// Middleware for basic authentication.
///
/// Requests without valid credentials are answered with "401 Unauthorized"
/// and a challenge for the realm. The name of authenticated users is written
/// to the request attributes.
#[derive(Clone, Debug)]
pub struct BasicAuth {
    /// Passwords by user name.
    credentials: BTreeMap<String, String>,
    /// Challenge.
    challenge: String,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl BasicAuth {
    /// Creates a middleware for the given credentials and realm.
    #[must_use]
    pub fn new(credentials: BTreeMap<String, String>, realm: &str) -> Self {
        let challenge = format!("Basic realm=\"{realm}\"");
        Self { credentials, challenge }
    }

    /// Returns the user name, if the request carries valid credentials.
    fn authenticate(&self, req: &Request) -> Option<String> {
        let value = req.headers.get(Header::Authorization)?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        let expected = self.credentials.get(user)?;
        (expected == password).then(|| user.to_string())
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for AuthNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        let next = ctx.resolve_handler(&self.next, uri)?;
        let realm = self.realm.as_deref().unwrap_or("Restricted");
        let middleware = BasicAuth::new(self.credentials.clone(), realm);
        Ok(Resolved::handler(Layer::new(middleware, next)))
    }

    fn name(&self) -> &str {
        "basicHttpAuthenticator"
    }
}

impl Middleware for BasicAuth {
    fn process(&self, mut req: Request, next: &dyn Handler) -> Response {
        match self.authenticate(&req) {
            Some(user) => {
                req.attributes.insert(USER, user);
                next.handle(req)
            }
            None => Response::from_status(Status::Unauthorized)
                .header(Header::WwwAuthenticate, &self.challenge),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn middleware() -> BasicAuth {
        let credentials = BTreeMap::from([(
            String::from("alice"),
            String::from("secret"),
        )]);
        BasicAuth::new(credentials, "Restricted")
    }

    fn whoami(req: Request) -> Response {
        Response::from_text(req.attributes.get(USER).unwrap_or_default())
    }

    fn authorization(credentials: &str) -> Request {
        let value = format!("Basic {}", STANDARD.encode(credentials));
        Request::new().header(Header::Authorization, value)
    }

    #[test]
    fn accepts_valid_credentials() {
        let res = middleware().process(authorization("alice:secret"), &whoami);
        assert_eq!(res.status, Status::Ok);
        assert_eq!(res.body, b"alice");
    }

    #[test]
    fn challenges_invalid_credentials() {
        for req in [
            Request::new(),
            authorization("alice:wrong"),
            authorization("bob:secret"),
            Request::new().header(Header::Authorization, "Basic !!!"),
        ] {
            let res = middleware().process(req, &whoami);
            assert_eq!(res.status, Status::Unauthorized);
            assert_eq!(
                res.headers.get(Header::WwwAuthenticate),
                Some("Basic realm=\"Restricted\"")
            );
        }
    }
}
