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

//! Status node.

use serde::Deserialize;

use trellis_serve::http::{Request, Response, ResponseExt, Status};

use crate::context::Context;
use crate::{Error, Result};

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Status node, answering every request with a fixed status.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusNode {
    /// Status code.
    #[serde(default = "StatusNode::default_code")]
    pub code: u16,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl StatusNode {
    fn default_code() -> u16 {
        200
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for StatusNode {
    fn create(&self, _ctx: &mut Context, _uri: &str) -> Result<Resolved> {
        let status = Status::try_from(self.code)
            .map_err(|_| Error::Status(self.code))?;
        Ok(Resolved::handler(move |_: Request| Response::from_status(status)))
    }

    fn name(&self) -> &str {
        "status"
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use trellis_serve::handler::Handler;

    use super::*;

    #[test]
    fn answers_with_fixed_status() {
        let mut ctx = Context::new("app", ".");
        let handler = StatusNode { code: 403 }
            .create(&mut ctx, "/")
            .unwrap()
            .into_handler();
        assert_eq!(handler.handle(Request::new()).status, Status::Forbidden);
    }

    #[test]
    fn rejects_unknown_codes() {
        let mut ctx = Context::new("app", ".");
        let result = StatusNode { code: 299 }.create(&mut ctx, "/");
        assert!(matches!(result, Err(Error::Status(299))));
    }
}
