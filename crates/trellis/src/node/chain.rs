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

//! Chain node.

use dashmap::DashMap;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use trellis_serve::handler::{Handler, NotFound};
use trellis_serve::http::{Request, Response, ResponseExt, Status};

use crate::context::Context;
use crate::descriptor::Descriptor;
use crate::settings::Interval;
use crate::Result;

use super::{Node, Resolved};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Number of remembered winners after which expired ones are swept.
const SWEEP_INTERVAL: usize = 256;

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Chain node, trying nodes in order until one of them handles the request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChainNode {
    /// Nodes to try.
    #[serde(default, alias = "restlets")]
    pub nodes: Vec<Descriptor>,
    /// Time-to-live of remembered winners.
    #[serde(default)]
    pub cache_duration: Option<Interval>,
}

/// Chain.
///
/// A chain offers a request to its handlers in order, until one of them
/// answers with anything else than "404 Not Found". The winning handler is
/// remembered for the request's reference for the time-to-live, so the next
/// request for the same reference is offered to it first. A remembered
/// handler that answers with "404 Not Found" is forgotten, and the search
/// continues with the other handlers, so remembering only ever changes the
/// order in which handlers are tried. Handlers answering with server errors
/// are never remembered. A time-to-live of zero disables remembering. Expired
/// winners are swept periodically, so distinct references can't pile up.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use trellis::node::chain::Chain;
/// use trellis_serve::handler::{Handler, NotFound};
/// use trellis_serve::http::{Request, Response, ResponseExt, Status};
///
/// // Create chain falling back to second handler
/// let handlers: Vec<Arc<dyn Handler>> = vec![
///     Arc::new(NotFound),
///     Arc::new(|_: Request| Response::from_text("fallback")),
/// ];
/// let chain = Chain::new(handlers, Duration::from_secs(1));
///
/// // Handle request
/// let res = chain.handle(Request::new());
/// assert_eq!(res.status, Status::Ok);
/// ```
pub struct Chain {
    /// Handlers to try.
    handlers: Vec<Arc<dyn Handler>>,
    /// Time-to-live of remembered winners.
    ttl: Duration,
    /// Remembered winners by reference.
    cache: DashMap<String, (usize, Instant)>,
    /// Winners remembered since the last sweep.
    inserts: AtomicUsize,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Chain {
    /// Creates a chain.
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn Handler>>, ttl: Duration) -> Self {
        Self {
            handlers,
            ttl,
            cache: DashMap::new(),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Forgets the winner for the given reference.
    pub fn invalidate(&self, reference: &str) {
        self.cache.remove(reference);
    }

    /// Forgets all winners.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remembers the winner for the given reference, sweeping expired winners
    /// every now and then.
    fn remember(&self, reference: String, index: usize) {
        self.cache.insert(reference, (index, Instant::now()));
        let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserts % SWEEP_INTERVAL == 0 {
            self.cache.retain(|_, (_, since)| since.elapsed() < self.ttl);
        }
    }

    /// Returns the remembered winner for the given reference, forgetting it
    /// if it expired.
    fn winner(&self, reference: &str) -> Option<usize> {
        if self.ttl.is_zero() {
            return None;
        }
        let index = self.cache.get(reference).and_then(|entry| {
            let (index, since) = *entry.value();
            (since.elapsed() < self.ttl).then_some(index)
        });
        if index.is_none() {
            self.cache.remove(reference);
        }
        index
    }
}

#[allow(clippy::must_use_candidate)]
impl Chain {
    /// Returns the number of handlers.
    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether there are no handlers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Node for ChainNode {
    fn create(&self, ctx: &mut Context, uri: &str) -> Result<Resolved> {
        let ttl = match self.cache_duration {
            Some(interval) => interval.0,
            None => ctx.chain_ttl(),
        };
        build(ctx, uri, &self.nodes, ttl)
    }

    fn name(&self) -> &str {
        "chain"
    }
}

// ----------------------------------------------------------------------------

impl Handler for Chain {
    fn handle(&self, req: Request) -> Response {
        let reference = req.reference();

        // Offer request to remembered winner first
        let winner = self.winner(&reference);
        if let Some(index) = winner {
            let res = self.handlers[index].handle(req.clone());
            if res.status != Status::NotFound {
                if res.status.is_server_error() {
                    self.cache.remove(&reference);
                }
                return res;
            }
            self.cache.remove(&reference);
        }

        // Offer request to all other handlers in order
        let mut last = None;
        for (index, handler) in self.handlers.iter().enumerate() {
            if winner == Some(index) {
                continue;
            }
            let res = handler.handle(req.clone());
            if res.status == Status::NotFound {
                last = Some(res);
                continue;
            }
            if !self.ttl.is_zero() && !res.status.is_server_error() {
                self.remember(reference, index);
            }
            return res;
        }
        last.unwrap_or_else(|| Response::from_status(Status::NotFound))
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.handlers.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Resolves the given descriptors into a chain with the given time-to-live.
///
/// Hidden descriptors are skipped, and a single remaining handler is used
/// directly, as there's nothing to choose from.
///
/// # Errors
///
/// Returns an error if any of the descriptors can't be resolved.
pub fn build(
    ctx: &mut Context, uri: &str, nodes: &[Descriptor], ttl: Duration,
) -> Result<Resolved> {
    let mut handlers = Vec::with_capacity(nodes.len());
    for descriptor in nodes {
        if let Resolved::Handler(handler) = ctx.resolve(descriptor, uri)? {
            handlers.push(handler);
        }
    }
    Ok(match handlers.len() {
        0 => Resolved::handler(NotFound),
        1 => Resolved::Handler(handlers.remove(0)),
        _ => Resolved::handler(Chain::new(handlers, ttl)),
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::thread;

    use super::*;

    /// Handler counting its invocations.
    #[derive(Clone, Default)]
    struct Counter {
        calls: Arc<AtomicUsize>,
        missing: Arc<AtomicBool>,
        status: Option<Status>,
    }

    impl Counter {
        fn answering(status: Status) -> Self {
            Self { status: Some(status), ..Self::default() }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Handler for Counter {
        fn handle(&self, _req: Request) -> Response {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.missing.load(Ordering::SeqCst) {
                return Response::from_status(Status::NotFound);
            }
            Response::from_status(self.status.unwrap_or(Status::NotFound))
        }
    }

    fn chain(handlers: &[&Counter], ttl: Duration) -> Chain {
        let handlers = handlers
            .iter()
            .map(|&counter| Arc::new(counter.clone()) as Arc<dyn Handler>)
            .collect();
        Chain::new(handlers, ttl)
    }

    fn get(chain: &Chain, path: &str) -> Status {
        chain.handle(Request::new().uri(path)).status
    }

    #[test]
    fn remembers_winner_for_time_to_live() {
        let first = Counter::default();
        let second = Counter::answering(Status::Ok);
        let chain = chain(&[&first, &second], Duration::from_millis(50));
        assert_eq!(get(&chain, "/a"), Status::Ok);
        assert_eq!((first.calls(), second.calls()), (1, 1));
        assert_eq!(get(&chain, "/a"), Status::Ok);
        assert_eq!((first.calls(), second.calls()), (1, 2));
        thread::sleep(Duration::from_millis(80));
        assert_eq!(get(&chain, "/a"), Status::Ok);
        assert_eq!((first.calls(), second.calls()), (2, 3));
    }

    #[test]
    fn retries_from_start_without_time_to_live() {
        let first = Counter::default();
        let second = Counter::answering(Status::Ok);
        let chain = chain(&[&first, &second], Duration::ZERO);
        for _ in 0..3 {
            assert_eq!(get(&chain, "/a"), Status::Ok);
        }
        assert_eq!((first.calls(), second.calls()), (3, 3));
    }

    #[test]
    fn forgets_winner_that_stops_handling() {
        let first = Counter::answering(Status::NoContent);
        let second = Counter::answering(Status::Ok);
        let third = Counter::answering(Status::Accepted);
        let chain = chain(&[&first, &second, &third], Duration::from_secs(60));
        first.missing.store(true, Ordering::SeqCst);
        assert_eq!(get(&chain, "/a"), Status::Ok);
        second.missing.store(true, Ordering::SeqCst);
        assert_eq!(get(&chain, "/a"), Status::Accepted);
        assert_eq!(second.calls(), 2);
        first.missing.store(false, Ordering::SeqCst);
        assert_eq!(get(&chain, "/a"), Status::Accepted);
        chain.invalidate("/a");
        assert_eq!(get(&chain, "/a"), Status::NoContent);
    }

    #[test]
    fn never_remembers_server_errors() {
        let first = Counter::default();
        let second = Counter::answering(Status::InternalServerError);
        let chain = chain(&[&first, &second], Duration::from_secs(60));
        assert_eq!(get(&chain, "/a"), Status::InternalServerError);
        assert_eq!(get(&chain, "/a"), Status::InternalServerError);
        assert_eq!(first.calls(), 2);
    }

    #[test]
    fn answers_not_found_if_no_handler_applies() {
        let first = Counter::default();
        let second = Counter::default();
        let chain = chain(&[&first, &second], Duration::from_secs(60));
        assert_eq!(get(&chain, "/a"), Status::NotFound);
        assert_eq!(get(&chain, "/a"), Status::NotFound);
        assert_eq!((first.calls(), second.calls()), (2, 2));
    }

    #[test]
    fn sweeps_expired_winners() {
        let first = Counter::default();
        let second = Counter::answering(Status::Ok);
        let chain = chain(&[&first, &second], Duration::from_millis(20));
        for index in 0..SWEEP_INTERVAL - 1 {
            assert_eq!(get(&chain, &format!("/{index}")), Status::Ok);
        }
        assert_eq!(chain.cache.len(), SWEEP_INTERVAL - 1);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(get(&chain, "/last"), Status::Ok);
        assert_eq!(chain.cache.len(), 1);
        assert!(chain.cache.contains_key("/last"));
    }

    #[test]
    fn remembers_winners_per_reference() {
        let first = Counter::default();
        let second = Counter::answering(Status::Ok);
        let chain = chain(&[&first, &second], Duration::from_secs(60));
        assert_eq!(get(&chain, "/a"), Status::Ok);
        assert_eq!(get(&chain, "/b"), Status::Ok);
        assert_eq!(first.calls(), 2);
        chain.clear();
        assert_eq!(get(&chain, "/a"), Status::Ok);
        assert_eq!(first.calls(), 3);
    }
}
