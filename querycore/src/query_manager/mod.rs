// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Execute queries and track their lifecycle.
//!
//! Every query is registered under its query id for the duration of its
//! execution. Synchronous queries run on the caller's thread; asynchronous
//! queries run on a background task that reports progress over a bounded
//! state channel.

pub mod collaborators;
pub mod diagnostics;
pub mod executor;
pub mod registry;
pub mod running_query;
