//! RSS aggregator: registered feeds are polled on an interval by one or
//! more poller instances sharing a SQLite database, and newly observed
//! entries are persisted as posts, deduplicated by entry URL.

pub mod commands;
pub mod config;
pub mod feed;
pub mod poller;
pub mod storage;
