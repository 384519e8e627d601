/// Askbox Feeds
///
/// Side subsystem: polls external feeds on an interval and keeps a bounded,
/// de-duplicated in-memory notification buffer with per-source error
/// tracking. Independent of the Q&A core.
pub mod poller;
pub mod sources;
pub mod store;
