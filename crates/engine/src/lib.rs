pub mod aggregator;
pub mod dedup;
pub mod host;
pub mod payload;
pub mod poller;
pub mod router;
pub mod worker;
