pub mod aggregator;
pub mod api;
pub mod charts;
pub mod feed;
pub mod publisher;
pub mod scheduler;
pub mod source;
