pub mod bucket;
pub mod config;
pub mod context;
pub mod demo_feed;
pub mod feed_source;
pub mod grouping;
pub mod h2h;
pub mod http_cache;
pub mod http_client;
pub mod names;
pub mod normalize;
pub mod poller;
pub mod reconcile;
pub mod standings;
pub mod state;
pub mod timeline;
pub mod upstream;
