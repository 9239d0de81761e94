pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod notify;
pub mod session;
pub mod thumbnail;
pub mod tree;
pub mod worker;
