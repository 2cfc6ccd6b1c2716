//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and kiosk platforms
//! (Linux, macOS, Windows).
//!
//! ## Overview
//!
//! This crate provides implementations of the host traits using
//! desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `StorageProbe` using `sysinfo` disk listings
//! - `WindowHost` as a headless host whose surfaces become ready
//!   asynchronously
//!
//! Media engines are platform specific and are always supplied by the host.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HeadlessWindowHost, ReqwestHttpClient, SysinfoStorageProbe};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .cache_dir("/var/cache/signage")
//!     .window_host(Arc::new(HeadlessWindowHost::new()))
//!     .engine_factory(engines)
//!     .http_client(Arc::new(ReqwestHttpClient::new()?))
//!     .storage_probe(Arc::new(SysinfoStorageProbe::new()))
//!     .build()?;
//! ```

mod http;
mod storage;
mod window;

pub use http::ReqwestHttpClient;
pub use storage::SysinfoStorageProbe;
pub use window::HeadlessWindowHost;
