//! Async runtime helpers for the signage playback core.
//!
//! All core-* crates depend on this crate instead of reaching for Tokio
//! primitives directly, so the threading model lives in one place.
//!
//! # Modules
//!
//! - `owner`: the single owner thread on which all session and render-target
//!   state is mutated. Other threads post jobs to it and await their result.
//! - `sync`: the channel primitives shared by the workspace.
//!
//! # Examples
//!
//! ```rust
//! use core_async::owner::OwnerThread;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let owner = OwnerThread::spawn("example-owner", |_handle| Vec::<u32>::new()).unwrap();
//! owner.handle().call(|items| items.push(7)).await.unwrap();
//! let len = owner.handle().call(|items| items.len()).await.unwrap();
//! assert_eq!(len, 1);
//! owner.shutdown();
//! # }
//! ```

pub mod owner;
pub mod sync;

pub use owner::{OwnerError, OwnerHandle, OwnerThread};
