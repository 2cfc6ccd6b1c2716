//! Owner-thread executor.
//!
//! Every piece of session and render-target state belongs to exactly one
//! thread, mirroring the UI-thread affinity of the host view hierarchy. The
//! state value `S` is constructed *on* that thread and never leaves it, so it
//! does not need to be `Send`.
//!
//! Other threads interact with the state by posting closures through an
//! [`OwnerHandle`]:
//!
//! - [`OwnerHandle::post`] enqueues fire-and-forget work (host callbacks).
//! - [`OwnerHandle::call`] enqueues work and awaits its return value.
//!
//! Jobs run strictly in submission order on a single FIFO queue. A job must
//! never block waiting on another job; long waits are modelled as state that a
//! later job (for example a surface-readiness callback) completes.
//!
//! ```text
//!  caller threads            owner thread
//!  ──────────────            ────────────
//!  call(job) ──┐
//!  post(cb)  ──┼──> FIFO ──> job(&mut S) ──> oneshot reply
//!  call(job) ──┘
//! ```

use std::fmt;
use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};

use crate::sync::{mpsc, oneshot};
use thiserror::Error;
use tracing::{debug, warn};

type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

enum Message<S> {
    Run(Job<S>),
    Stop,
}

/// Errors surfaced when talking to the owner thread.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerError {
    /// The owner thread has stopped (shutdown or a job panicked).
    #[error("owner thread is not running")]
    Stopped,

    /// A blocking call was issued from the owner thread itself.
    #[error("blocking call on the owner thread would deadlock")]
    WouldDeadlock,

    /// The OS refused to spawn the owner thread.
    #[error("failed to spawn owner thread")]
    SpawnFailed,
}

/// Cloneable, thread-safe handle for posting work to the owner thread.
pub struct OwnerHandle<S> {
    tx: mpsc::UnboundedSender<Message<S>>,
    thread_id: ThreadId,
}

impl<S> Clone for OwnerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            thread_id: self.thread_id,
        }
    }
}

impl<S> fmt::Debug for OwnerHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerHandle")
            .field("thread_id", &self.thread_id)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S: 'static> OwnerHandle<S> {
    /// Enqueue a job without waiting for it.
    pub fn post<F>(&self, job: F) -> Result<(), OwnerError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx
            .send(Message::Run(Box::new(job)))
            .map_err(|_| OwnerError::Stopped)
    }

    /// Enqueue a job and await its result.
    ///
    /// Must not be awaited from the owner thread itself; the owner thread has
    /// no async runtime and the job could never be drained.
    pub async fn call<R, F>(&self, job: F) -> Result<R, OwnerError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(move |state| {
            let _ = reply_tx.send(job(state));
        })?;
        reply_rx.await.map_err(|_| OwnerError::Stopped)
    }

    /// Synchronous variant of [`call`](Self::call) for non-async callers.
    ///
    /// Panics if invoked from inside an async runtime, like any Tokio
    /// `blocking_recv`.
    pub fn call_blocking<R, F>(&self, job: F) -> Result<R, OwnerError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner_thread() {
            return Err(OwnerError::WouldDeadlock);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(move |state| {
            let _ = reply_tx.send(job(state));
        })?;
        reply_rx.blocking_recv().map_err(|_| OwnerError::Stopped)
    }

    /// Returns `true` when the caller is running on the owner thread.
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Returns `true` once the owner thread has stopped draining jobs.
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The owner thread itself. Dropping it stops the thread after pending jobs.
pub struct OwnerThread<S: 'static> {
    handle: OwnerHandle<S>,
    join: Mutex<Option<JoinHandle<()>>>,
    name: String,
}

impl<S: 'static> OwnerThread<S> {
    /// Spawn a named owner thread and build its state on that thread.
    ///
    /// `init` receives a handle to the thread being created so the state can
    /// hand posting capabilities to host callbacks.
    pub fn spawn<F>(name: impl Into<String>, init: F) -> Result<Self, OwnerError>
    where
        F: FnOnce(OwnerHandle<S>) -> S + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel::<Message<S>>();
        let thread_tx = tx.clone();

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let handle = OwnerHandle {
                    tx: thread_tx,
                    thread_id: thread::current().id(),
                };
                let state = init(handle);
                run_loop(state, rx);
            })
            .map_err(|_| OwnerError::SpawnFailed)?;

        let handle = OwnerHandle {
            tx,
            thread_id: join.thread().id(),
        };
        debug!(thread = %name, "Owner thread started");

        Ok(Self {
            handle,
            join: Mutex::new(Some(join)),
            name,
        })
    }

    /// Borrow the posting handle.
    pub fn handle(&self) -> &OwnerHandle<S> {
        &self.handle
    }

    /// Stop the owner thread after the jobs already queued, then wait for it.
    ///
    /// The state is dropped on the owner thread. Calling this from the owner
    /// thread only requests the stop.
    pub fn shutdown(&self) {
        let _ = self.handle.tx.send(Message::Stop);
        if self.handle.is_owner_thread() {
            return;
        }
        let join = match self.join.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(join) = join {
            if join.join().is_err() {
                warn!(thread = %self.name, "Owner thread terminated by a panic");
            }
        }
    }
}

impl<S: 'static> Drop for OwnerThread<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: 'static> fmt::Debug for OwnerThread<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerThread")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}

fn run_loop<S>(mut state: S, mut rx: mpsc::UnboundedReceiver<Message<S>>) {
    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Run(job) => job(&mut state),
            Message::Stop => break,
        }
    }
    rx.close();
    drop(state);
    debug!("Owner thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_call_returns_value() {
        let owner = OwnerThread::spawn("test-owner", |_| 40u32).unwrap();
        let value = owner.handle().call(|n| *n + 2).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let owner = OwnerThread::spawn("test-order", |_| Vec::<usize>::new()).unwrap();
        for i in 0..50 {
            owner.handle().post(move |v| v.push(i)).unwrap();
        }
        let seen = owner.handle().call(|v| v.clone()).await.unwrap();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    struct Ctx {
        handle: OwnerHandle<Ctx>,
    }

    #[tokio::test]
    async fn test_jobs_run_on_owner_thread() {
        let owner = OwnerThread::spawn("test-affinity", |handle| Ctx { handle }).unwrap();
        let on_owner = owner
            .handle()
            .call(|ctx| ctx.handle.is_owner_thread())
            .await
            .unwrap();
        assert!(on_owner);
        assert!(!owner.handle().is_owner_thread());
    }

    #[tokio::test]
    async fn test_call_after_shutdown_fails() {
        let owner = OwnerThread::spawn("test-stop", |_| ()).unwrap();
        let handle = owner.handle().clone();
        owner.shutdown();
        assert!(handle.is_stopped());
        assert_eq!(handle.call(|_| ()).await, Err(OwnerError::Stopped));
        assert_eq!(handle.post(|_| ()), Err(OwnerError::Stopped));
    }

    #[test]
    fn test_state_dropped_on_shutdown() {
        struct Probe(Arc<AtomicUsize>);
        impl Drop for Probe {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let counter = drops.clone();
        let owner = OwnerThread::spawn("test-drop", move |_| Probe(counter)).unwrap();
        owner.shutdown();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_call_blocking_from_owner_is_rejected() {
        let owner = OwnerThread::spawn("test-deadlock", |handle| Ctx { handle }).unwrap();
        let result = owner
            .handle()
            .call_blocking(|ctx| ctx.handle.call_blocking(|_| ()))
            .unwrap();
        assert_eq!(result, Err(OwnerError::WouldDeadlock));
    }
}
