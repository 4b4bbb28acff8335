//! Test doubles for code built on this crate.
//!
//! [`ScriptedReader`] stands in for the "read the resource" call a waiter
//! polls: it replays a fixed sequence of outcomes and counts how often it
//! was called.
//!
//! # Example
//!
//! ```
//! use sakura_provider_core::testing::{ScriptedReader, Step};
//! use sakura_provider_core::waiter::{wait_ready, WaitOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! # tokio::time::pause();
//! let reader = ScriptedReader::new([Step::NotFound, Step::Ready("up")]);
//! let status = wait_ready("Addon[1]", &WaitOptions::short(), || reader.read())
//!     .await
//!     .unwrap();
//! assert_eq!(status, "up");
//! assert_eq!(reader.calls(), 2);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ProviderError, Result};

/// One scripted outcome of a read.
#[derive(Debug, Clone)]
pub enum Step<T> {
    /// The read succeeds with this value.
    Ready(T),
    /// The resource is not visible yet (404).
    NotFound,
    /// The API fails with this status code.
    Fail(u16),
    /// The read takes this long, then yields the inner step.
    Delay(Duration, Box<Step<T>>),
    /// The read never completes.
    Hang,
}

/// A read function that replays a script.
///
/// Once the script runs out, the last step repeats forever.
#[derive(Debug)]
pub struct ScriptedReader<T> {
    script: Mutex<VecDeque<Step<T>>>,
    last: Mutex<Option<Step<T>>>,
    calls: AtomicUsize,
}

impl<T: Clone> ScriptedReader<T> {
    /// Create a reader replaying `steps` in order.
    pub fn new(steps: impl IntoIterator<Item = Step<T>>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// A reader that fails with `status` on every call.
    pub fn always_failing(status: u16) -> Self {
        Self::new([Step::Fail(status)])
    }

    /// Number of times [`ScriptedReader::read`] has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Perform one scripted read.
    pub async fn read(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut step = self.next_step();
        loop {
            match step {
                Step::Ready(value) => return Ok(value),
                Step::NotFound => return Err(ProviderError::api(404, "resource not found")),
                Step::Fail(status) => return Err(ProviderError::api(status, "scripted failure")),
                Step::Delay(delay, next) => {
                    tokio::time::sleep(delay).await;
                    step = *next;
                }
                Step::Hang => return std::future::pending().await,
            }
        }
    }

    fn next_step(&self) -> Step<T> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(step) = script.pop_front() {
            *last = Some(step.clone());
            return step;
        }
        last.clone().unwrap_or(Step::NotFound)
    }
}

#[cfg(test)]
pub(crate) use fixture::ProfileFixture;

#[cfg(test)]
mod fixture {
    use std::path::Path;

    use tempfile::TempDir;

    use crate::profile::{ProfileStore, ProfileValues};

    /// A throwaway profile directory.
    pub(crate) struct ProfileFixture {
        dir: TempDir,
    }

    impl ProfileFixture {
        pub(crate) fn new() -> Self {
            Self {
                dir: TempDir::new().expect("create temp dir"),
            }
        }

        pub(crate) fn path(&self) -> &Path {
            self.dir.path()
        }

        pub(crate) fn store(&self) -> ProfileStore {
            ProfileStore::new(self.dir.path())
        }

        pub(crate) fn values(token: &str) -> ProfileValues {
            ProfileValues {
                access_token: Some(token.to_string()),
                access_token_secret: Some(format!("{}-secret", token)),
                ..Default::default()
            }
        }

        pub(crate) fn with_profile(self, name: &str, values: ProfileValues) -> Self {
            self.store().save(name, &values).expect("save profile");
            self
        }

        pub(crate) fn with_current(self, name: &str) -> Self {
            self.store().set_current(name).expect("set current profile");
            self
        }
    }
}
