use std::future::Future;

use tokio::task::AbortHandle;

/// Handle to a background job owned by a peer or by the reactor:
/// connect attempts, socket readers and writers, listeners, helper
/// pipes. Dropping the handle cancels the job, so tearing a session
/// down is just clearing the fields that hold these.
#[derive(Debug)]
pub struct Job {
    abort: AbortHandle,
    detached: bool,
}

impl Job {
    pub fn spawn<Fut>(future: Fut) -> Job
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Job {
            abort: tokio::spawn(future).abort_handle(),
            detached: false,
        }
    }

    /// Let the job run to completion instead of cancelling on drop.
    /// Used for writers that still have queued bytes to put on the
    /// wire; they exit on their own once their channel closes.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if !self.detached {
            self.abort.abort();
        }
    }
}
