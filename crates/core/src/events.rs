//! Host lifecycle events as seen by the worker.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::Error;
use crate::http::{Request, Response};

/// Primitives the host grants the worker during install and activate.
#[async_trait]
pub trait HostControl: Send + Sync {
    /// Become eligible to activate without waiting for the previous
    /// generation's clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open client immediately.
    async fn claim_clients(&self) -> Result<(), Error>;
}

/// Outcome delivered to whoever issued the intercepted request.
pub type FetchOutcome = Result<Response, Error>;

/// One intercepted request.
///
/// The worker must call [`FetchEvent::respond_with`] exactly once. Work that
/// may outlive the response (background store writes) is attached with
/// [`FetchEvent::wait_until`] so the host can await it without delaying the
/// response.
pub struct FetchEvent {
    request: Request,
    responder: Mutex<Option<oneshot::Sender<FetchOutcome>>>,
    extensions: Mutex<Vec<JoinHandle<()>>>,
}

impl FetchEvent {
    pub fn new(request: Request) -> (Self, oneshot::Receiver<FetchOutcome>) {
        let (tx, rx) = oneshot::channel();
        let event = Self { request, responder: Mutex::new(Some(tx)), extensions: Mutex::new(Vec::new()) };
        (event, rx)
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Deliver the outcome. Fails with `AlreadyResponded` on a second call.
    ///
    /// A caller that stopped listening is not an error.
    pub fn respond_with(&self, outcome: FetchOutcome) -> Result<(), Error> {
        let tx = self.responder.lock().take().ok_or(Error::AlreadyResponded)?;
        if tx.send(outcome).is_err() {
            tracing::debug!(url = %self.request.url, "caller went away before the response was delivered");
        }
        Ok(())
    }

    pub fn has_responded(&self) -> bool {
        self.responder.lock().is_none()
    }

    /// Extend the event's lifetime until `task` finishes.
    pub fn wait_until(&self, task: JoinHandle<()>) {
        self.extensions.lock().push(task);
    }

    /// Number of lifetime extensions not yet awaited.
    pub fn pending(&self) -> usize {
        self.extensions.lock().len()
    }

    /// Whether every lifetime extension registered so far has finished.
    pub fn is_settled(&self) -> bool {
        self.extensions.lock().iter().all(JoinHandle::is_finished)
    }

    /// Await every lifetime extension registered so far.
    pub async fn settled(&self) {
        let tasks = std::mem::take(&mut *self.extensions.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(url = %self.request.url, error = %e, "fetch event extension did not complete");
            }
        }
    }
}

impl std::fmt::Debug for FetchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEvent")
            .field("request", &self.request)
            .field("responded", &self.has_responded())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::url;

    #[tokio::test]
    async fn test_respond_exactly_once() {
        let (event, rx) = FetchEvent::new(Request::get(url("/")));
        assert!(!event.has_responded());

        event.respond_with(Ok(Response::ok(url("/"), "hi"))).unwrap();
        assert!(event.has_responded());
        assert!(matches!(event.respond_with(Err(Error::ResolutionMiss("x".into()))), Err(Error::AlreadyResponded)));

        let outcome = rx.await.unwrap().unwrap();
        assert_eq!(&outcome.body[..], b"hi");
    }

    #[tokio::test]
    async fn test_respond_after_caller_dropped() {
        let (event, rx) = FetchEvent::new(Request::get(url("/")));
        drop(rx);
        assert!(event.respond_with(Ok(Response::ok(url("/"), ""))).is_ok());
    }

    #[tokio::test]
    async fn test_settled_awaits_extensions() {
        let (event, _rx) = FetchEvent::new(Request::get(url("/")));
        let (done_tx, done_rx) = oneshot::channel::<()>();
        event.wait_until(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let _ = done_tx.send(());
        }));
        assert_eq!(event.pending(), 1);

        event.settled().await;

        assert_eq!(event.pending(), 0);
        assert!(done_rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_is_settled_tracks_extensions() {
        let (event, _rx) = FetchEvent::new(Request::get(url("/")));
        assert!(event.is_settled());

        let (release_tx, release_rx) = oneshot::channel::<()>();
        event.wait_until(tokio::spawn(async move {
            let _ = release_rx.await;
        }));
        assert!(!event.is_settled());

        release_tx.send(()).unwrap();
        while !event.is_settled() {
            tokio::task::yield_now().await;
        }
        assert_eq!(event.pending(), 1);
    }
}
