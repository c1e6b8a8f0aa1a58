//! Poll-driven hand-off between transport threads and the scene thread.
//!
//! Transport threads [`submit`](RequestSender::submit) a request and block on
//! its reply; the thread that owns the scene drains the queue with
//! [`RequestReceiver::try_next`] from its tick and answers through
//! [`PendingRequest::respond`]. Only the draining thread touches the scene.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use thiserror::Error;
use uuid::Uuid;

use crate::reply::Reply;
use crate::request::HttpRequest;

/// Why a submitted request got no reply from the scene thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("request queue is full")]
    QueueFull,

    #[error("request queue is closed")]
    Disconnected,

    #[error("timed out waiting for reply")]
    ReplyTimeout,

    /// The request was dropped without an answer (server stopped).
    #[error("request dropped before reply")]
    Dropped,
}

/// A queued request together with its reply slot.
#[derive(Debug)]
pub struct PendingRequest {
    id: Uuid,
    request: HttpRequest,
    reply_tx: Sender<Reply>,
}

impl PendingRequest {
    /// Correlation id for logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Send the reply. Returns `false` if the requester stopped waiting.
    pub fn respond(self, reply: Reply) -> bool {
        self.reply_tx.send(reply).is_ok()
    }
}

/// Transport-side handle. Cheap to clone, one per worker thread.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: Sender<PendingRequest>,
    queue_timeout: Duration,
    reply_timeout: Duration,
}

impl RequestSender {
    /// Queue a request and block until the scene thread answers.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the queue stays full for the queue
    /// timeout, the receiver is gone, or no reply arrives in time.
    pub fn submit(&self, request: HttpRequest) -> Result<Reply, BridgeError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let pending = PendingRequest {
            id: Uuid::new_v4(),
            request,
            reply_tx,
        };
        self.tx
            .send_timeout(pending, self.queue_timeout)
            .map_err(|err| match err {
                SendTimeoutError::Timeout(_) => BridgeError::QueueFull,
                SendTimeoutError::Disconnected(_) => BridgeError::Disconnected,
            })?;
        reply_rx
            .recv_timeout(self.reply_timeout)
            .map_err(|err| match err {
                RecvTimeoutError::Timeout => BridgeError::ReplyTimeout,
                RecvTimeoutError::Disconnected => BridgeError::Dropped,
            })
    }
}

/// Scene-side handle.
#[derive(Debug)]
pub struct RequestReceiver {
    rx: Receiver<PendingRequest>,
}

impl RequestReceiver {
    /// Take the next queued request without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<PendingRequest> {
        self.rx.try_recv().ok()
    }

    /// Returns the number of requests waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a bridge holding at most `capacity` waiting requests.
#[must_use]
pub fn bridge(
    capacity: usize,
    queue_timeout: Duration,
    reply_timeout: Duration,
) -> (RequestSender, RequestReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (
        RequestSender {
            tx,
            queue_timeout,
            reply_timeout,
        },
        RequestReceiver { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use std::thread;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(5);

    #[test]
    fn test_request_waits_for_poll() {
        let (sender, receiver) = bridge(4, LONG, LONG);
        let worker = thread::spawn(move || sender.submit(HttpRequest::new(Method::Get, "/scene")));

        let pending = loop {
            if let Some(pending) = receiver.try_next() {
                break pending;
            }
            thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(pending.request().url, "/scene");
        assert!(pending.respond(Reply::deleted()));
        assert_eq!(worker.join().unwrap(), Ok(Reply::deleted()));
    }

    #[test]
    fn test_nothing_queued() {
        let (_sender, receiver) = bridge(1, SHORT, SHORT);
        assert!(receiver.try_next().is_none());
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_reply_timeout() {
        let (sender, receiver) = bridge(1, SHORT, SHORT);
        let result = sender.submit(HttpRequest::new(Method::Get, "/scene"));
        assert_eq!(result, Err(BridgeError::ReplyTimeout));
        // The request is still queued; answering it late is harmless.
        assert!(!receiver.try_next().unwrap().respond(Reply::not_found()));
    }

    #[test]
    fn test_disconnected_receiver() {
        let (sender, receiver) = bridge(1, SHORT, SHORT);
        drop(receiver);
        assert_eq!(
            sender.submit(HttpRequest::new(Method::Get, "/scene")),
            Err(BridgeError::Disconnected)
        );
    }

    #[test]
    fn test_dropped_request_reports_dropped() {
        let (sender, receiver) = bridge(1, LONG, LONG);
        let worker = thread::spawn(move || sender.submit(HttpRequest::new(Method::Get, "/scene")));
        loop {
            if let Some(pending) = receiver.try_next() {
                drop(pending);
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(worker.join().unwrap(), Err(BridgeError::Dropped));
    }

    #[test]
    fn test_full_queue() {
        let (sender, receiver) = bridge(1, SHORT, LONG);
        let first = sender.clone();
        let _worker = thread::spawn(move || first.submit(HttpRequest::new(Method::Get, "/a")));
        while receiver.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(
            sender.submit(HttpRequest::new(Method::Get, "/b")),
            Err(BridgeError::QueueFull)
        );
        assert_eq!(receiver.len(), 1);
    }
}
