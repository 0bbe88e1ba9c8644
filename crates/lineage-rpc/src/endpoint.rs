//! Request multiplexing over one duplex byte stream.
//!
//! An [`Endpoint`] owns the write half of the stream and a reader thread that
//! owns the read half. Each request registers a one-shot reply slot keyed by
//! its id before it is written, so any number of threads may have requests in
//! flight and responses complete in whatever order the peer sends them.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::RpcError;
use crate::framing::{FrameDecoder, encode_frame};
use crate::jsonrpc::{ErrorReply, Message, Notification, Request, RequestId, Response, ServerRequest};

/// Log target for endpoint operations.
pub(crate) const ENDPOINT_TARGET: &str = "lineage_rpc::endpoint";

const READ_CHUNK_BYTES: usize = 8 * 1024;

type Reply = Result<Value, RpcError>;
type NotificationHandler = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// Multiplexing JSON-RPC endpoint.
///
/// Dropping the endpoint closes it: outstanding requests are rejected with
/// [`RpcError::Closed`].
pub struct Endpoint {
    shared: Arc<Shared>,
}

struct Shared {
    writer: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<HashMap<i64, Sender<Reply>>>,
    listeners: Mutex<HashMap<String, Vec<NotificationHandler>>>,
    next_id: AtomicI64,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking listener must not wedge the transport.
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

impl Endpoint {
    /// Starts an endpoint over the given stream halves.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Io`] if the reader thread cannot be spawned.
    pub fn new<R, W>(reader: R, writer: W) -> Result<Self, RpcError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared {
            writer: Mutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
        });

        let reader_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("lineage-rpc-reader".to_owned())
            .spawn(move || run_reader(reader, &reader_shared))?;

        Ok(Self { shared })
    }

    /// Sends a request and returns the handle that resolves with its result.
    ///
    /// # Errors
    ///
    /// Fails fast with [`RpcError::Closed`] once the stream has closed, and
    /// returns codec or I/O errors if the request cannot be written.
    pub fn request<P>(&self, method: &str, params: P) -> Result<PendingRequest, RpcError>
    where
        P: Serialize,
    {
        let params = params_value(params)?;
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel();

        {
            let mut pending = lock(&self.shared.pending);
            if self.shared.is_closed() {
                return Err(RpcError::Closed);
            }
            pending.insert(id, sender);
        }

        debug!(target: ENDPOINT_TARGET, method, id, "sending request");
        if let Err(error) = self.shared.write_message(&Request::new(id, method, params)) {
            lock(&self.shared.pending).remove(&id);
            return Err(error);
        }

        Ok(PendingRequest {
            id,
            method: method.to_owned(),
            receiver,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Sends a notification; no response is expected.
    ///
    /// # Errors
    ///
    /// Fails with [`RpcError::Closed`] once the stream has closed, and returns
    /// codec or I/O errors if the notification cannot be written.
    pub fn notify<P>(&self, method: &str, params: P) -> Result<(), RpcError>
    where
        P: Serialize,
    {
        if self.shared.is_closed() {
            return Err(RpcError::Closed);
        }
        let params = params_value(params)?;
        debug!(target: ENDPOINT_TARGET, method, "sending notification");
        self.shared.write_message(&Notification::new(method, params))
    }

    /// Registers a listener for server notifications with the given method.
    pub fn on_notification<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        lock(&self.shared.listeners)
            .entry(method.into())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    /// Whether the stream has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Closes the endpoint and rejects every outstanding request.
    pub fn close(&self) {
        self.shared.shut_down();
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.shared.shut_down();
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("closed", &self.is_closed())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

/// A request awaiting its response.
///
/// Dropping the handle releases the reply slot; a late response for it is
/// then ignored like any other unknown id.
#[derive(Debug)]
pub struct PendingRequest {
    id: i64,
    method: String,
    receiver: Receiver<Reply>,
    shared: Arc<Shared>,
}

impl PendingRequest {
    /// The id assigned to the request.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Blocks until the response arrives.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Server`] when the peer answered with an error
    /// object and [`RpcError::Closed`] when the stream closed first.
    pub fn wait(self) -> Result<Value, RpcError> {
        self.receiver.recv().unwrap_or(Err(RpcError::Closed))
    }

    /// Blocks for at most `timeout`.
    ///
    /// # Errors
    ///
    /// As [`PendingRequest::wait`], plus [`RpcError::Timeout`] when no
    /// response arrived in time.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Value, RpcError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    target: ENDPOINT_TARGET,
                    method = %self.method,
                    id = self.id,
                    ?timeout,
                    "request timed out"
                );
                Err(RpcError::Timeout {
                    method: self.method.clone(),
                    timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(RpcError::Closed),
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        lock(&self.shared.pending).remove(&self.id);
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn write_message<T: Serialize>(&self, message: &T) -> Result<(), RpcError> {
        let payload = serde_json::to_vec(message)?;
        let frame = encode_frame(&payload);
        let mut writer = lock(&self.writer);
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }

    fn dispatch(&self, payload: &[u8]) {
        match Message::from_slice(payload) {
            Ok(Message::Response(response)) => self.resolve(response),
            Ok(Message::Notification { method, params }) => {
                self.notify_listeners(&method, params.as_ref());
            }
            Ok(Message::Request(request)) => self.decline(request),
            Err(error) => {
                warn!(
                    target: ENDPOINT_TARGET,
                    %error,
                    bytes = payload.len(),
                    "dropping malformed message"
                );
            }
        }
    }

    fn resolve(&self, response: Response) {
        let slot = match response.id {
            RequestId::Number(id) => lock(&self.pending).remove(&id),
            RequestId::String(_) => None,
        };
        let Some(sender) = slot else {
            warn!(
                target: ENDPOINT_TARGET,
                id = %response.id,
                "ignoring response with unknown id"
            );
            return;
        };

        let reply = response.outcome.map_err(RpcError::from_response_error);
        if sender.send(reply).is_err() {
            trace!(target: ENDPOINT_TARGET, id = %response.id, "requester went away");
        }
    }

    fn notify_listeners(&self, method: &str, params: Option<&Value>) {
        let handlers = lock(&self.listeners).get(method).cloned();
        match handlers {
            Some(handlers) => {
                for handler in handlers {
                    if panic::catch_unwind(AssertUnwindSafe(|| handler(params))).is_err() {
                        warn!(target: ENDPOINT_TARGET, method, "notification listener panicked");
                    }
                }
            }
            None => debug!(target: ENDPOINT_TARGET, method, "no listener for notification"),
        }
    }

    fn decline(&self, request: ServerRequest) {
        debug!(
            target: ENDPOINT_TARGET,
            method = %request.method,
            id = %request.id,
            "declining server-initiated request"
        );
        let reply = ErrorReply::method_not_found(request.id, &request.method);
        if let Err(error) = self.write_message(&reply) {
            warn!(target: ENDPOINT_TARGET, %error, "failed to decline server request");
        }
    }

    fn shut_down(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<(i64, Sender<Reply>)> = lock(&self.pending).drain().collect();
        if !drained.is_empty() {
            debug!(
                target: ENDPOINT_TARGET,
                rejected = drained.len(),
                "rejecting outstanding requests"
            );
        }
        for (id, sender) in drained {
            if sender.send(Err(RpcError::Closed)).is_err() {
                trace!(target: ENDPOINT_TARGET, id, "requester went away");
            }
        }
    }
}

fn params_value<P: Serialize>(params: P) -> Result<Option<Value>, RpcError> {
    match serde_json::to_value(params)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

/// Shuts the endpoint down when the reader thread exits, including by
/// unwinding.
struct ReaderExit<'a>(&'a Shared);

impl Drop for ReaderExit<'_> {
    fn drop(&mut self) {
        self.0.shut_down();
    }
}

fn run_reader<R: Read>(mut reader: R, shared: &Shared) {
    let _exit = ReaderExit(shared);
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => {
                debug!(
                    target: ENDPOINT_TARGET,
                    unread = decoder.buffered(),
                    "stream reached end of file"
                );
                break;
            }
            Ok(read) => {
                decoder.push(chunk.get(..read).unwrap_or_default());
                while let Some(frame) = decoder.next_frame() {
                    match frame {
                        Ok(payload) => shared.dispatch(&payload),
                        Err(error) => {
                            warn!(target: ENDPOINT_TARGET, %error, "discarding malformed frame");
                        }
                    }
                }
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                warn!(target: ENDPOINT_TARGET, %error, "stream read failed");
                break;
            }
        }
    }
}
