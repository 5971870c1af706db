//! Listener stream lifecycle: one worker per connected client running the
//! mix → encode → pace loop, bridged to the async HTTP layer through a
//! bounded channel.
//!
//! The worker is a `spawn_blocking` task: decoders and the pacer sleep are
//! blocking by nature, and giving each listener its own worker guarantees a
//! slow decode never stalls another listener's pacer.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};

use bytes::Bytes;
use sonocodec::Mp3Encoder;
use sonotheme::ThemeDefinition;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{mixer::Mixer, pacer::RealTimePacer, CHUNK_SECS};

/// Chunks buffered between the worker and the HTTP writer. Small on
/// purpose: a slow client exerts backpressure on the worker instead of
/// growing a queue.
const STREAM_CHANNEL_CAPACITY: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("stream capacity reached ({0} listeners active)")]
    CapacityExhausted(usize),
    #[error("encoder error: {0}")]
    Encoder(#[from] sonocodec::CodecError),
}

struct ListenerHandle {
    theme_id: String,
    cancel: CancellationToken,
}

/// Owns every live listener. Attach builds the per-listener pipeline;
/// teardown happens from either side — client disconnect (receiver drop) or
/// cancellation — and always removes the listener from the live set.
///
/// Cheap to clone; clones share the live set.
#[derive(Clone)]
pub struct StreamManager {
    max_streams: usize,
    next_listener_id: Arc<AtomicU64>,
    listeners: Arc<Mutex<HashMap<u64, ListenerHandle>>>,
}

impl StreamManager {
    pub fn new(max_streams: usize) -> Self {
        Self {
            max_streams,
            next_listener_id: Arc::new(AtomicU64::new(1)),
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Opens an MP3 byte stream over `theme` for a new listener.
    ///
    /// The theme definition is pinned by the stream: rescans and theme
    /// deletion never affect a listener that is already connected.
    pub fn attach(&self, theme: Arc<ThemeDefinition>) -> Result<ListenerStream, StreamError> {
        let cancel = CancellationToken::new();
        let listener_id = {
            let mut listeners = self.listeners.lock().expect("listener set poisoned");
            if listeners.len() >= self.max_streams {
                return Err(StreamError::CapacityExhausted(listeners.len()));
            }
            let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
            listeners.insert(
                id,
                ListenerHandle {
                    theme_id: theme.id().to_string(),
                    cancel: cancel.clone(),
                },
            );
            id
        };

        // Encoder construction failures surface here, before any HTTP
        // headers are sent.
        let encoder = match Mp3Encoder::new() {
            Ok(encoder) => encoder,
            Err(err) => {
                self.detach(listener_id);
                return Err(StreamError::Encoder(err));
            }
        };

        let mixer = Mixer::new(theme.clone(), listener_id);
        let (tx, rx) = mpsc::channel::<Bytes>(STREAM_CHANNEL_CAPACITY);

        info!(
            listener_id,
            theme = theme.id(),
            tracks = theme.tracks().len(),
            "Listener attached"
        );

        let manager = self.clone();
        let worker_cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            run_listener(listener_id, mixer, encoder, tx, worker_cancel);
            manager.detach(listener_id);
        });

        Ok(ListenerStream {
            listener_id,
            rx,
            cancel,
        })
    }

    fn detach(&self, listener_id: u64) {
        let removed = self
            .listeners
            .lock()
            .expect("listener set poisoned")
            .remove(&listener_id);
        if let Some(handle) = removed {
            handle.cancel.cancel();
            debug!(listener_id, theme = %handle.theme_id, "Listener detached");
        }
    }

    /// Number of live listeners.
    pub fn active(&self) -> usize {
        self.listeners.lock().expect("listener set poisoned").len()
    }

    /// Number of live listeners on one theme.
    pub fn active_for(&self, theme_id: &str) -> usize {
        self.listeners
            .lock()
            .expect("listener set poisoned")
            .values()
            .filter(|h| h.theme_id == theme_id)
            .count()
    }

    /// Cancels every live listener (server shutdown).
    pub fn cancel_all(&self) {
        let listeners = self.listeners.lock().expect("listener set poisoned");
        for handle in listeners.values() {
            handle.cancel.cancel();
        }
    }
}

/// The blocking per-listener loop.
///
/// Pacing happens before the bytes are yielded, so the channel never runs
/// ahead of real time by more than the slack; a slow client blocks the
/// `blocking_send`, which is the backpressure path.
fn run_listener(
    listener_id: u64,
    mut mixer: Mixer,
    mut encoder: Mp3Encoder,
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) {
    let mut pacer = RealTimePacer::new();

    loop {
        if cancel.is_cancelled() {
            debug!(listener_id, "Listener cancelled");
            break;
        }

        let chunk = mixer.next_chunk();
        let bytes = match encoder.encode(chunk.samples()) {
            Ok(bytes) => bytes,
            Err(err) => {
                // Encoder failures terminate this one stream only.
                error!(listener_id, error = %err, "Encoder failed, closing stream");
                break;
            }
        };

        if !pacer.pace(CHUNK_SECS, &cancel) {
            break;
        }

        if !bytes.is_empty() && tx.blocking_send(Bytes::from(bytes)).is_err() {
            debug!(listener_id, "Client disconnected");
            break;
        }
    }

    debug!(
        listener_id,
        audio_secs = pacer.audio_secs(),
        "Listener stream finished"
    );
}

/// The receiving half handed to the HTTP layer. Implements `Stream<Item =
/// Bytes>`; dropping it cancels the worker within one chunk duration, which
/// closes decoder handles and frees the listener slot.
pub struct ListenerStream {
    listener_id: u64,
    rx: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
}

impl ListenerStream {
    pub fn listener_id(&self) -> u64 {
        self.listener_id
    }

    /// Receives the next packet (test/tooling convenience; HTTP uses the
    /// `Stream` impl).
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl futures_util::Stream for ListenerStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ListenerStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
