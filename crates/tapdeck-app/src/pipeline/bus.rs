//! Message delivery between the engine's threads and the application.
//!
//! Two delivery classes: synchronous interception inside [`Bus::post`]
//! (runs on the posting thread and may suppress a message entirely) and
//! an async channel drained on the event-loop thread after a waker ping.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use super::{ElementId, OverlayTarget, PipelineState};

pub enum BusMessage {
    StateChanged {
        origin: ElementId,
        old: PipelineState,
        new: PipelineState,
    },
    Error {
        origin: ElementId,
        message: String,
        debug: Option<String>,
    },
    EndOfStream,
    /// The current track is close to draining; a new URI set now plays
    /// gaplessly.
    AboutToFinish,
    /// The engine asks for a display-connection handle.
    NeedsContext { origin: Arc<dyn OverlayTarget> },
    /// The engine asks for a drawable surface before rendering starts.
    PrepareSurface { origin: Arc<dyn OverlayTarget> },
}

impl BusMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            BusMessage::StateChanged { .. } => "state-changed",
            BusMessage::Error { .. } => "error",
            BusMessage::EndOfStream => "end-of-stream",
            BusMessage::AboutToFinish => "about-to-finish",
            BusMessage::NeedsContext { .. } => "needs-context",
            BusMessage::PrepareSurface { .. } => "prepare-surface",
        }
    }
}

/// What a sync handler did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReply {
    /// Not handled; queue for async delivery.
    Pass,
    /// Fully handled; no other consumer sees it.
    Drop,
}

/// Handler invoked on the posting thread, before async delivery. Must
/// complete quickly: it blocks the engine.
pub trait SyncHandler: Send + Sync {
    fn on_message(&self, message: &BusMessage) -> SyncReply;
}

pub struct Bus {
    tx: Sender<BusMessage>,
    rx: Receiver<BusMessage>,
    sync: Mutex<Option<Arc<dyn SyncHandler>>>,
    waker: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl Bus {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Arc::new(Self {
            tx,
            rx,
            sync: Mutex::new(None),
            waker: Mutex::new(None),
        })
    }

    /// Install the synchronous interceptor. At most one; a later call
    /// replaces it.
    pub fn set_sync_handler(&self, handler: Arc<dyn SyncHandler>) {
        *self.sync.lock().unwrap() = Some(handler);
    }

    /// Install the wakeup hook pinged after each queued message.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.lock().unwrap() = Some(Box::new(waker));
    }

    /// Deliver a message from the engine. The sync handler runs inline on
    /// the calling thread; suppressed messages never reach the queue.
    pub fn post(&self, message: BusMessage) {
        let reply = {
            let sync = self.sync.lock().unwrap();
            match sync.as_ref() {
                Some(handler) => handler.on_message(&message),
                None => SyncReply::Pass,
            }
        };
        if reply == SyncReply::Drop {
            return;
        }
        let _ = self.tx.send(message);
        if let Some(wake) = self.waker.lock().unwrap().as_ref() {
            wake();
        }
    }

    /// The async end, drained on the event-loop thread.
    pub fn receiver(&self) -> Receiver<BusMessage> {
        self.rx.clone()
    }
}
