//! One task per session.
//!
//! The [`SyncSession`] is owned by a tokio task and driven through a command
//! queue, so patches from any number of producers are applied one at a time
//! in arrival order. The task turns session events into I/O: messages go to
//! subscriber channels, file writes go through the [`FileMirror`] and are
//! acknowledged back to the session.

use crate::errors::{WorkspaceError, WorkspaceResult};
use crate::mirror::FileMirror;
use crate::watcher::{FileWatcher, WatchConfig, WatchEvent};
use codeweave_editor::{
    Document, DocumentSnapshot, Patch, PeerId, PeerMessage, RenderedBlock, SessionEvent,
    SessionId, SessionResult, SessionState, SyncConfig, SyncSession,
};
use codeweave_lexer::{IDGenerator, LanguageProfile};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Subscribe {
        peer: PeerId,
        outbox: mpsc::Sender<PeerMessage>,
    },
    Unsubscribe {
        peer: PeerId,
    },
    Message {
        from: PeerId,
        message: PeerMessage,
        reply: Reply<SessionResult<()>>,
    },
    ViewEdit {
        from: PeerId,
        base_revision: u64,
        blocks: Vec<RenderedBlock>,
        reply: Reply<SessionResult<()>>,
    },
    LocalEdit {
        patch: Patch,
        reply: Reply<SessionResult<u64>>,
    },
    FileChanged {
        text: String,
        reply: Reply<SessionResult<()>>,
    },
    Snapshot {
        reply: Reply<Option<DocumentSnapshot>>,
    },
    State {
        reply: Reply<SessionState>,
    },
    Close {
        reply: Reply<()>,
    },
}

/// Cheap, cloneable way to talk to a session task
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<Command>,
}

/// What a session task starts from
pub struct SessionSpec {
    pub id: SessionId,
    pub text: String,
    pub profile: Arc<LanguageProfile>,
    pub config: SyncConfig,
    /// Backing file; `None` for in-memory sessions
    pub mirror: Option<FileMirror>,
}

impl SessionHandle {
    /// Start a session task. The document is built on a blocking worker;
    /// commands sent meanwhile wait until it is ready.
    ///
    /// The receiver resolves once the document is open. If opening fails the
    /// task ends and the handle reports [`WorkspaceError::SessionGone`].
    pub fn spawn(spec: SessionSpec) -> (Self, oneshot::Receiver<SessionResult<()>>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (opened_tx, opened_rx) = oneshot::channel();
        let id = spec.id.clone();
        tokio::spawn(run(spec, rx, opened_tx));
        (Self { id, commands: tx }, opened_rx)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Register a peer; messages for it are pushed to `outbox`
    pub async fn subscribe(&self, peer: PeerId, outbox: mpsc::Sender<PeerMessage>) -> WorkspaceResult<()> {
        self.send(Command::Subscribe { peer, outbox }).await
    }

    pub async fn unsubscribe(&self, peer: PeerId) -> WorkspaceResult<()> {
        self.send(Command::Unsubscribe { peer }).await
    }

    /// Deliver a wire message from `from`
    pub async fn message(&self, from: PeerId, message: PeerMessage) -> WorkspaceResult<()> {
        self.request(|reply| Command::Message { from, message, reply })
            .await?
            .map_err(Into::into)
    }

    pub async fn submit(&self, from: PeerId, patch: Patch) -> WorkspaceResult<()> {
        let message = PeerMessage::patch(self.id.clone(), patch);
        self.message(from, message).await
    }

    pub async fn view_edit(
        &self,
        from: PeerId,
        base_revision: u64,
        blocks: Vec<RenderedBlock>,
    ) -> WorkspaceResult<()> {
        self.request(|reply| Command::ViewEdit {
            from,
            base_revision,
            blocks,
            reply,
        })
        .await?
        .map_err(Into::into)
    }

    /// Apply an edit locally and write it through; returns the new revision
    pub async fn local_edit(&self, patch: Patch) -> WorkspaceResult<u64> {
        self.request(|reply| Command::LocalEdit { patch, reply })
            .await?
            .map_err(Into::into)
    }

    pub async fn file_changed(&self, text: String) -> WorkspaceResult<()> {
        self.request(|reply| Command::FileChanged { text, reply })
            .await?
            .map_err(Into::into)
    }

    /// Current document, if one is open
    pub async fn snapshot(&self) -> WorkspaceResult<Option<DocumentSnapshot>> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn state(&self) -> WorkspaceResult<SessionState> {
        self.request(|reply| Command::State { reply }).await
    }

    /// Tear the session down and wait for the task to finish
    pub async fn close(&self) -> WorkspaceResult<()> {
        self.request(|reply| Command::Close { reply }).await
    }

    /// Feed file changes seen by a watcher into this session
    pub fn watch(&self, path: PathBuf, config: &WatchConfig) -> WorkspaceResult<FileWatcher> {
        let (tx, mut rx) = mpsc::channel(8);
        let watcher = FileWatcher::spawn(path, config, tx)?;

        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    WatchEvent::Changed(text) => {
                        if let Err(e) = handle.file_changed(text).await {
                            match e {
                                WorkspaceError::SessionGone(_) => break,
                                other => warn!(session = %handle.id, error = %other, "File change not applied"),
                            }
                        }
                    }
                    WatchEvent::Removed => {
                        warn!(session = %handle.id, "Watched file disappeared");
                    }
                }
            }
        });
        Ok(watcher)
    }

    async fn send(&self, command: Command) -> WorkspaceResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WorkspaceError::SessionGone(self.id.clone()))
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> WorkspaceResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(command(tx)).await?;
        rx.await.map_err(|_| WorkspaceError::SessionGone(self.id.clone()))
    }
}

struct Actor {
    session: SyncSession,
    mirror: Option<FileMirror>,
    outboxes: HashMap<PeerId, mpsc::Sender<PeerMessage>>,
}

async fn run(
    spec: SessionSpec,
    mut commands: mpsc::Receiver<Command>,
    opened: oneshot::Sender<SessionResult<()>>,
) {
    let SessionSpec {
        id,
        text,
        profile,
        config,
        mirror,
    } = spec;
    let tick_every = (config.ack_timeout() / 10).max(Duration::from_millis(10));

    let mut actor = Actor {
        session: SyncSession::new(id.clone(), config),
        mirror,
        outboxes: HashMap::new(),
    };
    if let Err(e) = actor.session.begin_open() {
        let _ = opened.send(Err(e));
        return;
    }

    // Loading: only subscriptions and close are handled; the rest waits
    let mut open = tokio::task::spawn_blocking(move || Document::open_with_ids(&text, profile, IDGenerator::new()));
    let mut deferred = Vec::new();
    loop {
        tokio::select! {
            joined = &mut open => {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        error!(session = %id, error = %e, "Document build task failed");
                        actor.session.close();
                        return;
                    }
                };
                match actor.session.finish_open(result) {
                    Ok(()) => {
                        let _ = opened.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = opened.send(Err(e));
                        return;
                    }
                }
                break;
            }
            command = commands.recv() => match command {
                Some(Command::Close { reply }) => {
                    open.abort();
                    actor.session.close();
                    info!(session = %id, "Open aborted");
                    let _ = reply.send(());
                    return;
                }
                Some(Command::Subscribe { peer, outbox }) => actor.subscribe(peer, outbox),
                Some(other) => deferred.push(other),
                None => {
                    open.abort();
                    return;
                }
            }
        }
    }
    actor.flush().await;

    for command in deferred {
        if actor.handle(command).await {
            return;
        }
    }

    let mut ticker = tokio::time::interval(tick_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if actor.handle(command).await {
                        break;
                    }
                }
                None => {
                    actor.session.close();
                    break;
                }
            },
            _ = ticker.tick() => {
                if actor.session.tick(Instant::now()) {
                    actor.flush().await;
                }
            }
        }
    }
    debug!(session = %id, "Session task finished");
}

impl Actor {
    fn subscribe(&mut self, peer: PeerId, outbox: mpsc::Sender<PeerMessage>) {
        self.outboxes.insert(peer.clone(), outbox);
        self.session.subscribe(peer);
    }

    /// Returns `true` once the session is closed.
    ///
    /// Side effects are carried out before replying, so a caller that gets
    /// its answer can rely on the file and peers having been updated.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Subscribe { peer, outbox } => {
                self.subscribe(peer, outbox);
                self.flush().await;
            }
            Command::Unsubscribe { peer } => {
                self.outboxes.remove(&peer);
                self.session.unsubscribe(&peer);
            }
            Command::Message { from, message, reply } => {
                let result = self.session.handle_message(from, message);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::ViewEdit {
                from,
                base_revision,
                blocks,
                reply,
            } => {
                let result = self.session.apply_view_edit(from, base_revision, &blocks);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::LocalEdit { patch, reply } => {
                let result = self.session.local_edit(patch);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::FileChanged { text, reply } => {
                let result = self.session.file_changed(&text);
                self.flush().await;
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.document().map(DocumentSnapshot::from));
            }
            Command::State { reply } => {
                let _ = reply.send(self.session.state());
            }
            Command::Close { reply } => {
                self.session.close();
                self.outboxes.clear();
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    /// Carry out queued session events until there are none left
    async fn flush(&mut self) {
        loop {
            let events = self.session.take_events();
            if events.is_empty() {
                return;
            }
            for event in events {
                match event {
                    SessionEvent::Send { to, message } => self.deliver(to, message),
                    SessionEvent::WriteFile { revision, text } => self.write(revision, &text).await,
                }
            }
        }
    }

    /// Never waits on a peer: one that stops reading is dropped
    fn deliver(&mut self, to: PeerId, message: PeerMessage) {
        let Some(outbox) = self.outboxes.get(&to) else {
            return;
        };
        match outbox.try_send(message) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => {
                warn!(session = %self.session.id(), peer = %to, "Peer is not keeping up, dropping it");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session = %self.session.id(), peer = %to, "Peer went away");
            }
        }
        self.outboxes.remove(&to);
        self.session.unsubscribe(&to);
    }

    async fn write(&mut self, revision: u64, text: &str) {
        let written = match &mut self.mirror {
            Some(mirror) => match mirror.write(revision, text).await {
                Ok(()) => true,
                Err(e) => {
                    // No ack: the session times out and moves on
                    error!(session = %self.session.id(), revision, error = %e, "Write-through failed");
                    false
                }
            },
            // Nothing to write to; treat as written
            None => true,
        };
        if written {
            let _ = self.session.ack(&PeerId::file_system(), revision);
        }
    }
}
