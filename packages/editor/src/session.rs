//! # Sync Session
//!
//! Owns the canonical [`Document`] for one file and arbitrates every change to
//! it. Peers (rendered views, the file mirror, the local editor) submit
//! patches; the session orders them by arrival, rebases stale ones, applies
//! them and tells everyone else what happened.
//!
//! ## States
//!
//! ```text
//! Idle ──open──► Loading ──► Synced ◄──────────── ack / timeout ─┐
//!                              │                                 │
//!                              └──local_edit──► PendingAck ──────┤
//!                                                   │            │
//!                                    stale patch ──►Conflict ────┘
//! (any) ──close──► Closed
//! ```
//!
//! While a local edit waits for its acknowledgement, incoming patches are
//! queued and processed once the acknowledgement (or its timeout) arrives.
//!
//! ## Side effects
//!
//! The session does no I/O. Everything it wants done is queued as a
//! [`SessionEvent`] and collected with [`SyncSession::take_events`].

use crate::config::{ConflictPolicy, SyncConfig};
use crate::document::Document;
use crate::errors::{SessionError, SessionResult};
use crate::patch::{Patch, ReconcileError, ReconcileResult};
use crate::protocol::{MessageBody, PeerId, PeerMessage, SessionId, SupersedeReason};
use crate::reconciler;
use crate::view::RenderedBlock;
use codeweave_lexer::{IDGenerator, LanguageProfile, SegmentResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No document
    Idle,
    /// Segmenting and building
    Loading,
    /// Document up to date, nothing outstanding
    Synced,
    /// A local edit was forwarded and is not yet confirmed
    PendingAck,
    /// A patch based on a superseded revision is waiting to be rebased
    Conflict,
    /// Terminal
    Closed,
}

/// Work for whoever drives the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Deliver a message to one peer
    Send { to: PeerId, message: PeerMessage },
    /// Write the document text to the backing file
    WriteFile { revision: u64, text: String },
}

/// Local edit waiting for the file mirror to confirm its write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAck {
    pub revision: u64,
    pub origin: PeerId,
    pub awaiting: PeerId,
    pub sent_at: Instant,
}

#[derive(Debug, Clone)]
struct Submission {
    origin: PeerId,
    patch: Patch,
    /// The origin's block layout differs from what gets committed
    resync: bool,
}

/// A patch that was applied, with the document it was applied to
#[derive(Debug, Clone)]
struct Applied {
    origin: PeerId,
    before: Document,
    patch: Patch,
}

pub struct SyncSession {
    id: SessionId,
    config: SyncConfig,
    state: SessionState,
    document: Option<Document>,

    /// Peers that receive broadcasts, in a stable order
    subscribers: BTreeSet<PeerId>,

    /// Patches received while an acknowledgement is outstanding
    queue: VecDeque<Submission>,

    /// Recently applied patches, oldest first, for rebasing
    history: VecDeque<Applied>,

    pending: Option<PendingAck>,

    /// Consecutive rejections per peer
    rejections: HashMap<PeerId, u32>,

    /// Texts recently handed out for writing, to recognize late echoes
    recent_writes: VecDeque<String>,

    events: Vec<SessionEvent>,
}

impl SyncSession {
    pub fn new(id: SessionId, config: SyncConfig) -> Self {
        Self {
            id,
            config,
            state: SessionState::Idle,
            document: None,
            subscribers: BTreeSet::new(),
            queue: VecDeque::new(),
            history: VecDeque::new(),
            pending: None,
            rejections: HashMap::new(),
            recent_writes: VecDeque::new(),
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn revision(&self) -> Option<u64> {
        self.document.as_ref().map(Document::revision)
    }

    pub fn pending(&self) -> Option<&PendingAck> {
        self.pending.as_ref()
    }

    /// Number of patches waiting behind an acknowledgement
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn subscribers(&self) -> impl Iterator<Item = &PeerId> {
        self.subscribers.iter()
    }

    /// Drain the side effects produced so far
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- lifecycle ----

    /// Segment `text` and make it the canonical document
    pub fn open(&mut self, text: &str, profile: &LanguageProfile) -> SessionResult<()> {
        self.begin_open()?;
        let result = Document::open(text, profile);
        self.finish_open(result)
    }

    /// `Idle → Loading`; the caller builds the document and hands it to
    /// [`SyncSession::finish_open`]
    pub fn begin_open(&mut self) -> SessionResult<()> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Loading;
                Ok(())
            }
            SessionState::Closed => Err(SessionError::Closed),
            other => Err(SessionError::InvalidState(other)),
        }
    }

    pub fn finish_open(&mut self, result: SegmentResult<Document>) -> SessionResult<()> {
        match self.state {
            SessionState::Loading => {}
            SessionState::Closed => return Err(SessionError::Closed),
            other => return Err(SessionError::InvalidState(other)),
        }

        match result {
            Ok(document) => {
                info!(
                    session = %self.id,
                    language = %document.profile().id,
                    blocks = document.len(),
                    "Document opened"
                );
                self.document = Some(document);
                self.state = SessionState::Synced;

                let peers: Vec<PeerId> = self.subscribers.iter().cloned().collect();
                for peer in peers {
                    self.send_full_document(&peer);
                }
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to open document");
                self.state = SessionState::Idle;
                Err(e.into())
            }
        }
    }

    /// Tear down. Discards the document; nothing leaves this state.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        info!(session = %self.id, revision = ?self.revision(), "Session closed");

        self.state = SessionState::Closed;
        self.document = None;
        self.queue.clear();
        self.history.clear();
        self.pending = None;
        self.rejections.clear();
        self.recent_writes.clear();
    }

    // ---- peers ----

    /// Add a peer; it is sent the full document if one is open
    pub fn subscribe(&mut self, peer: PeerId) {
        if self.subscribers.insert(peer.clone()) {
            debug!(session = %self.id, peer = %peer, "Peer subscribed");
            self.send_full_document(&peer);
        }
    }

    pub fn unsubscribe(&mut self, peer: &PeerId) {
        if self.subscribers.remove(peer) {
            debug!(session = %self.id, peer = %peer, "Peer unsubscribed");
        }
        self.rejections.remove(peer);
    }

    /// Send the current document to `peer`
    pub fn resync(&mut self, peer: &PeerId) -> SessionResult<()> {
        self.ensure_open()?;
        self.send_full_document(peer);
        Ok(())
    }

    /// Dispatch an incoming wire message
    pub fn handle_message(&mut self, from: PeerId, message: PeerMessage) -> SessionResult<()> {
        if message.session_id != self.id {
            warn!(
                session = %self.id,
                target = %message.session_id,
                "Ignoring message for another session"
            );
            return Ok(());
        }

        match message.body {
            MessageBody::Patch(patch) => self.submit(from, patch),
            MessageBody::Ack { revision } => self.ack(&from, revision),
            MessageBody::FullDocument(_) => self.resync(&from),
            MessageBody::Superseded { .. } => {
                debug!(session = %self.id, peer = %from, "Ignoring superseded notice from peer");
                Ok(())
            }
        }
    }

    // ---- edits ----

    /// Queue a patch from a peer and process whatever can be processed
    #[instrument(skip(self, patch), fields(session = %self.id, base = patch.base_revision, ops = patch.len()))]
    pub fn submit(&mut self, origin: PeerId, patch: Patch) -> SessionResult<()> {
        self.enqueue(origin, patch, false)
    }

    fn enqueue(&mut self, origin: PeerId, patch: Patch, resync: bool) -> SessionResult<()> {
        self.ensure_open()?;

        if let (Some(pending), Some(revision)) = (&self.pending, self.revision()) {
            if patch.base_revision < revision {
                debug!(pending = pending.revision, "Stale patch during pending acknowledgement");
                self.state = SessionState::Conflict;
            }
        }

        self.queue.push_back(Submission { origin, patch, resync });
        self.drain();
        Ok(())
    }

    /// Apply an edit made through this API and write it through to the file.
    ///
    /// Applied immediately; the session then waits for the file mirror's
    /// acknowledgement before processing other patches.
    #[instrument(skip(self, patch), fields(session = %self.id, ops = patch.len()))]
    pub fn local_edit(&mut self, patch: Patch) -> SessionResult<u64> {
        self.ensure_open()?;
        if self.state != SessionState::Synced {
            return Err(SessionError::InvalidState(self.state));
        }

        let next = {
            let current = self.document.as_ref().ok_or(SessionError::NotOpen)?;
            reconciler::apply(current, &patch)?
        };
        let revision = next.revision();
        self.commit(PeerId::local(), patch, next);

        self.pending = Some(PendingAck {
            revision,
            origin: PeerId::local(),
            awaiting: PeerId::file_system(),
            sent_at: Instant::now(),
        });
        self.state = SessionState::PendingAck;
        Ok(revision)
    }

    /// Confirmation from `peer` that it holds `revision`
    pub fn ack(&mut self, peer: &PeerId, revision: u64) -> SessionResult<()> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }

        match &self.pending {
            Some(pending) if &pending.awaiting == peer && revision >= pending.revision => {
                debug!(session = %self.id, revision, "Acknowledged");
                self.pending = None;
                self.drain();
            }
            _ => {
                debug!(session = %self.id, peer = %peer, revision, "Acknowledgement not awaited");
            }
        }
        Ok(())
    }

    /// Force-resolve an acknowledgement that has been outstanding too long.
    /// Returns whether anything timed out.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = match &self.pending {
            Some(pending) => now.saturating_duration_since(pending.sent_at) >= self.config.ack_timeout(),
            None => false,
        };
        if !expired {
            return false;
        }

        if let Some(pending) = self.pending.take() {
            warn!(
                session = %self.id,
                revision = pending.revision,
                awaiting = %pending.awaiting,
                "Acknowledgement timed out"
            );
            let revision = self.revision().unwrap_or(pending.revision);
            self.notify_superseded(&pending.origin, revision, SupersedeReason::PeerTimeout);
        }
        self.drain();
        true
    }

    /// The backing file now holds `text`
    #[instrument(skip(self, text), fields(session = %self.id, bytes = text.len()))]
    pub fn file_changed(&mut self, text: &str) -> SessionResult<()> {
        self.ensure_open()?;

        let patch = {
            let current = self.document.as_ref().ok_or(SessionError::NotOpen)?;
            if self.recent_writes.iter().any(|w| w == text) && current.flatten() != text {
                debug!("Ignoring late echo of an earlier write");
                return Ok(());
            }

            let candidate = Document::open_with_ids(text, current.profile_arc(), IDGenerator::from_seed("fs"))
                .inspect_err(|e| warn!(error = %e, "Ignoring file contents that failed to segment"))?;
            reconciler::diff(current, &candidate)
        };

        if patch.is_empty() {
            debug!("File matches document");
            return Ok(());
        }
        self.submit(PeerId::file_system(), patch)
    }

    /// A view edited its copy of revision `base_revision` into `rendered`
    #[instrument(skip(self, rendered), fields(session = %self.id, blocks = rendered.len()))]
    pub fn apply_view_edit(
        &mut self,
        origin: PeerId,
        base_revision: u64,
        rendered: &[RenderedBlock],
    ) -> SessionResult<()> {
        self.ensure_open()?;

        let Some(base) = self.document_at(base_revision) else {
            self.reject(&origin, SupersedeReason::RevisionMismatch);
            return Ok(());
        };
        let candidate = base
            .candidate_from_rendered(rendered)
            .inspect_err(|e| warn!(peer = %origin, error = %e, "View edit does not segment"))?;

        // The view cannot see block ids, so a reshaped edit is followed by
        // the whole document
        let reshaped = candidate.len() != rendered.len()
            || candidate.blocks().iter().zip(rendered).any(|(b, r)| b.kind != r.kind);
        let patch = reconciler::diff(base, &candidate);

        if patch.is_empty() {
            if reshaped {
                self.send_full_document(&origin);
            }
            return Ok(());
        }
        self.enqueue(origin, patch, reshaped)
    }

    // ---- internals ----

    fn ensure_open(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Closed => Err(SessionError::Closed),
            SessionState::Idle | SessionState::Loading => Err(SessionError::NotOpen),
            _ => Ok(()),
        }
    }

    /// The document as it was at `revision`, if still known
    fn document_at(&self, revision: u64) -> Option<&Document> {
        let current = self.document.as_ref()?;
        if current.revision() == revision {
            return Some(current);
        }
        self.history
            .iter()
            .map(|applied| &applied.before)
            .find(|before| before.revision() == revision)
    }

    fn drain(&mut self) {
        if self.pending.is_some() {
            return;
        }
        while let Some(submission) = self.queue.pop_front() {
            self.process(submission);
        }
        if self.document.is_some() {
            self.state = SessionState::Synced;
        }
    }

    fn process(&mut self, submission: Submission) {
        let Submission { origin, patch, resync } = submission;
        let Some(current) = self.document.as_ref() else {
            return;
        };

        match self.reconcile(current, &origin, patch) {
            Ok((patch, next, losers)) => {
                let revision = next.revision();
                self.commit(origin.clone(), patch, next);
                for loser in losers {
                    self.notify_superseded(&loser, revision, SupersedeReason::Conflict);
                }
                if resync {
                    self.send_full_document(&origin);
                }
            }
            Err(e) => {
                debug!(session = %self.id, peer = %origin, error = %e, "Patch rejected");
                self.reject(&origin, SupersedeReason::from(&e));
            }
        }
    }

    /// Rebase `patch` up to the current revision and apply it.
    /// Returns the applied patch, the result, and the peers whose edits lost.
    fn reconcile(
        &self,
        current: &Document,
        origin: &PeerId,
        mut patch: Patch,
    ) -> ReconcileResult<(Patch, Document, Vec<PeerId>)> {
        let mut losers = Vec::new();

        if patch.base_revision < current.revision() {
            let start = self
                .history
                .iter()
                .position(|applied| applied.before.revision() == patch.base_revision)
                .ok_or(ReconcileError::RevisionMismatch {
                    current: current.revision(),
                    base: patch.base_revision,
                })?;

            for (i, applied) in self.history.iter().enumerate().skip(start) {
                let after = self.history.get(i + 1).map(|next| &next.before).unwrap_or(current);
                let policy = self.config.conflict_policy;
                let rebased = reconciler::rebase(&patch, &applied.patch, &applied.before, after, policy)?;

                if rebased.has_conflicts() {
                    let loser = match policy {
                        ConflictPolicy::LaterWins => &applied.origin,
                        ConflictPolicy::EarlierWins => origin,
                    };
                    let own_edit = policy == ConflictPolicy::LaterWins && loser == origin;
                    if !own_edit && !losers.contains(loser) {
                        losers.push(loser.clone());
                    }
                    debug!(
                        conflicts = ?rebased.conflicts,
                        superseded = %loser,
                        "Concurrent edits to the same block"
                    );
                }
                patch = rebased.patch;
            }
        }

        let next = reconciler::apply(current, &patch)?;
        Ok((patch, next, losers))
    }

    fn commit(&mut self, origin: PeerId, patch: Patch, next: Document) {
        let revision = next.revision();
        let text = next.flatten();

        if let Some(before) = self.document.replace(next) {
            self.history.push_back(Applied {
                origin: origin.clone(),
                before,
                patch: patch.clone(),
            });
            while self.history.len() > self.config.history_depth {
                self.history.pop_front();
            }
        }
        self.rejections.remove(&origin);

        info!(session = %self.id, peer = %origin, revision, ops = patch.len(), "Patch applied");

        self.send(&origin, PeerMessage::ack(self.id.clone(), revision));
        let others: Vec<PeerId> = self.subscribers.iter().filter(|p| **p != origin).cloned().collect();
        for peer in others {
            self.send(&peer, PeerMessage::patch(self.id.clone(), patch.clone()));
        }

        if !origin.is_file_system() {
            self.recent_writes.push_back(text.clone());
            while self.recent_writes.len() > self.config.history_depth.max(1) {
                self.recent_writes.pop_front();
            }
            self.events.push(SessionEvent::WriteFile { revision, text });
        }
    }

    /// Tell `origin` its patch was not applied; after too many in a row,
    /// send it the whole document instead
    fn reject(&mut self, origin: &PeerId, reason: SupersedeReason) {
        let count = self.rejections.entry(origin.clone()).or_insert(0);
        *count += 1;

        if *count > self.config.max_retries {
            warn!(
                session = %self.id,
                peer = %origin,
                rejections = *count,
                "Too many rejected patches, resyncing peer"
            );
            self.rejections.remove(origin);
            self.send_full_document(origin);
        } else {
            let revision = self.revision().unwrap_or_default();
            self.notify_superseded(origin, revision, reason);
        }
    }

    fn notify_superseded(&mut self, peer: &PeerId, revision: u64, reason: SupersedeReason) {
        debug!(session = %self.id, peer = %peer, ?reason, "Superseded");
        self.send(peer, PeerMessage::superseded(self.id.clone(), revision, reason));
    }

    fn send_full_document(&mut self, peer: &PeerId) {
        if let Some(document) = &self.document {
            let message = PeerMessage::full_document(self.id.clone(), document);
            self.send(peer, message);
        }
    }

    /// Only subscribed peers have somewhere to receive messages
    fn send(&mut self, to: &PeerId, message: PeerMessage) {
        if self.subscribers.contains(to) {
            self.events.push(SessionEvent::Send {
                to: to.clone(),
                message,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockKind;
    use crate::patch::PatchOp;
    use codeweave_lexer::{BlockId, ProfileRegistry};
    use std::time::Duration;

    fn session() -> SyncSession {
        let registry = ProfileRegistry::builtin();
        let mut session = SyncSession::new(SessionId::new("s1"), SyncConfig::default());
        session.open("# doc\ncode()\n", registry.get("python").unwrap()).unwrap();
        session
    }

    fn replace(base: u64, id: &str, content: &str) -> Patch {
        Patch::new(
            base,
            vec![PatchOp::ReplaceBlockContent {
                id: BlockId::new(id),
                content: content.to_string(),
            }],
        )
    }

    #[test]
    fn test_open_moves_idle_to_synced() {
        let session = session();
        assert_eq!(session.state(), SessionState::Synced);
        assert_eq!(session.revision(), Some(0));
    }

    #[test]
    fn test_failed_open_returns_to_idle() {
        let registry = ProfileRegistry::builtin();
        let mut session = SyncSession::new(SessionId::new("s1"), SyncConfig::default());

        let err = session
            .open("/* never closed\n", registry.get("c_cpp").unwrap())
            .unwrap_err();
        assert!(matches!(err, SessionError::Segment(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.document().is_none());
    }

    #[test]
    fn test_edits_before_open_are_refused() {
        let mut session = SyncSession::new(SessionId::new("s1"), SyncConfig::default());
        assert!(matches!(
            session.submit(PeerId::new("view"), Patch::noop(0)),
            Err(SessionError::NotOpen)
        ));
    }

    #[test]
    fn test_local_edit_waits_for_ack() {
        let mut session = session();
        let revision = session.local_edit(replace(0, "b2", "other()\n")).unwrap();

        assert_eq!(revision, 1);
        assert_eq!(session.state(), SessionState::PendingAck);
        assert_eq!(
            session.take_events(),
            vec![SessionEvent::WriteFile {
                revision: 1,
                text: "# doc\nother()\n".to_string()
            }]
        );

        // Only the file mirror's ack counts
        session.ack(&PeerId::new("view"), 1).unwrap();
        assert_eq!(session.state(), SessionState::PendingAck);

        session.ack(&PeerId::file_system(), 1).unwrap();
        assert_eq!(session.state(), SessionState::Synced);
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_local_edit_requires_synced() {
        let mut session = session();
        session.local_edit(replace(0, "b2", "a()\n")).unwrap();
        assert!(matches!(
            session.local_edit(replace(1, "b2", "b()\n")),
            Err(SessionError::InvalidState(SessionState::PendingAck))
        ));
    }

    #[test]
    fn test_patches_queue_behind_pending_ack() {
        let mut session = session();
        let view = PeerId::new("view");
        session.subscribe(view.clone());
        session.local_edit(replace(0, "b2", "a()\n")).unwrap();

        session.submit(view.clone(), replace(0, "b1", "# title\n")).unwrap();
        assert_eq!(session.state(), SessionState::Conflict);
        assert_eq!(session.queued(), 1);
        assert_eq!(session.revision(), Some(1));

        session.ack(&PeerId::file_system(), 1).unwrap();
        assert_eq!(session.state(), SessionState::Synced);
        assert_eq!(session.revision(), Some(2));
        assert_eq!(session.document().unwrap().flatten(), "# title\na()\n");
    }

    #[test]
    fn test_ack_timeout_forces_resolution() {
        let mut session = session();
        session.local_edit(replace(0, "b2", "a()\n")).unwrap();

        assert!(!session.tick(Instant::now()));
        let later = Instant::now() + session.config().ack_timeout() + Duration::from_millis(1);
        assert!(session.tick(later));
        assert_eq!(session.state(), SessionState::Synced);
    }

    #[test]
    fn test_file_echo_is_ignored() {
        let mut session = session();
        session.local_edit(replace(0, "b2", "a()\n")).unwrap();
        session.take_events();

        session.file_changed("# doc\na()\n").unwrap();
        assert_eq!(session.revision(), Some(1));
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_view_edit_that_adds_a_comment_echoes_cleanly() {
        let registry = ProfileRegistry::builtin();
        let mut session = SyncSession::new(SessionId::new("s1"), SyncConfig::default());
        session.open("x = 1\n", registry.get("python").unwrap()).unwrap();
        let view = PeerId::new("view");
        session.subscribe(view.clone());
        session.take_events();

        let mut rendered = session.document().unwrap().rendered();
        rendered[0].content = "x = 1\n# note\n".to_string();
        session.apply_view_edit(view.clone(), 0, &rendered).unwrap();

        let kinds: Vec<BlockKind> = session.document().unwrap().blocks().iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BlockKind::Code, BlockKind::Doc]);

        let events = session.take_events();
        let written = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::WriteFile { text, .. } => Some(text.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(written, "x = 1\n# note\n");
        // Two blocks where the view sent one: it gets the real layout
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Send { to, message } if to == &view && message.kind() == "fullDocument"
        )));

        // Our own write coming back through the watcher changes nothing
        session.file_changed(&written).unwrap();
        assert_eq!(session.revision(), Some(1));
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_late_echo_does_not_revert() {
        let mut session = session();
        let view = PeerId::new("view");
        session.subscribe(view.clone());
        session.submit(view.clone(), replace(0, "b2", "a()\n")).unwrap();
        session.submit(view.clone(), replace(1, "b2", "b()\n")).unwrap();

        // Watcher reports the first write after the second was applied
        session.file_changed("# doc\na()\n").unwrap();
        assert_eq!(session.document().unwrap().flatten(), "# doc\nb()\n");
    }

    #[test]
    fn test_external_file_change_is_broadcast() {
        let mut session = session();
        let view = PeerId::new("view");
        session.subscribe(view.clone());
        session.take_events();

        session.file_changed("# doc\ncode(1)\n").unwrap();
        assert_eq!(session.revision(), Some(1));

        let events = session.take_events();
        assert_eq!(events.len(), 1, "no write-back for changes that came from the file");
        match &events[0] {
            SessionEvent::Send { to, message } => {
                assert_eq!(to, &view);
                assert_eq!(message.kind(), "patch");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_file_change_keeps_document() {
        let registry = ProfileRegistry::builtin();
        let mut session = SyncSession::new(SessionId::new("s1"), SyncConfig::default());
        session.open("int x;\n", registry.get("c_cpp").unwrap()).unwrap();

        assert!(session.file_changed("/* open\n").is_err());
        assert_eq!(session.document().unwrap().flatten(), "int x;\n");
    }

    #[test]
    fn test_repeated_rejections_escalate_to_full_document() {
        let mut session = session();
        let view = PeerId::new("view");
        session.subscribe(view.clone());
        session.take_events();

        let max = session.config().max_retries;
        for _ in 0..max {
            session.submit(view.clone(), replace(0, "b9", "x\n")).unwrap();
        }
        let kinds: Vec<&str> = session
            .take_events()
            .iter()
            .map(|e| match e {
                SessionEvent::Send { message, .. } => message.kind(),
                SessionEvent::WriteFile { .. } => "write",
            })
            .collect();
        assert_eq!(kinds, vec!["superseded"; max as usize]);

        session.submit(view.clone(), replace(0, "b9", "x\n")).unwrap();
        match session.take_events().as_slice() {
            [SessionEvent::Send { message, .. }] => assert_eq!(message.kind(), "fullDocument"),
            other => panic!("expected a full document, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut session = session();
        session.close();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.document().is_none());
        assert!(matches!(session.submit(PeerId::new("v"), Patch::noop(0)), Err(SessionError::Closed)));
        assert!(matches!(session.begin_open(), Err(SessionError::Closed)));
    }
}
