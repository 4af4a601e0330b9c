//! Concurrent editing through a session.

use codeweave_editor::{
    BlockId, ConflictPolicy, MessageBody, Patch, PatchOp, PeerId, PeerMessage, SessionEvent,
    SessionId, SessionState, SupersedeReason, SyncConfig, SyncSession,
};
use codeweave_lexer::{LanguageProfile, StringDelim};

fn slashes() -> LanguageProfile {
    LanguageProfile::new("slashes")
        .with_line_comments(&["//"])
        .with_string(StringDelim::escaped("\""))
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

/// Session at revision 1 with two subscribed views
fn session_at_revision_one(policy: ConflictPolicy) -> (SyncSession, PeerId, PeerId) {
    let config = SyncConfig {
        conflict_policy: policy,
        ..SyncConfig::default()
    };
    let mut session = SyncSession::new(SessionId::new("main.c"), config);
    session.open("// doc\ncode();\n", &slashes()).unwrap();

    let alice = PeerId::new("alice");
    let bob = PeerId::new("bob");
    session.subscribe(alice.clone());
    session.subscribe(bob.clone());

    session.submit(alice.clone(), replace(0, "b2", "code(1);\n")).unwrap();
    assert_eq!(session.revision(), Some(1));
    session.take_events();

    (session, alice, bob)
}

fn superseded_peers(events: &[SessionEvent]) -> Vec<(PeerId, SupersedeReason)> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Send {
                to,
                message:
                    PeerMessage {
                        body: MessageBody::Superseded { reason, .. },
                        ..
                    },
            } => Some((to.clone(), *reason)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_disjoint_concurrent_edits_both_apply() {
    let (mut session, alice, bob) = session_at_revision_one(ConflictPolicy::LaterWins);

    session.submit(alice, replace(1, "b1", "// docs\n")).unwrap();
    session.submit(bob, replace(1, "b2", "code(2);\n")).unwrap();

    assert_eq!(session.revision(), Some(3));
    assert_eq!(session.document().unwrap().flatten(), "// docs\ncode(2);\n");
    assert!(superseded_peers(&session.take_events()).is_empty());
}

#[test]
fn test_same_block_later_patch_wins() {
    let (mut session, alice, bob) = session_at_revision_one(ConflictPolicy::LaterWins);

    session.submit(alice.clone(), replace(1, "b2", "alice();\n")).unwrap();
    session.submit(bob, replace(1, "b2", "bob();\n")).unwrap();

    assert_eq!(session.document().unwrap().flatten(), "// doc\nbob();\n");
    assert_eq!(
        superseded_peers(&session.take_events()),
        vec![(alice, SupersedeReason::Conflict)]
    );
}

#[test]
fn test_same_block_earlier_patch_wins_when_configured() {
    let (mut session, alice, bob) = session_at_revision_one(ConflictPolicy::EarlierWins);

    session.submit(alice, replace(1, "b2", "alice();\n")).unwrap();
    session.submit(bob.clone(), replace(1, "b2", "bob();\n")).unwrap();

    assert_eq!(session.document().unwrap().flatten(), "// doc\nalice();\n");
    assert_eq!(
        superseded_peers(&session.take_events()),
        vec![(bob, SupersedeReason::Conflict)]
    );
}

#[test]
fn test_conflict_resolution_is_deterministic() {
    let run = || {
        let (mut session, alice, bob) = session_at_revision_one(ConflictPolicy::LaterWins);
        session.submit(alice, replace(1, "b2", "alice();\n")).unwrap();
        session.submit(bob, replace(1, "b2", "bob();\n")).unwrap();
        let events = session.take_events();
        (session.document().unwrap().flatten(), superseded_peers(&events))
    };

    let first = run();
    for _ in 0..5 {
        assert_eq!(run(), first);
    }
}

#[test]
fn test_applied_patch_is_acked_and_broadcast() {
    let (mut session, alice, bob) = session_at_revision_one(ConflictPolicy::LaterWins);

    session.submit(alice.clone(), replace(1, "b1", "// new\n")).unwrap();
    let events = session.take_events();

    assert!(events.contains(&SessionEvent::Send {
        to: alice,
        message: PeerMessage::ack(SessionId::new("main.c"), 2),
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Send { to, message: PeerMessage { body: MessageBody::Patch(p), .. } }
            if to == &bob && p.base_revision == 1
    )));
    assert!(events.contains(&SessionEvent::WriteFile {
        revision: 2,
        text: "// new\ncode(1);\n".to_string(),
    }));
}

#[test]
fn test_patch_from_the_future_is_superseded() {
    let (mut session, alice, _bob) = session_at_revision_one(ConflictPolicy::LaterWins);

    session.submit(alice.clone(), replace(9, "b1", "// x\n")).unwrap();
    assert_eq!(session.revision(), Some(1));
    assert_eq!(
        superseded_peers(&session.take_events()),
        vec![(alice, SupersedeReason::RevisionMismatch)]
    );
}

#[test]
fn test_view_edit_against_older_revision_is_rebased() {
    let (mut session, alice, bob) = session_at_revision_one(ConflictPolicy::LaterWins);
    let stale = session.document().unwrap().rendered();

    session.submit(alice, replace(1, "b2", "code(2);\n")).unwrap();

    // Bob edits the doc text of revision 1
    let mut edited = stale;
    edited[0].content = "Documentation\n".to_string();
    session.apply_view_edit(bob, 1, &edited).unwrap();

    assert_eq!(session.revision(), Some(3));
    assert_eq!(
        session.document().unwrap().flatten(),
        "// Documentation\ncode(2);\n"
    );
}

#[test]
fn test_wire_messages_drive_the_session() {
    let (mut session, alice, _bob) = session_at_revision_one(ConflictPolicy::LaterWins);

    let json = r#"{"sessionId":"main.c","type":"patch","payload":{"baseRevision":1,"ops":[{"op":"deleteBlock","id":"b1"}]}}"#;
    let message: PeerMessage = serde_json::from_str(json).unwrap();
    session.handle_message(alice.clone(), message).unwrap();
    assert_eq!(session.document().unwrap().flatten(), "code(1);\n");

    session.take_events();
    session
        .handle_message(alice.clone(), PeerMessage::resync_request(SessionId::new("main.c")))
        .unwrap();
    match session.take_events().as_slice() {
        [SessionEvent::Send { to, message }] => {
            assert_eq!(to, &alice);
            assert_eq!(message.kind(), "fullDocument");
        }
        other => panic!("unexpected events {:?}", other),
    }
}

#[test]
fn test_close_discards_everything() {
    let (mut session, alice, _bob) = session_at_revision_one(ConflictPolicy::LaterWins);
    session.close();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.submit(alice, replace(1, "b1", "// x\n")).is_err());
    assert!(session.document().is_none());
}
