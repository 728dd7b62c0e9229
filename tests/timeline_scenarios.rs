//! End-to-end gesture scenarios against a recording host and sink.

use chrono::NaiveDate;
use gantt_timeline::host::{Intent, RecordingHost};
use gantt_timeline::layout::{
    route, Layout, Point, RouteKind, RouteStyle, RouteTemplate, Scene,
};
use gantt_timeline::model::{
    Anchor, Relation, RelationOp, RelationType, TimelineViewport, ToggleDirection,
};
use gantt_timeline::{
    Ack, CollapseKey, GestureOutcome, IntentTicket, Node, NodeKind, RenderSink, SceneUpdate,
    TimelineConfig, TimelineSession, ToggleOutcome,
};

#[derive(Debug, Default)]
struct RecordingSink {
    replaced: usize,
    updates: Vec<SceneUpdate>,
}

impl RenderSink for RecordingSink {
    fn replace_scene(&mut self, _layout: &Layout, _scene: &Scene) {
        self.replaced += 1;
    }

    fn apply(&mut self, update: SceneUpdate) {
        self.updates.push(update);
    }
}

type Session = TimelineSession<RecordingHost, RecordingSink>;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn key(s: &str) -> CollapseKey {
    CollapseKey::from(s)
}

/// Web: Design (3-5) precedes Build (10-14), Test (6-8). Ops: Deploy (16-20).
fn schedule() -> Vec<Node> {
    let precedes = Relation {
        id: 1,
        from: 10,
        to: 11,
        kind: RelationType::Precedes,
        delay: None,
    };
    vec![
        Node::new(NodeKind::Project, 1, "Web").with_children(vec![
            Node::issue(10, "Design", date(3), date(5)).with_relation(precedes.clone()),
            Node::issue(11, "Build", date(10), date(14)).with_relation(precedes),
            Node::issue(12, "Test", date(6), date(8)),
        ]),
        Node::new(NodeKind::Project, 2, "Ops")
            .with_children(vec![Node::issue(20, "Deploy", date(16), date(20))]),
    ]
}

fn session() -> Session {
    let viewport = TimelineViewport::new(date(1), date(31), 10.0);
    let mut session = TimelineSession::new(
        RecordingHost::new(),
        RecordingSink::default(),
        TimelineConfig::default(),
        viewport,
        date(1),
    );
    session.refresh(schedule());
    session
}

fn body(session: &Session, k: &str) -> Point {
    let g = session.scene().bars[&key(k)].geometry;
    Point::new(g.start_x + 20.0, g.center_y)
}

/// Drag a bar body horizontally and release.
fn drag_body(session: &mut Session, k: &str, dx: f32) -> GestureOutcome {
    let at = body(session, k);
    assert_eq!(session.pointer_down(at), GestureOutcome::Started);
    let to = Point::new(at.x + dx, at.y);
    session.pointer_move(to);
    session.pointer_up(to)
}

fn dates_of(session: &Session, k: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let bar = &session.scene().bars[&key(k)];
    (bar.start, bar.due)
}

#[test]
fn collapse_then_expand_restores_every_position() {
    let mut session = session();
    let rows_before = session.layout().rows.clone();
    let bands_before = session.layout().bands.clone();
    let bars_before = session.scene().bars.clone();
    let arrows_before = session.scene().arrows.clone();
    let replaced = session.sink().replaced;

    let outcome = session.toggle(&key("project-1"), ToggleDirection::Collapse);
    assert_eq!(outcome, ToggleOutcome::Applied { expanded: false, delta: 90.0 });
    let deploy = session.layout().row(&key("issue-20")).unwrap();
    assert_eq!(deploy.current_y, 60.0);
    assert!(!session.layout().row(&key("issue-11")).unwrap().is_visible);
    assert!(!session.scene().arrows[0].visible);
    assert!(session
        .sink()
        .updates
        .iter()
        .any(|u| u.key() == Some(&key("issue-20"))));

    let outcome = session.toggle(&key("project-1"), ToggleDirection::Expand);
    assert_eq!(outcome, ToggleOutcome::Applied { expanded: true, delta: 90.0 });
    assert_eq!(session.layout().rows, rows_before);
    assert_eq!(session.layout().bands, bands_before);
    assert_eq!(session.scene().bars, bars_before);
    assert_eq!(session.scene().arrows, arrows_before);
    // Both toggles were applied in place.
    assert_eq!(session.sink().replaced, replaced);
}

#[test]
fn right_edge_drag_extends_due_date_and_reroutes_arrow() {
    let mut session = session();
    let g = session.scene().bars[&key("issue-10")].geometry;
    assert_eq!(g.end_x, 50.0);
    let grab = Point::new(g.end_x, g.center_y);
    assert_eq!(session.pointer_down(grab), GestureOutcome::Started);
    assert_eq!(session.gesture().name(), "resizing");

    let to = Point::new(grab.x + 30.0, grab.y);
    session.pointer_move(to);
    assert!(session.frame());
    let arrow = &session.scene().arrows[0];
    assert_eq!(arrow.path.start(), Point::new(80.0, g.center_y));
    assert!(session
        .sink()
        .updates
        .iter()
        .any(|u| matches!(u, SceneUpdate::Arrow { index: 0, .. })));

    assert_eq!(session.pointer_up(to), GestureOutcome::AwaitingConfirmation);
    assert!(matches!(session.confirm_dates(), GestureOutcome::Committed(_)));
    let sent: Vec<&Intent> = session.host().schedule_intents().collect();
    match sent.as_slice() {
        [Intent::DateChange(_, change)] => {
            assert_eq!(change.node_id, 10);
            assert_eq!(change.old_due, Some(date(5)));
            assert_eq!(change.new_start, Some(date(3)));
            assert_eq!(change.new_due, Some(date(8)));
        }
        other => panic!("unexpected intents {:?}", other),
    }
}

#[test]
fn finish_to_start_arrow_switches_to_s_curve_when_bars_overlap() {
    let mut session = session();
    assert_eq!(
        session.scene().arrows[0].path.template,
        RouteTemplate::Switchback
    );

    // Build moves five days left, to start before Design ends.
    assert_eq!(
        drag_body(&mut session, "issue-11", -50.0),
        GestureOutcome::AwaitingConfirmation
    );
    assert_eq!(dates_of(&session, "issue-11"), (Some(date(5)), Some(date(9))));
    assert_eq!(session.scene().arrows[0].path.template, RouteTemplate::SCurve);

    let config = TimelineConfig::default();
    let style = RouteStyle::from_config(&config.arrows, &config.bars, &config.layout);
    let same_row = route(
        Point::new(50.0, 45.0),
        Point::new(90.0, 45.0),
        RouteKind::Scheduling {
            from: Anchor::End,
            to: Anchor::Start,
        },
        &style,
    );
    assert_eq!(same_row.template, RouteTemplate::Straight);
    assert_eq!(same_row.points, vec![Point::new(50.0, 45.0), Point::new(90.0, 45.0)]);
}

#[test]
fn bulk_move_undoes_and_redoes_as_one_step() {
    let mut session = session();
    assert!(session.select(&key("issue-10"), false));
    assert!(session.select(&key("issue-12"), true));

    let at = body(&session, "issue-10");
    assert_eq!(session.pointer_down(at), GestureOutcome::Started);
    assert_eq!(session.gesture().name(), "bulk-moving");
    let to = Point::new(at.x + 20.0, at.y);
    session.pointer_move(to);
    assert_eq!(session.pointer_up(to), GestureOutcome::AwaitingConfirmation);
    assert!(matches!(session.confirm_dates(), GestureOutcome::Committed(_)));
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(5)), Some(date(7))));
    assert_eq!(dates_of(&session, "issue-12"), (Some(date(8)), Some(date(10))));
    assert_eq!(session.history().undo_len(), 1);

    assert!(session.undo().is_some());
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(3)), Some(date(5))));
    assert_eq!(dates_of(&session, "issue-12"), (Some(date(6)), Some(date(8))));
    assert!(session.redo().is_some());
    assert_eq!(dates_of(&session, "issue-12"), (Some(date(8)), Some(date(10))));

    let sent: Vec<&Intent> = session.host().schedule_intents().collect();
    assert_eq!(sent.len(), 3);
    for intent in sent {
        match intent {
            Intent::BulkDateChange(_, changes) => assert_eq!(changes.len(), 2),
            other => panic!("expected a bulk change, got {:?}", other),
        }
    }
}

#[test]
fn cancel_restores_geometry_and_scroll_exactly() {
    let mut session = session();
    session.set_scroll(15.0, 0.0);
    let bars_before = session.scene().bars.clone();
    let arrows_before = session.scene().arrows.clone();

    let content = body(&session, "issue-11");
    let at = Point::new(content.x - 15.0, content.y);
    assert_eq!(session.pointer_down(at), GestureOutcome::Started);
    session.set_scroll(55.0, 0.0);
    session.pointer_move(Point::new(at.x + 12.0, at.y));
    assert!(session.frame());
    assert_ne!(session.scene().bars[&key("issue-11")], bars_before[&key("issue-11")]);

    assert_eq!(session.cancel(), GestureOutcome::Cancelled);
    assert_eq!(session.scene().bars, bars_before);
    assert_eq!(session.scene().arrows, arrows_before);
    assert_eq!(session.scroll(), Point::new(15.0, 0.0));
    assert_eq!(
        session.sink().updates.last(),
        Some(&SceneUpdate::Scroll { x: 15.0, y: 0.0 })
    );
    assert_eq!(session.host().schedule_intents().count(), 0);
}

#[test]
fn conflicting_input_is_refused_during_a_gesture() {
    let mut session = session();
    assert_eq!(
        drag_body(&mut session, "issue-20", 10.0),
        GestureOutcome::AwaitingConfirmation
    );
    session.confirm_dates();

    let at = body(&session, "issue-12");
    assert_eq!(session.pointer_down(at), GestureOutcome::Started);
    assert_eq!(session.pointer_down(body(&session, "issue-10")), GestureOutcome::Refused);
    assert_eq!(
        session.toggle(&key("project-1"), ToggleDirection::Collapse),
        ToggleOutcome::NoOp
    );
    assert!(!session.zoom_in());
    assert!(session.undo().is_none());
    assert_eq!(session.collapse_all(), 0);
    assert_eq!(session.delete_relation(1), GestureOutcome::Refused);
    assert_eq!(session.viewport().pixels_per_day, 10.0);

    assert_eq!(session.cancel(), GestureOutcome::Cancelled);
    assert!(session.undo().is_some());
}

#[test]
fn undoing_a_draft_drops_it_without_sending() {
    let mut session = session();
    session.set_draft_mode(true);
    assert!(matches!(
        drag_body(&mut session, "issue-10", 20.0),
        GestureOutcome::Queued(_)
    ));
    assert_eq!(session.drafts().len(), 1);
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(5)), Some(date(7))));

    assert!(session.undo().is_some());
    assert!(session.drafts().is_empty());
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(3)), Some(date(5))));
    assert_eq!(session.host().schedule_intents().count(), 0);
}

#[test]
fn submitted_drafts_travel_as_one_bulk_intent() {
    let mut session = session();
    session.set_draft_mode(true);
    drag_body(&mut session, "issue-10", 20.0);
    drag_body(&mut session, "issue-20", 10.0);
    assert_eq!(session.drafts().len(), 2);
    assert_eq!(session.host().schedule_intents().count(), 0);

    assert_eq!(session.submit_drafts(), 2);
    assert!(session.drafts().is_empty());
    let sent: Vec<&Intent> = session.host().schedule_intents().collect();
    let ticket = match sent.as_slice() {
        [Intent::BulkDateChange(ticket, changes)] => {
            let ids: Vec<u64> = changes.iter().map(|c| c.node_id).collect();
            assert_eq!(ids, vec![10, 20]);
            *ticket
        }
        other => panic!("unexpected intents {:?}", other),
    };
    assert_eq!(session.in_flight(), 1);
    assert!(session.intent_acknowledged(ticket, Default::default()));
    assert_eq!(session.in_flight(), 0);
    assert_eq!(session.history().undo_len(), 2);
}

#[test]
fn rejected_intent_reverts_and_reports() {
    let mut session = session();
    drag_body(&mut session, "issue-20", 20.0);
    let GestureOutcome::Committed(ticket) = session.confirm_dates() else {
        panic!("move not committed");
    };
    assert_eq!(dates_of(&session, "issue-20"), (Some(date(18)), Some(date(22))));

    assert!(session.intent_failed(IntentTicket(ticket), "issue is locked"));
    assert_eq!(dates_of(&session, "issue-20"), (Some(date(16)), Some(date(20))));
    assert!(!session.history().can_undo());
    assert_eq!(session.host().refresh_requests(), 1);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("issue is locked"));
    // A late answer for the same ticket is ignored.
    assert!(!session.intent_failed(IntentTicket(ticket), "again"));
}

#[test]
fn deleted_relation_comes_back_on_undo() {
    let mut session = session();
    let replaced = session.sink().replaced;
    assert!(matches!(session.delete_relation(1), GestureOutcome::Committed(_)));
    assert!(session.scene().arrows.is_empty());
    assert!(session.sink().replaced > replaced);

    assert!(session.undo().is_some());
    assert_eq!(session.scene().arrows.len(), 1);
    assert_eq!(session.scene().arrows[0].spec.relation_id, 1);
    assert_eq!(session.delete_relation(42), GestureOutcome::Ignored);
}

#[test]
fn discarded_drafts_revert_and_leave_no_history() {
    let mut session = session();
    session.set_draft_mode(true);
    drag_body(&mut session, "issue-10", 20.0);
    drag_body(&mut session, "issue-10", 10.0);
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(6)), Some(date(8))));

    assert_eq!(session.discard_drafts(), 2);
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(3)), Some(date(5))));
    assert!(!session.history().can_undo());
    assert!(session.drafts().is_empty());
    assert_eq!(session.host().schedule_intents().count(), 0);
}

#[test]
fn recreated_relation_takes_the_acknowledged_id() {
    let mut session = session();
    assert!(matches!(session.delete_relation(1), GestureOutcome::Committed(_)));
    let ticket = session.host().last_ticket().unwrap();
    assert!(session.intent_acknowledged(ticket, Ack::default()));

    assert!(session.undo().is_some());
    let ticket = session.host().last_ticket().unwrap();
    assert!(session.intent_acknowledged(ticket, Ack { relation_id: Some(5) }));
    assert_eq!(session.scene().arrows.len(), 1);
    assert_eq!(session.scene().arrows[0].spec.relation_id, 5);
    assert_eq!(session.delete_relation(1), GestureOutcome::Ignored);

    assert!(matches!(session.delete_relation(5), GestureOutcome::Committed(_)));
    match session.host().intents.last() {
        Some(Intent::RelationChange(_, change)) => {
            assert_eq!(change.op, RelationOp::Delete);
            assert_eq!(change.relation_id, Some(5));
        }
        other => panic!("unexpected intent {:?}", other),
    }
    assert!(session.scene().arrows.is_empty());
}

#[test]
fn redo_after_reacknowledged_create_deletes_the_new_id() {
    let mut session = session();
    session.delete_relation(1);
    let ticket = session.host().last_ticket().unwrap();
    session.intent_acknowledged(ticket, Ack::default());
    session.undo();
    let ticket = session.host().last_ticket().unwrap();
    session.intent_acknowledged(ticket, Ack { relation_id: Some(7) });

    assert!(session.redo().is_some());
    match session.host().intents.last() {
        Some(Intent::RelationChange(_, change)) => {
            assert_eq!(change.op, RelationOp::Delete);
            assert_eq!(change.relation_id, Some(7));
        }
        other => panic!("unexpected intent {:?}", other),
    }
    assert!(session.scene().arrows.is_empty());
}

#[test]
fn confirming_unchanged_dates_reverts_without_a_commit() {
    let mut session = session();
    assert_eq!(
        drag_body(&mut session, "issue-10", 20.0),
        GestureOutcome::AwaitingConfirmation
    );
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(5)), Some(date(7))));
    assert!(session.adjust_pending_dates(10, Some(date(3)), Some(date(5))));

    assert_eq!(session.confirm_dates(), GestureOutcome::Reverted);
    assert!(session.gesture().is_idle());
    assert_eq!(dates_of(&session, "issue-10"), (Some(date(3)), Some(date(5))));
    assert_eq!(session.host().schedule_intents().count(), 0);
    assert!(!session.history().can_undo());
    assert_eq!(session.in_flight(), 0);
}
