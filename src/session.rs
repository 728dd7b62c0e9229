//! The session context: everything one timeline view owns.
//!
//! A [`TimelineSession`] holds the node tree from the last refresh, the
//! collapse state, the positioned layout and scene, the selection, the active
//! gesture, the undo/redo log and the draft queue. Hosts feed it pointer and
//! keyboard input; it talks back only through [`ScheduleHost`] intents and
//! [`RenderSink`] updates.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::TimelineConfig;
use crate::host::{Ack, IntentTicket, ScheduleHost};
use crate::interaction::{
    hit_test, DragFinish, DragState, FrameThrottle, Gesture, GestureOutcome, PendingCommit,
    PointerTarget,
};
use crate::layout::{flatten, toggle, Layout, Point, Scene, ToggleOutcome};
use crate::model::{
    CollapseKey, CollapseState, CommandLog, DateChange, DraftQueue, HistoryItem, Node, NodeKind,
    Relation, RelationChange, RelationOp, RelationType, TimelineScale, TimelineViewport,
    ToggleDirection, UndoEntry,
};
use crate::render::{RenderSink, SceneUpdate};

/// An intent that has been sent and not answered yet.
#[derive(Debug, Clone)]
struct InFlight {
    /// History entries the intent carries. Submitting drafts batches several.
    history_ids: Vec<Uuid>,
    /// The entry as sent: forward for commits and redos, inverse for undos.
    sent: UndoEntry,
    /// Local id of a relation this intent creates. The acknowledged id
    /// replaces it.
    provisional_relation: Option<u64>,
}

pub struct TimelineSession<H: ScheduleHost, S: RenderSink> {
    host: H,
    sink: S,
    config: TimelineConfig,
    viewport: TimelineViewport,
    today: NaiveDate,
    nodes: Vec<Node>,
    collapse: CollapseState,
    layout: Layout,
    scene: Scene,
    /// Selected rows; the last one is the primary selection.
    selection: Vec<CollapseKey>,
    gesture: Gesture,
    throttle: FrameThrottle<(Point, Point)>,
    last_pointer: Point,
    scroll: Point,
    history: CommandLog,
    drafts: DraftQueue,
    in_flight: HashMap<IntentTicket, InFlight>,
    /// Local ids of relations created by queued drafts, by history id.
    draft_relations: HashMap<Uuid, u64>,
    next_provisional: u64,
    notices: Vec<String>,
}

impl<H: ScheduleHost, S: RenderSink> TimelineSession<H, S> {
    pub fn new(
        host: H,
        sink: S,
        config: TimelineConfig,
        viewport: TimelineViewport,
        today: NaiveDate,
    ) -> Self {
        let history = CommandLog::new(config.interaction.history_limit);
        let scene = Scene::empty(&config);
        Self {
            host,
            sink,
            config,
            viewport,
            today,
            nodes: Vec::new(),
            collapse: CollapseState::new(),
            layout: Layout::default(),
            scene,
            selection: Vec::new(),
            gesture: Gesture::Idle,
            throttle: FrameThrottle::new(),
            last_pointer: Point::default(),
            scroll: Point::default(),
            history,
            drafts: DraftQueue::default(),
            in_flight: HashMap::new(),
            draft_relations: HashMap::new(),
            next_provisional: u64::MAX,
            notices: Vec::new(),
        }
    }

    /// Start from a persisted collapse state.
    pub fn with_collapse_state(mut self, collapse: CollapseState) -> Self {
        self.collapse = collapse;
        self
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &TimelineViewport {
        &self.viewport
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapse
    }

    pub fn selection(&self) -> &[CollapseKey] {
        &self.selection
    }

    pub fn primary_selection(&self) -> Option<&CollapseKey> {
        self.selection.last()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn pending_commit(&self) -> Option<&PendingCommit> {
        match &self.gesture {
            Gesture::Confirming(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn history(&self) -> &CommandLog {
        &self.history
    }

    pub fn drafts(&self) -> &DraftQueue {
        &self.drafts
    }

    pub fn is_draft_mode(&self) -> bool {
        self.config.interaction.draft_mode
    }

    pub fn scroll(&self) -> Point {
        self.scroll
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// User-facing messages since the last call, e.g. rejected edits.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    // ─── Refresh ────────────────────────────────────────────────────────────

    /// Replace the node tree with fresh data from the tracker and rebuild
    /// everything. An active gesture is dropped; its geometry belonged to
    /// the old scene.
    pub fn refresh(&mut self, nodes: Vec<Node>) {
        if !self.gesture.is_idle() {
            debug!("refresh dropped active {} gesture", self.gesture.name());
            self.gesture = Gesture::Idle;
            self.throttle.clear();
        }
        self.nodes = nodes;
        self.rebuild();
    }

    /// Fit the viewport to the dates in the current tree.
    pub fn fit_viewport(&mut self) {
        let mut dates = Vec::new();
        collect_dates(&self.nodes, &mut dates);
        let min = dates.iter().min().copied().unwrap_or(self.today);
        let max = dates.iter().max().copied().unwrap_or(self.today);
        let scale = self.viewport.scale;
        self.viewport = TimelineViewport::fit(min, max, self.viewport.pixels_per_day);
        self.viewport.scale = scale;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let rows = flatten(&self.nodes, &self.collapse);
        self.layout = Layout::build(rows, &self.config.layout);
        self.scene = Scene::generate(&self.layout, &self.viewport, &self.config, self.today);
        let layout = &self.layout;
        self.selection.retain(|key| layout.index_of(key).is_some());
        self.sink.replace_scene(&self.layout, &self.scene);
        debug!(
            "full refresh: {} rows, {} bars, {} arrows",
            self.layout.rows.len(),
            self.scene.bars.len(),
            self.scene.arrows.len()
        );
    }

    fn flush(&mut self, updates: Vec<SceneUpdate>) {
        for update in updates {
            self.sink.apply(update);
        }
    }

    // ─── Collapse ───────────────────────────────────────────────────────────

    /// Expand, collapse or flip one row in place.
    pub fn toggle(&mut self, key: &CollapseKey, direction: ToggleDirection) -> ToggleOutcome {
        if !self.gesture.is_idle() {
            debug!("toggle of {} ignored during {}", key, self.gesture.name());
            return ToggleOutcome::NoOp;
        }
        let mut updates = Vec::new();
        let outcome = toggle(&mut self.layout, &mut self.scene, key, direction, &mut updates);
        match outcome {
            ToggleOutcome::Applied { expanded, .. } => {
                self.collapse.set(key.clone(), expanded);
                self.host.persist_collapse_state(key, expanded);
                self.flush(updates);
            }
            ToggleOutcome::NoOp => {}
            ToggleOutcome::RefreshRequired => {
                if let Some(row) = self.layout.row(key) {
                    if let Some(expanded) = direction.resolve(row.is_expanded) {
                        self.collapse.set(key.clone(), expanded);
                        self.host.persist_collapse_state(key, expanded);
                    }
                }
                self.rebuild();
                self.host.request_refresh();
            }
        }
        outcome
    }

    pub fn expand_all(&mut self) -> usize {
        self.set_all_expanded(true)
    }

    pub fn collapse_all(&mut self) -> usize {
        self.set_all_expanded(false)
    }

    fn set_all_expanded(&mut self, expanded: bool) -> usize {
        if !self.gesture.is_idle() {
            return 0;
        }
        let keys: Vec<CollapseKey> = self
            .layout
            .rows
            .iter()
            .filter(|row| row.has_children && row.is_expanded != expanded)
            .map(|row| row.collapse_key.clone())
            .collect();
        for key in &keys {
            self.collapse.set(key.clone(), expanded);
            self.host.persist_collapse_state(key, expanded);
        }
        if !keys.is_empty() {
            self.rebuild();
        }
        keys.len()
    }

    // ─── Selection ──────────────────────────────────────────────────────────

    /// Select a row. `additive` adds or removes it from the current set.
    pub fn select(&mut self, key: &CollapseKey, additive: bool) -> bool {
        if self.layout.index_of(key).is_none() {
            return false;
        }
        if additive {
            if let Some(pos) = self.selection.iter().position(|k| k == key) {
                self.selection.remove(pos);
            } else {
                self.selection.push(key.clone());
            }
        } else {
            self.selection = vec![key.clone()];
        }
        self.host.persist_selection(self.selection.last());
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.host.persist_selection(None);
    }

    pub fn is_selected(&self, key: &CollapseKey) -> bool {
        self.selection.contains(key)
    }

    /// Escape: cancel a gesture if one is active, otherwise clear the selection.
    pub fn escape(&mut self) -> GestureOutcome {
        if !self.gesture.is_idle() {
            return self.cancel();
        }
        if self.selection.is_empty() {
            return GestureOutcome::Ignored;
        }
        self.clear_selection();
        GestureOutcome::Cancelled
    }

    // ─── Pointer ────────────────────────────────────────────────────────────

    /// Host scroll offset of the timeline, in pixels.
    pub fn set_scroll(&mut self, x: f32, y: f32) {
        self.scroll = Point::new(x, y);
        if matches!(self.gesture, Gesture::Dragging(_)) {
            self.throttle.submit((self.last_pointer, self.scroll));
        }
    }

    /// Pointer pressed at a viewport position. Hit-tests the scene.
    pub fn pointer_down(&mut self, pointer: Point) -> GestureOutcome {
        if !self.gesture.is_idle() {
            return GestureOutcome::Refused;
        }
        let content = Point::new(pointer.x + self.scroll.x, pointer.y + self.scroll.y);
        match hit_test(&self.scene, content, self.config.interaction.handle_width) {
            Some(target) => self.pointer_down_on(target, pointer),
            None => GestureOutcome::Ignored,
        }
    }

    /// Pointer pressed on a target the host already identified.
    pub fn pointer_down_on(&mut self, target: PointerTarget, pointer: Point) -> GestureOutcome {
        if !self.gesture.is_idle() {
            debug!("{:?} refused during {}", target, self.gesture.name());
            return GestureOutcome::Refused;
        }
        if matches!(target, PointerTarget::BarBody { .. } | PointerTarget::ResizeHandle { .. })
            && !self.is_selected(target.key())
        {
            self.select(target.key(), false);
        }
        match DragState::begin(&self.scene, &target, &self.selection, pointer, self.scroll) {
            Ok(drag) => {
                debug!("{} started on {}", drag.name(), target.key());
                self.last_pointer = pointer;
                self.gesture = Gesture::Dragging(drag);
                GestureOutcome::Started
            }
            Err(reason) => {
                debug!("gesture on {} refused: {:?}", target.key(), reason);
                GestureOutcome::Refused
            }
        }
    }

    /// Pointer moved. Coalesced until the next [`frame`](Self::frame).
    pub fn pointer_move(&mut self, pointer: Point) -> GestureOutcome {
        if !matches!(self.gesture, Gesture::Dragging(_)) {
            return GestureOutcome::Ignored;
        }
        self.last_pointer = pointer;
        self.throttle.submit((pointer, self.scroll));
        GestureOutcome::Updated
    }

    /// Apply at most one pending pointer position. Call once per frame.
    pub fn frame(&mut self) -> bool {
        let Some((pointer, scroll)) = self.throttle.take() else {
            return false;
        };
        let Gesture::Dragging(drag) = &mut self.gesture else {
            return false;
        };
        let mut updates = Vec::new();
        drag.update(&mut self.scene, &self.viewport, pointer, scroll, &mut updates);
        trace!(
            "frame: {} updates, {} pointer events coalesced so far",
            updates.len(),
            self.throttle.coalesced()
        );
        self.flush(updates);
        true
    }

    /// Pointer released.
    pub fn pointer_up(&mut self, pointer: Point) -> GestureOutcome {
        if !matches!(self.gesture, Gesture::Dragging(_)) {
            return GestureOutcome::Ignored;
        }
        self.throttle.submit((pointer, self.scroll));
        self.frame();
        let Gesture::Dragging(drag) = std::mem::take(&mut self.gesture) else {
            return GestureOutcome::Ignored;
        };
        let mut updates = Vec::new();
        let finish = drag.finish(&mut self.scene, pointer, self.scroll, &mut updates);
        self.flush(updates);
        match finish {
            DragFinish::Unchanged => GestureOutcome::Reverted,
            DragFinish::LinkRejected => GestureOutcome::Rejected,
            DragFinish::Dates { changes, restore } => {
                if self.is_draft_mode() || !self.config.interaction.confirm_date_changes {
                    self.commit_dates(changes)
                } else {
                    self.gesture = Gesture::Confirming(PendingCommit::Dates { changes, restore });
                    GestureOutcome::AwaitingConfirmation
                }
            }
            DragFinish::Link {
                from_key,
                to_key,
                from_id,
                to_id,
                suggested,
            } => {
                self.gesture = Gesture::Confirming(PendingCommit::Relation {
                    from_key,
                    to_key,
                    from_id,
                    to_id,
                    suggested,
                });
                GestureOutcome::AwaitingConfirmation
            }
        }
    }

    /// Accept pending date changes.
    pub fn confirm_dates(&mut self) -> GestureOutcome {
        match std::mem::take(&mut self.gesture) {
            Gesture::Confirming(PendingCommit::Dates { changes, restore }) => {
                let changes: Vec<DateChange> =
                    changes.into_iter().filter(|c| !c.is_noop()).collect();
                if changes.is_empty() {
                    let mut updates = Vec::new();
                    self.scroll = restore.restore(&mut self.scene, &mut updates);
                    self.flush(updates);
                    debug!("confirmed dates match the originals, nothing to commit");
                    return GestureOutcome::Reverted;
                }
                self.commit_dates(changes)
            }
            other => {
                self.gesture = other;
                GestureOutcome::Ignored
            }
        }
    }

    /// Edit one change of a pending date confirmation, e.g. from a date
    /// picker. The live bar follows; cancelling still restores the pre-drag
    /// geometry.
    pub fn adjust_pending_dates(
        &mut self,
        node_id: u64,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
    ) -> bool {
        if let (Some(start), Some(due)) = (start, due) {
            if due < start {
                return false;
            }
        }
        let Gesture::Confirming(PendingCommit::Dates { changes, .. }) = &mut self.gesture else {
            return false;
        };
        let Some(change) = changes.iter_mut().find(|c| c.node_id == node_id) else {
            return false;
        };
        change.new_start = start;
        change.new_due = due;
        let Some(key) = self.scene.key_of_node.get(&node_id).cloned() else {
            return false;
        };
        let mut updates = Vec::new();
        self.place_bar(&key, start, due, &mut updates);
        self.flush(updates);
        true
    }

    /// Accept a pending link with the chosen relation type.
    pub fn confirm_relation(&mut self, kind: RelationType, delay: Option<i64>) -> GestureOutcome {
        match std::mem::take(&mut self.gesture) {
            Gesture::Confirming(PendingCommit::Relation { from_id, to_id, .. }) => {
                let change = RelationChange {
                    op: RelationOp::Create,
                    relation_id: None,
                    from_id,
                    to_id,
                    relation_type: kind,
                    delay: if kind.is_scheduling() { delay } else { None },
                };
                let provisional = self.allocate_provisional();
                self.apply_relation_locally(&change, Some(provisional));
                self.commit(UndoEntry::RelationChange(change), Some(provisional))
            }
            other => {
                self.gesture = other;
                GestureOutcome::Ignored
            }
        }
    }

    /// Cancel the active gesture or pending confirmation, restoring geometry.
    pub fn cancel(&mut self) -> GestureOutcome {
        let mut updates = Vec::new();
        let outcome = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => GestureOutcome::Ignored,
            Gesture::Dragging(drag) => {
                self.throttle.clear();
                match drag.restore() {
                    Some(restore) => {
                        self.scroll = restore.restore(&mut self.scene, &mut updates);
                    }
                    None => {
                        self.scene.link_preview = None;
                        updates.push(SceneUpdate::LinkPreview(None));
                    }
                }
                debug!("{} cancelled", drag.name());
                GestureOutcome::Cancelled
            }
            Gesture::Confirming(PendingCommit::Dates { restore, .. }) => {
                self.scroll = restore.restore(&mut self.scene, &mut updates);
                debug!("date change cancelled at confirmation");
                GestureOutcome::Cancelled
            }
            Gesture::Confirming(PendingCommit::Relation { .. }) => GestureOutcome::Cancelled,
        };
        self.flush(updates);
        outcome
    }

    // ─── Commits ────────────────────────────────────────────────────────────

    fn commit_dates(&mut self, changes: Vec<DateChange>) -> GestureOutcome {
        self.sync_dates(&changes);
        let entry = match <[DateChange; 1]>::try_from(changes) {
            Ok([change]) => UndoEntry::DateChange(change),
            Err(changes) => UndoEntry::BulkDateChange(changes),
        };
        self.commit(entry, None)
    }

    fn commit(&mut self, entry: UndoEntry, provisional: Option<u64>) -> GestureOutcome {
        let item = self.history.commit(entry);
        if self.is_draft_mode() {
            debug!("queued draft {}: {}", item.id, item.entry.describe());
            let id = item.id;
            if let Some(local) = provisional {
                self.draft_relations.insert(id, local);
            }
            self.drafts.push(item);
            return GestureOutcome::Queued(id);
        }
        debug!("committed {}", item.entry.describe());
        let ticket = self.send(vec![item.id], item.entry, provisional);
        GestureOutcome::Committed(ticket.0)
    }

    fn send(
        &mut self,
        history_ids: Vec<Uuid>,
        entry: UndoEntry,
        provisional_relation: Option<u64>,
    ) -> IntentTicket {
        let ticket = IntentTicket::new();
        let provisional_relation = match &entry {
            UndoEntry::RelationChange(change) if change.op == RelationOp::Create => {
                change.relation_id.or(provisional_relation)
            }
            _ => None,
        };
        match &entry {
            UndoEntry::DateChange(change) => self.host.request_date_change(ticket, change),
            UndoEntry::BulkDateChange(changes) => {
                self.host.request_bulk_date_change(ticket, changes)
            }
            UndoEntry::RelationChange(change) => {
                self.host.request_relation_change(ticket, change)
            }
        }
        self.in_flight.insert(
            ticket,
            InFlight {
                history_ids,
                sent: entry,
                provisional_relation,
            },
        );
        ticket
    }

    /// Delete a relation. Committed and undoable like any other edit.
    pub fn delete_relation(&mut self, relation_id: u64) -> GestureOutcome {
        if !self.gesture.is_idle() {
            return GestureOutcome::Refused;
        }
        let Some(arrow) = self
            .scene
            .arrows
            .iter()
            .find(|arrow| arrow.spec.relation_id == relation_id)
        else {
            return GestureOutcome::Ignored;
        };
        let spec = &arrow.spec;
        let change = RelationChange {
            op: RelationOp::Delete,
            relation_id: Some(relation_id),
            from_id: spec.from_id,
            to_id: spec.to_id,
            relation_type: spec.relation_type,
            delay: spec.delay,
        };
        self.apply_relation_locally(&change, None);
        self.commit(UndoEntry::RelationChange(change), None)
    }

    // ─── Undo / redo ────────────────────────────────────────────────────────

    /// Undo the newest entry. A draft that was never sent is just dropped
    /// from the queue; anything else emits its inverse intent.
    pub fn undo(&mut self) -> Option<HistoryItem> {
        if !self.gesture.is_idle() {
            return None;
        }
        let item = self.history.undo()?;
        let inverse = item.entry.inverse();
        self.apply_entry_locally(&inverse, None);
        if self.drafts.remove(item.id) {
            self.draft_relations.remove(&item.id);
            debug!("undo removed draft {}", item.entry.describe());
        } else {
            debug!("undo {}", item.entry.describe());
            self.send(vec![item.id], inverse, None);
        }
        Some(item)
    }

    /// Redo the newest undone entry.
    pub fn redo(&mut self) -> Option<HistoryItem> {
        if !self.gesture.is_idle() {
            return None;
        }
        let item = self.history.redo()?;
        let provisional = match &item.entry {
            UndoEntry::RelationChange(change)
                if change.op == RelationOp::Create && change.relation_id.is_none() =>
            {
                Some(self.allocate_provisional())
            }
            _ => None,
        };
        self.apply_entry_locally(&item.entry, provisional);
        if self.is_draft_mode() {
            debug!("redo queued {}", item.entry.describe());
            if let Some(local) = provisional {
                self.draft_relations.insert(item.id, local);
            }
            self.drafts.push(item.clone());
        } else {
            debug!("redo {}", item.entry.describe());
            self.send(vec![item.id], item.entry.clone(), provisional);
        }
        Some(item)
    }

    // ─── Drafts ─────────────────────────────────────────────────────────────

    pub fn set_draft_mode(&mut self, enabled: bool) {
        self.config.interaction.draft_mode = enabled;
        debug!("draft mode {}", if enabled { "on" } else { "off" });
    }

    /// Send every queued draft. Date changes travel as one bulk intent.
    pub fn submit_drafts(&mut self) -> usize {
        let items = self.drafts.take_all();
        let count = items.len();
        let mut date_ids = Vec::new();
        let mut dates = Vec::new();
        for item in items {
            match item.entry {
                UndoEntry::DateChange(change) => {
                    date_ids.push(item.id);
                    dates.push(change);
                }
                UndoEntry::BulkDateChange(changes) => {
                    date_ids.push(item.id);
                    dates.extend(changes);
                }
                UndoEntry::RelationChange(change) => {
                    let local = self.draft_relations.remove(&item.id);
                    self.send(vec![item.id], UndoEntry::RelationChange(change), local);
                }
            }
        }
        if !dates.is_empty() {
            self.send(date_ids, UndoEntry::BulkDateChange(dates), None);
        }
        debug!("submitted {} drafts", count);
        count
    }

    /// Revert every queued draft locally and drop it from history.
    pub fn discard_drafts(&mut self) -> usize {
        let items = self.drafts.take_all();
        for item in items.iter().rev() {
            self.draft_relations.remove(&item.id);
            self.apply_entry_locally(&item.entry.inverse(), None);
            self.history.remove(item.id);
        }
        debug!("discarded {} drafts", items.len());
        items.len()
    }

    // ─── Acknowledgements ───────────────────────────────────────────────────

    /// The tracker applied an intent.
    pub fn intent_acknowledged(&mut self, ticket: IntentTicket, ack: Ack) -> bool {
        let Some(flight) = self.in_flight.remove(&ticket) else {
            return false;
        };
        if let Some(relation_id) = ack.relation_id {
            if let Some(provisional) = flight.provisional_relation {
                self.rename_relation(provisional, relation_id);
            }
            for id in &flight.history_ids {
                self.history.set_relation_id(*id, relation_id);
            }
        }
        debug!("intent {} acknowledged", ticket);
        true
    }

    /// The tracker rejected an intent: revert it as if the gesture had been
    /// cancelled after the fact, tell the user and ask for fresh data.
    pub fn intent_failed(&mut self, ticket: IntentTicket, reason: &str) -> bool {
        let Some(flight) = self.in_flight.remove(&ticket) else {
            return false;
        };
        warn!(
            "intent {} ({}) rejected: {}",
            ticket,
            flight.sent.describe(),
            reason
        );
        self.apply_entry_locally(&flight.sent.inverse(), None);
        for id in &flight.history_ids {
            self.history.remove(*id);
        }
        self.notices
            .push(format!("Rejected {}: {}", flight.sent.describe(), reason));
        self.host.request_refresh();
        true
    }

    // ─── Zoom ───────────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) -> bool {
        let before = self.viewport.pixels_per_day;
        self.viewport.zoom_in(self.config.zoom.max_pixels_per_day);
        self.after_zoom(before)
    }

    pub fn zoom_out(&mut self) -> bool {
        let before = self.viewport.pixels_per_day;
        self.viewport.zoom_out(self.config.zoom.min_pixels_per_day);
        self.after_zoom(before)
    }

    /// Header tick scale. Geometry does not depend on it.
    pub fn set_scale(&mut self, scale: TimelineScale) {
        self.viewport.scale = scale;
    }

    fn after_zoom(&mut self, before: f32) -> bool {
        if !self.gesture.is_idle() {
            self.viewport.pixels_per_day = before;
            return false;
        }
        if self.viewport.pixels_per_day == before {
            return false;
        }
        debug!("zoom {} -> {} px/day", before, self.viewport.pixels_per_day);
        self.rebuild();
        true
    }

    // ─── Local application ──────────────────────────────────────────────────

    fn apply_entry_locally(&mut self, entry: &UndoEntry, provisional: Option<u64>) {
        match entry {
            UndoEntry::RelationChange(change) => self.apply_relation_locally(change, provisional),
            UndoEntry::DateChange(_) | UndoEntry::BulkDateChange(_) => {
                let changes = entry.date_changes().to_vec();
                self.sync_dates(&changes);
            }
        }
    }

    /// Bring nodes, rows and bars in line with `changes`.
    fn sync_dates(&mut self, changes: &[DateChange]) {
        let mut updates = Vec::new();
        for change in changes {
            if let Some(node) = find_issue_mut(&mut self.nodes, change.node_id) {
                node.start = change.new_start;
                node.due = change.new_due;
            }
            let Some(key) = self.scene.key_of_node.get(&change.node_id).cloned() else {
                warn!("date change for node {} outside the scene", change.node_id);
                continue;
            };
            if let Some(index) = self.layout.index_of(&key) {
                let row = &mut self.layout.rows[index];
                row.start = change.new_start;
                row.due = change.new_due;
            }
            self.place_bar(&key, change.new_start, change.new_due, &mut updates);
        }
        self.flush(updates);
    }

    /// Move a bar to new dates and re-route the arrows touching it.
    fn place_bar(
        &mut self,
        key: &CollapseKey,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
        updates: &mut Vec<SceneUpdate>,
    ) {
        let current = self.scene.bars.get(key).map(|bar| (bar.start, bar.due));
        if current != Some((start, due))
            && self.scene.apply_dates(key, start, due, &self.viewport).is_some()
        {
            if let Some(bar) = self.scene.bars.get(key) {
                updates.push(SceneUpdate::Bar {
                    key: key.clone(),
                    geometry: bar.geometry,
                    label: bar.label.clone(),
                    visible: bar.visible,
                });
            }
        }
        let touching = self.scene.arrows_touching(key).to_vec();
        for i in touching {
            if self.scene.reroute(i) {
                let arrow = &self.scene.arrows[i];
                updates.push(SceneUpdate::Arrow {
                    index: i,
                    path: arrow.path.clone(),
                    visible: arrow.visible,
                });
            }
        }
    }

    /// Add or remove a relation on both endpoints and rebuild the scene.
    fn apply_relation_locally(&mut self, change: &RelationChange, provisional: Option<u64>) {
        match change.op {
            RelationOp::Create => {
                let relation = Relation {
                    id: change.relation_id.or(provisional).unwrap_or(0),
                    from: change.from_id,
                    to: change.to_id,
                    kind: change.relation_type,
                    delay: change.delay,
                };
                for id in [change.from_id, change.to_id] {
                    if let Some(node) = find_issue_mut(&mut self.nodes, id) {
                        node.issue
                            .get_or_insert_with(Default::default)
                            .relations
                            .push(relation.clone());
                    }
                }
            }
            RelationOp::Delete => {
                for id in [change.from_id, change.to_id] {
                    if let Some(issue) =
                        find_issue_mut(&mut self.nodes, id).and_then(|node| node.issue.as_mut())
                    {
                        issue.relations.retain(|r| !relation_matches(r, change));
                    }
                }
            }
        }
        self.rebuild();
    }

    fn rename_relation(&mut self, from: u64, to: u64) {
        rename_in_nodes(&mut self.nodes, from, to);
        for arrow in self.scene.arrows.iter_mut() {
            if arrow.spec.relation_id == from {
                arrow.spec.relation_id = to;
            }
        }
    }

    fn allocate_provisional(&mut self) -> u64 {
        let id = self.next_provisional;
        self.next_provisional -= 1;
        id
    }
}

fn relation_matches(relation: &Relation, change: &RelationChange) -> bool {
    match change.relation_id {
        Some(id) if relation.id == id => true,
        _ => {
            relation.from == change.from_id
                && relation.to == change.to_id
                && relation.kind == change.relation_type
        }
    }
}

fn find_issue_mut(nodes: &mut [Node], id: u64) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        if node.kind == NodeKind::Issue && node.id == id {
            return Some(node);
        }
        if let Some(found) = find_issue_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn rename_in_nodes(nodes: &mut [Node], from: u64, to: u64) {
    for node in nodes.iter_mut() {
        if let Some(issue) = node.issue.as_mut() {
            for relation in issue.relations.iter_mut().filter(|r| r.id == from) {
                relation.id = to;
            }
        }
        rename_in_nodes(&mut node.children, from, to);
    }
}

fn collect_dates(nodes: &[Node], dates: &mut Vec<NaiveDate>) {
    for node in nodes {
        dates.extend(node.start);
        dates.extend(node.due);
        collect_dates(&node.children, dates);
    }
}
