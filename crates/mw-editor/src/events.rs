//! User-intent events emitted to the host.
//!
//! The engine never mutates the snapshot itself. Clicks, toggles,
//! selections, and drags are reported here and the host answers with a new
//! snapshot.

use mw_core::id::NodeId;
use serde::Serialize;

/// Final canvas position of one dragged node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionUpdate {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapEvent {
    NodeClick { id: NodeId },
    /// `x`/`y` are screen coordinates for placing a context menu.
    NodeRightClick { id: NodeId, x: f64, y: f64 },
    /// `expanded` is the requested new state.
    NodeToggle { id: NodeId, expanded: bool },
    BoxSelect { ids: Vec<NodeId> },
    /// One batch per drag, sent on release.
    NodeDragEnd { updates: Vec<PositionUpdate> },
}

/// Callback-style sink for `MapEvent`s. Every method defaults to a no-op.
pub trait MapListener {
    fn on_node_click(&mut self, _id: NodeId) {}
    fn on_node_right_click(&mut self, _id: NodeId, _x: f64, _y: f64) {}
    fn on_node_toggle(&mut self, _id: NodeId, _expanded: bool) {}
    fn on_box_select(&mut self, _ids: &[NodeId]) {}
    fn on_node_drag_end(&mut self, _updates: &[PositionUpdate]) {}
}

impl MapEvent {
    pub fn dispatch(&self, listener: &mut dyn MapListener) {
        match self {
            MapEvent::NodeClick { id } => listener.on_node_click(*id),
            MapEvent::NodeRightClick { id, x, y } => listener.on_node_right_click(*id, *x, *y),
            MapEvent::NodeToggle { id, expanded } => listener.on_node_toggle(*id, *expanded),
            MapEvent::BoxSelect { ids } => listener.on_box_select(ids),
            MapEvent::NodeDragEnd { updates } => listener.on_node_drag_end(updates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        clicks: Vec<NodeId>,
        toggles: Vec<(NodeId, bool)>,
        drags: usize,
    }

    impl MapListener for Recorder {
        fn on_node_click(&mut self, id: NodeId) {
            self.clicks.push(id);
        }
        fn on_node_toggle(&mut self, id: NodeId, expanded: bool) {
            self.toggles.push((id, expanded));
        }
        fn on_node_drag_end(&mut self, updates: &[PositionUpdate]) {
            self.drags += updates.len();
        }
    }

    #[test]
    fn dispatch_routes_to_matching_callback() {
        let a = NodeId::intern("a");
        let events = [
            MapEvent::NodeClick { id: a },
            MapEvent::NodeToggle { id: a, expanded: false },
            MapEvent::BoxSelect { ids: vec![a] },
            MapEvent::NodeDragEnd {
                updates: vec![PositionUpdate { id: a, x: 1.0, y: 2.0 }],
            },
        ];
        let mut rec = Recorder::default();
        for e in &events {
            e.dispatch(&mut rec);
        }
        assert_eq!(rec.clicks, vec![a]);
        assert_eq!(rec.toggles, vec![(a, false)]);
        assert_eq!(rec.drags, 1);
    }
}
