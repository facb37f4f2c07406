//! The canvas store: every element on the page and the local editing state
//! around it (selection, active tool, drag in progress, zoom).

use std::collections::HashSet;

use tracing::debug;

use crate::block::{Block, BlockKind, BlockPatch};
use crate::clock;

pub const ZOOM_MIN: u32 = 25;
pub const ZOOM_MAX: u32 = 200;
pub const ZOOM_STEP: u32 = 25;

/// How far a duplicate lands from its source.
pub const DUPLICATE_OFFSET: f64 = 20.0;

const SPAWN_POINT: (f64, f64) = (100.0, 100.0);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    #[default]
    Select,
    Text,
    InlineText,
    Image,
    Shape,
}

impl Tool {
    pub const ALL: [Tool; 5] = [Tool::Select, Tool::Text, Tool::InlineText, Tool::Image, Tool::Shape];

    /// Kind of element a click on the canvas creates with this tool.
    pub fn creates(self) -> Option<BlockKind> {
        match self {
            Tool::Select => None,
            Tool::Text => Some(BlockKind::Text),
            Tool::InlineText => Some(BlockKind::InlineText),
            Tool::Image => Some(BlockKind::Image),
            Tool::Shape => Some(BlockKind::Shape),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Text => "Text",
            Tool::InlineText => "Inline",
            Tool::Image => "Image",
            Tool::Shape => "Shape",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditorMode {
    Editor,
    Preview,
}

/// A drag in progress. Positions are computed from where the element and
/// pointer were when the drag started, never from the previous tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Drag {
    pub id: String,
    pointer_start: (f64, f64),
    origin: (f64, f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EditorState {
    pub elements: Vec<Block>,
    pub selected_id: Option<String>,
    pub drag: Option<Drag>,
    pub tool: Tool,
    pub zoom: u32,
    pub show_grid: bool,
    pub mode: EditorMode,
    /// Elements were added, removed or duplicated since the last full save.
    pub dirty: bool,
    id_prefix: &'static str,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new("element")
    }
}

impl EditorState {
    pub fn new(id_prefix: &'static str) -> Self {
        Self {
            elements: Vec::new(),
            selected_id: None,
            drag: None,
            tool: Tool::Select,
            zoom: 100,
            show_grid: true,
            mode: EditorMode::Editor,
            dirty: false,
            id_prefix,
        }
    }

    /// Replace the canvas with a stored structure, filling missing layout.
    pub fn load(&mut self, structure: Vec<Block>) {
        self.elements = structure
            .into_iter()
            .enumerate()
            .map(|(i, block)| block.with_layout_defaults(i))
            .collect();
        self.selected_id = None;
        self.drag = None;
        self.dirty = false;
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn selected(&self) -> Option<&Block> {
        self.selected_id.as_deref().and_then(|id| self.get(id))
    }

    /// Elements back to front.
    pub fn paint_order(&self) -> Vec<&Block> {
        let mut order: Vec<&Block> = self.elements.iter().collect();
        order.sort_by_key(|b| b.layer());
        order
    }

    fn fresh_id(&self) -> String {
        let taken: HashSet<&str> = self.elements.iter().map(|e| e.id.as_str()).collect();
        let base = format!("{}-{}", self.id_prefix, clock::now_millis());
        if !taken.contains(base.as_str()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn record_key_for(&self, id: &str) -> String {
        let stamp = id
            .strip_prefix(self.id_prefix)
            .map(|rest| rest.trim_start_matches('-'))
            .unwrap_or(id);
        format!("text-{stamp}")
    }

    fn next_layer(&self) -> i64 {
        self.elements.len() as i64
    }

    pub fn add_element(&mut self, kind: BlockKind) -> String {
        self.add_element_at(kind, SPAWN_POINT.0, SPAWN_POINT.1)
    }

    /// Append a new element of `kind` at (x, y), on top of everything, and
    /// select it.
    pub fn add_element_at(&mut self, kind: BlockKind, x: f64, y: f64) -> String {
        let id = self.fresh_id();
        let (width, height) = kind.default_size();
        let heading = kind == BlockKind::Heading;
        let content = match kind {
            BlockKind::Text | BlockKind::InlineText => Some("New Text"),
            BlockKind::Heading => Some("New Heading"),
            BlockKind::Paragraph => Some("New paragraph text"),
            _ => None,
        };
        let background = match kind {
            BlockKind::Shape => Some("#3b82f6"),
            BlockKind::InlineText | BlockKind::Heading | BlockKind::Paragraph => Some("transparent"),
            _ => None,
        };
        let element = Block {
            id: id.clone(),
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            content: content.map(str::to_string),
            src: (kind == BlockKind::Image)
                .then(|| "/placeholder.svg?height=100&width=150".to_string()),
            level: heading.then_some(1),
            background_color: background.map(str::to_string),
            text_color: Some("#000000".to_string()),
            font_size: Some(if heading { 32.0 } else { 16.0 }),
            font_weight: Some(if heading { "bold" } else { "normal" }.to_string()),
            text_align: Some("left".to_string()),
            border_radius: Some(0.0),
            rotation: Some(0.0),
            opacity: Some(100.0),
            z_index: Some(self.next_layer()),
            record_key: (kind == BlockKind::InlineText).then(|| self.record_key_for(&id)),
            kind,
            ..Default::default()
        };
        debug!(id = %id, kind = element.kind.as_str(), "element added");
        self.elements.push(element);
        self.selected_id = Some(id.clone());
        self.dirty = true;
        id
    }

    /// Shallow-merge `patch` into the element; false if there is none.
    pub fn update_element(&mut self, id: &str, patch: &BlockPatch) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                patch.apply_to(element);
                true
            }
            None => false,
        }
    }

    pub fn delete_element(&mut self, id: &str) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != id);
        let removed = self.elements.len() != before;
        if removed {
            if self.selected_id.as_deref() == Some(id) {
                self.selected_id = None;
            }
            if self.drag.as_ref().is_some_and(|d| d.id == id) {
                self.drag = None;
            }
            self.dirty = true;
            debug!(id = %id, "element deleted");
        }
        removed
    }

    /// Copy the element 20px down and right, on top, and select the copy.
    pub fn duplicate_element(&mut self, id: &str) -> Option<String> {
        let source = self.get(id)?.clone();
        let new_id = self.fresh_id();
        let (x, y) = source.position();
        let record_key = match source.kind {
            BlockKind::InlineText => Some(self.record_key_for(&new_id)),
            _ => source.record_key.clone(),
        };
        let copy = Block {
            id: new_id.clone(),
            x: Some(x + DUPLICATE_OFFSET),
            y: Some(y + DUPLICATE_OFFSET),
            z_index: Some(self.next_layer()),
            record_key,
            ..source
        };
        self.elements.push(copy);
        self.selected_id = Some(new_id.clone());
        self.dirty = true;
        Some(new_id)
    }

    /// Raise the element above all others; returns the layer change.
    pub fn bring_to_front(&mut self, id: &str) -> Option<BlockPatch> {
        let top = self.elements.iter().map(Block::layer).max().unwrap_or(0);
        self.restack(id, top + 1)
    }

    pub fn send_to_back(&mut self, id: &str) -> Option<BlockPatch> {
        let bottom = self.elements.iter().map(Block::layer).min().unwrap_or(0);
        self.restack(id, bottom - 1)
    }

    fn restack(&mut self, id: &str, layer: i64) -> Option<BlockPatch> {
        let patch = BlockPatch {
            z_index: Some(layer),
            ..Default::default()
        };
        self.update_element(id, &patch).then_some(patch)
    }

    pub fn select(&mut self, id: &str) {
        if self.get(id).is_some() {
            self.selected_id = Some(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_id = None;
    }

    /// Pointer went down on an element. Selects it and, with the select
    /// tool, starts dragging it.
    pub fn begin_drag(&mut self, id: &str, pointer_x: f64, pointer_y: f64) -> bool {
        let Some(origin) = self.get(id).map(Block::position) else {
            return false;
        };
        self.selected_id = Some(id.to_string());
        if self.tool != Tool::Select {
            return false;
        }
        self.drag = Some(Drag {
            id: id.to_string(),
            pointer_start: (pointer_x, pointer_y),
            origin,
        });
        true
    }

    /// Pointer moved during a drag. Returns the position change to persist.
    pub fn drag_to(&mut self, pointer_x: f64, pointer_y: f64) -> Option<(String, BlockPatch)> {
        let drag = self.drag.clone()?;
        let scale = self.scale();
        let patch = BlockPatch {
            x: Some(drag.origin.0 + (pointer_x - drag.pointer_start.0) / scale),
            y: Some(drag.origin.1 + (pointer_y - drag.pointer_start.1) / scale),
            ..Default::default()
        };
        self.update_element(&drag.id, &patch)
            .then_some((drag.id, patch))
    }

    pub fn end_drag(&mut self) -> Option<String> {
        self.drag.take().map(|d| d.id)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// A click on empty canvas at canvas coordinates (x, y): clears the
    /// selection, or creates an element there when a creation tool is active.
    pub fn canvas_click(&mut self, x: f64, y: f64) -> Option<String> {
        match self.tool.creates() {
            Some(kind) => {
                let id = self.add_element_at(kind, x, y);
                self.tool = Tool::Select;
                Some(id)
            }
            None => {
                self.clear_selection();
                None
            }
        }
    }

    pub fn scale(&self) -> f64 {
        self.zoom as f64 / 100.0
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(ZOOM_MAX);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(ZOOM_STEP).max(ZOOM_MIN);
    }

    pub fn toggle_grid(&mut self) {
        self.show_grid = !self.show_grid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_unique(state: &EditorState) {
        let ids: HashSet<&str> = state.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), state.elements.len());
    }

    #[test]
    fn ids_stay_unique_through_mixed_edits() {
        let mut state = EditorState::new("block");
        let kinds = [BlockKind::Text, BlockKind::Shape, BlockKind::Image, BlockKind::InlineText];
        for round in 0..40 {
            let id = state.add_element(kinds[round % kinds.len()].clone());
            if round % 3 == 0 {
                state.duplicate_element(&id);
            }
            if round % 5 == 0 {
                let victim = state.elements[round % state.elements.len()].id.clone();
                state.delete_element(&victim);
            }
            if round % 7 == 0 {
                if let Some(first) = state.elements.first().map(|e| e.id.clone()) {
                    state.duplicate_element(&first);
                }
            }
            assert_unique(&state);
        }
        assert!(state.elements.iter().all(|e| e.id.starts_with("block-")));
    }

    #[test]
    fn new_elements_get_kind_defaults_and_paint_on_top() {
        let mut state = EditorState::default();
        let text = state.add_element(BlockKind::Text);
        let shape = state.add_element(BlockKind::Shape);
        let text = state.get(&text).unwrap();
        assert_eq!(text.size(), (200.0, 50.0));
        assert_eq!(text.content.as_deref(), Some("New Text"));
        assert_eq!(text.z_index, Some(0));
        let shape = state.get(&shape).unwrap();
        assert_eq!(shape.size(), (150.0, 100.0));
        assert_eq!(shape.z_index, Some(1));
        assert_eq!(shape.background_color.as_deref(), Some("#3b82f6"));
        assert_eq!(state.selected_id.as_deref(), Some(shape.id.as_str()));
        assert!(state.dirty);
    }

    #[test]
    fn duplicate_is_offset_and_distinct() {
        let mut state = EditorState::default();
        let id = state.add_element(BlockKind::InlineText);
        state.update_element(
            &id,
            &BlockPatch {
                x: Some(37.0),
                y: Some(-4.0),
                ..Default::default()
            },
        );
        let copy_id = state.duplicate_element(&id).unwrap();
        assert_ne!(copy_id, id);
        let (src, copy) = (state.get(&id).unwrap(), state.get(&copy_id).unwrap());
        assert_eq!(copy.position(), (57.0, 16.0));
        assert_eq!(copy.z_index, Some(1));
        assert_ne!(copy.record_key, src.record_key);
        assert_eq!(state.selected_id.as_deref(), Some(copy_id.as_str()));
        assert_eq!(state.duplicate_element("missing"), None);
    }

    #[test]
    fn update_of_unknown_id_is_a_no_op() {
        let mut state = EditorState::default();
        state.add_element(BlockKind::Shape);
        let before = state.clone();
        let patch = BlockPatch {
            x: Some(1.0),
            ..Default::default()
        };
        assert!(!state.update_element("nope", &patch));
        assert_eq!(state, before);
    }

    #[test]
    fn deleting_clears_only_its_own_selection() {
        let mut state = EditorState::default();
        let a = state.add_element(BlockKind::Shape);
        let b = state.add_element(BlockKind::Shape);
        state.select(&a);
        state.delete_element(&b);
        assert_eq!(state.selected_id.as_deref(), Some(a.as_str()));
        state.delete_element(&a);
        assert_eq!(state.selected_id, None);
        assert!(!state.delete_element(&a));
    }

    #[test]
    fn dragging_tracks_the_start_not_the_last_tick() {
        let mut state = EditorState::default();
        let id = state.add_element(BlockKind::Shape);
        assert!(state.begin_drag(&id, 500.0, 500.0));
        for step in 1..=10 {
            state.drag_to(500.0 + step as f64, 500.0 - step as f64);
        }
        let (_, patch) = state.drag_to(530.0, 480.0).unwrap();
        assert_eq!((patch.x, patch.y), (Some(130.0), Some(80.0)));
        assert_eq!(state.get(&id).unwrap().position(), (130.0, 80.0));
        assert_eq!(state.end_drag(), Some(id));
        assert_eq!(state.drag_to(0.0, 0.0), None);
    }

    #[test]
    fn drag_deltas_are_in_canvas_units_when_zoomed() {
        let mut state = EditorState::default();
        let id = state.add_element(BlockKind::Shape);
        state.zoom_in();
        state.zoom_in();
        state.zoom_in();
        state.zoom_in();
        assert_eq!(state.zoom, 200);
        assert_eq!(state.get(&id).unwrap().position(), (100.0, 100.0));
        state.begin_drag(&id, 0.0, 0.0);
        state.drag_to(40.0, 20.0);
        assert_eq!(state.get(&id).unwrap().position(), (120.0, 110.0));
    }

    #[test]
    fn only_the_select_tool_drags() {
        let mut state = EditorState::default();
        let id = state.add_element(BlockKind::Shape);
        state.clear_selection();
        state.set_tool(Tool::Shape);
        assert!(!state.begin_drag(&id, 0.0, 0.0));
        assert_eq!(state.selected_id.as_deref(), Some(id.as_str()));
        assert!(!state.is_dragging());
    }

    #[test]
    fn canvas_click_creates_with_a_tool_or_clears_selection() {
        let mut state = EditorState::default();
        state.zoom_out();
        state.zoom_out();
        assert_eq!(state.zoom, 50);
        state.set_tool(Tool::InlineText);
        let id = state.canvas_click(30.0, 40.0).unwrap();
        let created = state.get(&id).unwrap();
        assert_eq!(created.kind, BlockKind::InlineText);
        assert_eq!(created.position(), (30.0, 40.0));
        assert!(created.record_key.as_deref().unwrap().starts_with("text-"));
        assert_eq!(state.tool, Tool::Select);
        assert_eq!(state.canvas_click(1.0, 1.0), None);
        assert_eq!(state.selected_id, None);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut state = EditorState::default();
        for _ in 0..10 {
            state.zoom_out();
        }
        assert_eq!(state.zoom, ZOOM_MIN);
        for _ in 0..10 {
            state.zoom_in();
        }
        assert_eq!(state.zoom, ZOOM_MAX);
    }

    #[test]
    fn paint_order_follows_layers_not_array_order() {
        let mut state = EditorState::default();
        let a = state.add_element(BlockKind::Shape);
        let b = state.add_element(BlockKind::Shape);
        let c = state.add_element(BlockKind::Shape);
        state.send_to_back(&c);
        let patch = state.bring_to_front(&a).unwrap();
        assert_eq!(patch.z_index, Some(2));
        let order: Vec<&str> = state.paint_order().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec![c.as_str(), b.as_str(), a.as_str()]);
    }

    #[test]
    fn loading_fills_layout_and_resets_local_state() {
        let mut state = EditorState::new("block");
        state.add_element(BlockKind::Shape);
        state.load(vec![
            Block {
                id: "h".into(),
                kind: BlockKind::Heading,
                ..Default::default()
            },
            Block {
                id: "p".into(),
                kind: BlockKind::Paragraph,
                ..Default::default()
            },
        ]);
        assert_eq!(state.elements.len(), 2);
        assert_eq!(state.get("p").unwrap().position(), (50.0, 170.0));
        assert_eq!(state.get("p").unwrap().z_index, Some(1));
        assert_eq!(state.selected_id, None);
        assert!(!state.dirty);
    }
}
