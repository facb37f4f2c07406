//! Caret bookkeeping for inline editing.
//!
//! Offsets count UTF-16 units over the editable region's text nodes in
//! document order, the same unit the DOM's Range offsets use.

/// Height the floating toolbar sits above the selection.
pub const TOOLBAR_LIFT: f64 = 40.0;

pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Global offset of a position inside text node `node`.
pub fn offset_of(text_lengths: &[usize], node: usize, offset_in_node: usize) -> usize {
    text_lengths.iter().take(node).sum::<usize>() + offset_in_node
}

/// Text node and local offset for a global offset: the first node whose end
/// reaches `pos`. `None` if `pos` lies past the last node.
pub fn locate(text_lengths: &[usize], pos: usize) -> Option<(usize, usize)> {
    let mut current = 0;
    for (index, len) in text_lengths.iter().enumerate() {
        if current + len >= pos {
            return Some((index, pos - current));
        }
        current += len;
    }
    None
}

/// Where a restored caret goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaretTarget {
    /// Text node index and offset inside it.
    Text(usize, usize),
    /// Start of the region itself, which holds no text nodes.
    Start,
}

/// Caret target for `pos`. An empty region always takes the caret at its
/// start; otherwise `None` if `pos` lies past the text.
pub fn caret_target(text_lengths: &[usize], pos: usize) -> Option<CaretTarget> {
    if text_lengths.is_empty() {
        return Some(CaretTarget::Start);
    }
    locate(text_lengths, pos).map(|(node, offset)| CaretTarget::Text(node, offset))
}

/// Page coordinates for the toolbar given the selection's client rectangle
/// and the window scroll.
pub fn toolbar_anchor(rect_top: f64, rect_left: f64, scroll_x: f64, scroll_y: f64) -> (f64, f64) {
    (rect_top + scroll_y - TOOLBAR_LIFT, rect_left + scroll_x)
}

#[cfg(target_arch = "wasm32")]
pub mod dom {
    use web_sys::{Element, Node, Selection};

    /// `NodeFilter.SHOW_TEXT`
    const SHOW_TEXT: u32 = 0x4;

    fn selection() -> Option<Selection> {
        web_sys::window()?.get_selection().ok().flatten()
    }

    /// Caret offset inside `root`, if the selection has a range.
    pub fn save(root: &Element) -> Option<usize> {
        let selection = selection()?;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        let before = range.clone_range();
        before.select_node_contents(root).ok()?;
        before
            .set_end(&range.start_container().ok()?, range.start_offset().ok()?)
            .ok()?;
        Some(super::utf16_len(&String::from(before.to_string())))
    }

    /// Put a collapsed caret at `pos` inside `root`.
    pub fn restore(root: &Element, pos: usize) -> Option<()> {
        let document = root.owner_document()?;
        let walker = document
            .create_tree_walker_with_what_to_show(root, SHOW_TEXT)
            .ok()?;
        let mut nodes: Vec<Node> = Vec::new();
        let mut lengths = Vec::new();
        while let Ok(Some(node)) = walker.next_node() {
            lengths.push(node.text_content().map(|t| super::utf16_len(&t)).unwrap_or(0));
            nodes.push(node);
        }
        let range = document.create_range().ok()?;
        match super::caret_target(&lengths, pos)? {
            super::CaretTarget::Text(index, offset) => range.set_start(nodes.get(index)?, offset as u32).ok()?,
            super::CaretTarget::Start => range.set_start(root, 0).ok()?,
        }
        range.collapse_with_to_start(true);
        let selection = selection()?;
        selection.remove_all_ranges().ok()?;
        selection.add_range(&range).ok()
    }

    /// Where the toolbar goes for the current selection.
    pub fn toolbar_position() -> Option<(f64, f64)> {
        let window = web_sys::window()?;
        let selection = window.get_selection().ok().flatten()?;
        if selection.range_count() == 0 {
            return None;
        }
        let rect = selection.get_range_at(0).ok()?.get_bounding_client_rect();
        Some(super::toolbar_anchor(
            rect.top(),
            rect.left(),
            window.scroll_x().unwrap_or(0.0),
            window.scroll_y().unwrap_or(0.0),
        ))
    }

    pub fn inner_html(id: &str) -> Option<String> {
        let element = web_sys::window()?.document()?.get_element_by_id(id)?;
        Some(element.inner_html())
    }

    pub fn element(id: &str) -> Option<Element> {
        web_sys::window()?.document()?.get_element_by_id(id)
    }
}
