//! Block, page and text records as they are stored in the backend.
//!
//! Every optional field stays `None` when the stored JSON omits it, and any
//! field this crate does not know about is kept in `extra`, so a record read
//! and written back keeps its shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Heading,
    Paragraph,
    Image,
    Shape,
    Bookmark,
    #[default]
    Text,
    InlineText,
    /// A type string written by something newer than this editor.
    Other(String),
}

impl BlockKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Image => "image",
            BlockKind::Shape => "shape",
            BlockKind::Bookmark => "bookmark",
            BlockKind::Text => "text",
            BlockKind::InlineText => "inline-text",
            BlockKind::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BlockKind::Heading => "Heading",
            BlockKind::Paragraph => "Paragraph",
            BlockKind::Image => "Image",
            BlockKind::Shape => "Shape",
            BlockKind::Bookmark => "Bookmark",
            BlockKind::Text => "Text",
            BlockKind::InlineText => "Inline Text",
            BlockKind::Other(s) => s,
        }
    }

    /// Size a freshly created element gets on the canvas.
    pub fn default_size(&self) -> (f64, f64) {
        match self {
            BlockKind::Text | BlockKind::InlineText => (200.0, 50.0),
            BlockKind::Heading => (600.0, 60.0),
            BlockKind::Paragraph => (500.0, 100.0),
            _ => (150.0, 100.0),
        }
    }

    /// Size a stored block gets when the record has none.
    fn stored_default_size(&self) -> (f64, f64) {
        match self {
            BlockKind::Heading => (600.0, 60.0),
            BlockKind::Paragraph => (500.0, 100.0),
            _ => (300.0, 200.0),
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            BlockKind::Heading | BlockKind::Paragraph | BlockKind::Text | BlockKind::InlineText
        )
    }
}

impl From<String> for BlockKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "heading" => BlockKind::Heading,
            "paragraph" => BlockKind::Paragraph,
            "image" => BlockKind::Image,
            "shape" => BlockKind::Shape,
            "bookmark" => BlockKind::Bookmark,
            "text" => BlockKind::Text,
            "inline-text" => BlockKind::InlineText,
            _ => BlockKind::Other(value),
        }
    }
}

impl From<BlockKind> for String {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

macro_rules! block_fields {
    ($($field:ident: $ty:ty),* $(,)?) => {
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct Block {
            pub id: String,
            #[serde(rename = "type")]
            pub kind: BlockKind,
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        /// A partial update: every field that is `Some` overwrites the block's.
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct BlockPatch {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
            #[serde(flatten)]
            pub extra: Map<String, Value>,
        }

        impl BlockPatch {
            pub fn apply_to(&self, block: &mut Block) {
                $(
                    if let Some(value) = &self.$field {
                        block.$field = Some(value.clone());
                    }
                )*
                for (key, value) in &self.extra {
                    block.extra.insert(key.clone(), value.clone());
                }
            }

            /// Fold a later patch into this one, later fields winning.
            pub fn merge(&mut self, newer: BlockPatch) {
                $(
                    if newer.$field.is_some() {
                        self.$field = newer.$field;
                    }
                )*
                self.extra.extend(newer.extra);
            }

            pub fn is_empty(&self) -> bool {
                $( self.$field.is_none() && )* self.extra.is_empty()
            }
        }
    };
}

block_fields! {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    content: String,
    src: String,
    alt: String,
    level: u8,
    background_color: String,
    text_color: String,
    font_size: f64,
    font_weight: String,
    text_align: String,
    border_radius: f64,
    rotation: f64,
    opacity: f64,
    z_index: i64,
    record_key: String,
}

impl Block {
    pub fn position(&self) -> (f64, f64) {
        (self.x.unwrap_or(0.0), self.y.unwrap_or(0.0))
    }

    pub fn size(&self) -> (f64, f64) {
        let (w, h) = self.kind.default_size();
        (self.width.unwrap_or(w), self.height.unwrap_or(h))
    }

    pub fn layer(&self) -> i64 {
        self.z_index.unwrap_or(0)
    }

    /// Fill in whatever layout the stored record left out. `index` is the
    /// block's position in the page structure and staggers blocks vertically.
    pub fn with_layout_defaults(mut self, index: usize) -> Self {
        let heading = self.kind == BlockKind::Heading;
        let (w, h) = self.kind.stored_default_size();
        self.x.get_or_insert(50.0);
        self.y.get_or_insert(50.0 + index as f64 * 120.0);
        self.width.get_or_insert(w);
        self.height.get_or_insert(h);
        self.background_color
            .get_or_insert_with(|| "transparent".to_string());
        self.text_color.get_or_insert_with(|| "#000000".to_string());
        self.font_size.get_or_insert(if heading { 32.0 } else { 16.0 });
        self.font_weight
            .get_or_insert_with(|| if heading { "bold" } else { "normal" }.to_string());
        self.text_align.get_or_insert_with(|| "left".to_string());
        self.border_radius.get_or_insert(0.0);
        self.rotation.get_or_insert(0.0);
        self.opacity.get_or_insert(100.0);
        self.z_index.get_or_insert(index as i64);
        self
    }

    /// Inline CSS placing the block's frame on the canvas.
    pub fn frame_style(&self) -> String {
        let (x, y) = self.position();
        let (w, h) = self.size();
        format!(
            "position: absolute; left: {x}px; top: {y}px; width: {w}px; height: {h}px; \
             transform: rotate({}deg); opacity: {}; z-index: {};",
            self.rotation.unwrap_or(0.0),
            self.opacity.unwrap_or(100.0) / 100.0,
            self.layer(),
        )
    }

    /// Inline CSS for the block's text and fill.
    pub fn content_style(&self) -> String {
        let mut style = String::new();
        let mut push = |property: &str, value: Option<String>| {
            if let Some(value) = value {
                style.push_str(&format!("{property}: {value}; "));
            }
        };
        push("color", self.text_color.clone());
        push("font-size", self.font_size.map(|s| format!("{s}px")));
        push("font-weight", self.font_weight.clone());
        push("text-align", self.text_align.clone());
        push("background-color", self.background_color.clone());
        push("border-radius", self.border_radius.map(|r| format!("{r}px")));
        style.trim_end().to_string()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub structure: Vec<Block>,
    /// Optimistic concurrency token, bumped on every structure write.
    #[serde(default, deserialize_with = "null_as_default")]
    pub revision: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Page {
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.structure.iter().find(|b| b.id == id)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub id: String,
    pub key: String,
    pub lang: String,
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unknown_fields_and_types_survive() {
        let raw = json!({
            "id": "b1",
            "type": "carousel",
            "x": 10.5,
            "content": "<p>hi</p>",
            "customFlag": true,
            "meta": {"nested": [1, 2]}
        });
        let block: Block = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(block.kind, BlockKind::Other("carousel".into()));
        assert_eq!(block.extra.get("customFlag"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn kinds_use_kebab_names() {
        let block: Block = serde_json::from_value(json!({"id": "a", "type": "inline-text"})).unwrap();
        assert_eq!(block.kind, BlockKind::InlineText);
        let out = serde_json::to_value(&block).unwrap();
        assert_eq!(out, json!({"id": "a", "type": "inline-text"}));
    }

    #[test]
    fn patch_is_a_shallow_merge() {
        let mut block = Block {
            id: "b".into(),
            kind: BlockKind::Shape,
            x: Some(1.0),
            y: Some(2.0),
            background_color: Some("#fff".into()),
            ..Default::default()
        };
        let patch = BlockPatch {
            x: Some(40.0),
            text_color: Some("#111".into()),
            ..Default::default()
        };
        patch.apply_to(&mut block);
        assert_eq!(block.position(), (40.0, 2.0));
        assert_eq!(block.background_color.as_deref(), Some("#fff"));
        assert_eq!(block.text_color.as_deref(), Some("#111"));
    }

    #[test]
    fn merged_patch_keeps_fields_of_both() {
        let mut first = BlockPatch {
            content: Some("a".into()),
            x: Some(1.0),
            ..Default::default()
        };
        first.merge(BlockPatch {
            x: Some(5.0),
            ..Default::default()
        });
        assert_eq!(first.content.as_deref(), Some("a"));
        assert_eq!(first.x, Some(5.0));
        assert!(!first.is_empty());
        assert!(BlockPatch::default().is_empty());
    }

    #[test]
    fn layout_defaults_keep_stored_zeroes() {
        let block: Block = serde_json::from_value(json!({
            "id": "h", "type": "heading", "x": 0, "opacity": 0, "zIndex": 0
        }))
        .unwrap();
        let block = block.with_layout_defaults(2);
        assert_eq!(block.x, Some(0.0));
        assert_eq!(block.y, Some(290.0));
        assert_eq!(block.size(), (600.0, 60.0));
        assert_eq!(block.opacity, Some(0.0));
        assert_eq!(block.z_index, Some(0));
        assert_eq!(block.font_weight.as_deref(), Some("bold"));
        assert_eq!(block.font_size, Some(32.0));
    }

    #[test]
    fn page_tolerates_null_structure() {
        let page: Page =
            serde_json::from_value(json!({"id": "p", "slug": "home", "structure": null})).unwrap();
        assert!(page.structure.is_empty());
        assert_eq!(page.revision, 0);
    }
}
