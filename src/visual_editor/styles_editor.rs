use dioxus::prelude::*;
use std::collections::HashMap;

use super::component::{update_and_persist, EditorContext, EDITOR_STATE};
use crate::block::{Block, BlockPatch};

pub const TEXT_ALIGNMENTS: [&str; 4] = ["left", "center", "right", "justify"];

/// Layout and style properties editable from the side panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleField {
    X,
    Y,
    Width,
    Height,
    Rotation,
    Opacity,
    FontSize,
    FontWeight,
    TextAlign,
    TextColor,
    BackgroundColor,
    BorderRadius,
}

/// Unsaved edits for one element, keyed by field.
pub type StyleEdits = HashMap<StyleField, String>;

// Unsaved style edits per element
pub static STYLE_EDIT_BUFFER: GlobalSignal<HashMap<String, StyleEdits>> = Signal::global(HashMap::new);

impl StyleField {
    pub const ALL: [StyleField; 12] = [
        StyleField::X,
        StyleField::Y,
        StyleField::Width,
        StyleField::Height,
        StyleField::Rotation,
        StyleField::Opacity,
        StyleField::FontSize,
        StyleField::FontWeight,
        StyleField::TextAlign,
        StyleField::TextColor,
        StyleField::BackgroundColor,
        StyleField::BorderRadius,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StyleField::X => "X",
            StyleField::Y => "Y",
            StyleField::Width => "Width",
            StyleField::Height => "Height",
            StyleField::Rotation => "Rotation (deg)",
            StyleField::Opacity => "Opacity (%)",
            StyleField::FontSize => "Font size",
            StyleField::FontWeight => "Font weight",
            StyleField::TextAlign => "Text align",
            StyleField::TextColor => "Text color",
            StyleField::BackgroundColor => "Background",
            StyleField::BorderRadius => "Border radius",
        }
    }

    /// Current value as shown in the input.
    pub fn read(self, block: &Block) -> String {
        let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        match self {
            StyleField::X => block.position().0.to_string(),
            StyleField::Y => block.position().1.to_string(),
            StyleField::Width => block.size().0.to_string(),
            StyleField::Height => block.size().1.to_string(),
            StyleField::Rotation => number(block.rotation),
            StyleField::Opacity => number(block.opacity),
            StyleField::FontSize => number(block.font_size),
            StyleField::FontWeight => block.font_weight.clone().unwrap_or_default(),
            StyleField::TextAlign => block.text_align.clone().unwrap_or_default(),
            StyleField::TextColor => block.text_color.clone().unwrap_or_default(),
            StyleField::BackgroundColor => block.background_color.clone().unwrap_or_default(),
            StyleField::BorderRadius => number(block.border_radius),
        }
    }

    /// Parse `value` into `patch`. Blank input leaves the field untouched.
    pub fn write(self, patch: &mut BlockPatch, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }
        let number = || -> Result<f64, String> {
            value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| format!("{} must be a number", self.label()))
        };
        match self {
            StyleField::X => patch.x = Some(number()?),
            StyleField::Y => patch.y = Some(number()?),
            StyleField::Width => patch.width = Some(number()?.max(1.0)),
            StyleField::Height => patch.height = Some(number()?.max(1.0)),
            StyleField::Rotation => patch.rotation = Some(number()?.rem_euclid(360.0)),
            StyleField::Opacity => patch.opacity = Some(number()?.clamp(0.0, 100.0)),
            StyleField::FontSize => patch.font_size = Some(number()?.max(1.0)),
            StyleField::BorderRadius => patch.border_radius = Some(number()?.max(0.0)),
            StyleField::FontWeight => patch.font_weight = Some(value.to_string()),
            StyleField::TextAlign => {
                let align = value.to_ascii_lowercase();
                if !TEXT_ALIGNMENTS.contains(&align.as_str()) {
                    return Err(format!("Text align must be one of {}", TEXT_ALIGNMENTS.join(", ")));
                }
                patch.text_align = Some(align);
            }
            StyleField::TextColor => patch.text_color = Some(value.to_string()),
            StyleField::BackgroundColor => patch.background_color = Some(value.to_string()),
        }
        Ok(())
    }
}

/// Patch holding only the fields whose edited value differs from `block`.
pub fn patch_from_edits(block: &Block, edits: &StyleEdits) -> Result<BlockPatch, String> {
    let mut patch = BlockPatch::default();
    for field in StyleField::ALL {
        let Some(edited) = edits.get(&field) else {
            continue;
        };
        if edited.trim() == field.read(block) {
            continue;
        }
        field.write(&mut patch, edited)?;
    }
    Ok(patch)
}

#[component]
pub fn StyleInput(element_id: String) -> Element {
    let context = use_context::<EditorContext>();
    let mut error = use_signal(|| None::<String>);
    let state = EDITOR_STATE.read();
    let Some(element) = state.get(&element_id) else {
        return rsx!(div { "Element not found" });
    };

    let edits = STYLE_EDIT_BUFFER.read().get(&element_id).cloned().unwrap_or_default();
    let rows: Vec<(StyleField, String)> = StyleField::ALL
        .into_iter()
        .map(|field| {
            let value = edits.get(&field).cloned().unwrap_or_else(|| field.read(element));
            (field, value)
        })
        .collect();

    let save_id = element_id.clone();
    let cancel_id = element_id.clone();

    rsx! {
        div {
            class: "styles-editor",
            style: "display:flex;flex-direction:column;gap:6px;padding-inline:12px;",

            {rows.into_iter().map(|(field, value)| {
                let label = field.label();
                let id = element_id.clone();
                rsx! {
                    div {
                        key: "{label}",
                        style: "display:flex;justify-content:space-between;gap:8px;",
                        label { "{label}" }
                        input {
                            value: "{value}",
                            oninput: move |e| {
                                STYLE_EDIT_BUFFER
                                    .write()
                                    .entry(id.clone())
                                    .or_default()
                                    .insert(field, e.value());
                            }
                        }
                    }
                }
            })}

            if let Some(message) = error() {
                div { style: "color: #b91c1c; font-size: 12px;", "{message}" }
            }

            div { style: "margin-top: 8px; display:flex; gap:8px;",
                button {
                    onclick: move |_| {
                        let edits = STYLE_EDIT_BUFFER.read().get(&save_id).cloned().unwrap_or_default();
                        let Some(block) = EDITOR_STATE.read().get(&save_id).cloned() else {
                            return;
                        };
                        match patch_from_edits(&block, &edits) {
                            Ok(patch) => {
                                if !patch.is_empty() {
                                    update_and_persist(&context, &save_id, patch);
                                }
                                STYLE_EDIT_BUFFER.write().remove(&save_id);
                                error.set(None);
                            }
                            Err(message) => error.set(Some(message)),
                        }
                    },
                    "Save"
                }

                button {
                    onclick: move |_| {
                        STYLE_EDIT_BUFFER.write().remove(&cancel_id);
                        error.set(None);
                    },
                    "Cancel"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;
    use pretty_assertions::assert_eq;

    fn heading() -> Block {
        Block {
            id: "b1".into(),
            kind: BlockKind::Heading,
            ..Default::default()
        }
        .with_layout_defaults(0)
    }

    fn edits(pairs: &[(StyleField, &str)]) -> StyleEdits {
        pairs.iter().map(|(f, v)| (*f, v.to_string())).collect()
    }

    #[test]
    fn unchanged_values_stay_out_of_the_patch() {
        let block = heading();
        let patch = patch_from_edits(
            &block,
            &edits(&[(StyleField::X, "50"), (StyleField::Width, "640"), (StyleField::TextColor, "#000000")]),
        )
        .unwrap();
        assert_eq!(
            patch,
            BlockPatch {
                width: Some(640.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn numbers_are_clamped_into_range() {
        let mut patch = BlockPatch::default();
        StyleField::Opacity.write(&mut patch, "140").unwrap();
        StyleField::Rotation.write(&mut patch, "-90").unwrap();
        StyleField::Height.write(&mut patch, "0").unwrap();
        StyleField::BorderRadius.write(&mut patch, "-4").unwrap();
        assert_eq!(patch.opacity, Some(100.0));
        assert_eq!(patch.rotation, Some(270.0));
        assert_eq!(patch.height, Some(1.0));
        assert_eq!(patch.border_radius, Some(0.0));
    }

    #[test]
    fn bad_input_is_rejected_with_the_field_name() {
        let block = heading();
        let err = patch_from_edits(&block, &edits(&[(StyleField::FontSize, "big")])).unwrap_err();
        assert_eq!(err, "Font size must be a number");
        let err = patch_from_edits(&block, &edits(&[(StyleField::TextAlign, "middle")])).unwrap_err();
        assert!(err.starts_with("Text align must be one of"));
    }

    #[test]
    fn blank_input_changes_nothing() {
        let block = heading();
        let patch = patch_from_edits(&block, &edits(&[(StyleField::Opacity, "  ")])).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn alignment_is_normalised() {
        let mut patch = BlockPatch::default();
        StyleField::TextAlign.write(&mut patch, "Center").unwrap();
        assert_eq!(patch.text_align.as_deref(), Some("center"));
    }
}
