pub mod canvas;
pub mod caret;
pub mod component;
pub mod inline_text;
pub mod markup;
pub mod session;
pub mod styles_editor;

pub use component::{reset_editor, EditorContext, VisualEditor, EDITOR_STATE};
