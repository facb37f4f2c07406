/// Tracks which inline text editor, if any, is in editing mode. At most one
/// is at any time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorSessions {
    active: Option<String>,
}

impl EditorSessions {
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }

    /// Grant editing to `id`, returning the editor that had to give it up.
    pub fn request_edit(&mut self, id: &str) -> Option<String> {
        if self.is_editing(id) {
            return None;
        }
        self.active.replace(id.to_string())
    }

    /// End `id`'s session. Ending a session that is not active does nothing.
    pub fn release(&mut self, id: &str) -> bool {
        if self.is_editing(id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn release_all(&mut self) -> Option<String> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requesting_evicts_the_previous_editor() {
        let mut sessions = EditorSessions::default();
        assert_eq!(sessions.request_edit("a"), None);
        assert_eq!(sessions.request_edit("a"), None);
        assert_eq!(sessions.request_edit("b"), Some("a".to_string()));
        assert!(sessions.is_editing("b"));
        assert!(!sessions.is_editing("a"));
    }

    #[test]
    fn stale_release_keeps_the_new_session() {
        let mut sessions = EditorSessions::default();
        sessions.request_edit("a");
        sessions.request_edit("b");
        assert!(!sessions.release("a"));
        assert_eq!(sessions.active(), Some("b"));
        assert!(sessions.release("b"));
        assert_eq!(sessions.release_all(), None);
    }
}
