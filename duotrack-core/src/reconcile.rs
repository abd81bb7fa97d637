/// A locally editable copy of a remote field.
///
/// Snapshots of the document arrive whenever anyone writes to it, including the
/// echo of our own writes. [`SyncedField::reconcile`] only overwrites the local
/// buffer when the remote value actually changed since we last saw it, so a
/// half-typed note survives unrelated updates to the same document.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedField<T> {
    last_seen: T,
    local: T,
}

impl<T: Clone + PartialEq> SyncedField<T> {
    pub fn new(external: T) -> Self {
        Self {
            local: external.clone(),
            last_seen: external,
        }
    }

    pub fn local(&self) -> &T {
        &self.local
    }

    pub fn edit(&mut self, value: T) {
        self.local = value;
    }

    pub fn is_dirty(&self) -> bool {
        self.local != self.last_seen
    }

    /// Record the local buffer as what the store now holds.
    pub fn mark_saved(&mut self) {
        self.last_seen = self.local.clone();
    }

    /// Throw away local edits.
    pub fn revert(&mut self) {
        self.local = self.last_seen.clone();
    }

    /// Apply an incoming external value. Returns `true` if the local buffer was overwritten.
    pub fn reconcile(&mut self, incoming: &T) -> bool {
        if *incoming == self.last_seen {
            return false;
        }
        self.last_seen = incoming.clone();
        self.local = incoming.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::SyncedField;

    #[test]
    fn test_echo_keeps_edits() {
        let mut note = SyncedField::new(String::from("great soundtrack"));
        note.edit("great soundtrack, slow middle".into());
        assert!(note.is_dirty());

        /* someone rated the item; the note field came back unchanged */
        assert!(!note.reconcile(&"great soundtrack".to_string()));
        assert_eq!(note.local(), "great soundtrack, slow middle");
    }

    #[test]
    fn test_external_change_overwrites() {
        let mut note = SyncedField::new(String::new());
        note.edit("draft".into());
        assert!(note.reconcile(&"written on the other phone".to_string()));
        assert_eq!(note.local(), "written on the other phone");
        assert!(!note.is_dirty());
    }

    #[test]
    fn test_saved_echo() {
        let mut note = SyncedField::new(String::from("a"));
        note.edit("b".into());
        note.mark_saved();
        assert!(!note.reconcile(&"b".to_string()));
        assert_eq!(note.local(), "b");

        note.edit("c".into());
        note.revert();
        assert_eq!(note.local(), "b");
    }
}
