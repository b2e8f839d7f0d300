//! Process-local note storage.
//!
//! A concurrent in-memory map; no persistence. Ownership checks live in the
//! handlers, so the store only deals in ids and whole notes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::model::{DEFAULT_VISIBILITY, Note, NoteDraft, NoteUpdate};
use crate::types::Subject;

pub struct NoteStore {
    notes: RwLock<HashMap<i64, Note>>,
    next_id: AtomicI64,
}

impl NoteStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a note owned by `author`.
    pub async fn create(&self, author: Subject, draft: NoteDraft) -> Note {
        let now = Utc::now();
        let note = Note {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            author,
            title: draft.title,
            content: draft.content,
            visibility: draft
                .visibility
                .unwrap_or_else(|| DEFAULT_VISIBILITY.to_string()),
            alert_at: draft.alert_at,
            created_at: now,
            updated_at: now,
        };

        self.notes.write().await.insert(note.id, note.clone());
        note
    }

    pub async fn get(&self, id: i64) -> Option<Note> {
        self.notes.read().await.get(&id).cloned()
    }

    /// All notes owned by `author`, newest first.
    pub async fn list_for_author(&self, author: &Subject) -> Vec<Note> {
        let notes = self.notes.read().await;
        let mut owned: Vec<Note> = notes
            .values()
            .filter(|note| &note.author == author)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        owned
    }

    /// Apply an update; title and content always, visibility and alert time
    /// only when the payload carries them. Returns the updated note, or
    /// `None` for an unknown id.
    pub async fn update(&self, id: i64, update: NoteUpdate) -> Option<Note> {
        let mut notes = self.notes.write().await;
        let note = notes.get_mut(&id)?;

        note.title = update.title;
        note.content = update.content;
        if let Some(visibility) = update.visibility {
            note.visibility = visibility;
        }
        if let Some(alert_at) = update.alert_at {
            note.alert_at = Some(alert_at);
        }
        note.updated_at = Utc::now();

        Some(note.clone())
    }

    /// Remove a note; returns whether it existed.
    pub async fn delete(&self, id: i64) -> bool {
        self.notes.write().await.remove(&id).is_some()
    }
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> NoteDraft {
        NoteDraft {
            title: title.to_string(),
            content: "content".to_string(),
            visibility: None,
            alert_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids_and_defaults() {
        let store = NoteStore::new();
        let first = store.create(Subject::new("1"), draft("a")).await;
        let second = store.create(Subject::new("1"), draft("b")).await;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.visibility, DEFAULT_VISIBILITY);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_list_for_author_is_scoped_and_newest_first() {
        let store = NoteStore::new();
        let alice = Subject::new("1");
        let bob = Subject::new("2");

        store.create(alice.clone(), draft("first")).await;
        store.create(bob.clone(), draft("other")).await;
        store.create(alice.clone(), draft("second")).await;

        let listed = store.list_for_author(&alice).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "second");
        assert_eq!(listed[1].title, "first");
    }

    #[tokio::test]
    async fn test_update_replaces_text_and_keeps_unset_fields() {
        let store = NoteStore::new();
        let created = store
            .create(
                Subject::new("1"),
                NoteDraft {
                    title: "t".to_string(),
                    content: "c".to_string(),
                    visibility: Some("shared".to_string()),
                    alert_at: None,
                },
            )
            .await;

        let updated = store
            .update(
                created.id,
                NoteUpdate {
                    title: "t2".to_string(),
                    content: "c2".to_string(),
                    visibility: None,
                    alert_at: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "t2");
        assert_eq!(updated.content, "c2");
        // Visibility was not in the payload, so it is preserved.
        assert_eq!(updated.visibility, "shared");
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_none() {
        let store = NoteStore::new();
        let result = store
            .update(
                99,
                NoteUpdate {
                    title: "t".to_string(),
                    content: "c".to_string(),
                    visibility: None,
                    alert_at: None,
                },
            )
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = NoteStore::new();
        let note = store.create(Subject::new("1"), draft("a")).await;

        assert!(store.delete(note.id).await);
        assert!(!store.delete(note.id).await);
        assert!(store.get(note.id).await.is_none());
    }
}
