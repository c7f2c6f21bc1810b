//! JSON-file note storage.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub done: bool,
}

/// Notes loaded from one file. Every mutation is written back immediately.
#[derive(Debug)]
pub struct NoteStore {
    path: PathBuf,
    notes: RefCell<Vec<Note>>,
}

impl NoteStore {
    /// Loads `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let notes = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("cannot read notes from {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("notes file {} is corrupt", path.display()))?
        } else {
            Vec::new()
        };
        tracing::debug!(path = %path.display(), "opened note store");
        Ok(Self {
            path,
            notes: RefCell::new(notes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.borrow().clone()
    }

    pub fn add(&self, text: String, tags: Vec<String>) -> anyhow::Result<Note> {
        let note = {
            let mut notes = self.notes.borrow_mut();
            let id = notes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
            let note = Note {
                id,
                text,
                tags,
                done: false,
            };
            notes.push(note.clone());
            note
        };
        self.save()?;
        Ok(note)
    }

    pub fn mark_done(&self, id: u64) -> anyhow::Result<()> {
        {
            let mut notes = self.notes.borrow_mut();
            let Some(note) = notes.iter_mut().find(|n| n.id == id) else {
                bail!("no note with id {}", id);
            };
            note.done = true;
        }
        self.save()
    }

    pub fn remove(&self, id: u64) -> anyhow::Result<Note> {
        let removed = {
            let mut notes = self.notes.borrow_mut();
            let Some(position) = notes.iter().position(|n| n.id == id) else {
                bail!("no note with id {}", id);
            };
            notes.remove(position)
        };
        self.save()?;
        Ok(removed)
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&*self.notes.borrow())?;
        fs::write(&self.path, raw)
            .with_context(|| format!("cannot write notes to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("notes.json")).unwrap();
        assert!(store.notes().is_empty());
    }

    #[test]
    fn test_mutations_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.json");
        let store = NoteStore::open(&path).unwrap();
        store.add("first".into(), vec![]).unwrap();
        let second = store.add("second".into(), vec!["work".into()]).unwrap();
        store.mark_done(second.id).unwrap();
        store.remove(1).unwrap();

        let reopened = NoteStore::open(&path).unwrap();
        assert_eq!(
            reopened.notes(),
            vec![Note {
                id: 2,
                text: "second".into(),
                tags: vec!["work".into()],
                done: true,
            }]
        );
    }

    #[test]
    fn test_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("notes.json")).unwrap();
        let err = store.remove(7).unwrap_err();
        assert_eq!(err.to_string(), "no note with id 7");
    }

    #[test]
    fn test_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "not json").unwrap();
        let err = NoteStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("is corrupt"), "{}", err);
    }
}
