//! View state for the SATCHEL dashboard.
//!
//! Everything here is plain data mutated on the event loop; background watch
//! tasks never touch it directly, they send events instead.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::api::types::{AskResponse, Document, DocumentStatus};
use crate::ask::AskForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
    Detail,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    created: Instant,
    ttl: Option<Duration>,
}

impl Notice {
    /// Auto-dismissing notice (success toasts).
    pub fn transient(text: impl Into<String>, kind: NoticeKind, ttl: Duration) -> Self {
        Self {
            text: text.into(),
            kind,
            created: Instant::now(),
            ttl: Some(ttl),
        }
    }

    /// Sticks until replaced or the view changes (errors).
    pub fn persistent(text: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created: Instant::now(),
            ttl: None,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(self.created) >= ttl,
            None => false,
        }
    }
}

#[derive(Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn push(&mut self, notice: Notice) {
        self.items.push(notice);
        // A handful at most; old ones scroll away.
        if self.items.len() > 4 {
            self.items.remove(0);
        }
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|notice| !notice.is_expired(now));
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub indexed: usize,
    pub indexing: usize,
    pub failed: usize,
}

/// The documents table. Each view owns its copy; polling results land via
/// id-replacement, never by mutating a shared list.
#[derive(Default)]
pub struct DocumentsState {
    pub docs: Vec<Document>,
    pub selected: usize,
}

impl DocumentsState {
    pub fn set_all(&mut self, docs: Vec<Document>) {
        self.docs = docs;
        if self.selected >= self.docs.len() {
            self.selected = self.docs.len().saturating_sub(1);
        }
    }

    /// Replace the row with the same id, or append when the document is new.
    pub fn upsert(&mut self, updated: Document) {
        match self.docs.iter_mut().find(|doc| doc.id == updated.id) {
            Some(slot) => *slot = updated,
            None => self.docs.push(updated),
        }
    }

    pub fn remove(&mut self, id: i64) {
        self.docs.retain(|doc| doc.id != id);
        if self.selected >= self.docs.len() {
            self.selected = self.docs.len().saturating_sub(1);
        }
    }

    pub fn selected_doc(&self) -> Option<&Document> {
        self.docs.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.docs.is_empty() && self.selected + 1 < self.docs.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.docs.len(),
            ..StatusCounts::default()
        };
        for doc in &self.docs {
            match doc.status {
                DocumentStatus::Indexed => counts.indexed += 1,
                DocumentStatus::Indexing => counts.indexing += 1,
                DocumentStatus::Failed => counts.failed += 1,
                DocumentStatus::Uploaded => {}
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

#[derive(Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: Option<LoginField>,
    pub error: Option<String>,
    pub busy: bool,
}

impl Default for LoginField {
    fn default() -> Self {
        LoginField::Username
    }
}

impl LoginForm {
    pub fn focused(&self) -> LoginField {
        self.focus.unwrap_or_default()
    }

    pub fn toggle_focus(&mut self) {
        self.focus = Some(match self.focused() {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        });
    }

    pub fn active_input(&mut self) -> &mut String {
        match self.focused() {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadField {
    Title,
    Path,
}

pub struct UploadForm {
    pub title: String,
    pub path: String,
    pub focus: UploadField,
    pub error: Option<String>,
    pub busy: bool,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            path: String::new(),
            focus: UploadField::Title,
            error: None,
            busy: false,
        }
    }
}

impl UploadForm {
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            UploadField::Title => UploadField::Path,
            UploadField::Path => UploadField::Title,
        };
    }

    pub fn active_input(&mut self) -> &mut String {
        match self.focus {
            UploadField::Title => &mut self.title,
            UploadField::Path => &mut self.path,
        }
    }
}

/// Pending delete confirmation.
pub struct ConfirmDelete {
    pub doc_id: i64,
    pub title: String,
}

pub struct DetailState {
    pub doc_id: i64,
    pub doc: Option<Document>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskFocus {
    Question,
    TopK,
    SearchAll,
    Picker,
    Explain,
}

impl AskFocus {
    pub fn next(self) -> Self {
        match self {
            AskFocus::Question => AskFocus::TopK,
            AskFocus::TopK => AskFocus::SearchAll,
            AskFocus::SearchAll => AskFocus::Picker,
            AskFocus::Picker => AskFocus::Explain,
            AskFocus::Explain => AskFocus::Question,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PickerItem {
    pub id: i64,
    pub title: String,
    pub checked: bool,
}

pub struct AskPanel {
    pub question: String,
    pub top_k_input: String,
    pub search_all: bool,
    pub explain: bool,
    pub picker: Vec<PickerItem>,
    pub picker_index: usize,
    pub focus: AskFocus,
    pub response: Option<AskResponse>,
    pub expanded_sources: HashSet<usize>,
    pub busy: bool,
}

impl Default for AskPanel {
    fn default() -> Self {
        Self {
            question: String::new(),
            top_k_input: String::new(),
            search_all: true,
            explain: false,
            picker: Vec::new(),
            picker_index: 0,
            focus: AskFocus::Question,
            response: None,
            expanded_sources: HashSet::new(),
            busy: false,
        }
    }
}

impl AskPanel {
    /// Only indexed documents are offered for scoping, matching what the
    /// server would actually search.
    pub fn set_documents(&mut self, docs: &[Document]) {
        let checked: HashSet<i64> = self
            .picker
            .iter()
            .filter(|item| item.checked)
            .map(|item| item.id)
            .collect();
        self.picker = docs
            .iter()
            .filter(|doc| doc.status == DocumentStatus::Indexed)
            .map(|doc| PickerItem {
                id: doc.id,
                title: doc.title.clone(),
                checked: checked.contains(&doc.id),
            })
            .collect();
        if self.picker_index >= self.picker.len() {
            self.picker_index = self.picker.len().saturating_sub(1);
        }
    }

    pub fn toggle_picked(&mut self) {
        if let Some(item) = self.picker.get_mut(self.picker_index) {
            item.checked = !item.checked;
        }
    }

    pub fn toggle_source(&mut self, index: usize) {
        if !self.expanded_sources.remove(&index) {
            self.expanded_sources.insert(index);
        }
    }

    /// Snapshot the panel into the shared form for validation + submission.
    pub fn to_form(&self) -> AskForm {
        AskForm {
            question: self.question.clone(),
            top_k: self.top_k_input.trim().parse().ok(),
            search_all: self.search_all,
            selected_docs: self
                .picker
                .iter()
                .filter(|item| item.checked)
                .map(|item| item.id)
                .collect(),
            explain: self.explain,
        }
    }
}
