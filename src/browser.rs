use crate::api::{Entry, EntryKind};
use crate::format;
use std::collections::VecDeque;

/// A request the driver must perform on behalf of the browser. Listing
/// fetches carry the sequence number the matching response must echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchListing { seq: u64, path: String },
    DeleteFile { id: i64 },
    DeleteFolder { path: String },
}

/// Metadata captured from an activated file row; never re-fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDetail {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub file_type: Option<String>,
    pub size: u64,
    pub md5: Option<String>,
    pub upload_date: String,
    pub tags: Vec<String>,
}

impl FileDetail {
    fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            file_type: entry.file_type.clone(),
            size: entry.size,
            md5: entry.md5.clone(),
            upload_date: entry.upload_date.clone(),
            tags: entry.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    File { id: i64, name: String },
    Folder { path: String },
}

/// Modal layer over the listing. While one is open it captures input, so a
/// delete prompt can never double as row activation.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    None,
    Detail(FileDetail),
    ConfirmDelete(DeleteTarget),
    Error(String),
}

pub struct Browser {
    pub path: String,
    pub entries: Vec<Entry>,
    pub selected: usize,
    pub overlay: Overlay,
    pub loading: bool,
    seq: u64,
    effects: VecDeque<Effect>,
}

impl Browser {
    pub fn new() -> Self {
        let mut browser = Self {
            path: "/".to_string(),
            entries: Vec::new(),
            selected: 0,
            overlay: Overlay::None,
            loading: false,
            seq: 0,
            effects: VecDeque::new(),
        };
        browser.open("/");
        browser
    }

    /// Navigate to a folder: issue a fresh listing fetch and close any open
    /// detail panel. Errors and confirmation prompts stay up until dismissed.
    pub fn open(&mut self, path: &str) {
        if matches!(self.overlay, Overlay::Detail(_)) {
            self.overlay = Overlay::None;
        }
        self.path = format::normalize_folder(path);
        self.selected = 0;
        self.loading = true;
        self.seq += 1;
        self.effects.push_back(Effect::FetchListing {
            seq: self.seq,
            path: self.path.clone(),
        });
    }

    /// Apply a listing response. A response that does not carry the latest
    /// issued sequence number lost the race to a newer navigation and is
    /// discarded.
    pub fn on_listing(&mut self, seq: u64, result: Result<Vec<Entry>, String>) {
        if seq != self.seq {
            return;
        }
        self.loading = false;
        match result {
            Ok(mut entries) => {
                entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
                self.entries = entries;
                if self.selected >= self.entries.len() {
                    self.selected = self.entries.len().saturating_sub(1);
                }
            }
            Err(message) => self.overlay = Overlay::Error(message),
        }
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.entries.get(self.selected)
    }

    /// Row activation: descend into a folder, inspect a file. The entry kind
    /// alone decides which.
    pub fn activate(&mut self) {
        if self.overlay != Overlay::None {
            return;
        }
        let Some(entry) = self.selected_entry().cloned() else {
            return;
        };
        match entry.kind {
            EntryKind::Folder => self.open(&entry.full_path),
            EntryKind::File => self.overlay = Overlay::Detail(FileDetail::from_entry(&entry)),
        }
    }

    /// Ask for confirmation before deleting the selected row, or the file
    /// shown in the detail panel when it is open.
    pub fn request_delete(&mut self) {
        let target = match &self.overlay {
            Overlay::None => match self.selected_entry() {
                Some(entry) => match entry.kind {
                    EntryKind::File => DeleteTarget::File {
                        id: entry.id,
                        name: entry.name.clone(),
                    },
                    EntryKind::Folder => DeleteTarget::Folder {
                        path: entry.full_path.clone(),
                    },
                },
                None => return,
            },
            Overlay::Detail(detail) => DeleteTarget::File {
                id: detail.id,
                name: detail.name.clone(),
            },
            _ => return,
        };
        self.overlay = Overlay::ConfirmDelete(target);
    }

    pub fn confirm_delete(&mut self) {
        let overlay = std::mem::replace(&mut self.overlay, Overlay::None);
        match overlay {
            Overlay::ConfirmDelete(DeleteTarget::File { id, .. }) => {
                self.loading = true;
                self.effects.push_back(Effect::DeleteFile { id });
            }
            Overlay::ConfirmDelete(DeleteTarget::Folder { path }) => {
                self.loading = true;
                self.effects.push_back(Effect::DeleteFolder { path });
            }
            other => self.overlay = other,
        }
    }

    /// Delete outcome: success refreshes the current listing exactly once;
    /// failure surfaces a dismissible error.
    pub fn on_delete_result(&mut self, result: Result<(), String>) {
        self.loading = false;
        match result {
            Ok(()) => {
                let path = self.path.clone();
                self.open(&path);
            }
            Err(message) => self.overlay = Overlay::Error(message),
        }
    }

    pub fn dismiss(&mut self) {
        self.overlay = Overlay::None;
    }

    pub fn refresh(&mut self) {
        let path = self.path.clone();
        self.open(&path);
    }

    pub fn go_parent(&mut self) {
        if self.overlay != Overlay::None || self.path == "/" {
            return;
        }
        let parent = format::parent_folder(&self.path);
        self.open(&parent);
    }

    /// Jump to the nth breadcrumb of the current path.
    pub fn go_crumb(&mut self, index: usize) {
        if self.overlay != Overlay::None {
            return;
        }
        let crumbs = format::breadcrumbs(&self.path);
        if let Some(crumb) = crumbs.get(index) {
            let target = crumb.target.clone();
            self.open(&target);
        }
    }

    pub fn breadcrumbs(&self) -> Vec<format::Crumb> {
        format::breadcrumbs(&self.path)
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn down(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        self.effects.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: i64, name: &str, full_path: &str) -> Entry {
        Entry {
            id,
            kind: EntryKind::Folder,
            name: name.to_string(),
            full_path: full_path.to_string(),
            upload_date: String::new(),
            file_type: None,
            size: 0,
            description: None,
            tags: Vec::new(),
            md5: None,
        }
    }

    fn file(id: i64, name: &str) -> Entry {
        Entry {
            id,
            kind: EntryKind::File,
            name: name.to_string(),
            full_path: format!("/{}", name),
            upload_date: "2024-06-01T10:00:00Z".to_string(),
            file_type: Some("text/plain".to_string()),
            size: 42,
            description: None,
            tags: Vec::new(),
            md5: Some("abc".to_string()),
        }
    }

    /// Drive a browser into a settled root listing.
    fn browser_with(entries: Vec<Entry>) -> Browser {
        let mut browser = Browser::new();
        let effects = browser.take_effects();
        assert_eq!(effects.len(), 1);
        let Effect::FetchListing { seq, .. } = effects[0].clone() else {
            panic!("expected initial fetch");
        };
        browser.on_listing(seq, Ok(entries));
        browser
    }

    fn latest_seq(effects: &[Effect]) -> u64 {
        match effects.last() {
            Some(Effect::FetchListing { seq, .. }) => *seq,
            other => panic!("expected fetch effect, got {:?}", other),
        }
    }

    #[test]
    fn test_new_fetches_root() {
        let mut browser = Browser::new();
        let effects = browser.take_effects();
        assert_eq!(
            effects,
            vec![Effect::FetchListing {
                seq: 1,
                path: "/".to_string()
            }]
        );
        assert!(browser.loading);
    }

    #[test]
    fn test_activate_folder_navigates_and_fetches() {
        let mut browser = browser_with(vec![folder(7, "a", "/a/"), file(1, "b.txt")]);
        browser.selected = 0;
        browser.activate();

        assert_eq!(browser.path, "/a/");
        let effects = browser.take_effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::FetchListing { path, .. } if path == "/a/"
        ));
    }

    #[test]
    fn test_activate_file_opens_detail_without_fetching() {
        let mut browser = browser_with(vec![folder(7, "a", "/a/"), file(1, "b.txt")]);
        browser.selected = 1;
        browser.activate();

        match &browser.overlay {
            Overlay::Detail(detail) => {
                assert_eq!(detail.id, 1);
                assert_eq!(detail.name, "b.txt");
                assert_eq!(detail.size, 42);
            }
            other => panic!("expected detail overlay, got {:?}", other),
        }
        assert!(browser.take_effects().is_empty());
        assert_eq!(browser.path, "/");
    }

    #[test]
    fn test_stale_listing_response_is_discarded() {
        let mut browser = browser_with(vec![]);
        browser.open("/a/");
        let first = latest_seq(&browser.take_effects());
        browser.open("/b/");
        let second = latest_seq(&browser.take_effects());
        assert!(second > first);

        // the slow response for /a/ arrives after we already left
        browser.on_listing(first, Ok(vec![file(9, "stale.txt")]));
        assert!(browser.entries.is_empty());
        assert!(browser.loading);

        browser.on_listing(second, Ok(vec![file(2, "fresh.txt")]));
        assert_eq!(browser.entries.len(), 1);
        assert_eq!(browser.entries[0].id, 2);
        assert!(!browser.loading);
    }

    #[test]
    fn test_delete_file_refreshes_current_path_once() {
        let mut browser = browser_with(vec![file(1, "b.txt")]);
        browser.request_delete();
        assert!(matches!(
            browser.overlay,
            Overlay::ConfirmDelete(DeleteTarget::File { id: 1, .. })
        ));

        browser.confirm_delete();
        assert_eq!(browser.take_effects(), vec![Effect::DeleteFile { id: 1 }]);

        browser.on_delete_result(Ok(()));
        let effects = browser.take_effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::FetchListing { path, .. } if path == "/"
        ));
    }

    #[test]
    fn test_delete_folder_targets_full_path() {
        let mut browser = browser_with(vec![folder(7, "a", "/a/")]);
        browser.request_delete();
        browser.confirm_delete();
        assert_eq!(
            browser.take_effects(),
            vec![Effect::DeleteFolder {
                path: "/a/".to_string()
            }]
        );
    }

    #[test]
    fn test_cancel_delete_issues_nothing() {
        let mut browser = browser_with(vec![file(1, "b.txt")]);
        browser.request_delete();
        browser.dismiss();
        assert_eq!(browser.overlay, Overlay::None);
        assert!(browser.take_effects().is_empty());
    }

    #[test]
    fn test_detail_delete_refreshes_parent_listing() {
        let mut browser = browser_with(vec![file(4, "doc.md")]);
        browser.activate();
        assert!(matches!(browser.overlay, Overlay::Detail(_)));

        browser.request_delete();
        assert!(matches!(
            browser.overlay,
            Overlay::ConfirmDelete(DeleteTarget::File { id: 4, .. })
        ));

        browser.confirm_delete();
        assert_eq!(browser.take_effects(), vec![Effect::DeleteFile { id: 4 }]);

        browser.on_delete_result(Ok(()));
        let effects = browser.take_effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::FetchListing { path, .. } if path == "/"
        ));
    }

    #[test]
    fn test_listing_failure_surfaces_dismissible_error() {
        let mut browser = Browser::new();
        let seq = latest_seq(&browser.take_effects());
        browser.on_listing(seq, Err("connection refused".to_string()));

        assert_eq!(
            browser.overlay,
            Overlay::Error("connection refused".to_string())
        );
        browser.dismiss();
        assert_eq!(browser.overlay, Overlay::None);
    }

    #[test]
    fn test_delete_failure_surfaces_error() {
        let mut browser = browser_with(vec![file(1, "b.txt")]);
        browser.request_delete();
        browser.confirm_delete();
        browser.take_effects();

        browser.on_delete_result(Err("server returned 500".to_string()));
        assert!(matches!(browser.overlay, Overlay::Error(_)));
        assert!(browser.take_effects().is_empty());
    }

    #[test]
    fn test_listing_sorted_by_name() {
        let browser = browser_with(vec![
            file(1, "zeta.txt"),
            folder(2, "Alpha", "/Alpha/"),
            file(3, "beta.txt"),
        ]);
        let names: Vec<&str> = browser.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta.txt", "zeta.txt"]);
    }

    #[test]
    fn test_go_parent_and_crumbs() {
        let mut browser = browser_with(vec![]);
        browser.open("/a/b/");
        browser.take_effects();

        browser.go_parent();
        assert_eq!(browser.path, "/a/");

        browser.go_crumb(0);
        assert_eq!(browser.path, "/");
        // crumb index past the end is ignored
        browser.go_crumb(5);
        assert_eq!(browser.path, "/");
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut browser = browser_with(vec![file(1, "a"), file(2, "b")]);
        browser.down();
        assert_eq!(browser.selected, 1);
        browser.down();
        assert_eq!(browser.selected, 1);
        browser.up();
        browser.up();
        assert_eq!(browser.selected, 0);
    }
}
