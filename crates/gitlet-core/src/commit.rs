//! Commit objects — immutable snapshot nodes in the history DAG.
//!
//! A commit records who made it, when, what it says, where it hangs in
//! the DAG, and a tree mapping filenames to blob ids. Its identity is
//! the SHA-1 of its canonical serialization, so two commits with
//! identical fields collapse to one stored object.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Commit date format: `EEE MMM dd HH:mm:ss yyyy Z` in the host zone,
/// e.g. `Thu Jan 01 00:00:00 1970 +0000`.
const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

/// Length of the abbreviated parent ids in the `Merge:` log row.
const SHORT_ID_LEN: usize = 7;

/// A commit record.
///
/// The declared field order is the canonical serialization order: the
/// commit id is the SHA-1 of the compact JSON encoding of this struct
/// (tree keys sorted by the `BTreeMap`, absent parent encoded as JSON
/// `null`), so reordering fields would change every id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    /// Repository author at the time of the commit.
    pub author: String,
    /// Preformatted commit date, captured once so the id is stable.
    pub date: String,
    /// Parent commit ids. One entry for normal commits (`None` only for
    /// the initial commit), two for merge commits.
    pub parents: Vec<Option<String>>,
    /// Commit message.
    pub message: String,
    /// Tracked files: filename to blob id, ordered by filename.
    pub tree: BTreeMap<String, String>,
}

impl Commit {
    /// Create a commit dated now.
    pub fn new(
        author: &str,
        parents: Vec<Option<String>>,
        message: &str,
        tree: BTreeMap<String, String>,
    ) -> Self {
        Commit {
            author: author.to_string(),
            date: format_date(Local::now()),
            parents,
            message: message.to_string(),
            tree,
        }
    }

    /// The initial commit: a single absent parent, an empty tree, and
    /// the Unix epoch formatted in the host zone.
    pub fn initial(author: &str) -> Self {
        Commit {
            author: author.to_string(),
            date: format_date(DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local)),
            parents: vec![None],
            message: "initial commit".to_string(),
            tree: BTreeMap::new(),
        }
    }

    /// True for merge commits (two parents).
    pub fn is_merge(&self) -> bool {
        self.parents.len() == 2
    }

    /// The first parent's id, absent only for the initial commit.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().and_then(|p| p.as_deref())
    }

    /// The second parent's id; `None` for non-merge commits.
    pub fn second_parent(&self) -> Option<&str> {
        self.parents.get(1).and_then(|p| p.as_deref())
    }

    /// The blob id recorded for `file_name`, if tracked.
    pub fn blob_id(&self, file_name: &str) -> Option<&str> {
        self.tree.get(file_name).map(String::as_str)
    }

    /// The `Merge: p1 p2` log row (abbreviated parent ids, trailing
    /// newline) for merge commits, or the empty string.
    pub fn merge_parents_line(&self) -> String {
        match (self.first_parent(), self.second_parent()) {
            (Some(p1), Some(p2)) => {
                format!("Merge: {} {}\n", &p1[..SHORT_ID_LEN], &p2[..SHORT_ID_LEN])
            }
            _ => String::new(),
        }
    }
}

/// Format an instant the way commit dates are recorded.
pub fn format_date(instant: DateTime<Local>) -> String {
    instant.format(DATE_FORMAT).to_string()
}
