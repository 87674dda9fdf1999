//! Error types for gitlet operations.
//!
//! Gitlet's user-visible errors are a closed set of fixed messages. Each
//! such condition is its own variant, and the variant's `Display` output
//! is the exact message the CLI prints.

use std::fmt;
use std::io;

/// All possible gitlet errors.
#[derive(Debug)]
pub enum GitletError {
    /// `init` where a repository already exists.
    AlreadyInitialized,
    /// Any other command outside an initialized repository.
    NotInitialized,
    /// `add` of a missing file, or `rm` of a file that is neither on
    /// disk nor tracked.
    FileDoesNotExist,
    /// `commit` with an empty staging area.
    NothingStaged,
    /// `rm` of a file that is neither staged nor tracked at its current
    /// content.
    NoReasonToRemove,
    /// Commit lookup failed: unknown id, too-short prefix, or an object
    /// that is not a commit.
    CommitNotFound,
    /// Abbreviated commit id matching more than one stored object.
    AmbiguousCommitId(String),
    /// `checkout` of a file absent from the named commit.
    FileNotInCommit,
    /// `checkout` of an unknown branch.
    NoSuchBranch,
    /// `checkout` of the branch that is already current.
    CheckoutCurrentBranch,
    /// Reconciliation would overwrite an untracked working file.
    UntrackedFileInWay,
    /// `branch` with a name already taken.
    BranchExists,
    /// `rm-branch` or `merge` naming an unknown branch.
    BranchMissing,
    /// `rm-branch` of the current branch.
    RemoveCurrentBranch,
    /// `merge` with a non-empty staging area.
    UncommittedChanges,
    /// `merge` of a branch into itself.
    MergeSelf,
    /// `merge` of a branch whose head is an ancestor of the current head.
    MergeAncestor,
    /// `find` with no matching commit message.
    NoCommitWithMessage,
    /// A referenced blob is missing from the object store.
    ObjectMissing(String),
    /// Could not acquire the repository lock within the timeout.
    LockTimeout,
    /// An I/O error occurred.
    Io(io::Error),
    /// JSON serialization/deserialization failed.
    Json(serde_json::Error),
}

impl fmt::Display for GitletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitletError::AlreadyInitialized => write!(
                f,
                "A Gitlet version-control system already exists in the current directory."
            ),
            GitletError::NotInitialized => {
                write!(f, "Not in an initialized Gitlet directory.")
            }
            GitletError::FileDoesNotExist => write!(f, "File does not exist."),
            GitletError::NothingStaged => write!(f, "No changes added to the commit."),
            GitletError::NoReasonToRemove => write!(f, "No reason to remove the file."),
            GitletError::CommitNotFound => write!(f, "No commit with that id exists."),
            GitletError::AmbiguousCommitId(prefix) => {
                write!(f, "Ambiguous commit id: {prefix}.")
            }
            GitletError::FileNotInCommit => {
                write!(f, "File does not exist in that commit.")
            }
            GitletError::NoSuchBranch => write!(f, "No such branch exists."),
            GitletError::CheckoutCurrentBranch => {
                write!(f, "No need to checkout the current branch.")
            }
            GitletError::UntrackedFileInWay => write!(
                f,
                "There is an untracked file in the way; delete it, or add and commit it first."
            ),
            GitletError::BranchExists => {
                write!(f, "A branch with that name already exists.")
            }
            GitletError::BranchMissing => {
                write!(f, "A branch with that name does not exist.")
            }
            GitletError::RemoveCurrentBranch => {
                write!(f, "Cannot remove the current branch.")
            }
            GitletError::UncommittedChanges => write!(f, "You have uncommitted changes."),
            GitletError::MergeSelf => write!(f, "Cannot merge a branch with itself."),
            GitletError::MergeAncestor => {
                write!(f, "Given branch is an ancestor of the current branch.")
            }
            GitletError::NoCommitWithMessage => {
                write!(f, "Found no commit with that message.")
            }
            GitletError::ObjectMissing(id) => write!(f, "Missing object: {id}"),
            GitletError::LockTimeout => {
                write!(f, "Could not acquire the repository lock within the timeout.")
            }
            GitletError::Io(e) => write!(f, "I/O error: {e}"),
            GitletError::Json(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for GitletError {}

impl From<io::Error> for GitletError {
    fn from(e: io::Error) -> Self {
        GitletError::Io(e)
    }
}

impl From<serde_json::Error> for GitletError {
    fn from(e: serde_json::Error) -> Self {
        GitletError::Json(e)
    }
}

/// Convenience alias for Results in gitlet.
pub type GitletResult<T> = Result<T, GitletError>;
