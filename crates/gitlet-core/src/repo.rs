//! Repository — the main entry point for gitlet operations.
//!
//! A `Repository` ties together the object store, the persisted state
//! aggregate, and the working directory, and implements every command:
//! staging, committing, history walks, checkout, reset, branching, and
//! merge. Object-store writes are content-addressed and idempotent;
//! the state aggregate is rewritten as a whole by every mutating
//! command, making it the single commit point.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::error::{GitletError, GitletResult};
use crate::fsutil::{atomic_write, plain_filenames, restricted_delete};
use crate::hash::sha1_hex;
use crate::lock::RepoLock;
use crate::merge::{self, MergeOutcome};
use crate::object::ObjectStore;

/// The `.gitlet` directory name.
const GITLET_DIR: &str = ".gitlet";

/// The state aggregate's file name inside `.gitlet/`.
const REPO_FILE: &str = "repo";

/// Branch created by `init`.
const MASTER: &str = "master";

/// Author recorded on commits until the `author` command changes it.
const DEFAULT_AUTHOR: &str = "Default author";

/// The persisted repository aggregate, stored as `.gitlet/repo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoState {
    /// Branch name to head commit id, ordered by name.
    pub heads: BTreeMap<String, String>,
    /// Branch name to the commit the branch was created at. Advisory;
    /// the authoritative split point is computed over the DAG.
    pub split_points: BTreeMap<String, String>,
    /// Current commit id. Always equals `heads[on_branch]`.
    pub head_pointer: String,
    /// Current branch name.
    pub on_branch: String,
    /// Staged additions: filename to blob id, ordered.
    pub staging_add: BTreeMap<String, String>,
    /// Staged removals.
    pub staging_rm: BTreeSet<String>,
    /// Every commit id ever created, newest first.
    pub all_commits: Vec<String>,
    /// Author recorded on new commits.
    pub author: String,
}

/// A gitlet repository: a working directory plus its `.gitlet/` state.
pub struct Repository {
    /// Root of the working directory.
    root: PathBuf,
    /// Path to `.gitlet/`.
    gitlet_dir: PathBuf,
    /// Content-addressed object storage.
    objects: ObjectStore,
    /// The persisted aggregate.
    state: RepoState,
    /// The current head commit, rehydrated from the store on load.
    head_commit: Commit,
}

impl Repository {
    /// Lock timeout for mutating commands.
    const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Initialize a repository in `root`.
    ///
    /// Creates `.gitlet/` and `.gitlet/objects/`, stores the initial
    /// commit, and points a fresh `master` at it.
    pub fn init(root: &Path) -> GitletResult<Repository> {
        let gitlet_dir = root.join(GITLET_DIR);
        if gitlet_dir.exists() {
            return Err(GitletError::AlreadyInitialized);
        }
        let objects_dir = gitlet_dir.join("objects");
        fs::create_dir_all(&objects_dir)?;
        let objects = ObjectStore::new(&objects_dir);

        let initial = Commit::initial(DEFAULT_AUTHOR);
        let initial_id = objects.store_commit(&initial)?;

        let state = RepoState {
            heads: BTreeMap::from([(MASTER.to_string(), initial_id.clone())]),
            split_points: BTreeMap::new(),
            head_pointer: initial_id.clone(),
            on_branch: MASTER.to_string(),
            staging_add: BTreeMap::new(),
            staging_rm: BTreeSet::new(),
            all_commits: vec![initial_id],
            author: DEFAULT_AUTHOR.to_string(),
        };

        let repo = Repository {
            root: root.to_path_buf(),
            gitlet_dir,
            objects,
            state,
            head_commit: initial,
        };
        repo.save()?;
        Ok(repo)
    }

    /// Load the repository rooted at `root`.
    pub fn load(root: &Path) -> GitletResult<Repository> {
        let gitlet_dir = root.join(GITLET_DIR);
        let repo_file = gitlet_dir.join(REPO_FILE);
        if !gitlet_dir.exists() || !repo_file.exists() {
            return Err(GitletError::NotInitialized);
        }
        let data = fs::read(&repo_file)?;
        let state: RepoState = serde_json::from_slice(&data)?;
        let objects = ObjectStore::new(&gitlet_dir.join("objects"));
        let head_commit = objects.load_commit(&state.head_pointer)?;
        Ok(Repository {
            root: root.to_path_buf(),
            gitlet_dir,
            objects,
            state,
            head_commit,
        })
    }

    /// Persist the state aggregate. Every mutating command ends here;
    /// bailing out earlier leaves the previous state untouched.
    fn save(&self) -> GitletResult<()> {
        let json = serde_json::to_vec(&self.state)?;
        atomic_write(&self.gitlet_dir.join(REPO_FILE), &json)?;
        Ok(())
    }

    fn lock(&self) -> GitletResult<RepoLock> {
        RepoLock::acquire(&self.gitlet_dir, Self::LOCK_TIMEOUT)
    }

    /// The current head commit.
    pub fn head_commit(&self) -> &Commit {
        &self.head_commit
    }

    /// The current branch name.
    pub fn current_branch(&self) -> &str {
        &self.state.on_branch
    }

    // -------------------------------------------------------------------
    // Staging
    // -------------------------------------------------------------------

    /// Stage a working-directory file for addition.
    pub fn add(&mut self, file_name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        self.add_inner(file_name)?;
        self.save()
    }

    /// `add` without locking or saving. Shared with the merge engine,
    /// which stages conflict files through the same rules.
    fn add_inner(&mut self, file_name: &str) -> GitletResult<()> {
        let path = self.root.join(file_name);
        if !path.is_file() {
            return Err(GitletError::FileDoesNotExist);
        }
        let data = fs::read(&path)?;
        let blob_id = sha1_hex(&data);

        if self.state.staging_rm.remove(file_name) {
            // Re-adding a file staged for removal only cancels the removal.
        } else if self.head_commit.blob_id(file_name) == Some(blob_id.as_str()) {
            // Working copy matches the head version: nothing to stage.
            self.state.staging_add.remove(file_name);
            return Ok(());
        } else {
            self.state
                .staging_add
                .insert(file_name.to_string(), blob_id);
        }
        self.objects.store_bytes(&data)?;
        Ok(())
    }

    /// Unstage a file, or stage a tracked file for removal (deleting
    /// its working copy if still present).
    pub fn remove(&mut self, file_name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let disk_id = self.working_blob_id(file_name)?;
        let staged_id = self.state.staging_add.get(file_name).cloned();
        let head_id = self.head_commit.blob_id(file_name).map(String::from);

        match disk_id {
            None => {
                if head_id.is_none() {
                    return Err(GitletError::FileDoesNotExist);
                }
                // Tracked but already deleted from the working tree.
                self.state.staging_add.remove(file_name);
                self.state.staging_rm.insert(file_name.to_string());
            }
            Some(ref id) if staged_id.as_deref() == Some(id.as_str()) => {
                self.state.staging_add.remove(file_name);
            }
            Some(ref id) if head_id.as_deref() == Some(id.as_str()) => {
                self.state.staging_rm.insert(file_name.to_string());
                restricted_delete(&self.root, file_name)?;
            }
            Some(_) => return Err(GitletError::NoReasonToRemove),
        }
        self.save()
    }

    // -------------------------------------------------------------------
    // Commit
    // -------------------------------------------------------------------

    /// Create a commit from the staging area.
    pub fn commit(&mut self, message: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let parents = vec![Some(self.state.head_pointer.clone())];
        self.commit_inner(message, parents)?;
        self.save()
    }

    /// Shared commit path for normal and merge commits: derive the new
    /// tree from the head tree and the staging area, store the commit,
    /// advance the branch, clear staging.
    fn commit_inner(&mut self, message: &str, parents: Vec<Option<String>>) -> GitletResult<()> {
        if self.state.staging_add.is_empty() && self.state.staging_rm.is_empty() {
            return Err(GitletError::NothingStaged);
        }
        let mut tree = self.head_commit.tree.clone();
        for (name, blob_id) in &self.state.staging_add {
            tree.insert(name.clone(), blob_id.clone());
        }
        for name in &self.state.staging_rm {
            tree.remove(name);
        }

        let new_commit = Commit::new(&self.state.author, parents, message, tree);
        let new_id = self.objects.store_commit(&new_commit)?;

        self.state
            .heads
            .insert(self.state.on_branch.clone(), new_id.clone());
        self.state.head_pointer = new_id.clone();
        self.head_commit = new_commit;
        self.state.staging_add.clear();
        self.state.staging_rm.clear();
        self.state.all_commits.insert(0, new_id);
        Ok(())
    }

    // -------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------

    /// The `log` output: a first-parent walk from the head commit.
    /// Second parents of merge commits are not followed.
    pub fn log(&self) -> GitletResult<String> {
        let mut out = String::new();
        let mut current = Some(self.state.head_pointer.clone());
        while let Some(id) = current {
            let commit = self.objects.load_commit(&id)?;
            push_log_entry(&mut out, &id, &commit);
            current = commit.first_parent().map(String::from);
        }
        out.pop();
        Ok(out)
    }

    /// The `global-log` output: every commit ever made, newest first.
    pub fn global_log(&self) -> GitletResult<String> {
        let mut out = String::new();
        for id in &self.state.all_commits {
            let commit = self.objects.load_commit(id)?;
            push_log_entry(&mut out, id, &commit);
        }
        out.pop();
        Ok(out)
    }

    /// Ids of commits whose message contains `keyword`, newest first.
    pub fn find(&self, keyword: &str) -> GitletResult<Vec<String>> {
        let mut matches = Vec::new();
        for id in &self.state.all_commits {
            let commit = self.objects.load_commit(id)?;
            if commit.message.contains(keyword) {
                matches.push(id.clone());
            }
        }
        if matches.is_empty() {
            return Err(GitletError::NoCommitWithMessage);
        }
        Ok(matches)
    }

    /// The `status` output: branches (current starred), staged and
    /// removed files, and the two trailing header-only sections.
    pub fn status(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Branches ===\n");
        for name in self.state.heads.keys() {
            if *name == self.state.on_branch {
                out.push('*');
            }
            out.push_str(name);
            out.push('\n');
        }
        out.push_str("\n=== Staged Files ===\n");
        for name in self.state.staging_add.keys() {
            out.push_str(name);
            out.push('\n');
        }
        out.push_str("\n=== Removed Files ===\n");
        for name in &self.state.staging_rm {
            out.push_str(name);
            out.push('\n');
        }
        out.push_str("\n=== Modifications Not Staged For Commit ===\n");
        out.push_str("\n=== Untracked Files ===\n");
        out
    }

    // -------------------------------------------------------------------
    // Checkout and reset
    // -------------------------------------------------------------------

    /// `checkout -- <file>`: restore a file from the head commit.
    /// Staging and HEAD are untouched.
    pub fn checkout_file_at_head(&self, file_name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        self.checkout_file_from_tree(file_name, &self.head_commit.tree)
    }

    /// `checkout <id> -- <file>`: restore a file from the named commit
    /// (the id may be abbreviated). Staging and HEAD are untouched.
    pub fn checkout_file_at_commit(&self, partial_id: &str, file_name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let full_id = self.objects.resolve_partial(partial_id)?;
        let commit = self.objects.load_commit(&full_id)?;
        self.checkout_file_from_tree(file_name, &commit.tree)
    }

    /// `checkout <branch>`: reconcile the working tree with the branch
    /// head and switch to it.
    pub fn checkout_branch(&mut self, branch: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let target_id = match self.state.heads.get(branch) {
            Some(id) => id.clone(),
            None => return Err(GitletError::NoSuchBranch),
        };
        if branch == self.state.on_branch {
            return Err(GitletError::CheckoutCurrentBranch);
        }
        self.reconcile_working_tree(&target_id)?;
        self.state.on_branch = branch.to_string();
        self.save()
    }

    /// `reset <id>`: reconcile the working tree with the named commit
    /// and move the current branch's head to it.
    pub fn reset(&mut self, partial_id: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let full_id = self.objects.resolve_partial(partial_id)?;
        if !self.objects.exists(&full_id) {
            return Err(GitletError::CommitNotFound);
        }
        self.reconcile_working_tree(&full_id)?;
        self.state
            .heads
            .insert(self.state.on_branch.clone(), full_id);
        self.save()
    }

    fn checkout_file_from_tree(
        &self,
        file_name: &str,
        tree: &BTreeMap<String, String>,
    ) -> GitletResult<()> {
        match tree.get(file_name) {
            Some(blob_id) => self.write_working_file(file_name, blob_id),
            None => Err(GitletError::FileNotInCommit),
        }
    }

    /// Point the working tree, head commit, and staging area at
    /// `target_id`: gate on untracked files, delete files the target
    /// does not track, write the target's tree.
    fn reconcile_working_tree(&mut self, target_id: &str) -> GitletResult<()> {
        let target = self.objects.load_commit(target_id)?;
        self.check_untracked_files(&target.tree)?;
        for name in self.head_commit.tree.keys() {
            if !target.tree.contains_key(name) {
                restricted_delete(&self.root, name)?;
            }
        }
        for (name, blob_id) in &target.tree {
            self.write_working_file(name, blob_id)?;
        }
        self.head_commit = target;
        self.state.head_pointer = target_id.to_string();
        self.state.staging_add.clear();
        self.state.staging_rm.clear();
        Ok(())
    }

    /// The untracked-safety gate: refuse to proceed when a working
    /// file the current head does not track would be overwritten by
    /// the target tree.
    fn check_untracked_files(&self, target_tree: &BTreeMap<String, String>) -> GitletResult<()> {
        for file in plain_filenames(&self.root)? {
            if !self.file_tracked_in_head(&file)? && target_tree.contains_key(&file) {
                return Err(GitletError::UntrackedFileInWay);
            }
        }
        Ok(())
    }

    /// True iff the working copy of `file_name` matches the blob the
    /// head commit records for it. A tracked file with modified
    /// contents counts as untracked for the safety gate.
    fn file_tracked_in_head(&self, file_name: &str) -> GitletResult<bool> {
        match (
            self.working_blob_id(file_name)?,
            self.head_commit.blob_id(file_name),
        ) {
            (Some(disk), Some(tracked)) => Ok(disk == tracked),
            _ => Ok(false),
        }
    }

    /// SHA-1 of the working copy of `file_name`, or `None` if absent.
    fn working_blob_id(&self, file_name: &str) -> GitletResult<Option<String>> {
        let path = self.root.join(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        Ok(Some(sha1_hex(&data)))
    }

    fn write_working_file(&self, file_name: &str, blob_id: &str) -> GitletResult<()> {
        let data = self.objects.load_blob(blob_id)?;
        fs::write(self.root.join(file_name), data)?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Branches
    // -------------------------------------------------------------------

    /// Create a branch at the current head. Does not switch to it.
    pub fn branch(&mut self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        if self.state.heads.contains_key(name) {
            return Err(GitletError::BranchExists);
        }
        let head = self.state.head_pointer.clone();
        self.state.split_points.insert(name.to_string(), head.clone());
        self.state.heads.insert(name.to_string(), head);
        self.save()
    }

    /// Delete a branch pointer. The commits it pointed at remain.
    pub fn rm_branch(&mut self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        if name == self.state.on_branch {
            return Err(GitletError::RemoveCurrentBranch);
        }
        if self.state.heads.remove(name).is_none() {
            return Err(GitletError::BranchMissing);
        }
        self.save()
    }

    /// Change the author recorded on future commits.
    pub fn set_author(&mut self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        self.state.author = name.to_string();
        self.save()
    }

    // -------------------------------------------------------------------
    // Merge
    // -------------------------------------------------------------------

    /// Merge `other_branch` into the current branch.
    ///
    /// Preconditions are checked in a fixed order so the first failing
    /// one wins: clean staging area, branch exists, distinct heads,
    /// other head not an ancestor. A current head equal to the split
    /// point fast-forwards instead of committing.
    pub fn merge(&mut self, other_branch: &str) -> GitletResult<MergeOutcome> {
        let _lock = self.lock()?;
        if !self.state.staging_add.is_empty() || !self.state.staging_rm.is_empty() {
            return Err(GitletError::UncommittedChanges);
        }
        let other_id = match self.state.heads.get(other_branch) {
            Some(id) => id.clone(),
            None => return Err(GitletError::BranchMissing),
        };
        let current_id = self.state.head_pointer.clone();
        if other_id == current_id {
            return Err(GitletError::MergeSelf);
        }
        // Every commit descends from the initial commit, so two
        // branches of one repository always share an ancestor.
        let split_id = match merge::find_split_point(&self.objects, &current_id, &other_id)? {
            Some(id) => id,
            None => return Err(GitletError::CommitNotFound),
        };
        if split_id == other_id {
            return Err(GitletError::MergeAncestor);
        }
        if split_id == current_id {
            self.reconcile_working_tree(&other_id)?;
            let current_branch = self.state.on_branch.clone();
            self.state.heads.insert(current_branch, other_id);
            self.save()?;
            return Ok(MergeOutcome::FastForwarded);
        }

        let current = self.head_commit.clone();
        let other = self.objects.load_commit(&other_id)?;
        let split = self.objects.load_commit(&split_id)?;
        self.check_untracked_files(&other.tree)?;
        let conflicted = self.merge_trees(&current, &other, &split)?;

        let message = format!("Merged {} into {}.", other_branch, self.state.on_branch);
        self.commit_inner(&message, vec![Some(current_id), Some(other_id)])?;
        self.save()?;
        Ok(MergeOutcome::Merged { conflicted })
    }

    /// The eight-case resolution over the three trees. Stages every
    /// change it makes; returns true if any conflict file was written.
    fn merge_trees(
        &mut self,
        current: &Commit,
        other: &Commit,
        split: &Commit,
    ) -> GitletResult<bool> {
        let mut conflict = false;
        let mut current_tree = current.tree.clone();
        let mut other_tree = other.tree.clone();

        // Files known at the split point.
        for (name, split_id) in &split.tree {
            let current_id = current_tree.remove(name);
            let other_id = other_tree.remove(name);
            let s = split_id.as_str();
            let c = current_id.as_deref();
            let o = other_id.as_deref();

            if c == Some(s) && o.is_none() {
                // Deleted in the other branch, untouched here: drop it.
                self.state.staging_rm.insert(name.clone());
                restricted_delete(&self.root, name)?;
            } else if c == Some(s) && o != c {
                // Modified only in the other branch: take theirs.
                if let Some(other_blob) = o {
                    self.write_working_file(name, other_blob)?;
                    self.state
                        .staging_add
                        .insert(name.clone(), other_blob.to_string());
                }
            } else if c != Some(s) && o != Some(s) {
                // Changed on both sides. Identical changes (including
                // both deletions) need nothing; different ones conflict.
                let current_content = match c {
                    Some(blob) if c != o => self.blob_string(blob)?,
                    _ => String::new(),
                };
                let other_content = match o {
                    Some(blob) if o != c => self.blob_string(blob)?,
                    _ => String::new(),
                };
                if current_content.is_empty() && other_content.is_empty() {
                    continue;
                }
                self.write_conflict_file(name, &current_content, &other_content)?;
                conflict = true;
            }
        }

        // Files unknown at the split point but present in the other
        // branch.
        for (name, other_id) in &other_tree {
            match current_tree.get(name) {
                None => {
                    // Created only in the other branch: take it.
                    self.write_working_file(name, other_id)?;
                    self.state
                        .staging_add
                        .insert(name.clone(), other_id.clone());
                }
                Some(current_id) if current_id == other_id => {}
                Some(current_id) => {
                    // Created on both sides with different content.
                    let current_content = self.blob_string(current_id)?;
                    let other_content = self.blob_string(other_id)?;
                    if current_content.is_empty() && other_content.is_empty() {
                        continue;
                    }
                    self.write_conflict_file(name, &current_content, &other_content)?;
                    conflict = true;
                }
            }
        }
        Ok(conflict)
    }

    /// Write a conflict file and stage it through the `add` rules.
    fn write_conflict_file(
        &mut self,
        file_name: &str,
        current: &str,
        other: &str,
    ) -> GitletResult<()> {
        let contents = merge::conflict_file_contents(current, other);
        fs::write(self.root.join(file_name), contents)?;
        self.add_inner(file_name)
    }

    /// A blob's content as text, for conflict synthesis.
    fn blob_string(&self, blob_id: &str) -> GitletResult<String> {
        Ok(String::from_utf8_lossy(&self.objects.load_blob(blob_id)?).into_owned())
    }
}

/// One log entry: the `===` header, id, optional merge row, date, and
/// message, followed by a blank line.
fn push_log_entry(out: &mut String, id: &str, commit: &Commit) {
    out.push_str(&format!(
        "===\ncommit {}\n{}Date: {}\n{}\n\n",
        id,
        commit.merge_parents_line(),
        commit.date,
        commit.message
    ));
}
