//! Materializes a [`Plan`] onto the filesystem.
//!
//! Local cluster ids are offset into global folder names starting at the
//! caller's [`ClusterCursor`]. Single-cluster images are moved, multi-cluster
//! images are copied into every target and the original removed. Failures
//! are collected per operation and never abort the batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::FaceSortError;
use crate::error::{FileOp, OpFailure};
use crate::fs::FileSystem;
use crate::plan::{Plan, PlanItem};
use crate::progress::{scaled_percent, Progress};

/// Next unused global cluster id.
///
/// Owned by whoever sequences distributions; each call consumes it and
/// hands back the advanced value in [`DistributionResult::next_cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterCursor(u32);

impl ClusterCursor {
    pub fn new(start: u32) -> Self {
        Self(start)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the cursor `n` ids further on, or `None` past `u32::MAX`.
    fn advance(self, n: usize) -> Option<Self> {
        let n = u32::try_from(n).ok()?;
        self.0.checked_add(n).map(Self)
    }
}

impl Default for ClusterCursor {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for ClusterCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one [`Distributor::distribute`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionResult {
    /// Files moved into a single cluster folder.
    pub moved: usize,
    /// Copies made for multi-cluster files, one per target folder.
    pub copied: usize,
    /// Items whose source was gone or already in place.
    pub skipped: usize,
    /// Distinct clusters this plan used.
    pub clusters: usize,
    pub failures: Vec<OpFailure>,
    pub next_cursor: ClusterCursor,
}

/// Assigns global ids to the local ids referenced by `plan.items`, by rank.
///
/// Fails if the ids, or the cursor after them, would not fit in a `u32`.
pub fn global_ids(plan: &Plan, start: ClusterCursor) -> Result<BTreeMap<u32, u32>, FaceSortError> {
    allocate(plan, start).map(|(ids, _)| ids)
}

fn allocate(
    plan: &Plan,
    start: ClusterCursor,
) -> Result<(BTreeMap<u32, u32>, ClusterCursor), FaceSortError> {
    let used: BTreeSet<u32> = plan
        .items
        .iter()
        .flat_map(|item| item.clusters.iter().copied())
        .collect();
    let next = start
        .advance(used.len())
        .ok_or(FaceSortError::ClusterIdOverflow {
            start: start.get(),
            clusters: used.len(),
        })?;
    // Every id below `next` fits, so the offsets cannot overflow.
    let ids = used
        .into_iter()
        .enumerate()
        .map(|(rank, local)| (local, start.get() + rank as u32))
        .collect();
    Ok((ids, next))
}

/// Applies plans through a [`FileSystem`].
pub struct Distributor<'a> {
    fs: &'a dyn FileSystem,
    progress: &'a dyn Progress,
}

#[derive(Default)]
struct Tally {
    moved: usize,
    copied: usize,
    skipped: usize,
    failures: Vec<OpFailure>,
    moved_from: BTreeSet<PathBuf>,
    /// Destinations this run must not overwrite: plan sources and files
    /// already written.
    claimed: HashSet<PathBuf>,
}

impl Tally {
    fn fail(&mut self, path: &Path, op: FileOp, err: &io::Error) {
        let failure = OpFailure::new(path, op, err);
        tracing::warn!("{}", failure);
        self.failures.push(failure);
    }
}

impl<'a> Distributor<'a> {
    pub fn new(fs: &'a dyn FileSystem, progress: &'a dyn Progress) -> Self {
        Self { fs, progress }
    }

    /// Distributes `plan` into numbered folders under `base_dir`.
    ///
    /// Must not be called again for the same group until this call has
    /// returned its cursor. Fails only if the cluster ids would overflow,
    /// before any file is touched.
    pub fn distribute(
        &self,
        plan: &Plan,
        base_dir: &Path,
        start: ClusterCursor,
    ) -> Result<DistributionResult, FaceSortError> {
        let (ids, next_cursor) = allocate(plan, start)?;
        let total = plan.items.len();
        let mut tally = Tally {
            claimed: plan.items.iter().map(|item| item.path.clone()).collect(),
            ..Tally::default()
        };

        self.progress
            .notify(&format!("distributing {} files", total), 0);

        for (i, item) in plan.items.iter().enumerate() {
            let percent = scaled_percent(0, 100, i + 1, total);
            self.progress.notify(
                &format!("distributing files: {}% ({}/{})", percent, i + 1, total),
                percent,
            );

            if !self.fs.exists(&item.path) {
                tracing::debug!("skip missing source {}", item.path.display());
                tally.skipped += 1;
                continue;
            }
            let targets: Vec<u32> = item.clusters.iter().map(|c| ids[c]).collect();
            match targets.as_slice() {
                [] => tally.skipped += 1,
                [only] => self.move_item(item, base_dir, *only, &mut tally),
                _ => self.copy_item(item, base_dir, &targets, &mut tally),
            }
        }

        self.progress.notify("cleaning up empty folders", 100);
        self.cleanup(&tally.moved_from);

        tracing::info!(
            "distributed into {}: moved {}, copied {}, skipped {}, failed {}",
            base_dir.display(),
            tally.moved,
            tally.copied,
            tally.skipped,
            tally.failures.len()
        );

        Ok(DistributionResult {
            moved: tally.moved,
            copied: tally.copied,
            skipped: tally.skipped,
            clusters: ids.len(),
            failures: tally.failures,
            next_cursor,
        })
    }

    /// Resolves and creates the target path for `item` in cluster `id`.
    ///
    /// A target another plan item owns or already wrote in this run is
    /// reported as a failed `op` and yields `None`.
    fn target(
        &self,
        item: &PlanItem,
        base_dir: &Path,
        id: u32,
        op: FileOp,
        tally: &mut Tally,
    ) -> Option<PathBuf> {
        let name = item.path.file_name()?;
        let dir = base_dir.join(id.to_string());
        let dst = dir.join(name);
        if dst != item.path && tally.claimed.contains(&dst) {
            let err = io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("name taken by another file in this run ({})", item.path.display()),
            );
            tally.fail(&dst, op, &err);
            return None;
        }
        if let Err(e) = self.fs.create_dir_all(&dir) {
            tally.fail(&dir, FileOp::CreateDir, &e);
            return None;
        }
        Some(dst)
    }

    fn move_item(&self, item: &PlanItem, base_dir: &Path, id: u32, tally: &mut Tally) {
        let src = &item.path;
        let Some(dst) = self.target(item, base_dir, id, FileOp::Move, tally) else {
            return;
        };
        if dst == *src {
            tally.skipped += 1;
            return;
        }

        let moved = match self.fs.rename(src, &dst) {
            Ok(()) => {
                tally.claimed.insert(dst);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tally.fail(src, FileOp::Move, &e);
                false
            }
            Err(e) => {
                tracing::debug!("rename {} failed ({}), copying instead", src.display(), e);
                self.copy_then_delete(src, &dst, tally)
            }
        };

        if moved {
            tally.moved += 1;
            if let Some(parent) = src.parent() {
                tally.moved_from.insert(parent.to_path_buf());
            }
        }
    }

    fn copy_then_delete(&self, src: &Path, dst: &Path, tally: &mut Tally) -> bool {
        if let Err(e) = self.fs.copy(src, dst) {
            tally.fail(src, FileOp::Move, &e);
            return false;
        }
        tally.claimed.insert(dst.to_path_buf());
        if let Err(e) = self.fs.remove_file(src) {
            tally.fail(src, FileOp::Delete, &e);
            return false;
        }
        true
    }

    fn copy_item(&self, item: &PlanItem, base_dir: &Path, targets: &[u32], tally: &mut Tally) {
        let src = &item.path;
        let mut complete = true;
        let mut in_place = false;

        for &id in targets {
            let Some(dst) = self.target(item, base_dir, id, FileOp::Copy, tally) else {
                complete = false;
                continue;
            };
            if dst == *src {
                in_place = true;
                continue;
            }
            match self.fs.copy(src, &dst) {
                Ok(()) => {
                    tally.copied += 1;
                    tally.claimed.insert(dst);
                }
                Err(e) => {
                    complete = false;
                    tally.fail(&dst, FileOp::Copy, &e);
                }
            }
        }

        // The original is only removed once it exists in every target.
        if !complete || in_place {
            return;
        }
        if let Err(e) = self.fs.remove_file(src) {
            tally.fail(src, FileOp::Delete, &e);
        }
    }

    /// Removes source folders emptied by moves. Never recurses upward.
    fn cleanup(&self, dirs: &BTreeSet<PathBuf>) {
        let mut dirs: Vec<&PathBuf> = dirs.iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.as_os_str().len()));

        for dir in dirs {
            if !self.fs.exists(dir) {
                continue;
            }
            match self.fs.is_empty_dir(dir) {
                Ok(true) => match self.fs.remove_dir(dir) {
                    Ok(()) => tracing::debug!("removed empty folder {}", dir.display()),
                    Err(e) => tracing::debug!("cannot remove {}: {}", dir.display(), e),
                },
                Ok(false) => {}
                Err(e) => tracing::debug!("cannot list {}: {}", dir.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use super::*;
    use crate::fs::OsFs;
    use crate::progress::NopProgress;
    use crate::progress::testing::RecordingProgress;

    /// Wraps [`OsFs`] and fails selected operations on selected paths.
    #[derive(Default)]
    struct FaultyFs {
        fail_rename: bool,
        fail_remove: Vec<PathBuf>,
        fail_mkdir: Vec<PathBuf>,
        fail_copy_to: Vec<PathBuf>,
    }

    impl FileSystem for FaultyFs {
        fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
            if self.fail_mkdir.iter().any(|d| d == dir) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "mkdir denied"));
            }
            OsFs.create_dir_all(dir)
        }
        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            if self.fail_rename {
                return Err(io::Error::other("cross-device link"));
            }
            OsFs.rename(from, to)
        }
        fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
            if self.fail_copy_to.iter().any(|p| p == to) {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
            }
            OsFs.copy(from, to)
        }
        fn remove_file(&self, path: &Path) -> io::Result<()> {
            if self.fail_remove.iter().any(|p| p == path) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"));
            }
            OsFs.remove_file(path)
        }
        fn remove_dir(&self, path: &Path) -> io::Result<()> {
            OsFs.remove_dir(path)
        }
        fn exists(&self, path: &Path) -> bool {
            OsFs.exists(path)
        }
        fn is_empty_dir(&self, dir: &Path) -> io::Result<bool> {
            OsFs.is_empty_dir(dir)
        }
    }

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn item(path: &Path, clusters: &[u32]) -> PlanItem {
        PlanItem {
            path: path.to_path_buf(),
            clusters: clusters.to_vec(),
            face_count: clusters.len(),
        }
    }

    fn plan_of(items: Vec<PlanItem>) -> Plan {
        Plan {
            items,
            ..Plan::default()
        }
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
    }

    #[test]
    fn global_ids_offset_by_rank() {
        let plan = plan_of(vec![item(Path::new("a"), &[2, 5]), item(Path::new("b"), &[3])]);
        let ids = global_ids(&plan, ClusterCursor::new(10)).unwrap();
        assert_eq!(ids, BTreeMap::from([(2, 10), (3, 11), (5, 12)]));
    }

    #[test]
    fn single_membership_moves_and_empties_source() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let src = base.join("in/a.jpg");
        touch(&src, "a");

        let plan = plan_of(vec![item(&src, &[3])]);
        let result = Distributor::new(&OsFs, &NopProgress).distribute(&plan, base, ClusterCursor::new(1)).unwrap();

        assert_eq!(result.moved, 1);
        assert_eq!(result.copied, 0);
        assert_eq!(result.next_cursor, ClusterCursor::new(2));
        assert_eq!(fs::read_to_string(base.join("1/a.jpg")).unwrap(), "a");
        assert!(!src.exists());
        assert!(!base.join("in").exists(), "emptied source folder is removed");
    }

    #[test]
    fn multi_membership_copies_to_each_target_and_deletes_original() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let src = base.join("in/group.jpg");
        touch(&src, "g");
        touch(&base.join("in/keep.txt"), "k");

        let plan = plan_of(vec![item(&src, &[2, 5])]);
        let result = Distributor::new(&OsFs, &NopProgress).distribute(&plan, base, ClusterCursor::new(7)).unwrap();

        assert_eq!(result.moved, 0);
        assert_eq!(result.copied, 2);
        assert_eq!(result.clusters, 2);
        assert_eq!(result.next_cursor.get(), 9);
        assert_eq!(fs::read_to_string(base.join("7/group.jpg")).unwrap(), "g");
        assert_eq!(fs::read_to_string(base.join("8/group.jpg")).unwrap(), "g");
        assert_eq!(file_count(&base.join("7")), 1);
        assert_eq!(file_count(&base.join("8")), 1);
        assert!(!src.exists());
        assert!(base.join("in/keep.txt").exists());
    }

    #[test]
    fn second_run_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let a = base.join("in/a.jpg");
        let b = base.join("in/b.jpg");
        touch(&a, "a");
        touch(&b, "b");
        let plan = plan_of(vec![item(&a, &[1]), item(&b, &[1, 2])]);

        let d = Distributor::new(&OsFs, &NopProgress);
        let first = d.distribute(&plan, base, ClusterCursor::default()).unwrap();
        assert_eq!((first.moved, first.copied), (1, 2));

        let second = d.distribute(&plan, base, first.next_cursor).unwrap();
        assert_eq!((second.moved, second.copied), (0, 0));
        assert_eq!(second.skipped, 2);
        assert!(second.failures.is_empty());
    }

    #[test]
    fn empty_plan_keeps_cursor() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Distributor::new(&OsFs, &NopProgress).distribute(
            &Plan::default(),
            tmp.path(),
            ClusterCursor::new(4),
        )
        .unwrap();
        assert_eq!(result.next_cursor, ClusterCursor::new(4));
        assert_eq!(result.clusters, 0);
    }

    #[test]
    fn cleanup_is_shallow_and_spares_non_empty_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let deep = base.join("outer/inner/a.jpg");
        let busy = base.join("busy/b.jpg");
        let copied = base.join("multi/c.jpg");
        touch(&deep, "a");
        touch(&busy, "b");
        touch(&base.join("busy/notes.txt"), "n");
        touch(&copied, "c");

        let plan = plan_of(vec![item(&deep, &[1]), item(&busy, &[1]), item(&copied, &[1, 2])]);
        Distributor::new(&OsFs, &NopProgress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        assert!(!base.join("outer/inner").exists());
        assert!(base.join("outer").exists(), "ancestors are never removed");
        assert!(base.join("busy/notes.txt").exists());
        assert!(base.join("multi").exists(), "copy sources are not cleaned up");
    }

    #[test]
    fn delete_failure_leaves_original_and_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let stuck = base.join("in/stuck.jpg");
        let next = base.join("in/next.jpg");
        touch(&stuck, "s");
        touch(&next, "n");

        let faulty = FaultyFs {
            fail_remove: vec![stuck.clone()],
            ..FaultyFs::default()
        };
        let plan = plan_of(vec![item(&stuck, &[1, 2]), item(&next, &[2])]);
        let result = Distributor::new(&faulty, &NopProgress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        assert_eq!(result.copied, 2);
        assert_eq!(result.moved, 1);
        assert!(stuck.exists());
        assert!(base.join("1/stuck.jpg").exists());
        assert!(base.join("2/stuck.jpg").exists());
        assert!(base.join("2/next.jpg").exists());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].op, FileOp::Delete);
        assert_eq!(result.failures[0].path, stuck);
    }

    #[test]
    fn mkdir_failure_skips_item_only() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let a = base.join("in/a.jpg");
        let b = base.join("in/b.jpg");
        touch(&a, "a");
        touch(&b, "b");

        let faulty = FaultyFs {
            fail_mkdir: vec![base.join("1")],
            ..FaultyFs::default()
        };
        let plan = plan_of(vec![item(&a, &[1]), item(&b, &[2])]);
        let result = Distributor::new(&faulty, &NopProgress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        assert_eq!(result.moved, 1);
        assert!(a.exists());
        assert!(base.join("2/b.jpg").exists());
        assert_eq!(result.failures[0].op, FileOp::CreateDir);
        assert_eq!(result.next_cursor.get(), 3);
    }

    #[test]
    fn failed_copy_keeps_original() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let src = base.join("in/a.jpg");
        touch(&src, "a");

        let faulty = FaultyFs {
            fail_copy_to: vec![base.join("2/a.jpg")],
            ..FaultyFs::default()
        };
        let plan = plan_of(vec![item(&src, &[1, 2])]);
        let result = Distributor::new(&faulty, &NopProgress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        assert_eq!(result.copied, 1);
        assert!(src.exists());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].op, FileOp::Copy);
    }

    #[test]
    fn rename_failure_falls_back_to_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let src = base.join("in/a.jpg");
        touch(&src, "a");

        let faulty = FaultyFs {
            fail_rename: true,
            ..FaultyFs::default()
        };
        let plan = plan_of(vec![item(&src, &[1])]);
        let result = Distributor::new(&faulty, &NopProgress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        assert_eq!(result.moved, 1);
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(base.join("1/a.jpg")).unwrap(), "a");
        assert!(result.failures.is_empty());
    }

    #[test]
    fn files_already_in_place_are_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let single = base.join("1/a.jpg");
        let multi = base.join("1/b.jpg");
        touch(&single, "a");
        touch(&multi, "b");

        let plan = plan_of(vec![item(&single, &[1]), item(&multi, &[1, 2])]);
        let result = Distributor::new(&OsFs, &NopProgress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        assert_eq!(result.moved, 0);
        assert_eq!(result.copied, 1);
        assert_eq!(fs::read_to_string(&single).unwrap(), "a");
        assert_eq!(fs::read_to_string(&multi).unwrap(), "b");
        assert_eq!(fs::read_to_string(base.join("2/b.jpg")).unwrap(), "b");
    }

    #[test]
    fn progress_runs_from_zero_to_hundred() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let a = base.join("in/a.jpg");
        let b = base.join("in/b.jpg");
        touch(&a, "a");
        touch(&b, "b");

        let progress = RecordingProgress::default();
        let plan = plan_of(vec![item(&a, &[1]), item(&b, &[1])]);
        Distributor::new(&OsFs, &progress).distribute(&plan, base, ClusterCursor::default()).unwrap();

        let percents: Vec<u8> = progress.events.borrow().iter().map(|(_, p)| *p).collect();
        assert_eq!(percents, vec![0, 50, 100, 100]);
    }

    #[test]
    fn same_file_name_from_two_folders_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let first = base.join("day1/IMG_0001.jpg");
        let second = base.join("day2/IMG_0001.jpg");
        touch(&first, "first");
        touch(&second, "second");

        let plan = plan_of(vec![item(&first, &[1]), item(&second, &[1])]);
        let result = Distributor::new(&OsFs, &NopProgress)
            .distribute(&plan, base, ClusterCursor::default())
            .unwrap();

        let dst = base.join("1/IMG_0001.jpg");
        assert_eq!(result.moved, 1);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "first");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].op, FileOp::Move);
        assert_eq!(result.failures[0].path, dst);
        assert_eq!(result.failures[0].kind, "AlreadyExists");
        assert!(base.join("day2").exists());
    }

    #[test]
    fn name_clash_on_one_copy_target_keeps_original() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let single = base.join("a/x.jpg");
        let multi = base.join("b/x.jpg");
        touch(&single, "a");
        touch(&multi, "b");

        let plan = plan_of(vec![item(&single, &[1]), item(&multi, &[1, 2])]);
        let result = Distributor::new(&OsFs, &NopProgress)
            .distribute(&plan, base, ClusterCursor::default())
            .unwrap();

        assert_eq!(result.moved, 1);
        assert_eq!(result.copied, 1);
        assert_eq!(fs::read_to_string(base.join("1/x.jpg")).unwrap(), "a");
        assert_eq!(fs::read_to_string(base.join("2/x.jpg")).unwrap(), "b");
        assert!(multi.exists());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].op, FileOp::Copy);
    }

    #[test]
    fn file_waiting_in_target_folder_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let incoming = base.join("in/a.jpg");
        let settled = base.join("1/a.jpg");
        touch(&incoming, "new");
        touch(&settled, "settled");

        // The incoming file is processed first; the settled one is a plan item too.
        let plan = plan_of(vec![item(&incoming, &[1]), item(&settled, &[1])]);
        let result = Distributor::new(&OsFs, &NopProgress)
            .distribute(&plan, base, ClusterCursor::default())
            .unwrap();

        assert_eq!(fs::read_to_string(&settled).unwrap(), "settled");
        assert!(incoming.exists());
        assert_eq!(result.moved, 0);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.failures.len(), 1);
    }

    #[test]
    fn leftovers_from_earlier_runs_are_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let src = base.join("in/a.jpg");
        touch(&src, "new");
        touch(&base.join("1/a.jpg"), "old");

        let plan = plan_of(vec![item(&src, &[1])]);
        let result = Distributor::new(&OsFs, &NopProgress)
            .distribute(&plan, base, ClusterCursor::default())
            .unwrap();

        assert_eq!(result.moved, 1);
        assert!(result.failures.is_empty());
        assert_eq!(fs::read_to_string(base.join("1/a.jpg")).unwrap(), "new");
    }

    #[test]
    fn cursor_overflow_fails_before_touching_files() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        let src = base.join("in/a.jpg");
        touch(&src, "a");

        let plan = plan_of(vec![item(&src, &[1])]);
        let err = Distributor::new(&OsFs, &NopProgress)
            .distribute(&plan, base, ClusterCursor::new(u32::MAX))
            .unwrap_err();

        assert!(matches!(
            err,
            FaceSortError::ClusterIdOverflow {
                start: u32::MAX,
                clusters: 1
            }
        ));
        assert!(src.exists());
        assert_eq!(file_count(base), 1);
    }

    #[test]
    fn ids_up_to_the_last_u32_are_usable() {
        let plan = plan_of(vec![item(Path::new("a"), &[1, 2])]);
        let ids = global_ids(&plan, ClusterCursor::new(u32::MAX - 2)).unwrap();
        assert_eq!(ids, BTreeMap::from([(1, u32::MAX - 2), (2, u32::MAX - 1)]));
        assert!(global_ids(&plan, ClusterCursor::new(u32::MAX - 1)).is_err());

        let tmp = tempfile::tempdir().unwrap();
        let result = Distributor::new(&OsFs, &NopProgress)
            .distribute(&Plan::default(), tmp.path(), ClusterCursor::new(u32::MAX))
            .unwrap();
        assert_eq!(result.next_cursor.get(), u32::MAX);
    }
}
