//! End-to-end sync engine integration tests.

use modsync::commands::sync::{run, RunOutput};
use modsync::executor::{CopyStats, ExecutionEvent, Filesystem};
use modsync::types::Result;
use modsync::{sync, CancelToken, Config, FailureReason, MappingEntry, SyncOutcome, Syncer};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn make_mod(root: &Path, name: &str, marker: &[u8]) {
    fs::create_dir_all(root.join(name).join("addons")).expect("create mod dir");
    fs::write(root.join(name).join("meta.cpp"), marker).expect("write marker");
    fs::write(root.join(name).join("addons").join("main.pbo"), name.as_bytes())
        .expect("write addon");
}

fn entries(names: &[&str]) -> Vec<MappingEntry> {
    names.iter().map(|n| MappingEntry::new(*n, *n)).collect()
}

#[test]
fn test_identical_markers_leave_destination_untouched() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "alpha", b"ts=1");
    make_mod(dst.path(), "alpha", b"ts=1");
    fs::write(src.path().join("alpha/addons/main.pbo"), b"newer").expect("update source addon");

    let outcomes = sync(src.path(), dst.path(), &entries(&["alpha"]));

    assert_eq!(outcomes, vec![SyncOutcome::Unchanged]);
    assert_eq!(
        fs::read(dst.path().join("alpha/addons/main.pbo")).expect("read dest addon"),
        b"alpha"
    );
}

#[test]
fn test_changed_marker_merge_copies_and_keeps_extra_files() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "beta", b"ts=2");
    make_mod(dst.path(), "beta", b"ts=1");
    fs::write(src.path().join("beta/addons/main.pbo"), b"v2").expect("update source addon");
    fs::write(dst.path().join("beta/userconfig.hpp"), b"keep me").expect("write dest-only file");

    let outcomes = sync(src.path(), dst.path(), &entries(&["beta"]));

    assert_eq!(outcomes, vec![SyncOutcome::Updated]);
    assert_eq!(fs::read(dst.path().join("beta/meta.cpp")).expect("read marker"), b"ts=2");
    assert_eq!(
        fs::read(dst.path().join("beta/addons/main.pbo")).expect("read addon"),
        b"v2"
    );
    assert_eq!(
        fs::read(dst.path().join("beta/userconfig.hpp")).expect("read dest-only file"),
        b"keep me"
    );
}

#[test]
fn test_missing_destination_is_created() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "@cba_a3", b"ts=9");

    let outcomes = sync(
        src.path(),
        dst.path(),
        &[MappingEntry::new("@cba_a3", "@cba")],
    );

    assert_eq!(outcomes, vec![SyncOutcome::Updated]);
    assert!(dst.path().join("@cba/addons/main.pbo").is_file());
    assert!(!dst.path().join("@cba_a3").exists());
}

#[test]
fn test_missing_source_fails_only_that_entry() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "alpha", b"ts=1");
    make_mod(dst.path(), "alpha", b"ts=1");
    make_mod(src.path(), "beta", b"ts=2");

    let outcomes = sync(src.path(), dst.path(), &entries(&["alpha", "gamma", "beta"]));

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0], SyncOutcome::Unchanged);
    assert!(matches!(
        outcomes[1],
        SyncOutcome::Failed(FailureReason::SourceMissing { .. })
    ));
    assert_eq!(outcomes[2], SyncOutcome::Updated);
    assert!(dst.path().join("beta/meta.cpp").is_file());
}

#[test]
fn test_second_run_is_idempotent() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "alpha", b"ts=1");
    make_mod(src.path(), "beta", b"ts=2");
    let list = entries(&["alpha", "beta"]);

    let first = sync(src.path(), dst.path(), &list);
    let second = sync(src.path(), dst.path(), &list);

    assert_eq!(first, vec![SyncOutcome::Updated, SyncOutcome::Updated]);
    assert_eq!(second, vec![SyncOutcome::Unchanged, SyncOutcome::Unchanged]);
}

#[test]
fn test_parallel_run_matches_input_order() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    let names: Vec<String> = (0..12).map(|i| format!("@mod{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        make_mod(src.path(), name, format!("ts={i}").as_bytes());
        if i % 3 == 0 {
            make_mod(dst.path(), name, format!("ts={i}").as_bytes());
        }
    }
    let list: Vec<MappingEntry> = names.iter().map(|n| MappingEntry::new(n, n)).collect();

    let config = Config {
        threads: 4,
        ..Config::new(src.path(), dst.path())
    };
    let report = Syncer::new(config).run(&list);

    assert_eq!(report.results.len(), 12);
    for (i, result) in report.results.iter().enumerate() {
        assert_eq!(result.entry, list[i]);
        let expected = if i % 3 == 0 {
            SyncOutcome::Unchanged
        } else {
            SyncOutcome::Updated
        };
        assert_eq!(result.outcome, expected, "entry {i}");
    }
    assert_eq!(report.stats.updated, 8);
    assert_eq!(report.stats.unchanged, 4);
}

#[test]
fn test_cancelled_run_reports_every_entry_as_cancelled() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "alpha", b"ts=1");
    make_mod(src.path(), "beta", b"ts=1");

    let token = CancelToken::new();
    token.cancel();
    let report = Syncer::new(Config::new(src.path(), dst.path()))
        .with_cancel_token(token)
        .run(&entries(&["alpha", "beta"]));

    assert!(report
        .outcomes()
        .iter()
        .all(|o| *o == SyncOutcome::Failed(FailureReason::Cancelled)));
    assert!(!dst.path().join("alpha").exists());
}

#[test]
fn test_events_report_each_entry_then_complete() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "alpha", b"ts=1");

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = {
        let seen = Arc::clone(&seen);
        move |event: &ExecutionEvent| {
            let label = match event {
                ExecutionEvent::EntryStart { entry, .. } => format!("start {entry}"),
                ExecutionEvent::EntryFinished { result, .. } => {
                    format!("finish {} {}", result.entry, result.outcome.label())
                }
                ExecutionEvent::Complete { stats } => format!("complete {}", stats.total_entries),
            };
            seen.lock().expect("lock events").push(label);
        }
    };

    Syncer::new(Config::new(src.path(), dst.path()))
        .with_events(Arc::new(recorder))
        .run(&entries(&["alpha"]));

    let seen = seen.lock().expect("lock events");
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], "start alpha");
    assert!(seen[1].starts_with("finish alpha"));
    assert_eq!(seen[2], "complete 1");
}

#[test]
fn test_run_command_with_mapping_file() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    let work = TempDir::new().expect("create work tempdir");
    make_mod(src.path(), "@ace", b"ts=3");
    let mapping = work.path().join("modlist.csv");
    fs::write(&mapping, "@ace,@ace_srv\n").expect("write mapping");

    let config = Config {
        mapping_file: mapping,
        ..Config::new(src.path(), dst.path())
    };
    let output = run(config, CancelToken::new()).expect("run should succeed");

    assert!(output.is_success());
    match output {
        RunOutput::Synced(report) => assert_eq!(report.stats.updated, 1),
        other => panic!("expected a sync report, got {other:?}"),
    }
    assert!(dst.path().join("@ace_srv/meta.cpp").is_file());
}

/// Copy request seen by `RecordingFs`: source, destination, file written last
type CopyCall = (PathBuf, PathBuf, Option<String>);

/// In-memory filesystem that records every copy request
#[derive(Default)]
struct RecordingFs {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: Vec<PathBuf>,
    copies: Mutex<Vec<CopyCall>>,
}

impl RecordingFs {
    fn with_mod(mut self, dir: &str, marker: Option<&[u8]>) -> Self {
        self.dirs.push(PathBuf::from(dir));
        if let Some(bytes) = marker {
            self.files
                .insert(Path::new(dir).join("meta.cpp"), bytes.to_vec());
        }
        self
    }

    fn with_file(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(PathBuf::from(path), bytes.to_vec());
        self
    }
}

impl Filesystem for RecordingFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.iter().any(|d| d == path)
    }

    fn copy_tree(&self, src: &Path, dst: &Path, last_file: Option<&str>) -> Result<CopyStats> {
        self.copies.lock().expect("lock copies").push((
            src.to_path_buf(),
            dst.to_path_buf(),
            last_file.map(str::to_string),
        ));
        Ok(CopyStats::default())
    }
}

#[test]
fn test_copy_requested_only_for_changed_entry() {
    let fake = Arc::new(
        RecordingFs::default()
            .with_mod("/mods/alpha", Some(b"ts=1"))
            .with_mod("/srv/alpha", Some(b"ts=1"))
            .with_mod("/mods/beta", Some(b"ts=2"))
            .with_mod("/srv/beta_srv", Some(b"ts=1")),
    );

    let list = vec![
        MappingEntry::new("alpha", "alpha"),
        MappingEntry::new("beta", "beta_srv"),
    ];
    let report = Syncer::new(Config::new("/mods", "/srv"))
        .with_filesystem(fake.clone())
        .run(&list);

    assert_eq!(
        report.outcomes(),
        vec![SyncOutcome::Unchanged, SyncOutcome::Updated]
    );
    let copies = fake.copies.lock().expect("lock copies");
    assert_eq!(
        *copies,
        vec![(
            PathBuf::from("/mods/beta"),
            PathBuf::from("/srv/beta_srv"),
            Some("meta.cpp".to_string()),
        )]
    );
}

#[test]
fn test_copy_writes_configured_marker_last() {
    let fake = Arc::new(
        RecordingFs::default()
            .with_mod("/mods/alpha", None)
            .with_file("/mods/alpha/mod.cpp", b"ts=1"),
    );

    let config = Config {
        marker_file: "mod.cpp".to_string(),
        ..Config::new("/mods", "/srv")
    };
    let report = Syncer::new(config)
        .with_filesystem(fake.clone())
        .run(&entries(&["alpha"]));

    assert_eq!(report.outcomes(), vec![SyncOutcome::Updated]);
    let copies = fake.copies.lock().expect("lock copies");
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].2.as_deref(), Some("mod.cpp"));
}

#[cfg(unix)]
#[test]
fn test_symlinked_destination_folder_is_updated_in_place() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    make_mod(src.path(), "alpha", b"ts=2");
    make_mod(dst.path(), "realdir", b"ts=1");
    std::os::unix::fs::symlink(dst.path().join("realdir"), dst.path().join("alpha"))
        .expect("create folder symlink");

    let outcomes = sync(src.path(), dst.path(), &entries(&["alpha"]));

    assert_eq!(outcomes, vec![SyncOutcome::Updated]);
    assert_eq!(
        fs::read(dst.path().join("realdir/meta.cpp")).expect("read marker"),
        b"ts=2"
    );
    assert!(fs::symlink_metadata(dst.path().join("alpha"))
        .expect("folder metadata")
        .file_type()
        .is_symlink());

    let second = sync(src.path(), dst.path(), &entries(&["alpha"]));
    assert_eq!(second, vec![SyncOutcome::Unchanged]);
}

#[test]
fn test_unreadable_destination_marker_fails_without_copy() {
    let mut fake = RecordingFs::default()
        .with_mod("/mods/alpha", Some(b"ts=1"))
        .with_mod("/srv/alpha", None);
    // Present in the listing but not readable
    fake.dirs.push(PathBuf::from("/srv/alpha/meta.cpp"));
    let fake = Arc::new(fake);

    let report = Syncer::new(Config::new("/mods", "/srv"))
        .with_filesystem(fake.clone())
        .run(&entries(&["alpha"]));

    assert!(matches!(
        report.results[0].outcome,
        SyncOutcome::Failed(FailureReason::UnreadableFile { .. })
    ));
    assert!(fake.copies.lock().expect("lock copies").is_empty());
}
