use {
    logfan::{ErrorKind, RotatingFileSink},
    std::{fs, io::Write, path::Path, sync::Arc, thread},
    tempfile::TempDir,
};

/// A 29-character line, 30 bytes once the terminator is added.
fn fixed(i: usize) -> String {
    format!("{:<29}", format!("record {i:02}"))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

#[test]
fn scenario_four_fixed_records_roll_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 100, 2).unwrap();

    for i in 1..=4 {
        sink.write_line(&fixed(i)).unwrap();
    }

    assert_eq!(read(&path), format!("{}\n", fixed(4)));
    assert_eq!(read(&sink.backup_path(1)), format!("{}\n{}\n{}\n", fixed(1), fixed(2), fixed(3)));
    assert!(!sink.backup_path(2).exists());
    assert_eq!(sink.current_size(), 30);
}

#[test]
fn active_file_stays_within_one_record_of_the_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let max_bytes = 120;
    let sink = RotatingFileSink::new(&path, max_bytes, 50).unwrap();

    for i in 0..400 {
        let line = "x".repeat((i * 7) % 53 + 1);
        sink.write_line(&line).unwrap();

        let size = fs::metadata(&path).unwrap().len();
        assert_eq!(size, sink.current_size());
        assert!(size <= max_bytes + line.len() as u64 + 1);
    }

    for file in sink.backups().unwrap().into_iter().chain([path.clone()]) {
        let text = read(&file);
        assert!(text.len() as u64 <= max_bytes || text.lines().count() == 1, "{} is oversized", file.display());
    }
}

#[test]
fn oldest_generations_are_discarded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 30, 3).unwrap();

    // One record per file: every write after the first rolls over.
    for i in 1..=10 {
        sink.write_line(&fixed(i)).unwrap();
    }

    let backups = sink.backups().unwrap();
    assert_eq!(backups, vec![sink.backup_path(1), sink.backup_path(2), sink.backup_path(3)]);
    assert_eq!(read(&sink.backup_path(1)), format!("{}\n", fixed(9)));
    assert_eq!(read(&sink.backup_path(2)), format!("{}\n", fixed(8)));
    assert_eq!(read(&sink.backup_path(3)), format!("{}\n", fixed(7)));
    assert_eq!(read(&path), format!("{}\n", fixed(10)));
}

#[test]
fn concatenated_generations_reproduce_the_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 64, 100).unwrap();

    let expected: Vec<String> = (0..60).map(|i| format!("event {i} {}", "-".repeat(i % 9))).collect();
    for line in &expected {
        sink.write_line(line).unwrap();
    }

    let mut files = sink.backups().unwrap();
    files.reverse();
    files.push(path.clone());
    let replayed: Vec<String> = files
        .iter()
        .flat_map(|file| read(file).lines().map(str::to_owned).collect::<Vec<_>>())
        .collect();
    assert_eq!(replayed, expected);
}

#[test]
fn zero_backups_truncates_in_place() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 100, 0).unwrap();

    for i in 1..=7 {
        sink.write_line(&fixed(i)).unwrap();
    }

    assert!(!sink.backup_path(1).exists());
    assert!(sink.backups().unwrap().is_empty());
    assert_eq!(read(&path), format!("{}\n", fixed(7)));
}

#[test]
fn zero_max_bytes_grows_unbounded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 0, 3).unwrap();

    for i in 0..100 {
        sink.write_line(&fixed(i)).unwrap();
    }

    assert_eq!(fs::metadata(&path).unwrap().len(), 3000);
    assert!(sink.backups().unwrap().is_empty());
}

#[test]
fn oversized_record_is_written_whole() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 10, 2).unwrap();

    let big = "y".repeat(50);
    sink.write_line(&big).unwrap();
    assert_eq!(read(&path), format!("{big}\n"));
    assert!(sink.backups().unwrap().is_empty());

    sink.write_line("next").unwrap();
    assert_eq!(read(&sink.backup_path(1)), format!("{big}\n"));
    assert_eq!(read(&path), "next\n");
}

#[test]
fn missing_directory_is_created_on_first_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("app.log");
    let sink = RotatingFileSink::new(&path, 100, 1).unwrap();
    assert!(!path.exists());

    sink.write_line("hello").unwrap();
    assert_eq!(read(&path), "hello\n");
}

#[test]
fn resumes_an_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    {
        let sink = RotatingFileSink::new(&path, 100, 2).unwrap();
        sink.write_line(&fixed(1)).unwrap();
        sink.write_line(&fixed(2)).unwrap();
    }

    let sink = RotatingFileSink::new(&path, 100, 2).unwrap();
    assert_eq!(sink.current_size(), 60);
    sink.write_line(&fixed(3)).unwrap();
    sink.write_line(&fixed(4)).unwrap();
    assert_eq!(read(&sink.backup_path(1)).lines().count(), 3);
    assert_eq!(read(&path), format!("{}\n", fixed(4)));
}

#[test]
fn failed_rollover_is_reported_and_the_sink_recovers() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    let moved = dir.path().join("moved");
    let path = logs.join("app.log");
    let sink = RotatingFileSink::new(&path, 100, 2).unwrap();

    for i in 1..=3 {
        sink.write_line(&fixed(i)).unwrap();
    }

    // Replace the log directory with a plain file so nothing under it can be
    // created or renamed.
    fs::rename(&logs, &moved).unwrap();
    fs::write(&logs, "not a directory").unwrap();

    let err = sink.write_line(&fixed(4)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.path().is_some());

    fs::remove_file(&logs).unwrap();
    fs::rename(&moved, &logs).unwrap();

    sink.write_line(&fixed(5)).unwrap();
    assert_eq!(read(&path), format!("{}\n", fixed(5)));
    assert_eq!(read(&sink.backup_path(1)), format!("{}\n{}\n{}\n", fixed(1), fixed(2), fixed(3)));
    assert_eq!(sink.current_size(), 30);
}

#[test]
fn externally_deleted_backup_is_tolerated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = RotatingFileSink::new(&path, 30, 3).unwrap();

    for i in 1..=3 {
        sink.write_line(&fixed(i)).unwrap();
    }
    fs::remove_file(sink.backup_path(1)).unwrap();

    sink.write_line(&fixed(4)).unwrap();
    assert_eq!(read(&sink.backup_path(1)), format!("{}\n", fixed(3)));
    assert_eq!(read(&sink.backup_path(3)), format!("{}\n", fixed(1)));
    assert!(!sink.backup_path(2).exists());
    assert_eq!(read(&path), format!("{}\n", fixed(4)));
}

#[test]
fn concurrent_writers_never_interleave_or_overflow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.log");
    let sink = Arc::new(RotatingFileSink::new(&path, 300, 500).unwrap());

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for i in 0..100 {
                    sink.write_line(&format!("{:<29}", format!("w{worker} #{i}"))).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut total = 0;
    for file in sink.backups().unwrap().into_iter().chain([path.clone()]) {
        let text = read(&file);
        assert!(text.len() <= 300);
        for line in text.lines() {
            assert_eq!(line.len(), 29);
            total += 1;
        }
    }
    assert_eq!(total, 800);
}

#[test]
fn io_write_treats_each_call_as_one_unit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raw.log");
    let mut sink = RotatingFileSink::new(&path, 20, 1).unwrap();

    sink.write_all(b"0123456789\n").unwrap();
    sink.write_all(b"abcdefghij\n").unwrap();
    sink.flush().unwrap();

    assert_eq!(read(&sink.backup_path(1)), "0123456789\n");
    assert_eq!(read(&path), "abcdefghij\n");
}
