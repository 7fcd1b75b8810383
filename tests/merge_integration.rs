/// Merging text logs end to end
use anyhow::Result;
use logmill::config::Config;
use logmill::filters::Filters;
use logmill::merge::SourceMerger;
use logmill::source::{CommitSource, CustomFormat, GitLogFormat, SeekableTextSource};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_log(dir: &Path, name: &str, text: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::write(&path, text)?;
    Ok(path.display().to_string())
}

fn drain(merger: &mut SourceMerger) -> Vec<(String, i64)> {
    let mut out = Vec::new();
    while !merger.is_finished() {
        if let Some((id, commit)) = merger.next_with_source(true) {
            out.push((id.to_string(), commit.timestamp));
        }
    }
    out
}

#[test]
fn test_two_logs_interleave() -> Result<()> {
    let dir = TempDir::new()?;
    let a = write_log(dir.path(), "a.log", "10|alice|A|a.txt\n20|alice|M|a.txt\n")?;
    let b = write_log(dir.path(), "b.log", "15|bob|A|b.txt\n")?;

    let mut merger = logmill::mill::open_sources(&[a.clone(), b.clone()], &Config::default())?;
    assert_eq!(
        drain(&mut merger),
        vec![(a.clone(), 10), (b, 15), (a, 20)]
    );
    Ok(())
}

#[test]
fn test_mixed_formats_merge() -> Result<()> {
    let dir = TempDir::new()?;
    let git = write_log(
        dir.path(),
        "git.log",
        "user:Jane\n100\n:000000 100644 0000000 1111111 A\tsrc/a.rs\n\n\
         user:Jane\n300\n:100644 100644 1111111 2222222 M\tsrc/a.rs\n",
    )?;
    let custom = write_log(dir.path(), "custom.log", "200|John|A|docs/readme.md\n")?;

    let mut merger = logmill::mill::open_sources(&[git, custom], &Config::default())?;
    let stamps: Vec<i64> = drain(&mut merger).into_iter().map(|(_, t)| t).collect();
    assert_eq!(stamps, vec![100, 200, 300]);
    Ok(())
}

#[test]
fn test_wrong_format_never_yields() -> Result<()> {
    let dir = TempDir::new()?;
    let log = write_log(dir.path(), "custom.log", "10|alice|A|a.txt\n")?;

    let mut source =
        SeekableTextSource::open(&log, Box::new(GitLogFormat), Arc::new(Filters::none()))?;
    assert!(!source.check_format());
    assert!(source.next_commit(false).is_none());
    assert!(source.is_finished());

    // the merger treats it as already finished
    let merger = SourceMerger::new(vec![Box::new(source)]);
    assert!(merger.is_finished());
    Ok(())
}

#[test]
fn test_filters_from_config() -> Result<()> {
    let dir = TempDir::new()?;
    let log = write_log(
        dir.path(),
        "custom.log",
        concat!(
            "10|alice|A|Cargo.lock\n20|alice|A|src/lib.rs\n",
            "20|alice|A|Cargo.lock\n30|ci-bot|M|src/lib.rs\n",
        ),
    )?;

    let mut config = Config::default();
    config.filters.file_deny = vec![r"\.lock$".to_string()];
    config.filters.user_deny = vec!["-bot$".to_string()];

    let mut merger = logmill::mill::open_sources(&[log], &config)?;
    let mut commits = Vec::new();
    while !merger.is_finished() {
        if let Some(commit) = merger.next_commit(true) {
            commits.push(commit);
        }
    }

    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].timestamp, 20);
    assert_eq!(commits[0].files.len(), 1);
    assert_eq!(commits[0].files[0].path, "/src/lib.rs");
    Ok(())
}

#[test]
fn test_seek_within_log() -> Result<()> {
    let dir = TempDir::new()?;
    let text: String = (1..=100)
        .map(|i| format!("{}|dev|M|file{}.rs\n", i * 10, i))
        .collect();
    let log = write_log(dir.path(), "long.log", &text)?;

    let mut source =
        SeekableTextSource::open(&log, Box::new(CustomFormat), Arc::new(Filters::none()))?;
    assert!(source.is_seekable());

    let middle = source.commit_at(0.5).expect("commit near the middle");
    assert!((400..=600).contains(&middle.timestamp));
    assert_eq!(source.percent(), 0.0);

    source.seek_to(0.9);
    assert!(source.percent() >= 0.9);
    let late = source.find_next_commit(5).expect("commit near the end");
    assert!(late.timestamp >= 900);
    Ok(())
}
