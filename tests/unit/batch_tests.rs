/*!
 * Tests for file discovery and batch runs
 */

use std::fs;
use std::path::PathBuf;
use anyhow::Result;
use ass_font_replacer::batch::{self, BatchEvent, BatchJob, BatchRunner};
use ass_font_replacer::errors::BatchError;
use crate::common;

fn job_for(files: Vec<PathBuf>, output_dir: &std::path::Path) -> BatchJob {
    BatchJob::new(files, output_dir, common::sample_mapping(), "Verdana", true)
}

/// Test non-recursive discovery order and filtering
#[test]
fn test_discover_files_nonRecursive_shouldListTopLevelAssFilesSorted() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_subtitle(root, "b.ass")?;
    common::create_test_subtitle(root, "a.ass")?;
    common::create_test_file(root, "notes.txt", "x")?;
    common::create_test_file(root, "upper.ASS", "x")?;
    common::create_test_subtitle(root, "nested/c.ass")?;
    fs::create_dir(root.join("dir.ass"))?;

    let files = batch::discover_files(root, false)?;

    assert_eq!(files, vec![root.join("a.ass"), root.join("b.ass")]);

    Ok(())
}

/// Test recursive discovery
#[test]
fn test_discover_files_recursive_shouldIncludeNestedFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_subtitle(root, "a.ass")?;
    common::create_test_subtitle(root, "nested/deeper/c.ass")?;
    common::create_test_subtitle(root, "nested/b.ass")?;

    let files = batch::discover_files(root, true)?;

    assert_eq!(files.len(), 3);
    assert!(files.contains(&root.join("nested/deeper/c.ass")));
    assert!(files.contains(&root.join("nested/b.ass")));

    Ok(())
}

/// Test that a missing directory is reported as no input
#[test]
fn test_discover_files_withMissingDir_shouldFailWithNoInputSelected() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let result = batch::discover_files(&temp_dir.path().join("missing"), true);

    assert!(matches!(result, Err(BatchError::NoInputSelected { .. })));

    Ok(())
}

/// Test that a directory without subtitles is reported as no input
#[test]
fn test_discover_files_withNoMatches_shouldFailWithNoInputSelected() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "movie.srt", "1")?;

    let result = batch::discover_files(temp_dir.path(), false);

    match result {
        Err(BatchError::NoInputSelected { path }) => assert_eq!(path, temp_dir.path()),
        other => panic!("unexpected result: {:?}", other),
    }

    Ok(())
}

/// Test that three files produce 33, 66, 100 in discovery order
#[test]
fn test_run_withThreeFiles_shouldEmitTruncatedProgressInOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("input");
    let output = temp_dir.path().join("output");
    for name in ["one.ass", "two.ass", "three.ass"] {
        common::create_test_subtitle(&input, name)?;
    }

    let files = batch::discover_files(&input, false)?;
    let runner = BatchRunner::new(job_for(files, &output));
    let mut events = Vec::new();
    let summary = runner.run(|event| events.push(event))?;

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    let names: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::FileProcessed { file_name, .. } => Some(file_name.as_str()),
            _ => None,
        })
        .collect();

    assert_eq!(progress, vec![33, 66, 100]);
    assert_eq!(names, vec!["one.ass", "three.ass", "two.ass"]);
    assert!(matches!(events[0], BatchEvent::FileProcessed { .. }));
    assert!(matches!(events[1], BatchEvent::Progress { percent: 33 }));
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.collisions, 0);

    Ok(())
}

/// Test that output files are rewritten and inputs stay untouched
#[test]
fn test_run_withSampleFile_shouldWriteRewrittenCopy() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_file = common::create_test_subtitle(&temp_dir.path().join("in"), "episode.ass")?;
    let output = temp_dir.path().join("out");

    let summary = BatchRunner::new(job_for(vec![input_file.clone()], &output)).run(|_| {})?;

    assert_eq!(summary.outputs, vec![output.join("episode.ass")]);
    assert_eq!(fs::read_to_string(output.join("episode.ass"))?, common::SAMPLE_ASS_REWRITTEN);
    assert_eq!(fs::read_to_string(&input_file)?, common::SAMPLE_ASS);

    Ok(())
}

/// Test that a byte-order mark is kept only when the input had one
#[test]
fn test_run_withBomAndWithoutBom_shouldPreserveEncodingSignature() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("in");
    let output = temp_dir.path().join("out");
    fs::create_dir_all(&input)?;
    fs::write(input.join("bom.ass"), b"\xEF\xBB\xBFStyle: Default,Comic Sans MS,20\n")?;
    fs::write(input.join("plain.ass"), b"Style: Default,Comic Sans MS,20\n")?;

    let files = batch::discover_files(&input, false)?;
    BatchRunner::new(job_for(files, &output)).run(|_| {})?;

    assert_eq!(fs::read(output.join("bom.ass"))?, b"\xEF\xBB\xBFStyle: Default,Arial,20\n".to_vec());
    assert_eq!(fs::read(output.join("plain.ass"))?, b"Style: Default,Arial,20\n".to_vec());

    Ok(())
}

/// Test that an undecodable file aborts the run and keeps earlier outputs
#[test]
fn test_run_withUndecodableFile_shouldAbortWithFileRead() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("in");
    let output = temp_dir.path().join("out");
    common::create_test_subtitle(&input, "a.ass")?;
    fs::write(input.join("b.ass"), [0x53, 0xFF, 0xFE, 0x00])?;
    common::create_test_subtitle(&input, "c.ass")?;

    let files = batch::discover_files(&input, false)?;
    let mut events = Vec::new();
    let result = BatchRunner::new(job_for(files, &output)).run(|e| events.push(e));

    match result {
        Err(BatchError::FileRead { path, .. }) => assert_eq!(path, input.join("b.ass")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(output.join("a.ass").exists());
    assert!(!output.join("c.ass").exists());
    assert_eq!(events.len(), 2);

    Ok(())
}

/// Test that a missing input file surfaces its path
#[test]
fn test_run_withMissingFile_shouldReportPath() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let missing = temp_dir.path().join("gone.ass");

    let result = BatchRunner::new(job_for(vec![missing.clone()], &temp_dir.path().join("out"))).run(|_| {});

    let err = result.unwrap_err();
    assert_eq!(err.path(), Some(&missing));
    assert!(err.to_string().contains("gone.ass"));

    Ok(())
}

/// Test that an empty job is rejected without creating the output directory
#[test]
fn test_run_withNoFiles_shouldFailBeforeCreatingOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("out");

    let runner = BatchRunner::new(job_for(Vec::new(), &output));
    assert!(runner.job().input_files.is_empty());
    assert_eq!(runner.job().output_dir, output);

    let result = runner.run(|_| {});

    match result {
        Err(BatchError::NoInputSelected { path }) => assert_eq!(path, PathBuf::new()),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!output.exists());

    Ok(())
}

/// Test that writing into the input directory is refused
#[test]
fn test_run_withOutputEqualToInput_shouldRefuseInPlaceRewrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_file = common::create_test_subtitle(temp_dir.path(), "a.ass")?;

    let result = BatchRunner::new(job_for(vec![input_file.clone()], temp_dir.path())).run(|_| {});

    assert!(matches!(result, Err(BatchError::OutputOverlapsInput { .. })));
    assert_eq!(fs::read_to_string(&input_file)?, common::SAMPLE_ASS);

    Ok(())
}

/// Test that an output path blocked by a file is reported as unwritable
#[test]
fn test_run_withOutputPathIsFile_shouldFailWithOutputDirUnwritable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_file = common::create_test_subtitle(&temp_dir.path().join("in"), "a.ass")?;
    let blocker = common::create_test_file(temp_dir.path(), "blocker", "not a dir")?;

    let result = BatchRunner::new(job_for(vec![input_file], &blocker.join("out"))).run(|_| {});

    assert!(matches!(result, Err(BatchError::OutputDirUnwritable { .. })));

    Ok(())
}

/// Same-named files from different directories overwrite each other in the flat output
#[test]
fn test_run_withSameNameInSubdirs_shouldOverwriteAndCountCollision() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("in");
    let output = temp_dir.path().join("out");
    common::create_test_file(&input, "a/ep.ass", "Style: A,Impact,20\n")?;
    common::create_test_file(&input, "b/ep.ass", "Style: B,Comic Sans MS,20\n")?;

    let files = batch::discover_files(&input, true)?;
    let summary = BatchRunner::new(job_for(files, &output)).run(|_| {})?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.collisions, 1);
    assert_eq!(fs::read_to_string(output.join("ep.ass"))?, "Style: B,Arial,20\n");

    Ok(())
}

/// Test that cancellation before the first file processes nothing
#[test]
fn test_run_withCancellationRequested_shouldStopBeforeNextFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_file = common::create_test_subtitle(&temp_dir.path().join("in"), "a.ass")?;
    let output = temp_dir.path().join("out");

    let runner = BatchRunner::new(job_for(vec![input_file], &output));
    runner.cancel_handle().store(true, std::sync::atomic::Ordering::SeqCst);
    let result = runner.run(|_| {});

    assert!(matches!(result, Err(BatchError::Cancelled { processed: 0 })));
    assert!(!output.join("a.ass").exists());

    Ok(())
}

/// Test the background runner's event stream
#[tokio::test]
async fn test_spawn_withTwoFiles_shouldStreamEventsThenFinish() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = temp_dir.path().join("in");
    common::create_test_subtitle(&input, "a.ass")?;
    common::create_test_subtitle(&input, "b.ass")?;
    let files = batch::discover_files(&input, false)?;

    let mut handle = BatchRunner::new(job_for(files, &temp_dir.path().join("out"))).spawn();
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    let summary = handle.finish().await??;

    assert_eq!(events.len(), 4);
    assert_eq!(events[3], BatchEvent::Progress { percent: 100 });
    assert_eq!(summary.processed, 2);

    Ok(())
}

/// Test that the snapshot in a job is unaffected by later config edits
#[test]
fn test_job_from_config_shouldSnapshotMapping() -> Result<()> {
    let mut config = ass_font_replacer::Config::default();
    config.fonts.insert("Impact", "Arial Black");
    config.remove_font_spacing = false;

    let job = BatchJob::from_config(Vec::new(), "out", &config);
    config.fonts.insert("Impact", "Tahoma");

    assert_eq!(job.mapping.get("Impact"), Some("Arial Black"));
    assert_eq!(job.default_font, "Arial");
    assert!(!job.remove_spacing);

    Ok(())
}

/// Test that an existing read-only output directory is rejected before any file is read
#[cfg(unix)]
#[test]
fn test_run_withReadOnlyOutputDir_shouldFailWithOutputDirUnwritable() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = common::create_temp_dir()?;
    let input_file = common::create_test_subtitle(&temp_dir.path().join("in"), "a.ass")?;
    let output = temp_dir.path().join("out");
    fs::create_dir(&output)?;
    fs::set_permissions(&output, fs::Permissions::from_mode(0o555))?;

    // Privileged users can write regardless of the mode
    let check = output.join("check");
    if fs::write(&check, "x").is_ok() {
        fs::remove_file(&check)?;
        fs::set_permissions(&output, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    let mut events = Vec::new();
    let result = BatchRunner::new(job_for(vec![input_file], &output)).run(|e| events.push(e));
    fs::set_permissions(&output, fs::Permissions::from_mode(0o755))?;

    match result {
        Err(BatchError::OutputDirUnwritable { path, .. }) => assert_eq!(path, output),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(events.is_empty());
    assert_eq!(fs::read_dir(&output)?.count(), 0);

    Ok(())
}

/// Test that a writable existing output directory is left with only the outputs
#[test]
fn test_run_withExistingOutputDir_shouldLeaveNoExtraFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_file = common::create_test_subtitle(&temp_dir.path().join("in"), "a.ass")?;
    let output = temp_dir.path().join("out");
    fs::create_dir(&output)?;

    BatchRunner::new(job_for(vec![input_file], &output)).run(|_| {})?;

    let names: Vec<String> = fs::read_dir(&output)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<_>>()?;
    assert_eq!(names, vec!["a.ass".to_string()]);

    Ok(())
}
