//! End-to-end session tests over a scripted process runner.
//!
//! No external tool is ever spawned here; the runner records every
//! invocation and returns canned bytes, so the tests can assert the exact
//! argument lists each pipeline stage receives and the store contents that
//! result.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::tempdir;

use bindery::{
    BinderError, OutputStore, PipelineStage, PipelineStrategy, ProcessRunner, Session,
    SubmissionConfig, UploadedFile,
};

/// One recorded tool invocation.
#[derive(Debug, Clone)]
struct Invocation {
    stage: PipelineStage,
    tool: String,
    args: Vec<String>,
    had_stdin: bool,
}

/// Scripted runner: pops a canned response per call and records everything.
#[derive(Default)]
struct MockRunner {
    calls: Mutex<Vec<Invocation>>,
    // Ok(bytes) to succeed, Err(msg) to fail the stage.
    responses: Mutex<Vec<Result<Vec<u8>, String>>>,
}

impl MockRunner {
    fn scripted(responses: Vec<Result<Vec<u8>, String>>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(responses),
        })
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(
        &self,
        stage: PipelineStage,
        tool: &str,
        args: &[String],
        input: Option<&[u8]>,
        _timeout_secs: u64,
    ) -> Result<Vec<u8>, BinderError> {
        self.calls.lock().unwrap().push(Invocation {
            stage,
            tool: tool.to_string(),
            args: args.to_vec(),
            had_stdin: input.is_some(),
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("unexpected tool invocation: {tool} {args:?}");
        }
        responses.remove(0).map_err(|msg| BinderError::StageFailed {
            stage,
            tool: tool.to_string(),
            status: "exit status: 1".to_string(),
            stderr: msg,
        })
    }
}

fn pdf_upload(name: &str) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        size: 2048,
        path: PathBuf::from(format!("/tmp/uploads/{name}")),
    }
}

fn arg_strings(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn submit_single_pass_sends_compress_flags_and_ordered_paths() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![Ok(b"%PDF-merged".to_vec())]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("b.pdf"), pdf_upload("a.pdf")]);

    let config = SubmissionConfig::builder()
        .output_name("bundle")
        .build()
        .unwrap();
    let artifact = session.submit(&config).await.unwrap();

    assert_eq!(artifact.filename, "bundle.pdf");
    assert_eq!(artifact.size, 11);
    let stored = std::fs::read(dir.path().join("bundle.pdf")).unwrap();
    assert_eq!(stored, b"%PDF-merged");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool, "convert");
    assert_eq!(calls[0].stage, PipelineStage::Convert);
    assert!(!calls[0].had_stdin);
    assert_eq!(
        calls[0].args,
        arg_strings(&[
            "-density",
            "120x120",
            "-quality",
            "20",
            "-compress",
            "jpeg",
            "/tmp/uploads/a.pdf",
            "/tmp/uploads/b.pdf",
            "pdf:-",
        ])
    );
}

#[tokio::test]
async fn submit_without_compression_omits_the_flags() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![Ok(b"%PDF".to_vec())]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("only.pdf")]);
    let config = SubmissionConfig::builder()
        .compress(false)
        .output_name("raw")
        .build()
        .unwrap();
    session.submit(&config).await.unwrap();

    let calls = runner.calls();
    assert_eq!(
        calls[0].args,
        arg_strings(&["/tmp/uploads/only.pdf", "pdf:-"])
    );
}

#[tokio::test]
async fn removed_entries_never_reach_the_pipeline() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![Ok(b"%PDF".to_vec())]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![
        pdf_upload("a.pdf"),
        pdf_upload("b.pdf"),
        pdf_upload("c.pdf"),
    ]);
    session.toggle_removed(0).unwrap();
    session.toggle_removed(2).unwrap();

    let config = SubmissionConfig::builder()
        .compress(false)
        .output_name("survivor")
        .build()
        .unwrap();
    session.submit(&config).await.unwrap();

    let calls = runner.calls();
    assert_eq!(
        calls[0].args,
        arg_strings(&["/tmp/uploads/b.pdf", "pdf:-"])
    );
}

#[tokio::test]
async fn order_key_ten_precedes_two_in_the_argument_list() {
    // Order keys compare as strings: "10" < "2".
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![Ok(b"%PDF".to_vec())]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("second.pdf"), pdf_upload("tenth.pdf")]);
    let tenth = session
        .paired()
        .iter()
        .position(|p| p.file.original_name == "tenth.pdf")
        .unwrap();
    let second = session
        .paired()
        .iter()
        .position(|p| p.file.original_name == "second.pdf")
        .unwrap();
    session.set_order(tenth, 10).unwrap();
    session.set_order(second, 2).unwrap();

    let config = SubmissionConfig::builder()
        .compress(false)
        .output_name("ordered")
        .build()
        .unwrap();
    session.submit(&config).await.unwrap();

    let calls = runner.calls();
    assert_eq!(
        calls[0].args,
        arg_strings(&["/tmp/uploads/tenth.pdf", "/tmp/uploads/second.pdf", "pdf:-"])
    );
}

#[tokio::test]
async fn name_collision_rejects_before_any_tool_runs() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    store.create("taken", b"%PDF-old").await.unwrap();

    let runner = MockRunner::scripted(vec![]);
    let mut session = Session::new(store, runner.clone());
    session.on_upload_set_changed(vec![pdf_upload("a.pdf")]);

    let config = SubmissionConfig::builder()
        .output_name("taken")
        .build()
        .unwrap();
    let err = session.submit(&config).await.unwrap_err();

    match err {
        BinderError::Validation(fields) => {
            assert!(fields.iter().any(|f| f.field == "output_filename"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(runner.calls().is_empty(), "no tool may run on validation failure");

    // The existing artifact is untouched.
    let stored = std::fs::read(dir.path().join("taken.pdf")).unwrap();
    assert_eq!(stored, b"%PDF-old");
}

#[tokio::test]
async fn unsupported_content_type_is_a_per_file_field_error() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![]);
    let mut session = Session::new(store, runner.clone());

    let mut zip = pdf_upload("archive.zip");
    zip.content_type = "application/zip".to_string();
    session.on_upload_set_changed(vec![pdf_upload("a.pdf"), zip]);

    let err = session
        .submit(&SubmissionConfig::default())
        .await
        .unwrap_err();
    match err {
        BinderError::Validation(fields) => {
            // a.pdf sorts before archive.zip, so the zip is files.1.
            assert!(fields.iter().any(|f| f.field == "files.1.file"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn all_files_removed_is_rejected() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("a.pdf")]);
    session.toggle_removed(0).unwrap();

    let err = session
        .submit(&SubmissionConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn merge_then_compress_runs_both_stages_in_order() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![
        Ok(b"%PDF-merged-intermediate".to_vec()),
        Ok(b"%PDF-final".to_vec()),
    ]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("a.pdf"), pdf_upload("b.pdf")]);
    let config = SubmissionConfig::builder()
        .strategy(PipelineStrategy::MergeThenCompress)
        .output_name("two-stage")
        .build()
        .unwrap();
    let artifact = session.submit(&config).await.unwrap();
    assert_eq!(artifact.filename, "two-stage.pdf");

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].tool, "pdfunite");
    assert_eq!(calls[0].stage, PipelineStage::Merge);
    assert!(!calls[0].had_stdin);
    assert_eq!(
        calls[0].args,
        arg_strings(&["/tmp/uploads/a.pdf", "/tmp/uploads/b.pdf", "/dev/stdout"])
    );

    assert_eq!(calls[1].tool, "convert");
    assert!(calls[1].had_stdin, "compress pass reads the merged PDF from stdin");
    assert_eq!(
        calls[1].args,
        arg_strings(&[
            "-density", "120x120", "-quality", "20", "-compress", "jpeg", "-", "pdf:-",
        ])
    );

    let stored = std::fs::read(dir.path().join("two-stage.pdf")).unwrap();
    assert_eq!(stored, b"%PDF-final");
}

#[tokio::test]
async fn merge_then_compress_without_compression_skips_the_second_stage() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![Ok(b"%PDF-merged".to_vec())]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("a.pdf")]);
    let config = SubmissionConfig::builder()
        .strategy(PipelineStrategy::MergeThenCompress)
        .compress(false)
        .output_name("merged-only")
        .build()
        .unwrap();
    session.submit(&config).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool, "pdfunite");
    let stored = std::fs::read(dir.path().join("merged-only.pdf")).unwrap();
    assert_eq!(stored, b"%PDF-merged");
}

#[tokio::test]
async fn failed_compress_stage_persists_nothing() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![
        Ok(b"%PDF-merged".to_vec()),
        Err("convert: improper image header".to_string()),
    ]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("a.pdf")]);
    let config = SubmissionConfig::builder()
        .strategy(PipelineStrategy::MergeThenCompress)
        .output_name("doomed")
        .build()
        .unwrap();
    let err = session.submit(&config).await.unwrap_err();

    assert!(matches!(err, BinderError::StageFailed { .. }));
    assert!(session.list_outputs().await.unwrap().is_empty());
    assert!(!dir.path().join("doomed.pdf").exists());
}

#[tokio::test]
async fn unnamed_submission_gets_an_opaque_random_name() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![Ok(b"%PDF".to_vec())]);
    let mut session = Session::new(store, runner);

    session.on_upload_set_changed(vec![pdf_upload("a.pdf")]);
    let artifact = session.submit(&SubmissionConfig::default()).await.unwrap();

    let base = artifact.filename.strip_suffix(".pdf").unwrap();
    assert_eq!(base.len(), 16);
    assert!(base.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn preview_of_an_image_returns_raw_bytes_without_tools() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![]);
    let mut session = Session::new(store, runner.clone());

    let image_path = dir.path().join("photo.png");
    std::fs::write(&image_path, b"\x89PNG fake bytes").unwrap();
    session.on_upload_set_changed(vec![UploadedFile {
        original_name: "photo.png".to_string(),
        content_type: "image/png".to_string(),
        size: 15,
        path: image_path,
    }]);

    let bytes = session
        .preview(0, &SubmissionConfig::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bytes, b"\x89PNG fake bytes");
    assert!(runner.calls().is_empty(), "image preview must not spawn tools");
}

#[tokio::test]
async fn preview_of_a_pdf_extracts_page_one_then_rasterises() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![
        Ok(b"%PDF-page-one".to_vec()),
        Ok(b"\xff\xd8jpeg".to_vec()),
    ]);
    let mut session = Session::new(store, runner.clone());

    session.on_upload_set_changed(vec![pdf_upload("doc.pdf")]);
    let bytes = session
        .preview(0, &SubmissionConfig::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bytes, b"\xff\xd8jpeg");

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].tool, "pdfseparate");
    assert_eq!(calls[0].stage, PipelineStage::Extract);
    assert_eq!(
        calls[0].args,
        arg_strings(&["-f", "1", "-l", "1", "/tmp/uploads/doc.pdf", "/dev/stdout"])
    );

    assert_eq!(calls[1].tool, "convert");
    assert!(calls[1].had_stdin);
    assert_eq!(
        calls[1].args,
        arg_strings(&[
            "-density", "120x120", "-quality", "20", "-compress", "jpeg", "-", "jpeg:-",
        ])
    );
}

#[tokio::test]
async fn preview_of_an_unsupported_type_is_none() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![]);
    let mut session = Session::new(store, runner.clone());

    let mut upload = pdf_upload("notes.txt");
    upload.content_type = "text/plain".to_string();
    session.on_upload_set_changed(vec![upload]);

    let result = session
        .preview(0, &SubmissionConfig::default())
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn upload_set_change_discards_manual_edits() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![]);
    let mut session = Session::new(store, runner);

    session.on_upload_set_changed(vec![pdf_upload("a.pdf"), pdf_upload("b.pdf")]);
    session.toggle_removed(0).unwrap();
    session.set_order(1, 99).unwrap();

    session.on_upload_set_changed(vec![
        pdf_upload("a.pdf"),
        pdf_upload("b.pdf"),
        pdf_upload("c.pdf"),
    ]);
    let paired = session.paired();
    assert_eq!(paired.len(), 3);
    assert!(paired.iter().all(|p| !p.removed));
    let orders: Vec<i64> = paired.iter().map(|p| p.order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
}

#[tokio::test]
async fn store_lifecycle_through_the_session() {
    let dir = tempdir().unwrap();
    let store = OutputStore::open(dir.path()).await.unwrap();
    let runner = MockRunner::scripted(vec![
        Ok(b"%PDF-1".to_vec()),
        Ok(b"%PDF-2".to_vec()),
    ]);
    let mut session = Session::new(store, runner);

    session.on_upload_set_changed(vec![pdf_upload("a.pdf")]);
    let first = SubmissionConfig::builder()
        .output_name("first")
        .build()
        .unwrap();
    let second = SubmissionConfig::builder()
        .output_name("second")
        .build()
        .unwrap();
    session.submit(&first).await.unwrap();
    session.submit(&second).await.unwrap();

    let listed = session.list_outputs().await.unwrap();
    assert_eq!(listed.len(), 2);

    // Download streams the stored bytes back.
    use tokio::io::AsyncReadExt;
    let mut file = session.download("first.pdf").await.unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).await.unwrap();
    assert_eq!(bytes, b"%PDF-1");

    session.delete("first.pdf").await.unwrap();
    assert_eq!(session.list_outputs().await.unwrap().len(), 1);

    // Deleting again is a no-op, not an error.
    session.delete("first.pdf").await.unwrap();

    let removed = session.delete_all().await.unwrap();
    assert_eq!(removed, 1);
    assert!(session.list_outputs().await.unwrap().is_empty());
}
