//! Turning the ordered input paths into the final PDF bytes.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::{PipelineStrategy, SubmissionConfig};
use crate::error::{BinderError, PipelineStage};
use crate::pipeline::process::{ProcessRunner, CONVERT_TOOL, MERGE_TOOL};

/// Compression flags shared by every compressing invocation:
/// `-density {d}x{d} -quality {q} -compress jpeg`.
pub fn compress_args(config: &SubmissionConfig) -> Vec<String> {
    vec![
        "-density".to_string(),
        format!("{0}x{0}", config.image_density),
        "-quality".to_string(),
        config.quality.to_string(),
        "-compress".to_string(),
        "jpeg".to_string(),
    ]
}

/// Run the configured strategy over the ordered paths and return the final
/// PDF bytes.
///
/// Failure of any stage fails the whole operation; in Strategy B the merged
/// intermediate is discarded when the compress stage fails — it exists only
/// in memory and never reaches the store.
pub async fn produce(
    runner: &dyn ProcessRunner,
    paths: &[PathBuf],
    config: &SubmissionConfig,
) -> Result<Vec<u8>, BinderError> {
    let start = Instant::now();
    let bytes = match config.strategy {
        PipelineStrategy::ConvertOnly => convert_single_pass(runner, paths, config).await?,
        PipelineStrategy::MergeThenCompress => merge_then_compress(runner, paths, config).await?,
    };
    info!(
        strategy = ?config.strategy,
        inputs = paths.len(),
        output_bytes = bytes.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "pipeline produced output"
    );
    Ok(bytes)
}

/// Strategy A: one `convert` invocation, compression flags inline,
/// PDF to stdout.
async fn convert_single_pass(
    runner: &dyn ProcessRunner,
    paths: &[PathBuf],
    config: &SubmissionConfig,
) -> Result<Vec<u8>, BinderError> {
    let mut args = Vec::new();
    if config.compress {
        args.extend(compress_args(config));
    }
    args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
    args.push("pdf:-".to_string()); // output to stdout

    runner
        .run(
            PipelineStage::Convert,
            CONVERT_TOOL,
            &args,
            None,
            config.command_timeout_secs,
        )
        .await
}

/// Strategy B: merge first, then optionally pipe the merged PDF through a
/// compressing `convert` pass.
async fn merge_then_compress(
    runner: &dyn ProcessRunner,
    paths: &[PathBuf],
    config: &SubmissionConfig,
) -> Result<Vec<u8>, BinderError> {
    let mut merge_argv: Vec<String> = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    merge_argv.push("/dev/stdout".to_string());

    let merged = runner
        .run(
            PipelineStage::Merge,
            MERGE_TOOL,
            &merge_argv,
            None,
            config.command_timeout_secs,
        )
        .await?;

    if !config.compress {
        return Ok(merged);
    }

    debug!(merged_bytes = merged.len(), "piping merged PDF into compress stage");

    let mut convert_argv = compress_args(config);
    convert_argv.push("-".to_string()); // piped input
    convert_argv.push("pdf:-".to_string());

    runner
        .run(
            PipelineStage::Convert,
            CONVERT_TOOL,
            &convert_argv,
            Some(&merged),
            config.command_timeout_secs,
        )
        .await
}
