//! First-page preview: a displayable image for a single candidate file.
//!
//! Images are served back untouched. PDFs get page 1 extracted with
//! `pdfseparate` and rasterised to JPEG through `convert`, with the same
//! compression flags a submission would use when `compress` is set. Any
//! other content type yields `None` — the transport shell shows nothing.
//!
//! A preview failure never touches stored artifacts; the request simply
//! errors out.

use tokio::fs;

use crate::config::SubmissionConfig;
use crate::error::{BinderError, PipelineStage};
use crate::ordering::UploadedFile;
use crate::pipeline::process::{ProcessRunner, CONVERT_TOOL, SEPARATE_TOOL};
use crate::pipeline::produce::compress_args;

/// Produce preview bytes for one uploaded file, or `None` when the type has
/// no preview.
pub async fn preview(
    runner: &dyn ProcessRunner,
    file: &UploadedFile,
    config: &SubmissionConfig,
) -> Result<Option<Vec<u8>>, BinderError> {
    if file.content_type.starts_with("image/") {
        let bytes = fs::read(&file.path).await.map_err(|source| BinderError::Io {
            path: file.path.clone(),
            source,
        })?;
        return Ok(Some(bytes));
    }

    if file.content_type == "application/pdf" {
        return Ok(Some(first_page_raster(runner, file, config).await?));
    }

    Ok(None)
}

/// Extract page 1 of a PDF and rasterise it to JPEG bytes.
async fn first_page_raster(
    runner: &dyn ProcessRunner,
    file: &UploadedFile,
    config: &SubmissionConfig,
) -> Result<Vec<u8>, BinderError> {
    let separate_argv = vec![
        "-f".to_string(),
        "1".to_string(),
        "-l".to_string(),
        "1".to_string(),
        file.path.to_string_lossy().into_owned(),
        "/dev/stdout".to_string(),
    ];

    let page = runner
        .run(
            PipelineStage::Extract,
            SEPARATE_TOOL,
            &separate_argv,
            None,
            config.command_timeout_secs,
        )
        .await?;

    let mut convert_argv = Vec::new();
    if config.compress {
        convert_argv.extend(compress_args(config));
    }
    convert_argv.push("-".to_string()); // piped input
    convert_argv.push("jpeg:-".to_string());

    runner
        .run(
            PipelineStage::Convert,
            CONVERT_TOOL,
            &convert_argv,
            Some(&page),
            config.command_timeout_secs,
        )
        .await
}
