//! Still-image conversion with the `image` crate.

use std::path::{Path, PathBuf};

use ::image::{DynamicImage, ImageFormat, ImageReader};
use tokio_util::sync::CancellationToken;

use mc_core::config::ConversionConfig;
use mc_core::{Error, JobId, MediaKind};

use crate::adapter::{ensure_directory, Adapter, ConversionFuture, JobTable};
use crate::job::ConversionJob;
use crate::progress::ProgressSink;

/// Adapter for image jobs.
///
/// Decodes and re-encodes on the blocking pool. Progress is 0 at start and
/// 100 on completion, with nothing in between.
#[derive(Debug, Clone)]
pub struct ImageAdapter {
    jobs: JobTable,
    overwrite: bool,
}

impl Default for ImageAdapter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ImageAdapter {
    pub fn new(overwrite: bool) -> Self {
        Self {
            jobs: JobTable::default(),
            overwrite,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.overwrite)
    }

    /// Number of jobs currently tracked by this adapter.
    pub fn active_count(&self) -> usize {
        self.jobs.len()
    }
}

/// Resolve a writable [`ImageFormat`] from an extension-like name.
fn output_format(name: &str) -> mc_core::Result<ImageFormat> {
    ImageFormat::from_extension(name)
        .filter(|format| format.writing_enabled())
        .ok_or_else(|| Error::UnsupportedFormat {
            kind: MediaKind::Image,
            format: name.to_string(),
        })
}

impl Adapter for ImageAdapter {
    fn name(&self) -> &'static str {
        "image"
    }

    fn convert(&self, job: ConversionJob, progress: ProgressSink) -> ConversionFuture {
        let guard = self.jobs.register(&job.id);
        let overwrite = self.overwrite;

        Box::pin(async move { run(&job, &progress, &guard.token, overwrite).await })
    }

    fn cancel(&self, id: &JobId) -> bool {
        let cancelled = self.jobs.cancel(id);
        if cancelled {
            tracing::debug!(job_id = %id, "Image cancel requested");
        }
        cancelled
    }
}

async fn run(
    job: &ConversionJob,
    progress: &ProgressSink,
    token: &CancellationToken,
    overwrite: bool,
) -> mc_core::Result<PathBuf> {
    let format = output_format(&job.output_format)?;
    ensure_directory(&job.save_directory).await?;
    progress.send(&job.id, 0.0);

    let output = job.output_path();
    tracing::info!(
        job_id = %job.id,
        "Converting image {} -> {}",
        job.source_path.display(),
        output.display()
    );

    let task = {
        let source = job.source_path.clone();
        let output = output.clone();
        let token = token.clone();
        tokio::task::spawn_blocking(move || transform(&source, &output, format, overwrite, &token))
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => return Err(Error::cancelled(&job.id)),
        joined = task => joined.map_err(|e| Error::Internal(format!("image task failed: {e}")))??,
    }

    if token.is_cancelled() {
        return Err(Error::cancelled(&job.id));
    }
    progress.send(&job.id, 100.0);
    Ok(output)
}

/// Decode `source` and write it to `output` as `format`.
fn transform(
    source: &Path,
    output: &Path,
    format: ImageFormat,
    overwrite: bool,
    token: &CancellationToken,
) -> mc_core::Result<()> {
    let decoded = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| Error::tool("image", format!("failed to decode {}: {e}", source.display())))?;

    if token.is_cancelled() {
        return Ok(());
    }
    if !overwrite && output.exists() {
        return Err(Error::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", output.display()),
            ),
        });
    }

    encodable(decoded, format)
        .save_with_format(output, format)
        .map_err(|e| Error::tool("image", format!("failed to encode {}: {e}", output.display())))
}

/// Convert to a colour type the target encoder accepts.
fn encodable(image: DynamicImage, format: ImageFormat) -> DynamicImage {
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::WebP | ImageFormat::Ico | ImageFormat::Gif | ImageFormat::Bmp => {
            DynamicImage::ImageRgba8(image.to_rgba8())
        }
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use ::image::{Rgba, RgbaImage};

    fn write_png(path: &Path) {
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 128, 200]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink = ProgressSink::new(move |_, pct| seen_clone.lock().unwrap().push(pct));
        (sink, seen)
    }

    #[tokio::test]
    async fn png_to_jpeg_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        write_png(&source);
        let save_dir = dir.path().join("converted").join("nested");

        let adapter = ImageAdapter::default();
        let (sink, seen) = recording_sink();
        let job = ConversionJob::new("img", MediaKind::Image, &source, "jpg", &save_dir);

        let output = adapter.convert(job, sink).await.unwrap();

        assert_eq!(output, save_dir.join("photo.jpg"));
        let written = ::image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (8, 8));
        assert_eq!(ImageFormat::from_path(&output).unwrap(), ImageFormat::Jpeg);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 100.0]);
        assert_eq!(adapter.active_count(), 0);
    }

    #[tokio::test]
    async fn unknown_format_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ImageAdapter::default();
        let (sink, seen) = recording_sink();
        let job = ConversionJob::new("img", MediaKind::Image, dir.path().join("a.png"), "xyz", dir.path());

        let err = adapter.convert(job, sink).await.unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedFormat { kind: MediaKind::Image, ref format } if format == "xyz"),
            "got: {err}"
        );
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(adapter.active_count(), 0);
    }

    #[tokio::test]
    async fn undecodable_source_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let adapter = ImageAdapter::default();
        let job = ConversionJob::new("img", MediaKind::Image, &source, "png", dir.path().join("out"));
        let err = adapter.convert(job, ProgressSink::noop()).await.unwrap_err();
        assert!(matches!(err, Error::Tool { ref tool, .. } if tool == "image"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ImageAdapter::default();
        let job = ConversionJob::new("img", MediaKind::Image, dir.path().join("nope.png"), "png", dir.path());
        let err = adapter.convert(job, ProgressSink::noop()).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn existing_output_kept_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("pic.png");
        write_png(&source);
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        std::fs::write(out_dir.join("pic.bmp"), b"keep me").unwrap();

        let adapter = ImageAdapter::new(false);
        let job = ConversionJob::new("img", MediaKind::Image, &source, "bmp", &out_dir);
        let err = adapter.convert(job, ProgressSink::noop()).await.unwrap_err();

        assert!(matches!(err, Error::Io { .. }), "got: {err}");
        assert_eq!(std::fs::read(out_dir.join("pic.bmp")).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn cancel_before_start_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("pic.png");
        write_png(&source);
        let out_dir = dir.path().join("out");

        let adapter = ImageAdapter::default();
        let future = adapter.convert(
            ConversionJob::new("img", MediaKind::Image, &source, "png", &out_dir),
            ProgressSink::noop(),
        );
        assert!(adapter.cancel(&JobId::from("img")));

        let err = future.await.unwrap_err();
        assert!(err.is_cancelled(), "got: {err}");
        assert!(!out_dir.join("pic.png").exists());
    }

    #[test]
    fn cancel_unknown_is_false() {
        assert!(!ImageAdapter::default().cancel(&JobId::from("nothing")));
    }

    #[test]
    fn format_resolution() {
        for name in ["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp", "ico", "PNG"] {
            assert!(output_format(name).is_ok(), "{name} should be writable");
        }
        assert!(output_format("xyz").is_err());
    }
}
