//! PNG to JPEG conversion.
//!
//! Each eligible asset goes through decode, JPEG encode, optimize, stage,
//! verify and promote. A failure at any step is recorded on that asset's
//! result and the rest of the batch carries on.

use crate::asset::Asset;
use crate::error::{AssetError, AssetErrorKind};
use crate::fs::StagedFile;
use crate::result::{ConversionResult, SkipReason};
use pngoptim_core::config::ConversionConfig;
use pngoptim_core::{Error, ErrorCode};
use pngoptim_image::{Codec, Optimizer};
use rayon::prelude::*;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Encoding and verification settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionOptions {
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Largest accepted output size as a fraction of the source size
    pub max_output_ratio: f64,
    /// Worker threads; 0 uses the available parallelism
    pub jobs: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::from(&ConversionConfig::default())
    }
}

impl From<&ConversionConfig> for ConversionOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            quality: config.quality,
            max_output_ratio: config.max_output_ratio,
            jobs: config.jobs,
        }
    }
}

/// Shared flag that stops a run from starting new assets.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Converts assets with an injected codec and optimizer.
#[derive(Clone)]
pub struct Converter {
    codec: Arc<dyn Codec>,
    optimizer: Arc<dyn Optimizer>,
    options: ConversionOptions,
}

impl Converter {
    pub fn new(codec: Arc<dyn Codec>, optimizer: Arc<dyn Optimizer>, options: ConversionOptions) -> Self {
        Self {
            codec,
            optimizer,
            options,
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// The codec, for callers that need to decode outside a conversion
    pub fn codec(&self) -> Arc<dyn Codec> {
        Arc::clone(&self.codec)
    }

    /// Name of the optimizer in use
    pub fn optimizer_name(&self) -> &str {
        self.optimizer.name()
    }

    /// Turn PNG bytes into optimized JPEG bytes. No filesystem access.
    pub fn transcode(&self, png: &[u8]) -> Result<Vec<u8>, AssetError> {
        let decoded = self.codec.decode(png).map_err(|e| AssetError::from_image(&e))?;
        let encoded = self
            .codec
            .encode_jpeg(&decoded, self.options.quality)
            .map_err(|e| AssetError::new(AssetErrorKind::EncodeFailure, e.to_string()))?;

        let optimized = self
            .optimizer
            .optimize(&encoded)
            .map_err(|e| AssetError::new(AssetErrorKind::OptimizeFailure, e.to_string()))?;

        if optimized.is_empty() || optimized.len() > encoded.len() {
            tracing::debug!(
                encoded = encoded.len(),
                optimized = optimized.len(),
                optimizer = self.optimizer.name(),
                "keeping unoptimized encoding"
            );
            return Ok(encoded);
        }
        Ok(optimized)
    }

    /// Convert one asset and write `<name>.jpg` next to it.
    ///
    /// The source file is never touched.
    pub fn convert(&self, asset: &Asset) -> ConversionResult {
        match self.try_convert(asset) {
            Ok((path, len)) => {
                tracing::debug!(
                    asset = %asset.path.display(),
                    output = %path.display(),
                    before = asset.byte_size,
                    after = len,
                    "converted"
                );
                ConversionResult::converted(asset, path, len)
            }
            Err(error) => {
                tracing::warn!(asset = %asset.path.display(), error = %error, "conversion failed");
                ConversionResult::failed(asset, error)
            }
        }
    }

    fn try_convert(&self, asset: &Asset) -> Result<(std::path::PathBuf, u64), AssetError> {
        let output = asset.jpeg_path();
        if output == asset.path {
            return Err(AssetError::conflict(format!(
                "{} already has a .jpg name",
                asset.path.display()
            )));
        }
        if std::fs::symlink_metadata(&output).is_ok() {
            return Err(AssetError::conflict(format!("{} already exists", output.display())));
        }

        let source = std::fs::read(&asset.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AssetError::missing(&asset.path),
            _ => AssetError::io(&e),
        })?;
        let source_len = source.len() as u64;
        let jpeg = self.transcode(&source)?;

        let staged = StagedFile::stage(&output, &jpeg)
            .map_err(|e| AssetError::verification(e.message))?;
        if staged.is_empty() {
            return Err(AssetError::verification("encoded output is empty"));
        }
        if staged.len() != jpeg.len() as u64 {
            return Err(AssetError::verification(format!(
                "short write: {} of {} bytes",
                staged.len(),
                jpeg.len()
            )));
        }
        let limit = (source_len as f64 * self.options.max_output_ratio).floor() as u64;
        if staged.len() > limit {
            return Err(AssetError::verification(format!(
                "output is {} bytes, limit is {} bytes",
                staged.len(),
                limit
            )));
        }

        let len = staged.len();
        let path = staged.commit_new().map_err(|e| match e.code {
            ErrorCode::FileExists => {
                AssetError::conflict(format!("{} appeared during conversion", output.display()))
            }
            _ => AssetError::verification(e.message),
        })?;
        Ok((path, len))
    }

    /// Convert a batch on a bounded thread pool.
    ///
    /// Assets not started when `cancel` fires are reported as cancelled.
    /// `on_result` is called from worker threads as each asset finishes.
    /// Results come back in input order.
    pub fn convert_all<F>(
        &self,
        assets: &[Asset],
        cancel: &CancelToken,
        on_result: F,
    ) -> pngoptim_core::Result<Vec<ConversionResult>>
    where
        F: Fn(&ConversionResult) + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .thread_name(|i| format!("pngoptim-worker-{}", i))
            .build()
            .map_err(|e| {
                Error::new(ErrorCode::Internal, format!("Failed to start worker pool: {}", e))
                    .with_source(e)
            })?;

        tracing::info!(
            assets = assets.len(),
            threads = pool.current_num_threads(),
            quality = self.options.quality,
            optimizer = self.optimizer.name(),
            "converting"
        );

        let results = pool.install(|| {
            assets
                .par_iter()
                .map(|asset| {
                    let result = if cancel.is_cancelled() {
                        ConversionResult::skipped(asset, SkipReason::Cancelled)
                    } else {
                        self.convert(asset)
                    };
                    on_result(&result);
                    result
                })
                .collect()
        });
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Outcome;
    use chrono::Utc;
    use image::{DynamicImage, Rgb, RgbImage};
    use pngoptim_image::{ImageCodec, ImageError, ImageFormat, Passthrough};
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Gradient with grain so the PNG is large and the JPEG much smaller.
    fn noisy_png(size: u32) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        let img = RgbImage::from_fn(size, size, |x, y| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let grain = ((state >> 16) as u8) % 24;
            Rgb([
                (x as u8).wrapping_mul(2).wrapping_add(grain),
                (y as u8).wrapping_mul(2).wrapping_add(grain),
                ((x + y) as u8).wrapping_add(grain),
            ])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn asset_at(path: &Path) -> Asset {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Asset {
            path: path.to_path_buf(),
            references: Vec::new(),
            format: ImageFormat::Png,
            byte_size: size,
            width: 0,
            height: 0,
            has_alpha: false,
            bit_depth: Some(8),
            has_color_profile: false,
            discovered_at: Utc::now(),
        }
    }

    fn converter(optimizer: Arc<dyn Optimizer>) -> Converter {
        Converter::new(
            Arc::new(ImageCodec),
            optimizer,
            ConversionOptions {
                quality: 75,
                max_output_ratio: 1.0,
                jobs: 2,
            },
        )
    }

    struct Growing;

    impl Optimizer for Growing {
        fn name(&self) -> &str {
            "growing"
        }

        fn optimize(&self, data: &[u8]) -> pngoptim_image::Result<Vec<u8>> {
            let mut out = data.to_vec();
            out.extend_from_slice(&[0; 64]);
            Ok(out)
        }
    }

    struct Broken;

    impl Optimizer for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn optimize(&self, _data: &[u8]) -> pngoptim_image::Result<Vec<u8>> {
            Err(ImageError::OptimizerFailed("exit status 2".into()))
        }
    }

    fn temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_transcode_is_deterministic() {
        let png = noisy_png(64);
        let c = converter(Arc::new(Passthrough));
        assert_eq!(c.transcode(&png).unwrap(), c.transcode(&png).unwrap());
    }

    #[test]
    fn test_growing_optimizer_output_is_discarded() {
        let png = noisy_png(32);
        let plain = converter(Arc::new(Passthrough)).transcode(&png).unwrap();
        let grown = converter(Arc::new(Growing)).transcode(&png).unwrap();
        assert_eq!(plain, grown);
    }

    #[test]
    fn test_convert_writes_jpeg_and_keeps_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("hero.png");
        fs::write(&source, noisy_png(128)).unwrap();

        let result = converter(Arc::new(Passthrough)).convert(&asset_at(&source));
        assert_eq!(result.outcome, Outcome::Converted);
        assert_eq!(result.output_path.as_deref(), Some(dir.path().join("hero.jpg").as_path()));
        assert!(result.byte_delta() > 0);
        assert!(source.exists());
        let written = fs::read(dir.path().join("hero.jpg")).unwrap();
        assert_eq!(pngoptim_image::detect_format(&written), ImageFormat::Jpeg);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_existing_jpeg_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("hero.png");
        fs::write(&source, noisy_png(96)).unwrap();
        fs::write(dir.path().join("hero.jpg"), b"keep me").unwrap();

        let result = converter(Arc::new(Passthrough)).convert(&asset_at(&source));
        match result.outcome {
            Outcome::Failed(e) => assert_eq!(e.kind, AssetErrorKind::OutputConflict),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(fs::read(dir.path().join("hero.jpg")).unwrap(), b"keep me");
        assert!(source.exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_optimizer_failure_is_per_asset() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, noisy_png(32)).unwrap();

        let result = converter(Arc::new(Broken)).convert(&asset_at(&source));
        match result.outcome {
            Outcome::Failed(e) => assert_eq!(e.kind, AssetErrorKind::OptimizeFailure),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!dir.path().join("a.jpg").exists());
    }

    #[test]
    fn test_ratio_limit_rejects_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, noisy_png(64)).unwrap();

        let mut c = converter(Arc::new(Passthrough));
        c.options.max_output_ratio = 0.0001;
        let result = c.convert(&asset_at(&source));
        match result.outcome {
            Outcome::Failed(e) => assert_eq!(e.kind, AssetErrorKind::WriteVerificationFailure),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!dir.path().join("a.jpg").exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_jpg_named_png_conflicts() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("odd.jpg");
        fs::write(&source, noisy_png(16)).unwrap();

        let result = converter(Arc::new(Passthrough)).convert(&asset_at(&source));
        match result.outcome {
            Outcome::Failed(e) => assert_eq!(e.kind, AssetErrorKind::OutputConflict),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_batch_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let assets: Vec<Asset> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("{}.png", i));
                fs::write(&path, noisy_png(16)).unwrap();
                asset_at(&path)
            })
            .collect();

        let cancel = CancelToken::new();
        cancel.cancel();
        let seen = AtomicUsize::new(0);
        let results = converter(Arc::new(Passthrough))
            .convert_all(&assets, &cancel, |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert!(results
            .iter()
            .all(|r| r.outcome == Outcome::Skipped(SkipReason::Cancelled)));
        assert!(!dir.path().join("0.jpg").exists());
    }

    #[test]
    fn test_batch_preserves_order() {
        let dir = TempDir::new().unwrap();
        let assets: Vec<Asset> = ["b", "a", "c"]
            .iter()
            .map(|name| {
                let path = dir.path().join(format!("{}.png", name));
                fs::write(&path, noisy_png(96)).unwrap();
                asset_at(&path)
            })
            .collect();

        let results = converter(Arc::new(Passthrough))
            .convert_all(&assets, &CancelToken::new(), |_| {})
            .unwrap();
        let sources: Vec<_> = results.iter().map(|r| r.source.clone()).collect();
        let expected: Vec<_> = assets.iter().map(|a| a.path.clone()).collect();
        assert_eq!(sources, expected);
        assert!(results.iter().all(ConversionResult::is_converted));
    }
}
