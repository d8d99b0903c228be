use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{ImageError, RgbaImage};
use plate_capture_core::{CaptureConfiguration, CaptureDevice, DeviceError, FrameDimensions, VideoStream};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A `CaptureDevice` that plays image files in a loop.
///
/// Every snapshot presents the next file. The stream's native size is the
/// first file's size.
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    paths: Vec<PathBuf>,
    max_resolution: Option<FrameDimensions>,
}

impl StillImageDevice {
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            max_resolution: None,
        }
    }

    /// Every PNG/JPEG directly inside `dir`, in name order.
    pub fn from_directory(dir: &Path) -> io::Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();
        Ok(Self::from_paths(paths))
    }

    /// Reject requests above this resolution, like a camera with a sensor limit.
    pub fn with_max_resolution(mut self, max: FrameDimensions) -> Self {
        self.max_resolution = Some(max);
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn load(path: &Path) -> Result<RgbaImage, DeviceError> {
        match image::open(path) {
            Ok(image) => Ok(image.to_rgba8()),
            Err(ImageError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::error!("Image {} not found", path.display());
                Err(DeviceError::NotFound)
            }
            Err(e) => {
                log::error!("Image {} unreadable: {}", path.display(), e);
                Err(DeviceError::Other(format!("{}: {}", path.display(), e)))
            }
        }
    }
}

impl CaptureDevice for StillImageDevice {
    fn is_supported(&self) -> bool {
        !self.paths.is_empty()
    }

    fn open_stream(&mut self, config: &CaptureConfiguration) -> Result<Box<dyn VideoStream>, DeviceError> {
        if let Some(max) = self.max_resolution {
            if config.ideal_width > max.width {
                return Err(DeviceError::Overconstrained("width".into()));
            }
            if config.ideal_height > max.height {
                return Err(DeviceError::Overconstrained("height".into()));
            }
        }

        let frames = self
            .paths
            .iter()
            .map(|path| Self::load(path))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Loaded {} still frame(s)", frames.len());

        Ok(Box::new(StillImageStream {
            frames,
            cursor: AtomicUsize::new(0),
            playing: false,
        }))
    }

    fn label(&self) -> String {
        format!("still images ({} files)", self.paths.len())
    }
}

struct StillImageStream {
    frames: Vec<RgbaImage>,
    cursor: AtomicUsize,
    playing: bool,
}

impl VideoStream for StillImageStream {
    fn wait_ready(&mut self, _timeout: Duration) -> Result<FrameDimensions, DeviceError> {
        let first = self
            .frames
            .first()
            .ok_or_else(|| DeviceError::Other("no frames to present".into()))?;
        Ok(FrameDimensions::new(first.width(), first.height()))
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        if self.frames.is_empty() {
            return Err(DeviceError::Other("no frames to present".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn copy_presented_frame(&self) -> Option<RgbaImage> {
        if !self.playing || self.frames.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        self.frames.get(index).cloned()
    }

    fn stop_tracks(&mut self) {
        self.playing = false;
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use plate_capture_core::{CaptureError, ExecutionContext, FrameSource};

    use super::*;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, shade: u8) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn loops_over_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 64, 32, 200);
        write_image(dir.path(), "a.png", 64, 32, 10);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut device = StillImageDevice::from_directory(dir.path()).unwrap();
        assert_eq!(device.paths().len(), 2);

        let mut stream = device.open_stream(&CaptureConfiguration::default()).unwrap();
        assert_eq!(stream.wait_ready(Duration::from_secs(1)).unwrap(), FrameDimensions::new(64, 32));
        assert!(stream.copy_presented_frame().is_none());

        stream.play().unwrap();
        let shades: Vec<u8> = (0..3)
            .map(|_| stream.copy_presented_frame().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 200, 10]);

        stream.stop_tracks();
        stream.stop_tracks();
        assert!(stream.copy_presented_frame().is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = StillImageDevice::from_paths([dir.path().join("gone.png")]);
        assert_eq!(
            device.open_stream(&CaptureConfiguration::default()).err(),
            Some(DeviceError::NotFound)
        );
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let mut device = StillImageDevice::from_paths([path]);
        assert!(matches!(
            device.open_stream(&CaptureConfiguration::default()),
            Err(DeviceError::Other(message)) if message.contains("broken.png")
        ));
    }

    #[test]
    fn empty_device_is_unsupported() {
        let source = FrameSource::new(
            StillImageDevice::from_paths(Vec::<PathBuf>::new()),
            ExecutionContext::local(),
        );
        assert_eq!(
            source.start(&CaptureConfiguration::default()),
            Err(CaptureError::Unsupported)
        );
    }

    #[test]
    fn frame_source_falls_back_below_sensor_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "frame.png", 640, 480, 128);
        let device = StillImageDevice::from_paths([path]).with_max_resolution(FrameDimensions::new(800, 600));
        let source = FrameSource::new(device, ExecutionContext::local());

        let dims = source.start(&CaptureConfiguration::default()).unwrap();

        assert_eq!(dims, FrameDimensions::new(640, 480));
        let snapshot = source.capture_snapshot().unwrap();
        assert_eq!(snapshot.dimensions(), dims);
        source.stop();
        assert!(source.state().is_idle());
    }
}
