//! Overlays: informational output for each frame

use sortline_core::{FrameAnnotation, Overlay, OverlayAction};
use tracing::info;

/// Headless overlay that logs the verdict banner whenever it changes
#[derive(Debug, Default)]
pub struct LogOverlay {
    last_banner: Option<String>,
    rendered: u64,
}

impl LogOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn last_banner(&self) -> Option<&str> {
        self.last_banner.as_deref()
    }
}

impl<F> Overlay<F> for LogOverlay {
    fn render(&mut self, _frame: &mut F, annotation: Option<&FrameAnnotation>) -> OverlayAction {
        self.rendered += 1;

        let banner = annotation.and_then(|a| a.verdict.banner());
        if banner != self.last_banner {
            if let Some(text) = &banner {
                info!("{}", text);
            }
            self.last_banner = banner;
        }

        OverlayAction::Continue
    }

    fn close(&mut self) {
        info!("Overlay closed after {} frames", self.rendered);
    }
}

#[cfg(feature = "camera")]
pub use window::WindowOverlay;

#[cfg(feature = "camera")]
mod window {
    use super::*;
    use crate::config::VisionConfig;
    use opencv::core::{Mat, Point, Rect, Scalar};
    use opencv::prelude::*;
    use opencv::{highgui, imgproc};
    use tracing::warn;

    /// OpenCV preview window with the detection box, label and banner
    pub struct WindowOverlay {
        title: String,
        exit_key: i32,
        open: bool,
    }

    impl WindowOverlay {
        pub fn new(config: &VisionConfig) -> Self {
            Self {
                title: config.window_title.clone(),
                exit_key: config.exit_key,
                open: false,
            }
        }

        fn draw(&self, frame: &mut Mat, annotation: &FrameAnnotation) -> opencv::Result<()> {
            let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
            let cyan = Scalar::new(255.0, 255.0, 0.0, 0.0);
            let width = frame.cols().max(0) as u32;
            let height = frame.rows().max(0) as u32;

            let rect = annotation.detection.bbox.to_pixels(width, height);
            imgproc::rectangle(
                frame,
                Rect::new(rect.xmin, rect.ymin, rect.width(), rect.height()),
                green,
                2,
                imgproc::LINE_8,
                0,
            )?;
            imgproc::put_text(
                frame,
                &annotation.detection.label(),
                Point::new(rect.xmin, (rect.ymin - 10).max(12)),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.5,
                green,
                2,
                imgproc::LINE_8,
                false,
            )?;

            if let Some(banner) = annotation.verdict.banner() {
                imgproc::put_text(
                    frame,
                    &banner,
                    Point::new(10, 30),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    0.6,
                    cyan,
                    2,
                    imgproc::LINE_8,
                    false,
                )?;
            }
            Ok(())
        }
    }

    impl Overlay<Mat> for WindowOverlay {
        fn render(&mut self, frame: &mut Mat, annotation: Option<&FrameAnnotation>) -> OverlayAction {
            if let Some(annotation) = annotation {
                if let Err(e) = self.draw(frame, annotation) {
                    warn!("Failed to draw overlay: {}", e);
                }
            }

            if let Err(e) = highgui::imshow(&self.title, &*frame) {
                warn!("Failed to show frame: {}", e);
                return OverlayAction::Continue;
            }
            self.open = true;

            match highgui::wait_key(1) {
                Ok(key) if key == self.exit_key => OverlayAction::Exit,
                Ok(_) => OverlayAction::Continue,
                Err(e) => {
                    warn!("wait_key failed: {}", e);
                    OverlayAction::Continue
                }
            }
        }

        fn close(&mut self) {
            if !self.open {
                return;
            }
            self.open = false;
            if let Err(e) = highgui::destroy_all_windows() {
                warn!("Failed to destroy windows: {}", e);
            }
        }
    }
}
