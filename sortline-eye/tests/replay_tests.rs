//! Replay source feeding the preprocessing path

use image::{Rgb, RgbImage};
use sortline_core::{FrameSource, Overlay, OverlayAction};
use sortline_eye::{ChannelOrder, ImageSequenceSource, LogOverlay, TensorInput, VisionConfig};
use tempfile::TempDir;

#[test]
fn test_replayed_frames_become_model_input() {
    let dir = TempDir::new().unwrap();
    for (i, shade) in [0u8, 128, 255].iter().enumerate() {
        RgbImage::from_pixel(32, 24, Rgb([*shade, 0, 0]))
            .save(dir.path().join(format!("frame_{:02}.png", i)))
            .unwrap();
    }

    let config = VisionConfig::default();
    let mut source = ImageSequenceSource::open(dir.path()).unwrap();
    let mut overlay = LogOverlay::new();

    let mut reds = Vec::new();
    while let Ok(mut frame) = source.acquire() {
        assert_eq!(TensorInput::dimensions(&frame), (32, 24));
        let tensor = frame.to_input_tensor(config.input_size, ChannelOrder::Rgb).unwrap();
        assert_eq!(tensor.len(), 224 * 224 * 3);
        reds.push(tensor[0]);
        assert_eq!(overlay.render(&mut frame, None), OverlayAction::Continue);
    }
    source.release();

    assert_eq!(reds.len(), 3);
    assert!(reds[0] < reds[1] && reds[1] < reds[2]);
    assert!((reds[2] - 1.0).abs() < 1e-6);
    assert_eq!(overlay.rendered(), 3);
}

#[test]
fn test_bgr_order_moves_red_last() {
    let frame = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
    let tensor = frame.to_input_tensor((4, 4), ChannelOrder::Bgr).unwrap();
    assert_eq!(&tensor[..3], &[0.0, 0.0, 1.0]);
}
