//! Face Detector
//!
//! Locates the face to classify using an UltraFace-style ONNX detector
//! (the `version-RFB-320` export).
//!
//! Input: RGB tensor `[1, 3, 240, 320]`, normalized as `(v - 127) / 128`
//! Outputs: `scores` `[1, N, 2]` (background, face) and `boxes` `[1, N, 4]`
//! with corners relative to the image size

use crate::error::{AppError, Result};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const INPUT_WIDTH: u32 = 320;
const INPUT_HEIGHT: u32 = 240;

/// Minimum face confidence for a detection to count
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

/// Face location in pixels of the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Finds the face to classify in a picture
pub trait FaceDetector: Send + Sync {
    /// The most confident face, or `None` when the picture has no face.
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceBox>>;
}

pub struct OnnxFaceDetector {
    session: Mutex<Option<Session>>,
    score_threshold: f32,
}

impl OnnxFaceDetector {
    pub fn load(model_path: &Path, intra_threads: usize) -> Result<Self> {
        info!("Loading face detector from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| internal(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| internal(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(intra_threads)
            .map_err(|e| internal(format!("Failed to set threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| internal(format!("Failed to load face detector: {}", e)))?;

        Ok(Self {
            session: Mutex::new(Some(session)),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        })
    }

    pub fn shutdown(&self) {
        let released = match self.session.lock() {
            Ok(mut guard) => guard.take().is_some(),
            Err(poisoned) => poisoned.into_inner().take().is_some(),
        };

        if released {
            info!("Face detector released");
        }
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceBox>> {
        use ort::value::Tensor;

        let input_tensor = Tensor::from_array(detector_input(image))
            .map_err(|e| internal(format!("Failed to create input tensor: {}", e)))?;

        let mut guard = self
            .session
            .lock()
            .map_err(|_| internal("Face detector lock poisoned".to_string()))?;
        let session = guard.as_mut().ok_or_else(|| {
            AppError::CapabilityUnavailable("Face detector has been shut down".to_string())
        })?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| AppError::Classification(format!("Face detection failed: {}", e)))?;

        let mut scores = Vec::new();
        let mut boxes = Vec::new();
        for (name, value) in outputs.into_iter() {
            let (_, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                AppError::Classification(format!("Failed to extract {}: {}", name, e))
            })?;
            match &*name {
                "scores" => scores = data.to_vec(),
                "boxes" => boxes = data.to_vec(),
                _ => {}
            }
        }

        let (width, height) = image.dimensions();
        let face = best_face(&scores, &boxes, self.score_threshold, width, height);
        debug!("Face detection result: {:?}", face);

        Ok(face)
    }
}

/// Resize to the detector's input and lay the pixels out as normalized NCHW
fn detector_input(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(image, INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle);

    Array4::from_shape_fn(
        (1, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize),
        |(_, channel, row, col)| {
            let value = resized.get_pixel(col as u32, row as u32).0[channel] as f32;
            (value - 127.0) / 128.0
        },
    )
}

/// Pick the most confident face above `threshold` and scale it to pixels.
///
/// `scores` holds `(background, face)` pairs and `boxes` holds relative
/// `(x1, y1, x2, y2)` corners, one entry per anchor.
fn best_face(
    scores: &[f32],
    boxes: &[f32],
    threshold: f32,
    width: u32,
    height: u32,
) -> Option<FaceBox> {
    let (index, _) = scores
        .chunks_exact(2)
        .map(|pair| pair[1])
        .enumerate()
        .filter(|(_, score)| *score >= threshold)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

    let corners = boxes.get(index * 4..index * 4 + 4)?;
    let scale = |v: f32, size: u32| (v.clamp(0.0, 1.0) * size as f32).round() as u32;

    let x1 = scale(corners[0], width);
    let y1 = scale(corners[1], height);
    let x2 = scale(corners[2], width);
    let y2 = scale(corners[3], height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(FaceBox {
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
    })
}

fn internal(message: String) -> AppError {
    AppError::Internal(anyhow::anyhow!(message))
}
