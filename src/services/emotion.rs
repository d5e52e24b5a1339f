//! Facial Emotion Classifier
//!
//! Classifies the facial expression in a picture into one of seven emotions
//! using an ONNX model trained on 48x48 grayscale faces (FER-2013 layout).
//! The face is located first with [`OnnxFaceDetector`] and only that region
//! is classified.
//!
//! Input: grayscale tensor `[1, 48, 48, 1]` scaled to 0..1
//! Output: 7 scores in [`EmotionLabel::ALL`] order

use crate::error::{AppError, Result};
use crate::models::EmotionLabel;
use crate::services::face_detector::{FaceDetector, OnnxFaceDetector};
use async_trait::async_trait;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Side length of the square face crop the model expects
pub const FACE_SIZE: u32 = 48;

/// Infers the dominant facial emotion of an image
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<EmotionLabel>;
}

pub struct EmotionClassifierConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Path to the ONNX face detector run before classification
    pub detector_path: PathBuf,
    pub intra_threads: usize,
}

impl EmotionClassifierConfig {
    pub fn new(model_path: PathBuf, detector_path: PathBuf) -> Self {
        let intra_threads = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
            .min(4);

        Self {
            model_path,
            detector_path,
            intra_threads,
        }
    }
}

/// Emotion classifier backed by an ONNX Runtime session.
///
/// The models are loaded once by [`OnnxEmotionClassifier::load`] and shared by
/// every request. [`OnnxEmotionClassifier::shutdown`] releases both sessions;
/// classification fails afterwards.
pub struct OnnxEmotionClassifier {
    session: Arc<Mutex<Option<Session>>>,
    detector: Arc<OnnxFaceDetector>,
}

impl OnnxEmotionClassifier {
    pub fn load(config: EmotionClassifierConfig) -> Result<Self> {
        let detector = OnnxFaceDetector::load(&config.detector_path, config.intra_threads)?;

        info!(
            "Loading emotion model from {:?} with {} threads",
            config.model_path, config.intra_threads
        );

        let session = Session::builder()
            .map_err(|e| internal(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| internal(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| internal(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&config.model_path)
            .map_err(|e| internal(format!("Failed to load ONNX model: {}", e)))?;

        Ok(Self {
            session: Arc::new(Mutex::new(Some(session))),
            detector: Arc::new(detector),
        })
    }

    /// Release the models. Safe to call more than once.
    pub fn shutdown(&self) {
        self.detector.shutdown();

        let released = match self.session.lock() {
            Ok(mut guard) => guard.take().is_some(),
            Err(poisoned) => poisoned.into_inner().take().is_some(),
        };

        if released {
            info!("Emotion model released");
        }
    }

    fn run_inference(session: &Mutex<Option<Session>>, face: Array4<f32>) -> Result<EmotionLabel> {
        use ort::value::Tensor;

        let mut guard = session
            .lock()
            .map_err(|_| internal("Emotion model lock poisoned".to_string()))?;
        let session = guard.as_mut().ok_or_else(|| {
            AppError::CapabilityUnavailable("Emotion model has been shut down".to_string())
        })?;

        let input_tensor = Tensor::from_array(face)
            .map_err(|e| internal(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| AppError::Classification(format!("ONNX inference failed: {}", e)))?;

        let (_, output) = outputs
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Classification("No output from model".to_string()))?;

        let (_, scores) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::Classification(format!("Failed to extract scores: {}", e)))?;

        debug!("Emotion scores: {:?}", scores);

        label_for_scores(scores)
    }
}

#[async_trait]
impl EmotionClassifier for OnnxEmotionClassifier {
    async fn classify(&self, image: &[u8]) -> Result<EmotionLabel> {
        let bytes = image.to_vec();
        let session = self.session.clone();
        let detector = self.detector.clone();

        // Decoding, detection and inference are CPU-bound
        tokio::task::spawn_blocking(move || {
            let face = preprocess(&bytes, detector.as_ref())?;
            Self::run_inference(&session, face)
        })
        .await
        .map_err(|e| internal(format!("Classification task panicked: {}", e)))?
    }
}

/// Decode an image, locate the face and turn it into the model's input tensor.
pub fn preprocess(bytes: &[u8], detector: &dyn FaceDetector) -> Result<Array4<f32>> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| AppError::Classification(format!("Unreadable image: {}", e)))?;

    let face_box = detector.detect(&image.to_rgb8())?.ok_or_else(|| {
        AppError::Classification("No face detected in the image".to_string())
    })?;
    debug!("Face found at {:?}", face_box);

    let gray = image.to_luma8();
    let region = image::imageops::crop_imm(
        &gray,
        face_box.x,
        face_box.y,
        face_box.width,
        face_box.height,
    )
    .to_image();
    let face = image::imageops::resize(&region, FACE_SIZE, FACE_SIZE, FilterType::Triangle);

    let size = FACE_SIZE as usize;
    Ok(Array4::from_shape_fn((1, size, size, 1), |(_, row, col, _)| {
        face.get_pixel(col as u32, row as u32).0[0] as f32 / 255.0
    }))
}

fn label_for_scores(scores: &[f32]) -> Result<EmotionLabel> {
    if scores.len() != EmotionLabel::ALL.len() {
        return Err(AppError::Classification(format!(
            "Model returned {} scores, expected {}",
            scores.len(),
            EmotionLabel::ALL.len()
        )));
    }

    let best = scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or_default();

    EmotionLabel::from_index(best)
        .ok_or_else(|| AppError::Classification(format!("No label for index {}", best)))
}

fn internal(message: String) -> AppError {
    AppError::Internal(anyhow::anyhow!(message))
}
