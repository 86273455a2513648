use crate::detection::ModelState;
use crate::models::{ObjectDetector, YoloDetector};
use crate::utils::error::DetectError;
use crate::{Config, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Builds a detector. Called at most once per successful load.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn ObjectDetector>>;
}

/// Loads the YOLOv5 ONNX export named in the config.
pub struct OnnxModelLoader {
    config: Config,
}

impl OnnxModelLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<Arc<dyn ObjectDetector>> {
        Ok(Arc::new(YoloDetector::new(&self.config)?))
    }
}

/// Lazily loaded, process-wide detection model.
///
/// Cheap to clone; every clone shares the same load cell, so the loader runs
/// once no matter how many requests race for the first detection. A failed
/// load leaves the cell empty and the next request tries again.
#[derive(Clone)]
pub struct ModelManager {
    loader: Arc<dyn ModelLoader>,
    detector: Arc<OnceCell<Arc<dyn ObjectDetector>>>,
}

impl ModelManager {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            detector: Arc::new(OnceCell::new()),
        }
    }

    pub fn onnx(config: Config) -> Self {
        Self::new(Arc::new(OnnxModelLoader::new(config)))
    }

    pub fn state(&self) -> ModelState {
        if self.detector.get().is_some() {
            ModelState::Loaded
        } else {
            ModelState::Unloaded
        }
    }

    /// Get the detector, loading it on first use.
    pub async fn detector(&self) -> Result<Arc<dyn ObjectDetector>> {
        if let Some(detector) = self.detector.get() {
            return Ok(Arc::clone(detector));
        }

        let cell = Arc::clone(&self.detector);
        let loader = Arc::clone(&self.loader);

        // Loading blocks (file IO, graph optimization); concurrent callers park
        // on the cell until the first one finishes.
        tokio::task::spawn_blocking(move || {
            cell.get_or_try_init(|| {
                tracing::info!("Initializing detection model...");
                let start = Instant::now();
                let detector = loader.load()?;
                tracing::info!(
                    "Detection model initialized in {:.3}s",
                    start.elapsed().as_secs_f32()
                );
                Ok::<_, DetectError>(detector)
            })
            .cloned()
        })
        .await
        .map_err(|e| DetectError::Internal(format!("Model loading task failed: {}", e)))?
    }
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelManager")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::RawPrediction;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct NullDetector;

    impl ObjectDetector for NullDetector {
        fn predict(&self, _image: &RgbImage) -> Result<Vec<RawPrediction>> {
            Ok(Vec::new())
        }
    }

    struct CountingLoader {
        loads: AtomicUsize,
        fail_first: bool,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self) -> Result<Arc<dyn ObjectDetector>> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            if self.fail_first && attempt == 0 {
                return Err(DetectError::ModelLoad("weights unreadable".to_string()));
            }
            Ok(Arc::new(NullDetector))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_load_once() {
        let loader = Arc::new(CountingLoader { loads: AtomicUsize::new(0), fail_first: false });
        let manager = ModelManager::new(loader.clone());
        assert_eq!(manager.state(), ModelState::Unloaded);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.detector().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ModelState::Loaded);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let loader = Arc::new(CountingLoader { loads: AtomicUsize::new(0), fail_first: true });
        let manager = ModelManager::new(loader.clone());

        assert!(matches!(manager.detector().await, Err(DetectError::ModelLoad(_))));
        assert_eq!(manager.state(), ModelState::Unloaded);

        assert!(manager.detector().await.is_ok());
        assert_eq!(manager.state(), ModelState::Loaded);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loaded_handle_is_shared() {
        let loader = Arc::new(CountingLoader { loads: AtomicUsize::new(0), fail_first: false });
        let manager = ModelManager::new(loader);

        let first = manager.detector().await.unwrap();
        let second = manager.clone().detector().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
