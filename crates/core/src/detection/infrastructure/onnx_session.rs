use std::path::Path;

use ort::session::Session;

/// Loads an ONNX model with the platform's preferred execution provider.
///
/// Both text models run once per sampled frame or crop, so sessions use
/// full graph optimisation and all available cores for intra-op work.
pub fn load_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    if !model_path.exists() {
        return Err(format!("ONNX model not found at: {}", model_path.display()).into());
    }
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!("Loaded ONNX model {}", model_path.display());
    Ok(session)
}

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Static `(height, width)` of the first NCHW input, where the model fixes them.
///
/// Dynamic axes are reported as non-positive and come back as `None`.
pub fn input_hw(session: &Session) -> (Option<u32>, Option<u32>) {
    let dim = |shape: &[i64], i: usize| {
        shape
            .get(i)
            .copied()
            .filter(|&d| d > 0)
            .map(|d| d as u32)
    };
    session
        .inputs()
        .first()
        .and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                Some((dim(shape, 2), dim(shape, 3)))
            } else {
                None
            }
        })
        .unwrap_or((None, None))
}
