/// Progress report sent once per detector while merging
#[derive(Debug, Clone, Default)]
pub struct MergeStatus {
    pub progress: f32,
    pub detector_index: usize,
    pub n_detectors: usize,
    pub label: String,
}

impl MergeStatus {
    pub fn new(detector_index: usize, n_detectors: usize, label: &str) -> Self {
        Self {
            progress: (detector_index + 1) as f32 / n_detectors.max(1) as f32,
            detector_index,
            n_detectors,
            label: label.to_string(),
        }
    }
}
