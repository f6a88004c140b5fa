/// Shift the gains so that their mean is 1.0.
///
/// Every gain receives the same additive shift `1.0 - mean(gains)`. An empty slice is
/// left untouched.
pub fn normalize_gains(gains: &mut [f64]) {
    if gains.is_empty() {
        return;
    }
    let mean = gains.iter().sum::<f64>() / gains.len() as f64;
    let shift = 1.0 - mean;
    gains.iter_mut().for_each(|gain| *gain += shift);
}

/// The merged time/gain series of one detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorGains {
    pub label: String,
    pub times: Vec<f64>,
    pub gains: Vec<f64>,
}

impl DetectorGains {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// In-memory image of the merged gain file.
///
/// The written file always starts with an empty primary HDU; the detectors follow in the
/// order they were appended. Labels are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedGains {
    detectors: Vec<DetectorGains>,
}

impl MergedGains {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detector: DetectorGains) {
        self.detectors.push(detector);
    }

    pub fn detectors(&self) -> &[DetectorGains] {
        &self.detectors
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.detectors.iter().map(|det| det.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}
