use std::fmt;

use crate::config::{PetCfg, SmileStrategy};
use crate::types::{BlendShape, FaceSample, Landmark, VisionFrame};

pub const MOUTH_SMILE_LEFT: &str = "mouthSmileLeft";
pub const MOUTH_SMILE_RIGHT: &str = "mouthSmileRight";
pub const JAW_OPEN: &str = "jawOpen";

/// Face-mesh indices used by the geometric strategy.
pub const MOUTH_CORNER_LEFT: usize = 61;
pub const MOUTH_CORNER_RIGHT: usize = 291;
pub const UPPER_LIP_MID: usize = 13;
pub const LOWER_LIP_MID: usize = 14;

/// Outcome of scoring one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmileReading {
    pub intensity: f32,
    /// The alternate joy signal (wide-open mouth) fired.
    pub alternate: bool,
    pub smiling: bool,
}

/// Pluggable smile scoring strategy.
pub trait SmileScorer: Send + fmt::Debug {
    /// Smile intensity in [0, 1], or `None` if the sample lacks the inputs
    /// this strategy needs.
    fn score(&self, face: &FaceSample) -> Option<f32>;

    fn threshold(&self) -> f32;

    /// Secondary joy signal OR-ed with the smile. None by default.
    fn alternate(&self, _face: &FaceSample) -> bool {
        false
    }

    /// Scores the sample and ORs in the alternate signal. A sample with no
    /// smile score still counts when the alternate fires; the intensity is
    /// then 0.
    fn evaluate(&self, face: &FaceSample) -> Option<SmileReading> {
        let alternate = self.alternate(face);
        let intensity = match self.score(face) {
            Some(intensity) => intensity,
            None if alternate => 0.0,
            None => return None,
        };
        Some(SmileReading {
            intensity,
            alternate,
            smiling: intensity > self.threshold() || alternate,
        })
    }
}

/// Averages the left/right mouth-smile blend shapes.
#[derive(Debug, Clone)]
pub struct BlendShapeScorer {
    pub threshold: f32,
    /// Jaw-open threshold; `None` disables the alternate signal.
    pub jaw_open_threshold: Option<f32>,
}

impl BlendShapeScorer {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            jaw_open_threshold: None,
        }
    }

    pub fn with_jaw_open(mut self, threshold: f32) -> Self {
        self.jaw_open_threshold = Some(threshold);
        self
    }
}

fn shape(shapes: &[BlendShape], name: &str) -> Option<f32> {
    shapes.iter().find(|s| s.name == name).map(|s| s.score)
}

impl SmileScorer for BlendShapeScorer {
    fn score(&self, face: &FaceSample) -> Option<f32> {
        let FaceSample::BlendShapes(shapes) = face else {
            return None;
        };
        let left = shape(shapes, MOUTH_SMILE_LEFT)?;
        let right = shape(shapes, MOUTH_SMILE_RIGHT)?;
        Some(((left + right) / 2.0).clamp(0.0, 1.0))
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn alternate(&self, face: &FaceSample) -> bool {
        let (Some(limit), FaceSample::BlendShapes(shapes)) = (self.jaw_open_threshold, face) else {
            return false;
        };
        shape(shapes, JAW_OPEN).is_some_and(|jaw| jaw > limit)
    }
}

/// Mouth height over mouth width from raw landmarks.
#[derive(Debug, Clone)]
pub struct GeometricScorer {
    pub threshold: f32,
}

impl GeometricScorer {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl SmileScorer for GeometricScorer {
    fn score(&self, face: &FaceSample) -> Option<f32> {
        let FaceSample::Landmarks(points) = face else {
            return None;
        };
        let point = |i: usize| points.get(i);
        let width = point(MOUTH_CORNER_LEFT)?.distance(point(MOUTH_CORNER_RIGHT)?);
        let height = point(UPPER_LIP_MID)?.distance(point(LOWER_LIP_MID)?);
        if width <= f32::EPSILON {
            return None;
        }
        Some((height / width).clamp(0.0, 1.0))
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Build the scorer selected by config.
pub fn scorer_from_cfg(cfg: &PetCfg) -> Box<dyn SmileScorer> {
    match cfg.smile_strategy {
        SmileStrategy::BlendShape => {
            let scorer = BlendShapeScorer::new(cfg.smile_threshold);
            if cfg.jaw_open_enabled {
                Box::new(scorer.with_jaw_open(cfg.jaw_open_threshold))
            } else {
                Box::new(scorer)
            }
        }
        SmileStrategy::Geometric => Box::new(GeometricScorer::new(cfg.geometric_threshold)),
    }
}

/// Landmark vector with only the mouth points placed. Used to synthesize
/// geometric samples from mouth width and height.
pub fn mouth_landmarks(width: f32, height: f32) -> Vec<Landmark> {
    let mut points = vec![Landmark::default(); MOUTH_CORNER_RIGHT + 1];
    points[MOUTH_CORNER_LEFT] = Landmark::new(0.5 - width / 2.0, 0.7);
    points[MOUTH_CORNER_RIGHT] = Landmark::new(0.5 + width / 2.0, 0.7);
    points[UPPER_LIP_MID] = Landmark::new(0.5, 0.7 - height / 2.0);
    points[LOWER_LIP_MID] = Landmark::new(0.5, 0.7 + height / 2.0);
    points
}

/// Drops frames whose timestamp equals the last processed one.
#[derive(Debug, Default)]
pub struct FrameGate {
    last_timestamp: Option<f64>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the frame is new and should be evaluated.
    pub fn admit(&mut self, timestamp: f64) -> bool {
        if self.last_timestamp == Some(timestamp) {
            return false;
        }
        self.last_timestamp = Some(timestamp);
        true
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameVerdict {
    Duplicate,
    NoFace,
    /// Face present but the sample does not suit the configured strategy.
    Unscoreable,
    Scored(SmileReading),
}

impl FrameVerdict {
    pub fn is_smile(&self) -> bool {
        matches!(self, Self::Scored(r) if r.smiling)
    }
}

/// Per-frame smile detector: timestamp dedup followed by scoring.
#[derive(Debug)]
pub struct ExpressionClassifier {
    scorer: Box<dyn SmileScorer>,
    gate: FrameGate,
}

impl ExpressionClassifier {
    pub fn new(scorer: Box<dyn SmileScorer>) -> Self {
        Self {
            scorer,
            gate: FrameGate::new(),
        }
    }

    pub fn from_cfg(cfg: &PetCfg) -> Self {
        Self::new(scorer_from_cfg(cfg))
    }

    pub fn observe(&mut self, frame: &VisionFrame) -> FrameVerdict {
        if !self.gate.admit(frame.timestamp) {
            return FrameVerdict::Duplicate;
        }
        let Some(face) = &frame.face else {
            return FrameVerdict::NoFace;
        };
        match self.scorer.evaluate(face) {
            Some(reading) => FrameVerdict::Scored(reading),
            None => FrameVerdict::Unscoreable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smile(left: f32, right: f32) -> FaceSample {
        FaceSample::BlendShapes(vec![
            BlendShape::new(MOUTH_SMILE_LEFT, left),
            BlendShape::new(MOUTH_SMILE_RIGHT, right),
        ])
    }

    fn frame(timestamp: f64, face: Option<FaceSample>) -> VisionFrame {
        VisionFrame { timestamp, face }
    }

    #[test]
    fn blend_shape_averages_corners() {
        let scorer = BlendShapeScorer::new(0.5);
        let reading = scorer.evaluate(&smile(0.4, 0.8)).unwrap();
        assert!((reading.intensity - 0.6).abs() < 1e-6);
        assert!(reading.smiling);

        let reading = scorer.evaluate(&smile(0.2, 0.4)).unwrap();
        assert!(!reading.smiling);
    }

    #[test]
    fn blend_shape_needs_both_corners() {
        let face = FaceSample::BlendShapes(vec![BlendShape::new(MOUTH_SMILE_LEFT, 0.9)]);
        assert!(BlendShapeScorer::new(0.5).evaluate(&face).is_none());
    }

    #[test]
    fn jaw_open_is_alternate_signal() {
        let face = FaceSample::BlendShapes(vec![
            BlendShape::new(MOUTH_SMILE_LEFT, 0.1),
            BlendShape::new(MOUTH_SMILE_RIGHT, 0.1),
            BlendShape::new(JAW_OPEN, 0.8),
        ]);
        let without = BlendShapeScorer::new(0.5).evaluate(&face).unwrap();
        assert!(!without.smiling);

        let with = BlendShapeScorer::new(0.5).with_jaw_open(0.6).evaluate(&face).unwrap();
        assert!(with.alternate);
        assert!(with.smiling);
        // Smile intensity itself is unaffected by the jaw score.
        assert!((with.intensity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn jaw_open_fires_without_smile_corners() {
        let face = FaceSample::BlendShapes(vec![BlendShape::new(JAW_OPEN, 0.8)]);
        assert!(BlendShapeScorer::new(0.5).evaluate(&face).is_none());

        let reading = BlendShapeScorer::new(0.5).with_jaw_open(0.6).evaluate(&face).unwrap();
        assert!(reading.alternate);
        assert!(reading.smiling);
        assert_eq!(reading.intensity, 0.0);

        let closed = FaceSample::BlendShapes(vec![BlendShape::new(JAW_OPEN, 0.3)]);
        assert!(BlendShapeScorer::new(0.5).with_jaw_open(0.6).evaluate(&closed).is_none());
    }

    #[test]
    fn geometric_ratio() {
        let scorer = GeometricScorer::new(0.22);
        let face = FaceSample::Landmarks(mouth_landmarks(0.2, 0.09));
        let reading = scorer.evaluate(&face).unwrap();
        assert!((reading.intensity - 0.45).abs() < 1e-4);
        assert!(reading.smiling);

        let closed = FaceSample::Landmarks(mouth_landmarks(0.2, 0.02));
        assert!(!scorer.evaluate(&closed).unwrap().smiling);
    }

    #[test]
    fn geometric_rejects_short_or_degenerate_meshes() {
        let scorer = GeometricScorer::new(0.22);
        assert!(scorer.score(&FaceSample::Landmarks(vec![Landmark::default(); 20])).is_none());
        assert!(scorer.score(&FaceSample::Landmarks(mouth_landmarks(0.0, 0.1))).is_none());
        assert!(scorer.score(&smile(0.9, 0.9)).is_none());
    }

    #[test]
    fn threshold_is_strict() {
        let reading = BlendShapeScorer::new(0.5).evaluate(&smile(0.5, 0.5)).unwrap();
        assert!(!reading.smiling);
    }

    #[test]
    fn classifier_skips_repeated_frame() {
        let mut c = ExpressionClassifier::new(Box::new(BlendShapeScorer::new(0.5)));
        assert!(c.observe(&frame(0.033, Some(smile(0.9, 0.9)))).is_smile());
        assert_eq!(c.observe(&frame(0.033, Some(smile(0.9, 0.9)))), FrameVerdict::Duplicate);
        assert!(c.observe(&frame(0.066, Some(smile(0.9, 0.9)))).is_smile());
    }

    #[test]
    fn classifier_no_face_and_wrong_sample() {
        let mut c = ExpressionClassifier::new(Box::new(BlendShapeScorer::new(0.5)));
        assert_eq!(c.observe(&frame(1.0, None)), FrameVerdict::NoFace);
        let landmarks = FaceSample::Landmarks(mouth_landmarks(0.2, 0.1));
        assert_eq!(c.observe(&frame(2.0, Some(landmarks))), FrameVerdict::Unscoreable);
    }

    #[test]
    fn from_cfg_selects_strategy() {
        let cfg = PetCfg {
            smile_strategy: SmileStrategy::Geometric,
            ..PetCfg::default()
        };
        let scorer = scorer_from_cfg(&cfg);
        assert!((scorer.threshold() - 0.22).abs() < f32::EPSILON);
        assert!(scorer.score(&FaceSample::Landmarks(mouth_landmarks(0.2, 0.05))).is_some());
    }
}
