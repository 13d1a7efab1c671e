/// Point budget of the additive scoring model.
///
/// Caps sum to 100; the impact bonus can push a raw total past the cap,
/// which is why the final score is clamped.
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    distance_max: 30.0,
    distance_penalty: 10.0,
    category_exact: 25.0,
    category_partial: 15.0,
    interests_max: 20.0,
    interest_points: 5.0,
    skills_max: 15.0,
    skill_points: 5.0,
    availability_max: 10.0,
    spots_per_point: 5.0,
    impact_bonus: 10.0,
};

/// Used when the profile carries no usable distance preference.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 25.0;

/// Profiles above this impact score get the high-impact bonus.
pub const HIGH_IMPACT_THRESHOLD: f64 = 70.0;

pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub distance_max: f64,
    pub distance_penalty: f64,
    pub category_exact: f64,
    pub category_partial: f64,
    pub interests_max: f64,
    pub interest_points: f64,
    pub skills_max: f64,
    pub skill_points: f64,
    pub availability_max: f64,
    pub spots_per_point: f64,
    pub impact_bonus: f64,
}
