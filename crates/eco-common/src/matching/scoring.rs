use super::{
    distance::distance_between,
    weights::{
        DEFAULT_MAX_DISTANCE_KM, DEFAULT_WEIGHTS, HIGH_IMPACT_THRESHOLD, MAX_SCORE, ScoringWeights,
    },
};
use crate::{Project, UserProfile};

const HIGH_IMPACT_PHRASES: [&str; 2] = ["alto impacto", "high impact"];
const EXPLAINED_INTERESTS: usize = 3;
const FALLBACK_REASON: &str = "Project available in your area";

#[derive(Debug, Clone, PartialEq)]
pub struct FactorScore {
    pub points: f64,
    pub max_points: f64,
    pub status: &'static str,
    pub details: String,
}

impl FactorScore {
    fn new(points: f64, max_points: f64, status: &'static str, details: impl Into<String>) -> Self {
        Self {
            points,
            max_points,
            status,
            details: details.into(),
        }
    }

    fn skipped(max_points: f64, details: impl Into<String>) -> Self {
        Self::new(0.0, max_points, "SKIPPED", details)
    }

    fn contributes(&self) -> bool {
        self.points != 0.0
    }
}

/// Per-factor breakdown of a (profile, project) score.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectScore {
    /// Clamped to `[0, 100]`.
    pub total: f64,
    /// Sum of factor points before clamping.
    pub raw_total: f64,
    pub distance: FactorScore,
    pub category: FactorScore,
    pub interests: FactorScore,
    pub skills: FactorScore,
    pub availability: FactorScore,
    pub impact: FactorScore,
}

impl ProjectScore {
    fn factors(&self) -> [&FactorScore; 6] {
        [
            &self.distance,
            &self.category,
            &self.interests,
            &self.skills,
            &self.availability,
            &self.impact,
        ]
    }

    /// Details of every factor that moved the score, in factor order.
    pub fn reasons(&self) -> Vec<String> {
        self.factors()
            .into_iter()
            .filter(|factor| factor.contributes())
            .map(|factor| factor.details.clone())
            .collect()
    }
}

/// Score with the default point budget.
pub fn score_project(profile: &UserProfile, project: &Project) -> ProjectScore {
    MatchScorer::default().score(profile, project)
}

/// Renders the user-facing one-sentence explanation for a score.
pub fn explain_match(profile: &UserProfile, project: &Project, score: f64) -> String {
    MatchScorer::default().explain(profile, project, score)
}

/// Lowercase searchable text of a project: description, name and category.
pub fn haystack(project: &Project) -> String {
    format!(
        "{} {} {}",
        project.description, project.name, project.category
    )
    .to_lowercase()
}

pub fn effective_max_distance(profile: &UserProfile) -> f64 {
    profile
        .preferences
        .max_distance_km
        .filter(|km| km.is_finite() && *km > 0.0)
        .unwrap_or(DEFAULT_MAX_DISTANCE_KM)
}

fn count_hits(tags: &[String], haystack: &str) -> usize {
    tags.iter()
        .filter(|tag| haystack.contains(&tag.to_lowercase()))
        .count()
}

fn is_high_impact_profile(profile: &UserProfile) -> bool {
    profile.impact_score > HIGH_IMPACT_THRESHOLD
}

#[derive(Debug, Clone)]
pub struct MatchScorer {
    weights: ScoringWeights,
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHTS)
    }
}

impl MatchScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Additive score over independent factors, clamped to `[0, 100]`.
    ///
    /// Factors are accumulated in a fixed order so results are bit-for-bit
    /// reproducible.
    pub fn score(&self, profile: &UserProfile, project: &Project) -> ProjectScore {
        let text = haystack(project);

        let distance = self.score_distance(profile, project);
        let category = self.score_category(profile, project);
        let interests = self.score_interests(profile, &text);
        let skills = self.score_skills(profile, &text);
        let availability = self.score_availability(project);
        let impact = self.score_impact(profile, &text);

        let mut raw_total = 0.0;
        raw_total += distance.points;
        raw_total += category.points;
        raw_total += interests.points;
        raw_total += skills.points;
        raw_total += availability.points;
        raw_total += impact.points;

        ProjectScore {
            total: raw_total.min(MAX_SCORE).max(0.0),
            raw_total,
            distance,
            category,
            interests,
            skills,
            availability,
            impact,
        }
    }

    fn score_distance(&self, profile: &UserProfile, project: &Project) -> FactorScore {
        let max_points = self.weights.distance_max;
        let Some(origin) = profile.location.coordinates() else {
            return FactorScore::skipped(max_points, "profile has no coordinates");
        };

        let distance = distance_between(origin, project.location);
        let max_distance = effective_max_distance(profile);

        if distance <= max_distance {
            let points = max_points * (1.0 - (distance / max_distance));
            FactorScore::new(
                points,
                max_points,
                "MATCH",
                format!("{distance:.1} km away (within {max_distance:.0} km)"),
            )
        } else {
            FactorScore::new(
                -self.weights.distance_penalty,
                max_points,
                "PENALTY",
                format!("{distance:.1} km away (beyond {max_distance:.0} km)"),
            )
        }
    }

    fn score_category(&self, profile: &UserProfile, project: &Project) -> FactorScore {
        let max_points = self.weights.category_exact;
        let preferred = &profile.preferences.preferred_categories;

        if preferred.iter().any(|category| *category == project.category) {
            return FactorScore::new(
                max_points,
                max_points,
                "MATCH",
                format!("preferred category {}", project.category),
            );
        }

        let project_category = project.category.to_lowercase();
        if let Some(partial) = preferred
            .iter()
            .find(|category| project_category.contains(&category.to_lowercase()))
        {
            return FactorScore::new(
                self.weights.category_partial,
                max_points,
                "PARTIAL_MATCH",
                format!("category {} relates to {}", project.category, partial),
            );
        }

        FactorScore::new(0.0, max_points, "MISS", "category not among preferences")
    }

    fn score_interests(&self, profile: &UserProfile, text: &str) -> FactorScore {
        let max_points = self.weights.interests_max;
        let hits = count_hits(&profile.interests, text);
        if hits == 0 {
            return FactorScore::new(0.0, max_points, "MISS", "no matching interests");
        }

        let points = (hits as f64 * self.weights.interest_points).min(max_points);
        FactorScore::new(
            points,
            max_points,
            "MATCH",
            format!("{hits} matching interest(s)"),
        )
    }

    fn score_skills(&self, profile: &UserProfile, text: &str) -> FactorScore {
        let max_points = self.weights.skills_max;
        let hits = count_hits(&profile.skills, text);
        if hits == 0 {
            return FactorScore::new(0.0, max_points, "MISS", "no matching skills");
        }

        let points = (hits as f64 * self.weights.skill_points).min(max_points);
        FactorScore::new(
            points,
            max_points,
            "MATCH",
            format!("{hits} matching skill(s)"),
        )
    }

    fn score_availability(&self, project: &Project) -> FactorScore {
        let max_points = self.weights.availability_max;
        if project.available_spots == 0 {
            return FactorScore::new(0.0, max_points, "MISS", "no spots available");
        }

        let points =
            (project.available_spots as f64 / self.weights.spots_per_point).min(max_points);
        FactorScore::new(
            points,
            max_points,
            "MATCH",
            format!("{} spots available", project.available_spots),
        )
    }

    fn score_impact(&self, profile: &UserProfile, text: &str) -> FactorScore {
        let max_points = self.weights.impact_bonus;
        if !is_high_impact_profile(profile) {
            return FactorScore::skipped(max_points, "impact score below threshold");
        }

        if HIGH_IMPACT_PHRASES.iter().any(|phrase| text.contains(phrase)) {
            FactorScore::new(max_points, max_points, "MATCH", "high impact project")
        } else {
            FactorScore::new(0.0, max_points, "MISS", "project not flagged as high impact")
        }
    }

    /// `"Match del {score}%: "` followed by the present reasons, period-joined.
    ///
    /// Reason order is fixed: distance, category, interests, availability,
    /// impact. Interest matching here only looks at description and name.
    pub fn explain(&self, profile: &UserProfile, project: &Project, score: f64) -> String {
        let mut reasons = Vec::new();

        if let Some(origin) = profile.location.coordinates() {
            let distance = distance_between(origin, project.location);
            if distance <= effective_max_distance(profile) {
                reasons.push(format!("Only {distance:.1} km from your location"));
            }
        }

        if profile
            .preferences
            .preferred_categories
            .iter()
            .any(|category| *category == project.category)
        {
            reasons.push(format!("Matches your interest in {}", project.category));
        }

        let text = format!("{} {}", project.description, project.name).to_lowercase();
        let matched: Vec<&str> = profile
            .interests
            .iter()
            .filter(|interest| text.contains(&interest.to_lowercase()))
            .map(String::as_str)
            .take(EXPLAINED_INTERESTS)
            .collect();
        if !matched.is_empty() {
            reasons.push(format!("Related to your interests: {}", matched.join(", ")));
        }

        if project.available_spots > 0 {
            reasons.push(format!("{} spots available", project.available_spots));
        }

        if is_high_impact_profile(profile) && text.contains(HIGH_IMPACT_PHRASES[0]) {
            reasons.push("High environmental impact".to_string());
        }

        if reasons.is_empty() {
            reasons.push(FALLBACK_REASON.to_string());
        }

        format!("Match del {score:.0}%: {}.", reasons.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoPoint, Preferences, UserLocation};
    use proptest::prelude::*;

    const MADRID: GeoPoint = GeoPoint {
        lat: 40.4168,
        lng: -3.7038,
    };

    /// Degrees of latitude that correspond to `km` on the haversine sphere.
    fn north_of_madrid(km: f64) -> GeoPoint {
        let degrees = (km / super::super::distance::EARTH_RADIUS_KM).to_degrees();
        GeoPoint::new(MADRID.lat + degrees, MADRID.lng)
    }

    fn base_profile() -> UserProfile {
        UserProfile {
            id: "u-1".into(),
            name: "Lucía".into(),
            location: UserLocation {
                lat: Some(MADRID.lat),
                lng: Some(MADRID.lng),
                city: Some("Madrid".into()),
                country: Some("España".into()),
            },
            preferences: Preferences {
                max_distance_km: Some(25.0),
                preferred_categories: vec!["Medio ambiente".into()],
                ..Preferences::default()
            },
            ..UserProfile::default()
        }
    }

    fn base_project(location: GeoPoint) -> Project {
        Project {
            id: "p-1".into(),
            name: "Plantación comunitaria".into(),
            description: "Jornada de voluntariado en el parque".into(),
            category: "Medio ambiente".into(),
            location,
            available_spots: 5,
            ..Project::default()
        }
    }

    #[test]
    fn scenario_nearby_preferred_project() {
        let project = base_project(north_of_madrid(10.0));
        let result = score_project(&base_profile(), &project);

        assert!((result.distance.points - 18.0).abs() < 1e-6);
        assert_eq!(result.category.points, 25.0);
        assert_eq!(result.interests.points, 0.0);
        assert_eq!(result.skills.points, 0.0);
        assert_eq!(result.availability.points, 1.0);
        assert!((result.total - 44.0).abs() < 1e-6, "got {}", result.total);
    }

    #[test]
    fn scenario_project_beyond_max_distance_is_penalized() {
        let project = base_project(north_of_madrid(40.0));
        let result = score_project(&base_profile(), &project);

        assert_eq!(result.distance.points, -10.0);
        assert_eq!(result.distance.status, "PENALTY");
        assert!((result.total - 16.0).abs() < 1e-9);
    }

    #[test]
    fn negative_sum_is_floor_clamped_to_zero() {
        let mut project = base_project(north_of_madrid(40.0));
        project.category = "Tecnología".into();
        project.available_spots = 0;

        let result = score_project(&base_profile(), &project);

        assert_eq!(result.raw_total, -10.0);
        assert_eq!(result.total, 0.0);
    }

    #[test]
    fn penalty_is_flat_regardless_of_overshoot() {
        let near_miss = score_project(&base_profile(), &base_project(north_of_madrid(26.0)));
        let far_away = score_project(&base_profile(), &base_project(north_of_madrid(900.0)));

        assert_eq!(near_miss.distance.points, far_away.distance.points);
        assert_eq!(near_miss.total, far_away.total);
    }

    #[test]
    fn missing_coordinates_skip_distance_without_penalty() {
        let mut profile = base_profile();
        profile.location.lng = None;

        let result = score_project(&profile, &base_project(north_of_madrid(500.0)));

        assert_eq!(result.distance.points, 0.0);
        assert_eq!(result.distance.status, "SKIPPED");
        assert_eq!(result.total, 26.0);
    }

    #[test]
    fn missing_or_zero_max_distance_uses_default() {
        let project = base_project(north_of_madrid(10.0));

        let mut missing = base_profile();
        missing.preferences.max_distance_km = None;
        let mut zero = base_profile();
        zero.preferences.max_distance_km = Some(0.0);

        let with_default = score_project(&base_profile(), &project);
        assert_eq!(score_project(&missing, &project).total, with_default.total);
        assert_eq!(score_project(&zero, &project).total, with_default.total);
    }

    #[test]
    fn exact_category_short_circuits_partial_match() {
        let mut profile = base_profile();
        profile.preferences.preferred_categories =
            vec!["Medio ambiente".into(), "medio".into()];

        let result = score_project(&profile, &base_project(north_of_madrid(1.0)));

        assert_eq!(result.category.points, 25.0);
        assert_eq!(result.category.status, "MATCH");
    }

    #[test]
    fn partial_category_is_case_insensitive_substring() {
        let mut profile = base_profile();
        profile.preferences.preferred_categories = vec!["AMBIENTE".into()];

        let result = score_project(&profile, &base_project(north_of_madrid(1.0)));

        assert_eq!(result.category.points, 15.0);
        assert_eq!(result.category.status, "PARTIAL_MATCH");
    }

    #[test]
    fn exact_category_match_is_case_sensitive() {
        let mut profile = base_profile();
        profile.preferences.preferred_categories = vec!["medio ambiente".into()];

        let result = score_project(&profile, &base_project(north_of_madrid(1.0)));

        assert_eq!(result.category.points, 15.0);
    }

    #[test]
    fn interest_and_skill_points_are_capped() {
        let mut profile = base_profile();
        profile.interests = ["parque", "jornada", "voluntariado", "plantación", "medio"]
            .map(String::from)
            .to_vec();
        profile.skills = ["parque", "jornada", "voluntariado", "comunitaria"]
            .map(String::from)
            .to_vec();

        let result = score_project(&profile, &base_project(north_of_madrid(1.0)));

        assert_eq!(result.interests.points, 20.0);
        assert_eq!(result.skills.points, 15.0);
    }

    #[test]
    fn interests_match_against_category_text() {
        let mut profile = base_profile();
        profile.interests = vec!["AMBIENTE".into()];

        let result = score_project(&profile, &base_project(north_of_madrid(1.0)));

        assert_eq!(result.interests.points, 5.0);
    }

    #[test]
    fn availability_is_fractional_and_capped() {
        let mut project = base_project(north_of_madrid(1.0));
        project.available_spots = 7;
        let fractional = score_project(&base_profile(), &project);
        assert!((fractional.availability.points - 1.4).abs() < 1e-12);

        project.available_spots = 500;
        let capped = score_project(&base_profile(), &project);
        assert_eq!(capped.availability.points, 10.0);
    }

    #[test]
    fn impact_bonus_requires_score_and_phrase() {
        let mut project = base_project(north_of_madrid(1.0));
        project.description = "Proyecto de ALTO IMPACTO en la ciudad".into();

        let mut engaged = base_profile();
        engaged.impact_score = 71.0;
        assert_eq!(score_project(&engaged, &project).impact.points, 10.0);

        let mut borderline = base_profile();
        borderline.impact_score = 70.0;
        assert_eq!(score_project(&borderline, &project).impact.points, 0.0);

        project.description = "A high impact cleanup".into();
        assert_eq!(score_project(&engaged, &project).impact.points, 10.0);
    }

    #[test]
    fn score_is_clamped_at_one_hundred() {
        let mut profile = base_profile();
        profile.impact_score = 95.0;
        profile.interests = ["a", "e", "i", "o", "u"].map(String::from).to_vec();
        profile.skills = ["a", "e", "i", "o"].map(String::from).to_vec();

        let mut project = base_project(MADRID);
        project.description = "high impact aeiou".into();
        project.available_spots = 100;

        let result = score_project(&profile, &project);

        assert_eq!(result.raw_total, 110.0);
        assert_eq!(result.total, 100.0);
    }

    #[test]
    fn reasons_follow_factor_order() {
        let mut profile = base_profile();
        profile.interests = vec!["parque".into()];

        let result = score_project(&profile, &base_project(north_of_madrid(10.0)));
        let reasons = result.reasons();

        assert_eq!(reasons.len(), 4);
        assert!(reasons[0].contains("km away"));
        assert!(reasons[1].contains("preferred category"));
        assert!(reasons[2].contains("interest"));
        assert!(reasons[3].contains("spots"));
    }

    #[test]
    fn explanation_lists_reasons_in_fixed_order() {
        let mut profile = base_profile();
        profile.impact_score = 80.0;
        profile.interests = ["parque", "jornada", "voluntariado", "plantación"]
            .map(String::from)
            .to_vec();

        let mut project = base_project(north_of_madrid(10.0));
        project.description = "Jornada de voluntariado de alto impacto en el parque".into();

        let text = explain_match(&profile, &project, 81.6);

        assert_eq!(
            text,
            "Match del 82%: Only 10.0 km from your location. \
             Matches your interest in Medio ambiente. \
             Related to your interests: parque, jornada, voluntariado. \
             5 spots available. High environmental impact."
        );
    }

    #[test]
    fn explanation_falls_back_when_nothing_applies() {
        let mut profile = base_profile();
        profile.preferences.preferred_categories.clear();

        let mut project = base_project(north_of_madrid(300.0));
        project.available_spots = 0;

        let text = explain_match(&profile, &project, 0.0);

        assert_eq!(text, "Match del 0%: Project available in your area.");
    }

    fn arb_tags() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z ]{0,6}", 0..12)
    }

    proptest! {
        #[test]
        fn score_stays_within_bounds(
            lat in -90.0f64..90.0,
            lng in -180.0f64..180.0,
            max_distance in prop::option::of(0.0f64..5000.0),
            spots in 0u32..10_000,
            impact in 0.0f64..200.0,
            interests in arb_tags(),
            skills in arb_tags(),
            description in "[a-z ]{0,60}",
        ) {
            let mut profile = base_profile();
            profile.preferences.max_distance_km = max_distance;
            profile.impact_score = impact;
            profile.interests = interests;
            profile.skills = skills;

            let mut project = base_project(GeoPoint::new(lat, lng));
            project.available_spots = spots;
            project.description = description;

            let result = score_project(&profile, &project);
            prop_assert!(result.total >= 0.0);
            prop_assert!(result.total <= 100.0);
        }

        #[test]
        fn closer_projects_score_strictly_higher(near in 0.0f64..12.0, gap in 0.5f64..12.0) {
            let profile = base_profile();
            let closer = score_project(&profile, &base_project(north_of_madrid(near)));
            let farther = score_project(&profile, &base_project(north_of_madrid(near + gap)));

            prop_assert!(closer.total > farther.total);
        }
    }
}
