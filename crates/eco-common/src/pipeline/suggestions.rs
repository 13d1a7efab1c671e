use crate::{UserProfile, config::SUMMARY_MATCHES, matching::ranking::ScoredCandidate};

const NO_MATCHES: &str = "Try expanding your search radius or adjusting your preferences";
const DATE_HINT: &str = "Consider adjusting your date preferences for more options";
const EXPLORED_CATEGORIES: usize = 3;
const FEW_MATCHES: usize = 3;

/// Follow-up hints for the user, in a fixed order.
pub fn suggestions_for(profile: &UserProfile, matches: &[ScoredCandidate]) -> Vec<String> {
    if matches.is_empty() {
        return vec![NO_MATCHES.to_string()];
    }

    let mut suggestions = Vec::new();

    let mut categories: Vec<&str> = Vec::new();
    for candidate in matches.iter().take(SUMMARY_MATCHES) {
        let category = candidate.project.category.as_str();
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }
    if categories.len() > 1 {
        categories.truncate(EXPLORED_CATEGORIES);
        suggestions.push(format!("Explore projects in: {}", categories.join(", ")));
    }

    if let Some(city) = profile.location.city.as_deref().filter(|c| !c.trim().is_empty()) {
        suggestions.push(format!("More projects available in {city}"));
    }

    if matches.len() < FEW_MATCHES {
        suggestions.push(DATE_HINT.to_string());
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Project, UserLocation, matching::score_project};

    fn candidate(id: &str, category: &str) -> ScoredCandidate {
        let project = Project {
            id: id.into(),
            category: category.into(),
            ..Project::default()
        };
        let score = score_project(&UserProfile::default(), &project);
        ScoredCandidate { project, score }
    }

    fn profile_in(city: Option<&str>) -> UserProfile {
        UserProfile {
            location: UserLocation {
                city: city.map(str::to_string),
                ..UserLocation::default()
            },
            ..UserProfile::default()
        }
    }

    #[test]
    fn no_matches_only_suggests_widening() {
        let suggestions = suggestions_for(&profile_in(Some("Madrid")), &[]);
        assert_eq!(suggestions, vec![NO_MATCHES]);
    }

    #[test]
    fn suggestions_follow_fixed_order() {
        let matches = vec![candidate("a", "Salud"), candidate("b", "Océanos")];

        let suggestions = suggestions_for(&profile_in(Some("Madrid")), &matches);

        assert_eq!(
            suggestions,
            vec![
                "Explore projects in: Salud, Océanos",
                "More projects available in Madrid",
                DATE_HINT,
            ]
        );
    }

    #[test]
    fn explores_at_most_three_categories_from_top_five() {
        let matches = vec![
            candidate("a", "Salud"),
            candidate("b", "Salud"),
            candidate("c", "Océanos"),
            candidate("d", "Educación"),
            candidate("e", "Medio ambiente"),
            candidate("f", "Animales"),
        ];

        let suggestions = suggestions_for(&profile_in(None), &matches);

        assert_eq!(
            suggestions,
            vec!["Explore projects in: Salud, Océanos, Educación"]
        );
    }

    #[test]
    fn single_category_is_not_suggested() {
        let matches = vec![candidate("a", "Salud"), candidate("b", "Salud"), candidate("c", "Salud")];
        assert!(suggestions_for(&profile_in(None), &matches).is_empty());
    }
}
