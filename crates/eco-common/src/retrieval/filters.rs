use super::SearchCriteria;
use crate::{Project, matching::distance::distance_between};

/// Filters the catalog API cannot apply itself.
pub fn passes_local_filters(criteria: &SearchCriteria, project: &Project) -> bool {
    within_radius(criteria, project) && within_dates(criteria, project) && has_min_spots(criteria, project)
}

/// Inclusive: a project exactly on the radius passes.
pub fn within_radius(criteria: &SearchCriteria, project: &Project) -> bool {
    match (criteria.location, criteria.radius_km) {
        (Some(origin), Some(radius)) => distance_between(origin, project.location) <= radius,
        _ => true,
    }
}

/// Bounds only apply to projects that carry the corresponding date.
pub fn within_dates(criteria: &SearchCriteria, project: &Project) -> bool {
    if let (Some(from), Some(starts_at)) = (criteria.date_from, project.starts_at) {
        if starts_at < from {
            return false;
        }
    }
    if let (Some(to), Some(ends_at)) = (criteria.date_to, project.ends_at) {
        if ends_at > to {
            return false;
        }
    }
    true
}

pub fn has_min_spots(criteria: &SearchCriteria, project: &Project) -> bool {
    criteria
        .min_spots
        .map_or(true, |min| project.available_spots >= min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoPoint, matching::distance_km, wire::parse_datetime};

    fn project_at(location: GeoPoint) -> Project {
        Project {
            id: "p".into(),
            location,
            ..Project::default()
        }
    }

    #[test]
    fn project_exactly_on_radius_is_included() {
        let origin = GeoPoint::new(40.0, -3.0);
        let target = GeoPoint::new(40.2, -3.1);
        let exact = distance_km(origin.lat, origin.lng, target.lat, target.lng);

        let mut criteria = SearchCriteria {
            location: Some(origin),
            radius_km: Some(exact),
            ..SearchCriteria::default()
        };
        assert!(within_radius(&criteria, &project_at(target)));

        criteria.radius_km = Some(exact - 1e-6);
        assert!(!within_radius(&criteria, &project_at(target)));
    }

    #[test]
    fn radius_needs_both_location_and_radius() {
        let far = project_at(GeoPoint::new(-33.0, 151.0));

        let only_radius = SearchCriteria {
            radius_km: Some(1.0),
            ..SearchCriteria::default()
        };
        assert!(within_radius(&only_radius, &far));

        let only_location = SearchCriteria {
            location: Some(GeoPoint::new(40.0, -3.0)),
            ..SearchCriteria::default()
        };
        assert!(within_radius(&only_location, &far));
    }

    #[test]
    fn date_window_excludes_projects_outside_bounds() {
        let criteria = SearchCriteria {
            date_from: parse_datetime("2025-05-01"),
            date_to: parse_datetime("2025-05-31"),
            ..SearchCriteria::default()
        };

        let mut inside = project_at(GeoPoint::default());
        inside.starts_at = parse_datetime("2025-05-03T09:00:00Z");
        inside.ends_at = parse_datetime("2025-05-03T14:00:00Z");
        assert!(within_dates(&criteria, &inside));

        let mut too_early = inside.clone();
        too_early.starts_at = parse_datetime("2025-04-30T09:00:00Z");
        assert!(!within_dates(&criteria, &too_early));

        let mut too_late = inside.clone();
        too_late.ends_at = parse_datetime("2025-06-01T09:00:00Z");
        assert!(!within_dates(&criteria, &too_late));
    }

    #[test]
    fn undated_projects_pass_date_filters() {
        let criteria = SearchCriteria {
            date_from: parse_datetime("2025-05-01"),
            date_to: parse_datetime("2025-05-31"),
            ..SearchCriteria::default()
        };
        assert!(within_dates(&criteria, &project_at(GeoPoint::default())));
    }

    #[test]
    fn min_spots_is_inclusive() {
        let criteria = SearchCriteria {
            min_spots: Some(4),
            ..SearchCriteria::default()
        };
        let mut project = project_at(GeoPoint::default());

        project.available_spots = 4;
        assert!(has_min_spots(&criteria, &project));

        project.available_spots = 3;
        assert!(!has_min_spots(&criteria, &project));
        assert!(!passes_local_filters(&criteria, &project));
    }
}
