//! # Hunt Generation
//!
//! 1. Keep destinations whose city and obscurity were both requested and that share at least
//!    one requested tag (no requested tags means any tags).
//! 2. Pick `n` of them uniformly at random, each at most once.
//! 3. Order the picks west to east by longitude so the route does not zig-zag.
use std::collections::BTreeSet;

use fastrand::Rng;

use crate::{
    error::AppError,
    models::{Destination, HuntItem, Obscurity, ScavengerHunt, Tag},
};

#[derive(Debug, Clone, Default)]
pub struct HuntFilter {
    pub cities: BTreeSet<String>,
    pub obscurities: BTreeSet<Obscurity>,
    pub tags: BTreeSet<Tag>,
}

impl HuntFilter {
    pub fn matches(&self, destination: &Destination) -> bool {
        self.cities.contains(&destination.city)
            && self.obscurities.contains(&destination.obscurity)
            && (self.tags.is_empty() || destination.has_common_tag(&self.tags))
    }
}

pub fn filter(destinations: Vec<Destination>, hunt_filter: &HuntFilter) -> Vec<Destination> {
    destinations
        .into_iter()
        .filter(|destination| hunt_filter.matches(destination))
        .collect()
}

pub fn choose_random(
    mut destinations: Vec<Destination>,
    n: usize,
    rng: &mut Rng,
) -> Result<Vec<Destination>, AppError> {
    if n == 0 {
        return Err(AppError::MalformedPayload(
            "number of stops must be at least 1".to_string(),
        ));
    }

    if destinations.len() < n {
        return Err(AppError::NotEnoughDestinations {
            requested: n,
            available: destinations.len(),
        });
    }

    if destinations.len() > n {
        rng.shuffle(&mut destinations);
        destinations.truncate(n);
    }

    Ok(destinations)
}

pub fn to_hunt_items(mut destinations: Vec<Destination>) -> Vec<HuntItem> {
    destinations.sort_by(|a, b| a.location.lng.total_cmp(&b.location.lng));

    destinations
        .iter()
        .map(Destination::to_hunt_item)
        .collect()
}

pub fn generate(
    destinations: Vec<Destination>,
    hunt_filter: &HuntFilter,
    n: usize,
    rng: &mut Rng,
) -> Result<ScavengerHunt, AppError> {
    let chosen = choose_random(filter(destinations, hunt_filter), n, rng)?;
    let city = hunt_filter
        .cities
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    Ok(ScavengerHunt::new(to_hunt_items(chosen), city))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LatLng;

    fn destination(name: &str, city: &str, obscurity: Obscurity, lng: f64, tags: &[Tag]) -> Destination {
        Destination::builder()
            .name(name)
            .city(city)
            .obscurity(obscurity)
            .location(LatLng::new(0.0, lng))
            .tags(tags.iter().copied())
            .build()
    }

    fn all_destinations() -> Vec<Destination> {
        vec![
            destination("Golden Gate", "San Francisco", Obscurity::Easy, -122.47, &[Tag::Tourist]),
            destination("Tea Garden", "San Francisco", Obscurity::Medium, -122.47, &[Tag::Family]),
            destination("Orpheum Theater", "San Francisco", Obscurity::Hard, -122.41, &[Tag::Art]),
            destination("Louvre", "Paris", Obscurity::Easy, 2.33, &[Tag::Art, Tag::Historical]),
            destination("Eiffel Tower", "Paris", Obscurity::Medium, 2.29, &[Tag::Tourist]),
            destination("Arc de Triomphe", "Paris", Obscurity::Hard, 2.29, &[Tag::Historical]),
        ]
    }

    fn hunt_filter(cities: &[&str], obscurities: &[Obscurity], tags: &[Tag]) -> HuntFilter {
        HuntFilter {
            cities: cities.iter().map(|c| c.to_string()).collect(),
            obscurities: obscurities.iter().copied().collect(),
            tags: tags.iter().copied().collect(),
        }
    }

    fn names(destinations: &[Destination]) -> Vec<&str> {
        destinations.iter().map(|d| d.name.as_str()).collect()
    }

    const ALL_LEVELS: [Obscurity; 3] = [Obscurity::Easy, Obscurity::Medium, Obscurity::Hard];

    #[test]
    fn test_filter_san_francisco() {
        let filtered = filter(all_destinations(), &hunt_filter(&["San Francisco"], &ALL_LEVELS, &[]));
        assert_eq!(names(&filtered), vec!["Golden Gate", "Tea Garden", "Orpheum Theater"]);
    }

    #[test]
    fn test_filter_san_francisco_medium() {
        let filtered = filter(
            all_destinations(),
            &hunt_filter(&["San Francisco"], &[Obscurity::Medium], &[]),
        );
        assert_eq!(names(&filtered), vec!["Tea Garden"]);
    }

    #[test]
    fn test_filter_two_cities_easy() {
        let filtered = filter(
            all_destinations(),
            &hunt_filter(&["San Francisco", "Paris"], &[Obscurity::Easy], &[]),
        );
        assert_eq!(names(&filtered), vec!["Golden Gate", "Louvre"]);
    }

    #[test]
    fn test_filter_everything_allowed() {
        let filtered = filter(
            all_destinations(),
            &hunt_filter(&["San Francisco", "Paris", "New York City"], &ALL_LEVELS, &[]),
        );
        assert_eq!(filtered.len(), 6);
    }

    #[test]
    fn test_filter_by_tags() {
        let filtered = filter(
            all_destinations(),
            &hunt_filter(&["San Francisco", "Paris"], &ALL_LEVELS, &[Tag::Art, Tag::Tourist]),
        );
        assert_eq!(
            names(&filtered),
            vec!["Golden Gate", "Orpheum Theater", "Louvre", "Eiffel Tower"]
        );

        let filtered = filter(all_destinations(), &hunt_filter(&["Paris"], &ALL_LEVELS, &[Tag::Food]));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_requires_some_obscurity() {
        let filtered = filter(all_destinations(), &hunt_filter(&["Paris"], &[], &[]));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_choose_random_size() {
        let mut rng = Rng::with_seed(7);

        for n in 1..=6 {
            let chosen = choose_random(all_destinations(), n, &mut rng).unwrap();
            let unique: BTreeSet<&str> = chosen.iter().map(|d| d.name.as_str()).collect();

            assert_eq!(chosen.len(), n);
            assert_eq!(unique.len(), n);
        }
    }

    #[test]
    fn test_choose_random_exact_returns_all() {
        let chosen = choose_random(all_destinations(), 6, &mut Rng::with_seed(1)).unwrap();
        assert_eq!(names(&chosen), names(&all_destinations()));
    }

    #[test]
    fn test_choose_random_not_enough() {
        let result = choose_random(all_destinations(), 7, &mut Rng::with_seed(1));
        assert!(matches!(
            result,
            Err(AppError::NotEnoughDestinations {
                requested: 7,
                available: 6
            })
        ));

        assert!(matches!(
            choose_random(all_destinations(), 0, &mut Rng::with_seed(1)),
            Err(AppError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_hunt_items_ordered_by_longitude() {
        let items = to_hunt_items(all_destinations());
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();

        // equal longitudes keep their input order and are not collapsed
        assert_eq!(
            names,
            vec![
                "Golden Gate",
                "Tea Garden",
                "Orpheum Theater",
                "Eiffel Tower",
                "Arc de Triomphe",
                "Louvre"
            ]
        );
    }

    #[test]
    fn test_generate() {
        let hunt = generate(
            all_destinations(),
            &hunt_filter(&["San Francisco", "Paris"], &[Obscurity::Easy, Obscurity::Hard], &[]),
            3,
            &mut Rng::with_seed(42),
        )
        .unwrap();

        assert_eq!(hunt.items.len(), 3);
        assert_eq!(hunt.index, -1);
        assert_eq!(hunt.city, "Paris, San Francisco");
        assert!(
            hunt.items
                .windows(2)
                .all(|pair| pair[0].location.lng <= pair[1].location.lng)
        );
    }
}
