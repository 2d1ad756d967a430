//! # Models
//!
//! Value types stored as JSON blobs in the datastore.
//!
//! - `Destination`: submitted by users, one record per place
//! - `ScavengerHunt`: a generated, ordered list of `HuntItem`s plus the player's progress
//!
//! Both are built once and then only replaced wholesale. The only field that changes after
//! a hunt is stored is its `index` (and the player name), and that is written back as a new blob.
use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("Unknown obscurity: {0}")]
    UnknownObscurity(String),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Index {index} out of range for a hunt of {len} items")]
    IndexOutOfRange { index: i64, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Riddle {
    pub puzzle: String,
    pub hints: Vec<String>,
}

impl Riddle {
    pub fn builder() -> RiddleBuilder {
        RiddleBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct RiddleBuilder {
    puzzle: String,
    hints: Vec<String>,
}

impl RiddleBuilder {
    pub fn puzzle(mut self, puzzle: impl Into<String>) -> Self {
        self.puzzle = puzzle.into();
        self
    }

    /// Appends a hint. Hints keep their insertion order, blank ones are dropped.
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        if !hint.trim().is_empty() {
            self.hints.push(hint);
        }
        self
    }

    pub fn build(self) -> Riddle {
        Riddle {
            puzzle: self.puzzle,
            hints: self.hints,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Obscurity {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Obscurity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Obscurity::Easy),
            "medium" => Ok(Obscurity::Medium),
            "hard" => Ok(Obscurity::Hard),
            _ => Err(ModelError::UnknownObscurity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Food,
    Sport,
    Tourist,
    Historical,
    Art,
    Family,
}

impl FromStr for Tag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" => Ok(Tag::Food),
            // the submission form sends "sports"
            "sport" | "sports" => Ok(Tag::Sport),
            "tourist" => Ok(Tag::Tourist),
            "historical" => Ok(Tag::Historical),
            "art" => Ok(Tag::Art),
            "family" => Ok(Tag::Family),
            _ => Err(ModelError::UnknownTag(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub location: LatLng,
    pub city: String,
    pub description: String,
    pub riddles: Vec<Riddle>,
    pub obscurity: Obscurity,
    #[serde(default)]
    pub tags: BTreeSet<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
}

impl Destination {
    pub fn builder() -> DestinationBuilder {
        DestinationBuilder::default()
    }

    pub fn has_common_tag(&self, tags: &BTreeSet<Tag>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    /// Hunts only carry one riddle per stop, the first one submitted.
    pub fn to_hunt_item(&self) -> HuntItem {
        HuntItem {
            name: self.name.clone(),
            location: self.location,
            description: self.description.clone(),
            riddle: self.riddles.first().cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
pub struct DestinationBuilder {
    name: String,
    location: LatLng,
    city: String,
    description: String,
    riddles: Vec<Riddle>,
    obscurity: Obscurity,
    tags: BTreeSet<Tag>,
    place_id: Option<String>,
}

impl Default for DestinationBuilder {
    fn default() -> Self {
        Self {
            name: String::new(),
            location: LatLng::new(0.0, 0.0),
            city: String::new(),
            description: String::new(),
            riddles: Vec::new(),
            obscurity: Obscurity::Easy,
            tags: BTreeSet::new(),
            place_id: None,
        }
    }
}

impl DestinationBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn location(mut self, location: LatLng) -> Self {
        self.location = location;
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn riddle(mut self, riddle: Riddle) -> Self {
        self.riddles.push(riddle);
        self
    }

    pub fn obscurity(mut self, obscurity: Obscurity) -> Self {
        self.obscurity = obscurity;
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn place_id(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }

    pub fn build(self) -> Destination {
        Destination {
            name: self.name,
            location: self.location,
            city: self.city,
            description: self.description,
            riddles: self.riddles,
            obscurity: self.obscurity,
            tags: self.tags,
            place_id: self.place_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuntItem {
    pub name: String,
    pub location: LatLng,
    pub description: String,
    pub riddle: Riddle,
}

/// A generated hunt. `index` is the stop the player is currently looking for:
/// `-1` before the hunt starts, `items.len()` once it is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScavengerHunt {
    pub items: Vec<HuntItem>,
    pub index: i64,
    pub city: String,
    #[serde(default)]
    pub player_name: Option<String>,
}

impl ScavengerHunt {
    pub fn new(items: Vec<HuntItem>, city: impl Into<String>) -> Self {
        Self {
            items,
            index: -1,
            city: city.into(),
            player_name: None,
        }
    }

    pub fn set_index(&mut self, index: i64) -> Result<(), ModelError> {
        let len = self.items.len();
        if index < -1 || index > len as i64 {
            return Err(ModelError::IndexOutOfRange { index, len });
        }

        self.index = index;
        Ok(())
    }

    pub fn current_item(&self) -> Option<&HuntItem> {
        usize::try_from(self.index)
            .ok()
            .and_then(|index| self.items.get(index))
    }

    pub fn is_finished(&self) -> bool {
        self.index == self.items.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn golden_gate() -> Destination {
        Destination::builder()
            .name("Golden Gate Bridge")
            .location(LatLng::new(37.8199, -122.4783))
            .city("San Francisco")
            .description("Famous Bridge in SF")
            .riddle(
                Riddle::builder()
                    .puzzle("Stay away from me if you're afraid of heights")
                    .hint("Overlooks the water")
                    .hint("Golden-red in color")
                    .hint("You have to pay to use me")
                    .build(),
            )
            .tags([Tag::Tourist, Tag::Family, Tag::Historical])
            .obscurity(Obscurity::Easy)
            .place_id("123")
            .build()
    }

    #[test]
    fn test_obscurity_parsing() {
        assert_eq!("easy".parse::<Obscurity>(), Ok(Obscurity::Easy));
        assert_eq!("Medium".parse::<Obscurity>(), Ok(Obscurity::Medium));
        assert_eq!(" HARD ".parse::<Obscurity>(), Ok(Obscurity::Hard));
        assert_eq!(
            "impossible".parse::<Obscurity>(),
            Err(ModelError::UnknownObscurity("impossible".to_string()))
        );
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!("sports".parse::<Tag>(), Ok(Tag::Sport));
        assert_eq!("sport".parse::<Tag>(), Ok(Tag::Sport));
        assert_eq!("Art".parse::<Tag>(), Ok(Tag::Art));
        assert!("nightlife".parse::<Tag>().is_err());
    }

    #[test]
    fn test_riddle_builder_skips_blank_hints() {
        let riddle = Riddle::builder()
            .puzzle("I was constructed in 1933")
            .hint("I am at the periphery of SF")
            .hint("   ")
            .hint("I am golden in color")
            .build();

        assert_eq!(
            riddle.hints,
            vec!["I am at the periphery of SF", "I am golden in color"]
        );
    }

    #[test]
    fn test_destination_json_shape() {
        let json = serde_json::to_value(golden_gate()).unwrap();

        assert_eq!(json["obscurity"], "easy");
        assert_eq!(json["tags"], serde_json::json!(["tourist", "historical", "family"]));
        assert_eq!(json["location"]["lng"], -122.4783);
        assert_eq!(json["place_id"], "123");
    }

    #[test]
    fn test_has_common_tag() {
        let destination = golden_gate();

        assert!(destination.has_common_tag(&BTreeSet::from([Tag::Family, Tag::Food])));
        assert!(!destination.has_common_tag(&BTreeSet::from([Tag::Food, Tag::Art])));
        assert!(!destination.has_common_tag(&BTreeSet::new()));
    }

    #[test]
    fn test_to_hunt_item_uses_first_riddle() {
        let item = golden_gate().to_hunt_item();

        assert_eq!(item.name, "Golden Gate Bridge");
        assert_eq!(item.riddle.puzzle, "Stay away from me if you're afraid of heights");
        assert_eq!(item.riddle.hints.len(), 3);

        let bare = Destination::builder().name("Louvre").build().to_hunt_item();
        assert_eq!(bare.riddle, Riddle::default());
    }

    #[test]
    fn test_hunt_index_bounds() {
        let mut hunt = ScavengerHunt::new(vec![golden_gate().to_hunt_item()], "San Francisco");
        assert_eq!(hunt.index, -1);
        assert!(hunt.current_item().is_none());

        hunt.set_index(0).unwrap();
        assert_eq!(hunt.current_item().unwrap().name, "Golden Gate Bridge");

        hunt.set_index(1).unwrap();
        assert!(hunt.is_finished());
        assert!(hunt.current_item().is_none());

        assert_eq!(
            hunt.set_index(2),
            Err(ModelError::IndexOutOfRange { index: 2, len: 1 })
        );
        assert!(hunt.set_index(-2).is_err());
        assert_eq!(hunt.index, 1);
    }
}
