use std::{collections::BTreeSet, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::AppError::{self, MalformedPayload},
    models::{Destination, LatLng, Obscurity, Riddle, Tag},
};

pub const NAME_PARAMETER: &str = "name";
pub const LAT_PARAMETER: &str = "latitude";
pub const LNG_PARAMETER: &str = "longitude";
pub const CITY_PARAMETER: &str = "city";
pub const DESCRIPTION_PARAMETER: &str = "description";
pub const RIDDLE_PARAMETER: &str = "riddle";
pub const HINT_PARAMETERS: [&str; 3] = ["hint1", "hint2", "hint3"];
pub const OBSCURITY_PARAMETER: &str = "obscurity";
pub const TAG_PARAMETER: &str = "tag";
pub const PLACE_ID_PARAMETER: &str = "placeId";

static UNDERSCORES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_]").unwrap());
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Alphabetic}\p{M}\p{N}\s-]").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Lowercases and strips everything but letters, digits, dashes and single spaces.
/// Letters from any script survive, accents included: `Café` stays `café`.
pub fn sanitize(input: &str) -> String {
    let s = UNDERSCORES.replace_all(input, " ");
    let s = DISALLOWED.replace_all(&s, "");

    SPACES.replace_all(s.trim(), " ").to_lowercase()
}

/// Form fields in submission order. Repeated keys (`tag`) stay repeated.
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
    }

    pub fn all(&self, key: &str) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.trim())
    }

    pub fn required(&self, key: &str) -> Result<&str, AppError> {
        self.first(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MalformedPayload(format!("missing {key}")))
    }

    pub fn parsed<T: FromStr>(&self, key: &str) -> Result<T, AppError> {
        self.required(key)?
            .parse()
            .map_err(|_| MalformedPayload(format!("invalid {key}")))
    }
}

pub fn destination_from_form(form: &FormFields) -> Result<Destination, AppError> {
    let location = LatLng::new(form.parsed(LAT_PARAMETER)?, form.parsed(LNG_PARAMETER)?);
    if !location.lat.is_finite() || !location.lng.is_finite() {
        return Err(MalformedPayload("coordinates must be finite".to_string()));
    }

    let riddle = HINT_PARAMETERS
        .iter()
        .filter_map(|key| form.first(key))
        .fold(
            Riddle::builder().puzzle(form.required(RIDDLE_PARAMETER)?),
            |builder, hint| builder.hint(hint),
        )
        .build();

    let obscurity: Obscurity = form.required(OBSCURITY_PARAMETER)?.parse()?;

    let tags: BTreeSet<Tag> = form
        .all(TAG_PARAMETER)
        .filter_map(|tag| match tag.parse() {
            Ok(tag) => Some(tag),
            Err(e) => {
                debug!("Ignoring tag: {e}");
                None
            }
        })
        .collect();

    let builder = Destination::builder()
        .name(form.required(NAME_PARAMETER)?)
        .location(location)
        .city(form.required(CITY_PARAMETER)?)
        .description(form.first(DESCRIPTION_PARAMETER).unwrap_or_default())
        .riddle(riddle)
        .obscurity(obscurity)
        .tags(tags);

    Ok(match form.first(PLACE_ID_PARAMETER).filter(|id| !id.is_empty()) {
        Some(place_id) => builder.place_id(place_id),
        None => builder,
    }
    .build())
}

/// Filter fields arrive as JSON arrays inside form fields, e.g. `user-places=["Paris"]`.
/// A missing or blank field is an empty list.
pub fn parse_json_list<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Result<Vec<T>, AppError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => serde_json::from_str(raw).map_err(|_| MalformedPayload(format!("invalid {key}"))),
        None => Ok(Vec::new()),
    }
}

/// Keeps the values that parse, drops the rest.
pub fn parse_known<T: FromStr>(values: &[String]) -> BTreeSet<T>
where
    T: Ord,
{
    values.iter().filter_map(|value| value.parse().ok()).collect()
}

pub fn parse_id(key: &str, raw: Option<&str>) -> Result<u64, AppError> {
    raw.map(str::trim)
        .ok_or_else(|| MalformedPayload(format!("missing {key}")))?
        .parse()
        .map_err(|_| MalformedPayload(format!("invalid {key}")))
}
