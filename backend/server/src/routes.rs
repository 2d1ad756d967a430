use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::info;

use crate::{
    database::{
        is_duplicate, load_cities, load_destinations, load_hunt, save_destination, save_hunt,
        update_hunt,
    },
    error::AppError::{self, HuntNotFound, MalformedPayload},
    guess::check_guess,
    hunt::{HuntFilter, generate},
    models::{Obscurity, ScavengerHunt, Tag},
    state::State as AppState,
    utils::{FormFields, destination_from_form, parse_id, parse_json_list, parse_known},
};

pub const HOME_URL: &str = "/index.html";
pub const GO_URL: &str = "/go.html";

const DUPLICATE: &str = "duplicate";
const ORIGINAL: &str = "original";

fn go_url(hunt_id: u64) -> String {
    format!("{GO_URL}?hunt_id={hunt_id}")
}

async fn find_hunt(state: &AppState, hunt_id: u64) -> Result<ScavengerHunt, AppError> {
    load_hunt(state.store.as_ref(), hunt_id)
        .await?
        .ok_or(HuntNotFound(hunt_id))
}

/// Load, change and store a hunt without losing a concurrent change from this process.
async fn modify_hunt(
    state: &AppState,
    hunt_id: u64,
    change: impl FnOnce(&mut ScavengerHunt) -> Result<(), AppError>,
) -> Result<(), AppError> {
    let _guard = state.hunt_writes.lock().await;

    let mut hunt = find_hunt(state, hunt_id).await?;
    change(&mut hunt)?;
    update_hunt(state.store.as_ref(), hunt_id, &hunt).await?;

    Ok(())
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn destination_handler(
    State(state): State<Arc<AppState>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let destination = destination_from_form(&FormFields::new(pairs))?;

    let _guard = state.submissions.lock().await;

    if let Some(place_id) = &destination.place_id {
        let destinations = load_destinations(state.store.as_ref()).await?;
        if is_duplicate(&destinations, place_id) {
            return Err(AppError::DuplicateDestination(place_id.clone()));
        }
    }

    let id = save_destination(state.store.as_ref(), &destination).await?;
    info!("Stored destination {id}: {} ({})", destination.name, destination.city);

    Ok(Redirect::to(HOME_URL))
}

#[derive(Deserialize)]
pub struct DuplicateQuery {
    #[serde(rename = "place-id")]
    place_id: String,
}

pub async fn duplicates_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DuplicateQuery>,
) -> Result<&'static str, AppError> {
    let destinations = load_destinations(state.store.as_ref()).await?;

    Ok(if is_duplicate(&destinations, query.place_id.trim()) {
        DUPLICATE
    } else {
        ORIGINAL
    })
}

pub async fn cities_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    let cities = load_cities(state.store.as_ref()).await?;

    Ok(Json(cities.into_iter().collect()))
}

#[derive(Deserialize)]
pub struct GenerateForm {
    #[serde(rename = "user-places")]
    places: Option<String>,
    #[serde(rename = "user-diff")]
    difficulties: Option<String>,
    #[serde(rename = "user-tags")]
    tags: Option<String>,
    #[serde(rename = "user-num-stops")]
    num_stops: Option<String>,
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<GenerateForm>,
) -> Result<String, AppError> {
    let cities: Vec<String> = parse_json_list("user-places", form.places.as_deref())?;
    let difficulties: Vec<String> = parse_json_list("user-diff", form.difficulties.as_deref())?;
    let tags: Vec<String> = parse_json_list("user-tags", form.tags.as_deref())?;
    let num_stops: usize = form
        .num_stops
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| MalformedPayload("missing user-num-stops".to_string()))?
        .parse()
        .map_err(|_| MalformedPayload("invalid user-num-stops".to_string()))?;

    let hunt_filter = HuntFilter {
        cities: cities.into_iter().collect(),
        obscurities: parse_known::<Obscurity>(&difficulties),
        tags: parse_known::<Tag>(&tags),
    };

    let destinations = load_destinations(state.store.as_ref()).await?;
    let hunt = generate(destinations, &hunt_filter, num_stops, &mut fastrand::Rng::new())?;

    let id = save_hunt(state.store.as_ref(), &hunt).await?;
    info!("Generated hunt {id} with {} stops in {}", hunt.items.len(), hunt.city);

    Ok(id.to_string())
}

#[derive(Deserialize)]
pub struct HuntQuery {
    hunt_id: Option<String>,
}

pub async fn get_hunt_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HuntQuery>,
) -> Result<Json<ScavengerHunt>, AppError> {
    let hunt_id = parse_id("hunt_id", query.hunt_id.as_deref())?;

    Ok(Json(find_hunt(&state, hunt_id).await?))
}

#[derive(Deserialize)]
pub struct IndexForm {
    hunt_id: Option<String>,
    #[serde(rename = "new-index")]
    new_index: Option<String>,
}

pub async fn update_index_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<IndexForm>,
) -> Result<Redirect, AppError> {
    let hunt_id = parse_id("hunt_id", form.hunt_id.as_deref())?;
    let index: i64 = form
        .new_index
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| MalformedPayload("missing new-index".to_string()))?
        .parse()
        .map_err(|_| MalformedPayload("invalid new-index".to_string()))?;

    modify_hunt(&state, hunt_id, |hunt| Ok(hunt.set_index(index)?)).await?;

    info!("Hunt {hunt_id} moved to stop {index}");
    Ok(Redirect::to(&go_url(hunt_id)))
}

#[derive(Deserialize)]
pub struct GuessQuery {
    #[serde(rename = "guess-input")]
    guess: String,
    answer: Option<String>,
    hunt_id: Option<String>,
}

/// Checks against `answer` when given, otherwise against the hunt's current stop.
pub async fn guess_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GuessQuery>,
) -> Result<String, AppError> {
    let answer = match query.answer.filter(|answer| !answer.trim().is_empty()) {
        Some(answer) => answer,
        None => {
            let hunt_id = parse_id("hunt_id", query.hunt_id.as_deref())?;
            let hunt = find_hunt(&state, hunt_id).await?;

            hunt.current_item()
                .map(|item| item.name.clone())
                .ok_or_else(|| MalformedPayload(format!("hunt {hunt_id} has no current stop")))?
        }
    };

    let correct = check_guess(state.extractor.as_ref(), &query.guess, &answer).await?;

    Ok(correct.to_string())
}

#[derive(Deserialize)]
pub struct NameForm {
    hunt_id: Option<String>,
    #[serde(rename = "name-input")]
    name: Option<String>,
}

pub async fn set_name_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<NameForm>,
) -> Result<Redirect, AppError> {
    let hunt_id = parse_id("hunt_id", form.hunt_id.as_deref())?;

    let name = form
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    modify_hunt(&state, hunt_id, |hunt| {
        hunt.player_name = name;
        Ok(())
    })
    .await?;

    Ok(Redirect::to(&go_url(hunt_id)))
}

pub async fn get_name_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HuntQuery>,
) -> Result<Json<String>, AppError> {
    let hunt_id = parse_id("hunt_id", query.hunt_id.as_deref())?;
    let hunt = find_hunt(&state, hunt_id).await?;

    Ok(Json(hunt.player_name.unwrap_or_default()))
}
