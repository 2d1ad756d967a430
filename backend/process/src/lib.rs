//! # Destination Loading
//!
//! Bulk import of destinations from a JSON file, e.g. the samples in `data/destinations.json`.
//!
//! 1. Read the file: a JSON array of destinations, same shape as the stored blobs.
//!
//! 2. Load the place ids already in the store.
//!
//! 3. For each destination in the file, skip it if its place id is already stored or appeared
//!    earlier in the file. Destinations without a place id are always new.
//!
//! 4. Store the rest, one blob each, with fresh ids.
//!
//! Running the same file twice is a no-op the second time, as long as every entry has a place id.
use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Error};
use indicatif::{ProgressBar, ProgressStyle};
use server::{
    database::{Datastore, StoreError, load_destinations, save_destination},
    models::Destination,
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub new_items: usize,
    pub duplicates: usize,
}

pub fn read_destinations(path: &Path) -> Result<Vec<Destination>, Error> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

pub async fn store_destinations(
    store: &dyn Datastore,
    destinations: Vec<Destination>,
    dry_run: bool,
) -> Result<Summary, StoreError> {
    let mut known: HashSet<String> = load_destinations(store)
        .await?
        .into_iter()
        .filter_map(|destination| destination.place_id)
        .collect();

    println!("Loaded Place Ids: {}\n", known.len());

    let pb = ProgressBar::new(destinations.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> "),
    );

    let mut summary = Summary::default();

    for destination in destinations {
        pb.set_message(destination.name.clone());

        let is_new = match &destination.place_id {
            Some(place_id) => known.insert(place_id.clone()),
            None => true,
        };

        if !is_new {
            #[cfg(feature = "verbose")]
            println!("Duplicate! {}", destination.name);

            summary.duplicates += 1;
            pb.inc(1);
            continue;
        }

        if !dry_run {
            save_destination(store, &destination).await?;
        }

        summary.new_items += 1;
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use server::{
        database::MemoryStore,
        models::{LatLng, Obscurity},
    };

    use super::*;

    fn destination(name: &str, place_id: Option<&str>) -> Destination {
        let builder = Destination::builder()
            .name(name)
            .city("Paris")
            .location(LatLng::new(48.86, 2.33))
            .obscurity(Obscurity::Easy);

        match place_id {
            Some(place_id) => builder.place_id(place_id).build(),
            None => builder.build(),
        }
    }

    #[tokio::test]
    async fn test_skips_known_and_repeated_place_ids() {
        let store = MemoryStore::new();
        save_destination(&store, &destination("Louvre", Some("louvre")))
            .await
            .unwrap();

        let summary = store_destinations(
            &store,
            vec![
                destination("Louvre", Some("louvre")),
                destination("Eiffel Tower", Some("eiffel")),
                destination("Eiffel Tower again", Some("eiffel")),
                destination("Somewhere", None),
            ],
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            Summary {
                new_items: 2,
                duplicates: 2
            }
        );
        assert_eq!(load_destinations(&store).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = MemoryStore::new();

        let summary = store_destinations(&store, vec![destination("Louvre", Some("louvre"))], true)
            .await
            .unwrap();

        assert_eq!(summary.new_items, 1);
        assert!(load_destinations(&store).await.unwrap().is_empty());
    }

    #[test]
    fn test_sample_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/destinations.json");
        let destinations = read_destinations(&path).unwrap();

        assert!(destinations.len() >= 6);
        assert!(destinations.iter().all(|d| d.place_id.is_some()));
    }
}
