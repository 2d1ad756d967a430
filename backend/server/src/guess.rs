use std::collections::HashSet;

use crate::{
    language::{EntityExtractor, LanguageError},
    utils::sanitize,
};

/// A guess is correct when every entity in the answer also appears in the guess,
/// ignoring case. Extra entities in the guess are fine. Accents are not folded, so `Cafe`
/// does not match `Café`.
///
/// When the answer has no entities at all the sanitized texts must match exactly,
/// otherwise any guess would pass.
pub async fn check_guess(
    extractor: &dyn EntityExtractor,
    guess: &str,
    answer: &str,
) -> Result<bool, LanguageError> {
    let answer_entities = lowercase(extractor.extract(answer).await?);

    if answer_entities.is_empty() {
        return Ok(!sanitize(answer).is_empty() && sanitize(guess) == sanitize(answer));
    }

    let guess_entities = lowercase(extractor.extract(guess).await?);

    Ok(answer_entities.is_subset(&guess_entities))
}

fn lowercase(entities: Vec<String>) -> HashSet<String> {
    entities
        .into_iter()
        .map(|entity| entity.to_lowercase())
        .collect()
}
