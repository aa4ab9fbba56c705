use super::{SpellIndex, SpellRecord};
use crate::reply::{say_ephemeral, send_chunked};
use crate::templates::TemplateKind;
use crate::{Context, Error};

use tracing::{debug, error};

/// Outcome of resolving `/spell` arguments against the index.
#[derive(Debug, PartialEq)]
pub enum SpellLookup<'a> {
    UnknownSource(String),
    NotFound(String),
    Found(&'a SpellRecord),
    Ambiguous(Vec<&'a SpellRecord>),
}

pub fn lookup<'a>(index: &'a SpellIndex, name: &str, source: Option<&str>) -> SpellLookup<'a> {
    if let Some(source) = source {
        if !index.has_source(source) {
            return SpellLookup::UnknownSource(source.trim().to_string());
        }
    }

    let mut found = index.find(name, source);
    match found.len() {
        0 => SpellLookup::NotFound(name.trim().to_string()),
        1 => SpellLookup::Found(found.remove(0)),
        _ => SpellLookup::Ambiguous(found),
    }
}

pub fn unknown_source_message(source: &str) -> String {
    format!(
        "Source `{source}` not found! Format should be in the form of \"PHB\", \"XGE\", etc. \
         Only exact matches work currently, sorry."
    )
}

pub fn not_found_message(name: &str) -> String {
    format!(
        "Spell `{name}` not found! Format should be in the form of \"Fireball\", \"Cure Wounds\", \
         etc. Only exact matches work currently, sorry."
    )
}

pub fn ambiguous_message(candidates: &[&SpellRecord]) -> String {
    let name = candidates.first().map_or("", |record| record.name.as_str());
    let sources = candidates
        .iter()
        .map(|record| format!("`{}`", record.source))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "`{name}` appears in more than one source: {sources}. \
         Run the command again with the `source` option to pick one."
    )
}

/// Look up a spell by name.
///
/// The name must be an exact match, ignoring case. If the spell was printed
/// in more than one book, give the book's abbreviation as `source`.
#[poise::command(slash_command)]
pub async fn spell(
    ctx: Context<'_>,
    #[description = "The name of the spell to look up. Exact matches only."] name: String,
    #[description = "The source of the spell to look up (e.g., PHB, XGE)."] source: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();

    let record = match lookup(&data.spells, &name, source.as_deref()) {
        SpellLookup::Found(record) => record,
        SpellLookup::UnknownSource(source) => {
            return say_ephemeral(ctx, unknown_source_message(&source)).await
        }
        SpellLookup::NotFound(name) => return say_ephemeral(ctx, not_found_message(&name)).await,
        SpellLookup::Ambiguous(candidates) => {
            return say_ephemeral(ctx, ambiguous_message(&candidates)).await
        }
    };

    debug!("Rendering {} ({})", record.name, record.source);
    let card = match data
        .templates
        .render(TemplateKind::Spell, &record.card_fields())
    {
        Ok(card) => card,
        Err(e) => {
            error!("Failed to render {} ({}): {}", record.name, record.source, e);
            return say_ephemeral(ctx, "Sorry, spell information did not format properly!")
                .await;
        }
    };

    send_chunked(ctx, card.trim_end(), false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::index::parse_record;
    use serde_json::json;

    fn index() -> SpellIndex {
        SpellIndex::from_records(
            [
                ("Fireball", "PHB"),
                ("Fireball", "SRD"),
                ("Cure Wounds", "PHB"),
                ("Toll the Dead", "XGE"),
            ]
            .into_iter()
            .map(|(name, source)| parse_record(json!({ "name": name, "source": source })).unwrap()),
        )
    }

    #[test]
    fn single_match_is_found() {
        let index = index();

        match lookup(&index, "cure wounds", None) {
            SpellLookup::Found(record) => assert_eq!(record.source, "PHB"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reprint_without_source_is_ambiguous() {
        let index = index();

        match lookup(&index, "Fireball", None) {
            SpellLookup::Ambiguous(candidates) => {
                let message = ambiguous_message(&candidates);
                assert!(message.contains("`PHB`, `SRD`"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn source_picks_one_reprint() {
        let index = index();

        match lookup(&index, "Fireball", Some("PHB")) {
            SpellLookup::Found(record) => assert_eq!(record.source, "PHB"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn known_source_without_the_spell_is_not_found() {
        let index = index();

        assert_eq!(
            lookup(&index, "Fireball", Some("XGE")),
            SpellLookup::NotFound("Fireball".to_string())
        );
    }

    #[test]
    fn unknown_source_is_reported_before_the_name() {
        let index = index();

        assert_eq!(
            lookup(&index, "Fireball", Some(" TCE ")),
            SpellLookup::UnknownSource("TCE".to_string())
        );
    }

    #[test]
    fn missing_spell_is_not_found() {
        let index = index();

        let outcome = lookup(&index, "Nonexistent Spell", None);

        assert_eq!(
            outcome,
            SpellLookup::NotFound("Nonexistent Spell".to_string())
        );
        assert!(not_found_message("Nonexistent Spell").starts_with("Spell `Nonexistent Spell` not found!"));
    }
}
