use crate::{Context, Error};

/// Line that separates a spell card header from its description.
const SECTION_SEPARATOR: &str = "\n---\n";

/// Splits `text` into messages of at most `limit` characters.
///
/// Sections separated by a `---` line are sent as separate messages when they
/// all fit. Otherwise the text is cut at the last newline before the limit,
/// or hard at the limit when a line is longer than that. Blank lines at a
/// cut are dropped, so no part is empty or whitespace only.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let sections: Vec<&str> = text
        .split(SECTION_SEPARATOR)
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .collect();
    if sections.len() > 1 && sections.iter().all(|s| s.chars().count() <= limit) {
        return sections.into_iter().map(str::to_string).collect();
    }

    let mut parts = Vec::new();
    let mut rest = text.trim_start_matches('\n');
    while rest.chars().count() > limit {
        // byte offset of the first char past the limit
        let cut = rest
            .char_indices()
            .nth(limit)
            .map_or(rest.len(), |(i, _)| i);
        let (part, next) = match rest[..cut].rfind('\n') {
            Some(newline) if newline > 0 => (&rest[..newline], &rest[newline + 1..]),
            _ => (&rest[..cut], &rest[cut..]),
        };
        push_part(&mut parts, part.trim_end());
        rest = next.trim_start_matches('\n');
    }
    push_part(&mut parts, rest);
    parts
}

fn push_part(parts: &mut Vec<String>, part: &str) {
    if !part.trim().is_empty() {
        parts.push(part.to_string());
    }
}

/// Sends `text`, split to the configured message limit. The first part
/// answers the interaction and the rest go out as follow-ups.
pub async fn send_chunked(ctx: Context<'_>, text: &str, ephemeral: bool) -> Result<(), Error> {
    for part in split_message(text, ctx.data().config.char_limit()) {
        ctx.send(
            poise::CreateReply::default()
                .content(part)
                .ephemeral(ephemeral),
        )
        .await?;
    }
    Ok(())
}

/// Ephemeral one-line answer for rejected input.
pub async fn say_ephemeral(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(text)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
