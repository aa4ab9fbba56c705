//! Typed spell records as they appear in 5e.tools style book files, and
//! their conversion into spell card template fields.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;

static INLINE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{@([a-zA-Z]+)(?: ([^{}]*))?\}").expect("tag pattern is valid"));

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRecord {
    pub name: String,
    pub source: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub time: Vec<CastingTime>,
    #[serde(default)]
    pub range: Option<SpellRange>,
    #[serde(default)]
    pub components: Components,
    #[serde(default)]
    pub duration: Vec<SpellDuration>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub entries_higher_level: Vec<Entry>,
    #[serde(default)]
    pub other_sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CastingTime {
    #[serde(default = "one")]
    pub number: u32,
    pub unit: String,
    #[serde(default)]
    pub condition: Option<String>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpellRange {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub distance: Option<Distance>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Distance {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub v: bool,
    #[serde(default)]
    pub s: bool,
    #[serde(default)]
    pub m: Option<Material>,
    #[serde(default)]
    pub r: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Material {
    Flag(bool),
    Text(String),
    Detailed { text: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpellDuration {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub duration: Option<DurationAmount>,
    #[serde(default)]
    pub concentration: bool,
    #[serde(default)]
    pub ends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DurationAmount {
    #[serde(rename = "type")]
    pub unit: String,
    #[serde(default = "one")]
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceRef {
    pub source: String,
    #[serde(default)]
    pub page: Option<u32>,
}

/// One element of a spell's description body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Text(String),
    Node(EntryNode),
    Block(EntryBlock),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntryNode {
    List {
        #[serde(default)]
        items: Vec<Entry>,
    },
    Table {
        #[serde(default)]
        caption: Option<String>,
        #[serde(default, rename = "colLabels")]
        col_labels: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<Value>>,
    },
    Entries {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        entries: Vec<Entry>,
    },
    Item {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        entry: Option<Box<Entry>>,
        #[serde(default)]
        entries: Vec<Entry>,
    },
}

/// Any other node (`inset`, `quote`, `section`, ...). Whatever text it
/// carries in `name`, `entry` or `entries` is kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryBlock {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entry: Option<Box<Entry>>,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl SpellRecord {
    pub fn level_text(&self) -> String {
        match self.level {
            0 => "Cantrip".to_string(),
            1 => "1st-level".to_string(),
            2 => "2nd-level".to_string(),
            3 => "3rd-level".to_string(),
            n => format!("{n}th-level"),
        }
    }

    pub fn school_text(&self) -> &'static str {
        match self.school.as_str() {
            "A" => "Abjuration",
            "C" => "Conjuration",
            "D" => "Divination",
            "E" => "Enchantment",
            "V" => "Evocation",
            "I" => "Illusion",
            "N" => "Necromancy",
            "T" => "Transmutation",
            "P" => "Psionic",
            _ => "Unknown",
        }
    }

    pub fn casting_time_text(&self) -> String {
        let mut text = String::new();
        let last = self.time.len().saturating_sub(1);
        for (i, time) in self.time.iter().enumerate() {
            if i > 0 {
                text.push_str(if i == last { "; or " } else { "; " });
            }
            text.push_str(&format!("{} {}", time.number, time.unit));
            if let Some(condition) = &time.condition {
                text.push(' ');
                text.push_str(&strip_tags(condition));
            }
        }
        text
    }

    pub fn range_text(&self) -> String {
        let Some(range) = &self.range else {
            return "Special".to_string();
        };

        match (range.kind.as_str(), &range.distance) {
            ("special", _) | (_, None) => capitalize(&range.kind),
            ("point", Some(distance)) => match (distance.kind.as_str(), distance.amount) {
                ("feet" | "foot" | "mile" | "miles", Some(amount)) => {
                    format!("{amount} {}", distance.kind)
                }
                (kind, _) => capitalize(kind),
            },
            (shape, Some(distance)) => {
                let unit = match distance.kind.as_str() {
                    "feet" => "foot",
                    "miles" => "mile",
                    other => other,
                };
                match distance.amount {
                    Some(amount) => format!("Self ({amount}-{unit} {shape})"),
                    None => format!("Self ({shape})"),
                }
            }
        }
    }

    pub fn components_text(&self) -> String {
        let c = &self.components;
        let mut parts = Vec::new();
        if c.v {
            parts.push("V".to_string());
        }
        if c.s {
            parts.push("S".to_string());
        }
        match &c.m {
            Some(Material::Flag(true)) => parts.push("M".to_string()),
            Some(Material::Text(text)) | Some(Material::Detailed { text }) => {
                parts.push(format!("M ({})", strip_tags(text)))
            }
            Some(Material::Flag(false)) | None => {}
        }
        if c.r {
            parts.push("R".to_string());
        }
        parts.join(", ")
    }

    pub fn duration_text(&self) -> String {
        if self.duration.is_empty() {
            return "Special".to_string();
        }

        self.duration
            .iter()
            .map(|d| match (d.kind.as_str(), &d.duration) {
                ("timed", Some(amount)) => {
                    let mut text = format!("{} {}", amount.amount, amount.unit);
                    if amount.amount > 1 {
                        text.push('s');
                    }
                    if d.concentration {
                        text.push_str(" (Concentration)");
                    }
                    text
                }
                ("permanent", _) if !d.ends.is_empty() => {
                    format!("Until {}", d.ends.join(" or "))
                }
                ("permanent", _) => "Permanent".to_string(),
                (kind, _) => capitalize(kind),
            })
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Markdown body built from the description and higher-level entries.
    pub fn description_text(&self) -> String {
        let mut out = String::new();
        render_entries(&self.entries, &mut out);
        render_entries(&self.entries_higher_level, &mut out);
        out
    }

    pub fn page_text(&self) -> String {
        self.page.map_or_else(|| "?".to_string(), |page| page.to_string())
    }

    pub fn other_sources_text(&self) -> String {
        if self.other_sources.is_empty() {
            return String::new();
        }
        let listed = self
            .other_sources
            .iter()
            .map(|other| match other.page {
                Some(page) => format!("{}, page {page}", other.source),
                None => other.source.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ");
        format!(". Also found in {listed}")
    }

    /// Fields for the spell card template.
    pub fn card_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("spell_name", self.name.clone()),
            ("spell_level", self.level_text()),
            ("spell_school", self.school_text().to_string()),
            ("spell_casting_time", self.casting_time_text()),
            ("spell_range", self.range_text()),
            ("spell_components", self.components_text()),
            ("spell_duration", self.duration_text()),
            ("spell_description", self.description_text()),
            ("source_book", self.source.clone()),
            ("source_page", self.page_text()),
            ("sources_other", self.other_sources_text()),
        ]
    }
}

fn render_entries(entries: &[Entry], out: &mut String) {
    for entry in entries {
        match entry {
            Entry::Text(text) => {
                out.push_str(&strip_tags(text));
                out.push('\n');
            }
            Entry::Node(EntryNode::List { items }) => {
                for item in items {
                    let mut line = String::new();
                    render_entries(std::slice::from_ref(item), &mut line);
                    if !line.is_empty() {
                        out.push_str("* ");
                        out.push_str(&line);
                    }
                }
            }
            Entry::Node(EntryNode::Table {
                caption,
                col_labels,
                rows,
            }) => {
                if let Some(caption) = caption {
                    out.push_str(&format!("**{}:**\n", strip_tags(caption)));
                }
                if !col_labels.is_empty() {
                    let labels: Vec<String> = col_labels.iter().map(|l| strip_tags(l)).collect();
                    out.push_str(&format!("| {} |\n", labels.join(" | ")));
                    out.push_str(&format!("|{}\n", " --- |".repeat(col_labels.len())));
                }
                for row in rows {
                    let cells: Vec<String> = row.iter().map(cell_text).collect();
                    out.push_str(&format!("| {} |\n", cells.join(" | ")));
                }
            }
            Entry::Node(EntryNode::Entries { name, entries }) => {
                if let Some(name) = name {
                    out.push_str(&format!("**{}:** ", strip_tags(name)));
                }
                render_entries(entries, out);
            }
            Entry::Node(EntryNode::Item {
                name,
                entry,
                entries,
            }) => {
                if let Some(name) = name {
                    out.push_str(&format!("**{}** ", strip_tags(name)));
                }
                if let Some(entry) = entry {
                    render_entries(std::slice::from_ref(entry.as_ref()), out);
                }
                render_entries(entries, out);
            }
            Entry::Block(block) => {
                if let Some(name) = &block.name {
                    out.push_str(&format!("**{}:** ", strip_tags(name)));
                }
                if let Some(entry) = &block.entry {
                    render_entries(std::slice::from_ref(entry.as_ref()), out);
                }
                render_entries(&block.entries, out);
            }
        }
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(text) => strip_tags(text),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => match map.get("roll") {
            Some(Value::Object(roll)) => match (roll.get("exact"), roll.get("min"), roll.get("max")) {
                (Some(exact), _, _) => exact.to_string(),
                (None, Some(min), Some(max)) => format!("{min}-{max}"),
                _ => String::new(),
            },
            _ => map
                .get("entry")
                .and_then(Value::as_str)
                .map(strip_tags)
                .unwrap_or_default(),
        },
        other => other.to_string(),
    }
}

/// Replaces 5e.tools inline tags such as `{@damage 8d6}` or
/// `{@spell fireball|XGE}` with their display text.
pub fn strip_tags(text: &str) -> String {
    let mut current = text.to_string();
    // innermost tags first, nested ones surface on the next pass
    loop {
        let next = INLINE_TAG
            .replace_all(&current, |caps: &Captures| {
                let tag = &caps[1];
                let body = caps.get(2).map_or("", |m| m.as_str());
                tag_display_text(tag, body)
            })
            .into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

fn tag_display_text(tag: &str, body: &str) -> String {
    let parts: Vec<&str> = body.split('|').collect();
    match tag {
        "h" => "Hit:".to_string(),
        "scaledamage" | "scaledice" => parts.last().copied().unwrap_or_default().to_string(),
        "chance" => format!("{} percent", parts[0]),
        _ => parts
            .get(2)
            .filter(|display| !display.is_empty())
            .copied()
            .unwrap_or(parts[0])
            .to_string(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
