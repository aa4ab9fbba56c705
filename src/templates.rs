//! Markdown reply templates with `{name}` placeholders.
//!
//! Templates are read once at startup from the configured directory. A file
//! that is not there falls back to the copy bundled into the binary, so the
//! bot can always answer `/roll` and `/spell`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CHECKLIST_PREFIX: &str = "checklist_";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{template}` has no value for placeholder `{field}`")]
    MissingField { template: &'static str, field: String },
    #[error("template `{template}` has an unterminated placeholder")]
    Unterminated { template: &'static str },
    #[error("failed to read template {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Spell,
    Roll,
    NewDay,
    Rest,
    TravelStart,
    TravelResult,
}

impl TemplateKind {
    const ALL: [TemplateKind; 6] = [
        Self::Spell,
        Self::Roll,
        Self::NewDay,
        Self::Rest,
        Self::TravelStart,
        Self::TravelResult,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Spell => "spell.md",
            Self::Roll => "roll.md",
            Self::NewDay => "newday.md",
            Self::Rest => "rest.md",
            Self::TravelStart => "travel_start.md",
            Self::TravelResult => "travel_result.md",
        }
    }

    fn bundled(self) -> &'static str {
        match self {
            Self::Spell => include_str!("../templates/spell.md"),
            Self::Roll => include_str!("../templates/roll.md"),
            Self::NewDay => include_str!("../templates/newday.md"),
            Self::Rest => include_str!("../templates/rest.md"),
            Self::TravelStart => include_str!("../templates/travel_start.md"),
            Self::TravelResult => include_str!("../templates/travel_result.md"),
        }
    }
}

const BUNDLED_CHECKLISTS: [&str; 2] = [
    include_str!("../templates/checklist_1_morning.md"),
    include_str!("../templates/checklist_2_roles.md"),
];

pub struct Templates {
    by_kind: HashMap<TemplateKind, String>,
    checklists: Vec<String>,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            by_kind: TemplateKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.bundled().to_string()))
                .collect(),
            checklists: BUNDLED_CHECKLISTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Templates {
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut templates = Self::default();

        for kind in TemplateKind::ALL {
            let path = dir.join(kind.file_name());
            if let Some(text) = read_if_present(&path)? {
                debug!("Loaded template {}", path.display());
                templates.by_kind.insert(kind, text);
            } else {
                debug!("Template {} not found, using bundled copy", path.display());
            }
        }

        let checklists = read_checklists(dir)?;
        if !checklists.is_empty() {
            templates.checklists = checklists;
        }

        info!(
            "Templates ready from {} ({} checklist parts)",
            dir.display(),
            templates.checklists.len()
        );

        Ok(templates)
    }

    pub fn render(
        &self,
        kind: TemplateKind,
        fields: &[(&str, String)],
    ) -> Result<String, TemplateError> {
        let template = self
            .by_kind
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.bundled());
        render(kind.file_name(), template, fields)
    }

    pub fn checklists(&self) -> &[String] {
        &self.checklists
    }
}

fn read_if_present(path: &Path) -> Result<Option<String>, TemplateError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TemplateError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_checklists(dir: &Path) -> Result<Vec<String>, TemplateError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(Vec::new()),
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(CHECKLIST_PREFIX) && name.ends_with(".md"))
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            std::fs::read_to_string(&path).map_err(|source| TemplateError::Read { path, source })
        })
        .collect()
}

/// Substitutes `{field}` placeholders. `{{` and `}}` produce literal braces.
pub fn render(
    name: &'static str,
    template: &str,
    fields: &[(&str, String)],
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(TemplateError::Unterminated { template: name }),
                    }
                }
                let value = fields
                    .iter()
                    .find(|(key, _)| *key == field)
                    .map(|(_, value)| value)
                    .ok_or_else(|| TemplateError::MissingField {
                        template: name,
                        field: field.clone(),
                    })?;
                out.push_str(value);
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_fields() {
        let fields = [("name", "Fireball".to_string()), ("level", "3".to_string())];

        let rendered = render("t", "{name} is level {level}. {name}!", &fields).unwrap();

        assert_eq!(rendered, "Fireball is level 3. Fireball!");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let rendered = render("t", "{{not a field}} {x}", &[("x", "y".to_string())]).unwrap();

        assert_eq!(rendered, "{not a field} y");
    }

    #[test]
    fn missing_field_is_an_error() {
        let result = render("t", "hello {who}", &[]);

        assert!(matches!(
            result,
            Err(TemplateError::MissingField { field, .. }) if field == "who"
        ));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let result = render("t", "hello {who", &[("who", "x".to_string())]);

        assert!(matches!(result, Err(TemplateError::Unterminated { .. })));
    }

    #[test]
    fn bundled_roll_template_renders() {
        let templates = Templates::default();
        let fields = [
            ("expression", "2d6+3".to_string()),
            ("user", "alice".to_string()),
            ("outcomes", "4, 2".to_string()),
            ("total_line", String::new()),
        ];

        let rendered = templates.render(TemplateKind::Roll, &fields).unwrap();

        assert!(rendered.contains("Rolling 2d6+3..."));
        assert!(rendered.contains("alice rolled 4, 2."));
    }

    #[test]
    fn load_prefers_files_and_falls_back_to_bundled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("roll.md"), "custom {user}").unwrap();
        std::fs::write(dir.path().join("checklist_b.md"), "second").unwrap();
        std::fs::write(dir.path().join("checklist_a.md"), "first").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let templates = Templates::load(dir.path()).unwrap();

        let roll = templates
            .render(TemplateKind::Roll, &[("user", "bob".to_string())])
            .unwrap();
        assert_eq!(roll, "custom bob");
        assert_eq!(templates.checklists(), &["first", "second"]);
        // rest.md was not written, so the bundled copy is used
        let rest = templates.render(
            TemplateKind::Rest,
            &[
                ("day", "4".to_string()),
                ("location", "Port Nyanzaru".to_string()),
                ("weather", "Deluge".to_string()),
                ("status", "Tired".to_string()),
            ],
        );
        assert!(rest.unwrap().contains("End of Day 4"));
    }

    #[test]
    fn missing_directory_uses_bundled_templates() {
        let templates = Templates::load(Path::new("/no/such/templates")).unwrap();

        assert_eq!(templates.checklists().len(), BUNDLED_CHECKLISTS.len());
    }
}
