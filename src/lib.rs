pub mod campaign;
pub mod config;
pub mod reply;
pub mod rolls;
pub mod spells;
pub mod templates;

pub use config::Config;

pub struct Data {
    pub config: Config,
    pub spells: spells::SpellIndex,
    pub templates: templates::Templates,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Every slash command the bot registers.
pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        rolls::commands::roll(),
        spells::commands::spell(),
        campaign::commands::newday(),
        campaign::commands::rest(),
        campaign::commands::travel(),
        campaign::commands::checklist(),
    ]
}
