//! Spell reference data: loading, lookup and the `/spell` command.

pub mod commands;
pub mod index;
pub mod record;

pub use index::{normalize_name, DataLoadError, SpellIndex};
pub use record::SpellRecord;
