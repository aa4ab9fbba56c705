//! Campaign log posts for the Dungeon Master: start of day, hex travel, end
//! of day and the party checklist.

use rand::Rng;

/// Survival DC used when the party ends up somewhere the DM has not named.
const UNKNOWN_HEX_DC: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Weather {
    Normal,
    Deluge,
    Sweltering,
}

impl Weather {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => ":white_sun_cloud: Normal",
            Self::Deluge => ":thunder_cloud_rain: Deluge",
            Self::Sweltering => ":sun: Sweltering",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Hex {
    Town,
    Fort,
    Camp,
    Road,
    Coast,
    Lake,
    Jungle,
    River,
    Mountains,
    Swamp,
    Wasteland,
}

impl Hex {
    pub fn name(self) -> &'static str {
        match self {
            Self::Town => "Town",
            Self::Fort => "Fort",
            Self::Camp => "Camp",
            Self::Road => "Road",
            Self::Coast => "Coast",
            Self::Lake => "Lake",
            Self::Jungle => "Jungle",
            Self::River => "River",
            Self::Mountains => "Mountains",
            Self::Swamp => "Swamp",
            Self::Wasteland => "Wasteland",
        }
    }

    /// Survival check DC for finding the way out of this hex at normal pace.
    pub fn navigation_dc(self) -> i32 {
        match self {
            Self::Town | Self::Fort | Self::Camp | Self::Road | Self::Coast | Self::Lake => 10,
            Self::Jungle | Self::River => 15,
            Self::Mountains | Self::Swamp | Self::Wasteland => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Pace {
    Normal,
    Fast,
    Slow,
}

impl Pace {
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Fast => "Fast",
            Self::Slow => "Slow",
        }
    }

    fn dc_adjustment(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Fast => 5,
            Self::Slow => -5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Slow pace only: the party made no progress and stays put.
    Stalled,
    Arrived,
    Lost,
}

impl Navigation {
    pub fn message(self) -> &'static str {
        match self {
            Self::Stalled => "You fail to make any progress!",
            Self::Arrived => "You successfully navigate to the new hex!",
            Self::Lost => "The party has become lost!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Journey {
    pub navigation: Navigation,
    /// `None` when the party got lost and no destination was given.
    pub end_hex: Option<Hex>,
    pub survival_points: u32,
}

/// Resolves one hex of travel from the navigator's survival check.
///
/// Fast pace raises the DC by 5, slow pace lowers it by 5 but stalls the
/// party on a 1 in 4. Survival points are whatever the check beat the
/// ending hex's DC by.
pub fn travel<R: Rng>(
    start: Hex,
    target: Hex,
    pace: Pace,
    nav_check: i32,
    lost_destination: Option<Hex>,
    rng: &mut R,
) -> Journey {
    let dc = start.navigation_dc() + pace.dc_adjustment();
    let stalled = pace == Pace::Slow && rng.gen_range(1..=4) == 1;

    let (navigation, end_hex) = if stalled {
        (Navigation::Stalled, Some(start))
    } else if nav_check >= dc {
        (Navigation::Arrived, Some(target))
    } else {
        (Navigation::Lost, lost_destination)
    };

    let end_dc = end_hex.map_or(UNKNOWN_HEX_DC, Hex::navigation_dc);
    let survival_points = u32::try_from(nav_check - end_dc).unwrap_or(0);

    Journey {
        navigation,
        end_hex,
        survival_points,
    }
}

/// Fields for the `travel_start.md` template.
pub fn travel_start_fields(
    start: Hex,
    weather: Weather,
    pace: Pace,
) -> Vec<(&'static str, String)> {
    vec![
        ("start_hex", start.name().to_string()),
        ("weather", weather.label().to_string()),
        ("pace", pace.name().to_string()),
    ]
}

/// Fields for the `travel_result.md` template.
pub fn travel_result_fields(
    journey: &Journey,
    forecast: Weather,
) -> Vec<(&'static str, String)> {
    vec![
        ("navigate_result", journey.navigation.message().to_string()),
        (
            "end_hex",
            journey.end_hex.map_or("Unknown", Hex::name).to_string(),
        ),
        ("forecast", forecast.label().to_string()),
        ("survival_points", journey.survival_points.to_string()),
    ]
}

/// Fields shared by the `newday.md` and `rest.md` templates.
pub fn day_fields(
    day: u32,
    location: &str,
    weather: Weather,
    status: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("day", day.to_string()),
        ("location", location.to_string()),
        ("weather", weather.label().to_string()),
        ("status", status.to_string()),
    ]
}

/// Exact, case-sensitive role name match.
pub fn has_role<'a>(mut role_names: impl Iterator<Item = &'a str>, wanted: &str) -> bool {
    role_names.any(|name| name == wanted)
}

pub mod commands {
    use super::{
        day_fields, has_role, travel_result_fields, travel_start_fields, Hex, Navigation, Pace,
        Weather,
    };
    use crate::reply::{say_ephemeral, send_chunked};
    use crate::templates::TemplateKind;
    use crate::{Context, Error};

    use tracing::debug;

    /// Allows the command only for members holding the configured DM role.
    async fn is_dungeon_master(ctx: Context<'_>) -> Result<bool, Error> {
        let wanted = ctx.data().config.discord.dm_role.as_str();

        let role_ids = match ctx.author_member().await {
            Some(member) => member.roles.clone(),
            None => return Ok(false),
        };

        let allowed = match ctx.guild() {
            Some(guild) => has_role(
                role_ids
                    .iter()
                    .filter_map(|id| guild.roles.get(id))
                    .map(|role| role.name.as_str()),
                wanted,
            ),
            None => false,
        };

        if !allowed {
            debug!("{} lacks the `{}` role", ctx.author().name, wanted);
        }
        Ok(allowed)
    }

    /// Start a new day in the campaign.
    #[poise::command(slash_command, guild_only, check = "is_dungeon_master")]
    pub async fn newday(
        ctx: Context<'_>,
        #[description = "Which day are we on?"]
        #[min = 1]
        day: u32,
        #[description = "Where are we?"] location: String,
        #[description = "What is the weather like?"] weather: Weather,
        #[description = "What is the weather forecast for later today?"] forecast: Weather,
        #[description = "What is the party's status?"] status: String,
    ) -> Result<(), Error> {
        let log = ctx.data().templates.render(
            TemplateKind::NewDay,
            &day_fields(day, &location, weather, &status),
        )?;

        send_chunked(ctx, log.trim_end(), false).await?;
        say_ephemeral(ctx, format!("Forecast: {}", forecast.label())).await
    }

    /// Attempt to travel to a new location hex in Chult.
    #[poise::command(slash_command, guild_only, check = "is_dungeon_master")]
    pub async fn travel(
        ctx: Context<'_>,
        #[description = "What is the weather like?"] weather: Weather,
        #[description = "What is the weather forecast for later today?"] forecast: Weather,
        #[description = "Where is the party?"] start_hex: Hex,
        #[description = "Where is the party trying to go?"] target_hex: Hex,
        #[description = "What is the traveling pace?"] pace: Pace,
        #[description = "What was the result of the navigator's survival check?"]
        nav_check: i32,
        #[description = "Where does the party end up if they get lost?"]
        lost_destination: Option<Hex>,
    ) -> Result<(), Error> {
        let templates = &ctx.data().templates;
        let start_log = templates.render(
            TemplateKind::TravelStart,
            &travel_start_fields(start_hex, weather, pace),
        )?;

        let journey = super::travel(
            start_hex,
            target_hex,
            pace,
            nav_check,
            lost_destination,
            &mut rand::thread_rng(),
        );
        debug!(
            "Travel {:?} -> {:?} at {:?} pace, check {}: {:?}",
            start_hex, target_hex, pace, nav_check, journey
        );

        let result_log = templates.render(
            TemplateKind::TravelResult,
            &travel_result_fields(&journey, forecast),
        )?;

        send_chunked(ctx, start_log.trim_end(), false).await?;
        send_chunked(ctx, result_log.trim_end(), false).await?;

        if journey.navigation == Navigation::Lost && journey.end_hex.is_none() {
            say_ephemeral(
                ctx,
                "The party became lost! Pick their unintended destination with \
                 `lost_destination` next time to award survival points for it.",
            )
            .await?;
        }
        Ok(())
    }

    /// End the day in the campaign.
    #[poise::command(slash_command, guild_only, check = "is_dungeon_master")]
    pub async fn rest(
        ctx: Context<'_>,
        #[description = "Which day are we on?"]
        #[min = 1]
        day: u32,
        #[description = "Where are we?"] location: String,
        #[description = "What is the weather like?"] weather: Weather,
        #[description = "What is the party's status?"] status: String,
    ) -> Result<(), Error> {
        let log = ctx.data().templates.render(
            TemplateKind::Rest,
            &day_fields(day, &location, weather, &status),
        )?;

        send_chunked(ctx, log.trim_end(), false).await
    }

    /// Prompt the party to complete the checklist for the day.
    #[poise::command(slash_command, guild_only, check = "is_dungeon_master")]
    pub async fn checklist(ctx: Context<'_>) -> Result<(), Error> {
        let checklists = ctx.data().templates.checklists();
        if checklists.is_empty() {
            return say_ephemeral(ctx, "No checklist templates are configured.").await;
        }

        for part in checklists {
            send_chunked(ctx, part.trim_end(), false).await?;
        }
        Ok(())
    }
}
