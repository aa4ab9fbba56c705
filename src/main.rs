use grimoire::{spells::SpellIndex, templates::Templates, Config, Data, Error};

use clap::Parser;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Discord bot for D&D 5e dice rolls and spell lookups.
#[derive(Debug, Parser)]
struct Args {
    /// Enable debug logging and only register commands in the test guilds.
    #[arg(long)]
    test: bool,
    /// Path to the JSON config file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    _data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!(
                "Logged in as {} (ID: {})",
                data_about_bot.user.name, data_about_bot.user.id
            );
        }
        serenity::FullEvent::Message { new_message } => {
            if new_message.author.id != ctx.cache.current_user().id
                && new_message.content.starts_with("Hello")
            {
                new_message.channel_id.say(ctx, "Hello!").await?;
            }
        }
        _ => {}
    }
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            warn!("Error in command `{}`: {:?}", ctx.command().name, error);
            let reply = poise::CreateReply::default()
                .content("Sorry, something went wrong while handling that command.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                debug!("Could not report command error to user: {:?}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {:?}", e)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let level = if args.test {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::load(&args.config).map_err(|e| {
        error!("Could not load config: {}", e);
        e
    })?;

    let directories = &config.environment.directory;
    info!("Templates directory: {}", directories.templates.display());
    info!("Data directory: {}", directories.data.display());

    // no commands are accepted without spell data
    let spells = SpellIndex::load(&directories.data).map_err(|e| {
        error!("Could not load spell data: {}", e);
        e
    })?;
    let templates = Templates::load(&directories.templates)?;

    let guild_ids: Vec<serenity::GuildId> = config
        .guild_ids(args.test)
        .iter()
        .filter(|&&id| id != 0)
        .map(|&id| serenity::GuildId::new(id))
        .collect();
    if args.test {
        info!("Test mode enabled, registering in {} test guild(s)", guild_ids.len());
    }

    let token = config.discord.token.clone();
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                if guild_ids.is_empty() {
                    poise::builtins::register_globally(ctx, commands).await?;
                } else {
                    for guild_id in guild_ids {
                        poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                    }
                }
                Ok(Data {
                    config,
                    spells,
                    templates,
                })
            })
        })
        .options(poise::FrameworkOptions {
            commands: grimoire::commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .build();

    let mut client = serenity::Client::builder(token, intents)
        .framework(framework)
        .await?;

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
        return Err(why.into());
    }

    Ok(())
}
