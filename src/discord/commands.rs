use std::sync::Arc;
use std::time::Instant;

use poise::serenity_prelude as serenity;
use poise::CreateReply;

use crate::config::UiConfig;
use crate::discord::utils::{format_uptime, has_admin_rights, numbered_list, store_error_message, validate_character_name, validate_removal_name};
use crate::discord::view::{render_page, EMPTY_LIST_MESSAGE};
use crate::pagination::paginate;
use crate::store::{CharacterStore, StoreError};

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub store: Arc<dyn CharacterStore>,
    pub ui: UiConfig,
    pub started_at: Instant,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

const INFO_COLOUR: u32 = 0x0099FF;

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(content).ephemeral(true)).await?;
    Ok(())
}

async fn reply_store_error(ctx: Context<'_>, e: StoreError) -> Result<(), Error> {
    if let StoreError::Unavailable(reason) = &e {
        tracing::error!("Character store error in `{}`: {}", ctx.command().qualified_name, reason);
    }
    reply_ephemeral(ctx, store_error_message(&e)).await
}

/// Passes for members holding Administrator, Manage Channels or Manage Server.
async fn is_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let permissions = ctx.author_member().await.and_then(|member| member.permissions);
    if permissions.is_some_and(has_admin_rights) {
        return Ok(true);
    }

    tracing::info!("Denied admin command `{}` to {}", ctx.command().qualified_name, ctx.author().name);
    reply_ephemeral(ctx, "❌ You need the Administrator, Manage Channels or Manage Server permission to use this command.").await?;
    Ok(false)
}

/// Character selection and management.
#[poise::command(slash_command, guild_only, subcommands("select", "add", "remove", "list", "info"), subcommand_required)]
pub async fn character(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Pick your character from the list
#[poise::command(slash_command, guild_only)]
pub async fn select(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let characters = match data.store.list().await {
        Ok(characters) => characters,
        Err(e) => return reply_store_error(ctx, e).await,
    };

    if characters.is_empty() {
        return reply_ephemeral(ctx, EMPTY_LIST_MESSAGE).await;
    }

    let page = paginate(&characters, data.ui.effective_page_size(), 0)?;
    let (embed, components) = render_page(&page, characters.len(), &data.ui);
    ctx.send(CreateReply::default().embed(embed).components(components)).await?;
    Ok(())
}

/// Add a character to the list
#[poise::command(slash_command, guild_only, check = "is_admin")]
pub async fn add(ctx: Context<'_>, #[description = "Name of the character to add"] name: String) -> Result<(), Error> {
    let name = match validate_character_name(&name) {
        Ok(name) => name,
        Err(message) => return reply_ephemeral(ctx, message).await,
    };

    match ctx.data().store.add(&name).await {
        Ok(()) => reply_ephemeral(ctx, format!("✅ Character **{name}** has been added")).await,
        Err(e) => reply_store_error(ctx, e).await,
    }
}

/// Remove a character from the list
#[poise::command(slash_command, guild_only, check = "is_admin")]
pub async fn remove(ctx: Context<'_>, #[description = "Name of the character to remove"] name: String) -> Result<(), Error> {
    let name = match validate_removal_name(&name) {
        Ok(name) => name,
        Err(message) => return reply_ephemeral(ctx, message).await,
    };

    match ctx.data().store.remove(&name).await {
        Ok(()) => reply_ephemeral(ctx, format!("✅ Character **{name}** has been removed")).await,
        Err(e) => reply_store_error(ctx, e).await,
    }
}

/// Show every character in the list
#[poise::command(slash_command, guild_only, check = "is_admin")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let store = &ctx.data().store;
    let (characters, metadata) = match tokio::try_join!(store.list(), store.metadata()) {
        Ok(result) => result,
        Err(e) => return reply_store_error(ctx, e).await,
    };

    let description = if characters.is_empty() { "The list is empty.".to_string() } else { numbered_list(&characters) };
    let embed = serenity::CreateEmbed::new()
        .colour(INFO_COLOUR)
        .title("📋 Characters")
        .description(description)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{}/{} characters · updated {}",
            characters.len(),
            metadata.max_characters,
            metadata.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
        )));

    ctx.send(CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}

/// Show storage and bot status
#[poise::command(slash_command, guild_only, check = "is_admin")]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let store = &data.store;

    let healthy = store.health_check().await;
    let (characters, metadata) = match tokio::try_join!(store.list(), store.metadata()) {
        Ok(result) => result,
        Err(e) => return reply_store_error(ctx, e).await,
    };

    let health = if healthy { "✅ healthy" } else { "❌ unreachable" };
    let embed = serenity::CreateEmbed::new()
        .colour(INFO_COLOUR)
        .title("ℹ️ Character bot")
        .field("Backend", store.backend_name(), true)
        .field("Status", health, true)
        .field("Version", metadata.version, true)
        .field("Characters", format!("{}/{}", characters.len(), metadata.max_characters), true)
        .field("Last updated", metadata.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(), true)
        .field("Uptime", format_uptime(data.started_at.elapsed()), false);

    ctx.send(CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Error in command `{}`: {:?}", ctx.command().qualified_name, error);
            if let Err(e) = reply_ephemeral(ctx, "❌ Something went wrong while running this command").await {
                tracing::warn!("Failed to report command error: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}
