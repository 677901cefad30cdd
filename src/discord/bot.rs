use std::sync::Arc;
use std::time::Instant;

use serenity::all::{ActivityData, GuildId, Interaction, RatelimitInfo, Ready};
use serenity::async_trait;
use serenity::prelude::*;

use crate::config::{Config, UiConfig};
use crate::discord::commands::{character, on_error, Data};
use crate::store::CharacterStore;

#[derive(Clone)]
pub struct Handler {
    pub store: Arc<dyn CharacterStore>,
    pub ui: UiConfig,
}

pub struct DiscordBot {
    client: Client,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("{} is connected to {} guilds", ready.user.name, ready.guilds.len());
        ctx.set_activity(Some(ActivityData::playing("Character select")));

        match self.store.list().await {
            Ok(characters) => tracing::info!("{} characters available from the {} store", characters.len(), self.store.backend_name()),
            Err(e) => tracing::error!("Character store is not reachable: {}", e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        // Slash commands are dispatched by the framework.
        if let Interaction::Component(component) = interaction {
            self.handle_component(&ctx, &component).await;
        }
    }

    async fn ratelimit(&self, data: RatelimitInfo) {
        tracing::warn!("Rate limited: {:?}", data);
    }
}

impl DiscordBot {
    pub async fn new(config: &Config, store: Arc<dyn CharacterStore>) -> anyhow::Result<Self> {
        let token = config.discord_token()?;

        // Slash commands and components only, no message content
        let intents = GatewayIntents::GUILDS;

        let guild_id = config.guild_id;
        let data_store = Arc::clone(&store);
        let data_ui = config.ui.clone();
        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: vec![character()],
                on_error: |error| Box::pin(on_error(error)),
                ..Default::default()
            })
            .setup(move |ctx, _ready, framework| {
                Box::pin(async move {
                    match guild_id {
                        Some(guild_id) => {
                            poise::builtins::register_in_guild(ctx, &framework.options().commands, GuildId::new(guild_id)).await?;
                            tracing::info!("Registered commands in guild {}", guild_id);
                        }
                        None => {
                            poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                            tracing::info!("Registered commands globally");
                        }
                    }
                    Ok(Data { store: data_store, ui: data_ui, started_at: Instant::now() })
                })
            })
            .build();

        let client = Client::builder(&token, intents).event_handler(Handler { store, ui: config.ui.clone() }).framework(framework).await?;

        Ok(DiscordBot { client })
    }

    pub async fn run_bot(&mut self) -> anyhow::Result<()> {
        let shard_manager = Arc::clone(&self.client.shard_manager);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl-C, shutting down");
                    shard_manager.shutdown_all().await;
                }
                Err(e) => tracing::error!("Unable to listen for Ctrl-C: {}", e),
            }
        });

        tracing::info!("Running discord bot");
        self.client.start().await?;
        Ok(())
    }
}
