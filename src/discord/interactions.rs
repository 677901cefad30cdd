use serenity::all::{ComponentInteraction, ComponentInteractionDataKind, Context, CreateInteractionResponse, CreateInteractionResponseMessage};

use crate::discord::bot::Handler;
use crate::discord::utils::store_error_message;
use crate::discord::view::{render_page, selection_embed, EMPTY_LIST_MESSAGE, STALE_WIDGET_MESSAGE};
use crate::pagination::{paginate, NavAction};

/// Buttons carry their action in the custom id, select menus in the chosen value.
pub(crate) fn raw_action_id<'a>(custom_id: &'a str, kind: &'a ComponentInteractionDataKind) -> Option<&'a str> {
    match kind {
        ComponentInteractionDataKind::Button => Some(custom_id),
        ComponentInteractionDataKind::StringSelect { values } => values.first().map(String::as_str),
        _ => None,
    }
}

impl Handler {
    pub async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let raw = raw_action_id(&component.data.custom_id, &component.data.kind);
        let action = match raw.map(NavAction::decode) {
            Some(Ok(action)) => action,
            Some(Err(e)) => {
                tracing::warn!("Ignoring interaction from {}: {}", component.user.name, e);
                self.respond_ephemeral(ctx, component, STALE_WIDGET_MESSAGE).await;
                return;
            }
            None => {
                tracing::warn!("Ignoring interaction {} with no usable identifier", component.data.custom_id);
                self.respond_ephemeral(ctx, component, STALE_WIDGET_MESSAGE).await;
                return;
            }
        };

        tracing::debug!("{} triggered {:?}", component.user.name, action);
        match action {
            NavAction::SelectCharacter { name } => self.interaction_select_character(ctx, component, &name).await,
            nav => self.interaction_change_page(ctx, component, nav.target_page().unwrap_or_default()).await,
        }
    }

    async fn interaction_select_character(&self, ctx: &Context, component: &ComponentInteraction, name: &str) {
        let characters = match self.store.list().await {
            Ok(characters) => characters,
            Err(e) => {
                tracing::error!("Unable to load characters: {}", e);
                self.respond_ephemeral(ctx, component, store_error_message(&e)).await;
                return;
            }
        };

        if !characters.iter().any(|character| character == name) {
            self.respond_ephemeral(ctx, component, format!("❌ **{name}** is no longer available, run `/character select` again.")).await;
            return;
        }

        tracing::info!("{} selected {}", component.user.name, name);
        let message = CreateInteractionResponseMessage::new().embed(selection_embed(component.user.id, name));
        self.respond(ctx, component, CreateInteractionResponse::Message(message)).await;
    }

    async fn interaction_change_page(&self, ctx: &Context, component: &ComponentInteraction, target_page: usize) {
        let characters = match self.store.list().await {
            Ok(characters) => characters,
            Err(e) => {
                tracing::error!("Unable to load characters: {}", e);
                self.respond_ephemeral(ctx, component, store_error_message(&e)).await;
                return;
            }
        };

        // The list may have changed since the message was sent.
        let page = match paginate(&characters, self.ui.effective_page_size(), target_page) {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Unable to paginate characters: {}", e);
                return;
            }
        };

        let update = if page.is_empty() {
            CreateInteractionResponseMessage::new().content(EMPTY_LIST_MESSAGE).embeds(vec![]).components(vec![])
        } else {
            let (embed, components) = render_page(&page, characters.len(), &self.ui);
            CreateInteractionResponseMessage::new().embed(embed).components(components)
        };

        self.respond(ctx, component, CreateInteractionResponse::UpdateMessage(update)).await;
    }

    async fn respond_ephemeral(&self, ctx: &Context, component: &ComponentInteraction, content: impl Into<String>) {
        let message = CreateInteractionResponseMessage::new().content(content).ephemeral(true);
        self.respond(ctx, component, CreateInteractionResponse::Message(message)).await;
    }

    async fn respond(&self, ctx: &Context, component: &ComponentInteraction, response: CreateInteractionResponse) {
        if let Err(e) = component.create_response(&ctx.http, response).await {
            let e = format!("{:?}", e);
            if !e.contains("Unknown Interaction") {
                tracing::warn!("Failed to respond to interaction: {}", e);
            }
        }
    }
}
