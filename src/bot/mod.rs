//! Discord event handling
//!
//! Command errors are caught at the command boundary and reported as
//! human-readable replies. Passive message handling logs failures and keeps
//! the event loop alive; one malformed event must never take down the
//! session.

mod commands;

pub use commands::Command;

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::Client;
use songbird::driver::DecodeMode;
use songbird::SerenityInit;

use crate::{AppContext, Error, Result};

const PERSPECTIVE_DIRECTIVE: &str = "---------------------------------\n\
    Choose a random perspective to act from (a trait, opinion, occupation, \
    nationality, time period, historical figure, etc.)\n\
    Try to choose fun, interesting, or unique perspectives. If the perspective \
    is mostly focused on a trait, use more than one trait.\n\
    Additionally, aim for a lengthy and entertaining response. Change your \
    dialect to suit the perspective you are using.\n\
    Respond to the statement above in the format on the following line.\n\
    [PERSPECTIVE]: [RESPONSE]\n\
    Do not vary from this format at all.";

/// Wrap a message in the perspective-reply prompt
fn perspective_prompt(content: &str) -> String {
    format!("STATEMENT: {content}\n{PERSPECTIVE_DIRECTIVE}")
}

/// Serenity event handler carrying the shared context
struct Bot {
    app: Arc<AppContext>,
}

impl Bot {
    /// Dispatch a command and reply, catching errors at the boundary
    async fn handle_command(&self, ctx: &Context, msg: &Message, command: Command) {
        tracing::debug!(
            author = %msg.author.name,
            command = ?command,
            "command received"
        );

        let reply = match commands::dispatch(&self.app, ctx, msg, command).await {
            Ok(text) => text,
            Err(e) if e.is_user_facing() => e.to_string(),
            Err(e) => {
                tracing::error!(error = %e, "command failed");
                "something went wrong, check the logs".to_string()
            }
        };

        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            tracing::warn!(error = %e, "failed to send command reply");
        }
    }

    /// Occasionally reply to an ordinary message
    async fn maybe_reply(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let chance: f64 = rand::thread_rng().gen();
        let mentioned = msg.mentions_me(ctx).await.unwrap_or(false);
        let channel_name = msg.channel_id.name(ctx).await.unwrap_or_default();
        let skip_mentions = self
            .app
            .config
            .reply
            .skip_channels
            .iter()
            .any(|c| c == &channel_name);

        let respond =
            chance < self.app.config.reply.probability || (mentioned && !skip_mentions);
        tracing::debug!(
            time = %chrono::Local::now().format("%H:%M:%S"),
            chance,
            respond,
            "message received"
        );
        if !respond {
            return Ok(());
        }

        let response = self
            .app
            .completion
            .complete(&perspective_prompt(&msg.content))
            .await?;
        msg.reply(&ctx.http, response)
            .await
            .map_err(|e| Error::Channel(format!("failed to reply: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, "connected to Discord");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Some(command) = Command::parse(&self.app.config.command_prefix, &msg.content) {
            self.handle_command(&ctx, &msg, command).await;
            return;
        }

        if msg.content.trim().eq_ignore_ascii_case("ping") {
            if let Err(e) = msg.channel_id.say(&ctx.http, "pong").await {
                tracing::warn!(error = %e, "failed to send pong");
            }
            return;
        }

        if let Err(e) = self.maybe_reply(&ctx, &msg).await {
            tracing::warn!(error = %e, "passive reply failed");
        }
    }
}

/// Connect to Discord and run until shutdown
///
/// # Errors
///
/// Returns error if the client cannot be built or the gateway connection
/// fails
pub async fn run(app: Arc<AppContext>) -> Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES;

    // Decode incoming Opus to PCM so the receiver sees raw samples
    let songbird_config = songbird::Config::default().decode_mode(DecodeMode::Decode);

    let mut client = Client::builder(&app.config.discord_token, intents)
        .event_handler(Bot { app })
        .register_songbird_from_config(songbird_config)
        .await
        .map_err(|e| Error::Channel(format!("Discord client error: {e}")))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            return;
        }
        tracing::info!("shutting down");
        shard_manager.shutdown_all().await;
    });

    client
        .start()
        .await
        .map_err(|e| Error::Channel(format!("Discord client error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_statement_and_directive() {
        let prompt = perspective_prompt("hello world");
        assert!(prompt.starts_with("STATEMENT: hello world\n"));
        assert!(prompt.contains("[PERSPECTIVE]: [RESPONSE]"));
    }
}
