//! AddIndex wizard
//!
//! Three steps, one per private message: url, title, keywords. Each accepted
//! answer pushes the expiry out by the configured TTL; a rejected answer
//! re-prompts and leaves both step and expiry alone. Expiry is only checked
//! when the next answer arrives.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::channel::{InboundMessage, InlineButton, InlineKeyboard, OutboundMessage};
use crate::config::WizardSettings;
use crate::models::{
    AddIndexDraft, InteractionPayload, MAX_KEYWORDS, MIN_KEYWORD_CHARS, NewIndexEntry,
    PendingInteraction,
};

use super::context::BotContext;
use super::interaction_store::Pending;

const STEP_URL: u32 = 0;
const STEP_TITLE: u32 = 1;
const STEP_KEYWORDS: u32 = 2;

const TITLE_PROMPT: &str = "Now send a title for the link (10 characters max).";
const KEYWORDS_PROMPT: &str = "Now send keywords separated by spaces. Each needs at least 2 characters; only the first 5 are kept.";
const SAVED_TEXT: &str = "✅ Index saved.";
const SAVE_FAILED_TEXT: &str = "❌ The entry could not be saved. Please send the keywords again.";
const CANCELLED_TEXT: &str = "Cancelled.";
const CONTINUE_PRIVATELY_TEXT: &str = "*Please continue in a private chat with me.*";

/// Why a step answer was rejected. The interaction is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("Please send a link starting with {prefix}")]
    InvalidUrl { prefix: String },
    #[error("The title must not be empty.")]
    EmptyTitle,
    #[error("Please send at least one keyword.")]
    NoKeywords,
    #[error("Keyword \"{0}\" is too short, every keyword needs at least 2 characters.")]
    KeywordTooShort(String),
    #[error("This dialog is in an unknown state, please start again with /add_index.")]
    Corrupt,
}

/// Result of an accepted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Moved on; holds the new step.
    Advanced(u32),
    /// All answers collected. The interaction is unchanged until persisted.
    Finished(NewIndexEntry),
}

pub fn url_prompt(prefix: &str) -> String {
    format!("Send the link you want to index. It must start with {}", prefix)
}

/// Validate `text` as the answer to the interaction's current step.
pub fn apply_step(
    interaction: &mut PendingInteraction,
    text: &str,
    now: i64,
    settings: &WizardSettings,
) -> Result<StepOutcome, StepError> {
    let step = interaction.step;
    let user_id = interaction.user_id.clone();
    let InteractionPayload::AddIndex(draft) = &mut interaction.payload;

    match step {
        STEP_URL => {
            let url = text
                .strip_prefix(settings.url_prefix.as_str())
                .ok_or_else(|| StepError::InvalidUrl {
                    prefix: settings.url_prefix.clone(),
                })?;
            draft.url = Some(url.to_string());
            draft.creator_id = Some(user_id);
        }
        STEP_TITLE => {
            if text.is_empty() {
                return Err(StepError::EmptyTitle);
            }
            draft.title = Some(text.to_string());
        }
        STEP_KEYWORDS => {
            let keywords = parse_keywords(text)?;
            return finish(draft, keywords).map(StepOutcome::Finished);
        }
        _ => return Err(StepError::Corrupt),
    }

    interaction.advance(now, settings.ttl_ms());
    Ok(StepOutcome::Advanced(interaction.step))
}

/// Split on single spaces, reject short tokens, keep the first five.
fn parse_keywords(text: &str) -> Result<String, StepError> {
    let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return Err(StepError::NoKeywords);
    }
    if let Some(short) = tokens
        .iter()
        .find(|t| t.chars().count() < MIN_KEYWORD_CHARS)
    {
        return Err(StepError::KeywordTooShort(short.to_string()));
    }
    Ok(tokens
        .into_iter()
        .take(MAX_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" "))
}

fn finish(draft: &AddIndexDraft, keywords: String) -> Result<NewIndexEntry, StepError> {
    match (&draft.url, &draft.title, &draft.creator_id) {
        (Some(url), Some(title), Some(creator_id)) => Ok(NewIndexEntry {
            url: url.clone(),
            title: title.clone(),
            keywords,
            creator_id: creator_id.clone(),
        }),
        _ => Err(StepError::Corrupt),
    }
}

/// `/add_index`: open a fresh interaction for the sender.
///
/// From a group the user is pointed at the private chat, and the first prompt
/// is sent there directly.
pub async fn start(ctx: &BotContext, message: &InboundMessage) {
    let interaction =
        PendingInteraction::add_index(&message.sender_id, ctx.now(), ctx.config.wizard.ttl_ms());
    if ctx.interactions.put(interaction).await.is_some() {
        debug!("Replaced unfinished interaction of {}", message.sender_id);
    }

    let prompt = url_prompt(&ctx.config.wizard.url_prefix);

    if message.is_private_with_sender() {
        ctx.send(
            OutboundMessage::new(&message.conversation_id, prompt)
                .plain()
                .with_reply_to(&message.id),
        )
        .await;
        return;
    }

    let keyboard = InlineKeyboard::new().row(vec![InlineButton::url(
        ctx.identity.mention(),
        ctx.identity.deep_link(),
    )]);
    ctx.send(
        OutboundMessage::new(&message.conversation_id, CONTINUE_PRIVATELY_TEXT)
            .with_reply_to(&message.id)
            .with_keyboard(keyboard),
    )
    .await;

    // Fails when the user never opened a private chat with the bot.
    ctx.send(OutboundMessage::new(&message.sender_id, prompt).plain())
        .await;
}

/// `/cancel`: drop any pending interaction and confirm regardless.
pub async fn cancel(ctx: &BotContext, message: &InboundMessage) {
    if ctx.interactions.remove(&message.sender_id).await.is_some() {
        info!("Interaction of {} cancelled", message.sender_label());
    }
    ctx.send(
        OutboundMessage::new(&message.conversation_id, CANCELLED_TEXT).with_reply_to(&message.id),
    )
    .await;
}

/// Feed a private message to the sender's pending interaction, if any.
pub async fn continue_interaction(ctx: &BotContext, message: &InboundMessage) {
    if !message.is_private_with_sender() {
        return;
    }
    let Some(mut guard) = ctx.interactions.lock_existing(&message.sender_id).await else {
        return;
    };

    let now = ctx.now();
    let outcome = match guard.take_live(now) {
        Pending::Missing => None,
        Pending::Expired(expired) => {
            debug!(
                "Discarded expired interaction of {} at step {}",
                expired.user_id, expired.step
            );
            None
        }
        Pending::Live(interaction) => Some(apply_step(
            interaction,
            &message.content,
            now,
            &ctx.config.wizard,
        )),
    };

    let reply = |text: String| {
        OutboundMessage::new(&message.conversation_id, text)
            .plain()
            .with_reply_to(&message.id)
    };

    match outcome {
        None => {}
        Some(Ok(StepOutcome::Advanced(step))) => {
            debug!("Interaction of {} advanced to step {}", message.sender_id, step);
            let prompt = if step == STEP_TITLE {
                TITLE_PROMPT
            } else {
                KEYWORDS_PROMPT
            };
            ctx.send(reply(prompt.to_string())).await;
        }
        Some(Ok(StepOutcome::Finished(entry))) => {
            // The guard stays held so a resent answer waits for this write.
            match ctx.store.upsert_entry(entry).await {
                Ok(saved) => {
                    guard.remove();
                    info!(
                        "Saved index entry {} ({}) from {}",
                        saved.id,
                        saved.url,
                        message.sender_label()
                    );
                    ctx.send(reply(SAVED_TEXT.to_string())).await;
                }
                Err(e) => {
                    error!(
                        "Failed to save index entry from {}: {}",
                        message.sender_id, e
                    );
                    ctx.send(reply(SAVE_FAILED_TEXT.to_string())).await;
                }
            }
        }
        Some(Err(StepError::Corrupt)) => {
            warn!("Dropping corrupt interaction of {}", message.sender_id);
            guard.remove();
            ctx.send(reply(StepError::Corrupt.to_string())).await;
        }
        Some(Err(e)) => {
            ctx.send(reply(e.to_string())).await;
        }
    }

    drop(guard);
    ctx.interactions.prune(&message.sender_id);
}
