//! Search & Pagination
//!
//! A search is any text starting with `?` or the full-width `？`. An optional
//! `page <N>` suffix selects the page. Results are rendered as a numbered
//! markdown list with previous/next buttons whose callback data is itself a
//! search, so clicking one re-enters this module and edits the same message.

use tracing::{debug, error};

use crate::channel::{EditMessage, InboundMessage, InlineButton, InlineKeyboard, OutboundMessage};
use crate::models::IndexEntry;

use super::context::BotContext;

/// Results per page.
pub const PAGE_SIZE: usize = 10;
/// Characters that mark a message as a search.
pub const SEARCH_MARKERS: [char; 2] = ['?', '？'];

const PAGE_KEYWORD: &str = "page";
const NO_MATCH_TEXT: &str = "No matching entries.";
const SEARCH_FAILED_TEXT: &str = "Search is unavailable right now, please try again later.";
const PREV_LABEL: &str = "◀ Prev";
/// Telegram rejects callback data longer than this.
const MAX_CALLBACK_DATA_BYTES: usize = 64;
const NEXT_LABEL: &str = "Next ▶";

/// A parsed search: the key to look up and the zero-based page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub key: String,
    pub page: u64,
}

impl SearchRequest {
    /// Parse a marker-prefixed query. Returns `None` when `text` is not a search.
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_prefix(SEARCH_MARKERS)?;
        let (key, page) = split_page_suffix(body);
        Some(Self {
            key: key.trim().to_string(),
            page: page.max(0) as u64,
        })
    }

    pub fn offset(&self) -> usize {
        usize::try_from(self.page)
            .unwrap_or(usize::MAX)
            .saturating_mul(PAGE_SIZE)
    }

    pub fn limit(&self) -> usize {
        PAGE_SIZE
    }
}

/// `"<key> page <N>"` -> (`"<key>"`, N). Anything else is all key, page 0.
fn split_page_suffix(body: &str) -> (&str, i64) {
    let trimmed = body.trim_end_matches(' ');
    if let Some((rest, last)) = trimmed.rsplit_once(' ')
        && let Ok(page) = last.parse::<i64>()
        && let Some(head) = rest.trim_end_matches(' ').strip_suffix(PAGE_KEYWORD)
        && (head.is_empty() || head.ends_with(' '))
    {
        return (head.trim_end_matches(' '), page);
    }
    (body, 0)
}

/// Callback data for a navigation button. `page` is not bounds-checked; a
/// negative page is clamped when the button is clicked.
pub fn navigation_payload(key: &str, page: i64) -> String {
    format!("{}{} {} {}", SEARCH_MARKERS[0], key, PAGE_KEYWORD, page)
}

/// Text and keyboard for one page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

pub fn render_page(request: &SearchRequest, entries: &[IndexEntry], url_prefix: &str) -> RenderedPage {
    if entries.is_empty() {
        return RenderedPage {
            text: NO_MATCH_TEXT.to_string(),
            keyboard: None,
        };
    }

    let offset = request.offset();
    let text = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{}. [{}]({}{})",
                offset.saturating_add(i + 1),
                escape_link_text(&entry.title),
                url_prefix,
                entry.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    RenderedPage {
        text,
        keyboard: navigation_keyboard(request),
    }
}

/// Prev/next buttons, or `None` when the key is too long to fit in
/// callback data.
fn navigation_keyboard(request: &SearchRequest) -> Option<InlineKeyboard> {
    let page = i64::try_from(request.page).unwrap_or(i64::MAX);
    let prev = navigation_payload(&request.key, page.saturating_sub(1));
    let next = navigation_payload(&request.key, page.saturating_add(1));
    if prev.len() > MAX_CALLBACK_DATA_BYTES || next.len() > MAX_CALLBACK_DATA_BYTES {
        debug!("Search key {:?} too long for navigation buttons", request.key);
        return None;
    }

    Some(InlineKeyboard::new().row(vec![
        InlineButton::callback(PREV_LABEL, prev),
        InlineButton::callback(NEXT_LABEL, next),
    ]))
}

/// Legacy Telegram markdown has no escape inside link text; drop the
/// characters that would end the entity early.
fn escape_link_text(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '*' | '_' | '`'))
        .collect()
}

async fn fetch_page(ctx: &BotContext, request: &SearchRequest) -> Option<RenderedPage> {
    if request.key.is_empty() {
        return Some(render_page(request, &[], &ctx.config.wizard.url_prefix));
    }

    match ctx
        .store
        .query(&request.key, request.offset(), request.limit())
        .await
    {
        Ok(entries) => {
            debug!(
                "Search {:?} page {} returned {} entries",
                request.key,
                request.page,
                entries.len()
            );
            Some(render_page(request, &entries, &ctx.config.wizard.url_prefix))
        }
        Err(e) => {
            error!("Search {:?} failed: {}", request.key, e);
            None
        }
    }
}

/// Answer a typed search with a new message.
pub async fn reply_with_results(ctx: &BotContext, message: &InboundMessage, request: &SearchRequest) {
    let page = fetch_page(ctx, request).await.unwrap_or_else(|| RenderedPage {
        text: SEARCH_FAILED_TEXT.to_string(),
        keyboard: None,
    });

    let mut outbound =
        OutboundMessage::new(&message.conversation_id, page.text).with_reply_to(&message.id);
    if let Some(keyboard) = page.keyboard {
        outbound = outbound.with_keyboard(keyboard);
    }
    ctx.send(outbound).await;
}

/// Re-render the message a navigation button belongs to.
pub async fn edit_with_results(
    ctx: &BotContext,
    conversation_id: &str,
    message_id: &str,
    request: &SearchRequest,
) {
    let Some(page) = fetch_page(ctx, request).await else {
        return;
    };

    let mut edit = EditMessage::new(conversation_id, message_id, page.text);
    if let Some(keyboard) = page.keyboard {
        edit = edit.with_keyboard(keyboard);
    }
    ctx.edit(edit).await;
}
