//! Message Router - classifies inbound text.
//!
//! Commands are matched exactly after stripping a `@<bot handle>` mention from
//! the command token, so `/help@index_bot` is `/help` but `/help me` is not a
//! command at all.

use super::search::SearchRequest;

/// Commands the bot understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start` or `/help`
    Help,
    /// `/add_index`
    AddIndex,
    /// `/cancel`
    Cancel,
    /// `/ban_words w1 w2 ...` (admin)
    BanWords(Vec<String>),
    /// `/unban_words w1 w2 ...` (admin)
    UnbanWords(Vec<String>),
    /// `/banned_words` (admin)
    ListBannedWords,
}

impl BotCommand {
    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::BanWords(_) | Self::UnbanWords(_) | Self::ListBannedWords
        )
    }
}

/// Routing decision for an inbound text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Command(BotCommand),
    Search(SearchRequest),
    /// Possibly the next answer of a pending dialog.
    Continue,
    Ignore,
}

pub struct MessageRouter {
    mention: String,
}

impl MessageRouter {
    /// `handle` is the bot's username without `@`.
    pub fn new(handle: &str) -> Self {
        Self {
            mention: format!("@{}", handle),
        }
    }

    pub fn route(&self, text: &str) -> RouteDecision {
        if text.is_empty() {
            return RouteDecision::Ignore;
        }

        if let Some(command) = self.parse_command(text) {
            return RouteDecision::Command(command);
        }

        if let Some(request) = SearchRequest::parse(text) {
            return RouteDecision::Search(request);
        }

        RouteDecision::Continue
    }

    /// Remove a self-mention from the end of the command token.
    pub fn strip_mention<'a>(&self, token: &'a str) -> &'a str {
        token.strip_suffix(self.mention.as_str()).unwrap_or(token)
    }

    fn parse_command(&self, text: &str) -> Option<BotCommand> {
        if !text.starts_with('/') {
            return None;
        }

        let (head, rest) = match text.split_once(' ') {
            Some((head, rest)) => (head, Some(rest)),
            None => (text, None),
        };
        let command = self.strip_mention(head);

        match (command, rest) {
            ("/start" | "/help", None) => Some(BotCommand::Help),
            ("/add_index", None) => Some(BotCommand::AddIndex),
            ("/cancel", None) => Some(BotCommand::Cancel),
            ("/banned_words", None) => Some(BotCommand::ListBannedWords),
            ("/ban_words", args) => Some(BotCommand::BanWords(split_args(args))),
            ("/unban_words", args) => Some(BotCommand::UnbanWords(split_args(args))),
            _ => None,
        }
    }
}

fn split_args(args: Option<&str>) -> Vec<String> {
    args.map(|a| a.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> MessageRouter {
        MessageRouter::new("index_bot")
    }

    #[test]
    fn test_exact_commands() {
        let router = router();
        assert_eq!(router.route("/start"), RouteDecision::Command(BotCommand::Help));
        assert_eq!(router.route("/help"), RouteDecision::Command(BotCommand::Help));
        assert_eq!(
            router.route("/add_index"),
            RouteDecision::Command(BotCommand::AddIndex)
        );
        assert_eq!(router.route("/cancel"), RouteDecision::Command(BotCommand::Cancel));
    }

    #[test]
    fn test_self_mention_is_stripped() {
        let router = router();
        assert_eq!(
            router.route("/add_index@index_bot"),
            RouteDecision::Command(BotCommand::AddIndex)
        );
        assert_eq!(router.route("/help@other_bot"), RouteDecision::Continue);
    }

    #[test]
    fn test_command_with_extra_text_is_not_a_command() {
        assert_eq!(router().route("/help me"), RouteDecision::Continue);
        assert_eq!(router().route("/unknown"), RouteDecision::Continue);
    }

    #[test]
    fn test_admin_commands_take_arguments() {
        let router = router();
        assert_eq!(
            router.route("/ban_words spam  casino"),
            RouteDecision::Command(BotCommand::BanWords(vec![
                "spam".to_string(),
                "casino".to_string()
            ]))
        );
        assert_eq!(
            router.route("/unban_words@index_bot spam"),
            RouteDecision::Command(BotCommand::UnbanWords(vec!["spam".to_string()]))
        );
        assert_eq!(
            router.route("/ban_words"),
            RouteDecision::Command(BotCommand::BanWords(vec![]))
        );
        assert!(BotCommand::ListBannedWords.is_admin_only());
        assert!(!BotCommand::Help.is_admin_only());
    }

    #[test]
    fn test_search_routes() {
        let router = router();
        assert!(matches!(
            router.route("?rust page 2"),
            RouteDecision::Search(SearchRequest { page: 2, .. })
        ));
        assert!(matches!(router.route("？rust"), RouteDecision::Search(_)));
    }

    #[test]
    fn test_other_text_continues_and_empty_is_ignored() {
        assert_eq!(router().route("https://x.com/a"), RouteDecision::Continue);
        assert_eq!(router().route(""), RouteDecision::Ignore);
    }
}
