//! Decides what the bot does with one inbound room message.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OwnerCommand {
    Shutdown,
    Reload,
}

impl OwnerCommand {
    fn parse(body: &str) -> Option<Self> {
        match body {
            "SHUTDOWN" => Some(Self::Shutdown),
            "RELOAD" => Some(Self::Reload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    Ignore,
    Owner(OwnerCommand),
    /// Reply with this text and stop.
    Acknowledge(String),
    /// Hand the message to the passive plugins.
    Plugins,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Inbound<'a> {
    pub(crate) body: &'a str,
    pub(crate) sender_nick: &'a str,
    pub(crate) from_self: bool,
    pub(crate) from_owner: bool,
    pub(crate) is_correction: bool,
}

pub(crate) fn route(msg: &Inbound<'_>, own_nick: &str, acknowledgement: &str) -> Route {
    if msg.from_self || msg.is_correction {
        return Route::Ignore;
    }
    if msg.from_owner
        && let Some(cmd) = OwnerCommand::parse(msg.body)
    {
        return Route::Owner(cmd);
    }
    if !own_nick.is_empty() && msg.body.contains(own_nick) {
        return Route::Acknowledge(format!("{}: {acknowledgement}", msg.sender_nick));
    }
    Route::Plugins
}

/// Drop the quoted `> ...` block clients prepend to replies, so links in the
/// quoted message are not previewed twice.
pub(crate) fn strip_reply_fallback(body: &str) -> &str {
    if !body.starts_with('>') {
        return body;
    }
    let Some(sep_idx) = body.find("\n\n") else {
        return body;
    };
    let (quoted, rest) = body.split_at(sep_idx);
    if quoted.lines().all(|line| line.starts_with('>')) {
        rest.trim_start_matches('\n')
    } else {
        body
    }
}
