//! Link detection over free-form chat text.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

/// Video URL shapes: short links, watch pages (with arbitrary leading query
/// params), shorts/live/v/embed paths, oEmbed and attribution redirects, the
/// no-cookie embed domain, and the `www.`/`m.`/`music.` subdomains. Scheme and
/// leading `//` are optional.
const VIDEO_PATTERN: &str = concat!(
    r"(?:(?:https?:)?//)?",
    r"(?:",
    r"(?:(?:www|m(?:usic)?)\.)?youtu(?:\.be|be\.com)/",
    r"(?:",
    r"shorts/|live/|v/|e(?:mbed)?/",
    r"|watch(?:/|\?(?:\S+=\S+&)*v=)",
    r"|oembed\?url=https?%3A//(?:www|m(?:usic)?)\.youtube\.com/watch\?(?:\S+=\S+&)*v%3D",
    r"|attribution_link\?(?:\S+=\S+&)*u=(?:/|%2F)watch(?:\?|%3F)v(?:=|%3D)",
    r")?",
    r"|www\.youtube-nocookie\.com/embed/",
    r")",
    r"(?P<id>[A-Za-z0-9_-]{11})[?&#]?\S*",
);

const POST_PATTERN: &str =
    r"https?://(?:www\.)?(?:fixup)?x\.com/(?P<handle>\w{1,20})/status/(?P<status>[0-9]{1,25})";

// `eol` keeps a single final newline, which may follow the link.
const SHORT_LINK_TAIL: &str = r"\shttps://t\.co/\w+(?P<eol>\n?)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Video,
    Post,
}

#[derive(Debug)]
struct LinkPattern {
    kind: LinkKind,
    regex: Regex,
}

// Order is priority: a video link wins over a post link in the same message.
static LINK_PATTERNS: LazyLock<[LinkPattern; 2]> = LazyLock::new(|| {
    [
        LinkPattern {
            kind: LinkKind::Video,
            regex: compile(VIDEO_PATTERN),
        },
        LinkPattern {
            kind: LinkKind::Post,
            regex: compile(POST_PATTERN),
        },
    ]
});

static SHORT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| compile(SHORT_LINK_TAIL));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// An 11-character video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub const LEN: usize = 11;

    /// Accepts exactly 11 characters from `[A-Za-z0-9_-]`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == Self::LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl core::fmt::Display for VideoId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The first actionable link found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Video(VideoId),
    /// Full status URL on the post platform.
    Post(String),
}

/// Find the link to preview in `text`. Only the first match of the
/// highest-priority kind is returned.
#[must_use]
pub fn detect(text: &str) -> Option<Link> {
    LINK_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.regex.captures(text)?;
        match pattern.kind {
            LinkKind::Video => caps
                .name("id")
                .and_then(|m| VideoId::parse(m.as_str()))
                .map(Link::Video),
            LinkKind::Post => caps.get(0).map(|m| Link::Post(m.as_str().to_owned())),
        }
    })
}

/// Drop a trailing whitespace-prefixed `t.co` link from a post body.
#[must_use]
pub fn strip_short_link(text: &str) -> Cow<'_, str> {
    SHORT_LINK_RE.replace(text, "${eol}")
}
