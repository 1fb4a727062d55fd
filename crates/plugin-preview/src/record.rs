use serde::Deserialize;

/// Subset of the provider's JSON info dict that previews care about.
/// Every field is optional; what is present depends on the content type.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RawInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub duration_string: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
}

/// Length of an ongoing broadcast has no value yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    Recorded(String),
    Live,
}

impl core::fmt::Display for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Recorded(text) => f.write_str(text),
            Self::Live => f.write_str("LIVE"),
        }
    }
}

/// An upload date code: exactly eight ASCII digits, `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDate(String);

impl UploadDate {
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        (code.len() == 8 && code.bytes().all(|b| b.is_ascii_digit())).then(|| Self(code.to_owned()))
    }
}

impl core::fmt::Display for UploadDate {
    /// Pure slicing, no calendar validation.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let code = &self.0;
        write!(f, "{}-{}-{}", &code[..4], &code[4..6], &code[6..])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub title: String,
    pub description: String,
    pub channel: String,
    pub view_count: u64,
    /// `None` when the platform hides the count.
    pub like_count: Option<u64>,
    pub runtime: Runtime,
    pub upload_date: Option<UploadDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub uploader: String,
    pub description: String,
}

impl VideoRecord {
    /// `None` when the info carries no title, which no real video lacks.
    #[must_use]
    pub fn from_info(info: RawInfo) -> Option<Self> {
        let title = info.title?;
        Some(Self {
            title,
            description: info.description.unwrap_or_default(),
            channel: info.channel.or(info.uploader).unwrap_or_default(),
            view_count: info.view_count.unwrap_or_default(),
            like_count: info.like_count,
            runtime: info.duration_string.map_or(Runtime::Live, Runtime::Recorded),
            upload_date: info.upload_date.as_deref().and_then(UploadDate::parse),
        })
    }
}

impl PostRecord {
    #[must_use]
    pub fn from_info(info: RawInfo) -> Option<Self> {
        Some(Self {
            uploader: info.uploader.or(info.channel)?,
            description: info.description.unwrap_or_default(),
        })
    }
}

/// Why a preview could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    AgeRestricted,
    MalformedId,
    Generic,
    /// Nothing worth showing; the reply is suppressed.
    NoContent,
}

impl FailureReason {
    /// The visible reply for this failure, if any.
    #[must_use]
    pub const fn reply_text(self) -> Option<&'static str> {
        match self {
            Self::AgeRestricted => Some("error: age restricted video"),
            Self::MalformedId => Some("error: malformed video ID"),
            Self::Generic => Some("error"),
            Self::NoContent => None,
        }
    }
}

pub type FetchOutcome<T> = Result<T, FailureReason>;
