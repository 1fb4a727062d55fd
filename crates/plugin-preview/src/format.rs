use plugin_core::truncate;

use crate::{
    matcher::strip_short_link,
    record::{PostRecord, VideoRecord},
};

/// Shown instead of a like count the platform keeps private.
pub const HIDDEN_COUNT: &str = "hidden";
/// Shown when the provider gives no usable upload date.
pub const UNKNOWN_DATE: &str = "?";
const DESCRIPTION_CHARS: usize = 80;

const MAGNITUDES: [(u64, &str); 4] = [
    (1_000, "K"),
    (1_000_000, "M"),
    (1_000_000_000, "B"),
    (1_000_000_000_000, "T"),
];

/// Compact count like `999`, `1.23K`, `12.5M`. Two decimals at most, rounded
/// half to even, trailing zeros dropped.
#[must_use]
pub fn humanize(n: u64) -> String {
    let Some(mut tier) = MAGNITUDES.iter().rposition(|&(unit, _)| n >= unit) else {
        return n.to_string();
    };
    if n >= MAGNITUDES[tier].0 * 1_000 && tier == MAGNITUDES.len() - 1 {
        return n.to_string();
    }
    let mut hundredths = scaled_hundredths(n, MAGNITUDES[tier].0);
    // 999_999 rounds up to 1000.00K; show it as 1M.
    if hundredths >= 100_000 && tier + 1 < MAGNITUDES.len() {
        tier += 1;
        hundredths = scaled_hundredths(n, MAGNITUDES[tier].0);
    }

    let whole = hundredths / 100;
    let frac = hundredths % 100;
    let suffix = MAGNITUDES[tier].1;
    match frac {
        0 => format!("{whole}{suffix}"),
        f if f % 10 == 0 => format!("{whole}.{}{suffix}", f / 10),
        f => format!("{whole}.{f:02}{suffix}"),
    }
}

fn scaled_hundredths(n: u64, unit: u64) -> u128 {
    let num = u128::from(n) * 100;
    let den = u128::from(unit);
    let (q, r) = (num / den, num % den);
    if r * 2 > den || (r * 2 == den && q % 2 == 1) {
        q + 1
    } else {
        q
    }
}

/// Three lines: emphasized title, description teaser, then the stats line.
#[must_use]
pub fn format_video_preview(record: &VideoRecord) -> String {
    let teaser = truncate(&record.description, DESCRIPTION_CHARS);
    let likes = record
        .like_count
        .map_or_else(|| HIDDEN_COUNT.to_owned(), humanize);
    let date = record
        .upload_date
        .as_ref()
        .map_or_else(|| UNKNOWN_DATE.to_owned(), ToString::to_string);
    let stats = [
        format!("🎥{}", record.channel),
        format!("👁️{}", humanize(record.view_count)),
        format!("⏳{}", record.runtime),
        format!("👍🏻{likes}"),
        format!("🗓️{date}"),
    ];
    format!(
        "*{}*\n{}...\n{}",
        record.title,
        teaser.trim(),
        stats.join(" ")
    )
}

#[must_use]
pub fn format_post_preview(record: &PostRecord) -> String {
    format!(
        "*{}*\n{}",
        record.uploader,
        strip_short_link(&record.description)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Runtime, UploadDate};

    fn record() -> VideoRecord {
        VideoRecord {
            title: "Never Gonna Give You Up".to_owned(),
            description: "  The official video for Never Gonna Give You Up  ".to_owned(),
            channel: "Rick Astley".to_owned(),
            view_count: 1_234_567,
            like_count: Some(18_000_000),
            runtime: Runtime::Recorded("3:33".to_owned()),
            upload_date: UploadDate::parse("20230615"),
        }
    }

    #[test]
    fn humanize_matches_common_outputs() {
        let cases = [
            (0, "0"),
            (999, "999"),
            (1_000, "1K"),
            (1_234, "1.23K"),
            (1_500, "1.5K"),
            (1_005, "1K"),
            (1_015, "1.02K"),
            (999_999, "1M"),
            (12_345_678, "12.35M"),
            (18_000_000, "18M"),
            (1_500_000_000, "1.5B"),
            (2_000_000_000_000, "2T"),
            (5_000_000_000_000_000, "5000000000000000"),
        ];
        for (n, expected) in cases {
            assert_eq!(humanize(n), expected, "n = {n}");
        }
    }

    #[test]
    fn video_preview_layout() {
        let text = format_video_preview(&record());
        assert_eq!(
            text,
            "*Never Gonna Give You Up*\n\
             The official video for Never Gonna Give You Up...\n\
             🎥Rick Astley 👁️1.23M ⏳3:33 👍🏻18M 🗓️2023-06-15"
        );
    }

    #[test]
    fn description_is_cut_at_80_chars_with_fixed_ellipsis() {
        let mut long = record();
        long.description = "a".repeat(100);
        let text = format_video_preview(&long);
        let second = text.lines().nth(1).unwrap();
        assert_eq!(second, format!("{}...", "a".repeat(80)));
        assert_eq!(second.chars().count(), 83);

        let mut empty = record();
        empty.description = String::new();
        assert_eq!(format_video_preview(&empty).lines().nth(1), Some("..."));
    }

    #[test]
    fn hidden_likes_never_render_as_zero() {
        let mut hidden = record();
        hidden.like_count = None;
        let stats = format_video_preview(&hidden).lines().nth(2).unwrap().to_owned();
        assert!(stats.contains("👍🏻hidden"), "{stats}");
        assert!(!stats.contains("👍🏻0"));
    }

    #[test]
    fn live_streams_show_live_marker() {
        let mut live = record();
        live.runtime = Runtime::Live;
        live.upload_date = None;
        let stats = format_video_preview(&live).lines().nth(2).unwrap().to_owned();
        assert!(stats.contains("⏳LIVE"), "{stats}");
        assert!(stats.ends_with("🗓️?"), "{stats}");
    }

    #[test]
    fn post_preview_strips_trailing_short_link() {
        let post = PostRecord {
            uploader: "Rust Language".to_owned(),
            description: "Rust 1.80 is out! https://t.co/AbCdEf123".to_owned(),
        };
        assert_eq!(format_post_preview(&post), "*Rust Language*\nRust 1.80 is out!");
    }
}
