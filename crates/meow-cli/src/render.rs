//! Plain-text rendering of catalog, posts and home preview.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use meow_proto::catalog::VideoCatalog;
use meow_proto::error::{FeedError, ParseError};
use meow_proto::feed::{PostRecord, VideoRecord};
use meow_proto::format::{
    format_category, format_count, format_days_ago, format_full_view_count, format_post_date,
    format_published, format_short_date, format_view_count, strip_html, truncate_text,
    UNKNOWN_DATE,
};
use meow_proto::posts::{PostFeed, PREVIEW_POSTS};

pub const CHANNEL_URL: &str = "https://www.youtube.com/channel/UCNytjdD5-KZInxjVeWV_qQw";
const DESCRIPTION_CHARS: usize = 120;

pub const VIDEO_PREVIEW_FAILED: &str = "Could not load video preview.";
pub const POST_PREVIEW_FAILED: &str = "Could not load post previews.";
pub const POSTS_EMPTY: &str = "Could not parse posts. The XML file might be empty or malformed.";

pub fn stats_line(catalog: &VideoCatalog) -> String {
    let stats = catalog.stats();
    format!(
        "{} Videos · {} Views",
        stats.total_videos,
        format_count(stats.total_views)
    )
}

pub fn video_card(video: &VideoRecord, now: DateTime<Utc>) -> String {
    let description = truncate_text(&strip_html(&video.description), DESCRIPTION_CHARS);
    format!(
        "▶ {}\n  {}\n  {} views • {} [{}]\n  {}\n",
        video.title,
        description,
        format_view_count(video.view_count),
        format_published(&video.published_at, now),
        format_category(video.category),
        video.page_url,
    )
}

pub fn video_page(catalog: &VideoCatalog, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", stats_line(catalog));
    let _ = writeln!(out, "Filter: {}\n", catalog.active_filter());

    let page = catalog.current_page();
    if page.is_empty() {
        out.push_str("No videos match this filter\n");
        out.push_str("Try \"--filter all\" or check back later!\n");
        return out;
    }

    for video in &page {
        out.push_str(&video_card(video, now));
        out.push('\n');
    }

    if catalog.has_more() {
        let _ = writeln!(
            out,
            "Showing {} of {}. Use --more to load more videos.",
            page.len(),
            catalog.filtered_len()
        );
    }
    out
}

pub fn video_feed_error() -> String {
    format!(
        "😿 Oops! Meowbah's videos are taking a nap\n\
         Couldn't load the YouTube feed right now. Please try again!\n\
         Or visit Meowbah's YouTube: {}\n",
        CHANNEL_URL
    )
}

pub fn post_card(post: &PostRecord) -> String {
    let date = post
        .published_at
        .map(format_post_date)
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());
    let mut out = format!("✦ {}\n  {}\n", post.title, date);
    if let Some(image) = &post.image_url {
        let _ = writeln!(out, "  🖼 {}", image);
    }
    let _ = writeln!(out, "  {}", post.link);
    out
}

pub fn post_page(feed: &PostFeed) -> String {
    feed.posts()
        .iter()
        .map(post_card)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn post_feed_error(err: &FeedError, source: &str) -> String {
    match err {
        FeedError::Parse(ParseError::Empty { .. }) => POSTS_EMPTY.to_string(),
        _ => format!(
            "Failed to load posts. Please ensure '{}' exists and is correctly formatted.",
            source
        ),
    }
}

pub fn home_video(result: &Result<Vec<VideoRecord>, FeedError>, now: DateTime<Utc>) -> String {
    let latest = match result {
        Ok(videos) => videos.first(),
        Err(_) => None,
    };
    let Some(video) = latest else {
        return VIDEO_PREVIEW_FAILED.to_string();
    };

    let date = match video.published() {
        Some(published) => format_days_ago(published, now),
        None => UNKNOWN_DATE.to_string(),
    };
    format!(
        "Latest video\n▶ {}\n  • {} views • {}\n  {}\n  Watch all videos: meowtalk videos",
        video.title,
        format_full_view_count(video.view_count),
        date,
        video.page_url,
    )
}

pub fn home_posts(result: &Result<PostFeed, FeedError>) -> String {
    let feed = match result {
        Ok(feed) if !feed.is_empty() => feed,
        _ => return POST_PREVIEW_FAILED.to_string(),
    };

    let mut out = String::from("Latest posts\n");
    for post in feed.latest(PREVIEW_POSTS) {
        let _ = writeln!(
            out,
            "✦ {}\n  • {}",
            PostFeed::preview_title(post),
            post.published_at
                .map(format_short_date)
                .unwrap_or_else(|| UNKNOWN_DATE.to_string())
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use meow_proto::catalog::Filter;
    use meow_proto::classify::CategoryTag;
    use meow_proto::error::FetchError;
    use meow_proto::feed::ViewCount;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn video(n: usize, category: CategoryTag, views: u64) -> VideoRecord {
        VideoRecord {
            id: format!("v{n}"),
            title: format!("Video {n}"),
            description: "<p>Hello <b>friends</b></p>".to_string(),
            thumbnail_url: String::new(),
            page_url: format!("https://www.youtube.com/watch?v=v{n}"),
            published_at: "2024-06-28T12:00:00+00:00".to_string(),
            view_count: ViewCount::Count(views),
            category,
        }
    }

    fn post(title: &str) -> PostRecord {
        PostRecord {
            title: title.to_string(),
            link: "https://x/1".to_string(),
            published_at: chrono::DateTime::parse_from_rfc2822("Fri, 05 Jan 2024 10:00:00 +0000")
                .ok(),
            image_url: None,
        }
    }

    fn io_error() -> FeedError {
        FeedError::Fetch(FetchError::Io {
            path: "meowbah-posts.xml".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    #[test]
    fn test_video_card() {
        let card = video_card(&video(1, CategoryTag::Qna, 1500), now());
        assert_eq!(
            card,
            "▶ Video 1\n  Hello friends\n  1.5K views • Yesterday [Q&A]\n  https://www.youtube.com/watch?v=v1\n"
        );
    }

    #[test]
    fn test_video_page_pagination_hint_and_stats() {
        let mut catalog = VideoCatalog::new();
        catalog.load((0..8).map(|n| video(n, CategoryTag::Other, 500)).collect());
        let page = video_page(&catalog, now());
        assert!(page.starts_with("8 Videos · 4.0K Views\n"));
        assert!(page.contains("Showing 6 of 8."));

        catalog.load_more();
        assert!(!video_page(&catalog, now()).contains("Showing"));
    }

    #[test]
    fn test_empty_filter_message() {
        let mut catalog = VideoCatalog::new();
        catalog.load(vec![video(0, CategoryTag::Other, 1)]);
        catalog.set_filter(Filter::Category(CategoryTag::Collab));
        let page = video_page(&catalog, now());
        assert!(page.contains("No videos match this filter"));
        assert!(page.starts_with("1 Videos"));
    }

    #[test]
    fn test_feed_error_messages() {
        assert!(video_feed_error().contains(CHANNEL_URL));
        assert_eq!(
            post_feed_error(&FeedError::Parse(ParseError::Empty { expected: "item" }), "p.xml"),
            POSTS_EMPTY
        );
        assert_eq!(
            post_feed_error(&io_error(), "meowbah-posts.xml"),
            "Failed to load posts. Please ensure 'meowbah-posts.xml' exists and is correctly formatted."
        );
    }

    #[test]
    fn test_home_preview() {
        let videos = Ok(vec![video(0, CategoryTag::Other, 1_234_567)]);
        let home = home_video(&videos, now());
        assert!(home.contains("• 1,234,567 views • Yesterday"));
        assert_eq!(home_video(&Err(io_error()), now()), VIDEO_PREVIEW_FAILED);
        assert_eq!(home_video(&Ok(Vec::new()), now()), VIDEO_PREVIEW_FAILED);

        let feed = Ok(PostFeed::new(vec![
            post("a title that is definitely longer than thirty chars"),
            post("short"),
            post("never shown"),
        ]));
        let posts = home_posts(&feed);
        assert!(posts.contains("✦ a title that is definitely lon...\n  • Jan 5"));
        assert!(posts.contains("✦ short...\n"));
        assert!(!posts.contains("never shown"));
        assert_eq!(home_posts(&Err(io_error())), POST_PREVIEW_FAILED);
    }

    #[test]
    fn test_post_card() {
        let mut p = post("Hello");
        p.image_url = Some("https://x/a.png".to_string());
        assert_eq!(
            post_card(&p),
            "✦ Hello\n  January 5, 2024\n  🖼 https://x/a.png\n  https://x/1\n"
        );
    }

    #[test]
    fn test_undated_post_card() {
        let mut p = post("Undated");
        p.published_at = None;
        assert_eq!(post_card(&p), "✦ Undated\n  Unknown date\n  https://x/1\n");

        let feed = Ok(PostFeed::new(vec![p]));
        assert!(home_posts(&feed).contains("✦ Undated...\n  • Unknown date"));
    }
}
