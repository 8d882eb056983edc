use crate::error::ParseError;
use crate::feed::{parse_posts, PostRecord};
use crate::format::truncate_text;

/// Posts shown in the home-page preview.
pub const PREVIEW_POSTS: usize = 2;
pub const PREVIEW_TITLE_CHARS: usize = 30;

/// Social posts in feed order.  No filtering, no paging.
#[derive(Debug, Clone, Default)]
pub struct PostFeed {
    posts: Vec<PostRecord>,
}

impl PostFeed {
    pub fn new(posts: Vec<PostRecord>) -> Self {
        Self { posts }
    }

    pub fn from_xml(xml: &str) -> Result<Self, ParseError> {
        parse_posts(xml).map(Self::new)
    }

    pub fn posts(&self) -> &[PostRecord] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The first `n` posts.
    pub fn latest(&self, n: usize) -> &[PostRecord] {
        &self.posts[..n.min(self.posts.len())]
    }

    /// Preview titles are always cut and suffixed, even when short.
    pub fn preview_title(post: &PostRecord) -> String {
        let cut = truncate_text(&post.title, PREVIEW_TITLE_CHARS);
        if cut.ends_with("...") {
            cut
        } else {
            format!("{}...", cut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<rss version="2.0"><channel>
<item><title>first post with a rather long title that keeps going</title><link>https://x/1</link><pubDate>Sat, 05 Oct 2024 12:00:00 GMT</pubDate><description>&lt;img src="https://x/a.png"&gt;</description></item>
<item><title>second</title><link>https://x/2</link><pubDate>Fri, 04 Oct 2024 12:00:00 GMT</pubDate></item>
<item><title>third</title><link>https://x/3</link><pubDate>Thu, 03 Oct 2024 12:00:00 GMT</pubDate></item>
</channel></rss>"#;

    #[test]
    fn test_post_feed_from_xml() {
        let feed = PostFeed::from_xml(FEED).unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed.posts()[0].image_url.as_deref(), Some("https://x/a.png"));
        assert_eq!(feed.posts()[1].image_url, None);
    }

    #[test]
    fn test_latest_clamps() {
        let feed = PostFeed::from_xml(FEED).unwrap();
        let latest = feed.latest(PREVIEW_POSTS);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[1].title, "second");
        assert_eq!(feed.latest(10).len(), 3);
        assert!(PostFeed::default().latest(2).is_empty());
    }

    #[test]
    fn test_preview_title() {
        let feed = PostFeed::from_xml(FEED).unwrap();
        assert_eq!(
            PostFeed::preview_title(&feed.posts()[0]),
            "first post with a rather long..."
        );
        assert_eq!(PostFeed::preview_title(&feed.posts()[1]), "second...");
    }
}
