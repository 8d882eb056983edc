use serde::{Deserialize, Serialize};

use crate::classify::CategoryTag;
use crate::feed::VideoRecord;

/// Cards revealed per "load more" step.
pub const PAGE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Filter {
    #[default]
    All,
    Category(CategoryTag),
}

impl Filter {
    pub fn matches(&self, video: &VideoRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Category(tag) => video.category == *tag,
        }
    }

    /// `"all"` or a category name.
    pub fn parse(name: &str) -> Option<Self> {
        if name.trim().eq_ignore_ascii_case("all") {
            return Some(Filter::All);
        }
        CategoryTag::from_name(name).map(Filter::Category)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => f.write_str("all"),
            Filter::Category(tag) => write!(f, "{}", tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogViewState {
    pub active_filter: Filter,
    pub page_size: usize,
    /// Always a multiple of `page_size`; slicing clamps it to what exists.
    pub revealed_count: usize,
}

impl Default for CatalogViewState {
    fn default() -> Self {
        Self {
            active_filter: Filter::All,
            page_size: PAGE_SIZE,
            revealed_count: PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_videos: usize,
    /// Videos without a reported count contribute zero.
    pub total_views: u64,
}

/// Parsed videos plus the filter/pagination state a renderer reads from.
///
/// Records are kept in feed order and never mutated; every view is a
/// filtered prefix of that order.
#[derive(Debug, Clone, Default)]
pub struct VideoCatalog {
    videos: Vec<VideoRecord>,
    view: CatalogViewState,
}

impl VideoCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog and reset the view state.
    pub fn load(&mut self, videos: Vec<VideoRecord>) {
        self.videos = videos;
        self.view = CatalogViewState::default();
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn view_state(&self) -> &CatalogViewState {
        &self.view
    }

    pub fn active_filter(&self) -> Filter {
        self.view.active_filter
    }

    pub fn revealed_count(&self) -> usize {
        self.view.revealed_count
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.view.active_filter = filter;
        self.view.revealed_count = self.view.page_size;
    }

    pub fn load_more(&mut self) {
        self.view.revealed_count += self.view.page_size;
    }

    /// Every video matching the active filter.
    pub fn filtered(&self) -> impl Iterator<Item = &VideoRecord> {
        let filter = self.view.active_filter;
        self.videos.iter().filter(move |v| filter.matches(v))
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered().count()
    }

    pub fn current_page(&self) -> Vec<&VideoRecord> {
        self.filtered().take(self.view.revealed_count).collect()
    }

    pub fn has_more(&self) -> bool {
        self.filtered_len() > self.view.revealed_count
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total_videos: self.videos.len(),
            total_views: self
                .videos
                .iter()
                .filter_map(|v| v.view_count.value())
                .fold(0u64, u64::saturating_add),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ViewCount;

    fn video(n: usize, category: CategoryTag, views: ViewCount) -> VideoRecord {
        VideoRecord {
            id: format!("vid{n}"),
            title: format!("Video {n}"),
            description: String::new(),
            thumbnail_url: String::new(),
            page_url: String::new(),
            published_at: String::new(),
            view_count: views,
            category,
        }
    }

    fn others(count: usize) -> Vec<VideoRecord> {
        (0..count)
            .map(|n| video(n, CategoryTag::Other, ViewCount::Count(10)))
            .collect()
    }

    #[test]
    fn test_pagination_ten_videos() {
        let mut catalog = VideoCatalog::new();
        catalog.load(others(10));

        assert_eq!(catalog.current_page().len(), 6);
        assert!(catalog.has_more());

        catalog.load_more();
        assert_eq!(catalog.current_page().len(), 10);
        assert!(!catalog.has_more());

        // Past the end is not an error.
        catalog.load_more();
        assert_eq!(catalog.revealed_count(), 18);
        assert_eq!(catalog.current_page().len(), 10);
    }

    #[test]
    fn test_set_filter_resets_revealed_count() {
        let mut catalog = VideoCatalog::new();
        catalog.load(others(20));
        catalog.load_more();
        catalog.load_more();
        assert_eq!(catalog.revealed_count(), 18);

        catalog.set_filter(Filter::Category(CategoryTag::Other));
        assert_eq!(catalog.revealed_count(), PAGE_SIZE);

        catalog.load_more();
        catalog.set_filter(Filter::Category(CategoryTag::Other));
        assert_eq!(catalog.revealed_count(), PAGE_SIZE);
    }

    #[test]
    fn test_filter_preserves_feed_order() {
        let mut catalog = VideoCatalog::new();
        catalog.load(vec![
            video(0, CategoryTag::Collab, ViewCount::Unavailable),
            video(1, CategoryTag::Other, ViewCount::Unavailable),
            video(2, CategoryTag::Collab, ViewCount::Unavailable),
            video(3, CategoryTag::Qna, ViewCount::Unavailable),
        ]);

        catalog.set_filter(Filter::Category(CategoryTag::Collab));
        let ids: Vec<&str> = catalog.current_page().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["vid0", "vid2"]);
        assert!(!catalog.has_more());

        catalog.set_filter(Filter::Category(CategoryTag::Bts));
        assert!(catalog.current_page().is_empty());

        catalog.set_filter(Filter::All);
        assert_eq!(catalog.filtered_len(), 4);
    }

    #[test]
    fn test_load_resets_view_state() {
        let mut catalog = VideoCatalog::new();
        catalog.load(others(3));
        catalog.set_filter(Filter::Category(CategoryTag::Qna));
        catalog.load_more();

        catalog.load(others(3));
        assert_eq!(catalog.view_state(), &CatalogViewState::default());
    }

    #[test]
    fn test_stats_counts_unavailable_as_zero() {
        let mut catalog = VideoCatalog::new();
        catalog.load(vec![
            video(0, CategoryTag::Other, ViewCount::Count(1500)),
            video(1, CategoryTag::Other, ViewCount::Unavailable),
            video(2, CategoryTag::Collab, ViewCount::Count(500)),
        ]);
        catalog.set_filter(Filter::Category(CategoryTag::Collab));

        // stats ignore the active filter
        let stats = catalog.stats();
        assert_eq!(stats.total_videos, 3);
        assert_eq!(stats.total_views, 2000);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(Filter::parse("All"), Some(Filter::All));
        assert_eq!(Filter::parse("bts"), Some(Filter::Category(CategoryTag::Bts)));
        assert_eq!(Filter::parse("cooking"), None);
        assert_eq!(Filter::Category(CategoryTag::Qna).to_string(), "qna");
    }
}
