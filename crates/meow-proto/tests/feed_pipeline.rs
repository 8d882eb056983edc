//! End-to-end: feed XML -> parser -> catalog -> formatted cards.

use chrono::{TimeZone, Utc};
use meow_proto::catalog::{Filter, VideoCatalog, PAGE_SIZE};
use meow_proto::classify::CategoryTag;
use meow_proto::feed::{parse_feed, FeedShape, ParsedFeed};
use meow_proto::fetch::{FeedClient, FeedSource};
use meow_proto::format::{format_count, format_published, format_view_count};

fn entry(n: usize, title: &str, views: &str) -> String {
    format!(
        r#"  <entry>
    <yt:videoId>v{n}</yt:videoId>
    <title>{title}</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=v{n}"/>
    <published>2024-06-{day:02}T10:00:00+00:00</published>
    <media:group>
      <media:thumbnail url="https://i.ytimg.com/vi/v{n}/hqdefault.jpg"/>
      <media:description>video number {n}</media:description>
      <media:community><media:statistics views="{views}"/></media:community>
    </media:group>
  </entry>
"#,
        day = 28 - n
    )
}

fn feed(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
"#,
    );
    for (n, (title, views)) in entries.iter().enumerate() {
        xml.push_str(&entry(n, title, views));
    }
    xml.push_str("</feed>\n");
    xml
}

fn sample() -> String {
    feed(&[
        ("Model Showcase 2.0", "2300000"),
        ("Q&amp;A with chat", "1500"),
        ("Dance meme", "999"),
        ("Collab stream", "N/A"),
        ("Behind the scenes", "10"),
        ("Vlog 1", "1"),
        ("Vlog 2", "1"),
        ("Vlog 3", "1"),
        ("Vlog 4", "1"),
    ])
}

#[test]
fn catalog_from_atom_feed() {
    let videos = match parse_feed(&sample(), FeedShape::AtomVideo).unwrap() {
        ParsedFeed::Videos(v) => v,
        other => panic!("expected videos, got {:?}", other),
    };

    let mut catalog = VideoCatalog::new();
    catalog.load(videos);

    let tags: Vec<CategoryTag> = catalog.videos().iter().map(|v| v.category).collect();
    assert_eq!(
        &tags[..5],
        &[
            CategoryTag::Showcase,
            CategoryTag::Qna,
            CategoryTag::Animation,
            CategoryTag::Collab,
            CategoryTag::Bts
        ]
    );

    assert_eq!(catalog.current_page().len(), PAGE_SIZE);
    assert!(catalog.has_more());
    catalog.load_more();
    assert_eq!(catalog.current_page().len(), 9);
    assert!(!catalog.has_more());

    catalog.set_filter(Filter::Category(CategoryTag::Other));
    let ids: Vec<&str> = catalog.current_page().iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, ["v5", "v6", "v7", "v8"]);

    let stats = catalog.stats();
    assert_eq!(stats.total_videos, 9);
    assert_eq!(stats.total_views, 2_300_000 + 1500 + 999 + 10 + 4);
    assert_eq!(format_count(stats.total_views), "2.3M");
}

#[test]
fn card_formatting() {
    let mut catalog = VideoCatalog::new();
    catalog.load(match parse_feed(&sample(), FeedShape::AtomVideo).unwrap() {
        ParsedFeed::Videos(v) => v,
        ParsedFeed::Posts(_) => unreachable!(),
    });
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 10, 0, 0).unwrap();

    let cards: Vec<(String, String)> = catalog
        .videos()
        .iter()
        .map(|v| (format_view_count(v.view_count), format_published(&v.published_at, now)))
        .collect();

    assert_eq!(cards[0], ("2.3M".to_string(), "Yesterday".to_string()));
    assert_eq!(cards[1], ("1.5K".to_string(), "3 days ago".to_string()));
    assert_eq!(cards[2].0, "999");
    assert_eq!(cards[3].0, "N/A");
}

#[tokio::test]
async fn load_from_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meowbah-videos.xml");
    std::fs::write(&path, sample()).unwrap();

    let source = FeedSource::parse(path.to_str().unwrap());
    let videos = FeedClient::new().load_videos(&source).await.unwrap();
    assert_eq!(videos.len(), 9);
    assert_eq!(videos[0].page_url, "https://www.youtube.com/watch?v=v0");
}
