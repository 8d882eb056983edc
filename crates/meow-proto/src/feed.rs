//! XML feed parsing.
//!
//! ## Shapes
//!
//!   atom-video  YouTube channel feed: `entry` elements carrying `yt:videoId`
//!               and a `media:group` with thumbnail, description and
//!               statistics.
//!   rss-post    RSS 2.0 (a Nitter mirror): `item` elements whose HTML
//!               `description` embeds the post image.
//!
//! Source feeds are not consistent about declaring their namespaces, so every
//! lookup accepts either the resolved namespace URI or the literal prefixed
//! tag name (`media:group`).  An undeclared prefix is never an error.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::{classify, CategoryTag};
use crate::error::ParseError;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const MEDIA_NS: &str = "http://search.yahoo.com/mrss/";
pub const YT_NS: &str = "http://www.youtube.com/xml/schemas/2015";

pub const UNKNOWN_VIDEO_ID: &str = "N/A";
pub const UNTITLED: &str = "Untitled";
pub const NO_DESCRIPTION: &str = "No description available.";

// ── Records ───────────────────────────────────────────────────────────────────

/// View count as reported by `media:statistics@views`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewCount {
    Count(u64),
    #[default]
    Unavailable,
}

impl ViewCount {
    /// Integer-prefix parse: leading digits count, anything else is unavailable.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim_start();
        let s = s.strip_prefix('+').unwrap_or(s);
        let digits_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        match s[..digits_end].parse::<u64>() {
            Ok(n) => Self::Count(n),
            Err(_) => Self::Unavailable,
        }
    }

    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            Self::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub page_url: String,
    /// Raw `published` text; see [`VideoRecord::published`].
    pub published_at: String,
    pub view_count: ViewCount,
    pub category: CategoryTag,
}

impl VideoRecord {
    pub fn published(&self) -> Option<DateTime<FixedOffset>> {
        parse_feed_date(&self.published_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    pub link: String,
    /// `None` when `pubDate` could not be read as a date.
    pub published_at: Option<DateTime<FixedOffset>>,
    pub image_url: Option<String>,
}

pub fn default_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Feed timestamps are RFC 3339 (Atom) or RFC 2822 (RSS).  Mirrors also emit
/// a `UTC` zone name or no zone at all; both are read as UTC.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw).or_else(|_| DateTime::parse_from_rfc2822(raw)) {
        return Some(date);
    }

    let bare = raw
        .strip_suffix("UTC")
        .or_else(|| raw.strip_suffix('Z'))
        .unwrap_or(raw)
        .trim_end();
    if bare.len() != raw.len() {
        if let Ok(date) = DateTime::parse_from_rfc2822(&format!("{} +0000", bare)) {
            return Some(date);
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(bare, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(bare, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

// ── Entry points ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedShape {
    AtomVideo,
    RssPost,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFeed {
    Videos(Vec<VideoRecord>),
    Posts(Vec<PostRecord>),
}

pub fn parse_feed(xml: &str, shape: FeedShape) -> Result<ParsedFeed, ParseError> {
    match shape {
        FeedShape::AtomVideo => parse_videos(xml).map(ParsedFeed::Videos),
        FeedShape::RssPost => parse_posts(xml).map(ParsedFeed::Posts),
    }
}

/// Parse an Atom video feed.  At least one entry is required.
pub fn parse_videos(xml: &str) -> Result<Vec<VideoRecord>, ParseError> {
    let doc = Document::parse(xml)?;
    let videos: Vec<VideoRecord> = doc.elements(ATOM_ENTRY).map(video_from_entry).collect();
    if videos.is_empty() {
        return Err(ParseError::Empty { expected: "entry" });
    }
    Ok(videos)
}

/// Parse an RSS post feed.  At least one item is required.
pub fn parse_posts(xml: &str) -> Result<Vec<PostRecord>, ParseError> {
    let doc = Document::parse(xml)?;
    let posts = doc
        .elements(RSS_ITEM)
        .enumerate()
        .map(|(index, item)| post_from_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;
    if posts.is_empty() {
        return Err(ParseError::Empty { expected: "item" });
    }
    Ok(posts)
}

fn video_from_entry(entry: &Element) -> VideoRecord {
    let id = entry
        .first(YT_VIDEO_ID)
        .map(Element::text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_VIDEO_ID.to_string());

    let mut thumbnail_url = default_thumbnail_url(&id);
    let mut description = NO_DESCRIPTION.to_string();
    let mut view_count = ViewCount::Unavailable;

    if let Some(group) = entry.first(MEDIA_GROUP) {
        if let Some(url) = group.first(MEDIA_THUMBNAIL).and_then(|t| t.attr("url")) {
            thumbnail_url = url.to_string();
        }
        if let Some(desc) = group.first(MEDIA_DESCRIPTION) {
            description = desc.text();
        }
        if let Some(views) = group.first(MEDIA_STATISTICS).and_then(|s| s.attr("views")) {
            view_count = ViewCount::parse(views);
        }
    }

    let title = entry
        .first(ATOM_TITLE)
        .map(Element::text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let published_at = entry.first(ATOM_PUBLISHED).map(Element::text).unwrap_or_default();
    let page_url = entry
        .first(ATOM_LINK)
        .and_then(|l| l.attr("href"))
        .map(str::to_string)
        .unwrap_or_else(|| watch_url(&id));

    let category = classify(&title, &description);

    VideoRecord {
        id,
        title,
        description,
        thumbnail_url,
        page_url,
        published_at,
        view_count,
        category,
    }
}

fn post_from_item(index: usize, item: &Element) -> Result<PostRecord, ParseError> {
    let required = |name: Name| {
        item.first(name)
            .map(Element::text)
            .ok_or(ParseError::MissingField {
                element: "item",
                index,
                field: name.local,
            })
    };

    let title = required(RSS_TITLE)?;
    let link = required(RSS_LINK)?;
    let raw_date = required(RSS_PUB_DATE)?;
    let published_at = parse_feed_date(&raw_date);
    if published_at.is_none() {
        warn!("Post #{} has an unreadable pubDate {:?}", index, raw_date);
    }

    let image_url = item
        .first(RSS_DESCRIPTION)
        .and_then(|d| first_image_src(&d.text_content()));

    Ok(PostRecord {
        title,
        link,
        published_at,
        image_url,
    })
}

/// `src` of the first `<img>` in an HTML fragment.
pub fn first_image_src(html: &str) -> Option<String> {
    let selector = scraper::Selector::parse("img").ok()?;
    let fragment = scraper::Html::parse_fragment(html);
    let src = fragment.select(&selector).next()?.value().attr("src")?;
    Some(src.to_string())
}

// ── Names ─────────────────────────────────────────────────────────────────────

/// Literal tag prefixes that never stand for Atom, even when undeclared.
const FOREIGN_PREFIXES: &[&str] = &["yt", "media"];

#[derive(Debug, Clone, Copy)]
enum Prefix {
    /// Unprefixed tag only.
    None,
    /// Exactly this literal prefix.
    Fixed(&'static str),
    /// Unprefixed, or any undeclared prefix outside [`FOREIGN_PREFIXES`].
    Any,
}

/// An element name that matches either by namespace URI + local name, or by
/// its literal (possibly prefixed) tag name.
#[derive(Debug, Clone, Copy)]
struct Name {
    namespace: Option<&'static str>,
    prefix: Prefix,
    local: &'static str,
}

impl Name {
    const fn ns(namespace: &'static str, prefix: &'static str, local: &'static str) -> Self {
        Self {
            namespace: Some(namespace),
            prefix: Prefix::Fixed(prefix),
            local,
        }
    }

    const fn atom(local: &'static str) -> Self {
        Self {
            namespace: Some(ATOM_NS),
            prefix: Prefix::Any,
            local,
        }
    }

    const fn plain(local: &'static str) -> Self {
        Self {
            namespace: None,
            prefix: Prefix::None,
            local,
        }
    }

    fn matches(&self, el: &Element) -> bool {
        if let (Some(want), Some(have)) = (self.namespace, el.namespace.as_deref()) {
            if want == have && el.local_name == self.local {
                return true;
            }
        }
        match self.prefix {
            Prefix::None => el.raw_name == self.local,
            Prefix::Fixed(prefix) => {
                el.raw_name
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix(':'))
                    == Some(self.local)
            }
            Prefix::Any => match el.raw_name.split_once(':') {
                None => el.raw_name == self.local,
                Some((prefix, local)) => {
                    el.namespace.is_none()
                        && local == self.local
                        && !FOREIGN_PREFIXES.contains(&prefix)
                }
            },
        }
    }
}

const ATOM_ENTRY: Name = Name::atom("entry");
const ATOM_TITLE: Name = Name::atom("title");
const ATOM_PUBLISHED: Name = Name::atom("published");
const ATOM_LINK: Name = Name::atom("link");
const YT_VIDEO_ID: Name = Name::ns(YT_NS, "yt", "videoId");
const MEDIA_GROUP: Name = Name::ns(MEDIA_NS, "media", "group");
const MEDIA_THUMBNAIL: Name = Name::ns(MEDIA_NS, "media", "thumbnail");
const MEDIA_DESCRIPTION: Name = Name::ns(MEDIA_NS, "media", "description");
const MEDIA_STATISTICS: Name = Name::ns(MEDIA_NS, "media", "statistics");

const RSS_ITEM: Name = Name::plain("item");
const RSS_TITLE: Name = Name::plain("title");
const RSS_LINK: Name = Name::plain("link");
const RSS_PUB_DATE: Name = Name::plain("pubDate");
const RSS_DESCRIPTION: Name = Name::plain("description");

// ── Tree ──────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Element {
    raw_name: String,
    local_name: String,
    /// Resolved namespace URI; `None` for unbound or undeclared prefixes.
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn from_start(
        start: &BytesStart<'_>,
        namespace: Option<String>,
        position: u64,
    ) -> Result<Self, ParseError> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(position, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(position, e))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            raw_name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            local_name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            namespace,
            attributes,
            children: Vec::new(),
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of this element and all descendants.
    fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    fn text(&self) -> String {
        self.text_content().trim().to_string()
    }

    /// Descendants in document order, excluding `self`.
    fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        Descendants { stack }
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    fn first(&self, name: Name) -> Option<&Element> {
        self.descendants().find(|el| name.matches(el))
    }
}

struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(el.child_elements());
        self.stack[before..].reverse();
        Some(el)
    }
}

struct Document {
    root: Element,
}

impl Document {
    fn parse(xml: &str) -> Result<Self, ParseError> {
        let mut reader = NsReader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let position = reader.buffer_position() as u64;
            let (resolved, event) = match reader.read_resolved_event() {
                Ok(pair) => pair,
                Err(e) => return Err(malformed(position, e)),
            };
            let namespace = match resolved {
                ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
                ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
            };

            match event {
                Event::Start(start) => {
                    stack.push(Element::from_start(&start, namespace, position)?);
                }
                Event::Empty(start) => {
                    let el = Element::from_start(&start, namespace, position)?;
                    attach(&mut stack, &mut root, el);
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or_else(|| ParseError::Malformed {
                        position,
                        message: "unmatched end tag".to_string(),
                    })?;
                    attach(&mut stack, &mut root, el);
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = text.unescape().map_err(|e| malformed(position, e))?;
                        parent.children.push(Node::Text(text.into_owned()));
                    }
                }
                Event::CData(cdata) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                        parent.children.push(Node::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::Malformed {
                position: xml.len() as u64,
                message: format!("unclosed element <{}>", open.raw_name),
            });
        }

        root.map(|root| Self { root }).ok_or(ParseError::NoRoot)
    }

    /// Every element matching `name`, root included, in document order.
    fn elements(&self, name: Name) -> impl Iterator<Item = &Element> {
        std::iter::once(&self.root)
            .chain(self.root.descendants())
            .filter(move |el| name.matches(el))
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        // first top-level element wins; anything after it is ignored
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn malformed(position: u64, err: impl std::fmt::Display) -> ParseError {
    ParseError::Malformed {
        position,
        message: err.to_string(),
    }
}
