use serde::{Deserialize, Serialize};

/// One label per video, derived from keyword rules over its title/description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryTag {
    Showcase,
    Qna,
    Animation,
    Collab,
    Bts,
    #[default]
    Other,
}

impl CategoryTag {
    pub const ALL: [CategoryTag; 6] = [
        CategoryTag::Showcase,
        CategoryTag::Qna,
        CategoryTag::Animation,
        CategoryTag::Collab,
        CategoryTag::Bts,
        CategoryTag::Other,
    ];

    /// Machine name, as used in filters and serialised records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Showcase => "showcase",
            Self::Qna => "qna",
            Self::Animation => "animation",
            Self::Collab => "collab",
            Self::Bts => "bts",
            Self::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a video. Rules run in a fixed order and the first hit wins, so a
/// "Model Showcase Collab" is a showcase, not a collab.
pub fn classify(title: &str, description: &str) -> CategoryTag {
    let title = title.to_lowercase();
    let description = description.to_lowercase();
    let title_has = |needles: &[&str]| needles.iter().any(|n| title.contains(n));

    if title_has(&["showcase", "model"]) {
        return CategoryTag::Showcase;
    }

    if title_has(&["q&a", "questions", "discord"]) {
        return CategoryTag::Qna;
    }

    if title_has(&["animation", "meme", "dance"]) {
        return CategoryTag::Animation;
    }

    // the only rule that also looks at the description
    if title.contains("collab") || description.contains("collab") {
        return CategoryTag::Collab;
    }

    if title_has(&["behind", "bts"]) {
        return CategoryTag::Bts;
    }

    CategoryTag::Other
}
