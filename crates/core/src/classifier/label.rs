//! The closed set of classification labels and their presentation.

use serde::{Deserialize, Serialize};

/// Edibility verdict stored on a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    /// Safe to eat when correctly identified.
    Edible,
    /// Causes illness.
    Poisonous,
    /// Potentially lethal.
    Deadly,
    /// Edible only after specific preparation.
    ConditionallyEdible,
    /// The photo does not show a recognizable mushroom.
    NotAMushroom,
}

impl ClassificationLabel {
    /// Every label, in display order.
    pub const ALL: [Self; 5] = [
        Self::Edible,
        Self::ConditionallyEdible,
        Self::Poisonous,
        Self::Deadly,
        Self::NotAMushroom,
    ];

    /// Returns the label as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Edible => "edible",
            Self::Poisonous => "poisonous",
            Self::Deadly => "deadly",
            Self::ConditionallyEdible => "conditionally_edible",
            Self::NotAMushroom => "not_a_mushroom",
        }
    }

    /// Parses a stored label. Matching is exact; callers lower-case first.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "edible" => Some(Self::Edible),
            "poisonous" => Some(Self::Poisonous),
            "deadly" => Some(Self::Deadly),
            "conditionally_edible" => Some(Self::ConditionallyEdible),
            "not_a_mushroom" => Some(Self::NotAMushroom),
            _ => None,
        }
    }

    /// Maps a class name emitted by the older sporocarp model.
    #[must_use]
    pub fn from_legacy(s: &str) -> Option<Self> {
        match s {
            "edible_sporocarp" | "edible_mushroom_sporocarp" => Some(Self::Edible),
            "poisonous_sporocarp" | "poisonous_mushroom_sporocarp" => Some(Self::Poisonous),
            _ => None,
        }
    }

    /// Returns how this label is presented to users.
    #[must_use]
    pub fn presentation(&self) -> &'static LabelPresentation {
        match self {
            Self::Edible => &PRESENTATIONS[0],
            Self::ConditionallyEdible => &PRESENTATIONS[1],
            Self::Poisonous => &PRESENTATIONS[2],
            Self::Deadly => &PRESENTATIONS[3],
            Self::NotAMushroom => &PRESENTATIONS[4],
        }
    }
}

impl std::fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How alarming a label is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No known hazard.
    Safe,
    /// Hazard depends on preparation.
    Caution,
    /// Harmful.
    Danger,
    /// Potentially lethal.
    Critical,
    /// Not applicable.
    Neutral,
}

/// Display attributes for one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelPresentation {
    /// Label this entry describes.
    pub label: ClassificationLabel,
    /// Short heading.
    pub title: &'static str,
    /// Severity bucket.
    pub severity: Severity,
    /// Accent color as a hex string.
    pub color: &'static str,
    /// Icon identifier.
    pub icon: &'static str,
    /// One-line advice.
    pub advice: &'static str,
}

static PRESENTATIONS: [LabelPresentation; 5] = [
    LabelPresentation {
        label: ClassificationLabel::Edible,
        title: "Edible",
        severity: Severity::Safe,
        color: "#2e7d32",
        icon: "check-circle",
        advice: "Likely edible. Always confirm with an expert before eating.",
    },
    LabelPresentation {
        label: ClassificationLabel::ConditionallyEdible,
        title: "Conditionally edible",
        severity: Severity::Caution,
        color: "#f9a825",
        icon: "alert-triangle",
        advice: "Edible only with proper preparation. Consult an expert.",
    },
    LabelPresentation {
        label: ClassificationLabel::Poisonous,
        title: "Poisonous",
        severity: Severity::Danger,
        color: "#e65100",
        icon: "x-octagon",
        advice: "Do not consume.",
    },
    LabelPresentation {
        label: ClassificationLabel::Deadly,
        title: "Deadly",
        severity: Severity::Critical,
        color: "#b71c1c",
        icon: "skull",
        advice: "Do not consume or handle without protection.",
    },
    LabelPresentation {
        label: ClassificationLabel::NotAMushroom,
        title: "Not a mushroom",
        severity: Severity::Neutral,
        color: "#607d8b",
        icon: "help-circle",
        advice: "Try a clearer photo of the cap, gills, and stem.",
    },
];

/// The full presentation table, one entry per label.
#[must_use]
pub fn presentation_table() -> Vec<&'static LabelPresentation> {
    ClassificationLabel::ALL
        .iter()
        .map(ClassificationLabel::presentation)
        .collect()
}
