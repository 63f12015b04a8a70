//! Segment classification from (recency score, frequency score) pairs

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::data::{RfmKey, Stage};
use crate::error::{Result, RfmError};

/// Named behavioural segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Hibernating,
    AtRisk,
    CantLoose,
    AboutToSleep,
    NeedAttention,
    LoyalCustomers,
    Promising,
    NewCustomers,
    PotentialLoyalists,
    Champions,
}

impl Segment {
    pub const ALL: [Segment; 10] = [
        Segment::Hibernating,
        Segment::AtRisk,
        Segment::CantLoose,
        Segment::AboutToSleep,
        Segment::NeedAttention,
        Segment::LoyalCustomers,
        Segment::Promising,
        Segment::NewCustomers,
        Segment::PotentialLoyalists,
        Segment::Champions,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Hibernating => "hibernating",
            Segment::AtRisk => "at_risk",
            Segment::CantLoose => "cant_loose",
            Segment::AboutToSleep => "about_to_sleep",
            Segment::NeedAttention => "need_attention",
            Segment::LoyalCustomers => "loyal_customers",
            Segment::Promising => "promising",
            Segment::NewCustomers => "new_customers",
            Segment::PotentialLoyalists => "potential_loyalists",
            Segment::Champions => "champions",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Segment {
    type Err = String;

    /// Case-insensitive, so the legacy `at_Risk` spelling is accepted
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Segment::ALL
            .iter()
            .copied()
            .find(|segment| segment.label() == wanted)
            .ok_or_else(|| format!("unknown segment: {}", s))
    }
}

/// One row of the rule table: both scores must fall in their ranges
#[derive(Debug, Clone)]
pub struct SegmentRule {
    pub recency: RangeInclusive<u8>,
    pub frequency: RangeInclusive<u8>,
    pub segment: Segment,
}

impl SegmentRule {
    const fn new(recency: RangeInclusive<u8>, frequency: RangeInclusive<u8>, segment: Segment) -> Self {
        Self {
            recency,
            frequency,
            segment,
        }
    }

    pub fn matches(&self, key: RfmKey) -> bool {
        self.recency.contains(&key.recency_score) && self.frequency.contains(&key.frequency_score)
    }
}

/// Evaluated top to bottom; the first match wins.
pub static RULES: [SegmentRule; 10] = [
    SegmentRule::new(1..=2, 1..=2, Segment::Hibernating),
    SegmentRule::new(1..=2, 3..=4, Segment::AtRisk),
    SegmentRule::new(1..=2, 5..=5, Segment::CantLoose),
    SegmentRule::new(3..=3, 1..=2, Segment::AboutToSleep),
    SegmentRule::new(3..=3, 3..=3, Segment::NeedAttention),
    SegmentRule::new(3..=4, 4..=5, Segment::LoyalCustomers),
    SegmentRule::new(4..=4, 1..=1, Segment::Promising),
    SegmentRule::new(5..=5, 1..=1, Segment::NewCustomers),
    SegmentRule::new(4..=5, 2..=3, Segment::PotentialLoyalists),
    SegmentRule::new(5..=5, 4..=5, Segment::Champions),
];

/// Map a score pair to its segment
pub fn classify(key: RfmKey) -> Result<Segment> {
    RULES
        .iter()
        .find(|rule| rule.matches(key))
        .map(|rule| rule.segment)
        .ok_or(RfmError::UnclassifiedSegment {
            stage: Stage::Classify,
            recency_score: key.recency_score,
            frequency_score: key.frequency_score,
        })
}
