use serde::Serialize;

use crate::model::Attachment;

/// Classification bucket for one attachment. Exactly one applies; the rule
/// is ordered and first-match-wins:
///
/// 1. non-empty alt text -> Good, regardless of the decorative flag;
/// 2. empty alt text, not decorative -> Bad;
/// 3. empty alt text, decorative -> Decorative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Good,
    Bad,
    Decorative,
}

pub fn classify(attachment: &Attachment) -> Bucket {
    if !attachment.alt_text.is_empty() {
        Bucket::Good
    } else if !attachment.decorative {
        Bucket::Bad
    } else {
        Bucket::Decorative
    }
}

/// The three buckets, each preserving the input order of its members.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifiedBuckets {
    pub good: Vec<Attachment>,
    pub bad: Vec<Attachment>,
    pub decorative: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total: usize,
    pub good_count: usize,
    pub bad_count: usize,
    pub decorative_count: usize,
    pub good_pct: f64,
    pub bad_pct: f64,
    pub decorative_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AltReport {
    pub classified: ClassifiedBuckets,
    pub stats: CoverageStats,
}

/// Partitions the attachments and computes coverage in one pass. Pure;
/// recomputed from scratch on every render.
pub fn build_report(attachments: Vec<Attachment>) -> AltReport {
    let total = attachments.len();
    let mut classified = ClassifiedBuckets::default();

    for attachment in attachments {
        match classify(&attachment) {
            Bucket::Good => classified.good.push(attachment),
            Bucket::Bad => classified.bad.push(attachment),
            Bucket::Decorative => classified.decorative.push(attachment),
        }
    }

    let stats = CoverageStats {
        total,
        good_count: classified.good.len(),
        bad_count: classified.bad.len(),
        decorative_count: classified.decorative.len(),
        good_pct: pct(classified.good.len(), total),
        bad_pct: pct(classified.bad.len(), total),
        decorative_pct: pct(classified.decorative.len(), total),
    };

    AltReport { classified, stats }
}

/// Share of `count` in `total` as a percentage, rounded half-up to two
/// decimal places. An empty total yields 0, not a division error.
pub fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = 100.0 * count as f64 / total as f64;
    (ratio * 100.0).round() / 100.0
}
