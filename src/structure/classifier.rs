//! Heading classification by font size.
//!
//! Classification is a pure function of a run and a [`FontSizeStats`]
//! computed once over the whole document, so every page is judged against
//! the same thresholds regardless of processing order.

use crate::convert::options::HeadingOptions;
use crate::model::{Level, TextRun};

/// A cluster of font sizes closer than the configured epsilon.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeTier {
    /// Smallest size in the tier
    pub min: f32,
    /// Largest size in the tier
    pub max: f32,
    /// Non-whitespace characters set in this tier
    pub chars: usize,
}

/// Document-wide font size distribution.
#[derive(Debug, Clone, Default)]
pub struct FontSizeStats {
    /// Tiers in ascending size order
    tiers: Vec<SizeTier>,
    /// Index of the body text tier
    body: Option<usize>,
    epsilon: f32,
}

impl FontSizeStats {
    /// Compute the distribution over all runs of a document.
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a TextRun>, epsilon: f32) -> Self {
        // (size in 1/100 pt, chars)
        let mut sizes: Vec<(i64, usize)> = Vec::new();
        for run in runs {
            if run.is_blank() || !run.font_size.is_finite() {
                continue;
            }
            let key = (run.font_size * 100.0).round() as i64;
            match sizes.iter_mut().find(|(k, _)| *k == key) {
                Some((_, chars)) => *chars += run.char_count(),
                None => sizes.push((key, run.char_count())),
            }
        }
        sizes.sort_by_key(|(k, _)| *k);

        let mut tiers: Vec<SizeTier> = Vec::new();
        for (key, chars) in sizes {
            let size = key as f32 / 100.0;
            match tiers.last_mut() {
                Some(tier) if size - tier.max <= epsilon => {
                    tier.max = size;
                    tier.chars += chars;
                }
                _ => tiers.push(SizeTier {
                    min: size,
                    max: size,
                    chars,
                }),
            }
        }

        // Most characters wins; on ties the smaller tier (earlier) stays.
        let mut body: Option<usize> = None;
        for (i, tier) in tiers.iter().enumerate() {
            if body.map_or(true, |b| tier.chars > tiers[b].chars) {
                body = Some(i);
            }
        }

        log::debug!(
            "Font size tiers: {:?}, body tier: {:?}",
            tiers.iter().map(|t| (t.min, t.max, t.chars)).collect::<Vec<_>>(),
            body
        );

        Self {
            tiers,
            body,
            epsilon,
        }
    }

    pub fn tiers(&self) -> &[SizeTier] {
        &self.tiers
    }

    /// The tier carrying the most text.
    pub fn body_tier(&self) -> Option<&SizeTier> {
        self.body.map(|b| &self.tiers[b])
    }

    /// Number of tiers larger than the body tier.
    pub fn heading_tier_count(&self) -> usize {
        self.body.map_or(0, |b| self.tiers.len() - b - 1)
    }

    /// Tier index of a size.
    fn tier_of(&self, size: f32) -> Option<usize> {
        self.tiers
            .iter()
            .position(|t| size >= t.min - self.epsilon && size <= t.max + self.epsilon)
    }

    /// Rank among heading tiers (0 = largest), `None` for body and smaller.
    pub fn heading_rank(&self, size: f32) -> Option<usize> {
        let body = self.body?;
        let tier = self.tier_of(size)?;
        (tier > body).then(|| self.tiers.len() - 1 - tier)
    }

    /// Whether the size belongs to the body tier.
    pub fn is_body_size(&self, size: f32) -> bool {
        self.body.is_some() && self.tier_of(size) == self.body
    }
}

/// Maps text runs to structural levels.
#[derive(Debug, Clone)]
pub struct HeadingClassifier {
    stats: FontSizeStats,
    options: HeadingOptions,
}

impl HeadingClassifier {
    pub fn new(stats: FontSizeStats, options: HeadingOptions) -> Self {
        Self { stats, options }
    }

    pub fn stats(&self) -> &FontSizeStats {
        &self.stats
    }

    /// Level of a run. Blank runs are Paragraph; callers drop them anyway.
    pub fn classify(&self, run: &TextRun) -> Level {
        if run.is_blank() || self.stats.heading_tier_count() == 0 {
            return Level::Paragraph;
        }

        let rank = self.stats.heading_rank(run.font_size);
        let by_size = rank.map_or(Level::Paragraph, |r| self.level_for_rank(r));

        if by_size == Level::Paragraph && self.is_bold_heading(run, rank.is_some()) {
            return by_size.promoted();
        }
        by_size
    }

    fn level_for_rank(&self, rank: usize) -> Level {
        let o = &self.options;
        if rank < o.title_tiers {
            Level::Title
        } else if rank < o.title_tiers + o.section_tiers {
            Level::Section
        } else if rank < o.title_tiers + o.section_tiers + o.subsection_tiers {
            Level::Subsection
        } else {
            Level::Paragraph
        }
    }

    /// Short bold text at body size (or in a heading tier past the cutoffs)
    /// reads as a heading.
    fn is_bold_heading(&self, run: &TextRun, in_heading_tier: bool) -> bool {
        run.is_bold()
            && (in_heading_tier || self.stats.is_body_size(run.font_size))
            && run.word_count() <= self.options.bold_heading_max_words
    }
}
