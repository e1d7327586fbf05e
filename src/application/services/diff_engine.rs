use crate::domain::entities::{ChangedSpan, DiffRecord, SizeClass, SpanKind};
use crate::domain::value_objects::ResourceId;
use crate::shared::config::DiffConfig;
use chrono::Utc;
use lru::LruCache;
use similar::{ChangeTag, TextDiff};
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Confidence-scored content diff engine.
///
/// Given the current content of a resource and the last observed
/// baseline, decides whether the change is meaningful enough to surface.
/// The baseline always advances, even when no record is produced, so the
/// next observation compares against the newest content. Internal
/// exceptional conditions degrade to "no diff produced"; this component
/// never fails outward.
pub struct DiffEngine {
    config: DiffConfig,
    baselines: Mutex<LruCache<ResourceId, String>>,
    history: Mutex<HashMap<ResourceId, VecDeque<DiffRecord>>>,
}

struct SpanBuilder {
    kind: SpanKind,
    text: String,
    index: usize,
}

impl DiffEngine {
    pub fn new(config: DiffConfig) -> Self {
        let capacity = NonZeroUsize::new(config.baseline_capacity.max(1))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            baselines: Mutex::new(LruCache::new(capacity)),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Diff `current` against the stored baseline for `id`, replacing the
    /// baseline with `current`. Returns `None` on first observation,
    /// byte-identical content, changes too large to characterize, or
    /// diffs below the confidence floor.
    pub fn generate_diff(&self, id: &ResourceId, current: &str) -> Option<DiffRecord> {
        let stored = lock(&self.baselines).put(id.clone(), current.to_string());
        self.score(id, stored.as_deref(), current)
    }

    /// Same as [`generate_diff`](Self::generate_diff), but an explicitly
    /// supplied previous version takes precedence over the stored
    /// baseline.
    pub fn generate_diff_against(
        &self,
        id: &ResourceId,
        current: &str,
        previous: Option<&str>,
    ) -> Option<DiffRecord> {
        let stored = lock(&self.baselines).put(id.clone(), current.to_string());
        let previous = previous.map(str::to_string).or(stored);
        self.score(id, previous.as_deref(), current)
    }

    /// Most recent diff records for a resource, oldest first.
    pub fn history(&self, id: &ResourceId) -> Vec<DiffRecord> {
        lock(&self.history)
            .get(id)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn score(&self, id: &ResourceId, previous: Option<&str>, current: &str) -> Option<DiffRecord> {
        let previous = previous?;
        if previous == current {
            return None;
        }

        let prev_tokens: Vec<&str> = previous.split_whitespace().collect();
        let cur_tokens: Vec<&str> = current.split_whitespace().collect();
        let change_ratio = Self::change_ratio(&prev_tokens, &cur_tokens);

        // Too large to characterize meaningfully. The baseline has already
        // advanced, so future diffs compare against the new content.
        if change_ratio > self.config.large_change_ratio {
            tracing::debug!(
                resource_id = %id,
                change_ratio,
                "Change too large to diff, accepting new baseline"
            );
            return None;
        }

        let (mut spans, added_units, removed_units) = self.collect_spans(previous, current);
        if change_ratio > self.config.capped_span_ratio && spans.len() > self.config.max_spans {
            spans.truncate(self.config.max_spans);
        }
        if spans.is_empty() {
            return None;
        }

        let count_factor =
            (1.0 - spans.len() as f64 / self.config.max_spans as f64).clamp(0.0, 1.0);
        let size_factor = Self::size_factor(added_units + removed_units);
        let confidence =
            (0.4 * (1.0 - change_ratio) + 0.3 * count_factor + 0.3 * size_factor).clamp(0.0, 1.0);

        if confidence < self.config.min_confidence {
            tracing::debug!(resource_id = %id, confidence, "Suppressing low-confidence diff");
            return None;
        }

        let record = DiffRecord {
            size_class: SizeClass::classify(spans.len()),
            spans,
            added_units,
            removed_units,
            change_ratio,
            confidence,
            computed_at: Utc::now(),
        };
        self.remember(id, record.clone());
        Some(record)
    }

    fn collect_spans(&self, previous: &str, current: &str) -> (Vec<ChangedSpan>, usize, usize) {
        let diff = TextDiff::from_words(previous, current);
        let mut spans = Vec::new();
        let mut builder: Option<SpanBuilder> = None;
        let mut added_units = 0usize;
        let mut removed_units = 0usize;
        let mut old_index = 0usize;
        let mut new_index = 0usize;

        for change in diff.iter_all_changes() {
            let value = change.value();
            let is_word = !value.trim().is_empty();
            match change.tag() {
                ChangeTag::Equal => {
                    if is_word {
                        self.flush(&mut builder, &mut spans);
                        old_index += 1;
                        new_index += 1;
                    } else if let Some(span) = builder.as_mut() {
                        // Shared whitespace between two changed words keeps
                        // the span text readable; it is trimmed on flush.
                        span.text.push_str(value);
                    }
                }
                ChangeTag::Delete => {
                    if is_word {
                        removed_units += 1;
                    }
                    match builder.as_mut() {
                        Some(span) if span.kind == SpanKind::Removed => span.text.push_str(value),
                        _ => {
                            self.flush(&mut builder, &mut spans);
                            builder = Some(SpanBuilder {
                                kind: SpanKind::Removed,
                                text: value.to_string(),
                                index: old_index,
                            });
                        }
                    }
                    if is_word {
                        old_index += 1;
                    }
                }
                ChangeTag::Insert => {
                    if is_word {
                        added_units += 1;
                    }
                    match builder.as_mut() {
                        Some(span) if span.kind == SpanKind::Added => span.text.push_str(value),
                        _ => {
                            self.flush(&mut builder, &mut spans);
                            builder = Some(SpanBuilder {
                                kind: SpanKind::Added,
                                text: value.to_string(),
                                index: new_index,
                            });
                        }
                    }
                    if is_word {
                        new_index += 1;
                    }
                }
            }
        }
        self.flush(&mut builder, &mut spans);

        (spans, added_units, removed_units)
    }

    /// Close the open span, dropping whitespace-only spans and overlong
    /// spans as noise.
    fn flush(&self, builder: &mut Option<SpanBuilder>, spans: &mut Vec<ChangedSpan>) {
        if let Some(span) = builder.take() {
            let trimmed = span.text.trim();
            if trimmed.is_empty() || trimmed.len() > self.config.max_span_units {
                return;
            }
            spans.push(ChangedSpan {
                kind: span.kind,
                text: trimmed.to_string(),
                index: span.index,
            });
        }
    }

    fn remember(&self, id: &ResourceId, record: DiffRecord) {
        let mut history = lock(&self.history);
        let records = history.entry(id.clone()).or_default();
        records.push_back(record);
        while records.len() > self.config.history_depth {
            records.pop_front();
        }
    }

    /// Normalized word-level edit distance, in [0, 1].
    fn change_ratio(prev: &[&str], cur: &[&str]) -> f64 {
        let max_len = prev.len().max(cur.len());
        if max_len == 0 {
            return 0.0;
        }
        Self::edit_distance(prev, cur) as f64 / max_len as f64
    }

    fn edit_distance(a: &[&str], b: &[&str]) -> usize {
        if a.is_empty() {
            return b.len();
        }
        if b.is_empty() {
            return a.len();
        }
        let mut prev_row: Vec<usize> = (0..=b.len()).collect();
        let mut row = vec![0usize; b.len() + 1];
        for (i, token_a) in a.iter().enumerate() {
            row[0] = i + 1;
            for (j, token_b) in b.iter().enumerate() {
                let cost = usize::from(token_a != token_b);
                row[j + 1] = (prev_row[j + 1] + 1)
                    .min(row[j] + 1)
                    .min(prev_row[j] + cost);
            }
            std::mem::swap(&mut prev_row, &mut row);
        }
        prev_row[b.len()]
    }

    /// Favors a moderate amount of change over either none or very many.
    fn size_factor(total_units: usize) -> f64 {
        match total_units {
            0 => 0.0,
            1..=3 => 0.6,
            4..=40 => 1.0,
            41..=120 => 0.6,
            _ => 0.3,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::EngineConfig;

    fn engine() -> DiffEngine {
        DiffEngine::new(EngineConfig::default().diff)
    }

    fn id(value: &str) -> ResourceId {
        ResourceId::parse(value).unwrap()
    }

    #[test]
    fn first_observation_sets_baseline_and_returns_none() {
        let engine = engine();
        assert!(engine.generate_diff(&id("note-1"), "hello world").is_none());
        // A subsequent small change now has a baseline to diff against.
        assert!(engine
            .generate_diff(&id("note-1"), "hello brave world")
            .is_some());
    }

    #[test]
    fn identical_content_produces_nothing() {
        let engine = engine();
        engine.generate_diff(&id("note-1"), "same text here today");
        assert!(engine
            .generate_diff(&id("note-1"), "same text here today")
            .is_none());
        assert!(engine.history(&id("note-1")).is_empty());
    }

    #[test]
    fn single_word_removal_is_small_and_confident() {
        let engine = engine();
        let record = engine
            .generate_diff_against(
                &id("note-1"),
                "The quick brown fox",
                Some("The quick brown fox jumps"),
            )
            .expect("diff expected");

        assert_eq!(record.size_class, SizeClass::Small);
        assert!(record.confidence > 0.3);
        assert_eq!(record.removed_units, 1);
        assert_eq!(record.added_units, 0);
        assert_eq!(record.spans.len(), 1);
        assert_eq!(record.spans[0].kind, SpanKind::Removed);
        assert_eq!(record.spans[0].text, "jumps");
    }

    #[test]
    fn ratio_and_confidence_stay_in_unit_interval() {
        let engine = engine();
        let cases = [
            ("alpha beta gamma", "alpha beta gamma delta"),
            ("one two three four five", "one two six four seven"),
            ("short", "short text grows a little here"),
        ];
        for (previous, current) in cases {
            if let Some(record) =
                engine.generate_diff_against(&id("note-r"), current, Some(previous))
            {
                assert!((0.0..=1.0).contains(&record.change_ratio));
                assert!((0.0..=1.0).contains(&record.confidence));
                // Anything below the floor must have been suppressed.
                assert!(record.confidence >= 0.3);
            }
        }
    }

    #[test]
    fn rewrites_are_accepted_as_baseline_but_not_characterized() {
        let engine = engine();
        engine.generate_diff(&id("note-1"), "alpha beta gamma delta");
        assert!(engine
            .generate_diff(&id("note-1"), "entirely unrelated replacement body text")
            .is_none());

        // The rewrite became the baseline: a small edit on top of it diffs.
        let record = engine
            .generate_diff(&id("note-1"), "entirely unrelated replacement body text now")
            .expect("diff against new baseline");
        assert_eq!(record.added_units, 1);
    }

    #[test]
    fn whitespace_only_changes_are_noise() {
        let engine = engine();
        engine.generate_diff(&id("note-1"), "alpha beta  gamma");
        assert!(engine
            .generate_diff(&id("note-1"), "alpha  beta gamma")
            .is_none());
    }

    #[test]
    fn span_count_is_capped_for_heavy_edits() {
        let mut config = EngineConfig::default().diff;
        config.min_confidence = 0.0;
        let engine = DiffEngine::new(config);

        // Change two of every three words: ratio ~0.66, well past the
        // capping threshold, with far more than 50 raw spans.
        let previous: Vec<String> = (0..120).map(|i| format!("w{i}")).collect();
        let mut current = previous.clone();
        for (i, token) in current.iter_mut().enumerate() {
            if i % 3 != 0 {
                *token = format!("x{i}");
            }
        }
        let record = engine
            .generate_diff_against(
                &id("note-1"),
                &current.join(" "),
                Some(&previous.join(" ")),
            )
            .expect("capped diff expected");
        assert!(record.change_ratio > 0.5 && record.change_ratio <= 0.8);
        assert_eq!(record.spans.len(), 50);
    }

    #[test]
    fn history_keeps_five_most_recent_records() {
        let engine = engine();
        let note = id("note-1");
        let mut content = String::from("base words for the history test");
        engine.generate_diff(&note, &content);
        for i in 0..7 {
            content.push_str(&format!(" extra{i}"));
            engine.generate_diff(&note, &content);
        }
        assert_eq!(engine.history(&note).len(), 5);
    }
}
