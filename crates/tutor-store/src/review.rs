//! Review scheduling — pure functions, no persistence.

use chrono::{DateTime, Duration, Utc};

use crate::types::Word;

/// Days until the next review, indexed by how many reviews are done.
pub const REVIEW_INTERVALS: [i64; 5] = [1, 2, 4, 7, 15];

/// Days between reviews once a word is past the interval table.
pub const MONTHLY_INTERVAL: i64 = 30;

/// Compute the next review date from the last review and the review count.
pub fn next_review_date(last_reviewed: DateTime<Utc>, review_count: usize) -> DateTime<Utc> {
    let days = REVIEW_INTERVALS
        .get(review_count)
        .copied()
        .unwrap_or(MONTHLY_INTERVAL);
    last_reviewed + Duration::days(days)
}

/// Words whose `next_review` is set and due (inclusive at `now`).
pub fn words_due_for_review(words: &[Word], now: DateTime<Utc>) -> Vec<Word> {
    words
        .iter()
        .filter(|w| w.next_review.is_some_and(|next| next <= now))
        .cloned()
        .collect()
}

/// Stamp a word as reviewed at `reviewed_at` and schedule its next review.
pub fn mark_word_reviewed(word: &Word, reviewed_at: DateTime<Utc>) -> Word {
    let mut reviewed = word.clone();
    reviewed.last_reviewed = Some(reviewed_at);
    reviewed.next_review = Some(next_review_date(reviewed_at, word.review_count as usize));
    reviewed.review_count = word.review_count + 1;
    reviewed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_interval_table_literals() {
        let base = day(2024, 1, 1);
        assert_eq!(next_review_date(base, 0), day(2024, 1, 2));
        assert_eq!(next_review_date(base, 1), day(2024, 1, 3));
        assert_eq!(next_review_date(base, 2), day(2024, 1, 5));
        assert_eq!(next_review_date(base, 3), day(2024, 1, 8));
        assert_eq!(next_review_date(base, 4), day(2024, 1, 16));
    }

    #[test]
    fn test_monthly_fallback_past_table_end() {
        let base = day(2024, 1, 1);
        assert_eq!(next_review_date(base, 5), day(2024, 1, 31));
        assert_eq!(next_review_date(base, 17), day(2024, 1, 31));
    }

    #[test]
    fn test_interval_law_for_all_counts() {
        let base = day(2024, 3, 10);
        for count in 0..40usize {
            let expected_days = if count < REVIEW_INTERVALS.len() {
                REVIEW_INTERVALS[count]
            } else {
                MONTHLY_INTERVAL
            };
            assert_eq!(
                next_review_date(base, count),
                base + Duration::days(expected_days),
                "count={count}"
            );
        }
    }

    #[test]
    fn test_due_filter_boundaries() {
        let now = day(2024, 6, 15);

        let mut unscheduled = Word::new(1, "a");
        unscheduled.next_review = None;

        let mut due_exactly = Word::new(2, "b");
        due_exactly.next_review = Some(now);

        let mut overdue = Word::new(3, "c");
        overdue.next_review = Some(now - Duration::days(3));

        let mut future = Word::new(4, "d");
        future.next_review = Some(now + Duration::seconds(1));

        let due = words_due_for_review(&[unscheduled, due_exactly, overdue, future], now);
        let idxs: Vec<i64> = due.iter().map(|w| w.idx).collect();
        assert_eq!(idxs, vec![2, 3]);
    }

    #[test]
    fn test_mark_word_reviewed_advances_schedule() {
        let mut word = Word::new(1, "hello");
        word.review_count = 2;

        let reviewed_at = day(2024, 2, 1);
        let reviewed = mark_word_reviewed(&word, reviewed_at);

        assert_eq!(reviewed.last_reviewed, Some(reviewed_at));
        assert_eq!(reviewed.next_review, Some(day(2024, 2, 5)));
        assert_eq!(reviewed.review_count, 3);
        // Original is untouched
        assert_eq!(word.review_count, 2);
    }
}
