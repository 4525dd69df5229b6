//! Feed and explore ranking
//!
//! Feed algorithm (gravity decay with relationship boost):
//! - age_hours = max(0.1, age in hours)
//! - engagement = likes + comments * 2
//! - base = (engagement + 1) / (age_hours + 2)^1.8
//! - x1.5 when the author is followed by, or is, the viewer
//!
//! Explore algorithm (viral velocity, no relationship boost):
//! - score = (distinct_likers + comments * 2 + 1)^1.2 / (age_hours + 1)
//!
//! Both rankers dedupe by item id (first occurrence wins) and sort stably by
//! score descending, so ties keep their input order.

use crate::models::{ContentItem, FeedCandidate};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

const MIN_AGE_HOURS: f64 = 0.1;
const GRAVITY: f64 = 1.8;
const FEED_AGE_OFFSET: f64 = 2.0;
const RELATIONSHIP_BOOST: f64 = 1.5;
const VIRAL_EXPONENT: f64 = 1.2;
const EXPLORE_AGE_OFFSET: f64 = 1.0;
const COMMENT_WEIGHT: f64 = 2.0;

/// Item age in fractional hours, floored at 0.1
pub fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds() as f64;
    (millis / 3_600_000.0).max(MIN_AGE_HOURS)
}

pub fn engagement(likes: usize, comments: usize) -> f64 {
    likes as f64 + comments as f64 * COMMENT_WEIGHT
}

/// Gravity-decay feed score
pub fn feed_score(item: &ContentItem, boosted: bool, now: DateTime<Utc>) -> f64 {
    let age = age_hours(item.created_at, now);
    let base = (engagement(item.like_count(), item.comment_count()) + 1.0)
        / (age + FEED_AGE_OFFSET).powf(GRAVITY);

    if boosted {
        base * RELATIONSHIP_BOOST
    } else {
        base
    }
}

/// Viral-velocity explore score
pub fn explore_score(item: &ContentItem, now: DateTime<Utc>) -> f64 {
    let age = age_hours(item.created_at, now);
    let points = engagement(item.distinct_likers(), item.comment_count()) + 1.0;

    points.powf(VIRAL_EXPONENT) / (age + EXPLORE_AGE_OFFSET).powf(1.0)
}

/// Remove repeated ids, keeping the first occurrence
pub fn dedupe(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Rank feed candidates for a viewer
///
/// # Arguments
/// * `items` - Personal pool followed by suggested pool, in that order
/// * `following` - Authors the viewer follows
/// * `viewer_id` - The requesting user; their own items are boosted too
/// * `now` - Reference time for decay
pub fn rank(
    items: Vec<ContentItem>,
    following: &HashSet<String>,
    viewer_id: &str,
    now: DateTime<Utc>,
) -> Vec<FeedCandidate> {
    let candidates = dedupe(items)
        .into_iter()
        .map(|item| {
            let from_following = following.contains(&item.author.id) || item.author.id == viewer_id;
            let score = feed_score(&item, from_following, now);
            FeedCandidate {
                item,
                score,
                from_following,
            }
        })
        .collect();

    let ranked = sort_by_score(candidates);
    debug!(viewer_id = %viewer_id, count = ranked.len(), "Feed ranking applied");
    ranked
}

/// Rank explore candidates; nothing is marked as followed
pub fn rank_explore(items: Vec<ContentItem>, now: DateTime<Utc>) -> Vec<FeedCandidate> {
    let candidates = dedupe(items)
        .into_iter()
        .map(|item| {
            let score = explore_score(&item, now);
            FeedCandidate {
                item,
                score,
                from_following: false,
            }
        })
        .collect();

    sort_by_score(candidates)
}

fn sort_by_score(mut candidates: Vec<FeedCandidate>) -> Vec<FeedCandidate> {
    // sort_by is stable: equal scores keep insertion order
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}
