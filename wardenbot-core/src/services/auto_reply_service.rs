// File: wardenbot-core/src/services/auto_reply_service.rs

use rand::Rng;
use regex::RegexBuilder;
use tracing::warn;

use wardenbot_common::models::auto_reply::{AutoReplyRule, MatchMode};

/// Selects at most one auto-reply rule for a message from a room's rule set.
pub struct AutoReplyService;

impl AutoReplyService {
    pub fn new() -> Self {
        Self
    }

    /// Returns the rule to fire, or None. With multiple matching rules the
    /// pick is weighted-random: each candidate is chosen with probability
    /// weight / total, independent of iteration order.
    pub fn match_rule<'a>(
        &self,
        text: &str,
        rules: &'a [AutoReplyRule],
    ) -> Option<&'a AutoReplyRule> {
        let lowered = text.to_lowercase();
        let mut candidates: Vec<&AutoReplyRule> = rules
            .iter()
            .filter(|r| rule_matches(r, text, &lowered))
            .collect();

        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => {
                // Deterministic iteration order (descending weight, then
                // ascending usage count); the draw below is what decides.
                candidates.sort_by(|a, b| {
                    b.weight
                        .cmp(&a.weight)
                        .then(a.usage_count.cmp(&b.usage_count))
                });

                let total: u64 = candidates.iter().map(|r| u64::from(r.weight.max(1))).sum();
                let mut remainder = rand::rng().random_range(0.0..total as f64);
                for candidate in &candidates {
                    remainder -= f64::from(candidate.weight.max(1));
                    if remainder <= 0.0 {
                        return Some(candidate);
                    }
                }
                candidates.last().copied()
            }
        }
    }
}

impl Default for AutoReplyService {
    fn default() -> Self {
        Self::new()
    }
}

fn rule_matches(rule: &AutoReplyRule, raw: &str, lowered: &str) -> bool {
    match rule.match_mode {
        MatchMode::Exact => lowered == rule.keyword.to_lowercase(),
        MatchMode::Contains => lowered.contains(&rule.keyword.to_lowercase()),
        MatchMode::Prefix => lowered.starts_with(&rule.keyword.to_lowercase()),
        MatchMode::Suffix => lowered.ends_with(&rule.keyword.to_lowercase()),
        MatchMode::Regex => match RegexBuilder::new(&rule.keyword)
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re.is_match(raw),
            Err(e) => {
                warn!("invalid auto-reply pattern '{}': {}", rule.keyword, e);
                false
            }
        },
    }
}
