// wardenbot-core/tests/auto_reply_tests.rs

use wardenbot_core::services::auto_reply_service::AutoReplyService;
use wardenbot_common::models::auto_reply::{AutoReplyRule, MatchMode};

fn rule(keyword: &str, mode: MatchMode, weight: u32) -> AutoReplyRule {
    let mut r = AutoReplyRule::text(keyword, mode, "reply");
    r.weight = weight;
    r
}

#[test]
fn no_candidates_returns_none() {
    let svc = AutoReplyService::new();
    let rules = vec![rule("price", MatchMode::Contains, 1)];
    assert!(svc.match_rule("hello there", &rules).is_none());
    assert!(svc.match_rule("anything", &[]).is_none());
}

#[test]
fn single_candidate_is_returned_directly() {
    let svc = AutoReplyService::new();
    let rules = vec![
        rule("price", MatchMode::Contains, 1),
        rule("shipping", MatchMode::Contains, 5),
    ];
    let hit = svc.match_rule("what is the PRICE?", &rules).unwrap();
    assert_eq!(hit.keyword, "price");
}

#[test]
fn match_modes_compare_lowercased_text() {
    let svc = AutoReplyService::new();

    let prefix = vec![rule("hello", MatchMode::Prefix, 1)];
    assert!(svc.match_rule("Hello world", &prefix).is_some());
    assert!(svc.match_rule("say Hello", &prefix).is_none());

    let suffix = vec![rule("bye", MatchMode::Suffix, 1)];
    assert!(svc.match_rule("ok BYE", &suffix).is_some());
    assert!(svc.match_rule("bye now", &suffix).is_none());

    let exact = vec![rule("gm", MatchMode::Exact, 1)];
    assert!(svc.match_rule("GM", &exact).is_some());
    assert!(svc.match_rule("GM all", &exact).is_none());
}

#[test]
fn regex_mode_is_case_insensitive_over_raw_text() {
    let svc = AutoReplyService::new();
    let rules = vec![rule(r"\bhelp\b", MatchMode::Regex, 1)];
    assert!(svc.match_rule("I need HELP please", &rules).is_some());
    assert!(svc.match_rule("helpful", &rules).is_none());
}

#[test]
fn invalid_regex_never_matches() {
    let svc = AutoReplyService::new();
    let rules = vec![rule("(unclosed", MatchMode::Regex, 1)];
    assert!(svc.match_rule("(unclosed", &rules).is_none());
}

#[test]
fn weighted_selection_approaches_the_weight_ratio() {
    let svc = AutoReplyService::new();
    let rules = vec![
        rule("hi", MatchMode::Contains, 1),
        rule("hi there", MatchMode::Contains, 3),
    ];

    const TRIALS: usize = 20_000;
    let mut heavy_picks = 0usize;
    for _ in 0..TRIALS {
        let hit = svc.match_rule("hi there friend", &rules).unwrap();
        if hit.weight == 3 {
            heavy_picks += 1;
        }
    }

    // Expect ~75% for the weight-3 rule; allow a generous band.
    let share = heavy_picks as f64 / TRIALS as f64;
    assert!(
        (0.70..0.80).contains(&share),
        "weight-3 rule selected {:.3} of the time",
        share
    );
}

#[test]
fn selection_covers_every_candidate_eventually() {
    let svc = AutoReplyService::new();
    let rules = vec![
        rule("a", MatchMode::Contains, 1),
        rule("ab", MatchMode::Contains, 1),
        rule("abc", MatchMode::Contains, 1),
    ];

    let mut seen = [false; 3];
    for _ in 0..2_000 {
        let hit = svc.match_rule("abc", &rules).unwrap();
        match hit.keyword.as_str() {
            "a" => seen[0] = true,
            "ab" => seen[1] = true,
            "abc" => seen[2] = true,
            _ => unreachable!(),
        }
    }
    assert!(seen.iter().all(|s| *s), "all equal-weight rules reachable");
}
