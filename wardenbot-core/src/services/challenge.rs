// File: wardenbot-core/src/services/challenge.rs

use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use wardenbot_common::models::message::{Keyboard, KeyboardButton};
use wardenbot_common::models::policy::{ChallengeType, VerificationPolicy};
use wardenbot_common::models::verification::ChallengePayload;

/// Alphanumeric charset with the visually confusable characters
/// (0/O, 1/I/L) removed.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 4;

/// Fixed media-caption table: (media reference, correct answer).
const MEDIA_TABLE: &[(&str, &str)] = &[
    ("media/captcha-cat.png", "cat"),
    ("media/captcha-dog.png", "dog"),
    ("media/captcha-fish.png", "fish"),
    ("media/captcha-bird.png", "bird"),
];

/// Callback-token prefix for answer buttons; the transport hands the token
/// back verbatim in `answer_callback` events.
pub const CALLBACK_PREFIX: &str = "verify";

pub fn callback_token(verification_id: Uuid, answer: &str) -> String {
    format!("{}:{}:{}", CALLBACK_PREFIX, verification_id, answer)
}

pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

pub fn generate_arithmetic() -> (String, i64) {
    let mut rng = rand::rng();
    let a: i64 = rng.random_range(1..=9);
    let b: i64 = rng.random_range(1..=9);
    if rng.random_bool(0.5) {
        (format!("{} + {}", a, b), a + b)
    } else {
        // Minuend first so the answer is never negative.
        let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
        (format!("{} - {}", hi, lo), hi - lo)
    }
}

pub fn generate_media_caption() -> (String, String) {
    let mut rng = rand::rng();
    let (media_ref, answer) = MEDIA_TABLE[rng.random_range(0..MEDIA_TABLE.len())];
    (media_ref.to_string(), answer.to_string())
}

/// Builds the type-specific challenge payload for a room's policy.
pub fn generate_payload(policy: &VerificationPolicy) -> ChallengePayload {
    match policy.challenge_type {
        ChallengeType::Membership => ChallengePayload::Membership {
            channel_ref: policy.membership_channel.clone().unwrap_or_default(),
        },
        ChallengeType::Code => ChallengePayload::Code {
            code: generate_code(),
        },
        ChallengeType::Arithmetic => {
            let (question, answer) = generate_arithmetic();
            ChallengePayload::Arithmetic { question, answer }
        }
        ChallengeType::MediaCaption => {
            let (media_ref, answer) = generate_media_caption();
            ChallengePayload::MediaCaption { media_ref, answer }
        }
        ChallengeType::Deferred => ChallengePayload::Deferred,
    }
}

/// Member-facing challenge prompt for a payload. `Deferred` has no prompt.
pub fn prompt_for(payload: &ChallengePayload) -> Option<String> {
    match payload {
        ChallengePayload::Membership { channel_ref } => Some(format!(
            "To unlock posting, join {} and press the button below.",
            channel_ref
        )),
        ChallengePayload::Code { code } => Some(format!(
            "To unlock posting, reply with this code: {}",
            code
        )),
        ChallengePayload::Arithmetic { question, .. } => Some(format!(
            "To unlock posting, answer: what is {}?",
            question
        )),
        ChallengePayload::MediaCaption { media_ref, .. } => Some(format!(
            "To unlock posting, name what you see in {} using the buttons below.",
            media_ref
        )),
        ChallengePayload::Deferred => None,
    }
}

/// Inline answer keyboard for payloads that use buttons. Code challenges are
/// answered by typing; membership uses a single probe button.
pub fn keyboard_for(verification_id: Uuid, payload: &ChallengePayload) -> Option<Keyboard> {
    let mut rng = rand::rng();
    match payload {
        ChallengePayload::Membership { .. } => Some(Keyboard::single_row(vec![
            KeyboardButton::new("I have joined", &callback_token(verification_id, "check")),
        ])),
        ChallengePayload::Arithmetic { answer, .. } => {
            let mut options = vec![*answer];
            while options.len() < 4 {
                let decoy = answer + rng.random_range(-4..=4);
                if decoy >= 0 && !options.contains(&decoy) {
                    options.push(decoy);
                }
            }
            options.shuffle(&mut rng);
            let buttons = options
                .iter()
                .map(|v| {
                    KeyboardButton::new(
                        &v.to_string(),
                        &callback_token(verification_id, &v.to_string()),
                    )
                })
                .collect();
            Some(Keyboard::single_row(buttons))
        }
        ChallengePayload::MediaCaption { .. } => {
            let mut captions: Vec<&str> = MEDIA_TABLE.iter().map(|(_, c)| *c).collect();
            captions.shuffle(&mut rng);
            let buttons = captions
                .iter()
                .map(|c| KeyboardButton::new(c, &callback_token(verification_id, c)))
                .collect();
            Some(Keyboard::single_row(buttons))
        }
        ChallengePayload::Code { .. } | ChallengePayload::Deferred => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_uses_unambiguous_charset() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            for ch in code.bytes() {
                assert!(CODE_CHARSET.contains(&ch), "unexpected char {}", ch as char);
                assert!(!b"0O1IL".contains(&ch));
            }
        }
    }

    #[test]
    fn arithmetic_answers_are_consistent() {
        for _ in 0..50 {
            let (question, answer) = generate_arithmetic();
            let parts: Vec<&str> = question.split_whitespace().collect();
            let a: i64 = parts[0].parse().unwrap();
            let b: i64 = parts[2].parse().unwrap();
            let expected = if parts[1] == "+" { a + b } else { a - b };
            assert_eq!(answer, expected);
            assert!(answer >= 0);
        }
    }
}
