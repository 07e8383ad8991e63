// File: wardenbot-common/src/models/message.rs

use serde::{Deserialize, Serialize};

/// Inline keyboard attached to an outbound message. Button presses come back
/// to the core as `answer_callback` events carrying the button's
/// `callback_data`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct KeyboardButton {
    pub label: String,
    pub callback_data: String,
}

impl Keyboard {
    pub fn single_row(buttons: Vec<KeyboardButton>) -> Self {
        Self { rows: vec![buttons] }
    }
}

impl KeyboardButton {
    pub fn new(label: &str, callback_data: &str) -> Self {
        Self {
            label: label.to_string(),
            callback_data: callback_data.to_string(),
        }
    }
}
