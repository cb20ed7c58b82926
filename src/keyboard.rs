use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

pub(crate) fn yes_no_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> = vec![vec![
        KeyboardButton::new("Yes✔️"),
        KeyboardButton::new("No❌"),
    ]];

    KeyboardMarkup::new(keyboard)
}

/// One button per option, callback data carrying the option index so
/// duplicate option texts stay unambiguous.
pub(crate) fn options_keyboard(options: &[String]) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            vec![InlineKeyboardButton::callback(
                option.clone(),
                format!("opt:{idx}"),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

pub(crate) fn next_keyboard(is_last: bool) -> InlineKeyboardMarkup {
    let label = if is_last { "Submit Quiz" } else { "Next Question" };

    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(label, "next")]])
}

pub(crate) fn retry_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Try again🔄",
        "retry",
    )]])
}

pub(crate) fn quizzes_keyboard(quizzes: &[String]) -> KeyboardMarkup {
    let keyboard = quizzes
        .iter()
        .map(|quiz| vec![KeyboardButton::new(quiz)]);

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn action_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new("Take a quiz📝")]])
}
