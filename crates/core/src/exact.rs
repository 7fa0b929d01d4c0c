use crate::normalize::normalize_text;

/// 1 if the trimmed strings are identical, else 0. An empty prediction is 0.
#[must_use]
pub fn exact_match(target: &str, prediction: &str) -> u8 {
    if prediction.is_empty() {
        return 0;
    }
    u8::from(prediction.trim() == target.trim())
}

/// Like [`exact_match`], but compares [`normalize_text`] forms.
#[must_use]
pub fn quasi_exact_match(target: &str, prediction: &str) -> u8 {
    if prediction.is_empty() {
        return 0;
    }
    u8::from(normalize_text(target) == normalize_text(prediction))
}
