use std::borrow::Cow;

/// Pluralizes a piece of text.
pub fn pluralize(base: &str, count: usize) -> Cow<'_, str> {
    if count == 1 {
        base.into()
    } else {
        format!("{base}s").into()
    }
}
