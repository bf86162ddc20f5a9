//! Field merge primitives shared by every metadata source.
//!
//! Scalar fields use [`select`] (first non-blank wins) or [`select_longer`]
//! (longest non-blank wins); list fields use [`append_unique`] and
//! [`extend_unique`], which keep first-seen order.

use tracing::warn;

/// Returns true if the value is absent or only whitespace
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}

/// Picks `main` unless it is blank, in which case `secondary` is returned.
///
/// Two non-blank values that disagree are reported but never fatal; `main`
/// still wins.
pub fn select(main: Option<String>, secondary: Option<String>) -> Option<String> {
    if let (Some(a), Some(b)) = (main.as_deref(), secondary.as_deref()) {
        if !is_blank(Some(a)) && !is_blank(Some(b)) && a != b {
            warn!("Mismatch! {} =/= {}", a, b);
        }
    }

    if is_blank(main.as_deref()) {
        secondary
    } else {
        main
    }
}

/// Like [`select`], but when both values are non-blank and different the
/// strictly longer one wins. Equal lengths keep `main`.
pub fn select_longer(main: Option<String>, secondary: Option<String>) -> Option<String> {
    match (main, secondary) {
        (Some(a), Some(b)) if !is_blank(Some(&a)) && !is_blank(Some(&b)) && a != b => {
            if b.len() > a.len() {
                Some(b)
            } else {
                Some(a)
            }
        }
        (main, secondary) => {
            if is_blank(main.as_deref()) {
                secondary
            } else {
                main
            }
        }
    }
}

/// Appends `item` unless an equal element is already present
pub fn append_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Appends every item not already present, in iteration order
pub fn extend_unique<T: PartialEq>(list: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        append_unique(list, item);
    }
}
