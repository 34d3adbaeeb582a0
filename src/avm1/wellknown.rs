//! Canonical action snippets that run without analysis
//!
//! Timelines are full of frame scripts that are nothing but `stop();` or
//! `play();`. Those are matched once and then executed directly.

use super::actions::{Action, ActionsData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnown {
    Empty,
    Stop,
    Play,
}

/// Actions with the end marker stripped.
fn significant(actions: &[Action]) -> &[Action] {
    match actions.split_last() {
        Some((Action::End, rest)) => rest,
        _ => actions,
    }
}

pub fn find_wellknown(data: &ActionsData) -> Option<WellKnown> {
    match significant(&data.actions) {
        [] => Some(WellKnown::Empty),
        [Action::Stop] => Some(WellKnown::Stop),
        [Action::Play] => Some(WellKnown::Play),
        _ => None,
    }
}

/// Cached lookup; the match is computed once per blob.
pub fn wellknown_of(data: &ActionsData) -> Option<WellKnown> {
    *data.wellknown.get_or_init(|| find_wellknown(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_canonical_snippets() {
        assert_eq!(find_wellknown(&ActionsData::new(vec![])), Some(WellKnown::Empty));
        assert_eq!(
            find_wellknown(&ActionsData::new(vec![Action::Stop, Action::End])),
            Some(WellKnown::Stop)
        );
        assert_eq!(find_wellknown(&ActionsData::new(vec![Action::Play])), Some(WellKnown::Play));
        assert_eq!(
            find_wellknown(&ActionsData::new(vec![Action::Play, Action::Stop])),
            None
        );
    }
}
