//! Attribute merge policies shared by every item kind.
//!
//! * preserve-left: the left value stays unless it is unset.
//! * adopt-right: the right value wins whenever it is set.
//! * immutable: any difference is a hard error.
//! * ordered union: left entries in order, then right-only entries in
//!   right's order.

use super::MergeError;

/// Keeps a non-empty left string, otherwise takes the right one.
pub fn preserve_left(left: &mut String, right: &str) {
    if left.is_empty() && !right.is_empty() {
        *left = right.to_string();
    }
}

/// Keeps a set left value, otherwise takes the right one.
pub fn preserve_left_option<T: Clone>(left: &mut Option<T>, right: &Option<T>) {
    if left.is_none() {
        *left = right.clone();
    }
}

/// Takes the right value unconditionally.
pub fn adopt_right<T: Clone>(left: &mut T, right: &T) {
    *left = right.clone();
}

/// Takes the right value when it is set.
pub fn adopt_right_option<T: Clone>(left: &mut Option<T>, right: &Option<T>) {
    if right.is_some() {
        *left = right.clone();
    }
}

/// Fails with `on_change` when the two values differ.
pub fn immutable<T, F>(left: &T, right: &T, on_change: F) -> Result<(), MergeError>
where
    T: PartialEq + ?Sized,
    F: FnOnce() -> MergeError,
{
    if left == right {
        Ok(())
    } else {
        Err(on_change())
    }
}

/// Appends every right entry that has no `same` counterpart in `left`.
pub fn ordered_union<T, F>(left: &mut Vec<T>, right: &[T], mut same: F)
where
    T: Clone,
    F: FnMut(&T, &T) -> bool,
{
    for r in right {
        if !left.iter().any(|l| same(l, r)) {
            left.push(r.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GraphError;

    #[test]
    fn test_preserve_left() {
        let mut label = String::new();
        preserve_left(&mut label, "Right");
        assert_eq!(label, "Right");
        preserve_left(&mut label, "Other");
        assert_eq!(label, "Right");

        let mut opt = Some(1);
        preserve_left_option(&mut opt, &Some(2));
        assert_eq!(opt, Some(1));
    }

    #[test]
    fn test_adopt_right() {
        let mut priority = 1;
        adopt_right(&mut priority, &5);
        assert_eq!(priority, 5);

        let mut unit = Some("M");
        adopt_right_option(&mut unit, &None);
        assert_eq!(unit, Some("M"));
        adopt_right_option(&mut unit, &Some("FT"));
        assert_eq!(unit, Some("FT"));
    }

    #[test]
    fn test_immutable() {
        assert!(immutable("ONE", "ONE", || GraphError::Cycle("x".into()).into()).is_ok());
        assert!(immutable(&1.0, &2.0, || GraphError::Cycle("x".into()).into()).is_err());
    }

    #[test]
    fn test_ordered_union_keeps_left_order() {
        let mut left = vec!["Format1", "Format3"];
        ordered_union(&mut left, &["format1", "Format2", "Format4"], |a, b| {
            a.eq_ignore_ascii_case(b)
        });
        assert_eq!(left, vec!["Format1", "Format3", "Format2", "Format4"]);
    }
}
