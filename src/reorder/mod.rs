//! Ordering primitives shared by every container kind: the category list,
//! page list, block lists, kanban columns/cards and layout slots.
//!
//! All functions keep the touched sequences permutations of their member sets:
//! an item is either moved within one sequence or removed from exactly one
//! sequence and inserted into exactly one other. Nothing here knows about
//! pointer geometry; callers resolve the drop target first.

/// Anything that lives in an ordered container and has a stable id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

/// Where an item lands in a destination container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Immediately before the sibling with this id.
    Before(String),
    /// After the last member (the pointer is over the container itself).
    End,
}

impl DropTarget {
    pub fn from_over(over: Option<&str>) -> Self {
        match over {
            Some(id) => DropTarget::Before(id.to_string()),
            None => DropTarget::End,
        }
    }
}

pub fn position_of<T: Keyed>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.key() == id)
}

/// Moves the element at `from` so it ends up at `to`.
///
/// Equal or out-of-range indices leave the sequence untouched and return `false`.
pub fn move_index<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// Copying variant of [`move_index`] for callers holding a borrowed sequence.
pub fn moved<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = items.to_vec();
    move_index(&mut out, from, to);
    out
}

/// Moves `active_id` to the current position of `over_id`.
pub fn move_by_id<T: Keyed>(items: &mut Vec<T>, active_id: &str, over_id: &str) -> bool {
    let (Some(from), Some(to)) = (position_of(items, active_id), position_of(items, over_id)) else {
        return false;
    };
    move_index(items, from, to)
}

/// Same-container drop: onto a sibling (`Some`) or onto the container itself (`None`).
pub fn reposition<T: Keyed>(items: &mut Vec<T>, active_id: &str, over: Option<&str>) -> bool {
    match over {
        Some(over_id) => move_by_id(items, active_id, over_id),
        None => match position_of(items, active_id) {
            Some(from) => move_index(items, from, items.len() - 1),
            None => false,
        },
    }
}

pub fn take_by_id<T: Keyed>(items: &mut Vec<T>, id: &str) -> Option<T> {
    let ix = position_of(items, id)?;
    Some(items.remove(ix))
}

/// Index at which `target` places a new member. A sibling that is not present
/// resolves to the end.
pub fn insertion_index<T: Keyed>(items: &[T], target: &DropTarget) -> usize {
    match target {
        DropTarget::Before(id) => position_of(items, id).unwrap_or(items.len()),
        DropTarget::End => items.len(),
    }
}

pub fn insert_at<T: Keyed>(items: &mut Vec<T>, item: T, target: &DropTarget) {
    let ix = insertion_index(items, target);
    items.insert(ix, item);
}

/// Cross-container move between two distinct sequences.
pub fn transfer<T: Keyed>(
    source: &mut Vec<T>,
    dest: &mut Vec<T>,
    id: &str,
    target: &DropTarget,
) -> bool {
    if position_of(dest, id).is_some() {
        return false;
    }
    let Some(item) = take_by_id(source, id) else {
        return false;
    };
    insert_at(dest, item, target);
    true
}

/// Two distinct mutable elements of one slice.
pub fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a >= items.len() || b >= items.len() {
        return None;
    }
    if a < b {
        let (left, right) = items.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = items.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}


#[cfg(all(test, not(target_arch = "wasm32")))]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn sequence(len: usize) -> Vec<String> {
        (0..len).map(|i| format!("id-{i}")).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn random_moves_keep_a_permutation(
            len in 1usize..24,
            moves in proptest::collection::vec((0usize..32, 0usize..32), 0..40),
        ) {
            let original = sequence(len);
            let mut xs = original.clone();
            for (from, to) in moves {
                move_index(&mut xs, from % len, to % len);
            }
            prop_assert_eq!(xs.len(), original.len());
            let a: BTreeSet<_> = xs.iter().collect();
            let b: BTreeSet<_> = original.iter().collect();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn transfer_keeps_union_and_relative_order(
            left_len in 1usize..12,
            right_len in 0usize..12,
            pick in 0usize..12,
            before in proptest::option::of(0usize..12),
        ) {
            let mut left: Vec<String> = (0..left_len).map(|i| format!("l{i}")).collect();
            let mut right: Vec<String> = (0..right_len).map(|i| format!("r{i}")).collect();
            let moving = left[pick % left_len].clone();
            let target = match before {
                Some(ix) if right_len > 0 => DropTarget::Before(right[ix % right_len].clone()),
                _ => DropTarget::End,
            };
            let left_rest: Vec<String> = left.iter().filter(|x| **x != moving).cloned().collect();
            let right_before = right.clone();

            prop_assert!(transfer(&mut left, &mut right, &moving, &target));

            prop_assert_eq!(&left, &left_rest);
            prop_assert_eq!(right.iter().filter(|x| **x == moving).count(), 1);
            let right_rest: Vec<String> = right.iter().filter(|x| **x != moving).cloned().collect();
            prop_assert_eq!(right_rest, right_before);
        }
    }
}
