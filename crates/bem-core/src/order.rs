//! Ordered sibling sequences.

/// Moves the item at `from` so it ends up at `to`, shifting the others.
///
/// The item is removed first and `to` is clamped to the remaining length, so
/// moving to a position past the end places the item last. Returns `false` if
/// `from` is out of range.
pub(crate) fn move_to_index<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() {
        return false;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    true
}

/// Creation indices rearranged the way a loader rebuilds a persisted order.
///
/// Items are visited in ascending order of their persisted position and each
/// is moved to that position with [`move_to_index`].
pub(crate) fn restore_order(positions: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..positions.len()).collect();
    let mut by_position = order.clone();
    by_position.sort_by_key(|index| positions[*index]);
    for index in by_position {
        if let Some(from) = order.iter().position(|item| *item == index) {
            move_to_index(&mut order, from, positions[index]);
        }
    }
    order
}

/// Rearranges `items` so that slot `i` holds the item previously at `order[i]`.
pub(crate) fn permute<T>(items: &mut Vec<T>, order: &[usize]) {
    debug_assert_eq!(items.len(), order.len());
    let mut taken: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(
        order
            .iter()
            .filter_map(|index| taken.get_mut(*index).and_then(Option::take)),
    );
}

/// Sum of `widths` of the items strictly before `ordinal`.
pub(crate) fn offset_of<I>(widths: I, ordinal: usize) -> u32
where
    I: IntoIterator<Item = u32>,
{
    widths.into_iter().take(ordinal).fold(0, u32::saturating_add)
}
