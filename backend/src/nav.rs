/// Ids of the dishes displayed around the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub prev: i64,
    pub next: i64,
}

/// Previous and next ids of `id` in `ids`, wrapping around both ends.
///
/// Returns `None` when `ids` is empty or does not contain `id`.
pub fn neighbors(ids: &[i64], id: i64) -> Option<Neighbors> {
    let index = ids.iter().position(|&candidate| candidate == id)?;
    let len = ids.len();
    Some(Neighbors {
        prev: ids[(len + index - 1) % len],
        next: ids[(index + 1) % len],
    })
}
