//! Human-readable text for rank movements, used for change tooltips.

/// English ordinal: 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, 21st, 111th.
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Empty when the entity has no previous rank.
pub fn describe_rank_change(rank_change: Option<i64>, previous_rank: Option<usize>) -> String {
    let (change, previous_rank) = match (rank_change, previous_rank) {
        (Some(change), Some(previous_rank)) => (change, previous_rank),
        _ => return String::new(),
    };

    if change == 0 {
        return "Same rank as previous period".to_string();
    }

    let direction = if change > 0 { "up" } else { "down" };
    let steps = change.unsigned_abs();
    format!(
        "Moved {} {} rank{} from {}",
        direction,
        steps,
        if steps == 1 { "" } else { "s" },
        ordinal(previous_rank)
    )
}
