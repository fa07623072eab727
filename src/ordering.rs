use std::collections::HashSet;

/// Next append position for an ordered collection: one past the current
/// maximum, or 0 for an empty collection. Deletions may leave gaps; those
/// are tolerated until the next explicit reorder, which re-densifies.
pub fn next_position(current_max: Option<i32>) -> i32 {
    current_max.map_or(0, |max| max + 1)
}

/// Validates a reorder request against the collection's current id set.
/// The submitted sequence must be a permutation of exactly the existing
/// ids: no missing ids, no duplicates, no foreign ids. Anything else is
/// rejected before a single row is touched.
pub fn check_reorder_ids(existing: &[String], ordered: &[String]) -> Result<(), String> {
    if ordered.len() != existing.len() {
        return Err(format!(
            "orderedIds must contain exactly {} ids, got {}",
            existing.len(),
            ordered.len()
        ));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(ordered.len());
    for id in ordered {
        if !seen.insert(id.as_str()) {
            return Err(format!("duplicate id in orderedIds: {}", id));
        }
    }

    for id in existing {
        if !seen.contains(id.as_str()) {
            return Err(format!("orderedIds is missing id: {}", id));
        }
    }

    Ok(())
}

/// Position assignments for a validated permutation: each id gets its index.
pub fn position_assignments(ordered: &[String]) -> impl Iterator<Item = (&str, i32)> {
    ordered
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index as i32))
}

#[cfg(test)]
mod test {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_item_gets_position_zero() {
        assert_eq!(next_position(None), 0);
    }

    #[test]
    fn append_goes_one_past_the_max() {
        assert_eq!(next_position(Some(4)), 5);
    }

    #[test]
    fn permutation_is_accepted() {
        assert!(check_reorder_ids(&ids(&["a", "b", "c"]), &ids(&["c", "a", "b"])).is_ok());
    }

    #[test]
    fn short_list_is_rejected() {
        assert!(check_reorder_ids(&ids(&["a", "b", "c"]), &ids(&["c", "a"])).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        assert!(check_reorder_ids(&ids(&["a", "b"]), &ids(&["a", "a"])).is_err());
    }

    #[test]
    fn foreign_ids_are_rejected() {
        assert!(check_reorder_ids(&ids(&["a", "b"]), &ids(&["a", "z"])).is_err());
    }

    #[test]
    fn assignments_follow_submitted_order() {
        let ordered = ids(&["c", "a", "b"]);
        let assigned: Vec<(&str, i32)> = position_assignments(&ordered).collect();
        assert_eq!(assigned, vec![("c", 0), ("a", 1), ("b", 2)]);
    }
}
