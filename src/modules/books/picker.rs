use rand::seq::SliceRandom;
use rand::Rng;

/// Books surfaced per visit.
pub const PICK_COUNT: usize = 3;

/// Unweighted sample of up to `count` distinct entries, in random order.
pub fn pick<T: Clone, R: Rng + ?Sized>(items: &[T], count: usize, rng: &mut R) -> Vec<T> {
    items.choose_multiple(rng, count).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn picks_three_distinct_members() {
        let catalog = vec!["a", "b", "c", "d", "e"];
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let picked = pick(&catalog, PICK_COUNT, &mut rng);
            assert_eq!(picked.len(), 3);
            let distinct: HashSet<_> = picked.iter().collect();
            assert_eq!(distinct.len(), 3);
            assert!(picked.iter().all(|book| catalog.contains(book)));
        }
    }

    #[test]
    fn every_book_is_eventually_picked() {
        let catalog = vec!["a", "b", "c", "d", "e"];
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::new();

        // Each book is missed by a single draw with p = 2/5; 500 misses in a row is negligible.
        for _ in 0..500 {
            seen.extend(pick(&catalog, PICK_COUNT, &mut rng));
        }
        assert_eq!(seen.len(), catalog.len());
    }

    #[test]
    fn small_catalog_returns_everything() {
        let mut rng = rand::thread_rng();
        let mut picked = pick(&["a", "b"], PICK_COUNT, &mut rng);
        picked.sort();
        assert_eq!(picked, vec!["a", "b"]);

        assert!(pick::<&str, _>(&[], PICK_COUNT, &mut rng).is_empty());
    }
}
