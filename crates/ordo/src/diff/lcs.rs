//! Move minimization.
//!
//! Given the old positions of the surviving elements listed in their new
//! order, the elements that form a longest increasing subsequence can stay
//! where they are. Every other survivor has to move.

/// Marks the members of one longest strictly increasing subsequence of
/// `seq`.
///
/// Runs in O(n log n) by patience sorting. Among several longest
/// subsequences the one ending with the smallest values is chosen, which
/// keeps earlier elements in place.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    let mut keep = vec![false; seq.len()];
    if seq.is_empty() {
        return keep;
    }

    // tails[k] is the index in `seq` of the smallest tail of an increasing
    // run of length k + 1.
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    let mut predecessor: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < value);
        predecessor[i] = pos.checked_sub(1).map(|p| tails[p]);
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut current = tails.last().copied();
    while let Some(i) = current {
        keep[i] = true;
        current = predecessor[i];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kept(seq: &[usize]) -> Vec<usize> {
        longest_increasing_subsequence(seq)
            .into_iter()
            .zip(seq)
            .filter_map(|(keep, &v)| keep.then_some(v))
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
    }

    #[test]
    fn test_sorted_keeps_everything() {
        assert_eq!(kept(&[0, 1, 2, 3]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_rotation_moves_one() {
        // [x, y, z] -> [z, x, y]
        assert_eq!(kept(&[2, 0, 1]), vec![0, 1]);
        // [x, y, z] -> [y, z, x]
        assert_eq!(kept(&[1, 2, 0]), vec![1, 2]);
    }

    #[test]
    fn test_reversed_keeps_one() {
        assert_eq!(kept(&[3, 2, 1, 0]).len(), 1);
    }

    #[test]
    fn test_interleaved() {
        let result = kept(&[3, 0, 4, 1, 5, 2, 6]);
        assert_eq!(result.len(), 4);
        assert!(result.windows(2).all(|w| w[0] < w[1]));
    }
}
