//! Symmetrization of a forward and a reverse alignment run.

use std::collections::{BTreeSet, VecDeque};

use crate::error::{AlignError, Result};
use crate::types::{Link, NULL_LINK};

/// Merges two directional alignments with the Moses "grow-diag-final-and" heuristic.
///
/// `forward[s][j]` is the source position linked to target position `j` of
/// sentence `s` (a forward run); `reverse[s][i]` is the target position linked
/// to source position `i` (a reverse run, i.e. the `links` of an aligner run
/// with `reverse` set). Either may hold [`NULL_LINK`].
///
/// Per sentence:
/// - A = forward ∩ reverse, U = forward ∪ reverse, as `(source, target)` sets.
/// - Grow-diag: starting from the points of A, any 8-neighbour that is in U,
///   not yet in A, and touches a word unaligned in A is added and expanded in turn.
/// - Final-and: remaining forward points joining two unaligned words are added,
///   then the same for reverse points.
///
/// Returns the sorted `(source, target)` pairs of every sentence.
pub fn grow_diag_final_and(forward: &[Vec<Link>], reverse: &[Vec<Link>]) -> Result<Vec<Vec<(usize, usize)>>> {
    if forward.len() != reverse.len() {
        return Err(AlignError::Symmetrize(format!(
            "mismatched sentence counts: forward ({}) vs reverse ({})",
            forward.len(),
            reverse.len()
        )));
    }

    let mut merged = Vec::with_capacity(forward.len());
    for (s, (fwd, rev)) in forward.iter().zip(reverse).enumerate() {
        let tgt_len = fwd.len();
        let src_len = rev.len();

        let mut s_fw = BTreeSet::new();
        for (j, &i) in fwd.iter().enumerate() {
            if i == NULL_LINK {
                continue;
            }
            let i = i as usize;
            if i >= src_len {
                return Err(AlignError::Symmetrize(format!(
                    "sentence {}: forward index out of bounds: j={} -> i={} (src_len={})",
                    s, j, i, src_len
                )));
            }
            s_fw.insert((i, j));
        }
        let mut s_rev = BTreeSet::new();
        for (i, &j) in rev.iter().enumerate() {
            if j == NULL_LINK {
                continue;
            }
            let j = j as usize;
            if j >= tgt_len {
                return Err(AlignError::Symmetrize(format!(
                    "sentence {}: reverse index out of bounds: i={} -> j={} (tgt_len={})",
                    s, i, j, tgt_len
                )));
            }
            s_rev.insert((i, j));
        }

        let mut a: BTreeSet<(usize, usize)> = s_fw.intersection(&s_rev).copied().collect();
        let u: BTreeSet<(usize, usize)> = s_fw.union(&s_rev).copied().collect();

        let mut src_aligned = vec![false; src_len];
        let mut tgt_aligned = vec![false; tgt_len];
        for &(i, j) in &a {
            src_aligned[i] = true;
            tgt_aligned[j] = true;
        }

        let mut queue: VecDeque<(usize, usize)> = a.iter().copied().collect();
        while let Some((i, j)) = queue.pop_front() {
            for (di, dj) in NEIGHBOURS {
                let (Some(i2), Some(j2)) = (i.checked_add_signed(di), j.checked_add_signed(dj)) else {
                    continue;
                };
                if i2 >= src_len || j2 >= tgt_len {
                    continue;
                }
                let point = (i2, j2);
                if !a.contains(&point) && u.contains(&point) && (!src_aligned[i2] || !tgt_aligned[j2]) {
                    a.insert(point);
                    src_aligned[i2] = true;
                    tgt_aligned[j2] = true;
                    queue.push_back(point);
                }
            }
        }

        for set in [&s_fw, &s_rev] {
            for &(i, j) in set {
                if !a.contains(&(i, j)) && !src_aligned[i] && !tgt_aligned[j] {
                    a.insert((i, j));
                    src_aligned[i] = true;
                    tgt_aligned[j] = true;
                }
            }
        }

        merged.push(a.into_iter().collect());
    }
    Ok(merged)
}

const NEIGHBOURS: [(isize, isize); 8] = [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, -1), (-1, 1), (1, -1), (1, 1)];
