//! Balanced, sticky partitioning of submissions across judges

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Rebalance a pool over the accepted judges.
///
/// `holdings` maps every accepted judge to what they currently hold in the
/// scope; `scored` lists, per judge, the submissions they already scored.
/// Each judge keeps as much of their current share as the balance allows,
/// scored submissions first. Whatever is left is dealt in submission order to
/// the least-loaded judge, ties going to the lower judge id. Per-judge counts
/// never differ by more than one, and an already balanced partition of the
/// same pool comes back unchanged.
pub fn rebalance(
    pool: &[Uuid],
    holdings: &BTreeMap<Uuid, Vec<Uuid>>,
    scored: &BTreeMap<Uuid, BTreeSet<Uuid>>,
) -> AppResult<BTreeMap<Uuid, Vec<Uuid>>> {
    if holdings.is_empty() {
        return Err(AppError::NoAvailableEvaluators(
            "no accepted judges to distribute submissions to".to_string(),
        ));
    }

    let pool: BTreeSet<Uuid> = pool.iter().copied().collect();
    let base = pool.len() / holdings.len();
    let mut larger = pool.len() % holdings.len();

    let empty = BTreeSet::new();
    let mut taken = BTreeSet::new();
    let mut partition: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();

    for (judge_id, held) in holdings {
        let done = scored.get(judge_id).unwrap_or(&empty);

        let mut keep: Vec<Uuid> = held
            .iter()
            .copied()
            .filter(|id| pool.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|id| !taken.contains(id))
            .collect();
        keep.sort_by_key(|id| (!done.contains(id), *id));

        let cap = if keep.len() > base && larger > 0 {
            larger -= 1;
            base + 1
        } else {
            base
        };
        keep.truncate(cap);

        taken.extend(keep.iter().copied());
        partition.insert(*judge_id, keep);
    }

    for submission_id in pool.difference(&taken) {
        let lightest = partition
            .iter()
            .min_by_key(|(judge_id, bucket)| (bucket.len(), **judge_id))
            .map(|(judge_id, _)| *judge_id);
        if let Some(bucket) = lightest.and_then(|judge_id| partition.get_mut(&judge_id)) {
            bucket.push(*submission_id);
        }
    }

    for bucket in partition.values_mut() {
        bucket.sort_unstable();
    }

    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        let mut out: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        out.sort_unstable();
        out
    }

    fn fresh(judges: &[Uuid]) -> BTreeMap<Uuid, Vec<Uuid>> {
        judges.iter().map(|j| (*j, Vec::new())).collect()
    }

    fn spread(partition: &BTreeMap<Uuid, Vec<Uuid>>) -> usize {
        let counts: Vec<usize> = partition.values().map(Vec::len).collect();
        counts.iter().max().unwrap() - counts.iter().min().unwrap()
    }

    #[test]
    fn test_ten_submissions_two_judges_split_evenly() {
        let partition = rebalance(&ids(10), &fresh(&ids(2)), &BTreeMap::new()).unwrap();
        assert!(partition.values().all(|v| v.len() == 5));
    }

    #[test]
    fn test_counts_differ_by_at_most_one() {
        for (n, j) in [(0, 3), (1, 3), (7, 3), (11, 4), (100, 7), (3, 5)] {
            let partition = rebalance(&ids(n), &fresh(&ids(j)), &BTreeMap::new()).unwrap();
            assert_eq!(partition.len(), j);
            assert!(spread(&partition) <= 1, "n={} j={}", n, j);
            assert_eq!(partition.values().map(Vec::len).sum::<usize>(), n);
        }
    }

    #[test]
    fn test_first_deal_is_round_robin_by_id() {
        let submissions = ids(5);
        let judges = ids(2);
        let partition = rebalance(&submissions, &fresh(&judges), &BTreeMap::new()).unwrap();

        assert_eq!(
            partition[&judges[0]],
            vec![submissions[0], submissions[2], submissions[4]]
        );
        assert_eq!(partition[&judges[1]], vec![submissions[1], submissions[3]]);
    }

    #[test]
    fn test_balanced_partition_is_stable() {
        let submissions = ids(9);
        let judges = ids(3);
        let first = rebalance(&submissions, &fresh(&judges), &BTreeMap::new()).unwrap();

        let mut reversed = submissions.clone();
        reversed.reverse();
        assert_eq!(rebalance(&reversed, &first, &BTreeMap::new()).unwrap(), first);
    }

    #[test]
    fn test_replacement_judge_inherits_only_the_orphans() {
        let submissions = ids(10);
        let judges = ids(3);
        let first = rebalance(&submissions, &fresh(&judges[..2]), &BTreeMap::new()).unwrap();

        // judges[0] leaves, judges[2] joins
        let mut holdings = BTreeMap::new();
        holdings.insert(judges[1], first[&judges[1]].clone());
        holdings.insert(judges[2], Vec::new());

        let second = rebalance(&submissions, &holdings, &BTreeMap::new()).unwrap();
        assert_eq!(second[&judges[1]], first[&judges[1]]);
        assert_eq!(second[&judges[2]], first[&judges[0]]);
    }

    #[test]
    fn test_overflow_gives_up_unscored_work_first() {
        let submissions = ids(4);
        let judges = ids(2);

        let mut holdings = BTreeMap::new();
        holdings.insert(judges[0], submissions.clone());
        holdings.insert(judges[1], Vec::new());
        let mut scored = BTreeMap::new();
        scored.insert(
            judges[0],
            [submissions[2], submissions[3]].into_iter().collect::<BTreeSet<_>>(),
        );

        let partition = rebalance(&submissions, &holdings, &scored).unwrap();
        assert_eq!(partition[&judges[0]], vec![submissions[2], submissions[3]]);
        assert_eq!(partition[&judges[1]], vec![submissions[0], submissions[1]]);
    }

    #[test]
    fn test_submissions_outside_the_pool_are_dropped() {
        let submissions = ids(2);
        let judges = ids(1);
        let mut holdings = BTreeMap::new();
        holdings.insert(judges[0], vec![submissions[0], Uuid::new_v4()]);

        let partition = rebalance(&submissions, &holdings, &BTreeMap::new()).unwrap();
        assert_eq!(partition[&judges[0]], submissions);
    }

    #[test]
    fn test_no_judges_is_an_error() {
        let err = rebalance(&ids(4), &BTreeMap::new(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, AppError::NoAvailableEvaluators(_)));
    }
}
