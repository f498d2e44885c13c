use std::collections::{BTreeSet, HashSet};

use backlog_core::model::{Backlog, BacklogId, Story, StoryId};
use backlog_core::relocate::Relocator;
use backlog_core::store::memory::{MemoryStore, RecordingHistory};
use proptest::prelude::*;
use proptest::sample::Index;

const ITERATION: BacklogId = BacklogId(3);

fn seeded(ranks: &BTreeSet<i64>) -> (MemoryStore, Vec<StoryId>) {
    let store = MemoryStore::new();
    store.insert_backlog(Backlog::product(BacklogId(1), "Product"));
    store.insert_backlog(Backlog::project(BacklogId(2), "Project", BacklogId(1)));
    store.insert_backlog(Backlog::iteration(ITERATION, "Iteration", BacklogId(2)));

    // Ids are deliberately not in rank order.
    let mut order = Vec::with_capacity(ranks.len());
    for (i, rank) in ranks.iter().enumerate() {
        let id = StoryId(1000 - i64::try_from(i).unwrap_or(0) * 7);
        store.insert_story(Story::new(id, format!("s{i}"), ITERATION, *rank));
        order.push(id);
    }
    (store, order)
}

fn order_of(store: &MemoryStore) -> Vec<StoryId> {
    store.ranks(ITERATION).into_iter().map(|(id, _)| id).collect()
}

proptest! {
    #[test]
    fn rank_under_places_story_after_target(
        ranks in proptest::collection::btree_set(0_i64..80, 1..12),
        mover in any::<Index>(),
        target in proptest::option::of(any::<Index>()),
    ) {
        let (store, order) = seeded(&ranks);
        let mover_idx = mover.index(order.len());
        let target_idx = target.map(|t| t.index(order.len()));
        prop_assume!(target_idx != Some(mover_idx));

        let mut expected: Vec<StoryId> = order.clone();
        let moved_id = expected.remove(mover_idx);
        match target_idx {
            None => expected.insert(0, moved_id),
            Some(idx) => {
                let target_id = order[idx];
                let pos = expected.iter().position(|id| *id == target_id).unwrap_or(0);
                expected.insert(pos + 1, moved_id);
            }
        }

        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut story = store.story(moved_id).expect("mover");
        let target_story = target_idx.map(|idx| store.story(order[idx]).expect("target"));
        relocator
            .rank_under_story(&mut story, target_story.as_ref())
            .expect("reorder");

        let after = store.ranks(ITERATION);
        let distinct: HashSet<i64> = after.iter().map(|(_, rank)| *rank).collect();
        prop_assert_eq!(distinct.len(), after.len());
        prop_assert_eq!(order_of(&store), expected);
        prop_assert_eq!(store.story(moved_id).expect("mover").rank, story.rank);
        prop_assert!(history.calls().is_empty());
    }

    #[test]
    fn stories_outside_window_keep_their_rank(
        ranks in proptest::collection::btree_set(0_i64..80, 2..12),
        mover in any::<Index>(),
        target in any::<Index>(),
    ) {
        let (store, order) = seeded(&ranks);
        let mover_idx = mover.index(order.len());
        let target_idx = target.index(order.len());
        prop_assume!(target_idx != mover_idx);

        let before = store.ranks(ITERATION);
        let current = store.story(order[mover_idx]).expect("mover").rank;
        let target_rank = store.story(order[target_idx]).expect("target").rank;
        let (low, high) = if target_rank < current {
            (target_rank + 1, current - 1)
        } else {
            (current + 1, target_rank)
        };

        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);
        let mut story = store.story(order[mover_idx]).expect("mover");
        let target_story = store.story(order[target_idx]).expect("target");
        relocator
            .rank_under_story(&mut story, Some(&target_story))
            .expect("reorder");

        for (id, rank) in before {
            if id == story.id || (low..=high).contains(&rank) {
                continue;
            }
            prop_assert_eq!(store.story(id).expect("story").rank, rank);
        }
    }

    #[test]
    fn repeated_bottom_moves_stay_unique(
        ranks in proptest::collection::btree_set(0_i64..40, 1..8),
        picks in proptest::collection::vec(any::<Index>(), 1..6),
    ) {
        let (store, order) = seeded(&ranks);
        let history = RecordingHistory::new();
        let relocator = Relocator::new(&store, &store, &history);

        for pick in picks {
            let id = order[pick.index(order.len())];
            let mut story = store.story(id).expect("story");
            relocator
                .rank_to_bottom(&mut story, Some(ITERATION))
                .expect("bottom");
            prop_assert_eq!(order_of(&store).last().copied(), Some(id));
        }

        let after = store.ranks(ITERATION);
        let distinct: HashSet<i64> = after.iter().map(|(_, rank)| *rank).collect();
        prop_assert_eq!(distinct.len(), after.len());
    }
}
