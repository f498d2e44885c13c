use backlog_core::error::RankError;
use backlog_core::model::{Backlog, BacklogId, Story, StoryId};
use backlog_core::relocate::Relocator;
use backlog_core::store::StoryStore;
use backlog_core::store::memory::{MemoryStore, RecordingHistory};

const PRODUCT: BacklogId = BacklogId(1);
const PROJECT: BacklogId = BacklogId(2);
const ITERATION: BacklogId = BacklogId(5834);

const A: StoryId = StoryId(222);
const B: StoryId = StoryId(515);
const C: StoryId = StoryId(7646);
const D: StoryId = StoryId(57);

/// Four stories with gapped ranks: A=0, B=2, C=3, D=13.
fn ranked_iteration() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_backlog(Backlog::product(PRODUCT, "Product"));
    store.insert_backlog(Backlog::project(PROJECT, "Project", PRODUCT));
    store.insert_backlog(Backlog::iteration(ITERATION, "Iteration", PROJECT));
    for (id, name, rank) in [(A, "A", 0), (B, "B", 2), (C, "C", 3), (D, "D", 13)] {
        store.insert_story(Story::new(id, name, ITERATION, rank));
    }
    store
}

fn rank_of(store: &MemoryStore, id: StoryId) -> i64 {
    store.story(id).expect("story exists").rank
}

fn ranks(store: &MemoryStore) -> [i64; 4] {
    [A, B, C, D].map(|id| rank_of(store, id))
}

#[test]
fn rank_to_top_shifts_everything_above() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut d = store.story(D).expect("D");
    let shifted = relocator.rank_under_story(&mut d, None).expect("rank to top");

    assert_eq!(d.rank, 0);
    assert_eq!(ranks(&store), [1, 3, 4, 0]);
    let mut shifted_ids: Vec<StoryId> = shifted.iter().map(|s| s.id).collect();
    shifted_ids.sort();
    assert_eq!(shifted_ids, vec![A, B, C]);
    assert!(history.calls().is_empty());
}

#[test]
fn rank_down_pulls_window_up() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut a = store.story(A).expect("A");
    let c = store.story(C).expect("C");
    relocator.rank_under_story(&mut a, Some(&c)).expect("rank under C");

    assert_eq!(a.rank, 3);
    assert_eq!(ranks(&store), [3, 1, 2, 13]);
}

#[test]
fn rank_up_under_middle_story_leaves_target_alone() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut d = store.story(D).expect("D");
    let a = store.story(A).expect("A");
    relocator.rank_under_story(&mut d, Some(&a)).expect("rank under A");

    assert_eq!(ranks(&store), [0, 3, 4, 1]);
}

#[test]
fn rank_under_rejects_foreign_target_and_self() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut a = store.story(A).expect("A");
    let stranger = Story::new(StoryId(9), "elsewhere", PROJECT, 1);
    store.insert_story(stranger.clone());
    assert!(matches!(
        relocator.rank_under_story(&mut a, Some(&stranger)),
        Err(RankError::InvalidArgument(_))
    ));

    let same = a.clone();
    assert!(matches!(
        relocator.rank_under_story(&mut a, Some(&same)),
        Err(RankError::InvalidArgument(_))
    ));

    assert_eq!(a.rank, 0);
    assert_eq!(ranks(&store), [0, 2, 3, 13]);
}

#[test]
fn rank_to_bottom_takes_last_plus_one() {
    let store = ranked_iteration();
    let mut last = store.story(D).expect("D");
    last.rank = 117;
    store.insert_story(last);

    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);
    let mut b = store.story(B).expect("B");

    assert_eq!(relocator.rank_to_bottom(&mut b, Some(ITERATION)).expect("bottom"), 118);
    assert_eq!(b.rank, 118);
    assert_eq!(rank_of(&store, B), 118);
    assert!(history.calls().is_empty());
}

#[test]
fn append_into_empty_backlog_is_zero() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut b = store.story(B).expect("B");
    relocator.move_to_backlog(&mut b, PROJECT).expect("move");
    assert_eq!(b.rank, 0);
    assert_eq!(relocator.rank_to_bottom(&mut b, Some(PROJECT)).expect("bottom"), 0);
}

#[test]
fn rank_to_bottom_of_deleted_story_is_not_found() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut c = store.story(C).expect("C");
    store.remove(C).expect("remove");

    assert!(matches!(
        relocator.rank_to_bottom(&mut c, Some(ITERATION)),
        Err(RankError::StoryNotFound(id)) if id == C
    ));
    assert_eq!(store.ranks(ITERATION), vec![(A, 0), (B, 2), (D, 13)]);
}

#[test]
fn stale_snapshots_rank_against_stored_order() {
    let store = MemoryStore::new();
    store.insert_backlog(Backlog::product(PRODUCT, "Product"));
    for (id, rank) in [(1, 0), (2, 1), (3, 2)] {
        store.insert_story(Story::new(StoryId(id), "s", PRODUCT, rank));
    }
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut first_writer = store.story(StoryId(3)).expect("3");
    let stale_target = store.story(StoryId(1)).expect("1");
    let mut second_writer = store.story(StoryId(3)).expect("3");
    relocator
        .rank_under_story(&mut second_writer, None)
        .expect("rank to top");
    assert_eq!(first_writer.rank, 2);

    relocator
        .rank_under_story(&mut first_writer, Some(&stale_target))
        .expect("rank under 1");

    assert_eq!(first_writer.rank, 1);
    assert_eq!(
        store.ranks(PRODUCT),
        vec![(StoryId(1), 0), (StoryId(3), 1), (StoryId(2), 2)]
    );
}

#[test]
fn rank_under_vanished_target_is_not_found() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);

    let mut a = store.story(A).expect("A");
    let b = store.story(B).expect("B");
    store.remove(B).expect("remove");

    assert!(matches!(
        relocator.rank_under_story(&mut a, Some(&b)),
        Err(RankError::StoryNotFound(id)) if id == B
    ));
    assert_eq!(a.rank, 0);
}

#[test]
fn rank_to_bottom_validates_backlog() {
    let store = ranked_iteration();
    let history = RecordingHistory::new();
    let relocator = Relocator::new(&store, &store, &history);
    let mut b = store.story(B).expect("B");

    assert!(matches!(
        relocator.rank_to_bottom(&mut b, None),
        Err(RankError::InvalidArgument(_))
    ));
    let err = relocator
        .rank_to_bottom(&mut b, Some(BacklogId(1222)))
        .expect_err("unknown backlog");
    assert!(err.is_not_found());
    assert_eq!(b.rank, 2);
}
