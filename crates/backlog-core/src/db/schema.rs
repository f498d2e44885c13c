//! SQLite schema for backlogs, stories and the history queue.
//!
//! - `backlogs` holds the Product → Project → Iteration tree through
//!   `parent_id`
//! - `stories` carries rank and the parent story link; child sets are
//!   derived from `parent_story_id`
//! - `story_responsibles`, `story_tasks` and `story_hour_entries` model the
//!   multi-valued story relations
//! - `history_queue` records pending history recomputations

/// Migration v1: backlog tree and story tables.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS backlogs (
    backlog_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('product', 'project', 'iteration')),
    parent_id INTEGER REFERENCES backlogs(backlog_id) ON DELETE RESTRICT,
    CHECK (parent_id IS NULL OR parent_id <> backlog_id)
);

CREATE TABLE IF NOT EXISTS backlog_assignees (
    backlog_id INTEGER NOT NULL REFERENCES backlogs(backlog_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    PRIMARY KEY (backlog_id, user_id)
);

CREATE TABLE IF NOT EXISTS stories (
    story_id INTEGER PRIMARY KEY AUTOINCREMENT,
    backlog_id INTEGER NOT NULL REFERENCES backlogs(backlog_id) ON DELETE RESTRICT,
    parent_story_id INTEGER REFERENCES stories(story_id)
        ON DELETE SET NULL DEFERRABLE INITIALLY DEFERRED,
    name TEXT NOT NULL,
    rank INTEGER NOT NULL,
    story_points INTEGER CHECK (story_points IS NULL OR story_points >= 0),
    state TEXT NOT NULL DEFAULT 'not_started' CHECK (
        state IN ('not_started', 'started', 'pending', 'blocked', 'implemented', 'done')
    ),
    CHECK (parent_story_id IS NULL OR parent_story_id <> story_id)
);

CREATE TABLE IF NOT EXISTS story_responsibles (
    story_id INTEGER NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    PRIMARY KEY (story_id, user_id)
);

CREATE TABLE IF NOT EXISTS story_tasks (
    task_id INTEGER PRIMARY KEY,
    story_id INTEGER NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS story_hour_entries (
    entry_id INTEGER PRIMARY KEY,
    story_id INTEGER NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE
);
";

/// Migration v2: rank/parent indexes and the history queue.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_stories_backlog_rank
    ON stories(backlog_id, rank);

CREATE INDEX IF NOT EXISTS idx_stories_parent
    ON stories(parent_story_id);

CREATE INDEX IF NOT EXISTS idx_backlogs_parent
    ON backlogs(parent_id);

CREATE TABLE IF NOT EXISTS history_queue (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    backlog_id INTEGER NOT NULL,
    scope TEXT NOT NULL CHECK (scope IN ('backlog', 'iteration')),
    queued_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_queue_backlog
    ON history_queue(backlog_id, seq);
";

/// Indexes the store relies on for window queries and child lookups.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_stories_backlog_rank",
    "idx_stories_parent",
    "idx_backlogs_parent",
    "idx_history_queue_backlog",
];
