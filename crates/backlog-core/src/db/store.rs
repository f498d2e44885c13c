//! [`SqliteStore`]: the SQLite-backed [`BacklogRepository`] and
//! [`StoryStore`].
//!
//! Child sets are not stored; they are derived from `parent_story_id` when a
//! story is loaded. Writing a story replaces its responsibles, tasks and hour
//! entries with the in-memory sets.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use std::path::Path;
use std::str::FromStr;

use super::history::HistoryQueue;
use crate::model::{
    Backlog, BacklogId, BacklogKind, HourEntryId, NewStory, ParseEnumError, Story, StoryId,
    TaskId, UserId,
};
use crate::store::{BacklogRepository, StoryStore};

const STORY_COLUMNS: &str =
    "story_id, name, rank, backlog_id, parent_story_id, story_points, state";

/// Story and backlog storage over one SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at `path`, creating and migrating it when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(super::open_database(path)?))
    }

    /// Wrap an already configured and migrated connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// History queue sharing this store's connection.
    #[must_use]
    pub const fn history(&self) -> HistoryQueue<'_> {
        HistoryQueue::new(&self.conn)
    }

    /// Insert a backlog with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken or the parent does not exist.
    pub fn insert_backlog(&self, backlog: &Backlog) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO backlogs (backlog_id, name, kind, parent_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    backlog.id.get(),
                    backlog.name,
                    backlog.kind.as_str(),
                    backlog.parent.map(BacklogId::get)
                ],
            )
            .with_context(|| format!("insert backlog {}", backlog.id))?;
        Ok(())
    }

    /// Insert a backlog and let SQLite pick its id.
    ///
    /// # Errors
    ///
    /// Fails if the parent does not exist.
    pub fn create_backlog(
        &self,
        name: &str,
        kind: BacklogKind,
        parent: Option<BacklogId>,
    ) -> Result<Backlog> {
        self.conn
            .execute(
                "INSERT INTO backlogs (name, kind, parent_id) VALUES (?1, ?2, ?3)",
                params![name, kind.as_str(), parent.map(BacklogId::get)],
            )
            .with_context(|| format!("create {kind} backlog '{name}'"))?;
        Ok(Backlog {
            id: BacklogId(self.conn.last_insert_rowid()),
            name: name.to_string(),
            kind,
            parent,
        })
    }

    /// All backlogs ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_backlogs(&self) -> Result<Vec<Backlog>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT backlog_id, name, kind, parent_id FROM backlogs ORDER BY backlog_id",
        )?;
        let backlogs = stmt
            .query_map([], backlog_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(backlogs)
    }

    /// Assign a user to a project backlog. Assigning twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if the backlog does not exist.
    pub fn assign_user(&self, project: BacklogId, user: UserId) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO backlog_assignees (backlog_id, user_id) VALUES (?1, ?2)",
                params![project.get(), user.get()],
            )
            .with_context(|| format!("assign user {user} to backlog {project}"))?;
        Ok(())
    }

    fn query_stories<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Story>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut stories = stmt
            .query_map(params, story_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for story in &mut stories {
            self.load_relations(story)?;
        }
        Ok(stories)
    }

    fn load_relations(&self, story: &mut Story) -> Result<()> {
        let id = story.id.get();
        story.children = self
            .related_ids(
                "SELECT story_id FROM stories WHERE parent_story_id = ?1 ORDER BY story_id",
                id,
            )?
            .into_iter()
            .map(StoryId)
            .collect();
        story.responsibles = self
            .related_ids(
                "SELECT user_id FROM story_responsibles WHERE story_id = ?1 ORDER BY user_id",
                id,
            )?
            .into_iter()
            .map(UserId)
            .collect();
        story.tasks = self
            .related_ids(
                "SELECT task_id FROM story_tasks WHERE story_id = ?1 ORDER BY task_id",
                id,
            )?
            .into_iter()
            .map(TaskId)
            .collect();
        story.hour_entries = self
            .related_ids(
                "SELECT entry_id FROM story_hour_entries WHERE story_id = ?1 ORDER BY entry_id",
                id,
            )?
            .into_iter()
            .map(HourEntryId)
            .collect();
        Ok(())
    }

    fn related_ids(&self, sql: &str, id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let ids = stmt
            .query_map([id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

impl BacklogRepository for SqliteStore {
    fn find_backlog(&self, id: BacklogId) -> Result<Option<Backlog>> {
        let backlog = self
            .conn
            .query_row(
                "SELECT backlog_id, name, kind, parent_id FROM backlogs WHERE backlog_id = ?1",
                [id.get()],
                backlog_from_row,
            )
            .optional()
            .with_context(|| format!("load backlog {id}"))?;
        Ok(backlog)
    }

    fn assigned_users(&self, project: BacklogId) -> Result<Vec<UserId>> {
        Ok(self
            .related_ids(
                "SELECT user_id FROM backlog_assignees WHERE backlog_id = ?1 ORDER BY user_id",
                project.get(),
            )?
            .into_iter()
            .map(UserId)
            .collect())
    }
}

impl StoryStore for SqliteStore {
    fn get(&self, id: StoryId) -> Result<Option<Story>> {
        let sql = format!("SELECT {STORY_COLUMNS} FROM stories WHERE story_id = ?1");
        Ok(self.query_stories(&sql, [id.get()])?.pop())
    }

    fn stories_in_backlog(&self, backlog: BacklogId) -> Result<Vec<Story>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE backlog_id = ?1 ORDER BY rank, story_id"
        );
        self.query_stories(&sql, [backlog.get()])
    }

    fn stories_with_rank_between(
        &self,
        backlog: BacklogId,
        low: i64,
        high: i64,
    ) -> Result<Vec<Story>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories \
             WHERE backlog_id = ?1 AND rank BETWEEN ?2 AND ?3 \
             ORDER BY rank, story_id"
        );
        self.query_stories(&sql, params![backlog.get(), low, high])
    }

    fn last_story_in_rank(&self, backlog: BacklogId) -> Result<Option<Story>> {
        let sql = format!(
            "SELECT {STORY_COLUMNS} FROM stories WHERE backlog_id = ?1 \
             ORDER BY rank DESC, story_id DESC LIMIT 1"
        );
        Ok(self.query_stories(&sql, [backlog.get()])?.pop())
    }

    fn create(&self, draft: &NewStory, backlog: BacklogId, rank: i64) -> Result<StoryId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO stories (backlog_id, parent_story_id, name, rank, story_points, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                backlog.get(),
                draft.parent.map(StoryId::get),
                draft.name,
                rank,
                draft.story_points,
                draft.state.as_str()
            ],
        )
        .with_context(|| format!("create story '{}' in backlog {backlog}", draft.name))?;
        let id = StoryId(tx.last_insert_rowid());
        for user in &draft.responsibles {
            tx.execute(
                "INSERT INTO story_responsibles (story_id, user_id) VALUES (?1, ?2)",
                params![id.get(), user.get()],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    fn store(&self, story: &Story) -> Result<()> {
        self.store_all(std::slice::from_ref(story))
    }

    fn store_all(&self, stories: &[Story]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for story in stories {
            write_story(&tx, story).with_context(|| format!("store story {}", story.id))?;
        }
        tx.commit().context("commit story batch")?;
        Ok(())
    }

    fn remove(&self, id: StoryId) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM stories WHERE story_id = ?1", [id.get()])?;
        if removed == 0 {
            bail!("cannot remove story {id}: not stored");
        }
        Ok(())
    }

    fn story_point_sum(&self, backlog: BacklogId) -> Result<u64> {
        let sum: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(story_points), 0) FROM stories WHERE backlog_id = ?1",
            [backlog.get()],
            |row| row.get(0),
        )?;
        u64::try_from(sum).with_context(|| format!("negative story point sum {sum}"))
    }
}

fn write_story(conn: &Connection, story: &Story) -> rusqlite::Result<()> {
    let id = story.id.get();
    conn.execute(
        "INSERT INTO stories (story_id, backlog_id, parent_story_id, name, rank, story_points, state)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(story_id) DO UPDATE SET
             backlog_id = excluded.backlog_id,
             parent_story_id = excluded.parent_story_id,
             name = excluded.name,
             rank = excluded.rank,
             story_points = excluded.story_points,
             state = excluded.state",
        params![
            id,
            story.backlog.get(),
            story.parent.map(StoryId::get),
            story.name,
            story.rank,
            story.story_points,
            story.state.as_str()
        ],
    )?;

    conn.execute("DELETE FROM story_responsibles WHERE story_id = ?1", [id])?;
    for user in &story.responsibles {
        conn.execute(
            "INSERT INTO story_responsibles (story_id, user_id) VALUES (?1, ?2)",
            params![id, user.get()],
        )?;
    }

    conn.execute("DELETE FROM story_tasks WHERE story_id = ?1", [id])?;
    for task in &story.tasks {
        conn.execute(
            "INSERT INTO story_tasks (task_id, story_id) VALUES (?1, ?2)
             ON CONFLICT(task_id) DO UPDATE SET story_id = excluded.story_id",
            params![task.get(), id],
        )?;
    }

    conn.execute("DELETE FROM story_hour_entries WHERE story_id = ?1", [id])?;
    for entry in &story.hour_entries {
        conn.execute(
            "INSERT INTO story_hour_entries (entry_id, story_id) VALUES (?1, ?2)
             ON CONFLICT(entry_id) DO UPDATE SET story_id = excluded.story_id",
            params![entry.get(), id],
        )?;
    }
    Ok(())
}

fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    raw.parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn backlog_from_row(row: &Row<'_>) -> rusqlite::Result<Backlog> {
    let kind: String = row.get(2)?;
    Ok(Backlog {
        id: BacklogId(row.get(0)?),
        name: row.get(1)?,
        kind: parse_text(2, &kind)?,
        parent: row.get::<_, Option<i64>>(3)?.map(BacklogId),
    })
}

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<Story> {
    let state: String = row.get(6)?;
    let mut story = Story::new(
        StoryId(row.get(0)?),
        row.get::<_, String>(1)?,
        BacklogId(row.get(3)?),
        row.get(2)?,
    );
    story.parent = row.get::<_, Option<i64>>(4)?.map(StoryId);
    story.story_points = row.get(5)?;
    story.state = parse_text(6, &state)?;
    Ok(story)
}
