use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rand::Rng;
use serde::Serialize;

use crate::config::PersonalityConfig;
use crate::error::{QuotebookError, Result};

mod schema;
use schema::{commands, personalities, quotes, stats, votes};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

// SQLite caps bind parameters per statement; quote files can be long.
const INSERT_CHUNK_SIZE: usize = 500;

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub id: i32,
    pub personality: String,
    pub number: i32,
    pub content: String,
    pub upvotes: i32,
    pub downvotes: i32,
    pub score: i32,
    pub created_at: i64,
    pub last_used: Option<i64>,
    pub use_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteOutcome {
    pub quote_id: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    pub score: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonalityStats {
    pub name: String,
    pub quotes_count: i32,
    pub total_quotes_used: i32,
    pub total_upvotes: i32,
    pub total_downvotes: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_quotes: i64,
    pub total_commands: i64,
    pub total_votes: i64,
    pub personalities: Vec<PersonalityStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandUsage {
    pub command: String,
    pub uses: i64,
}

#[derive(Queryable)]
struct QuoteRow {
    id: i32,
    personality_id: i32,
    number: i32,
    content: String,
    upvotes: i32,
    downvotes: i32,
    created_at: i64,
    last_used: Option<i64>,
    use_count: i32,
}

#[derive(Insertable)]
#[diesel(table_name = personalities)]
struct NewPersonality<'a> {
    name: &'a str,
    file_key: &'a str,
    quotes_count: i32,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = quotes)]
#[diesel(treat_none_as_default_value = false)]
struct NewQuote {
    personality_id: i32,
    number: i32,
    content: String,
    upvotes: i32,
    downvotes: i32,
    created_at: i64,
    last_used: Option<i64>,
    use_count: i32,
}

#[derive(Insertable)]
#[diesel(table_name = commands)]
struct NewCommand<'a> {
    user_id: &'a str,
    command: &'a str,
    quote_id: Option<i32>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = votes)]
struct NewVote<'a> {
    user_id: &'a str,
    quote_id: i32,
    vote: i32,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = stats)]
struct NewStats {
    personality_id: i32,
    total_quotes_used: i32,
    total_upvotes: i32,
    total_downvotes: i32,
    updated_at: i64,
}

/// Owns every read and write against the quote database and keeps the quote
/// counters and the per-personality stats cache consistent: each mutating
/// operation runs as a single transaction.
pub struct QuoteStore {
    pool: SqlitePool,
}

impl QuoteStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Idempotent startup seed: creates the personality and stats rows for
    /// any configured key that is not in the database yet, then loads that
    /// personality's quotes from `<quotes_dir>/<key>.txt`.
    pub async fn ensure_seeded(
        &self,
        configured: &[PersonalityConfig],
        quotes_dir: &str,
    ) -> Result<()> {
        for personality in configured {
            let mut conn = self.conn().await?;
            let existing: Option<i32> = personalities::table
                .filter(personalities::file_key.eq(&personality.key))
                .select(personalities::id)
                .first(&mut conn)
                .await
                .optional()
                .map_err(|e| QuotebookError::Store(e.to_string()))?;
            if existing.is_some() {
                continue;
            }

            let now = now_ts();
            let key = personality.key.clone();
            let name = personality.name.clone();
            let personality_id = conn
                .transaction::<i32, diesel::result::Error, _>(|conn| {
                    async move {
                        diesel::insert_into(personalities::table)
                            .values(&NewPersonality {
                                name: &name,
                                file_key: &key,
                                quotes_count: 0,
                            })
                            .execute(conn)
                            .await?;
                        let id = personalities::table
                            .filter(personalities::file_key.eq(&key))
                            .select(personalities::id)
                            .first::<i32>(conn)
                            .await?;
                        diesel::insert_into(stats::table)
                            .values(&NewStats {
                                personality_id: id,
                                total_quotes_used: 0,
                                total_upvotes: 0,
                                total_downvotes: 0,
                                updated_at: now,
                            })
                            .execute(conn)
                            .await?;
                        Ok(id)
                    }
                    .scope_boxed()
                })
                .await
                .map_err(|e| QuotebookError::Store(e.to_string()))?;
            drop(conn);

            self.load_quotes_from_file(personality_id, &personality.key, quotes_dir)
                .await?;
        }
        Ok(())
    }

    /// Loads `<quotes_dir>/<key>.txt` into the quotes table. Every non-empty
    /// line that does not start with `#` becomes one quote; the ordinal is
    /// the 1-based line number in the file, counting skipped lines. A read
    /// failure aborts before any row is written.
    pub async fn load_quotes_from_file(
        &self,
        personality_id: i32,
        key: &str,
        quotes_dir: &str,
    ) -> Result<usize> {
        let path = Path::new(quotes_dir).join(format!("{key}.txt"));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            QuotebookError::Store(format!(
                "failed to read quotes file {}: {e}",
                path.to_string_lossy()
            ))
        })?;

        let now = now_ts();
        let new_quotes: Vec<NewQuote> = raw
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                Some(NewQuote {
                    personality_id,
                    number: (index + 1) as i32,
                    content: line.to_string(),
                    upvotes: 0,
                    downvotes: 0,
                    created_at: now,
                    last_used: None,
                    use_count: 0,
                })
            })
            .collect();

        let mut conn = self.conn().await?;
        let loaded = conn
            .transaction::<usize, diesel::result::Error, _>(|conn| {
                async move {
                    for chunk in new_quotes.chunks(INSERT_CHUNK_SIZE) {
                        // diesel-async cannot execute SQLite batch inserts;
                        // run the same statement through sync diesel on the
                        // wrapped connection (stays in this transaction).
                        let chunk = chunk.to_vec();
                        conn.spawn_blocking(move |conn| {
                            diesel::RunQueryDsl::execute(
                                diesel::insert_into(quotes::table).values(chunk),
                                conn,
                            )
                        })
                        .await?;
                    }
                    let total: i64 = quotes::table
                        .filter(quotes::personality_id.eq(personality_id))
                        .count()
                        .get_result(conn)
                        .await?;
                    diesel::update(
                        personalities::table.filter(personalities::id.eq(personality_id)),
                    )
                    .set(personalities::quotes_count.eq(total as i32))
                    .execute(conn)
                    .await?;
                    Ok(total as usize)
                }
                .scope_boxed()
            })
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;

        tracing::info!(key, loaded, "Loaded quotes from file");
        Ok(loaded)
    }

    /// Deletes every quote, zeroes all quote counts and the stats cache
    /// (the sums it mirrors are zero once the quotes are gone), then reloads
    /// each known personality from its file. Not atomic across
    /// personalities: a failure partway leaves the earlier ones reloaded and
    /// the rest empty. Vote and command rows are untouched and keep
    /// referencing the old quote ids.
    pub async fn reload_all(&self, quotes_dir: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let now = now_ts();
        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            async move {
                diesel::delete(quotes::table).execute(conn).await?;
                diesel::update(personalities::table)
                    .set(personalities::quotes_count.eq(0))
                    .execute(conn)
                    .await?;
                diesel::update(stats::table)
                    .set((
                        stats::total_quotes_used.eq(0),
                        stats::total_upvotes.eq(0),
                        stats::total_downvotes.eq(0),
                        stats::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|e| QuotebookError::Store(e.to_string()))?;

        let rows: Vec<(i32, String)> = personalities::table
            .order(personalities::id.asc())
            .select((personalities::id, personalities::file_key))
            .load(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        drop(conn);

        for (id, file_key) in rows {
            self.load_quotes_from_file(id, &file_key, quotes_dir).await?;
        }
        tracing::info!("All quotes reloaded");
        Ok(())
    }

    /// Uniformly random quote over the stored rows, optionally scoped to one
    /// personality. On a hit the quote's `last_used`, `use_count` and the
    /// personality's `total_quotes_used` move together in one transaction.
    pub async fn random_quote(&self, personality_key: Option<&str>) -> Result<Option<Quote>> {
        let personality_id = match personality_key {
            Some(key) => match self.personality_id_by_key(key).await? {
                Some(id) => Some(id),
                None => return Ok(None),
            },
            None => None,
        };

        let mut conn = self.conn().await?;
        let now = now_ts();
        conn.transaction::<Option<Quote>, diesel::result::Error, _>(|conn| {
            async move {
                let total: i64 = match personality_id {
                    Some(id) => {
                        quotes::table
                            .filter(quotes::personality_id.eq(id))
                            .count()
                            .get_result(conn)
                            .await?
                    }
                    None => quotes::table.count().get_result(conn).await?,
                };
                if total == 0 {
                    return Ok(None);
                }

                let offset = rand::rng().random_range(0..total);
                let mut pick = quotes::table.into_boxed();
                if let Some(id) = personality_id {
                    pick = pick.filter(quotes::personality_id.eq(id));
                }
                let row: QuoteRow = pick
                    .order(quotes::id.asc())
                    .offset(offset)
                    .first(conn)
                    .await?;

                mark_used(conn, &row, now).await?;
                let quote = fetch_quote(conn, row.id).await?;
                Ok(quote)
            }
            .scope_boxed()
        })
        .await
        .map_err(|e| QuotebookError::Store(e.to_string()))
    }

    /// Exact lookup by personality key and ordinal. Same usage side effects
    /// as `random_quote` on a hit, none on a miss.
    pub async fn specific_quote(&self, personality_key: &str, number: i32) -> Result<Option<Quote>> {
        let personality_id = match self.personality_id_by_key(personality_key).await? {
            Some(id) => id,
            None => return Ok(None),
        };

        let mut conn = self.conn().await?;
        let now = now_ts();
        conn.transaction::<Option<Quote>, diesel::result::Error, _>(|conn| {
            async move {
                let row: Option<QuoteRow> = quotes::table
                    .filter(quotes::personality_id.eq(personality_id))
                    .filter(quotes::number.eq(number))
                    .first(conn)
                    .await
                    .optional()?;
                let row = match row {
                    Some(row) => row,
                    None => return Ok(None),
                };

                mark_used(conn, &row, now).await?;
                let quote = fetch_quote(conn, row.id).await?;
                Ok(quote)
            }
            .scope_boxed()
        })
        .await
        .map_err(|e| QuotebookError::Store(e.to_string()))
    }

    /// Plain fetch by id, no usage side effects.
    pub async fn quote_by_id(&self, quote_id: i32) -> Result<Option<Quote>> {
        let mut conn = self.conn().await?;
        fetch_quote(&mut conn, quote_id)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))
    }

    /// Upserts the (user, quote) vote. A fresh vote inserts a row and bumps
    /// the matching counter and stat; a repeat of the same value is a no-op;
    /// an opposite vote flips exactly one counter pair. All of it is one
    /// transaction with SQL-level increments, so concurrent votes cannot
    /// diverge the quote counters from the stats cache. Returns `None` when
    /// the quote does not exist.
    pub async fn record_vote(
        &self,
        user_id: &str,
        quote_id: i32,
        value: i32,
    ) -> Result<Option<VoteOutcome>> {
        if value != 1 && value != -1 {
            return Err(QuotebookError::Validation(format!(
                "vote must be 1 or -1, got {value}"
            )));
        }

        let mut conn = self.conn().await?;
        let now = now_ts();
        let user_id = user_id.to_string();
        conn.transaction::<Option<VoteOutcome>, diesel::result::Error, _>(|conn| {
            async move {
                let quote: Option<QuoteRow> = quotes::table
                    .filter(quotes::id.eq(quote_id))
                    .first(conn)
                    .await
                    .optional()?;
                let quote = match quote {
                    Some(quote) => quote,
                    None => return Ok(None),
                };

                let existing: Option<i32> = votes::table
                    .filter(votes::user_id.eq(&user_id))
                    .filter(votes::quote_id.eq(quote_id))
                    .select(votes::vote)
                    .first(conn)
                    .await
                    .optional()?;

                match existing {
                    None => {
                        diesel::insert_into(votes::table)
                            .values(&NewVote {
                                user_id: &user_id,
                                quote_id,
                                vote: value,
                                created_at: now,
                            })
                            .execute(conn)
                            .await?;
                        adjust_counters(conn, quote_id, quote.personality_id, value, 1, now)
                            .await?;
                    }
                    Some(prior) if prior == value => {}
                    Some(prior) => {
                        diesel::update(
                            votes::table
                                .filter(votes::user_id.eq(&user_id))
                                .filter(votes::quote_id.eq(quote_id)),
                        )
                        .set((votes::vote.eq(value), votes::created_at.eq(now)))
                        .execute(conn)
                        .await?;
                        adjust_counters(conn, quote_id, quote.personality_id, prior, -1, now)
                            .await?;
                        adjust_counters(conn, quote_id, quote.personality_id, value, 1, now)
                            .await?;
                    }
                }

                let (upvotes, downvotes): (i32, i32) = quotes::table
                    .filter(quotes::id.eq(quote_id))
                    .select((quotes::upvotes, quotes::downvotes))
                    .first(conn)
                    .await?;
                Ok(Some(VoteOutcome {
                    quote_id,
                    upvotes,
                    downvotes,
                    score: upvotes - downvotes,
                }))
            }
            .scope_boxed()
        })
        .await
        .map_err(|e| QuotebookError::Store(e.to_string()))
    }

    /// Append-only usage log. Callers on the quote-serving path log and
    /// swallow a failure here instead of failing the lookup.
    pub async fn record_command(
        &self,
        user_id: &str,
        command: &str,
        quote_id: Option<i32>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(commands::table)
            .values(&NewCommand {
                user_id,
                command,
                quote_id,
                created_at: now_ts(),
            })
            .execute(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(())
    }

    /// Substring search over quote content, case-insensitive for ASCII
    /// (SQLite `LIKE` semantics). LIKE wildcards in the needle are escaped
    /// so they match literally.
    pub async fn search_quotes(
        &self,
        query: &str,
        personality_key: Option<&str>,
    ) -> Result<Vec<Quote>> {
        let personality_id = match personality_key {
            Some(key) => match self.personality_id_by_key(key).await? {
                Some(id) => Some(id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let pattern = format!("%{}%", escape_like(query));
        let mut conn = self.conn().await?;
        let mut search = quotes::table
            .inner_join(personalities::table)
            .select((quotes::all_columns, personalities::name))
            .filter(quotes::content.like(pattern).escape('\\'))
            .into_boxed();
        if let Some(id) = personality_id {
            search = search.filter(quotes::personality_id.eq(id));
        }
        let rows: Vec<(QuoteRow, String)> = search
            .order(quotes::personality_id.asc())
            .then_order_by(quotes::number.asc())
            .load(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(row, name)| map_quote(row, name))
            .collect())
    }

    /// Quotes ordered by score (upvotes - downvotes) descending. Equal
    /// scores tie-break on quote id ascending so the order is deterministic.
    pub async fn top_quotes(&self, limit: i64) -> Result<Vec<Quote>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(QuoteRow, String)> = quotes::table
            .inner_join(personalities::table)
            .order((quotes::upvotes - quotes::downvotes).desc())
            .then_order_by(quotes::id.asc())
            .limit(limit)
            .select((quotes::all_columns, personalities::name))
            .load(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(row, name)| map_quote(row, name))
            .collect())
    }

    /// Quotes that have been served at least once, most recent first.
    pub async fn recent_quotes(&self, limit: i64) -> Result<Vec<Quote>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(QuoteRow, String)> = quotes::table
            .inner_join(personalities::table)
            .filter(quotes::last_used.is_not_null())
            .order(quotes::last_used.desc())
            .then_order_by(quotes::id.asc())
            .limit(limit)
            .select((quotes::all_columns, personalities::name))
            .load(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(row, name)| map_quote(row, name))
            .collect())
    }

    /// Command names with usage counts, most used first.
    pub async fn top_commands(&self, limit: i64) -> Result<Vec<CommandUsage>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(String, i64)> = commands::table
            .group_by(commands::command)
            .select((commands::command, count_star()))
            .order(count_star().desc())
            .limit(limit)
            .load(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(command, uses)| CommandUsage { command, uses })
            .collect())
    }

    /// Aggregate totals plus the cached per-personality stats snapshot.
    pub async fn statistics(&self) -> Result<Statistics> {
        let mut conn = self.conn().await?;
        let total_quotes: i64 = quotes::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        let total_commands: i64 = commands::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        let total_votes: i64 = votes::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;

        let rows: Vec<(String, i32, i32, i32, i32)> = personalities::table
            .inner_join(stats::table)
            .order(personalities::id.asc())
            .select((
                personalities::name,
                personalities::quotes_count,
                stats::total_quotes_used,
                stats::total_upvotes,
                stats::total_downvotes,
            ))
            .load(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;

        Ok(Statistics {
            total_quotes,
            total_commands,
            total_votes,
            personalities: rows
                .into_iter()
                .map(
                    |(name, quotes_count, total_quotes_used, total_upvotes, total_downvotes)| {
                        PersonalityStats {
                            name,
                            quotes_count,
                            total_quotes_used,
                            total_upvotes,
                            total_downvotes,
                        }
                    },
                )
                .collect(),
        })
    }

    async fn personality_id_by_key(&self, key: &str) -> Result<Option<i32>> {
        let mut conn = self.conn().await?;
        personalities::table
            .filter(personalities::file_key.eq(key))
            .select(personalities::id)
            .first::<i32>(&mut conn)
            .await
            .optional()
            .map_err(|e| QuotebookError::Store(e.to_string()))
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        diesel::sql_query("PRAGMA busy_timeout = 5000")
            .execute(&mut conn)
            .await
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok(conn)
    }
}

async fn mark_used(
    conn: &mut SqliteAsyncConn,
    row: &QuoteRow,
    now: i64,
) -> std::result::Result<(), diesel::result::Error> {
    diesel::update(quotes::table.filter(quotes::id.eq(row.id)))
        .set((
            quotes::last_used.eq(Some(now)),
            quotes::use_count.eq(quotes::use_count + 1),
        ))
        .execute(conn)
        .await?;
    diesel::update(stats::table.filter(stats::personality_id.eq(row.personality_id)))
        .set((
            stats::total_quotes_used.eq(stats::total_quotes_used + 1),
            stats::updated_at.eq(now),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

async fn adjust_counters(
    conn: &mut SqliteAsyncConn,
    quote_id: i32,
    personality_id: i32,
    vote_value: i32,
    delta: i32,
    now: i64,
) -> std::result::Result<(), diesel::result::Error> {
    if vote_value == 1 {
        diesel::update(quotes::table.filter(quotes::id.eq(quote_id)))
            .set(quotes::upvotes.eq(quotes::upvotes + delta))
            .execute(conn)
            .await?;
        diesel::update(stats::table.filter(stats::personality_id.eq(personality_id)))
            .set((
                stats::total_upvotes.eq(stats::total_upvotes + delta),
                stats::updated_at.eq(now),
            ))
            .execute(conn)
            .await?;
    } else {
        diesel::update(quotes::table.filter(quotes::id.eq(quote_id)))
            .set(quotes::downvotes.eq(quotes::downvotes + delta))
            .execute(conn)
            .await?;
        diesel::update(stats::table.filter(stats::personality_id.eq(personality_id)))
            .set((
                stats::total_downvotes.eq(stats::total_downvotes + delta),
                stats::updated_at.eq(now),
            ))
            .execute(conn)
            .await?;
    }
    Ok(())
}

async fn fetch_quote(
    conn: &mut SqliteAsyncConn,
    quote_id: i32,
) -> std::result::Result<Option<Quote>, diesel::result::Error> {
    let row: Option<(QuoteRow, String)> = quotes::table
        .inner_join(personalities::table)
        .filter(quotes::id.eq(quote_id))
        .select((quotes::all_columns, personalities::name))
        .first(conn)
        .await
        .optional()?;
    Ok(row.map(|(row, name)| map_quote(row, name)))
}

fn map_quote(row: QuoteRow, personality: String) -> Quote {
    Quote {
        id: row.id,
        personality,
        number: row.number,
        content: row.content,
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        score: row.upvotes - row.downvotes,
        created_at: row.created_at,
        last_used: row.last_used,
        use_count: row.use_count,
    }
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| QuotebookError::Store(e.to_string()))?;
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url)
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        diesel::RunQueryDsl::execute(diesel::sql_query("PRAGMA busy_timeout = 5000"), &mut conn)
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| QuotebookError::Store(e.to_string()))?;
        Ok::<_, QuotebookError>(())
    })
    .await
    .map_err(|e| QuotebookError::Store(e.to_string()))??;
    Ok(())
}
