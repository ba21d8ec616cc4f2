//! SQL schema for the Goal Line Report SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Accounts ────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS accounts (
    account_id    TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- Exactly one row per account, written in the same transaction.
CREATE TABLE IF NOT EXISTS profiles (
    account_id     TEXT PRIMARY KEY REFERENCES accounts(account_id) ON DELETE CASCADE,
    role           TEXT NOT NULL DEFAULT 'customer', -- 'customer' | 'editor' | 'chief_editor'
    verified       INTEGER NOT NULL DEFAULT 0,
    specialization TEXT,
    bio            TEXT,
    website        TEXT,
    phone          TEXT,
    updated_at     TEXT NOT NULL
);

-- ── Stories ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS stories (
    story_id     TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    slug         TEXT NOT NULL UNIQUE,
    body         TEXT NOT NULL,
    summary      TEXT NOT NULL DEFAULT '',
    status       TEXT NOT NULL DEFAULT 'draft',
    author_id    TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    published_at TEXT,            -- set once, never cleared
    reviewed_by  TEXT REFERENCES accounts(account_id) ON DELETE SET NULL,
    reviewed_at  TEXT,
    review_notes TEXT,
    views_count  INTEGER NOT NULL DEFAULT 0,
    likes_count  INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chapters (
    chapter_id TEXT PRIMARY KEY,
    story_id   TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    body       TEXT NOT NULL,
    media      TEXT NOT NULL DEFAULT '[]', -- JSON array of references
    position   INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (story_id, position)
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id TEXT PRIMARY KEY,
    name   TEXT NOT NULL UNIQUE,
    slug   TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS story_tags (
    story_id TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    tag_id   TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    PRIMARY KEY (story_id, tag_id)
);

CREATE TABLE IF NOT EXISTS story_likes (
    story_id   TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    account_id TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (story_id, account_id)
);

-- Append-only impression log.
CREATE TABLE IF NOT EXISTS story_views (
    view_id    TEXT PRIMARY KEY,
    story_id   TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    account_id TEXT REFERENCES accounts(account_id) ON DELETE SET NULL,
    ip_address TEXT,
    viewed_at  TEXT NOT NULL
);

-- ── Comments ────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    story_id   TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    author_id  TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    body       TEXT NOT NULL,
    parent_id  TEXT REFERENCES comments(comment_id) ON DELETE CASCADE,
    active     INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comment_likes (
    comment_id TEXT NOT NULL REFERENCES comments(comment_id) ON DELETE CASCADE,
    account_id TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (comment_id, account_id)
);

-- ── Subscribers ─────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS subscribers (
    subscriber_id TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    account_id    TEXT REFERENCES accounts(account_id) ON DELETE SET NULL,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- ── Feeds ───────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS feed_sources (
    source_id    TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    kind         TEXT NOT NULL UNIQUE,
    feed_url     TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 1,
    last_fetched TEXT,
    created_at   TEXT NOT NULL
);

-- guid is the dedup key across every source; comparison is case-sensitive.
CREATE TABLE IF NOT EXISTS feed_items (
    item_id      TEXT PRIMARY KEY,
    source_id    TEXT NOT NULL REFERENCES feed_sources(source_id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    content      TEXT NOT NULL DEFAULT '',
    link         TEXT NOT NULL,
    author       TEXT NOT NULL DEFAULT '',
    category     TEXT NOT NULL DEFAULT '',
    guid         TEXT NOT NULL UNIQUE,
    published_at TEXT NOT NULL,
    fetched_at   TEXT NOT NULL,
    is_read      INTEGER NOT NULL DEFAULT 0,
    is_archived  INTEGER NOT NULL DEFAULT 0
);

-- Immutable; one row per fetch attempt.
CREATE TABLE IF NOT EXISTS fetch_logs (
    log_id        TEXT PRIMARY KEY,
    source_id     TEXT NOT NULL REFERENCES feed_sources(source_id) ON DELETE CASCADE,
    status        TEXT NOT NULL,   -- 'success' | 'partial' | 'error'
    items_fetched INTEGER NOT NULL DEFAULT 0,
    items_new     INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    duration_secs REAL NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS stories_status_idx      ON stories(status);
CREATE INDEX IF NOT EXISTS stories_author_idx      ON stories(author_id);
CREATE INDEX IF NOT EXISTS comments_story_idx      ON comments(story_id);
CREATE INDEX IF NOT EXISTS feed_items_pub_idx      ON feed_items(published_at);
CREATE INDEX IF NOT EXISTS feed_items_source_idx   ON feed_items(source_id, published_at);
CREATE INDEX IF NOT EXISTS feed_items_read_idx     ON feed_items(is_read);
CREATE INDEX IF NOT EXISTS feed_items_archived_idx ON feed_items(is_archived);
CREATE INDEX IF NOT EXISTS fetch_logs_created_idx  ON fetch_logs(created_at);

PRAGMA user_version = 1;
";
