//! SQL schema for the Rolo SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS cards (
    card_id           TEXT PRIMARY KEY,
    submitted_by      TEXT NOT NULL,
    shared            INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,   -- RFC 3339 UTC; server-assigned
    original_filename TEXT,

    name              TEXT,
    company           TEXT,
    designation       TEXT,
    email             TEXT,            -- stored lower-cased
    phone             TEXT,
    address           TEXT,
    website           TEXT,
    additional_info   TEXT,

    -- Case-folded comparison keys, rewritten with every field update.
    name_key          TEXT,
    company_key       TEXT
);

CREATE INDEX IF NOT EXISTS cards_submitter_idx ON cards(submitted_by);
CREATE INDEX IF NOT EXISTS cards_shared_idx    ON cards(shared);
CREATE INDEX IF NOT EXISTS cards_email_idx     ON cards(submitted_by, email);
CREATE INDEX IF NOT EXISTS cards_phone_idx     ON cards(submitted_by, phone);
CREATE INDEX IF NOT EXISTS cards_person_idx    ON cards(submitted_by, name_key, company_key);

PRAGMA user_version = 1;
";
