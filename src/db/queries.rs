//! SQL query constants
//!
//! Contains all SQL statements issued against the policies table.

/// Connectivity check
pub const PING: &str = "SELECT 1";

/// Insert a policy or refresh the existing row with the same name.
/// `version` is bumped by the table's update trigger.
pub const UPSERT_POLICY: &str = r#"
    INSERT INTO policies (name, path, content, metadata, created_by, active)
    VALUES ($1, $2, $3, $4, $5, true)
    ON CONFLICT (name) DO UPDATE SET
        content = EXCLUDED.content,
        metadata = EXCLUDED.metadata,
        updated_at = NOW(),
        active = true
    RETURNING id::text AS id, version::bigint AS version
"#;

/// Aggregate statistics over the policies table
pub const POLICY_STATS: &str = r#"
    SELECT
        COUNT(*) AS total_policies,
        COUNT(*) FILTER (WHERE active = true) AS active_policies,
        COUNT(*) FILTER (WHERE active = false) AS inactive_policies,
        MAX(updated_at)::timestamptz AS last_updated
    FROM policies
"#;

pub const BEGIN: &str = "BEGIN";
pub const COMMIT: &str = "COMMIT";
pub const ROLLBACK: &str = "ROLLBACK";

/// Savepoint wrapping a single policy upsert
pub const SAVEPOINT: &str = "SAVEPOINT policy_item";
pub const RELEASE_SAVEPOINT: &str = "RELEASE SAVEPOINT policy_item";
pub const ROLLBACK_TO_SAVEPOINT: &str = "ROLLBACK TO SAVEPOINT policy_item";

/// Create the policies table and its version trigger if missing
pub const ENSURE_POLICIES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS policies (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) UNIQUE NOT NULL,
        path TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_by VARCHAR(255),
        active BOOLEAN NOT NULL DEFAULT true,
        version INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );

    CREATE OR REPLACE FUNCTION policies_bump_version() RETURNS trigger AS $$
    BEGIN
        NEW.version := OLD.version + 1;
        RETURN NEW;
    END;
    $$ LANGUAGE plpgsql;

    DROP TRIGGER IF EXISTS policies_bump_version ON policies;
    CREATE TRIGGER policies_bump_version
        BEFORE UPDATE ON policies
        FOR EACH ROW EXECUTE FUNCTION policies_bump_version();
"#;
