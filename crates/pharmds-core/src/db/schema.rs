//! SQLite schema definition.

/// Complete database schema for pharmds.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Reference registries
-- ============================================================================

CREATE TABLE IF NOT EXISTS enzyme (
    id TEXT PRIMARY KEY,
    family TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS transporter (
    id TEXT PRIMARY KEY,
    family TEXT,
    description TEXT
);

CREATE TABLE IF NOT EXISTS pd_effect (
    id TEXT PRIMARY KEY,
    description TEXT
);

-- ============================================================================
-- Drugs
-- ============================================================================

CREATE TABLE IF NOT EXISTS drug (
    id TEXT PRIMARY KEY,
    generic_name TEXT NOT NULL,
    drug_class TEXT,
    therapeutic_index TEXT NOT NULL CHECK (therapeutic_index IN ('wide', 'moderate', 'narrow')),
    notes TEXT
);

CREATE TABLE IF NOT EXISTS drug_alias (
    drug_id TEXT NOT NULL REFERENCES drug(id),
    alias TEXT NOT NULL,
    PRIMARY KEY (drug_id, alias)
);

CREATE INDEX IF NOT EXISTS idx_drug_alias_alias ON drug_alias(alias);
CREATE INDEX IF NOT EXISTS idx_drug_generic_name ON drug(generic_name);

-- ============================================================================
-- Mechanistic roles
-- ============================================================================

CREATE TABLE IF NOT EXISTS drug_enzyme_role (
    drug_id TEXT NOT NULL REFERENCES drug(id),
    enzyme_id TEXT NOT NULL REFERENCES enzyme(id),
    role TEXT NOT NULL CHECK (role IN ('substrate', 'inhibitor', 'inducer')),
    strength TEXT CHECK (strength IN ('weak', 'moderate', 'strong')),
    fraction_metabolized REAL CHECK (fraction_metabolized BETWEEN 0.0 AND 1.0),
    notes TEXT,
    PRIMARY KEY (drug_id, enzyme_id, role)
);

CREATE TABLE IF NOT EXISTS drug_transporter_role (
    drug_id TEXT NOT NULL REFERENCES drug(id),
    transporter_id TEXT NOT NULL REFERENCES transporter(id),
    role TEXT NOT NULL CHECK (role IN ('substrate', 'inhibitor', 'inducer')),
    strength TEXT CHECK (strength IN ('weak', 'moderate', 'strong')),
    notes TEXT,
    PRIMARY KEY (drug_id, transporter_id, role)
);

CREATE TABLE IF NOT EXISTS drug_pd_effect (
    drug_id TEXT NOT NULL REFERENCES drug(id),
    pd_effect_id TEXT NOT NULL REFERENCES pd_effect(id),
    direction TEXT NOT NULL CHECK (direction IN ('increase', 'decrease')),
    magnitude TEXT NOT NULL CHECK (magnitude IN ('low', 'medium', 'high')),
    mechanism_note TEXT,
    PRIMARY KEY (drug_id, pd_effect_id)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {result:?}");
    }

    #[test]
    fn test_therapeutic_index_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let bad = conn.execute(
            "INSERT INTO drug (id, generic_name, therapeutic_index) VALUES ('x', 'x', 'huge')",
            [],
        );
        assert!(bad.is_err());

        let good = conn.execute(
            "INSERT INTO drug (id, generic_name, therapeutic_index) VALUES ('x', 'x', 'narrow')",
            [],
        );
        assert!(good.is_ok());
    }

    #[test]
    fn test_enzyme_role_requires_known_enzyme() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO drug (id, generic_name, therapeutic_index) VALUES ('w', 'w', 'narrow')",
            [],
        )
        .unwrap();

        let orphan = conn.execute(
            "INSERT INTO drug_enzyme_role (drug_id, enzyme_id, role) VALUES ('w', 'CYP9Z9', 'substrate')",
            [],
        );
        assert!(orphan.is_err());

        conn.execute(
            "INSERT INTO enzyme (id, family) VALUES ('CYP2C9', 'CYP')",
            [],
        )
        .unwrap();
        let valid = conn.execute(
            "INSERT INTO drug_enzyme_role (drug_id, enzyme_id, role) VALUES ('w', 'CYP2C9', 'substrate')",
            [],
        );
        assert!(valid.is_ok());
    }

    #[test]
    fn test_fraction_metabolized_bounds() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO drug (id, generic_name, therapeutic_index) VALUES ('w', 'w', 'narrow')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO enzyme (id, family) VALUES ('CYP2C9', 'CYP')", [])
            .unwrap();

        let out_of_range = conn.execute(
            "INSERT INTO drug_enzyme_role (drug_id, enzyme_id, role, fraction_metabolized)
             VALUES ('w', 'CYP2C9', 'substrate', 1.5)",
            [],
        );
        assert!(out_of_range.is_err());
    }
}
