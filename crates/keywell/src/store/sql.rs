//! Logical statement text for relational counter stores.
//!
//! Drivers implementing [`CounterStore`] over a real database issue these
//! statements, adapting the named placeholders (`:name`, `:value`, `:next`,
//! `:previous`) to whatever parameter syntax their connection expects. The
//! conditional update carries the whole cross-process protocol: success is
//! defined as exactly one affected row, and an affected-row count of zero is
//! the conflict signal, never an error.
//!
//! [`CounterStore`]: crate::CounterStore

/// DDL for the shared counter table, one row per counter name.
pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS KeyGen (\
     key_name TEXT PRIMARY KEY, \
     key_value INTEGER NOT NULL)";

/// Reads the next unissued value for a counter row.
pub const SELECT_VALUE: &str = "SELECT key_value FROM KeyGen WHERE key_name = :name";

/// Creates a counter row on first use. A unique-key violation on `key_name`
/// means another allocator created the row first.
pub const INSERT_ROW: &str = "INSERT INTO KeyGen (key_name, key_value) VALUES (:name, :value)";

/// The conditional range reservation. Affects one row iff the stored value
/// still matches what this transaction read.
pub const CAS_UPDATE: &str =
    "UPDATE KeyGen SET key_value = :next WHERE key_name = :name AND key_value = :previous";
