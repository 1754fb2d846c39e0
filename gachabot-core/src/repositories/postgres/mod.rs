// gachabot-core/src/repositories/postgres/mod.rs

pub mod banner;
pub mod medal;
pub mod pack_history;
pub mod thread_binding;

pub use banner::PostgresBannerRepository;
pub use medal::PostgresMedalRepository;
pub use pack_history::PostgresPackHistoryRepository;
pub use thread_binding::PostgresThreadBindingRepository;

use gachabot_common::{DuplicateKind, Error};

/// Postgres signals a uniqueness collision with SQLSTATE 23505. Those are
/// expected on the claim and binding paths and become `Error::Duplicate`;
/// everything else stays a database error.
pub(crate) fn map_unique_violation(e: sqlx::Error, kind: DuplicateKind) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505") {
            return Error::Duplicate(kind);
        }
    }
    Error::Database(e)
}
