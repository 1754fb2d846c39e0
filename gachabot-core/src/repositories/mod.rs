// gachabot-core/src/repositories/mod.rs

pub mod postgres;

pub use postgres::{
    PostgresBannerRepository, PostgresMedalRepository, PostgresPackHistoryRepository,
    PostgresThreadBindingRepository,
};
