// gachabot-common/src/traits/mod.rs

pub mod collaborators;
pub mod repository_traits;

pub use collaborators::{Notifier, SnapshotSource};
pub use repository_traits::{
    BannerRepository, MedalRepository, PackHistoryRepository, ThreadBindingRepository,
};
