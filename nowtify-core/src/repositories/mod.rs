// nowtify-core/src/repositories/mod.rs

pub use nowtify_common::traits::repository_traits::{
    ConfigRepository,
    HistoryRepository,
    StreamerRepository,
    TeamLogoRepository,
};

pub use sqlite::app_config::SqliteConfigRepository;
pub use sqlite::history::SqliteHistoryRepository;
pub use sqlite::streamers::SqliteStreamerRepository;
pub use sqlite::team_logos::SqliteTeamLogoRepository;

pub mod sqlite;
