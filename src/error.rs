use thiserror::Error;

use crate::cooldown::Remaining;

/// Failures of the backing store. Always a hard failure for the request.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a game action can refuse with. All variants but `Persistence`
/// are expected outcomes that turn into a friendly reply.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("no cards available")]
    CatalogEmpty,

    #[error("cooldown active, {0} remaining")]
    CooldownActive(Remaining),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: i64, available: i64 },

    #[error("stake must be a positive whole number")]
    InvalidWagerAmount,

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<std::io::Error> for GameError {
    fn from(err: std::io::Error) -> Self {
        GameError::Persistence(err.into())
    }
}

pub type GameResult<T> = Result<T, GameError>;
