use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Session is not running, taps are ignored")]
    NotPlaying,
}

pub type Result<T> = core::result::Result<T, GameError>;
