pub mod rotator;

pub use rotator::{LogoutOutcome, RefreshTokenRotator, TokenPair, UserIdentity};
