mod enums;
mod header;
mod message;
mod question;
mod wire;

pub use enums::{Rcode, ResourceClass, ResourceType};
pub use header::Header;
pub use message::Message;
pub use question::Question;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer truncated")]
    Truncated(#[from] std::io::Error),
    #[error("invalid label")]
    InvalidLabel,
    #[error("label compression pointer loop")]
    LabelLoop,
}
