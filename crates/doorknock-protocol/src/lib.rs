pub mod codec;
pub mod command;
pub mod decoder;
pub mod line;

pub use codec::KnockCodec;
pub use command::UnlockCommand;
pub use decoder::{DecoderState, DrainLines, LineDecoder};
pub use line::{DecodedLine, classify_line};
