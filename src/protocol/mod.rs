pub mod capabilities;
pub mod charset;
pub mod codec;
pub mod column;
pub mod err;
pub mod message;
pub mod packet;
pub mod resultset;
pub mod splitter;
pub mod writer;

pub use codec::{OutboundPacket, PacketEncoder};
pub use packet::{CodecContext, PacketHeader};
pub use splitter::{PacketSplitter, MAX_PACKET_SIZE};
pub use writer::PayloadWriter;
