mod buffer;
mod device;
mod loss;
mod packet;
mod transmission;

pub use buffer::Buffer;
pub use device::{CommonDevice, Device};
pub use loss::{NoPacketLoss, PacketLoss, RandomPacketLoss};
pub use packet::Packet;
pub use transmission::Transmission;
