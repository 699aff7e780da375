pub mod client;
pub mod logging;
pub mod mock_client;
pub mod stream;
pub mod transport;

pub use client::{ApiClient, ByteStream, StreamProducer};
pub use stream::{decode_stream, FrameDecoder};
pub use transport::StreamTransport;
