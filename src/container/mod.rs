//! Self-describing container: a metadata header, a `Raw` compressed payload
//! checksummed with CRC-32, and a trailer holding that checksum and the
//! uncompressed size.

pub mod header;
pub mod inspect;
pub mod reader;
pub mod writer;

pub use header::{ContainerMeta, CONTAINER_MAGIC};
pub use inspect::{inspect, ContainerInfo};
pub use reader::ContainerReader;
pub use writer::{ContainerSummary, ContainerWriter, WriteOptions};
