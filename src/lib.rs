pub mod schema;
pub mod header;
pub mod crypto;
pub mod hash;
pub mod database;
pub mod io_stream;
pub mod archive;

pub use header::{MixHeader, HeaderRecord, HeaderFlags};
pub use crypto::{PublicKey, recover_key};
pub use hash::file_id;
pub use database::{MixDatabase, DatabaseEntry};
pub use io_stream::{MixReader, MixError, decode_header};
