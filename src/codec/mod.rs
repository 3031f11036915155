//! The codec module contains the wire-level pieces of the OpenThings
//! protocol: CRC, body whitening, the parameter database, record parsing,
//! command record encoding and whole-frame build/decode.

pub mod cipher;
pub mod command;
pub mod crc;
pub mod frame;
pub mod params;
pub mod record;

pub use cipher::Cipher;
pub use command::encode_command;
pub use crc::{calculate_crc, verify_crc};
pub use frame::{build_frame, build_frame_with_pip, join_ack_frame, VerifiedFrame};
pub use params::param_name;
pub use record::{binary_point, parse_records, Record, RecordValue};
