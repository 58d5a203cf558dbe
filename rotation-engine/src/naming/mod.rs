//! Channel naming and hashing
//!
//! Derived channel names are content addressed: the trailing hash is a SHA-256
//! over a canonical JSON rendering of a representative channel.

pub mod factory;
pub mod hash;
pub mod names;

pub use factory::ChannelFactory;
pub use hash::{channel_hash_input, generate_channel_hash};
pub use names::{
    build_beamed_channel_description, build_beamed_channel_name, build_filtered_channel_name,
    build_masked_channel_name, build_rotated_channel_description, build_rotated_channel_name,
    build_temporary_channel_name,
};
