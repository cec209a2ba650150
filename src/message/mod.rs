//! SNMP message framing.
//!
//! Only the community-based formats (v1 and v2c) are understood; anything
//! else is rejected during decode.

mod community;

pub use community::CommunityMessage;
