pub mod decode;
pub mod encode;
pub mod layout;
pub mod roundtrip;
pub mod status;
