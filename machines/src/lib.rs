pub mod colecovision;
pub mod gamepad;
pub mod mapper;
pub mod rom_loader;
pub mod sg1000;
pub mod sms;

pub use colecovision::ColecoVisionSystem;
pub use sg1000::Sg1000System;
pub use sms::SmsSystem;
