//! Built-in vendor platform definitions.

pub mod arista;
pub mod cisco;
pub mod huawei;
pub mod juniper;
pub mod linux;
pub mod nokia_sros;
