pub mod device;
pub mod mount;
