pub mod device;
pub mod sync;

#[cfg(test)]
#[path = "device_test.rs"]
mod device_test;
