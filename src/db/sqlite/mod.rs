//! SQLite implementation of the data layer traits.

mod connection;
mod device;
mod dump;
mod helpers;

#[cfg(test)]
mod connection_test;
#[cfg(test)]
mod device_test;

pub use connection::SqliteDatabase;
pub use device::SqliteDeviceRepository;
