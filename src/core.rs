pub mod poller;
pub mod reading;
