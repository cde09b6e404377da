use std::collections::BTreeMap;

use crate::{
    api::shine::{Api, Error},
    core::reading::NormalizedReading,
    prelude::*,
};

/// One polling cycle's output: the previous cycle's map is replaced
/// wholesale, never merged.
pub type Readings = BTreeMap<String, NormalizedReading>;

/// Drives one full refresh per cycle: session, device list, then one
/// snapshot per serial, strictly sequential.
pub struct Poller {
    api: Api,
}

impl Poller {
    pub const fn new(api: Api) -> Self {
        Self { api }
    }

    /// Run one cycle.
    ///
    /// A failing per-device snapshot only skips that device. Extraction and
    /// authentication failures abort the whole cycle: without a session
    /// there is nothing partial worth reporting.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<Readings, Error> {
        self.api.ensure_logged_in().await?;
        let devices = self.api.list_devices().await?;

        let mut readings = Readings::new();
        for device in devices {
            match self.api.get_snapshot(&device.serial_number).await {
                Ok(snapshot) => {
                    let reading = NormalizedReading::from_snapshot(device.serial_number, &snapshot);
                    readings.insert(reading.serial_number.clone(), reading);
                }
                Err(error @ (Error::Extraction(_) | Error::Authentication(_))) => {
                    return Err(error);
                }
                Err(error) => {
                    warn!(serial_number = %device.serial_number, %error, "skipping the device");
                }
            }
        }
        Ok(readings)
    }
}
