//! SoftAP adapter.
//!
//! Implements [`AccessPointPort`]; the phone joins this network and
//! reaches the WebSocket at the AP's gateway address (192.168.4.1).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi` in access-point mode.
//! - **all other targets**: simulation with failure injection for host tests.

use log::info;
#[cfg(target_os = "espidf")]
use log::{error, warn};

use crate::app::ports::AccessPointPort;
use crate::config::LinkConfig;
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration, EspWifi,
};

pub struct SoftAp {
    up: bool,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: fail the next `start()` call.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: bool,
    /// Simulation: number of successful starts.
    #[cfg(not(target_os = "espidf"))]
    sim_starts: u32,
}

#[cfg(target_os = "espidf")]
impl SoftAp {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self { up: false, wifi }
    }

    fn platform_start(&mut self, config: &LinkConfig) -> Result<(), TransportError> {
        let auth_method = if config.ap_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let ap = AccessPointConfiguration {
            ssid: config
                .ap_ssid
                .as_str()
                .try_into()
                .map_err(|_| TransportError::ApStartFailed)?,
            password: config
                .ap_password
                .as_str()
                .try_into()
                .map_err(|_| TransportError::ApStartFailed)?,
            channel: config.ap_channel,
            auth_method,
            max_connections: config.ap_max_stations,
            ..Default::default()
        };

        self.wifi
            .set_configuration(&Configuration::AccessPoint(ap))
            .map_err(|e| {
                error!("SoftAP: configuration rejected: {e}");
                TransportError::ApStartFailed
            })?;
        self.wifi.start().map_err(|e| {
            error!("SoftAP: start failed: {e}");
            TransportError::ApStartFailed
        })?;
        if let Err(e) = self.wifi.wait_netif_up() {
            error!("SoftAP: netif did not come up: {e}");
            let _ = self.wifi.stop();
            return Err(TransportError::ApStartFailed);
        }
        if let Ok(ip) = self.wifi.wifi().ap_netif().get_ip_info() {
            info!("SoftAP: gateway {}", ip.ip);
        }
        Ok(())
    }

    fn platform_stop(&mut self) {
        if let Err(e) = self.wifi.stop() {
            warn!("SoftAP: stop failed: {e}");
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SoftAp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl SoftAp {
    pub fn new() -> Self {
        Self {
            up: false,
            sim_fail_next: false,
            sim_starts: 0,
        }
    }

    /// Make the next `start()` fail, as a radio fault would.
    pub fn fail_next_start(&mut self) {
        self.sim_fail_next = true;
    }

    pub fn starts(&self) -> u32 {
        self.sim_starts
    }

    fn platform_start(&mut self, config: &LinkConfig) -> Result<(), TransportError> {
        if core::mem::take(&mut self.sim_fail_next) {
            return Err(TransportError::ApStartFailed);
        }
        self.sim_starts += 1;
        info!(
            "SoftAP(sim): '{}' on channel {}, max {} stations",
            config.ap_ssid, config.ap_channel, config.ap_max_stations
        );
        Ok(())
    }

    fn platform_stop(&mut self) {}
}

impl AccessPointPort for SoftAp {
    fn start(&mut self, config: &LinkConfig) -> Result<(), TransportError> {
        if self.up {
            return Ok(());
        }
        self.platform_start(config)?;
        self.up = true;
        info!("SoftAP: '{}' up", config.ap_ssid);
        Ok(())
    }

    fn stop(&mut self) {
        if !self.up {
            return;
        }
        self.platform_stop();
        self.up = false;
        info!("SoftAP: down");
    }

    fn is_up(&self) -> bool {
        self.up
    }
}
