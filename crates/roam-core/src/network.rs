//! Network-class oracle.
//!
//! The engine never probes links itself; the embedding application tells it
//! what connectivity it currently has, and the auto-update gate reads that
//! answer at check time. `FixedNetwork` is the settable implementation the
//! CLI and tests use.

use std::sync::RwLock;

/// Connectivity as reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkClass {
    Wifi,
    Cellular,
    Offline,
}

impl NetworkClass {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkClass::Wifi => "wifi",
            NetworkClass::Cellular => "cellular",
            NetworkClass::Offline => "offline",
        }
    }
}

/// Source of the current network class.
pub trait NetworkMonitor: Send + Sync {
    fn network_class(&self) -> NetworkClass;
}

/// Holds a class set by the host; defaults to wifi.
pub struct FixedNetwork {
    class: RwLock<NetworkClass>,
}

impl FixedNetwork {
    pub fn new(class: NetworkClass) -> Self {
        FixedNetwork {
            class: RwLock::new(class),
        }
    }

    pub fn set(&self, class: NetworkClass) {
        if let Ok(mut slot) = self.class.write() {
            *slot = class;
        }
    }
}

impl Default for FixedNetwork {
    fn default() -> Self {
        FixedNetwork::new(NetworkClass::Wifi)
    }
}

impl NetworkMonitor for FixedNetwork {
    fn network_class(&self) -> NetworkClass {
        self.class
            .read()
            .map(|slot| *slot)
            .unwrap_or(NetworkClass::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_network_reports_the_set_class() {
        let network = FixedNetwork::default();
        assert_eq!(network.network_class(), NetworkClass::Wifi);
        network.set(NetworkClass::Cellular);
        assert_eq!(network.network_class(), NetworkClass::Cellular);
    }
}
