use std::collections::HashMap;
use std::net::Ipv4Addr;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// A Boom server found on the local network.
/// Created once its mDNS record resolves; never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredHost {
    /// Service type it was advertised under, e.g. "_boom2._tcp.local."
    pub service_type: String,

    /// Full DNS-SD instance name, e.g. "Studio._boom2._tcp.local."
    pub service_name: String,

    /// Advertised hostname, e.g. "studio-mac.local."
    pub hostname: String,

    /// IPv4 address the server listens on
    pub address: Ipv4Addr,

    /// Remote control port
    pub port: u16,

    /// TXT record key-value pairs
    pub attributes: HashMap<String, String>,

    /// When the record was resolved
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredHost {
    /// Look up a filterable attribute by key.
    ///
    /// Record fields (`address`, `port`, `name`, `server`, `type`) shadow TXT
    /// properties of the same name.
    pub fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "address" => Some(Value::from(self.address.to_string())),
            "port" => Some(Value::from(self.port)),
            "name" => Some(Value::from(self.service_name.clone())),
            "server" => Some(Value::from(self.hostname.clone())),
            "type" => Some(Value::from(self.service_type.clone())),
            _ => self.attributes.get(key).map(|v| Value::from(v.clone())),
        }
    }

    /// `address:port`, ready for a TCP connect
    pub fn socket_addr(&self) -> std::net::SocketAddrV4 {
        std::net::SocketAddrV4::new(self.address, self.port)
    }
}

impl std::fmt::Display for DiscoveredHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}:{}", self.service_name, self.address, self.port)
    }
}

/// An equalizer preset as the server describes it.
///
/// `payload` is the server's own JSON object, echoed back verbatim when the
/// preset is activated; only the name is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub payload: Value,
}

impl Preset {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self { name: name.into(), payload }
    }

    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}
