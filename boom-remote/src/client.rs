use boom_shared::types::DiscoveredHost;
use crate::config::{Config, DiscoveryConfig};
use crate::error::{BoomError, Result};
use crate::mdns;
use crate::session::{Session, SessionState};
use crate::state::{PresetChange, RemoteState};

/// A connected Boom remote: the host picked from discovery, the open session
/// and the preset snapshot taken during the handshake.
pub struct Boom {
    hosts: Vec<DiscoveredHost>,
    session: Session,
    state: RemoteState,
}

impl Boom {
    /// Discover Boom servers and connect to the first one found.
    pub async fn discover_and_connect(config: &Config) -> Result<Self> {
        let discovery = &config.discovery;
        let hosts = mdns::find_hosts(
            discovery.scan_delay(),
            discovery.max_wait(),
            &discovery.filters,
        )
        .await?;

        let host = first_host(&hosts, discovery)?.clone();
        tracing::info!("Using first Boom host found: {}", host);

        let mut boom = Self::connect(&host, config).await?;
        boom.hosts = hosts;
        Ok(boom)
    }

    /// Connect to a known host, skipping discovery.
    pub async fn connect(host: &DiscoveredHost, config: &Config) -> Result<Self> {
        let mut session: Session = Session::new(config.client.name.clone(), config.client.read_timeout());
        let state = session.connect(host).await?;
        Ok(Self {
            hosts: vec![host.clone()],
            session,
            state,
        })
    }

    /// Every host discovery returned; the first is the one in use
    pub fn hosts(&self) -> &[DiscoveredHost] {
        &self.hosts
    }

    pub fn host(&self) -> Option<&DiscoveredHost> {
        self.session.peer()
    }

    pub fn state(&self) -> &RemoteState {
        &self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Activate the preset called `name` (case-insensitive).
    pub async fn set_preset(&mut self, name: &str) -> Result<PresetChange> {
        self.state.set_active_preset(name, &mut self.session).await
    }

    pub async fn close(&mut self) {
        self.session.close().await;
    }
}

/// The host to connect to, or the timeout that discovery ran into.
///
/// Unfiltered discovery only ever waits the scan delay; with filters it gives
/// up at the max wait.
fn first_host<'a>(hosts: &'a [DiscoveredHost], discovery: &DiscoveryConfig) -> Result<&'a DiscoveredHost> {
    hosts.first().ok_or_else(|| {
        let waited = if discovery.filters.is_empty() {
            discovery.scan_delay()
        } else {
            discovery.max_wait()
        };
        BoomError::DiscoveryTimeout { waited }
    })
}
