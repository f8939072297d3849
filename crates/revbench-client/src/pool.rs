//! Connection fan-out for benchmark clients
//!
//! `conns` transports are opened round-robin over the endpoints, and
//! `clients` protocol clients share those transports round-robin. Every
//! client is independent; a transport may carry several clients' calls at once.

use std::sync::Arc;

use crate::client::{ClientError, KvClient};
use crate::transport::{CallPolicy, GrpcTransport, KvTransport};

/// Fan-out configuration
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Store members, `host:port` or full URIs
    pub endpoints: Vec<String>,
    /// Number of underlying connections
    pub conns: usize,
    /// Number of protocol clients
    pub clients: usize,
    /// Policy applied to every connection
    pub policy: CallPolicy,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["127.0.0.1:2379".to_string()],
            conns: 1,
            clients: 1,
            policy: CallPolicy::default(),
        }
    }
}

impl FanoutConfig {
    /// Create a fan-out config for the given endpoints
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set number of connections
    pub fn conns(mut self, conns: usize) -> Self {
        self.conns = conns;
        self
    }

    /// Set number of clients
    pub fn clients(mut self, clients: usize) -> Self {
        self.clients = clients;
        self
    }

    /// Set call policy
    pub fn policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.endpoints.is_empty() {
            return Err(ClientError::Config("no endpoints given".to_string()));
        }
        if self.conns < self.endpoints.len() {
            return Err(ClientError::Config(format!(
                "conns ({}) < len(endpoints) ({})",
                self.conns,
                self.endpoints.len()
            )));
        }
        if self.clients == 0 {
            return Err(ClientError::Config("clients must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Index of the shared item each of `n` users gets, cycling over `len` items
pub fn round_robin(n: usize, len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    (0..n).map(|i| i % len).collect()
}

/// Transports plus the clients sharing them
#[derive(Debug, Clone)]
pub struct ClientSet {
    clients: Vec<KvClient>,
    conns: usize,
}

impl ClientSet {
    /// Open `config.conns` transports and build `config.clients` clients on them
    pub async fn connect(config: &FanoutConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let mut transports: Vec<Arc<dyn KvTransport>> = Vec::with_capacity(config.conns);
        for idx in round_robin(config.conns, config.endpoints.len()) {
            let transport = GrpcTransport::connect(&config.endpoints[idx], config.policy.clone()).await?;
            transports.push(Arc::new(transport));
        }

        tracing::info!(
            endpoints = config.endpoints.len(),
            conns = config.conns,
            clients = config.clients,
            "connections ready"
        );
        Self::from_transports(transports, config.clients)
    }

    /// Share already-built transports between `clients` clients
    pub fn from_transports(
        transports: Vec<Arc<dyn KvTransport>>,
        clients: usize,
    ) -> Result<Self, ClientError> {
        if transports.is_empty() {
            return Err(ClientError::Config("no transports given".to_string()));
        }
        if clients == 0 {
            return Err(ClientError::Config("clients must be at least 1".to_string()));
        }

        let clients = round_robin(clients, transports.len())
            .into_iter()
            .map(|idx| KvClient::new(Arc::clone(&transports[idx])))
            .collect();
        Ok(Self {
            clients,
            conns: transports.len(),
        })
    }

    pub fn clients(&self) -> &[KvClient] {
        &self.clients
    }

    pub fn into_clients(self) -> Vec<KvClient> {
        self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Number of distinct transports
    pub fn conns(&self) -> usize {
        self.conns
    }
}
