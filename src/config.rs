use std::net::{Ipv4Addr, SocketAddr};

use crate::account::Account;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TOKEN: &str = "test_token";

/// Runtime configuration for the wallet mock.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Shared secret used to verify requests and sign responses.
    pub secret: String,
    /// Honour the `skipSig` query flag. Disable outside of test setups.
    pub allow_skip_sig: bool,
    /// Sign error bodies as well as successful ones.
    pub sign_errors: bool,
    pub accounts: Vec<Account>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            secret: DEFAULT_TOKEN.to_string(),
            allow_skip_sig: true,
            sign_errors: false,
            accounts: vec![Account::seed()],
        }
    }
}
