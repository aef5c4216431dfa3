//! Name lookup for the bundled plugins.
//!
//! Every name, aliases included, is an explicit entry built when the registry
//! is created. An alias resolves to the same plugin as its canonical name.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantKind {
    Code,
    Token,
}

impl GrantKind {
    /// The `response_type` the grant answers to.
    pub fn response_type(self) -> &'static str {
        match self {
            GrantKind::Code => "code",
            GrantKind::Token => "token",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    AuthorizationCode,
    ClientCredentials,
    Password,
    RefreshToken,
}

impl ExchangeKind {
    /// The `grant_type` the exchange answers to.
    pub fn grant_type(self) -> &'static str {
        match self {
            ExchangeKind::AuthorizationCode => "authorization_code",
            ExchangeKind::ClientCredentials => "client_credentials",
            ExchangeKind::Password => "password",
            ExchangeKind::RefreshToken => "refresh_token",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plugin {
    Grant(GrantKind),
    Exchange(ExchangeKind),
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::Grant(kind) => write!(f, "grant:{}", kind.response_type()),
            Plugin::Exchange(kind) => write!(f, "exchange:{}", kind.grant_type()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PluginRegistry {
    grants: BTreeMap<String, GrantKind>,
    exchanges: BTreeMap<String, ExchangeKind>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            grants: BTreeMap::new(),
            exchanges: BTreeMap::new(),
        };
        for kind in [GrantKind::Code, GrantKind::Token] {
            registry.alias_grant(kind.response_type(), kind);
        }
        registry.alias_grant("authorization_code", GrantKind::Code);
        registry.alias_grant("implicit", GrantKind::Token);

        for kind in [
            ExchangeKind::AuthorizationCode,
            ExchangeKind::ClientCredentials,
            ExchangeKind::Password,
            ExchangeKind::RefreshToken,
        ] {
            registry.alias_exchange(kind.grant_type(), kind);
        }
        registry.alias_exchange("code", ExchangeKind::AuthorizationCode);
        registry
    }

    /// Add another name for a grant. An existing entry under `name` is replaced.
    pub fn alias_grant(&mut self, name: impl Into<String>, kind: GrantKind) {
        self.grants.insert(name.into(), kind);
    }

    pub fn alias_exchange(&mut self, name: impl Into<String>, kind: ExchangeKind) {
        self.exchanges.insert(name.into(), kind);
    }

    pub fn grant(&self, name: &str) -> Option<GrantKind> {
        self.grants.get(name).copied()
    }

    pub fn exchange(&self, name: &str) -> Option<ExchangeKind> {
        self.exchanges.get(name).copied()
    }

    /// Resolve a name that may refer to either kind of plugin. Grants win
    /// when a name is registered as both.
    pub fn resolve(&self, name: &str) -> Option<Plugin> {
        self.grant(name)
            .map(Plugin::Grant)
            .or_else(|| self.exchange(name).map(Plugin::Exchange))
    }

    pub fn grant_names(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    pub fn exchange_names(&self) -> impl Iterator<Item = &str> {
        self.exchanges.keys().map(String::as_str)
    }
}
