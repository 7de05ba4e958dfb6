//! Ambient wallet capability
//!
//! The wallet is not part of the widget. The host either exposes one or it
//! does not; callers go through [`crate::widget::WidgetLifecycleManager`],
//! which reports a missing capability instead of failing hard.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;

/// Capability names requested on connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    AccessAddress,
    AccessPublicKey,
    AccessAllAddresses,
    SignTransaction,
    Encrypt,
    Decrypt,
    Signature,
    AccessArweaveConfig,
    Dispatch,
    AccessTokens,
}

impl Permission {
    pub const ALL: [Permission; 10] = [
        Permission::AccessAddress,
        Permission::AccessPublicKey,
        Permission::AccessAllAddresses,
        Permission::SignTransaction,
        Permission::Encrypt,
        Permission::Decrypt,
        Permission::Signature,
        Permission::AccessArweaveConfig,
        Permission::Dispatch,
        Permission::AccessTokens,
    ];

    /// Wire name understood by the wallet
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::AccessAddress => "ACCESS_ADDRESS",
            Permission::AccessPublicKey => "ACCESS_PUBLIC_KEY",
            Permission::AccessAllAddresses => "ACCESS_ALL_ADDRESSES",
            Permission::SignTransaction => "SIGN_TRANSACTION",
            Permission::Encrypt => "ENCRYPT",
            Permission::Decrypt => "DECRYPT",
            Permission::Signature => "SIGNATURE",
            Permission::AccessArweaveConfig => "ACCESS_ARWEAVE_CONFIG",
            Permission::Dispatch => "DISPATCH",
            Permission::AccessTokens => "ACCESS_TOKENS",
        }
    }

    /// Everything the harness exercises
    pub fn harness_set() -> BTreeSet<Permission> {
        Permission::ALL.into_iter().collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet operations the harness drives. Each call is independent and may fail.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    async fn connect(&self, permissions: &BTreeSet<Permission>) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    async fn encrypt(&self, data: &[u8], algorithm: &str) -> Result<Vec<u8>>;

    async fn decrypt(&self, data: &[u8], algorithm: &str) -> Result<Vec<u8>>;
}
