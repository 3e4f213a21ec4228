//! Wallet session: connect, challenge-response login, restore and logout.
//!
//! The session is an explicit value owned by the caller and passed by
//! reference to whatever needs the current account. Login state is persisted
//! in a [`KeyValueStore`] so a restart restores it without a new signature.

use k256::ecdsa::SigningKey;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::SessionError;
use crate::signature::{address_of, sign_personal_message, verify_message, Signature};
use crate::storage::{KeyValueStore, IS_LOGGED_IN_KEY, NONCE_KEY, WALLET_ADDRESS_KEY};
use crate::types::Address;

/// Boxed future returned by wallet providers
pub type WalletFuture<T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send>>;

/// Injected wallet (browser extension, hardware wallet, local key)
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for the account to use
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WalletUnavailable`] if the user refuses or the
    /// wallet is gone.
    fn request_account(&self) -> WalletFuture<Address>;

    /// Sign `message` as a personal message with the current account
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the wallet refuses or fails to sign.
    fn sign_message(&self, message: String) -> WalletFuture<Signature>;
}

/// Software secp256k1 wallet
#[derive(Clone)]
pub struct LocalWallet {
    key: Arc<SigningKey>,
    address: Address,
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalWallet {
    /// Wallet with a fresh random key
    #[must_use]
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Wallet for a hex-encoded private key (optionally `0x`-prefixed)
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSignature`] if the key is not a valid
    /// secp256k1 scalar.
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, SessionError> {
        let digits = hex_key.trim().strip_prefix("0x").unwrap_or(hex_key.trim());
        let bytes = hex::decode(digits).map_err(|e| SessionError::InvalidSignature(e.to_string()))?;
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| SessionError::InvalidSignature(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self {
            key: Arc::new(key),
            address,
        }
    }

    /// Account controlled by this wallet
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }
}

impl WalletProvider for LocalWallet {
    fn request_account(&self) -> WalletFuture<Address> {
        let address = self.address;
        Box::pin(async move { Ok(address) })
    }

    fn sign_message(&self, message: String) -> WalletFuture<Signature> {
        let key = Arc::clone(&self.key);
        Box::pin(async move { sign_personal_message(&key, &message) })
    }
}

/// Login challenge: `"Login to dApp - <n>"`, `n` uniform in `0..1_000_000`
#[must_use]
pub fn login_challenge<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Login to dApp - {}", rng.gen_range(0..1_000_000))
}

/// Where the session is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No account known
    #[default]
    Disconnected,
    /// Account known, ownership not proven
    Connected(Address),
    /// Ownership proven by signature (or restored from storage)
    LoggedIn(Address),
}

/// Explicit wallet session
pub struct WalletSession {
    store: Arc<dyn KeyValueStore>,
    provider: Option<Arc<dyn WalletProvider>>,
    state: SessionState,
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("state", &self.state)
            .field("has_provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// Session over `store`, with the wallet provider if one is installed
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            store,
            provider,
            state: SessionState::Disconnected,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Current account, connected or logged in
    #[must_use]
    pub const fn address(&self) -> Option<Address> {
        match self.state {
            SessionState::Connected(address) | SessionState::LoggedIn(address) => Some(address),
            SessionState::Disconnected => None,
        }
    }

    /// Returns `true` once logged in
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn(_))
    }

    fn provider(&self) -> Result<Arc<dyn WalletProvider>, SessionError> {
        self.provider.clone().ok_or(SessionError::WalletUnavailable)
    }

    /// Restore a persisted login
    ///
    /// A stored address counts only together with `is-logged-in == "true"`.
    /// An unreadable stored address is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the store cannot be read.
    pub fn restore(&mut self) -> Result<Option<Address>, SessionError> {
        let stored = self.store.get(WALLET_ADDRESS_KEY)?;
        let logged_in = self.store.get(IS_LOGGED_IN_KEY)?.as_deref() == Some("true");

        let Some(raw) = stored.filter(|_| logged_in) else {
            return Ok(None);
        };

        match raw.parse::<Address>() {
            Ok(address) => {
                tracing::info!(%address, "Restored wallet session");
                self.state = SessionState::LoggedIn(address);
                Ok(Some(address))
            },
            Err(error) => {
                tracing::warn!(%error, "Discarding unreadable stored session");
                self.clear_storage()?;
                Ok(None)
            },
        }
    }

    /// Ask the wallet for its account
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WalletUnavailable`] without a provider, or the
    /// provider's error.
    pub async fn connect(&mut self) -> Result<Address, SessionError> {
        let address = self.provider()?.request_account().await?;
        tracing::info!(%address, "Wallet connected");
        self.state = SessionState::Connected(address);
        Ok(address)
    }

    /// Prove ownership of the wallet account by signing a challenge
    ///
    /// Connects first if needed. On success the address and login flag are
    /// persisted. On a signer mismatch the session stays connected but not
    /// logged in.
    ///
    /// # Errors
    ///
    /// - [`SessionError::WalletUnavailable`] without a provider
    /// - [`SessionError::SignatureMismatch`] if another account signed
    /// - [`SessionError::InvalidSignature`] for undecodable signatures
    /// - [`SessionError::Storage`] if persisting fails
    pub async fn login(&mut self) -> Result<Address, SessionError> {
        let provider = self.provider()?;
        let address = provider.request_account().await?;
        self.state = SessionState::Connected(address);

        let challenge = login_challenge(&mut rand::thread_rng());
        self.store.set(NONCE_KEY, &challenge)?;

        let signature = provider.sign_message(challenge.clone()).await?;
        verify_message(&challenge, &signature, address)?;

        self.store.set(WALLET_ADDRESS_KEY, &address.to_checksum())?;
        self.store.set(IS_LOGGED_IN_KEY, "true")?;
        self.state = SessionState::LoggedIn(address);

        tracing::info!(%address, "User authenticated");
        Ok(address)
    }

    /// Forget the in-memory account; a persisted login stays restorable
    pub fn disconnect(&mut self) {
        self.state = SessionState::Disconnected;
    }

    /// Log out and clear every persisted session key
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the store cannot be written.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(address) = self.address() {
            tracing::info!(%address, "Logging out");
        }
        self.state = SessionState::Disconnected;
        self.clear_storage()
    }

    fn clear_storage(&self) -> Result<(), SessionError> {
        self.store.remove(WALLET_ADDRESS_KEY)?;
        self.store.remove(IS_LOGGED_IN_KEY)?;
        self.store.remove(NONCE_KEY)?;
        Ok(())
    }
}
