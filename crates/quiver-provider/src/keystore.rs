//! Loads the provider's long-lived Ed25519 identity from
//! `private_key_path`, generating and persisting a fresh keypair on first
//! run. Completes the TODO left in the backend teacher's
//! `load_or_generate_keypair` (which only ever generated, never loaded).

use anyhow::{Context, Result};
use quiver_core::receipt::Ed25519Keypair;
use rand::RngCore;
use std::path::Path;
use tracing::{info, warn};

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to chmod private key at {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

pub fn load_or_generate_keypair(path: &str) -> Result<Ed25519Keypair> {
    let path = Path::new(path);

    if path.exists() {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read private key at {}", path.display()))?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .context("private key file must contain exactly 32 bytes")?;
        info!(path = %path.display(), "loaded existing provider identity");
        return Ok(Ed25519Keypair::from_seed_bytes(&seed));
    }

    warn!(path = %path.display(), "no private key found, generating a new identity");
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    std::fs::write(path, seed)
        .with_context(|| format!("failed to write private key at {}", path.display()))?;
    restrict_permissions(path)?;

    let keypair = Ed25519Keypair::from_seed_bytes(&seed);
    info!(public_key = %keypair.public_key_base64(), "generated new provider identity");
    Ok(keypair)
}
