//! SSH public key generation for Azure machines
//!
//! CAPZ requires an SSH public key on every AzureMachine even though nodes are
//! accessed through other means. A fresh RSA key is generated, the private
//! half is dropped, and the public half is emitted as a base64 encoded
//! OpenSSH authorized-keys line.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{CryptoRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use crate::constants::SSH_RSA_KEY_BITS;
use nodepool_common::{Error, Result};

const SSH_RSA_KEY_TYPE: &str = "ssh-rsa";

/// Generate an RSA key and return its base64 encoded authorized-keys line
pub fn generate_ssh_public_key<R: RngCore + CryptoRng>(rng: &mut R) -> Result<String> {
    let private_key = RsaPrivateKey::new(rng, SSH_RSA_KEY_BITS)
        .map_err(|e| Error::internal_with_context("ssh", format!("failed to generate RSA key: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);
    debug!(bits = SSH_RSA_KEY_BITS, "generated ssh key for Azure machine");
    Ok(STANDARD.encode(authorized_key_line(&public_key)))
}

/// Format a public key as `ssh-rsa <base64 wire blob>\n`
pub fn authorized_key_line(key: &RsaPublicKey) -> String {
    format!("{SSH_RSA_KEY_TYPE} {}\n", STANDARD.encode(wire_blob(key)))
}

/// RFC 4253 public key blob: string "ssh-rsa", mpint e, mpint n
fn wire_blob(key: &RsaPublicKey) -> Vec<u8> {
    let mut blob = Vec::new();
    put_string(&mut blob, SSH_RSA_KEY_TYPE.as_bytes());
    put_mpint(&mut blob, &key.e().to_bytes_be());
    put_mpint(&mut blob, &key.n().to_bytes_be());
    blob
}

fn put_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

// Positive mpints whose high bit is set get a leading zero byte
fn put_mpint(buf: &mut Vec<u8>, magnitude: &[u8]) {
    let start = magnitude.iter().position(|b| *b != 0).unwrap_or(magnitude.len());
    let trimmed = &magnitude[start..];
    if trimmed.first().is_some_and(|b| b & 0x80 != 0) {
        buf.extend_from_slice(&((trimmed.len() + 1) as u32).to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(trimmed);
    } else {
        put_string(buf, trimmed);
    }
}
