// SPDX-License-Identifier: MIT
// Copyright (c) 2026 vlaude contributors

//! Connection authentication.
//!
//! External clients present an RS256 JWT (header or query param); the
//! server holds only the public key. Connections from configured CIDRs —
//! loopback and the internal daemon — bypass the token entirely and act as
//! trusted service accounts. TLS termination happens outside this process.

use std::net::IpAddr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default token lifetime for `POST /auth/generate-token`.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication error")]
    MissingToken,

    #[error("Authentication error")]
    InvalidToken,

    #[error("token issuing not configured")]
    NoSigningKey,

    #[error("bad trusted CIDR: {0}")]
    BadCidr(String),

    #[error("bad key material: {0}")]
    BadKey(String),
}

/// Result of authenticating one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSubject {
    /// `sub` claim for token-authenticated clients.
    pub subject: Option<String>,
    /// True for CIDR-exempt internal connections.
    pub trusted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

/// A network in prefix notation, matched by leading bits.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustedNet {
    addr: IpAddr,
    prefix: u8,
}

impl TrustedNet {
    /// Parse `"127.0.0.0/8"` / `"::1/128"`; a bare address gets a full
    /// prefix.
    pub fn parse(s: &str) -> Result<Self, AuthError> {
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => {
                let prefix =
                    prefix.parse::<u8>().map_err(|_| AuthError::BadCidr(s.to_string()))?;
                (addr, Some(prefix))
            }
            None => (s, None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| AuthError::BadCidr(s.to_string()))?;
        let max = match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        let prefix = prefix.unwrap_or(max);
        if prefix > max {
            return Err(AuthError::BadCidr(s.to_string()));
        }
        Ok(Self { addr, prefix })
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u32::MAX << (32 - self.prefix) };
                (u32::from(net) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u128::MAX << (128 - self.prefix) };
                (u128::from(net) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }
}

/// Token validation plus trusted-network exemption.
pub struct Auth {
    decoding: Option<DecodingKey>,
    encoding: Option<EncodingKey>,
    trusted: Vec<TrustedNet>,
}

impl Auth {
    /// Build from PEM key material and CIDR strings.
    ///
    /// `public_pem` may be absent in closed deployments where every client
    /// is inside a trusted network; token auth then always fails.
    pub fn new(
        public_pem: Option<&[u8]>,
        private_pem: Option<&[u8]>,
        trusted: &[String],
    ) -> Result<Self, AuthError> {
        let decoding = public_pem
            .map(DecodingKey::from_rsa_pem)
            .transpose()
            .map_err(|e| AuthError::BadKey(e.to_string()))?;
        let encoding = private_pem
            .map(EncodingKey::from_rsa_pem)
            .transpose()
            .map_err(|e| AuthError::BadKey(e.to_string()))?;
        let trusted = trusted
            .iter()
            .map(|s| TrustedNet::parse(s.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { decoding, encoding, trusted })
    }

    /// Authenticate one connection by source address and optional token.
    pub fn authenticate(
        &self,
        peer: IpAddr,
        token: Option<&str>,
    ) -> Result<AuthSubject, AuthError> {
        if self.trusted.iter().any(|net| net.contains(peer)) {
            return Ok(AuthSubject { subject: None, trusted: true });
        }
        let token = token.ok_or(AuthError::MissingToken)?;
        let decoding = self.decoding.as_ref().ok_or(AuthError::InvalidToken)?;
        let validation = Validation::new(Algorithm::RS256);
        match jsonwebtoken::decode::<Claims>(token, decoding, &validation) {
            Ok(data) => Ok(AuthSubject { subject: Some(data.claims.sub), trusted: false }),
            Err(e) => {
                debug!(error = %e, "token rejected");
                Err(AuthError::InvalidToken)
            }
        }
    }

    /// Sign a fresh RS256 token for mobile onboarding.
    pub fn issue(&self, subject: &str, now_epoch_secs: u64) -> Result<String, AuthError> {
        let encoding = self.encoding.as_ref().ok_or(AuthError::NoSigningKey)?;
        let claims =
            Claims { sub: subject.to_string(), exp: now_epoch_secs + DEFAULT_TOKEN_TTL_SECS };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, encoding)
            .map_err(|e| AuthError::BadKey(e.to_string()))
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
