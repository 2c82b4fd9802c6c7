use std::net::IpAddr;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::application::services::admission::{ClientSignals, resolve_identity};
use crate::domain::{IdentityKey, Tier};

use super::error::error_response;

pub const IDENTITY_KEY_HEADER: &str = "x-identity-key";
pub const IDENTITY_TIER_HEADER: &str = "x-identity-tier";
pub const BOT_VERIFIED_HEADER: &str = "x-bot-verified";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Who is calling, as established by the upstream session layer. Callers
/// without an account header are keyed by fingerprint on the free tier.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: IdentityKey,
    pub tier: Tier,
    pub signals: ClientSignals,
    pub bot_verified: bool,
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn client_ip(parts: &Parts) -> Option<IpAddr> {
    header(parts, FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let signals = ClientSignals {
            ip: client_ip(parts),
            user_agent: header(parts, "user-agent").unwrap_or_default().to_string(),
            accept_language: header(parts, "accept-language")
                .unwrap_or_default()
                .to_string(),
        };
        let account = header(parts, IDENTITY_KEY_HEADER);
        let identity = resolve_identity(account, &signals);
        let tier = match (&identity, header(parts, IDENTITY_TIER_HEADER)) {
            (IdentityKey::Account(_), Some(raw)) => raw
                .parse::<Tier>()
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, e).into_response())?,
            _ => Tier::Free,
        };
        let bot_verified = header(parts, BOT_VERIFIED_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Ok(Self {
            identity,
            tier,
            signals,
            bot_verified,
        })
    }
}
