use std::net::{IpAddr, Ipv4Addr};

use crate::{common::socks::ProtocolVersion, error::ConnectError};

/// How the target host is turned into the address field of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    UseLiteral(Ipv4Addr),
    ResolveNow,
    DeferToProxy,
}

pub fn decide(
    version: ProtocolVersion,
    host: &str,
    resolve_local: bool,
) -> Result<Resolution, ConnectError> {
    if host.is_empty() || host.contains('\0') {
        return Err(ConnectError::InvalidTarget(host.to_owned()));
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => return Ok(Resolution::UseLiteral(ip)),
        Ok(IpAddr::V6(_)) => return Err(ConnectError::InvalidTarget(host.to_owned())),
        Err(_) => {}
    }
    // socks4 has no way to carry a hostname
    Ok(match version {
        ProtocolVersion::V4 => Resolution::ResolveNow,
        ProtocolVersion::V4A if resolve_local => Resolution::ResolveNow,
        ProtocolVersion::V4A => Resolution::DeferToProxy,
    })
}
