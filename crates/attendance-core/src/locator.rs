//! Caller IP resolution and IP geolocation.
//!
//! The outbound address comes from a UDP socket "connected" to a public
//! resolver (no packet is sent), falling back to the local hostname's
//! address. The coordinate comes from the ip-api.com JSON endpoint.

use crate::config::Config;
use crate::error::LocationError;
use crate::geo::Coordinate;
use serde::Deserialize;
use std::io;
use std::net::{IpAddr, ToSocketAddrs, UdpSocket};
use tracing::{debug, info};

/// Well-known public address used to pick the outbound interface
pub const PROBE_ADDR: &str = "8.8.8.8:53";

/// Resolves who is calling and where they are.
pub trait Locator {
    /// Address that identifies the caller
    fn caller_ip(&self) -> Result<IpAddr, LocationError>;

    /// Map an address to a coordinate
    fn locate(&self, ip: IpAddr) -> Result<Coordinate, LocationError>;

    /// Both steps in sequence
    fn resolve_caller_location(&self) -> Result<(IpAddr, Coordinate), LocationError> {
        let ip = self.caller_ip()?;
        let coordinate = self.locate(ip)?;
        Ok((ip, coordinate))
    }
}

/// Determine this host's outbound IP address.
///
/// # Errors
///
/// Returns [`LocationError::IpUnavailable`] when both the socket probe and
/// hostname resolution fail.
pub fn outbound_ip() -> Result<IpAddr, LocationError> {
    match probe_outbound_ip() {
        Ok(ip) => Ok(ip),
        Err(probe_err) => {
            debug!("Outbound socket probe failed ({probe_err}), resolving hostname");
            hostname_ip().map_err(|host_err| {
                LocationError::IpUnavailable(format!("probe: {probe_err}; hostname: {host_err}"))
            })
        }
    }
}

fn probe_outbound_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(PROBE_ADDR)?;
    Ok(socket.local_addr()?.ip())
}

fn hostname_ip() -> io::Result<IpAddr> {
    let name = hostname::get()?;
    let name = name.to_string_lossy();
    (&*name, 0)
        .to_socket_addrs()?
        .map(|addr| addr.ip())
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no IPv4 address for host {name}"),
            )
        })
}

/// ip-api.com JSON response (only the fields we use)
#[derive(Debug, Clone, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Client for the ip-api.com geolocation endpoint
#[derive(Debug, Clone)]
pub struct IpApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl IpApiClient {
    pub fn new(agent: ureq::Agent, base_url: impl Into<String>) -> Self {
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    /// Look up the coordinate of `ip`.
    ///
    /// # Errors
    ///
    /// Transport failures, unparseable bodies, and any status other than
    /// `"success"` are all reported as [`LocationError`].
    pub fn lookup(&self, ip: IpAddr) -> Result<Coordinate, LocationError> {
        let url = format!("{}/json/{}", self.base_url.trim_end_matches('/'), ip);
        debug!("Geolocation lookup: {url}");

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| LocationError::Request(e.to_string()))?;
        let body = response
            .into_string()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        parse_lookup_response(ip, &body)
    }
}

/// Interpret an ip-api.com JSON body
pub fn parse_lookup_response(ip: IpAddr, body: &str) -> Result<Coordinate, LocationError> {
    let response: IpApiResponse =
        serde_json::from_str(body).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    if response.status != "success" {
        return Err(LocationError::LookupFailed {
            ip: ip.to_string(),
            message: response.message.unwrap_or(response.status),
        });
    }

    match (response.lat, response.lon) {
        (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
        _ => Err(LocationError::InvalidResponse(
            "success response without lat/lon".to_string(),
        )),
    }
}

/// Production locator: real outbound IP, real geolocation service
#[derive(Debug, Clone)]
pub struct NetworkLocator {
    client: IpApiClient,
}

impl NetworkLocator {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        Self {
            client: IpApiClient::new(agent, config.geo_base_url.clone()),
        }
    }
}

impl Locator for NetworkLocator {
    fn caller_ip(&self) -> Result<IpAddr, LocationError> {
        let ip = outbound_ip()?;
        info!(%ip, "Resolved caller IP");
        Ok(ip)
    }

    fn locate(&self, ip: IpAddr) -> Result<Coordinate, LocationError> {
        self.client.lookup(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::new(200, 137, 128, 1));

    #[test]
    fn test_success_response() {
        let body = r#"{"status":"success","country":"Brazil","lat":-2.5297,"lon":-44.3028,"query":"200.137.128.1"}"#;
        let coordinate = parse_lookup_response(IP, body).unwrap();
        assert_eq!(coordinate, Coordinate::new(-2.5297, -44.3028));
    }

    #[test]
    fn test_fail_status_reports_message() {
        let body = r#"{"status":"fail","message":"private range","query":"10.0.0.5"}"#;
        match parse_lookup_response(IP, body) {
            Err(LocationError::LookupFailed { ip, message }) => {
                assert_eq!(ip, "200.137.128.1");
                assert_eq!(message, "private range");
            }
            other => panic!("expected LookupFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_status_without_message() {
        let body = r#"{"status":"throttled"}"#;
        match parse_lookup_response(IP, body) {
            Err(LocationError::LookupFailed { message, .. }) => assert_eq!(message, "throttled"),
            other => panic!("expected LookupFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_success_without_coordinates_is_invalid() {
        let body = r#"{"status":"success"}"#;
        assert!(matches!(
            parse_lookup_response(IP, body),
            Err(LocationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_non_json_body_is_invalid() {
        assert!(matches!(
            parse_lookup_response(IP, "<html>rate limited</html>"),
            Err(LocationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_unreachable_service_is_request_error() {
        // Port 9 on localhost: nothing listens, connection is refused
        let client = IpApiClient::new(ureq::AgentBuilder::new().build(), "http://127.0.0.1:9");
        assert!(matches!(client.lookup(IP), Err(LocationError::Request(_))));
    }

    struct FixedLocator(Option<Coordinate>);

    impl Locator for FixedLocator {
        fn caller_ip(&self) -> Result<IpAddr, LocationError> {
            Ok(IP)
        }

        fn locate(&self, ip: IpAddr) -> Result<Coordinate, LocationError> {
            self.0.ok_or(LocationError::LookupFailed {
                ip: ip.to_string(),
                message: "fail".to_string(),
            })
        }
    }

    #[test]
    fn test_resolve_caller_location_chains_steps() {
        let here = Coordinate::new(1.0, 2.0);
        assert_eq!(
            FixedLocator(Some(here)).resolve_caller_location().unwrap(),
            (IP, here)
        );
        assert!(FixedLocator(None).resolve_caller_location().is_err());
    }
}
