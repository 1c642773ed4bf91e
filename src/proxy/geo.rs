//! Country lookup for candidates whose source did not report one

use crate::proxy::models::Candidate;
use crate::Result;
use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

/// Geographic location of an IP address
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeoLocation {
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "CN")
    pub country_code: Option<String>,
    /// Country name in English
    pub country_name: Option<String>,
}

impl GeoLocation {
    /// Country label used for candidate metadata: the ISO code, else the name
    pub fn country(&self) -> Option<String> {
        self.country_code.clone().or_else(|| self.country_name.clone())
    }
}

/// GeoLocator backed by a MaxMind MMDB database
pub struct GeoLocator {
    reader: Reader<Vec<u8>>,
}

impl GeoLocator {
    /// Create a new GeoLocator from an MMDB file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self { reader })
    }

    /// Look up the geolocation for an IP address string
    pub fn lookup(&self, ip_str: &str) -> Result<GeoLocation> {
        let ip: IpAddr = ip_str.parse()?;
        self.lookup_ip(ip)
    }

    pub fn lookup_ip(&self, ip: IpAddr) -> Result<GeoLocation> {
        let lookup_result = self.reader.lookup(ip)?;
        let country: Option<geoip2::Country> = lookup_result.decode()?;

        let Some(country) = country else {
            return Ok(GeoLocation::default());
        };

        Ok(GeoLocation {
            country_code: country.country.iso_code.map(String::from),
            country_name: country.country.names.english.map(String::from),
        })
    }

    /// Fill in the country of candidates that have none.
    ///
    /// Source-provided countries are never overwritten. Hosts that are not
    /// IP literals or are missing from the database are left alone. Returns
    /// the number of candidates updated.
    pub fn enrich(&self, candidates: &mut [Candidate]) -> usize {
        let mut updated = 0;
        for candidate in candidates
            .iter_mut()
            .filter(|c| c.metadata.country.is_none())
        {
            match self.lookup(&candidate.address.host) {
                Ok(location) => {
                    if let Some(country) = location.country() {
                        candidate.metadata.country = Some(country);
                        updated += 1;
                    }
                }
                Err(e) => debug!(host = %candidate.address.host, error = %e, "geo lookup failed"),
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_location_default() {
        let loc = GeoLocation::default();
        assert_eq!(loc.country(), None);
    }

    #[test]
    fn test_geo_location_country_prefers_code() {
        let loc = GeoLocation {
            country_code: Some("US".to_string()),
            country_name: Some("United States".to_string()),
        };
        assert_eq!(loc.country(), Some("US".to_string()));

        let loc = GeoLocation {
            country_code: None,
            country_name: Some("Germany".to_string()),
        };
        assert_eq!(loc.country(), Some("Germany".to_string()));
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(GeoLocator::from_path("/nonexistent/GeoLite2-City.mmdb").is_err());
    }
}
