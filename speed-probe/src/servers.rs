//! speedtest.net configuration and server-list documents.

use serde::Deserialize;

use crate::MeasurementError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// One entry of the public server list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Server {
    #[serde(rename = "@id")]
    pub id: u32,
    /// Upload endpoint; the other probe endpoints live next to it.
    #[serde(rename = "@url")]
    pub url: String,
    #[serde(rename = "@lat")]
    pub lat: f64,
    #[serde(rename = "@lon")]
    pub lon: f64,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@sponsor", default)]
    pub sponsor: String,
}

impl Server {
    /// Directory that holds `upload.php`, `latency.txt` and the random images.
    pub fn base_url(&self) -> &str {
        match self.url.rfind('/') {
            Some(idx) => &self.url[..idx],
            None => &self.url,
        }
    }

    pub fn latency_url(&self) -> String {
        format!("{}/latency.txt", self.base_url())
    }

    pub fn download_url(&self, size: u32) -> String {
        format!("{}/random{size}x{size}.jpg", self.base_url())
    }

    pub fn upload_url(&self) -> &str {
        &self.url
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        haversine_km(lat, lon, self.lat, self.lon)
    }
}

/// Where speedtest.net thinks the client is.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub(crate) struct ClientLocation {
    #[serde(rename = "@lat")]
    pub lat: f64,
    #[serde(rename = "@lon")]
    pub lon: f64,
}

#[derive(Deserialize)]
struct ConfigDoc {
    client: ClientLocation,
}

#[derive(Deserialize)]
struct ServerListDoc {
    servers: ServerEntries,
}

#[derive(Deserialize)]
struct ServerEntries {
    #[serde(rename = "server", default)]
    entries: Vec<Server>,
}

pub(crate) fn parse_client_location(xml: &str) -> Result<ClientLocation, MeasurementError> {
    quick_xml::de::from_str::<ConfigDoc>(xml)
        .map(|doc| doc.client)
        .map_err(|source| MeasurementError::Xml {
            what: "client configuration",
            source,
        })
}

pub(crate) fn parse_server_list(xml: &str) -> Result<Vec<Server>, MeasurementError> {
    let doc: ServerListDoc =
        quick_xml::de::from_str(xml).map_err(|source| MeasurementError::Xml {
            what: "server list",
            source,
        })?;

    if doc.servers.entries.is_empty() {
        return Err(MeasurementError::NoServers);
    }
    Ok(doc.servers.entries)
}

/// Keep the `limit` servers nearest to `client`, closest first. Without a
/// client location the list order is kept.
pub(crate) fn closest(
    mut servers: Vec<Server>,
    client: Option<ClientLocation>,
    limit: usize,
) -> Vec<Server> {
    if let Some(client) = client {
        servers.sort_by(|a, b| {
            a.distance_km(client.lat, client.lon)
                .total_cmp(&b.distance_km(client.lat, client.lon))
        });
    }
    servers.truncate(limit.max(1));
    servers
}

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
