/// Anything that prevents the provider from producing a [`crate::Sample`].
#[derive(Debug, thiserror::Error)]
pub enum MeasurementError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not parse {what}: {source}")]
    Xml {
        what: &'static str,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("server list is empty")]
    NoServers,

    #[error("none of the {0} candidate servers answered a latency probe")]
    NoReachableServer(usize),

    #[error("probe failed: {0}")]
    Probe(String),
}
