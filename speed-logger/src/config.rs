use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use speed_probe::ProbeConfig;
use speed_store::InfluxConfig;

/// Measure internet speed once and log it to CSV and InfluxDB.
#[derive(Debug, Parser)]
#[command(name = "speed-logger", version, about)]
pub struct Args {
    /// CSV file the result row is appended to.
    #[arg(long = "csv", env = "CSV_FILENAME", default_value = "speedtest_results.csv")]
    pub csv_path: PathBuf,

    /// InfluxDB base URL.
    #[arg(long, env = "INFLUX_URL", default_value = speed_store::influx::DEFAULT_URL)]
    pub influx_url: String,

    /// InfluxDB API token.
    #[arg(
        long,
        env = "INFLUX_TOKEN",
        default_value = speed_store::influx::DEFAULT_TOKEN,
        hide_env_values = true
    )]
    pub influx_token: String,

    /// InfluxDB organization.
    #[arg(long, env = "INFLUX_ORG", default_value = speed_store::influx::DEFAULT_ORG)]
    pub influx_org: String,

    /// InfluxDB bucket.
    #[arg(long, env = "INFLUX_BUCKET", default_value = speed_store::influx::DEFAULT_BUCKET)]
    pub influx_bucket: String,

    /// Per-request timeout for the speed test, in seconds.
    #[arg(long, env = "SPEEDTEST_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Exit with status 1 if the measurement or any sink failed.
    #[arg(long)]
    pub strict: bool,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub csv_path: PathBuf,
    pub influx: InfluxConfig,
    pub probe: ProbeConfig,
    pub strict: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            csv_path: args.csv_path,
            influx: InfluxConfig {
                url: args.influx_url,
                token: args.influx_token,
                org: args.influx_org,
                bucket: args.influx_bucket,
            },
            probe: ProbeConfig {
                timeout: Duration::from_secs(args.timeout_secs),
                ..ProbeConfig::default()
            },
            strict: args.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_build_config() {
        let args = Args::try_parse_from([
            "speed-logger",
            "--csv",
            "/var/log/speed.csv",
            "--influx-url",
            "http://influx:8086",
            "--influx-token",
            "abc",
            "--influx-org",
            "lab",
            "--influx-bucket",
            "net",
            "--timeout-secs",
            "5",
            "--strict",
        ])
        .unwrap();

        let config = Config::from(args);
        assert_eq!(config.csv_path, PathBuf::from("/var/log/speed.csv"));
        assert_eq!(
            config.influx,
            InfluxConfig {
                url: "http://influx:8086".to_string(),
                token: "abc".to_string(),
                org: "lab".to_string(),
                bucket: "net".to_string(),
            }
        );
        assert_eq!(config.probe.timeout, Duration::from_secs(5));
        assert!(config.strict);
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        assert!(Args::try_parse_from(["speed-logger", "--timeout-secs", "soon"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
