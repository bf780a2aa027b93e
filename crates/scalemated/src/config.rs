//! Daemon configuration.
//!
//! Flags with environment fallbacks; the parsed CLI is turned into
//! the immutable values the subsystems take at construction time.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use scalemate_controller::FilterConfig;

#[derive(Parser, Debug)]
#[command(name = "scalemated", about = "Scalemate autoscaler controller daemon")]
pub struct Cli {
    /// Base URL of the cluster API.
    #[arg(long, env = "SCALEMATE_API_URL", default_value = "http://127.0.0.1:8443")]
    pub api_url: String,

    /// Directory holding metric template files, one per template name.
    #[arg(long, env = "SCALEMATE_TEMPLATES", default_value = "/etc/scalemate/templates")]
    pub template_dir: PathBuf,

    /// Number of concurrent reconcile workers.
    #[arg(long, default_value = "2")]
    pub workers: usize,

    /// Workload poll interval in seconds.
    #[arg(long, default_value = "10")]
    pub poll_interval: u64,

    /// Bound on the startup cache-sync wait, in seconds.
    #[arg(long, default_value = "60")]
    pub sync_timeout: u64,

    /// Namespaces whose workloads are never reconciled.
    #[arg(long, value_delimiter = ',', default_value = "kube-system,kube-public")]
    pub ignore_namespaces: Vec<String>,

    /// Optional webhook URL for creation notifications.
    #[arg(long, env = "SCALEMATE_WEBHOOK_URL")]
    pub webhook_url: Option<String>,
}

impl Cli {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout)
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            ignored_namespaces: self
                .ignore_namespaces
                .iter()
                .cloned()
                .collect::<HashSet<_>>(),
        }
    }
}
