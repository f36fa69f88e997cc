//! CLI definitions for meshctl
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "meshctl",
    version,
    about = "Release orchestrator for service-mesh routing entities",
    long_about = "Standard, canary and dark releases on top of the mesh CRD service.\nThe CRD service only creates and deletes; meshctl turns that into replace-or-create."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./meshctl.yaml when present)
    #[arg(long, global = true, env = "MESHCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bearer token sent to every backend
    #[arg(long, global = true, env = "MESHCTL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Cluster service base URL
    #[arg(long, global = true, env = "MESHCTL_CLUSTER_API")]
    pub cluster_api: Option<String>,

    /// Agent service base URL
    #[arg(long, global = true, env = "MESHCTL_AGENT_API")]
    pub agent_api: Option<String>,

    /// CRD service base URL
    #[arg(long, global = true, env = "MESHCTL_CRD_API")]
    pub crd_api: Option<String>,

    /// Wait after deleting entities before creating (e.g. 1500ms, 2s)
    #[arg(long, global = true, env = "MESHCTL_SETTLE_DELAY")]
    pub settle_delay: Option<String>,

    /// Approve destructive replacements without asking
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Never prompt; destructive replacements are declined unless --yes
    #[arg(long, global = true)]
    pub non_interactive: bool,
}

/// (cluster, namespace, service) a release targets
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Cluster UUID
    #[arg(long, env = "MESHCTL_CLUSTER")]
    pub cluster: String,

    /// Kubernetes namespace
    #[arg(long, short = 'n')]
    pub namespace: String,

    /// Service name
    #[arg(long, short = 's')]
    pub service: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered clusters with agent connectivity
    Clusters,

    /// Inspect or remove a single cluster
    Cluster {
        #[command(subcommand)]
        command: ClusterCommands,
    },

    /// List namespaces in a cluster
    Namespaces {
        /// Cluster UUID
        #[arg(long, env = "MESHCTL_CLUSTER")]
        cluster: String,
    },

    /// List services in a namespace
    Services {
        /// Cluster UUID
        #[arg(long, env = "MESHCTL_CLUSTER")]
        cluster: String,

        /// Kubernetes namespace
        #[arg(long, short = 'n')]
        namespace: String,
    },

    /// List versions (image tags) a service is running
    Versions {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show service entities routing a cluster or one service
    Entities {
        /// Cluster UUID
        #[arg(long, env = "MESHCTL_CLUSTER")]
        cluster: String,

        /// Namespace of the service to show (requires --service)
        #[arg(long, short = 'n', requires = "service")]
        namespace: Option<String>,

        /// Service to show (requires --namespace)
        #[arg(long, short = 's', requires = "namespace")]
        service: Option<String>,

        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,

        /// Refresh interval for --watch
        #[arg(long, default_value = "5s")]
        interval: String,
    },

    /// Route all traffic of a service to one version
    Deploy {
        #[command(flatten)]
        target: TargetArgs,

        /// Version (image tag) to serve
        #[arg(long)]
        version: String,
    },

    /// Split traffic between the current version and a canary
    Canary {
        #[command(flatten)]
        target: TargetArgs,

        /// Version currently serving traffic
        #[arg(long)]
        original: String,

        /// Version receiving the canary share
        #[arg(long)]
        canary: String,

        /// Percentage of traffic to the canary (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        ratio: u8,

        /// Keep sessions on the version they started on
        #[arg(long)]
        sticky: bool,

        /// Scale pods with the traffic share
        #[arg(long)]
        pod_scale: bool,

        /// Ratio change after a delay, DELAY=RATIO (e.g. 5m=30); repeatable
        #[arg(long = "schedule")]
        schedules: Vec<String>,
    },

    /// Mirror traffic from one IP to a version
    DarkRelease {
        #[command(flatten)]
        target: TargetArgs,

        /// Version receiving the mirrored traffic
        #[arg(long)]
        version: String,

        /// Source IP whose traffic is mirrored
        #[arg(long)]
        ip: String,
    },

    /// Delete a service entity by id
    DeleteEntity {
        /// ServiceEntity id
        id: i64,
    },

    /// Delete a dark release by id
    DeleteDarkRelease {
        /// DarknessRelease id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ClusterCommands {
    /// Show registration details
    Show {
        /// Cluster UUID
        uuid: String,
    },

    /// Remove a cluster registration (refused while its agent is connected)
    Delete {
        /// Cluster UUID
        uuid: String,
    },
}
