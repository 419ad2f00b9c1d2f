use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Generate and stream orders through a single session
    Stream {
        /// Number of orders; defaults to num.orders.per.batch
        num_orders: Option<usize>,
    },
    /// Split orders and customers across parallel instances
    Parallel {
        /// Total orders across all instances
        total_orders: usize,

        /// Number of parallel instances
        instances: usize,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<String>,
    },
    /// Show the last committed offset tokens of the configured channels
    Offsets {
        #[arg(long, help = "Inspect the channels of this parallel instance")]
        instance: Option<usize>,

        #[arg(long, help = "Print as JSON instead of a table")]
        json: bool,
    },
    /// Run the max customer id lookup
    MaxId,
    /// Print the public key fingerprint and JWT issuer of the profile
    Fingerprint,
    /// Print the effective configuration with secrets masked
    Config {
        #[arg(long, help = "Print as JSON instead of a table")]
        json: bool,
    },
}
