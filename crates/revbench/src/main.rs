//! Benchmark CLI
//!
//! Opens the connection fan-out, runs one workload and prints the report.

use clap::{Parser, Subcommand, ValueEnum};
use revbench::{run, Workload, WorkloadConfig};
use revbench_client::{CallPolicy, ClientSet, FanoutConfig};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "revbench")]
#[command(about = "Load generator for revisioned key-value stores")]
struct Args {
    /// Store endpoints, comma separated
    #[arg(long, value_delimiter = ',', default_value = "127.0.0.1:2379", global = true)]
    endpoints: Vec<String>,

    /// Total number of gRPC connections
    #[arg(long, default_value = "1", global = true)]
    conns: usize,

    /// Total number of gRPC clients
    #[arg(long, default_value = "1", global = true)]
    clients: usize,

    /// Per-request timeout in milliseconds (none by default)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: Level,

    /// Report format
    #[arg(long, value_enum, default_value = "text", global = true)]
    output: Output,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Output {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Single-key puts
    Put(WorkloadArgs),
    /// Single-key ranges
    Range(WorkloadArgs),
    /// Ranges and puts mixed by read ratio
    Mixed(WorkloadArgs),
    /// Transactions with a fixed read share
    Txn(WorkloadArgs),
    /// Transactions of puts
    TxnPut(WorkloadArgs),
    /// Transactions of ranges
    TxnRange(WorkloadArgs),
    /// Transactions with ops mixed by read ratio
    TxnMixed(WorkloadArgs),
    /// Whole-keyspace ranges and puts mixed by read ratio
    Kv(WorkloadArgs),
}

impl Command {
    fn split(self) -> (Workload, WorkloadArgs) {
        match self {
            Command::Put(a) => (Workload::Put, a),
            Command::Range(a) => (Workload::Range, a),
            Command::Mixed(a) => (Workload::Mixed, a),
            Command::Txn(a) => (Workload::Txn, a),
            Command::TxnPut(a) => (Workload::TxnPut, a),
            Command::TxnRange(a) => (Workload::TxnRange, a),
            Command::TxnMixed(a) => (Workload::TxnMixed, a),
            Command::Kv(a) => (Workload::Kv, a),
        }
    }
}

#[derive(clap::Args, Debug)]
struct WorkloadArgs {
    /// Total number of requests
    #[arg(long, default_value_t = 10_000)]
    total: u64,

    /// Maximum requests per second
    #[arg(long, default_value_t = u64::MAX)]
    rate_limit: u64,

    /// Key size of request
    #[arg(long, default_value_t = 8)]
    key_size: usize,

    /// Value size of request
    #[arg(long, default_value_t = 8)]
    val_size: usize,

    /// Maximum possible keys
    #[arg(long, default_value_t = 1)]
    key_space_size: u64,

    /// Read/all ops ratio
    #[arg(long, default_value_t = 0.5)]
    read_ratio: f64,

    /// Number of ops per txn
    #[arg(long, default_value_t = 1)]
    txn_ops: usize,

    /// Result limit of whole-keyspace reads
    #[arg(long, default_value_t = 1000)]
    limit: i64,

    /// Seed for a reproducible request stream
    #[arg(long)]
    seed: Option<u64>,
}

impl WorkloadArgs {
    fn into_config(self, clients: usize, conns: usize) -> WorkloadConfig {
        let config = WorkloadConfig::new()
            .total(self.total)
            .rate_limit(self.rate_limit)
            .key_size(self.key_size)
            .value_size(self.val_size)
            .key_space_size(self.key_space_size)
            .read_ratio(self.read_ratio)
            .ops_per_txn(self.txn_ops)
            .range_limit(self.limit)
            .clients(clients)
            .conns(conns);
        match self.seed {
            Some(seed) => config.seed(seed),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging; stdout is reserved for the report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (workload, workload_args) = args.command.split();
    let config = workload_args.into_config(args.clients, args.conns);
    config.validate()?;

    let mut policy = CallPolicy::default();
    if let Some(ms) = args.timeout_ms {
        policy = policy.timeout(Duration::from_millis(ms));
    }
    let fanout = FanoutConfig::new(args.endpoints)
        .conns(args.conns)
        .clients(args.clients)
        .policy(policy);

    info!("Connecting to {:?}", fanout.endpoints);
    let clients = ClientSet::connect(&fanout).await?.into_clients();

    let stats = run(workload, &config, clients).await?;

    match args.output {
        Output::Text => print!("{}", stats.format()),
        Output::Json => {
            eprint!("{}", stats.format());
            println!("{}", stats.to_json()?);
        }
    }
    Ok(())
}
