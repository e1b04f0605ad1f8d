use std::sync::Arc;
use std::time::Duration;

use chordkv_core::consts::DEFAULT_RPC_TIMEOUT_MS;
use chordkv_node::cli::Client;
use chordkv_node::logging::init_logging;
use chordkv_node::logging::LogLevel;
use chordkv_node::native::config;
use chordkv_node::native::endpoint::bind_http_api;
use chordkv_node::native::endpoint::serve;
use chordkv_node::processor::ProcessorBuilder;
use chordkv_node::util::expand_home;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(about, version, author)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = LogLevel::Info, value_enum, env)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    #[command(about = "Writes a default configuration file.")]
    Init(InitCommand),
    #[command(about = "Starts a long-running node daemon.")]
    Run(RunCommand),
    #[command(about = "Stores a value under a key.")]
    Put(PutCommand),
    #[command(about = "Reads the value of a key.")]
    Get(KeyCommand),
    #[command(about = "Deletes a key.")]
    Delete(KeyCommand),
    #[command(about = "Finds the node owning a key or identifier.")]
    Find(KeyCommand),
    #[command(
        about = "Show stats of a node. Include successors, predecessor, finger table and key counts."
    )]
    Stats(StatsCommand),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[arg(
        long,
        short = 'c',
        env,
        default_value = config::DEFAULT_CONFIG_PATH,
        help = "Config file location"
    )]
    pub config: String,
}

impl ConfigArgs {
    /// The config file, or the defaults when there is none.
    fn load(&self) -> anyhow::Result<config::Config> {
        if expand_home(&self.config)?.is_file() {
            Ok(config::Config::read_fs(&self.config)?)
        } else {
            tracing::debug!("{} not found, use default config", self.config);
            Ok(config::Config::default())
        }
    }
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(
        long,
        default_value = config::DEFAULT_CONFIG_PATH,
        help = "The location of config file"
    )]
    pub location: String,

    #[arg(long, short = 'b', help = "Listen address written to the config file")]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
struct RunCommand {
    #[arg(
        long,
        short = 'b',
        help = "Listen address. If not provided, use bind_addr in config file or 127.0.0.1:7000",
        env
    )]
    pub bind: Option<String>,

    #[arg(
        long,
        short = 'e',
        help = "Address advertised to other nodes. If not provided, use endpoint in config file or the listen address",
        env
    )]
    pub endpoint: Option<String>,

    #[arg(
        long,
        short = 'j',
        help = "Endpoint of a ring member to join. If not provided, use join in config file or start a new ring",
        env
    )]
    pub join: Option<String>,

    #[arg(
        long,
        short = 'r',
        help = "Copies kept of every key. If not provided, use replication_factor in config file or 3",
        env
    )]
    pub replication: Option<u8>,

    #[command(flatten)]
    config_args: ConfigArgs,
}

#[derive(Args, Debug)]
struct ClientArgs {
    #[arg(
        long,
        short = 'u',
        help = "chordkv node endpoint url. If not provided, use the endpoint in config file or http://127.0.0.1:7000",
        env
    )]
    endpoint_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_RPC_TIMEOUT_MS * 5, help = "Request timeout in ms")]
    timeout_ms: u64,

    #[command(flatten)]
    config_args: ConfigArgs,
}

impl ClientArgs {
    fn new_client(&self) -> anyhow::Result<Client> {
        let endpoint_url = match &self.endpoint_url {
            Some(url) => url.clone(),
            None => self.config_args.load()?.endpoint().to_string(),
        };
        Client::new(&endpoint_url, Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Args, Debug)]
struct PutCommand {
    #[command(flatten)]
    client_args: ClientArgs,
    #[arg()]
    key: String,
    #[arg()]
    value: String,
}

#[derive(Args, Debug)]
struct KeyCommand {
    #[command(flatten)]
    client_args: ClientArgs,
    #[arg()]
    key: String,
}

#[derive(Args, Debug)]
struct StatsCommand {
    #[command(flatten)]
    client_args: ClientArgs,
}

fn get_value<V>(value: Option<V>, default_value: V) -> V {
    value.unwrap_or(default_value)
}

async fn daemon_run(args: RunCommand) -> anyhow::Result<()> {
    let mut c = args.config_args.load()?;
    c.bind_addr = get_value(args.bind, c.bind_addr);
    c.endpoint = args.endpoint.or(c.endpoint);
    c.join = args.join.or(c.join);
    c.replication_factor = get_value(args.replication, c.replication_factor);

    let processor = Arc::new(ProcessorBuilder::from_config(&c).build()?);
    println!("Did: {}", processor.swarm.did());

    let listener = bind_http_api(&c.bind_addr)?;
    let server = tokio::spawn(serve(listener, processor.clone()));

    if let Err(e) = processor.join_or_create(c.join.as_deref()).await {
        processor.shutdown().await?;
        server.await??;
        return Err(e.into());
    }
    processor.start_maintenance()?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    processor.shutdown().await?;
    server.await??;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Init(args) => {
            let config = match args.bind {
                Some(bind) => config::Config::new(&bind),
                None => config::Config::default(),
            };
            let p = config.write_fs(args.location.as_str())?;
            println!("Your config file has saved to: {}", p);
            Ok(())
        }
        Command::Run(args) => daemon_run(args).await,
        Command::Put(args) => {
            args.client_args
                .new_client()?
                .put(args.key.as_str(), args.value.as_str())
                .await?
                .display();
            Ok(())
        }
        Command::Get(args) => {
            args.client_args
                .new_client()?
                .get(args.key.as_str())
                .await?
                .display();
            Ok(())
        }
        Command::Delete(args) => {
            args.client_args
                .new_client()?
                .delete(args.key.as_str())
                .await?
                .display();
            Ok(())
        }
        Command::Find(args) => {
            args.client_args
                .new_client()?
                .find(args.key.as_str())
                .await?
                .display();
            Ok(())
        }
        Command::Stats(args) => {
            args.client_args
                .new_client()?
                .stats()
                .await?
                .display();
            Ok(())
        }
    }
}
