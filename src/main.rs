use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, mpsc},
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use log::{info, warn};
use lmu_weather::{
    AppConfig, LmuWeatherError, PropertyRequest, PropertyValue, SessionKind, WeatherPlugin,
    properties::PropertyDump,
    telemetry::{self, MockTelemetryProducer},
    writer,
};
use tokio::runtime::{Builder, Runtime};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Root of the simulator REST server, overrides the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every property the plugin registers with the host
    Properties,
    /// Fetch the forecast and schedule once and print the resolved properties
    Fetch {
        #[arg(short, long, default_value = "RACE")]
        session: String,
    },
    /// Replay recorded telemetry frames against the live REST server
    Watch {
        #[arg(short, long)]
        replay: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Args) -> AppConfig {
    let mut config = match AppConfig::from_local_file() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            warn!("Could not load config file, using defaults: {}", e);
            AppConfig::default()
        }
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(poll_interval_ms) = cli.poll_interval_ms {
        config.poll_interval_ms = poll_interval_ms;
    }
    config
}

fn runtime() -> Result<Runtime, LmuWeatherError> {
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| LmuWeatherError::RuntimeError { source: e })
}

fn print_dump(dump: &PropertyDump) -> Result<(), LmuWeatherError> {
    let json = serde_json::to_string_pretty(dump)
        .map_err(|e| LmuWeatherError::DumpSerializeError { source: e })?;
    println!("{}", json);
    Ok(())
}

fn properties(config: &AppConfig) -> Result<(), LmuWeatherError> {
    let plugin = WeatherPlugin::from_config(config)?;
    for name in plugin.property_names() {
        println!("{:<40} {:?}", name, PropertyRequest::parse(name).value_kind());
    }
    Ok(())
}

fn fetch(config: &AppConfig, session: &str) -> Result<(), LmuWeatherError> {
    let runtime = runtime()?;
    let plugin = WeatherPlugin::from_config(config)?;
    let dump = runtime.block_on(plugin.fetch_table(SessionKind::classify(Some(session))))?;
    print_dump(&dump)
}

fn watch(
    config: &AppConfig,
    replay: &PathBuf,
    output: Option<PathBuf>,
) -> Result<(), LmuWeatherError> {
    let runtime = runtime()?;
    let plugin = Arc::new(WeatherPlugin::from_config(config)?);
    let producer = MockTelemetryProducer::from_file(replay)?;
    info!("Replaying {} telemetry frames from {:?}", producer.len(), replay);

    let mut registry: BTreeMap<String, PropertyRequest> = BTreeMap::new();
    plugin.init(&mut registry, runtime.handle());

    // if we need to write an output file every sampled table also goes to the writer thread
    let (dump_tx, writer_thread) = match output {
        Some(output_file) => {
            let (tx, rx) = mpsc::channel::<PropertyDump>();
            let handle = thread::spawn(move || writer::write_properties(&output_file, rx));
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    let collector_plugin = Arc::clone(&plugin);
    let refresh = config.telemetry_refresh();
    let collector = thread::spawn(move || {
        telemetry::collect_telemetry(producer, &*collector_plugin, refresh)
    });

    let sample_every = config.poll_interval().max(Duration::from_millis(100));
    while !collector.is_finished() {
        thread::sleep(sample_every);
        let dump = plugin.dump();
        let sky = dump
            .values
            .get("CURRENTNODE_WNV_SKYStr")
            .and_then(PropertyValue::as_str)
            .unwrap_or_default();
        let temperature = dump
            .values
            .get("CURRENTNODE_WNV_TEMPERATURE")
            .and_then(PropertyValue::as_f64)
            .unwrap_or_default();
        println!(
            "{} at {}: {} {:.1} (polling {:?})",
            dump.session_kind,
            dump.current_node,
            sky,
            temperature,
            plugin.poller_state()
        );
        if let Some(tx) = &dump_tx {
            tx.send(dump)?;
        }
    }

    let collected = collector
        .join()
        .map_err(|_| LmuWeatherError::ThreadPanicked {
            thread: "telemetry collector".to_string(),
        })?;
    plugin.end();

    drop(dump_tx);
    if let Some(handle) = writer_thread {
        handle
            .join()
            .map_err(|_| LmuWeatherError::ThreadPanicked {
                thread: "property writer".to_string(),
            })??;
    }

    let frames = collected?;
    info!("Replay finished after {} frames", frames);
    print_dump(&plugin.dump())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    }) {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    let config = load_config(&cli);
    let result = match &cli.command {
        Commands::Properties => properties(&config),
        Commands::Fetch { session } => fetch(&config, session),
        Commands::Watch { replay, output } => watch(&config, replay, output.clone()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.is_remote() {
            eprintln!("Is the simulator running with its REST server at {}?", config.base_url);
        }
        std::process::exit(1);
    }
}
