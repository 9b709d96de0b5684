use localpod::cli::{Args, ExecutionMode, SessionConfig};
use localpod::integration::Session;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "localpod=debug" } else { "localpod=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = args.session_config();
    init_logging(config.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args.mode(), &config)) {
        Ok(code) => {
            debug!("Exiting with {}", code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: ExecutionMode, config: &SessionConfig) -> anyhow::Result<i32> {
    info!("Using runtime {}", config.runtime);
    let session = Session::from_config(config)?;

    match mode {
        ExecutionMode::Up => {
            session
                .up(&mut tokio::io::stdout(), &mut tokio::io::stderr())
                .await
        }
        ExecutionMode::Stop => session.stop().await.map(|()| 0),
        ExecutionMode::Remove => session.remove().await.map(|()| 0),
        ExecutionMode::ShowConfig => {
            let report = session.show_config()?;
            eprintln!("# {} ({:?})", report.path.display(), report.source);
            eprintln!("# fingerprint: {}", report.fingerprint);
            println!("{}", report.json);
            Ok(0)
        }
    }
}
