use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use multipart_uploads::client::{
    follow, FileSource, HttpSessionApi, SessionApi, UploadOrchestrator, DEFAULT_CHUNK_SIZE,
};
use multipart_uploads::Config;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the upload coordinator.
    Serve {
        #[arg(short, long, default_value = "./config.yml")]
        config_file: PathBuf,
    },
    /// Upload a file through a running coordinator.
    Upload {
        #[arg(short, long, default_value = "http://127.0.0.1:13030")]
        server: String,
        /// Part size in bytes.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
        /// List stored files once the upload succeeds.
        #[arg(short, long)]
        list: bool,
        file: PathBuf,
    },
    /// List stored files.
    List {
        #[arg(short, long, default_value = "http://127.0.0.1:13030")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .compact()
        .init();

    match cli.command {
        Command::Serve { config_file } => {
            let config = Config::from_file(&config_file)?;
            multipart_uploads::http::serve(config).await?;
        }
        Command::Upload {
            server,
            chunk_size,
            list,
            file,
        } => {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut source = FileSource::open(&file).await?;
            let orchestrator = UploadOrchestrator::new(HttpSessionApi::new(&server), chunk_size);

            let states = orchestrator.subscribe();
            let progress = tokio::spawn(follow(states, |state| println!("{state}")));

            let result = orchestrator.upload(&name, &mut source).await;
            progress.await?;
            result?;

            if list {
                print_files(orchestrator.api()).await?;
            }
        }
        Command::List { server } => {
            print_files(&HttpSessionApi::new(&server)).await?;
        }
    }

    Ok(())
}

async fn print_files<A: SessionApi>(api: &A) -> Result<()> {
    for file in api.list_files().await? {
        println!(
            "{}\t{}\t{}\t{}",
            file.uploaded.to_rfc3339(),
            file.size,
            file.name,
            file.url
        );
    }
    Ok(())
}
