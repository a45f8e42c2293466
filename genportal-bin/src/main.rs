use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use genportal_core::{
    client::GenerationClient,
    config::Config,
    model::EditAction,
    stream::StreamEvent,
};

#[derive(Parser)]
#[command(author, version, about = "genportal CLI smoke tool", long_about = None)]
struct Cli {
    /// Optional config file (JSON or TOML). Without it, GENPORTAL_BASE_URL
    /// and GENPORTAL_API_TOKEN are read from the environment.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a news body from a title
    News {
        #[arg(short, long)]
        title: String,
    },
    /// Ask the dialogue assistant (single response)
    Dialogue {
        #[arg(short, long, help = "Dialogue transcript to continue")]
        message: String,
    },
    /// Stream a dialogue answer (prints deltas live)
    DialogueStream {
        #[arg(short, long, help = "Dialogue transcript to continue")]
        message: String,
    },
    /// Expand or condense an existing news text
    Edit {
        #[arg(long)]
        text: String,
        #[arg(long, help = "Extra editing instructions")]
        request: String,
        #[arg(long, help = "Make the text longer instead of shorter")]
        longer: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        return Ok(Config::from_path(path)?);
    }
    let base_url = std::env::var("GENPORTAL_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());
    Ok(Config {
        base_url,
        api_token_env: "GENPORTAL_API_TOKEN".to_string(),
        http: Default::default(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let client = GenerationClient::from_config(&cfg)?;

    match cli.command {
        Commands::News { title } => {
            let resp = client.generate_news(&title).await?;
            println!("{}\n\n{}", resp.title, resp.content);
        }
        Commands::Dialogue { message } => {
            let resp = client.generate_dialogue(&message).await?;
            println!("{}", resp.answer);
        }
        Commands::DialogueStream { message } => {
            use std::io::{self, Write};
            let mut stream = client.stream_dialogue(&message).await;
            let mut saw_chunk = false;
            while let Some(ev) = stream.next().await {
                match ev {
                    StreamEvent::Chunk { delta, .. } => {
                        saw_chunk = true;
                        print!("{}", delta);
                        io::stdout().flush().ok();
                    }
                    StreamEvent::Complete(_) => {
                        if saw_chunk {
                            println!();
                        }
                    }
                    StreamEvent::Failed(msg) => {
                        if saw_chunk {
                            println!();
                        }
                        eprintln!("[error: {}]", msg);
                        std::process::exit(1);
                    }
                    _ => {}
                }
            }
        }
        Commands::Edit {
            text,
            request,
            longer,
        } => {
            let action = if longer {
                EditAction::Longer
            } else {
                EditAction::Shorter
            };
            let resp = client.edit_news(&text, &request, action).await?;
            println!("{}", resp.content);
        }
    }

    Ok(())
}
