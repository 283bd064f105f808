use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use draughts_engine::{Color, Move, Pos};
use shared::{CreateGameRequest, GameId, GameMode, ServerEvent};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use xfdraughts::{render, ApiClient, Backoff, FeedEvent, Predictor, Subscriber};

#[derive(Parser, Debug)]
#[command(name = "xfdraughts")]
#[command(about = "Client for the XFDraughts game server")]
struct Args {
    /// Base URL of the game server
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Start a game and print its id
    New {
        #[arg(long)]
        white: Option<String>,
        #[arg(long)]
        black: Option<String>,
        /// rated, casual, hotseat or bot
        #[arg(long, default_value = "casual", value_parser = parse_mode)]
        mode: GameMode,
        #[arg(long)]
        clock_secs: Option<u64>,
    },
    /// Follow a game live, reconnecting on drops
    Watch {
        id: GameId,
        /// First reconnect delay in milliseconds
        #[arg(long, default_value_t = 500)]
        backoff_ms: u64,
        /// Longest reconnect delay in seconds
        #[arg(long, default_value_t = 30)]
        backoff_max_secs: u64,
    },
    /// Legal destinations of the piece on a square, e.g. `C3`
    Moves {
        id: GameId,
        square: Pos,
        #[arg(long, value_parser = parse_color)]
        color: Color,
    },
    /// Submit one step, e.g. `C3->D4`
    Play {
        id: GameId,
        step: Move,
        #[arg(long, value_parser = parse_color)]
        color: Color,
    },
    Resign {
        id: GameId,
        #[arg(long, value_parser = parse_color)]
        color: Color,
    },
    OfferDraw {
        id: GameId,
        #[arg(long, value_parser = parse_color)]
        color: Color,
    },
    RespondDraw {
        id: GameId,
        #[arg(long, value_parser = parse_color)]
        color: Color,
        #[arg(long)]
        accept: bool,
    },
    Rematch {
        id: GameId,
        #[arg(long, value_parser = parse_color)]
        color: Color,
    },
    /// Print a finished game ply by ply
    Replay { id: GameId },
}

fn parse_color(s: &str) -> Result<Color, String> {
    match s.to_ascii_lowercase().as_str() {
        "white" | "w" => Ok(Color::White),
        "black" | "b" => Ok(Color::Black),
        other => Err(format!("unknown color {other}")),
    }
}

fn parse_mode(s: &str) -> Result<GameMode, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown mode {s}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let api = ApiClient::new(args.server);

    match args.command {
        Cmd::New {
            white,
            black,
            mode,
            clock_secs,
        } => {
            let req = CreateGameRequest {
                white,
                black,
                mode,
                clock_secs,
                bot_color: None,
            };
            let snapshot = api.create_game(&req).await?;
            println!("{}", snapshot.id);
        }
        Cmd::Watch {
            id,
            backoff_ms,
            backoff_max_secs,
        } => {
            let backoff = Backoff::new(
                Duration::from_millis(backoff_ms),
                Duration::from_secs(backoff_max_secs),
            );
            let (mut feed, _task) = Subscriber::new(api, id).with_backoff(backoff).spawn(16);
            while let Some(event) = feed.recv().await {
                match event {
                    FeedEvent::Connected(snapshot)
                    | FeedEvent::Event(ServerEvent::Snapshot(snapshot)) => {
                        print!("{}", render(&snapshot.board));
                        println!(
                            "{} to move, {:?}, white {:.0}s black {:.0}s",
                            snapshot.turn, snapshot.status, snapshot.timers.white, snapshot.timers.black
                        );
                    }
                    FeedEvent::Event(other) => println!("{other:?}"),
                    FeedEvent::Disconnected { retry_in } => {
                        println!("disconnected, retrying in {retry_in:?}")
                    }
                }
            }
        }
        Cmd::Moves { id, square, color } => {
            let found = api.moves(id, square, color).await?;
            let list: Vec<String> = found.destinations.iter().map(Pos::to_string).collect();
            println!("{square}: {}", list.join(" "));
        }
        Cmd::Play { id, step, color } => {
            let mut predictor = Predictor::new(api.snapshot(id).await?);
            if !predictor.destinations(step.from, color).contains(&step.to) {
                bail!("{step} is not playable for {color}");
            }
            let req = predictor
                .predict(step, color)
                .with_context(|| format!("predicting {step}"))?;
            let snapshot = api.submit_move(id, &req).await?;
            predictor.reconcile(snapshot);
            print!("{}", render(predictor.board()));
            println!("{} to move", predictor.turn());
        }
        Cmd::Resign { id, color } => {
            let snapshot = api.resign(id, color).await?;
            println!("{:?} ({:?})", snapshot.status, snapshot.reason);
        }
        Cmd::OfferDraw { id, color } => {
            api.offer_draw(id, color).await?;
            println!("draw offered");
        }
        Cmd::RespondDraw { id, color, accept } => {
            let snapshot = api.respond_draw(id, color, accept).await?;
            println!("{:?}", snapshot.status);
        }
        Cmd::Rematch { id, color } => {
            let status = api.request_rematch(id, color).await?;
            match status.game_id {
                Some(next) => println!("rematch started: {next}"),
                None => println!("rematch requested"),
            }
        }
        Cmd::Replay { id } => {
            let game = api.replay(id).await?;
            for (index, board) in game.snapshots.iter().enumerate() {
                match index.checked_sub(1).and_then(|i| game.history.get(i)) {
                    Some(step) => println!("{index}. {step}"),
                    None => println!("start"),
                }
                print!("{}", render(board));
            }
            println!("{:?} ({:?})", game.status, game.reason);
        }
    }
    Ok(())
}
