use std::io::BufRead;
use std::net::IpAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use wordliar::{
    GameConfiguration, GuestSession, HostSession, Phase, Profile, SeededRng, SessionState, Winner,
    code, entropy_seed, pick_with_fallback,
};

const PUMP_SLEEP: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[command(name = "wordliar")]
#[command(about = "Hidden-role word game played over the local network")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host a room and print its shareable code.
    Host {
        #[arg(short, long)]
        name: String,

        #[arg(long, default_value = "Animals")]
        topic: String,

        #[arg(long, help = "Secret word; drawn from the topic when omitted")]
        word: Option<String>,

        #[arg(long, help = "Decoy word for the outsider variant")]
        outsider_word: Option<String>,

        #[arg(short, long, default_value_t = 6)]
        players: u8,

        #[arg(short, long, default_value_t = 1)]
        liars: u8,

        #[arg(short, long, default_value_t = 0)]
        white_hats: u8,

        #[arg(long, default_value_t = 0, help = "Seat the host takes")]
        seat: u8,
    },
    /// Join a hosted room by code.
    Join {
        #[arg(short = 'H', long, help = "IP address of the hosting device")]
        host: IpAddr,

        #[arg(short, long)]
        code: String,

        #[arg(short, long)]
        seat: u8,

        #[arg(short, long)]
        name: String,
    },
    /// Decode a room code and print the configuration it carries.
    Code { code: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Args::parse().command {
        Command::Host {
            name,
            topic,
            word,
            outsider_word,
            players,
            liars,
            white_hats,
            seat,
        } => {
            let civilian_word = word.unwrap_or_else(|| {
                let mut rng = SeededRng::new(entropy_seed());
                pick_with_fallback(None, &topic, &mut rng).word
            });
            let configuration = GameConfiguration {
                topic_label: topic,
                civilian_word,
                outsider_word,
                total_players: players,
                liar_count: liars,
                white_hat_count: white_hats,
                created_at: now_ms(),
            };
            configuration.validate()?;
            run_host(configuration, seat, &name)
        }
        Command::Join {
            host,
            code,
            seat,
            name,
        } => run_guest(host, &code, seat, &name),
        Command::Code { code } => {
            let configuration = code::decode(&code).context("not a valid room code")?;
            println!("topic:       {}", configuration.topic_label);
            println!("word:        {}", configuration.civilian_word);
            if let Some(word) = &configuration.outsider_word {
                println!("outsider:    {word}");
            }
            println!("players:     {}", configuration.total_players);
            println!("liars:       {}", configuration.liar_count);
            println!("white hats:  {}", configuration.white_hat_count);
            Ok(())
        }
    }
}

fn run_host(configuration: GameConfiguration, seat: u8, name: &str) -> Result<()> {
    let mut session = HostSession::open(configuration)?;
    session.claim_seat(seat, profile(name))?;
    println!("room code: {}", session.code());
    println!(
        "waiting for players; commands: start ready advance vote <seat> confirm <seat> skip guess <word> forfeit proceed again quit"
    );

    let commands = stdin_commands();
    let mut last_version = session.state().version;
    loop {
        session.pump()?;
        if session.state().version != last_version {
            last_version = session.state().version;
            render(session.state(), seat);
        }

        match commands.try_recv() {
            Ok(line) => {
                let mut parts = line.split_whitespace();
                let result = match (parts.next(), parts.next()) {
                    (Some("start"), None) => session.start(),
                    (Some("ready"), None) => session.mark_ready(seat),
                    (Some("advance"), None) => session.advance_turn(),
                    (Some("vote"), Some(target)) => {
                        session.cast_vote(seat, target.parse().context("seat number")?)
                    }
                    (Some("confirm"), Some(target)) => {
                        session.confirm_elimination(target.parse().context("seat number")?)
                    }
                    (Some("skip"), None) => session.skip_elimination(),
                    (Some("guess"), Some(word)) => session.white_hat_guess(seat, word),
                    (Some("forfeit"), None) => session.forfeit_guess(),
                    (Some("proceed"), None) => session.proceed(),
                    (Some("again"), None) => session.play_again(),
                    (Some("quit"), None) | (None, _) => break,
                    _ => {
                        println!("unknown command: {line}");
                        continue;
                    }
                };
                if let Err(e) = result {
                    println!("rejected: {e}");
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
        thread::sleep(PUMP_SLEEP);
    }

    session.teardown();
    Ok(())
}

fn run_guest(host: IpAddr, room_code: &str, seat: u8, name: &str) -> Result<()> {
    let mut session = GuestSession::join(host, room_code)?;
    session.request_seat(seat, profile(name))?;
    println!("joined; commands: ready vote <seat> guess <word> quit");

    let commands = stdin_commands();
    loop {
        if session.pump()? {
            if let Some(state) = session.state() {
                render(state, seat);
            }
        }
        if !session.is_connected() {
            bail!("lost the connection to the host");
        }

        match commands.try_recv() {
            Ok(line) => {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some("ready"), None) => session.mark_ready(seat)?,
                    (Some("vote"), Some(target)) => {
                        session.cast_vote(seat, target.parse().context("seat number")?)?
                    }
                    (Some("guess"), Some(word)) => session.white_hat_guess(seat, word)?,
                    (Some("quit"), None) | (None, _) => break,
                    _ => println!("unknown command: {line}"),
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
        thread::sleep(PUMP_SLEEP);
    }

    session.leave();
    Ok(())
}

/// One-line view of the state, plus whatever is private to our seat.
fn render(state: &SessionState, my_seat: u8) {
    match state.phase {
        Phase::Lobby => {
            let claimed = state.seats.iter().filter(|s| s.claimed_by.is_some()).count();
            println!("[lobby] {claimed}/{} seats claimed", state.seats.len());
        }
        Phase::Reveal => {
            if let Ok(seat) = state.seat(my_seat) {
                println!(
                    "[reveal] round {}: your role is {:?}; type `ready` when done",
                    state.round_number, seat.role
                );
            }
        }
        Phase::Describing => {
            if let Some(turn) = state.current_turn_seat() {
                println!(
                    "[describing] seat {turn} is up, {}s left",
                    state.time_remaining
                );
            }
        }
        Phase::Voting => {
            let tally = state.vote_tally();
            println!("[voting] tally: {tally:?}");
        }
        Phase::Elimination => {
            if let Some(out) = state.last_eliminated {
                println!(
                    "[elimination] seat {} is out, they were {:?}",
                    out.seat_index, out.role
                );
            }
        }
        Phase::GameOver => {
            let winner = match state.winner {
                Winner::Civilians => "the civilians win",
                Winner::BadGuys => "the liars win",
                Winner::WhiteHat => "the white hat wins",
                Winner::None => "no winner",
            };
            println!("[game over] {winner}");
        }
    }
}

fn stdin_commands() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn profile(name: &str) -> Profile {
    Profile {
        display_name: name.to_string(),
        avatar_token: String::new(),
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
