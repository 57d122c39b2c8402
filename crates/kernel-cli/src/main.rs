use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::catalog::Catalog;
use contracts::{Command, CommandPayload, SessionConfig};
use kernel_api::{serve, EngineApi};

fn print_usage() {
    println!("kernel-cli <command>");
    println!("commands:");
    println!("  status");
    println!("  collect");
    println!("  build <business_id>");
    println!("  upgrade <business_id>");
    println!("  feature <business_id> <feature_id>");
    println!("  crime <crime_id>");
    println!("  attack <territory_id> <soldiers>");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  simulate <session_id> <seed> [hours] [sqlite_path]");
    println!("    runs a deterministic offline window and persists to sqlite");
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn parse_seed(value: Option<&String>) -> Result<u64, String> {
    let raw = value.ok_or_else(|| "missing seed".to_string())?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid seed: {raw}"))
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn default_sqlite_path() -> String {
    std::env::var("EMPIRE_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "empire_sessions.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

/// Submit one payload against a fresh session and print what happened.
fn submit(api: &mut EngineApi, payload: CommandPayload, now: u64) {
    let command = Command::new(
        format!("cmd_cli_{now}"),
        api.status().session_id,
        now,
        payload,
    );
    let mark = api.events().len();
    let result = api.submit_command(command);
    if let Some(error) = result.error {
        eprintln!("rejected: {} ({:?})", error.message, error.error_code);
        return;
    }
    for event in &api.events()[mark..] {
        println!(
            "{} {:?} {} {}",
            event.event_id,
            event.event_type,
            event.subject_id,
            event
                .details
                .as_ref()
                .map(|details| details.to_string())
                .unwrap_or_default()
        );
    }
}

fn run_simulation(args: &[String]) -> Result<(), String> {
    let session_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing session_id".to_string())?;
    let seed = parse_seed(args.get(3))?;
    let hours = args
        .get(4)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| format!("invalid hours: {value}"))
        })
        .transpose()?
        .unwrap_or(24);
    let sqlite_path = parse_sqlite_path(args.get(5));

    let mut config = SessionConfig::default();
    config.session_id = session_id.clone();
    config.seed = seed;

    let started_at = epoch_now();
    let mut api = EngineApi::new(config, Catalog::default(), started_at);
    api.attach_sqlite_store(PathBuf::from(&sqlite_path))
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    api.initialize_session_storage(true)
        .map_err(|err| format!("failed to initialize session storage: {err}"))?;

    // A deterministic offline window: one catch-up pass per simulated hour.
    for hour in 1..=hours {
        api.advance_to(started_at + hour * 3_600);
    }
    api.flush_persistence_checked()
        .map_err(|err| format!("persistence error after simulation: {err}"))?;

    let status = api.status();
    let player_level = api.engine().player().level;
    let player_cash = api.engine().player().cash;
    println!(
        "simulated session_id={} seed={} hours={} level={} cash={} events={} sqlite={}",
        session_id,
        seed,
        hours,
        player_level,
        player_cash,
        api.events().len(),
        sqlite_path
    );
    println!("{status}");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);
    let now = epoch_now();

    let mut api = EngineApi::new(SessionConfig::default(), Catalog::default(), now);

    match command {
        Some("status") => {
            println!("{}", api.status());
        }
        Some("collect") => {
            submit(&mut api, CommandPayload::CollectIncome, now);
        }
        Some("build") => {
            let Some(business_id) = args.get(2) else {
                eprintln!("error: missing business_id");
                return;
            };
            submit(
                &mut api,
                CommandPayload::StartBuild {
                    business_id: business_id.clone(),
                },
                now,
            );
        }
        Some("upgrade") => {
            let Some(business_id) = args.get(2) else {
                eprintln!("error: missing business_id");
                return;
            };
            submit(
                &mut api,
                CommandPayload::StartUpgrade {
                    business_id: business_id.clone(),
                },
                now,
            );
        }
        Some("feature") => {
            let (Some(business_id), Some(feature_id)) = (args.get(2), args.get(3)) else {
                eprintln!("error: missing business_id or feature_id");
                return;
            };
            submit(
                &mut api,
                CommandPayload::UnlockFeature {
                    business_id: business_id.clone(),
                    feature_id: feature_id.clone(),
                },
                now,
            );
        }
        Some("crime") => {
            let Some(crime_id) = args.get(2) else {
                eprintln!("error: missing crime_id");
                return;
            };
            submit(
                &mut api,
                CommandPayload::CommitCrime {
                    crime_id: crime_id.clone(),
                },
                now,
            );
        }
        Some("attack") => {
            let Some(territory_id) = args.get(2) else {
                eprintln!("error: missing territory_id");
                return;
            };
            let soldiers = match args.get(3).map(|raw| raw.parse::<u32>()) {
                Some(Ok(soldiers)) => soldiers,
                _ => {
                    eprintln!("error: missing or invalid soldier count");
                    return;
                }
            };
            submit(
                &mut api,
                CommandPayload::StartAttack {
                    territory_id: territory_id.clone(),
                    committed_soldiers: soldiers,
                },
                now,
            );
        }
        Some("serve") => {
            let addr = match parse_socket_addr(args.get(2)) {
                Ok(addr) => addr,
                Err(err) => {
                    eprintln!("error: {err}");
                    return;
                }
            };
            println!("serving api on http://{addr}");
            if let Err(err) = serve(api, addr).await {
                eprintln!("server error: {err}");
            }
        }
        Some("simulate") => {
            if let Err(err) = run_simulation(&args) {
                eprintln!("error: {err}");
            }
        }
        _ => print_usage(),
    }
}
