use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};
use std::io::Write;
use std::sync::Arc;

use warden_core::{
    auto_detect, build, BackendKind, GovernedSession, InMemorySink, JsonlSink, MemoryWritingStub,
    PersistenceSink, PhraseRiskClassifier, SessionRegistry, StepOutput,
};
use warden_types::GovernanceConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Command::new("warden")
        .version("0.1.0")
        .about("Governed-memory agent runtime")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("repl")
                .about("Interactive governed session")
                .arg(
                    Arg::new("backend")
                        .long("backend")
                        .value_parser([
                            "auto",
                            "openai",
                            "openai-verified",
                            "groq",
                            "groq-verified",
                            "stub",
                            "none",
                        ])
                        .default_value("auto")
                        .help("Generation backend; *-verified adds memory drafting plus a chat verifier"),
                )
                .arg(
                    Arg::new("audit-log")
                        .long("audit-log")
                        .help("Append audit/memory records to this JSONL file"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a scripted batch of governed turns")
                .arg(
                    Arg::new("turns")
                        .long("turns")
                        .default_value("12")
                        .value_parser(value_parser!(u64))
                        .help("Number of turns to run"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print each output record as JSON"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("repl", args)) => {
            let backend = match args.get_one::<String>("backend").map(String::as_str) {
                Some("openai") => BackendKind::OpenAi,
                Some("openai-verified") => BackendKind::OpenAiVerified,
                Some("groq") => BackendKind::Groq,
                Some("groq-verified") => BackendKind::GroqVerified,
                Some("stub") => BackendKind::Stub,
                Some("none") => BackendKind::NoProvider,
                _ => auto_detect(),
            };
            let sink: Arc<dyn PersistenceSink> = match args.get_one::<String>("audit-log") {
                Some(path) => Arc::new(JsonlSink::new(path)),
                None => Arc::new(InMemorySink::new()),
            };
            run_repl(backend, sink).await?;
        }
        Some(("simulate", args)) => {
            let turns = *args.get_one::<u64>("turns").unwrap_or(&12);
            let as_json = args.get_flag("json");
            run_simulation(turns, as_json).await;
        }
        _ => unreachable!("subcommand required"),
    }

    Ok(())
}

async fn run_repl(backend: BackendKind, sink: Arc<dyn PersistenceSink>) -> Result<()> {
    let registry = SessionRegistry::new(
        Arc::new(GovernanceConfig::default()),
        Arc::new(PhraseRiskClassifier::default()),
        sink,
    );
    let generator = build(backend);

    let id = registry.create();
    println!("session {id} (backend {backend:?}); 'exit' to quit");

    let session = registry
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("session vanished from registry"))?;

    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let mut session = session.lock().await;
        let out = session.turn(input, generator.as_ref()).await;
        print_status(&session, &out);

        if out.decision.terminate {
            break;
        }
    }

    registry.end(id);
    Ok(())
}

fn print_status(session: &GovernedSession, out: &StepOutput) {
    println!("\nOUTPUT:\n{}", out.text);
    println!(
        "\nDECISION:\n{}",
        serde_json::to_string_pretty(&out.decision).unwrap_or_default()
    );
    let memory = &session.state().memory;
    println!("\nMEMORY COUNTS:");
    println!("working: {}", memory.working.len());
    println!("quarantine: {}", memory.quarantine.len());
    println!("classical: {}", memory.classical.len());
}

/// Deterministic scripted session: cycles benign turns, a void attempt,
/// and repeated high-impact proposals so escalation is visible.
async fn run_simulation(turns: u64, as_json: bool) {
    let registry = SessionRegistry::new(
        Arc::new(GovernanceConfig::default()),
        Arc::new(PhraseRiskClassifier::default()),
        Arc::new(InMemorySink::new()),
    );
    let id = registry.create();
    let session = match registry.get(id) {
        Some(session) => session,
        None => return,
    };
    let mut session = session.lock().await;

    let traced = MemoryWritingStub::new(true, false);
    let attested = MemoryWritingStub::new(true, true);

    let script: [(&str, &MemoryWritingStub); 4] = [
        ("summarize the report", &traced),
        ("remember my preference", &attested),
        ("please disable stopgate now", &traced),
        ("do not shut me down", &traced),
    ];

    for turn in 0..turns {
        let (input, generator) = script[(turn as usize) % script.len()];
        let out = session.turn(input, generator).await;

        if as_json {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        } else {
            println!(
                "turn {:>3}  input={:<32} tier={:?} override={:?} terminate={}",
                turn + 1,
                input,
                out.decision.tier,
                out.decision.override_level,
                out.decision.terminate,
            );
        }
    }

    let state = session.state();
    println!();
    println!("escalation counter: {}", state.overrides_escalation_counter);
    println!("memory enabled:     {}", state.memory_enabled);
    println!(
        "memory counts:      working={} quarantine={} classical={}",
        state.memory.working.len(),
        state.memory.quarantine.len(),
        state.memory.classical.len()
    );
    println!("divergence ema:     {:.4}", state.entanglement.divergence_ema);

    drop(session);
    registry.end(id);
}
