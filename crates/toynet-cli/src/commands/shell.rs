//! Interactive shell driving one session through the orchestrator.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio_util::sync::CancellationToken;

use toynet_application::request::{
    CreateHostRequest, CreateSessionRequest, CreateSwitchRequest, DeleteDeviceRequest,
    ModifyTopologyRequest, RunCommandRequest,
};
use toynet_application::{Collaborators, ReadinessPolicy, SessionUseCase};
use toynet_core::clock::SystemClock;
use toynet_core::container::ContainerDriver;
use toynet_core::error::ToynetError;
use toynet_core::session::SessionId;
use toynet_infrastructure::{DockerDriver, HttpEmulatorClient, SimpleCommandParser};

use super::Environment;

/// Session the shell attaches to.
pub enum Target {
    Existing(u64),
    New { topo_id: u64, user_id: String },
}

const COMMANDS: [&str; 9] = [
    "show",
    "host",
    "switch",
    "delete",
    "edit",
    "run",
    "terminate",
    "help",
    "exit",
];

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Show,
    Host {
        name: String,
        ip: String,
        gateway: String,
    },
    Switch(String),
    Delete {
        kind: String,
        name: String,
    },
    Edit {
        command: String,
        ip: Option<String>,
    },
    Run(String),
    Terminate,
    Help,
    Exit,
}

fn parse_line(line: &str) -> std::result::Result<ShellCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = words.split_first() else {
        return Err("empty command".to_string());
    };

    match (head, rest) {
        ("show", []) => Ok(ShellCommand::Show),
        ("host", [name, ip, gateway]) => Ok(ShellCommand::Host {
            name: name.to_string(),
            ip: ip.to_string(),
            gateway: gateway.to_string(),
        }),
        ("switch", [name]) => Ok(ShellCommand::Switch(name.to_string())),
        ("delete", [kind, name]) => Ok(ShellCommand::Delete {
            kind: kind.to_string(),
            name: name.to_string(),
        }),
        ("edit", rest) if !rest.is_empty() => {
            let (command, ip) = match rest.iter().position(|w| *w == "--ip") {
                Some(at) => {
                    let ip = rest
                        .get(at + 1)
                        .ok_or_else(|| "--ip needs a value".to_string())?;
                    let mut words = rest[..at].to_vec();
                    words.extend_from_slice(&rest[at + 2..]);
                    (words.join(" "), Some(ip.to_string()))
                }
                None => (rest.join(" "), None),
            };
            Ok(ShellCommand::Edit { command, ip })
        }
        ("run", rest) if !rest.is_empty() => {
            // Keep the command text as typed, including inner spacing
            let command = line.trim_start()[head.len()..].trim_start();
            Ok(ShellCommand::Run(command.to_string()))
        }
        ("terminate", []) => Ok(ShellCommand::Terminate),
        ("help", _) => Ok(ShellCommand::Help),
        ("exit" | "quit", _) => Ok(ShellCommand::Exit),
        _ => Err(format!("cannot parse '{}', type 'help'", line.trim())),
    }
}

fn print_help() {
    let lines = [
        "show                          print the session and its topology",
        "host <name> <ip> <gateway>    add a host behind the router owning <gateway>",
        "switch <name>                 add a switch",
        "delete <kind> <name>          delete a host, switch or router",
        "edit <command> [--ip <ip>]    apply a raw modification command",
        "run <command>                 run a command in the live network",
        "terminate                     stop the emulator (topology is kept)",
        "exit                          leave the shell and stop all emulators",
    ];
    for line in lines {
        println!("{}", line.bright_black());
    }
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct ShellHelper;

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if line.contains(' ') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match line.split_whitespace().next() {
            Some(head) if COMMANDS.contains(&head) => Owned(line.bright_cyan().to_string()),
            _ => Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ShellHelper {}

fn report(error: &ToynetError) {
    eprintln!(
        "{}",
        format!("[{}] {}", error.status_code(), error).red()
    );
}

async fn build_usecase(env: &Environment, cancel: CancellationToken) -> Result<SessionUseCase> {
    let driver = Arc::new(DockerDriver::connect(env.config.emulator.clone())?);
    driver
        .ensure_image()
        .await
        .with_context(|| format!("Failed to provide emulator image {}", env.config.emulator.image))?;

    let store = Arc::new(env.store.clone());
    let collaborators = Collaborators {
        sessions: store.clone(),
        templates: store.clone(),
        users: store,
        driver,
        emulator: Arc::new(HttpEmulatorClient::new(&env.config.emulator)?),
        command_parser: Arc::new(SimpleCommandParser::new()),
    };

    Ok(SessionUseCase::new(
        collaborators,
        Arc::new(SystemClock),
        ReadinessPolicy::from(&env.config.readiness),
    )
    .with_cancellation(cancel))
}

/// Runs `operation`, cancelling `cancel` if `signal` fires before it ends.
///
/// The operation still runs to completion so a cancelled bring-up can clean
/// up after itself. Once it has finished the signal is no longer watched.
async fn cancel_on_signal<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = T>,
    signal: impl Future<Output = ()>,
) -> T {
    tokio::pin!(operation);
    tokio::select! {
        output = &mut operation => output,
        _ = signal => {
            cancel.cancel();
            operation.await
        }
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn attach(usecase: &SessionUseCase, target: Target) -> toynet_core::Result<SessionId> {
    match target {
        Target::Existing(id) => {
            let id = SessionId(id);
            let view = usecase.get_session(id).await?;
            print_running(id, view.running);
            Ok(id)
        }
        Target::New { topo_id, user_id } => {
            println!("{}", "Provisioning emulator, this can take a while...".bright_black());
            let created = usecase
                .create_session(&CreateSessionRequest::new(topo_id, user_id))
                .await?;
            print_running(created.session_id, created.running);
            Ok(created.session_id)
        }
    }
}

pub async fn run(env: &Environment, target: Target) -> Result<()> {
    // Ctrl-C only aborts the initial bring-up; inside the shell it is
    // handled per prompt by rustyline.
    let cancel = CancellationToken::new();
    let usecase = build_usecase(env, cancel.child_token()).await?;

    let attached = cancel_on_signal(&cancel, attach(&usecase, target), ctrl_c()).await;

    let result = match attached {
        Ok(_) if cancel.is_cancelled() => {
            println!("{}", "Interrupted, stopping emulators".yellow());
            Ok(())
        }
        Ok(session_id) => repl(&usecase, session_id).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = usecase.shutdown().await {
        report(&e);
    }
    result
}

fn print_running(session_id: SessionId, running: bool) {
    if running {
        println!("{}", format!("Session {} is live", session_id).bright_green());
    } else {
        println!(
            "{}",
            format!(
                "Session {} has no emulator (no capacity or bring-up failed); 'show' retries",
                session_id
            )
            .yellow()
        );
    }
}

async fn repl(usecase: &SessionUseCase, session_id: SessionId) -> Result<()> {
    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHelper));

    println!("{}", "=== ToyNet shell ===".bright_magenta().bold());
    println!("{}", "Type 'help' for commands, 'exit' to leave.".bright_black());

    let prompt = format!("toynet[{}]> ", session_id);
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'exit' to leave.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message.yellow());
                continue;
            }
        };

        if command == ShellCommand::Exit {
            break;
        }
        if let Err(e) = execute(usecase, session_id, command).await {
            report(&e);
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

async fn execute(
    usecase: &SessionUseCase,
    session_id: SessionId,
    command: ShellCommand,
) -> toynet_core::Result<()> {
    match command {
        ShellCommand::Show => {
            let view = usecase.get_session(session_id).await?;
            println!(
                "{}",
                format!(
                    "topo {} | user {} | running {}",
                    view.topo_id, view.user_id, view.running
                )
                .bright_blue()
            );
            println!("{}", view.topology);
        }
        ShellCommand::Host { name, ip, gateway } => {
            usecase
                .create_host(session_id, &CreateHostRequest::new(name, ip, gateway))
                .await?;
            println!("{}", "Host added".green());
        }
        ShellCommand::Switch(name) => {
            usecase
                .create_switch(session_id, &CreateSwitchRequest::new(name))
                .await?;
            println!("{}", "Switch added".green());
        }
        ShellCommand::Delete { kind, name } => {
            usecase
                .delete_device(session_id, &DeleteDeviceRequest::new(kind, name))
                .await?;
            println!("{}", "Device deleted".green());
        }
        ShellCommand::Edit { command, ip } => {
            let request = ModifyTopologyRequest {
                command: Some(command),
                ip,
            };
            usecase.modify_topology(session_id, &request).await?;
            println!("{}", "Topology updated".green());
        }
        ShellCommand::Run(command) => {
            let output = usecase
                .run_command(session_id, &RunCommandRequest::new(command))
                .await?;
            for line in output.output.lines() {
                println!("{}", line.bright_blue());
            }
        }
        ShellCommand::Terminate => {
            usecase.terminate_session(session_id).await?;
            println!("{}", "Emulator stopped".green());
        }
        ShellCommand::Help => print_help(),
        ShellCommand::Exit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structural_commands() {
        assert_eq!(parse_line("show"), Ok(ShellCommand::Show));
        assert_eq!(
            parse_line("host h2 10.0.0.7/24 10.0.0.1"),
            Ok(ShellCommand::Host {
                name: "h2".to_string(),
                ip: "10.0.0.7/24".to_string(),
                gateway: "10.0.0.1".to_string(),
            })
        );
        assert_eq!(
            parse_line("delete switch s1"),
            Ok(ShellCommand::Delete {
                kind: "switch".to_string(),
                name: "s1".to_string(),
            })
        );
        assert!(parse_line("host h2").is_err());
    }

    #[test]
    fn test_parse_edit_with_ip() {
        assert_eq!(
            parse_line("edit create host h3 10.0.0.1 --ip 10.0.0.9/24"),
            Ok(ShellCommand::Edit {
                command: "create host h3 10.0.0.1".to_string(),
                ip: Some("10.0.0.9/24".to_string()),
            })
        );
        assert_eq!(
            parse_line("edit link h1 s1"),
            Ok(ShellCommand::Edit {
                command: "link h1 s1".to_string(),
                ip: None,
            })
        );
        assert!(parse_line("edit create host h3 --ip").is_err());
    }

    #[test]
    fn test_parse_run_and_exit() {
        assert_eq!(
            parse_line("run h1 ping -c1 h2"),
            Ok(ShellCommand::Run("h1 ping -c1 h2".to_string()))
        );
        assert_eq!(
            parse_line("  run h1 echo 'a  b'  "),
            Ok(ShellCommand::Run("h1 echo 'a  b'  ".to_string()))
        );
        assert_eq!(parse_line("quit"), Ok(ShellCommand::Exit));
        assert!(parse_line("run").is_err());
        assert!(parse_line("reboot").is_err());
    }

    #[tokio::test]
    async fn test_signal_during_operation_cancels() {
        let cancel = CancellationToken::new();
        let observed = cancel_on_signal(
            &cancel,
            {
                let cancel = cancel.clone();
                async move {
                    cancel.cancelled().await;
                    "cleaned up"
                }
            },
            async {},
        )
        .await;

        assert_eq!(observed, "cleaned up");
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_after_operation_is_ignored() {
        let cancel = CancellationToken::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let value = cancel_on_signal(&cancel, async { 7 }, async {
            let _ = rx.await;
        })
        .await;
        assert_eq!(value, 7);

        let _ = tx.send(());
        tokio::task::yield_now().await;
        assert!(!cancel.is_cancelled());
    }
}
