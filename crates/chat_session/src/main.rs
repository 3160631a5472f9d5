use std::io;
use std::sync::{Arc, Mutex};

use chat_session::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use chat_session::controller::{LoadOutcome, SessionController, SubmitOutcome};
use chat_session::providers;
use chat_session::session::{chat_mode_from_env, ChatSession};
use cowrite::{init_logging, EnvConfig};
use generation_provider::Role;
use message_store::{InMemoryMessageStore, MessageStore};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    let config = EnvConfig::from_env();
    init_logging(&config);

    let provider = providers::provider_from_env().map_err(io::Error::other)?;
    let profile = provider.profile();
    let store: Arc<dyn MessageStore> = Arc::new(InMemoryMessageStore::new());
    let session = Arc::new(Mutex::new(ChatSession::with_mode(chat_mode_from_env())));
    let controller = SessionController::new(session, store, provider);

    println!(
        "cowrite chat ({} / {}). {HELP_TEXT}",
        profile.provider_id, profile.model_id
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_slash_command(&line) {
            Some(SlashCommand::Quit) => break,
            Some(command) => run_command(&controller, command).await,
            None => {
                let outcome = controller.submit(line).await;
                print_submit_outcome(&controller, outcome);
            }
        }
    }

    Ok(())
}

async fn run_command(controller: &SessionController, command: SlashCommand) {
    match command {
        SlashCommand::Help => println!("{HELP_TEXT}"),
        SlashCommand::New => {
            controller.clear_chat().await;
            println!("Started a new chat");
        }
        SlashCommand::Open(id) => {
            let outcome = controller.switch_conversation(Some(id)).await;
            if outcome == LoadOutcome::Failed {
                print_notification(controller);
            } else {
                print_transcript(controller);
            }
        }
        SlashCommand::Mode(mode) => {
            controller.set_chat_mode(mode);
            println!("Chat mode: {mode}");
        }
        SlashCommand::Reset => {
            controller.reset().await;
            println!("Session reset");
        }
        SlashCommand::List => {
            if let Err(error) = controller.refresh_conversations().await {
                println!("Failed to list conversations: {error}");
                return;
            }
            controller.with_session(|session| {
                if session.conversations().is_empty() {
                    println!("No conversations yet");
                }
                for conversation in session.conversations() {
                    println!(
                        "{:>4}  {}  {}",
                        conversation.id, conversation.created_at, conversation.title
                    );
                }
            });
        }
        SlashCommand::Usage(usage) => println!("{usage}"),
        SlashCommand::Unknown(command) => println!("Unknown command: {command}"),
        SlashCommand::Quit => {}
    }
}

fn print_submit_outcome(controller: &SessionController, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Committed => controller.with_session(|session| {
            if let Some(reply) = session
                .messages()
                .iter()
                .rev()
                .find(|message| message.role == Role::Assistant)
            {
                println!("{}", reply.content);
            }
        }),
        SubmitOutcome::Rejected => println!("Nothing to send"),
        SubmitOutcome::Abandoned | SubmitOutcome::Cancelled => println!("Cancelled"),
        SubmitOutcome::PersistFailed | SubmitOutcome::RolledBack => {
            print_notification(controller)
        }
    }
}

fn print_notification(controller: &SessionController) {
    if let Some(notification) = controller.with_session(ChatSession::take_notification) {
        println!("{}. {}", notification.message, notification.description);
    }
}

fn print_transcript(controller: &SessionController) {
    controller.with_session(|session| {
        for message in session.messages() {
            println!("[{}] {}", message.role.as_str(), message.content);
        }
    });
}
