//! Taleweaver - Console front end for the narrative engine

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taleweaver_engine::application::ports::outbound::PresentationPort;
use taleweaver_engine::application::services::{
    MoveOutcome, TransitionInput, SYSTEM_SPEAKER,
};
use taleweaver_engine::domain::value_objects::SystemRequest;
use taleweaver_engine::infrastructure::config::AppConfig;
use taleweaver_engine::infrastructure::console::{
    parse_command, ConsoleCommand, ConsolePresenter, HELP_TEXT,
};
use taleweaver_engine::infrastructure::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taleweaver_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Taleweaver");

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Backend: {} ({})", config.llm.api_url, config.llm.model);
    tracing::info!("  World: {}", config.world_file.display());

    let state = Arc::new(AppState::new(config)?);
    let out = ConsolePresenter;

    if let Some(arrival) = state.start().await? {
        print_location(&state).await;
        out.show_dialogue(SYSTEM_SPEAKER, &arrival.message);
    }
    println!("{}", HELP_TEXT);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                state.scene.advance_clock().await;
                if !handle_line(&state, &out, &line).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}

/// Returns false when the player quits
async fn handle_line(state: &AppState, out: &ConsolePresenter, line: &str) -> bool {
    let session = &state.session;

    match parse_command(line) {
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => println!("{}", HELP_TEXT),
        ConsoleCommand::Unknown(text) => println!("Unknown command: {} (try /help)", text),

        ConsoleCommand::Say(text) => {
            if state.transitions.is_transitioning().await {
                handle_transition_input(state, out, &text).await;
            } else {
                player_turn(state, out, &text).await;
            }
        }

        ConsoleCommand::Go(destination) => match state.transitions.request_move(&destination).await {
            Ok(MoveOutcome::Arrived(arrival)) => {
                print_location(state).await;
                out.show_dialogue(SYSTEM_SPEAKER, &arrival.message);
            }
            Ok(MoveOutcome::FarewellNeeded { character }) => println!(
                "{} is here. Say goodbye first, or /cancel to stay.",
                character
            ),
            Err(e) => println!("{}", e),
        },

        ConsoleCommand::Cancel => {
            state.transitions.cancel_transition().await;
            println!("You decide to stay.");
        }

        ConsoleCommand::Regenerate => {
            state.scene.refresh_context().await;
            match session.regenerate().await {
                Ok(reply) => match state.scene.current_character().await {
                    Some(character) => out.show_dialogue(&character, &reply),
                    None => println!("{}", reply),
                },
                Err(e) => println!("{}", e),
            }
        }

        ConsoleCommand::Memory => match state.scene.current_character().await {
            Some(character) => system_request(state, out, SystemRequest::memory_summary(character)).await,
            None => println!("Nobody here to remember anything."),
        },
        ConsoleCommand::Emotions => system_request(state, out, SystemRequest::emotional_analysis()).await,
        ConsoleCommand::Plot(count) => system_request(state, out, SystemRequest::plot_summary(count)).await,
        ConsoleCommand::Relationship => system_request(state, out, SystemRequest::relationship()).await,
        ConsoleCommand::System(instruction) => {
            system_request(state, out, SystemRequest::custom(instruction).with_show_on_ui(true)).await
        }

        ConsoleCommand::History => {
            for message in session.get_history().await {
                out.show_dialogue(message.sender(), message.text());
            }
        }
    }

    true
}

async fn player_turn(state: &AppState, out: &ConsolePresenter, text: &str) {
    let Some(character) = state.scene.current_character().await else {
        println!("Nobody is here. Try /go <location>.");
        return;
    };

    let player = state.scene.player_name().await;
    let id = if text.is_empty() {
        None
    } else {
        Some(state.session.add_message(&player, text).await)
    };

    state.scene.refresh_context().await;
    match state.session.request_response(&character).await {
        Ok(reply) => out.show_dialogue(&character, &reply),
        Err(e) => {
            if let Some(id) = id {
                state.session.retract_message(id).await;
            }
            println!("{}", e);
        }
    }
}

async fn handle_transition_input(state: &AppState, out: &ConsolePresenter, text: &str) {
    let character = state.scene.current_character().await.unwrap_or_default();

    match state.transitions.submit_input(text).await {
        Ok(TransitionInput::Ignored) => {
            println!("Say goodbye before leaving, or /cancel to stay.")
        }
        Ok(TransitionInput::FarewellReply(reply)) => {
            out.show_dialogue(&character, &reply);
            println!("(Press Enter to leave, or keep talking.)");
        }
        Ok(TransitionInput::ConversationResumed(reply)) => out.show_dialogue(&character, &reply),
        Ok(TransitionInput::Departed { arrival, .. }) => {
            print_location(state).await;
            out.show_dialogue(SYSTEM_SPEAKER, &arrival.message);
        }
        Err(e) => println!("{}", e),
    }
}

async fn system_request(state: &AppState, out: &ConsolePresenter, request: SystemRequest) {
    state.scene.refresh_context().await;
    let shown = request.show_on_ui;
    match state.session.send_system_message(&request).await {
        // Requests flagged for display were already shown by the session
        Ok(reply) if !shown => out.show_dialogue(SYSTEM_SPEAKER, &reply),
        Ok(_) => {}
        Err(e) => println!("{}", e),
    }
}

async fn print_location(state: &AppState) {
    let world = state.scene.world().read().await;
    let Some(location) = world.player_location() else {
        return;
    };

    println!();
    println!("== {} ==", location.name);
    if !location.description.is_empty() {
        println!("{}", location.description);
    }
    let present: Vec<_> = world
        .present_characters()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    if !present.is_empty() {
        println!("Here: {}", present.join(", "));
    }
    println!("Exits: {}", location.sorted_connections().join(", "));
}
