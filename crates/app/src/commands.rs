//! Interactive command loop
//!
//! One command per line. Rejected actions print their toast message
//! rather than an error; only storage and IO problems abort.

use std::io::{self, BufRead, Write};

use tally_core::models::{PlayerId, RoomCode};
use tally_core::Result;
use tally_sync::{ActionOutcome, RoomSync};

use crate::state::AppState;

pub fn run(state: &mut AppState) -> Result<()> {
    println!(
        "Tally - you are {} {}. Type 'help' for commands.",
        state.profile.avatar_glyph, state.profile.display_name
    );
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !dispatch(state, line)? {
            break;
        }
    }
    Ok(())
}

fn dispatch(state: &mut AppState, line: &str) -> Result<bool> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "help" => print_help(),
        "quit" | "exit" => return Ok(false),

        "new" => {
            let code = RoomCode::generate(&mut rand::thread_rng());
            println!("Room {code} started.");
            state.session = Some(RoomSync::local(
                code,
                state.profile.clone(),
                tally_sync::now_ms(),
            ));
        }

        "name" if !rest.is_empty() => {
            state.db.device().rename(rest)?;
            state.profile.display_name = rest.to_string();
            println!("You are now {rest}.");
        }

        "lists" => {
            for (idx, list) in state.lists.iter().enumerate() {
                let marker = if idx == state.active_list { "*" } else { " " };
                println!("{marker} {idx}: {} ({})", list.name, list.category);
            }
        }
        "use" => match rest.parse::<usize>() {
            Ok(idx) if idx < state.lists.len() => {
                state.active_list = idx;
                if let Some(session) = state.session.as_mut() {
                    session.reset_cooldowns();
                }
                println!("Now tapping against: {}", state.current_list().name);
            }
            _ => println!("Pick a list number from 'lists'."),
        },
        "events" => {
            for (idx, label) in state.current_list().events.iter().enumerate() {
                println!("{idx}: {label}");
            }
        }
        "newlist" => {
            let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
            if parts.len() != 3 || parts[2].is_empty() {
                println!("Usage: newlist <name> | <category> | <event; event; ...>");
            } else {
                let events: Vec<String> = parts[2]
                    .split(';')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect();
                state.add_custom_list(parts[0], parts[1], events)?;
                println!("Saved and selected '{}'.", state.current_list().name);
            }
        }
        "dellist" => match rest.parse::<usize>() {
            Ok(idx) => match state.delete_custom_list(idx) {
                Ok(()) => println!("Deleted."),
                Err(e) => println!("{e}"),
            },
            Err(_) => println!("Pick a list number from 'lists'."),
        },

        "save" => {
            if let Some(session) = state.session.as_ref() {
                let id = state.db.sessions().save(session.room())?;
                println!("Saved session {id}.");
            } else {
                println!("Start a room first ('new').");
            }
        }
        "sessions" => {
            for (idx, summary) in state.db.sessions().list()?.iter().enumerate() {
                println!(
                    "{idx}: room {} saved {}",
                    summary.room_code,
                    summary.saved_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        "load" => match rest.parse::<usize>() {
            Ok(idx) => {
                let sessions = state.db.sessions().list()?;
                match sessions.get(idx) {
                    Some(summary) => match state.db.sessions().load(&summary.id)? {
                        Some(room) => {
                            println!("Resumed room {}.", room.code);
                            state.session =
                                Some(RoomSync::resume_local(room, state.profile.clone()));
                        }
                        None => println!("That session is gone."),
                    },
                    None => println!("Pick a session number from 'sessions'."),
                }
            }
            Err(_) => println!("Pick a session number from 'sessions'."),
        },

        _ => {
            // Everything else acts on the running session
            let Some(session) = state.session.as_mut() else {
                println!("Start a room first ('new').");
                return Ok(true);
            };
            match command {
                "tap" => match rest.parse::<u32>() {
                    Ok(idx) if (idx as usize) < state.lists[state.active_list].events.len() => {
                        let list = &state.lists[state.active_list];
                        let label = list.events[idx as usize].clone();
                        let outcome =
                            session.tap(&list.event_key(idx), &label, tally_sync::now_ms());
                        report(outcome);
                    }
                    _ => println!("Pick an event number from 'events'."),
                },
                "veto" => report(session.veto_latest()),
                "pause" => {
                    report(session.toggle_pause());
                    let paused = session.room().settings.game_paused;
                    println!("Scoring {}.", if paused { "paused" } else { "resumed" });
                }
                "teams" => {
                    report(session.toggle_team_mode());
                    let on = session.room().settings.team_mode_enabled;
                    println!("Team mode {}.", if on { "on" } else { "off" });
                }
                "lock" => {
                    report(session.toggle_roster_lock());
                    let locked = session.room().settings.roster_locked;
                    println!("Teams {}.", if locked { "locked" } else { "unlocked" });
                }
                "switch" => match find_player(session, rest) {
                    Some(id) => report(session.switch_team(&id)),
                    None => println!("No player named '{rest}'."),
                },
                "reset" => {
                    report(session.reset_scores());
                    println!("Scores reset.");
                }
                "add" if !rest.is_empty() => {
                    report(session.add_player(rest, tally_sync::now_ms()));
                }
                "remove" => match find_player(session, rest) {
                    Some(id) => report(session.remove_player(&id)),
                    None => println!("No player named '{rest}'."),
                },
                "turn" => match find_player(session, rest) {
                    Some(id) => {
                        report(session.set_active_player(&id));
                        println!("{rest} is up.");
                    }
                    None => println!("No player named '{rest}'."),
                },
                "players" => {
                    for player in session.room().players_by_join_order() {
                        let active = session.active_player() == Some(&player.id);
                        println!(
                            "{} {} {} [team {}] {} pts{}",
                            if active { ">" } else { " " },
                            player.avatar_glyph,
                            player.display_name,
                            player.team,
                            session.room().score(&player.id),
                            if session.room().settings.host_id.as_ref() == Some(&player.id) {
                                " (host)"
                            } else {
                                ""
                            },
                        );
                    }
                }
                "feed" => {
                    for entry in session.room().feed(10) {
                        println!(
                            "{} {} {}: {}",
                            if entry.vetoed { "x" } else { "+" },
                            entry.player_glyph,
                            entry.player_name,
                            entry.label
                        );
                    }
                }
                _ => println!("Unknown command '{command}'. Type 'help'."),
            }
        }
    }
    Ok(true)
}

fn find_player(session: &RoomSync, name: &str) -> Option<PlayerId> {
    session
        .room()
        .players
        .values()
        .find(|p| p.display_name.eq_ignore_ascii_case(name))
        .map(|p| p.id.clone())
}

fn report(outcome: ActionOutcome) {
    match &outcome {
        ActionOutcome::Scored {
            player_id,
            new_score,
        } => println!("+1, {player_id} is at {new_score}."),
        ActionOutcome::Submitted { .. } => println!("Tap sent."),
        ActionOutcome::Vetoed { player_id, .. } => println!("Vetoed a tap by {player_id}."),
        ActionOutcome::Applied => {}
        rejected => {
            if let Some(message) = rejected.user_message() {
                println!("{message}");
            }
        }
    }
}

fn print_help() {
    println!("Room:     new, save, sessions, load N, name NAME");
    println!("Players:  add NAME, remove NAME, turn NAME, players, switch NAME");
    println!("Scoring:  tap N, veto, reset, feed, events");
    println!("Host:     pause, teams, lock");
    println!("Lists:    lists, use N, newlist name|category|e;e, dellist N");
    println!("          quit");
}
