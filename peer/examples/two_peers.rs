use std::sync::Arc;

use minemesh_peer::{
    Board, GameEvent, GameOutcome, GridConfig, LocalBus, Position, Session, SessionState,
    TileState,
};
use tokio::time::{Duration, sleep};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let bus = Arc::new(LocalBus::new());
    let config = GridConfig {
        width: 9,
        height: 9,
        bombs: 10,
        cheat_mode: false,
    };

    let mut alice = Session::connect(bus.clone(), config, 0, 2)?;
    let mut bob = Session::connect(bus.clone(), config, 1, 2)?;
    let mut bob_events = bob.subscribe_events();

    println!(
        "🎮 Starting a {}x{} game with {} bombs",
        config.width, config.height, config.bombs
    );
    alice.generate_grid();
    alice.primary_action(Position::new(4, 4));
    pump(&mut alice, &mut bob);

    // Both players reveal known-safe tiles from their own replica until the
    // board is finished; the turn gate decides who may act.
    let mut moves = 1;
    while alice.state() == SessionState::InProgress && moves < 200 {
        let holder = alice.current_player();
        let actor = if holder == 0 { &mut alice } else { &mut bob };

        if moves == 2 {
            // Flagging a suspected bomb keeps the turn.
            let suspect = first_hidden_bomb(actor);
            println!("🚩 Player {} flags ({}, {})", holder, suspect.x, suspect.y);
            actor.secondary_action(suspect);
        }

        let target = first_safe_hidden(actor);
        println!("👆 Player {} reveals ({}, {})", holder, target.x, target.y);
        actor.primary_action(target);
        pump(&mut alice, &mut bob);
        moves += 1;
        sleep(Duration::from_millis(20)).await;
    }

    println!("\nBob's replica after {} moves:", moves);
    if let Some(board) = bob.board() {
        display_board(board);
    }

    while let Ok(event) = bob_events.try_recv() {
        match event {
            GameEvent::GameInitialized {
                width,
                height,
                bombs,
            } => println!("🎲 Game initialized: {}x{} with {} bombs", width, height, bombs),
            GameEvent::BoardUpdated { changed_positions } => {
                println!("📋 {} tiles updated", changed_positions.len())
            }
            GameEvent::TurnChanged { player } => println!("🔄 Player {}'s turn", player),
            GameEvent::GameStatusChanged { won, .. } => {
                if won {
                    println!("🎉 We won!");
                } else {
                    println!("💣 Game over!");
                }
            }
            GameEvent::BoardCleared => println!("🧹 Board cleared"),
        }
    }

    match alice.outcome() {
        Some(GameOutcome::Won) => println!("\nBoth replicas agree: the mesh won."),
        Some(GameOutcome::Lost) => println!("\nBoth replicas agree: the mesh lost."),
        None => println!("\nGame still in progress."),
    }

    Ok(())
}

fn pump(alice: &mut Session, bob: &mut Session) {
    loop {
        let processed = alice.process_pending() + bob.process_pending();
        if processed == 0 {
            break;
        }
    }
}

fn first_safe_hidden(session: &Session) -> Position {
    session
        .board()
        .expect("board exists")
        .tiles()
        .find(|tile| !tile.is_revealed() && !tile.is_flagged() && !tile.has_bomb())
        .map(|tile| tile.position())
        .expect("a safe hidden tile remains")
}

fn first_hidden_bomb(session: &Session) -> Position {
    session
        .board()
        .expect("board exists")
        .tiles()
        .find(|tile| tile.state() == TileState::HiddenWithBomb)
        .map(|tile| tile.position())
        .expect("bombs are placed")
}

fn display_board(board: &Board) {
    for y in (0..board.config().height).rev() {
        print!("  ");
        for x in 0..board.config().width {
            let tile = board.get(Position::new(x, y)).expect("in bounds");
            let symbol = match tile.state() {
                TileState::Hidden | TileState::HiddenWithBomb => "·".to_string(),
                TileState::Flag => "F".to_string(),
                TileState::Revealed => " ".to_string(),
                TileState::Bomb => "💣".to_string(),
                TileState::ExplodedBomb => "💥".to_string(),
                numbered => numbered.ordinal().to_string(),
            };
            print!("{:2}", symbol);
        }
        println!("  {}", y);
    }
    print!("  ");
    for x in 0..board.config().width {
        print!("{:2}", x);
    }
    println!();
}
