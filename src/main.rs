use minesweeper_agent::*;
use std::thread;
use std::time::Duration;

fn main() {
    // --- 1. Initialization ---
    let game = Game::new(10, 10, 15);
    let mut ai = MinesweeperAI::new(game.width, game.height);

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: Prioritize proven safe moves, guess randomly otherwise.");
    println!("Initial Board:");
    print_board(&game, &ai, false);
    thread::sleep(Duration::from_secs(2));

    // --- 2. Game Loop ---
    let mut move_count = 0;
    loop {
        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        // --- 3. Bot's Decision Logic ---

        // Strategy 1: A cell the knowledge base has proven safe.
        // Strategy 2: No safe move known, so make a random guess.
        let point = match ai.make_safe_move() {
            Some(point) => {
                println!("Logic found a guaranteed safe cell.");
                point
            }
            None => match ai.make_random_move() {
                Some(point) => {
                    println!("No proven safe move available. Making a random guess...");
                    point
                }
                None => {
                    // Every cell is either played or flagged as a mine.
                    println!("No valid moves left for the bot to make.");
                    break;
                }
            },
        };

        // --- 4. Execute the Chosen Move ---
        println!("Bot reveals ({}, {})...", point.x, point.y);

        if game.is_mine(point) {
            print_board(&game, &ai, true);
            println!("\n--- Game Over ---");
            println!("Result: The bot hit a mine and lost.");
            return;
        }

        ai.add_knowledge(point, game.nearby_mines(point)).unwrap();
        print_board(&game, &ai, false);

        if game.is_won(&ai.moves_made) {
            println!("\n--- Game Over ---");
            println!(
                "Result: The bot won in {} moves, flagging {} mines.",
                move_count,
                ai.mines.len()
            );
            return;
        }

        // Add a delay to make the game watchable
        thread::sleep(Duration::from_millis(500));
    }

    println!("\n--- Game Over ---");
    println!("Result: The game ended unexpectedly.");
}

fn print_board(game: &Game, ai: &MinesweeperAI, reveal_mines: bool) {
    // Print header
    print!("   ");
    for x in 0..game.width {
        print!("{:^3}", x);
    }
    println!("\n  +{}", "---".repeat(game.width));

    // Print rows
    for y in 0..game.height {
        print!("{:^2}|", y);
        for x in 0..game.width {
            let point = Point { x, y };
            let display = if reveal_mines && game.is_mine(point) {
                " X ".to_string()
            } else if ai.moves_made.contains(&point) {
                format!(" {} ", game.nearby_mines(point))
            } else if ai.mines.contains(&point) {
                " ⚑ ".to_string()
            } else {
                " ■ ".to_string()
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
