use itertools::Itertools;
use rand::prelude::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;

/// Represents a 2D coordinate on the minesweeper board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

/// A logical statement about the board: exactly `count` of the cells in
/// `cells` are mines.
///
/// A sentence only carries information while its cells are unresolved. Once
/// every cell it mentions is known safe or known to be a mine it becomes
/// vacuous and is dropped from the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// The set of cells this statement applies to.
    pub cells: HashSet<Point>,
    /// The exact number of mines among `cells`.
    pub count: usize,
}

/// The agent that plays the game. It accumulates sentences from board
/// observations and runs inference over them to prove cells safe or mined.
#[derive(Debug)]
pub struct MinesweeperAI {
    pub width: usize,
    pub height: usize,
    /// Cells already played. Grows monotonically.
    pub moves_made: HashSet<Point>,
    /// Cells proven safe (played or not). Disjoint from `mines`.
    pub safes: HashSet<Point>,
    /// Cells proven to be mines. Disjoint from `safes`.
    pub mines: HashSet<Point>,
    /// Live sentences. After `add_knowledge` returns, no sentence here
    /// mentions a cell that is already in `safes` or `mines`.
    pub knowledge: Vec<Sentence>,
}

/// The hidden ground truth of a game: where the mines actually are.
///
/// The agent never reads this directly. A game loop queries it and feeds the
/// agent one observation per revealed cell through
/// `MinesweeperAI::add_knowledge`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub width: usize,
    pub height: usize,
    pub mines: HashSet<Point>,
}

// --- Sentence Implementation ---

impl Sentence {
    pub fn new(cells: HashSet<Point>, count: usize) -> Self {
        Sentence { cells, count }
    }

    /// Returns the cells known to be mines, or `None` if this sentence
    /// supports no conclusion yet.
    ///
    /// `None` means "no conclusion", which is different from `Some` of an
    /// empty set (a vacuous sentence with nothing left to conclude about).
    pub fn known_mines(&self) -> Option<&HashSet<Point>> {
        if self.count == self.cells.len() && self.count > 0 {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// Returns the cells known to be safe, or `None` if this sentence
    /// supports no conclusion yet.
    pub fn known_safes(&self) -> Option<&HashSet<Point>> {
        if self.count == 0 {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// Records that `point` is a mine. If the sentence mentions it, the cell
    /// is removed and `count` drops by one. No-op otherwise.
    ///
    /// A count that would go negative means the knowledge base has been fed
    /// contradictory facts; we refuse to continue with corrupted state.
    pub fn mark_mine(&mut self, point: Point) -> anyhow::Result<()> {
        if self.cells.remove(&point) {
            if self.count == 0 {
                anyhow::bail!("sentence_count_underflow");
            }
            self.count -= 1;
        }
        Ok(())
    }

    /// Records that `point` is safe. If the sentence mentions it, the cell is
    /// removed; `count` is unchanged. No-op otherwise.
    pub fn mark_safe(&mut self, point: Point) {
        self.cells.remove(&point);
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sort for a stable rendering; HashSet order is arbitrary.
        let mut cells: Vec<Point> = self.cells.iter().copied().collect();
        cells.sort_by_key(|p| (p.y, p.x));
        write!(f, "{{")?;
        for (i, p) in cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}, {})", p.x, p.y)?;
        }
        write!(f, "}} = {}", self.count)
    }
}

// --- Agent Implementation ---

impl MinesweeperAI {
    pub fn new(width: usize, height: usize) -> Self {
        MinesweeperAI {
            width,
            height,
            moves_made: HashSet::new(),
            safes: HashSet::new(),
            mines: HashSet::new(),
            knowledge: Vec::new(),
        }
    }

    /// All valid neighbor coordinates of `point`, handling board edges and
    /// corners.
    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> {
        neighbor_points(point, self.width, self.height)
    }

    /// Marks a cell as a mine and updates every sentence to reflect it.
    pub fn mark_mine(&mut self, point: Point) -> anyhow::Result<()> {
        if self.safes.contains(&point) {
            anyhow::bail!("safe_mine_collision");
        }
        self.mines.insert(point);
        for sentence in &mut self.knowledge {
            sentence.mark_mine(point)?;
        }
        Ok(())
    }

    /// Marks a cell as safe and updates every sentence to reflect it.
    pub fn mark_safe(&mut self, point: Point) -> anyhow::Result<()> {
        if self.mines.contains(&point) {
            anyhow::bail!("safe_mine_collision");
        }
        self.safes.insert(point);
        for sentence in &mut self.knowledge {
            sentence.mark_safe(point);
        }
        Ok(())
    }

    /// The main entry point, called once per newly opened cell with the
    /// board's reported adjacent-mine count.
    ///
    /// This function:
    /// 1. Records the move and marks the cell safe.
    /// 2. Builds a new sentence over the unresolved neighbors. Neighbors
    ///    already proven safe are omitted; neighbors already proven to be
    ///    mines are omitted too, with `count` reduced by one for each, so
    ///    every stored sentence mentions only unresolved cells.
    /// 3. Applies the sentence directly if it is already conclusive,
    ///    otherwise stores it.
    /// 4. Runs the inference loop to a fixpoint.
    pub fn add_knowledge(&mut self, point: Point, count: usize) -> anyhow::Result<()> {
        self.moves_made.insert(point);
        self.mark_safe(point)?;

        // --- Build the new sentence from the observation ---
        let mut count = count;
        let mut cells = HashSet::new();
        for neighbor in self.neighbors(point) {
            if self.safes.contains(&neighbor) {
                continue;
            }
            if self.mines.contains(&neighbor) {
                // This mine is already accounted for; the remaining cells
                // share the rest of the count.
                let Some(rest) = count.checked_sub(1) else {
                    anyhow::bail!("count_contradiction");
                };
                count = rest;
                continue;
            }
            cells.insert(neighbor);
        }
        if count > cells.len() {
            // The board reported more mines than there are unknown neighbors.
            anyhow::bail!("count_contradiction");
        }

        self.absorb(Sentence::new(cells, count))?;
        self.infer()
    }

    /// Runs resolution and subset derivation until a full pass produces
    /// nothing new.
    ///
    /// Normally driven by `add_knowledge`; public so inference can also be
    /// run over hand-built knowledge. Termination is guaranteed: the cell
    /// universe is finite and every derived sentence is either a strictly
    /// smaller cell set or discarded as a duplicate.
    pub fn infer(&mut self) -> anyhow::Result<()> {
        loop {
            // Resolve to exhaustion first, so the pairwise scan only ever
            // sees sentences with no conclusion left in them.
            while self.resolve_step()? {}
            if !self.derive_step()? {
                break;
            }
        }
        Ok(())
    }

    /// Applies a sentence if it is conclusive, otherwise stores it.
    ///
    /// A vacuous sentence (no cells, zero count) concludes `Some` of the
    /// empty set and is absorbed without effect, which is how spent
    /// sentences leave the knowledge base.
    fn absorb(&mut self, sentence: Sentence) -> anyhow::Result<()> {
        if let Some(safes) = sentence.known_safes() {
            for &point in safes {
                self.mark_safe(point)?;
            }
        } else if let Some(mines) = sentence.known_mines() {
            for &point in mines {
                self.mark_mine(point)?;
            }
        } else {
            self.knowledge.push(sentence);
        }
        Ok(())
    }

    /// Finds one conclusive sentence, removes it, and applies its
    /// conclusion. Returns whether anything was resolved.
    ///
    /// The sentence is taken out of `knowledge` before any marking happens,
    /// so propagation into the remaining sentences never mutates a
    /// collection mid-scan.
    fn resolve_step(&mut self) -> anyhow::Result<bool> {
        let position = self
            .knowledge
            .iter()
            .position(|s| s.known_safes().is_some() || s.known_mines().is_some());
        let Some(position) = position else {
            return Ok(false);
        };
        let sentence = self.knowledge.remove(position);
        self.absorb(sentence)?;
        Ok(true)
    }

    /// Scans every pair of sentences for the subset rule: if A's cells are
    /// contained in B's, the cells unique to B hold exactly
    /// `B.count - A.count` mines. Returns whether any new sentence was added.
    ///
    /// Candidates equal to a sentence already present (same cell set, same
    /// count) are discarded, otherwise the loop would never reach a fixpoint.
    fn derive_step(&mut self) -> anyhow::Result<bool> {
        let mut derived: Vec<Sentence> = Vec::new();
        for (a, b) in self.knowledge.iter().tuple_combinations() {
            // The subset relation can hold in either direction.
            for (small, large) in [(a, b), (b, a)] {
                if !small.cells.is_subset(&large.cells) {
                    continue;
                }
                let cells: HashSet<Point> =
                    large.cells.difference(&small.cells).copied().collect();
                if cells.is_empty() {
                    continue;
                }
                let Some(count) = large.count.checked_sub(small.count) else {
                    anyhow::bail!("subset_count_underflow");
                };
                let candidate = Sentence::new(cells, count);
                if !self.knowledge.contains(&candidate) && !derived.contains(&candidate) {
                    derived.push(candidate);
                }
            }
        }
        let progressed = !derived.is_empty();
        self.knowledge.extend(derived);
        Ok(progressed)
    }

    /// Returns a cell proven safe that has not been played yet, chosen
    /// uniformly at random, or `None` if no such cell exists.
    ///
    /// Read-only: repeated calls never change the agent's state.
    pub fn make_safe_move(&self) -> Option<Point> {
        let candidates: Vec<Point> = self.safes.difference(&self.moves_made).copied().collect();
        candidates.choose(&mut rand::rng()).copied()
    }

    /// Returns a cell that has not been played and is not a known mine,
    /// chosen uniformly at random over the whole grid, or `None` if the
    /// board is exhausted.
    pub fn make_random_move(&self) -> Option<Point> {
        let candidates: Vec<Point> = (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(y, x)| Point { x, y })
            .filter(|p| !self.moves_made.contains(p) && !self.mines.contains(p))
            .collect();
        candidates.choose(&mut rand::rng()).copied()
    }
}

// --- Game Implementation (the board the agent plays against) ---

impl Game {
    /// Creates a board with `mine_count` mines placed uniformly at random.
    pub fn new(width: usize, height: usize, mine_count: usize) -> Self {
        if mine_count >= width * height {
            panic!("Total mines must be less than the number of cells on the board.");
        }
        let mut rng = rand::rng();
        let mut mines = HashSet::new();
        while mines.len() < mine_count {
            mines.insert(Point {
                x: rng.random_range(0..width),
                y: rng.random_range(0..height),
            });
        }
        Game {
            width,
            height,
            mines,
        }
    }

    /// Creates a board with an explicit mine layout. Useful for tests and
    /// for embedders that bring their own placement.
    pub fn with_mines(width: usize, height: usize, mines: HashSet<Point>) -> Self {
        Game {
            width,
            height,
            mines,
        }
    }

    /// Deserializes a board snapshot from bytes.
    pub fn deserialize(bts: &Vec<u8>) -> Self {
        bcs::from_bytes(bts).unwrap()
    }

    /// Serializes the board to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        bcs::to_bytes(self).unwrap()
    }

    pub fn is_mine(&self, point: Point) -> bool {
        self.mines.contains(&point)
    }

    /// The number of mines within one row and column of `point`, not
    /// including the cell itself. This is the observation fed to the agent
    /// after each reveal.
    pub fn nearby_mines(&self, point: Point) -> usize {
        neighbor_points(point, self.width, self.height)
            .filter(|p| self.mines.contains(p))
            .count()
    }

    /// Whether revealing every cell in `revealed` wins the game, i.e. every
    /// cell that is not a mine has been played.
    pub fn is_won(&self, revealed: &HashSet<Point>) -> bool {
        (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(y, x)| Point { x, y })
            .all(|p| self.mines.contains(&p) || revealed.contains(&p))
    }
}

/// All valid neighbor coordinates for a given point, clipped to the board
/// bounds. Shared by the agent and the board model.
fn neighbor_points(point: Point, width: usize, height: usize) -> impl Iterator<Item = Point> {
    // Offsets from -1 to 1 in both x and y, skipping the center.
    (-1..=1).flat_map(move |dy: isize| {
        (-1..=1).filter_map(move |dx: isize| {
            if dx == 0 && dy == 0 {
                return None;
            }

            let nx = point.x as isize + dx;
            let ny = point.y as isize + dy;

            if nx >= 0 && nx < width as isize && ny >= 0 && ny < height as isize {
                Some(Point {
                    x: nx as usize,
                    y: ny as usize,
                })
            } else {
                None
            }
        })
    })
}
