use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use super::sampler::{seeded_rng, weighted_choice};
use super::weights::{WinPenalty, item_competition_score};
use super::{DrawError, VoteMatrix};

/// Item as seen by the draw. Category is left out: it never influences who
/// wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawItem {
    pub id: i64,
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestRule {
    #[serde(rename = "min_wins")]
    MinWins,
}

/// What the sampler saw when a unit was handed out, stored with the allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum WeightSnapshot {
    /// Phase A: this participant's points on items still in stock.
    #[serde(rename = "A")]
    A { item_weights: BTreeMap<i64, f64> },
    /// Phase B: penalised weights of everyone who voted on the unit's item.
    #[serde(rename = "B")]
    B {
        participant_weights: BTreeMap<i64, f64>,
    },
    /// Phase B fallback when nobody voted on the item.
    #[serde(rename = "B_rest")]
    BRest { rule: RestRule, min_wins: u32 },
}

impl WeightSnapshot {
    pub fn phase(&self) -> &'static str {
        match self {
            WeightSnapshot::A { .. } => "A",
            WeightSnapshot::B { .. } => "B",
            WeightSnapshot::BRest { .. } => "B_rest",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub item_id: i64,
    /// `None` only if there was nobody to give a rest unit to.
    pub participant_id: Option<i64>,
    pub snapshot: WeightSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawOutcome {
    pub allocations: Vec<Allocation>,
    pub win_counts: BTreeMap<i64, u32>,
}

/// Per-run mutable state.
struct DrawState {
    remaining: BTreeMap<i64, i32>,
    wins: BTreeMap<i64, u32>,
    allocations: Vec<Allocation>,
}

impl DrawState {
    fn new(items: &[DrawItem], participants: &[i64]) -> Self {
        Self {
            remaining: items.iter().map(|it| (it.id, it.quantity.max(1))).collect(),
            wins: participants.iter().map(|&pid| (pid, 0)).collect(),
            allocations: Vec::new(),
        }
    }

    fn record(&mut self, item_id: i64, participant_id: Option<i64>, snapshot: WeightSnapshot) {
        if let Some(pid) = participant_id {
            *self.wins.entry(pid).or_insert(0) += 1;
        }
        self.allocations.push(Allocation {
            item_id,
            participant_id,
            snapshot,
        });
    }
}

/// Two-phase weighted draw.
///
/// Phase A walks participants in shuffled order and gives each at most one
/// item they voted on. Phase B hands out every remaining unit, most contested
/// items first, weighting votes by the win penalty. A unit nobody voted on
/// goes to a random participant among those with the fewest wins.
pub struct AllocationEngine<'a> {
    penalty: &'a WinPenalty,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(penalty: &'a WinPenalty) -> Self {
        Self { penalty }
    }

    /// Runs the draw with the stream derived from `seed`.
    pub fn draw(
        &self,
        seed: &str,
        items: &[DrawItem],
        participants: &[i64],
        votes: &VoteMatrix,
    ) -> Result<DrawOutcome, DrawError> {
        let mut rng = seeded_rng(seed);
        self.run(&mut rng, items, participants, votes)
    }

    pub fn run<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        items: &[DrawItem],
        participants: &[i64],
        votes: &VoteMatrix,
    ) -> Result<DrawOutcome, DrawError> {
        if items.is_empty() {
            return Err(DrawError::NoItems);
        }
        if participants.is_empty() {
            return Err(DrawError::NoParticipants);
        }

        // shuffle always starts from ascending ids
        let mut order: Vec<i64> = participants.to_vec();
        order.sort_unstable();
        order.dedup();

        // rows of anyone outside the draw must not move scores or weights
        let votes: VoteMatrix = order
            .iter()
            .filter_map(|pid| votes.get(pid).map(|own| (*pid, own.clone())))
            .collect();

        let mut state = DrawState::new(items, &order);
        let empty = HashMap::new();

        self.phase_a(rng, &mut state, &mut order, &votes, &empty)?;
        self.phase_b(rng, &mut state, items, &votes, &empty)?;

        Ok(DrawOutcome {
            allocations: state.allocations,
            win_counts: state.wins,
        })
    }

    fn phase_a<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        state: &mut DrawState,
        order: &mut [i64],
        votes: &VoteMatrix,
        empty: &HashMap<i64, i32>,
    ) -> Result<(), DrawError> {
        order.shuffle(rng);

        for &pid in order.iter() {
            let own = votes.get(&pid).unwrap_or(empty);
            let item_weights: BTreeMap<i64, f64> = state
                .remaining
                .iter()
                .filter(|&(_, &left)| left > 0)
                .filter_map(|(&iid, _)| {
                    let points = own.get(&iid).copied().unwrap_or(0);
                    (points > 0).then(|| (iid, f64::from(points)))
                })
                .collect();

            if item_weights.is_empty() {
                continue;
            }

            let chosen = weighted_choice(rng, &item_weights)?;
            if let Some(left) = state.remaining.get_mut(&chosen) {
                *left -= 1;
            }
            state.record(chosen, Some(pid), WeightSnapshot::A { item_weights });
        }
        Ok(())
    }

    fn phase_b<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        state: &mut DrawState,
        items: &[DrawItem],
        votes: &VoteMatrix,
        empty: &HashMap<i64, i32>,
    ) -> Result<(), DrawError> {
        // scores come from the full vote set, not what is left in stock
        let scores: HashMap<i64, i64> = items
            .iter()
            .map(|it| (it.id, item_competition_score(it.id, votes)))
            .collect();
        let names: HashMap<i64, String> = items
            .iter()
            .map(|it| (it.id, it.name.to_lowercase()))
            .collect();

        let mut units: Vec<i64> = state
            .remaining
            .iter()
            .flat_map(|(&iid, &left)| std::iter::repeat(iid).take(left.max(0) as usize))
            .collect();
        units.sort_by_cached_key(|iid| {
            (
                Reverse(scores.get(iid).copied().unwrap_or(0)),
                names.get(iid).cloned().unwrap_or_default(),
                *iid,
            )
        });

        for iid in units {
            let participant_weights: BTreeMap<i64, f64> = state
                .wins
                .iter()
                .filter_map(|(&pid, &wins)| {
                    let points = votes.get(&pid).unwrap_or(empty).get(&iid).copied()?;
                    if points <= 0 {
                        return None;
                    }
                    let weight = self.penalty.weight(points, wins);
                    (weight > 0.0).then_some((pid, weight))
                })
                .collect();

            if let Some(left) = state.remaining.get_mut(&iid) {
                *left -= 1;
            }

            if participant_weights.is_empty() {
                let min_wins = state.wins.values().copied().min().unwrap_or(0);
                let tied: Vec<i64> = state
                    .wins
                    .iter()
                    .filter(|&(_, &w)| w == min_wins)
                    .map(|(&pid, _)| pid)
                    .collect();
                let winner = tied.choose(rng).copied();
                state.record(
                    iid,
                    winner,
                    WeightSnapshot::BRest {
                        rule: RestRule::MinWins,
                        min_wins,
                    },
                );
                continue;
            }

            let winner = weighted_choice(rng, &participant_weights)?;
            state.record(iid, Some(winner), WeightSnapshot::B { participant_weights });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, name: &str, quantity: i32) -> DrawItem {
        DrawItem {
            id,
            name: name.to_string(),
            quantity,
        }
    }

    fn votes(rows: &[(i64, i64, i32)]) -> VoteMatrix {
        let mut m = VoteMatrix::new();
        for &(pid, iid, points) in rows {
            m.entry(pid).or_default().insert(iid, points);
        }
        m
    }

    fn sample_setup() -> (Vec<DrawItem>, Vec<i64>, VoteMatrix) {
        let items = vec![
            item(1, "Lamp", 2),
            item(2, "chair", 3),
            item(3, "Desk", 1),
            item(4, "Rug", 2),
        ];
        let participants = vec![10, 11, 12, 13];
        let votes = votes(&[
            (10, 1, 60),
            (10, 2, 40),
            (11, 1, 100),
            (12, 2, 20),
            (12, 3, 80),
            (13, 3, 50),
            (13, 1, 50),
        ]);
        (items, participants, votes)
    }

    #[test]
    fn test_precondition_failures() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let v = VoteMatrix::new();
        assert_eq!(
            engine.draw("s", &[], &[1], &v),
            Err(DrawError::NoItems)
        );
        assert_eq!(
            engine.draw("s", &[item(1, "A", 1)], &[], &v),
            Err(DrawError::NoParticipants)
        );
    }

    #[test]
    fn test_each_participant_gets_their_only_choice_in_phase_a() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let items = vec![item(1, "A", 1), item(2, "B", 1)];
        let v = votes(&[(100, 1, 100), (100, 2, 0), (200, 1, 0), (200, 2, 100)]);

        for seed in ["1", "2", "3", "hello", "1700000000"] {
            let out = engine.draw(seed, &items, &[100, 200], &v).unwrap();
            assert_eq!(out.allocations.len(), 2);
            assert!(out.allocations.iter().all(|a| a.snapshot.phase() == "A"));
            let pairs: BTreeMap<i64, Option<i64>> = out
                .allocations
                .iter()
                .map(|a| (a.item_id, a.participant_id))
                .collect();
            assert_eq!(pairs[&1], Some(100));
            assert_eq!(pairs[&2], Some(200));
        }
    }

    #[test]
    fn test_unvoted_item_goes_to_min_wins_participant() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let items = vec![item(1, "Only", 1)];
        let v = votes(&[(1, 1, 0), (2, 1, 0)]);

        let mut winners = std::collections::BTreeSet::new();
        for n in 0..40 {
            let out = engine.draw(&n.to_string(), &items, &[1, 2], &v).unwrap();
            assert_eq!(out.allocations.len(), 1);
            let alloc = &out.allocations[0];
            assert_eq!(
                alloc.snapshot,
                WeightSnapshot::BRest {
                    rule: RestRule::MinWins,
                    min_wins: 0
                }
            );
            winners.insert(alloc.participant_id.unwrap());
        }
        // both tied participants get picked for some seed
        assert_eq!(winners.len(), 2);
    }

    #[test]
    fn test_every_unit_allocated_once() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let (items, participants, v) = sample_setup();
        let total_units: i32 = items.iter().map(|it| it.quantity).sum();

        for seed in ["a", "b", "c", "d"] {
            let out = engine.draw(seed, &items, &participants, &v).unwrap();
            assert_eq!(out.allocations.len(), total_units as usize);
            for it in &items {
                let n = out.allocations.iter().filter(|a| a.item_id == it.id).count();
                assert_eq!(n, it.quantity as usize);
            }
            let won: u32 = out.win_counts.values().sum();
            let assigned = out
                .allocations
                .iter()
                .filter(|a| a.participant_id.is_some())
                .count();
            assert_eq!(won as usize, assigned);
            assert!(out.win_counts.values().all(|&w| w as i32 <= total_units));
        }
    }

    #[test]
    fn test_phase_a_at_most_one_each() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let (items, participants, v) = sample_setup();
        let out = engine.draw("phase-a", &items, &participants, &v).unwrap();

        let mut phase_a_wins: BTreeMap<i64, u32> = BTreeMap::new();
        for a in out.allocations.iter().filter(|a| a.snapshot.phase() == "A") {
            *phase_a_wins.entry(a.participant_id.unwrap()).or_default() += 1;
        }
        assert!(phase_a_wins.values().all(|&n| n == 1));
        // all four voted on something and stock is sufficient
        assert_eq!(phase_a_wins.len(), 4);

        // phase A entries come before any phase B entry
        let first_b = out
            .allocations
            .iter()
            .position(|a| a.snapshot.phase() != "A")
            .unwrap();
        assert!(out.allocations[first_b..].iter().all(|a| a.snapshot.phase() != "A"));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let (items, participants, v) = sample_setup();

        let first = engine.draw("repeat-me", &items, &participants, &v).unwrap();
        let second = engine.draw("repeat-me", &items, &participants, &v).unwrap();
        assert_eq!(first, second);

        // participant input order does not matter
        let mut reversed = participants.clone();
        reversed.reverse();
        let third = engine.draw("repeat-me", &items, &reversed, &v).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_phase_b_orders_by_score_then_name() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let items = vec![
            item(1, "beta", 1),
            item(2, "Alpha", 1),
            item(3, "Hot", 1),
            item(4, "gamma", 2),
        ];
        let v = votes(&[(7, 4, 10), (8, 3, 90)]);
        let out = engine.draw("order", &items, &[7, 8], &v).unwrap();

        let b_items: Vec<i64> = out
            .allocations
            .iter()
            .filter(|a| a.snapshot.phase() != "A")
            .map(|a| a.item_id)
            .collect();
        // phase A took Hot (8) and one gamma (7); gamma's second unit (score 10)
        // comes first, then the unvoted items by name
        assert_eq!(b_items, vec![4, 2, 1]);
    }

    #[test]
    fn test_penalty_applied_in_phase_b_snapshot() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let items = vec![item(1, "Pen", 3)];
        let v = votes(&[(1, 1, 50), (2, 1, 50)]);
        let out = engine.draw("snap", &items, &[1, 2], &v).unwrap();

        // both won one unit in phase A, so both are at 0.60 for the last unit
        let last = out.allocations.last().unwrap();
        assert_eq!(
            last.snapshot,
            WeightSnapshot::B {
                participant_weights: BTreeMap::from([(1, 30.0), (2, 30.0)])
            }
        );
    }

    #[test]
    fn test_quantity_below_one_counts_as_one() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let items = vec![item(1, "Zero", 0), item(2, "Negative", -4)];
        let out = engine
            .draw("qty", &items, &[1], &VoteMatrix::new())
            .unwrap();
        assert_eq!(out.allocations.len(), 2);
        assert_eq!(out.win_counts[&1], 2);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let rest = WeightSnapshot::BRest {
            rule: RestRule::MinWins,
            min_wins: 2,
        };
        let json = serde_json::to_value(&rest).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"phase": "B_rest", "rule": "min_wins", "min_wins": 2})
        );

        let a = WeightSnapshot::A {
            item_weights: BTreeMap::from([(5, 40.0)]),
        };
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json, serde_json::json!({"phase": "A", "item_weights": {"5": 40.0}}));
    }

    #[test]
    fn test_votes_outside_participant_list_are_ignored() {
        let penalty = WinPenalty::default();
        let engine = AllocationEngine::new(&penalty);
        let items = vec![item(1, "Apple", 1), item(2, "Zebra", 1)];
        let own = VoteMatrix::new();
        let stray = votes(&[(99, 2, 100)]);

        let clean = engine.draw("s", &items, &[7], &own).unwrap();
        let with_stray = engine.draw("s", &items, &[7], &stray).unwrap();
        assert_eq!(clean, with_stray);

        let order: Vec<i64> = with_stray.allocations.iter().map(|a| a.item_id).collect();
        assert_eq!(order, vec![1, 2]);
        assert!(with_stray.allocations.iter().all(|a| a.participant_id == Some(7)));
        assert!(!with_stray.win_counts.contains_key(&99));
    }
}
