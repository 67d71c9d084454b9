use std::sync::{Arc, Barrier};
use std::thread;

use slotlock::engine::Engine;
use slotlock::grid::SegmentDuration;
use slotlock::model::{Owner, ResourceId, TimeSlot};
use slotlock::notify::NotifyHub;
use slotlock::repository::{AvailabilityRepository, InMemoryRepository};

const M: i64 = 60_000;
const DAY: i64 = 1_767_225_600_000; // 2026-01-01T00:00:00Z

// ── Test infrastructure ──────────────────────────────────────

fn slot(from: i64, to: i64) -> TimeSlot {
    TimeSlot::new(DAY + from, DAY + to)
}

fn start_engine(repository: Arc<dyn AvailabilityRepository>) -> Arc<Engine> {
    Arc::new(Engine::new(
        repository,
        SegmentDuration::minutes(30).unwrap(),
        Arc::new(NotifyHub::new()),
    ))
}

/// Run `contenders` threads released at once, each calling `op` with its own owner.
fn race<F>(contenders: usize, op: F) -> Vec<(Owner, bool)>
where
    F: Fn(Owner) -> bool + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let barrier = Arc::new(Barrier::new(contenders));
    let handles: Vec<_> = (0..contenders)
        .map(|_| {
            let op = op.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let owner = Owner::new();
                barrier.wait();
                (owner, op(owner))
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

// ── At most one owner ────────────────────────────────────────

#[test]
fn concurrent_blocks_on_same_range_have_one_winner() {
    let engine = start_engine(Arc::new(InMemoryRepository::new()));
    let rid = ResourceId::new();
    engine.create_resource_slots(rid, None, slot(0, 120 * M)).unwrap();

    for round in 0..20 {
        let from = (round % 4) * 30 * M;
        let target = slot(from, from + 30 * M);
        if round > 0 {
            // Free everything again for the next round.
            let group = engine.find(rid, slot(0, 120 * M)).unwrap();
            for holder in group.owners().into_iter().flatten() {
                engine.release(rid, slot(0, 120 * M), holder).unwrap();
            }
        }
        let e = engine.clone();
        let results = race(8, move |owner| e.block(rid, target, owner).unwrap());
        let winners: Vec<_> = results.iter().filter(|(_, won)| *won).collect();
        assert!(winners.len() <= 1, "round {round}: {} winners", winners.len());

        let state = engine.find(rid, target).unwrap();
        match winners.first() {
            Some((owner, _)) => assert!(state.blocked_entirely_by(*owner)),
            None => assert!(state.is_entirely_available()),
        }
    }
}

#[test]
fn overlapping_ranges_never_share_a_segment() {
    let engine = start_engine(Arc::new(InMemoryRepository::new()));
    let rid = ResourceId::new();
    engine.create_resource_slots(rid, None, slot(0, 240 * M)).unwrap();

    let e = engine.clone();
    let results = race(16, move |owner| {
        // Each contender wants a 90 minute window on a staggered start.
        let start = (owner.0.random() % 6) as i64 * 30 * M;
        e.block(rid, slot(start, start + 90 * M), owner).unwrap()
    });

    let group = engine.find(rid, slot(0, 240 * M)).unwrap();
    for (owner, won) in &results {
        let held = group.find_blocked_by(*owner).len();
        if *won {
            assert_eq!(held, 3);
        } else {
            assert_eq!(held, 0);
        }
    }
    let held_total: usize = results.iter().map(|(o, _)| group.find_blocked_by(*o).len()).sum();
    let taken = group.iter().filter(|a| !a.is_free()).count();
    assert_eq!(held_total, taken);
}

#[test]
fn random_pick_under_contention_hands_out_distinct_resources() {
    let engine = start_engine(Arc::new(InMemoryRepository::new()));
    let rooms: Vec<ResourceId> = (0..4).map(|_| ResourceId::new()).collect();
    for &room in &rooms {
        engine.create_resource_slots(room, None, slot(0, 60 * M)).unwrap();
    }

    let e = engine.clone();
    let candidates = rooms.clone();
    let results = race(8, move |owner| {
        e.block_random_available(&candidates, slot(0, 60 * M), owner)
            .unwrap()
            .is_some()
    });

    let winners: Vec<Owner> = results.iter().filter(|(_, won)| *won).map(|(o, _)| *o).collect();
    assert!(!winners.is_empty());
    assert!(winners.len() <= rooms.len());
    for owner in winners {
        let holding: Vec<_> = rooms
            .iter()
            .filter(|&&room| engine.find(room, slot(0, 60 * M)).unwrap().blocked_entirely_by(owner))
            .collect();
        assert_eq!(holding.len(), 1);
    }
}
