use super::*;

const START: i64 = 1_700_000_000_000;
const TICK: i64 = 100;

fn config(count: usize) -> RoomConfig {
    RoomConfig { ghost_count: count, ..RoomConfig::default() }
}

fn simulator(count: usize) -> Simulator {
    Simulator::with_rng(config(count), StdRng::seed_from_u64(7))
}

fn queue() -> Queue {
    Queue::new(10_000, 1)
}

#[test]
fn ease_hits_endpoints_and_midpoint() {
    assert!(ease_in_out_cubic(0.0).abs() < 1e-12);
    assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
    assert!((ease_in_out_cubic(1.0) - 1.0).abs() < 1e-12);
    assert!((ease_in_out_cubic(0.25) - 0.0625).abs() < 1e-12);
    assert!((ease_in_out_cubic(0.75) - 0.9375).abs() < 1e-12);
}

#[test]
fn ease_is_monotonic() {
    let mut prev = 0.0;
    for i in 1..=100 {
        let e = ease_in_out_cubic(f64::from(i) / 100.0);
        assert!(e >= prev);
        prev = e;
    }
}

#[test]
fn enable_spawns_exact_population_on_edges() {
    let mut sim = simulator(25);
    sim.enable(&queue(), START);

    assert!(sim.is_enabled());
    assert_eq!(sim.cursors().len(), 25);
    for cursor in sim.cursors() {
        let p = cursor.position;
        let on_edge = p.x == 0.0 || p.x == 100.0 || p.y == 0.0 || p.y == 100.0;
        assert!(on_edge, "{} spawned off-edge at {p:?}", cursor.id);
        assert_eq!(cursor.phase, Phase::Approach);
        assert!(cursor.phase_duration >= 1000);
        assert!(Zone::VOTE_ZONES.iter().any(|z| z.contains(cursor.target)));
    }
}

#[test]
fn ghost_ids_are_unique() {
    let mut sim = simulator(10);
    sim.enable(&queue(), START);
    let mut ids: Vec<&str> = sim.cursors().iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[test]
fn traits_come_from_calm_or_active_population() {
    let mut sim = simulator(200);
    sim.enable(&queue(), START);

    let mut active = 0;
    for cursor in sim.cursors() {
        let calm = (0.2..=0.6).contains(&cursor.wander_speed) && (2.0..=5.0).contains(&cursor.wander_radius);
        let restless = (0.8..=1.5).contains(&cursor.wander_speed) && (4.0..=8.0).contains(&cursor.wander_radius);
        assert!(calm || restless, "unexpected traits {cursor:?}");
        if restless {
            active += 1;
        }
    }
    // Roughly 30% of 200; wide bounds keep the seeded draw stable.
    assert!((20..=100).contains(&active), "active share was {active}");
}

#[test]
fn enabling_twice_replaces_population() {
    let mut sim = simulator(5);
    sim.enable(&queue(), START);
    sim.enable(&queue(), START + 1);
    assert_eq!(sim.cursors().len(), 5);
}

#[test]
fn disable_emits_one_remove_per_ghost() {
    let mut sim = simulator(8);
    sim.enable(&queue(), START);
    let removed = sim.disable(START + 50);

    assert_eq!(removed.len(), 8);
    assert!(removed.iter().all(|p| p.timestamp == START + 50));
    assert!(sim.cursors().is_empty());
    assert!(!sim.is_enabled());
    assert!(sim.disable(START + 60).is_empty());
}

#[test]
fn tick_is_silent_while_disabled() {
    let mut sim = simulator(4);
    assert!(sim.tick(&queue(), START).is_empty());
}

#[test]
fn tick_broadcasts_every_ghost_every_time() {
    let mut sim = simulator(6);
    let q = queue();
    sim.enable(&q, START);
    for i in 1..=50 {
        let positions = sim.tick(&q, START + i * TICK);
        assert_eq!(positions.len(), 6);
    }
}

#[test]
fn positions_stay_on_canvas_through_every_phase() {
    let mut sim = simulator(30);
    let mut q = queue();
    sim.enable(&q, START);
    q.enqueue(5, START);

    let mut seen_settle = false;
    let mut seen_idle = false;
    // 40 simulated seconds: covers approach, settle, idle, and one retarget.
    for i in 1..=400 {
        let now = START + i * TICK;
        for position in sim.tick(&q, now) {
            assert!((0.0..=100.0).contains(&position.x), "x out of range: {position:?}");
            assert!((0.0..=100.0).contains(&position.y), "y out of range: {position:?}");
        }
        for cursor in sim.cursors() {
            assert!(cursor.position.is_on_canvas());
            seen_settle |= cursor.phase == Phase::Settle;
            seen_idle |= cursor.phase == Phase::Idle;
        }
    }
    assert!(seen_settle);
    assert!(seen_idle);
}

#[test]
fn idle_wander_is_clamped_near_canvas_border() {
    let mut sim = simulator(1);
    sim.enable(&queue(), START);
    let cursor = &mut sim.cursors[0];
    cursor.phase = Phase::Idle;
    cursor.settle_center = Point::new(0.0, 100.0);
    cursor.wander_radius = 8.0;
    for i in 0..200 {
        cursor.advance(START + i * 250, 2000);
        assert!(cursor.position.is_on_canvas());
    }
}

#[test]
fn approach_step_follows_eased_gain() {
    let mut sim = simulator(1);
    sim.enable(&queue(), START);
    let cursor = &mut sim.cursors[0];
    cursor.position = Point::new(0.0, 0.0);
    cursor.begin_approach(Point::new(100.0, 50.0), START, 0, 1000);

    // p = 0.5 -> ease 0.5 -> step 0.05 of the remaining distance.
    cursor.advance(START + 500, 2000);

    assert!((cursor.position.x - 5.0).abs() < 1e-9);
    assert!((cursor.position.y - 2.5).abs() < 1e-9);
    assert_eq!(cursor.phase, Phase::Approach);
}

#[test]
fn approach_holds_during_start_delay() {
    let mut sim = simulator(1);
    sim.enable(&queue(), START);
    let cursor = &mut sim.cursors[0];
    cursor.position = Point::new(10.0, 10.0);
    cursor.begin_approach(Point::new(90.0, 90.0), START, 500, 1000);

    cursor.advance(START + 400, 2000);
    assert_eq!(cursor.position, Point::new(10.0, 10.0));
}

#[test]
fn approach_ends_when_duration_elapses() {
    let mut sim = simulator(1);
    sim.enable(&queue(), START);
    let cursor = &mut sim.cursors[0];
    cursor.position = Point::new(0.0, 0.0);
    cursor.begin_approach(Point::new(100.0, 100.0), START, 0, 1000);

    cursor.advance(START + 1000, 2000);

    assert_eq!(cursor.phase, Phase::Settle);
    assert_eq!(cursor.settle_from, cursor.position);
    assert_eq!(cursor.settle_center, Point::new(100.0, 100.0));
}

#[test]
fn approach_ends_on_arrival() {
    let mut sim = simulator(1);
    sim.enable(&queue(), START);
    let cursor = &mut sim.cursors[0];
    cursor.position = Point::new(50.0, 50.0);
    cursor.begin_approach(Point::new(51.0, 50.5), START, 0, 10_000);

    cursor.advance(START + 100, 2000);
    assert_eq!(cursor.phase, Phase::Settle);
}

#[test]
fn settle_starts_where_approach_ended_and_ends_idle() {
    let mut sim = simulator(1);
    sim.enable(&queue(), START);
    let cursor = &mut sim.cursors[0];
    cursor.position = Point::new(20.0, 20.0);
    cursor.target = Point::new(50.0, 50.0);
    cursor.begin_settle(START, 2000);

    cursor.advance(START, 2000);
    assert!(cursor.position.distance(Point::new(20.0, 20.0)) < 1e-9);

    cursor.advance(START + 2000, 2000);
    assert_eq!(cursor.phase, Phase::Idle);
    let expected = cursor.idle_position(START + 2000).clamped();
    assert!(cursor.position.distance(expected) < 1e-9);
}

#[test]
fn idle_wander_is_deterministic_per_seed() {
    let mut sim = simulator(2);
    sim.enable(&queue(), START);
    let a = sim.cursors[0].clone();
    let mut b = a.clone();
    assert_eq!(a.idle_position(START + 12_345), b.idle_position(START + 12_345));

    b.noise_seed_x += 37.0;
    b.noise_seed_y += 37.0;
    let diverged = (0..20).any(|i| a.idle_position(START + i * 1000) != b.idle_position(START + i * 1000));
    assert!(diverged);
}

#[test]
fn active_change_retargets_every_ghost() {
    let mut sim = simulator(12);
    let mut q = queue();
    sim.enable(&q, START);
    assert_eq!(sim.last_observed_active_id(), Some(1));

    // Let everyone arrive and settle.
    for i in 1..=300 {
        sim.tick(&q, START + i * TICK);
    }
    let switch_at = START + 300 * TICK;
    q.activate_now(5, switch_at);
    q.enqueue(6, switch_at);

    sim.tick(&q, switch_at);

    assert_eq!(sim.last_observed_active_id(), Some(5));
    let mut approaching = 0;
    for cursor in sim.cursors() {
        assert_eq!(cursor.phase_start, switch_at);
        // A ghost whose new target landed within arrival distance settles at once.
        if cursor.phase == Phase::Approach {
            approaching += 1;
            // Lead is 10s to the next activation: delay and margin are each <= 2s.
            assert!((0..=2_000).contains(&cursor.start_delay));
            assert!(cursor.phase_duration >= 6_000 && cursor.phase_duration <= 10_000);
        }
    }
    assert!(approaching > 0);
}

#[test]
fn stagger_produces_different_start_delays() {
    let mut sim = simulator(12);
    sim.enable(&queue(), START);
    let mut delays: Vec<i64> = sim.cursors().iter().map(|c| c.start_delay).collect();
    delays.sort_unstable();
    delays.dedup();
    assert!(delays.len() > 1);
}

#[test]
fn short_lead_is_clamped_to_min_approach() {
    let mut sim = simulator(10);
    let mut q = queue();
    q.activate_now(2, START);
    // Next activation only 200 ms away.
    q.activate_now(3, START + 200);
    sim.enable(&q, START);
    assert!(sim.cursors().iter().all(|c| c.phase_duration >= 1000));
}

#[test]
fn sentinel_sends_ghosts_to_lobby() {
    let mut sim = simulator(10);
    let mut q = queue();
    sim.enable(&q, START);
    q.activate_now(SENTINEL_STATEMENT_ID, START + TICK);

    sim.tick(&q, START + TICK);

    assert!(sim.cursors().iter().all(|c| Zone::Lobby.contains(c.target)));
}
