//! Fixed timestep simulation tick
//!
//! The authority runs the full physics step; the dependent only moves its own
//! paddle here and dead-reckons everything else with `extrapolate`.

use glam::Vec2;

use super::collision::{Wall, end_wall_crossing, reflect_velocity, side_wall_crossing};
use super::shape::resolve;
use super::state::{
    BumperMood, GameEvent, GamePhase, GameState, Half, PADDLE_TRAVEL, Side,
};
use crate::consts::*;
use crate::net::Role;
use crate::sign;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Requested pivot position per side (from touch/drag or AI)
    pub paddle_targets: [Option<f32>; 2],
}

/// What a tick produced for the presentation layer
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub events: Vec<GameEvent>,
    /// Bumper colours from the local side's point of view
    pub bumpers: Vec<BumperMood>,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32, role: Role) -> TickReport {
    let mut report = TickReport::default();

    if state.phase != GamePhase::GameOver {
        state.time_ticks += 1;
        move_paddles(state, input, dt, role);
        for bumper in &mut state.bumpers {
            bumper.decay();
        }

        if role == Role::Authority {
            fire_pending_launches(state, &mut report);
            if state.phase == GamePhase::Playing {
                step_ball(state, dt, &mut report);
            }
        }
    }

    report.bumpers = state.bumper_moods(role.local_side());
    report
}

/// Dead-reckon every replicated value this peer does not own
///
/// Call once per rendered frame in which no fresh truth arrived.
pub fn extrapolate(state: &mut GameState, role: Role) {
    if role == Role::Dependent && state.phase == GamePhase::Playing {
        state.ball.pos.predict();
    }

    let remote = state.paddle_mut(role.local_side().opposite());
    remote.pos.predict();
    let y = remote.pos.get().clamp(-PADDLE_TRAVEL, PADDLE_TRAVEL);
    remote.pos.update(y);
}

/// Bleed speed above base back toward it, and never exceed the cap
pub fn regulate_speed(vel: Vec2, dt: f32) -> Vec2 {
    let speed = vel.length();
    if speed <= BALL_BASE_SPEED {
        return vel;
    }
    let target = (speed - BALL_SPEED_DECAY * dt)
        .max(BALL_BASE_SPEED)
        .min(BALL_MAX_SPEED);
    vel * (target / speed)
}

fn move_paddles(state: &mut GameState, input: &TickInput, dt: f32, role: Role) {
    for side in Side::BOTH {
        let Some(target) = input.paddle_targets[side.index()] else {
            continue;
        };
        let paddle = state.paddle_mut(side);
        let y = paddle.step_toward(target, dt);
        match role {
            Role::Authority => paddle.pos.update_truth(y),
            // Own paddle shows input immediately and is never smoothed
            Role::Dependent if side == role.local_side() => paddle.pos.update(y),
            Role::Dependent => {}
        }
    }
}

fn fire_pending_launches(state: &mut GameState, report: &mut TickReport) {
    let now = state.time_ticks;
    let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
        .into_iter()
        .partition(|launch| launch.fire_at_tick <= now);
    state.pending = waiting;

    for launch in due {
        if launch.round != state.round || state.phase != GamePhase::Respawning {
            log::debug!(
                "Discarding stale launch from round {} (now {})",
                launch.round,
                state.round
            );
            continue;
        }
        state.ball.vel = state.launch_velocity(launch.toward);
        state.phase = GamePhase::Playing;
        report.events.push(GameEvent::Launch {
            toward: launch.toward,
        });
    }
}

fn step_ball(state: &mut GameState, dt: f32, report: &mut TickReport) {
    let radius = state.ball.radius;
    let mut vel = regulate_speed(state.ball.vel, dt);
    let mut pos = state.ball.pos.truth() + vel * dt;

    // Look one radius ahead so fast balls cannot skip through a boundary
    let probe = pos + sign(vel) * radius;

    // --- WALLS ---
    if let Some(wall) = side_wall_crossing(probe, vel) {
        if state.rules.side_walls_score {
            let crossed = if wall == Wall::Left {
                Side::Left
            } else {
                Side::Right
            };
            score_goal(state, crossed, report);
            return;
        }
        vel = reflect_velocity(vel, wall.normal());
        pos.x = pos
            .x
            .clamp(-FIELD_HALF_WIDTH + radius, FIELD_HALF_WIDTH - radius);
        report.events.push(GameEvent::WallBounce);
    }
    if let Some(wall) = end_wall_crossing(probe, vel) {
        vel = reflect_velocity(vel, wall.normal());
        pos.y = pos
            .y
            .clamp(-FIELD_HALF_HEIGHT + radius, FIELD_HALF_HEIGHT - radius);
        report.events.push(GameEvent::WallBounce);
    }

    // --- PADDLES --- one bouncing half per side, upper first
    for side in Side::BOTH {
        for half in Half::ORDER {
            let shape = state.paddle(side).half_shape(half);
            let Some(contact) = resolve(&shape, pos, radius) else {
                continue;
            };
            // Already leaving this face (bounced earlier)
            if vel.dot(contact.normal) >= 0.0 {
                continue;
            }
            vel = reflect_velocity(vel, contact.normal);
            pos += contact.normal * contact.penetration;
            state.last_touch = Some(side);
            report.events.push(GameEvent::PaddleHit { side, half });
            break;
        }
    }

    // --- BUMPERS --- redirect and boost, first bumper wins
    for index in 0..state.bumpers.len() {
        let shape = state.bumpers[index].shape();
        let Some(contact) = resolve(&shape, pos, radius) else {
            continue;
        };
        if vel.dot(contact.normal) >= 0.0 {
            continue;
        }
        let speed = vel.length();
        vel = reflect_velocity(vel, contact.normal).normalize_or_zero() * speed * BUMPER_BOOST;
        pos += contact.normal * contact.penetration;

        let credited = state.last_touch;
        state.bumpers[index].light(credited);
        if let Some(side) = credited {
            state.score.award(side, state.rules.bumper_points);
        }
        log::debug!("Bumper {index} hit, credited to {credited:?}");
        report.events.push(GameEvent::BumperHit { index, credited });
        break;
    }

    state.ball.vel = vel;
    state.ball.pos.update_truth(pos);
    check_match_over(state, report);
}

fn score_goal(state: &mut GameState, crossed: Side, report: &mut TickReport) {
    let scorer = crossed.opposite();
    state.score.award(scorer, state.rules.goal_points);
    state.round += 1;
    state.last_touch = None;
    report.events.push(GameEvent::Goal { scorer });
    log::info!("Goal for {scorer:?} ({})", state.score.display());

    if check_match_over(state, report) {
        state.ball.reset();
    } else {
        // Relaunch toward whoever just conceded
        state.schedule_launch(crossed);
    }
}

/// Returns true once the match has a winner
fn check_match_over(state: &mut GameState, report: &mut TickReport) -> bool {
    if state.phase == GamePhase::GameOver {
        return true;
    }
    let Some(winner) = state.score.winner(state.rules.winning_score) else {
        return false;
    };
    state.phase = GamePhase::GameOver;
    state.pending.clear();
    report.events.push(GameEvent::MatchOver { winner });
    log::info!("{winner:?} wins {}", state.score.display());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetVector;
    use crate::settings::Rules;
    use crate::sim::shape::Shape;

    const HOST: Role = Role::Authority;

    fn playing_state(rules: Rules) -> GameState {
        let mut state = GameState::new(12345, rules);
        state.pending.clear();
        state.phase = GamePhase::Playing;
        state
    }

    fn place_ball(state: &mut GameState, pos: Vec2, vel: Vec2) {
        state.ball.pos = NetVector::new(pos);
        state.ball.vel = vel;
    }

    fn no_goals() -> Rules {
        Rules {
            side_walls_score: false,
            ..Rules::default()
        }
    }

    #[test]
    fn test_opening_launch_after_delay() {
        let mut state = GameState::new(12345, Rules::default());
        let input = TickInput::default();

        for _ in 0..RESPAWN_DELAY_TICKS - 1 {
            tick(&mut state, &input, SIM_DT, HOST);
            assert_eq!(state.phase, GamePhase::Respawning);
            assert_eq!(state.ball.vel, Vec2::ZERO);
        }

        let report = tick(&mut state, &input, SIM_DT, HOST);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(matches!(report.events[0], GameEvent::Launch { .. }));
        assert!((state.ball.vel.length() - BALL_BASE_SPEED).abs() < 0.01);
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_side_wall_reflects_when_goals_disabled() {
        let mut state = playing_state(no_goals());
        place_ball(
            &mut state,
            Vec2::new(FIELD_HALF_WIDTH - BALL_RADIUS, 100.0),
            Vec2::new(5.0, 0.0),
        );

        let report = tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert_eq!(state.ball.vel, Vec2::new(-5.0, 0.0));
        assert!(report.events.contains(&GameEvent::WallBounce));
        assert_eq!(state.score.left + state.score.right, 0);
    }

    #[test]
    fn test_side_wall_scores_and_resets() {
        let mut state = playing_state(Rules::default());
        let round = state.round;
        place_ball(
            &mut state,
            Vec2::new(FIELD_HALF_WIDTH - BALL_RADIUS, 100.0),
            Vec2::new(5.0, 0.0),
        );

        let report = tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert!(report.events.contains(&GameEvent::Goal { scorer: Side::Left }));
        assert_eq!(state.score.left, Rules::default().goal_points);
        assert_eq!(state.score.right, 0);
        assert_eq!(state.ball.pos.get(), Vec2::ZERO);
        assert_eq!(state.ball.vel, Vec2::ZERO);
        assert_eq!(state.phase, GamePhase::Respawning);
        assert_eq!(state.round, round + 1);
        assert_eq!(state.pending.len(), 1);

        // Relaunch heads back toward the side that conceded
        for _ in 0..RESPAWN_DELAY_TICKS {
            tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        }
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.ball.vel.x > 0.0);
    }

    #[test]
    fn test_top_wall_reflects() {
        let mut state = playing_state(Rules::default());
        place_ball(
            &mut state,
            Vec2::new(300.0, FIELD_HALF_HEIGHT - BALL_RADIUS),
            Vec2::new(100.0, 200.0),
        );
        tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert_eq!(state.ball.vel, Vec2::new(100.0, -200.0));
        assert!(state.ball.pos.get().y <= FIELD_HALF_HEIGHT - BALL_RADIUS);
    }

    #[test]
    fn test_paddle_face_reflects_normal_component_only() {
        let mut state = playing_state(Rules::default());
        let paddle_x = state.paddle(Side::Left).x();
        let face = paddle_x + PADDLE_THICKNESS / 2.0;
        place_ball(
            &mut state,
            Vec2::new(face + BALL_RADIUS - 1.0, 0.0),
            Vec2::new(-300.0, 40.0),
        );

        let report = tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert_eq!(state.ball.vel, Vec2::new(300.0, 40.0));
        assert_eq!(state.last_touch, Some(Side::Left));
        // Upper half resolves first; lower is skipped
        let hits: Vec<_> = report
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::PaddleHit { .. }))
            .collect();
        assert_eq!(
            hits,
            vec![&GameEvent::PaddleHit {
                side: Side::Left,
                half: Half::Upper
            }]
        );
        // Pushed back out of the face
        assert!(state.ball.pos.get().x >= face + BALL_RADIUS - 1e-3);
    }

    #[test]
    fn test_paddle_ignores_ball_moving_away() {
        let mut state = playing_state(Rules::default());
        let face = state.paddle(Side::Left).x() + PADDLE_THICKNESS / 2.0;
        place_ball(
            &mut state,
            Vec2::new(face + BALL_RADIUS - 4.0, 30.0),
            Vec2::new(250.0, 0.0),
        );
        tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert_eq!(state.ball.vel, Vec2::new(250.0, 0.0));
        assert_eq!(state.last_touch, None);
    }

    #[test]
    fn test_flipped_half_deflects_at_an_angle() {
        let mut state = playing_state(Rules::default());
        state.paddle_mut(Side::Left).flips = [true, false];
        let shape = state.paddle(Side::Left).half_shape(Half::Upper);
        let Shape::Rectangle {
            center,
            rotation,
            origin_offset,
            ..
        } = shape
        else {
            panic!("paddle half must be a rectangle");
        };
        let mid = center + crate::rotate(origin_offset, rotation);
        let face_normal = crate::rotate(Vec2::X, rotation);
        place_ball(
            &mut state,
            mid + face_normal * (PADDLE_THICKNESS / 2.0 + BALL_RADIUS - 1.0),
            Vec2::new(-300.0, 0.0),
        );

        tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        let vel = state.ball.vel;
        assert!(vel.x > 0.0);
        // Angled face kicks the ball off the horizontal
        assert!(vel.y.abs() > 100.0);
        assert!((vel.length() - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_bumper_boosts_and_reflects_at_any_angle() {
        for angle in [-2.5f32, -1.2, 0.3, 1.0, 2.0, 3.0] {
            let mut state = playing_state(Rules::default());
            let bumper = state.bumpers[0].center;
            let out = Vec2::from_angle(angle);
            let tangent = out.perp();
            let pos = bumper + out * (BUMPER_RADIUS + BALL_RADIUS - 1.0);
            let vel = -out * 300.0 + tangent * 150.0;
            place_ball(&mut state, pos, vel);

            tick(&mut state, &TickInput::default(), SIM_DT, HOST);

            let normal = (pos + vel * SIM_DT - bumper).normalize();
            let expected_dir = reflect_velocity(vel, normal).normalize();
            let got = state.ball.vel;
            assert!(
                (got.length() - vel.length() * BUMPER_BOOST).abs() < 1e-2,
                "angle {angle}: speed {}",
                got.length()
            );
            assert!(
                (got.normalize() - expected_dir).length() < 1e-4,
                "angle {angle}: direction {got}"
            );
        }
    }

    #[test]
    fn test_bumper_credits_last_touch() {
        let mut state = playing_state(Rules::default());
        state.last_touch = Some(Side::Right);
        let bumper = state.bumpers[1].center;
        place_ball(
            &mut state,
            bumper + Vec2::new(0.0, BUMPER_RADIUS + BALL_RADIUS - 1.0),
            Vec2::new(0.0, -200.0),
        );

        let report = tick(&mut state, &TickInput::default(), SIM_DT, Role::Authority);
        assert_eq!(state.score.right, Rules::default().bumper_points);
        assert_eq!(
            report.bumpers,
            vec![BumperMood::Neutral, BumperMood::Unfavorable]
        );

        // Client on the right sees the same hit as its own
        assert_eq!(state.bumper_moods(Side::Right)[1], BumperMood::Favorable);
    }

    #[test]
    fn test_speed_regulation() {
        let fast = Vec2::new(BALL_BASE_SPEED + 100.0, 0.0);
        let slowed = regulate_speed(fast, 0.1);
        assert!((slowed.x - (BALL_BASE_SPEED + 100.0 - BALL_SPEED_DECAY * 0.1)).abs() < 1e-3);

        // Never undershoots base
        let barely = Vec2::new(0.0, BALL_BASE_SPEED + 1.0);
        assert!((regulate_speed(barely, 1.0).y - BALL_BASE_SPEED).abs() < 1e-3);

        // Hard cap
        let runaway = Vec2::new(BALL_MAX_SPEED * 3.0, 0.0);
        assert!((regulate_speed(runaway, SIM_DT).x - BALL_MAX_SPEED).abs() < 1e-2);

        let slow = Vec2::new(10.0, 10.0);
        assert_eq!(regulate_speed(slow, 1.0), slow);
    }

    #[test]
    fn test_stale_launch_is_discarded_after_new_match() {
        let mut state = playing_state(Rules::default());
        place_ball(
            &mut state,
            Vec2::new(-FIELD_HALF_WIDTH + BALL_RADIUS, 0.0),
            Vec2::new(-600.0, 0.0),
        );
        let input = TickInput::default();
        tick(&mut state, &input, SIM_DT, HOST);
        assert_eq!(state.score.right, Rules::default().goal_points);

        for _ in 0..RESPAWN_DELAY_TICKS / 2 {
            tick(&mut state, &input, SIM_DT, HOST);
        }
        state.new_match();
        assert_eq!(state.pending.len(), 2);

        // The goal's launch comes due first and must not fire
        for _ in 0..RESPAWN_DELAY_TICKS / 2 {
            tick(&mut state, &input, SIM_DT, HOST);
        }
        assert_eq!(state.phase, GamePhase::Respawning);
        assert_eq!(state.ball.vel, Vec2::ZERO);
        assert_eq!(state.pending.len(), 1);

        for _ in 0..RESPAWN_DELAY_TICKS / 2 {
            tick(&mut state, &input, SIM_DT, HOST);
        }
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.score.right, 0);
    }

    #[test]
    fn test_winning_goal_ends_match() {
        let rules = Rules {
            winning_score: 5,
            ..Rules::default()
        };
        let mut state = playing_state(rules);
        place_ball(
            &mut state,
            Vec2::new(-FIELD_HALF_WIDTH + BALL_RADIUS, 0.0),
            Vec2::new(-600.0, 0.0),
        );
        let report = tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert!(report.events.contains(&GameEvent::MatchOver {
            winner: Side::Right
        }));
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.pending.is_empty());

        // Frozen afterwards
        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default(), SIM_DT, HOST);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_dependent_moves_only_its_own_paddle_and_skips_physics() {
        let mut state = playing_state(Rules::default());
        place_ball(&mut state, Vec2::ZERO, Vec2::new(100.0, 0.0));
        let input = TickInput {
            paddle_targets: [Some(200.0), Some(200.0)],
        };
        tick(&mut state, &input, SIM_DT, Role::Dependent);

        assert_eq!(state.ball.pos.get(), Vec2::ZERO);
        assert_eq!(state.paddle(Side::Left).pos.get(), 0.0);
        let right = &state.paddle(Side::Right).pos;
        assert!(right.get() > 0.0);
        // Local override only
        assert_eq!(right.truth(), 0.0);
    }

    #[test]
    fn test_extrapolate_follows_truth_delta() {
        let mut state = playing_state(Rules::default());
        state.ball.pos = NetVector::new(Vec2::new(-1.0, 0.0));
        state.ball.pos.update_truth(Vec2::ZERO);
        state.paddle_mut(Side::Left).pos.update_truth(10.0);

        let mut prev = state.ball.pos.get().x;
        for _ in 0..5 {
            extrapolate(&mut state, Role::Dependent);
            let x = state.ball.pos.get().x;
            assert!(x > prev);
            prev = x;
        }
        assert_eq!(state.paddle(Side::Left).pos.get(), 60.0);
        // Own paddle untouched
        assert_eq!(state.paddle(Side::Right).pos.get(), 0.0);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999, Rules::default());
        let mut state2 = GameState::new(99999, Rules::default());
        let input = TickInput {
            paddle_targets: [Some(120.0), Some(-80.0)],
        };

        for _ in 0..2_000 {
            tick(&mut state1, &input, SIM_DT, HOST);
            tick(&mut state2, &input, SIM_DT, HOST);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.ball.pos.get(), state2.ball.pos.get());
    }
}
